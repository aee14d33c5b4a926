use cpucaps::{probe, CacheLevel, Vendor};

fn main() {
    tracing_subscriber::fmt::init();

    println!("=== CPU Capability Snapshot ===");
    let caps = probe();

    match caps.vendor_kind {
        Vendor::Intel => println!("\nIntel cpu detected."),
        Vendor::Amd => println!("\nAMD cpu detected."),
        Vendor::Unknown => println!("\nUnknown cpu detected."),
    }

    println!("\nCPU info:");
    println!("  vendor      : {}", caps.vendor_str());
    println!("  name        : {}", caps.brand_str());
    println!("  stepping    : {}", caps.signature.stepping);
    println!("  model       : {}", caps.signature.model);
    println!("  family      : {}", caps.signature.family);
    println!("  cpu type    : {}", caps.signature.cpu_type);
    println!("  model ex    : {}", caps.signature.ext_model);
    println!("  family ex   : {}", caps.signature.ext_family);
    println!("  phys. cores : {}", caps.topology.physical_cores);
    println!("  logi. cores : {}", caps.topology.logical_cores);

    println!("\nCache geometry:");
    print_cache("L1d", caps.l1d);
    print_cache("L1i", caps.l1i);
    print_cache("L2 ", caps.l2);
    print_cache("L3 ", caps.l3);

    let core_ids = caps.topology.core_ids();
    if !core_ids.is_empty() {
        println!("\nExtended topology:");
        let mut physical = 0usize;
        let mut logical_in_core = 1usize;
        for pair in core_ids.windows(2) {
            if pair[0] != pair[1] {
                println!("  physical core #{physical} has {logical_in_core} logical cores");
                physical += 1;
                logical_in_core = 0;
            }
            logical_in_core += 1;
        }
        println!("  physical core #{physical} has {logical_in_core} logical cores");
    }

    println!("\nCPU caps:");
    for (name, supported) in caps.feature_report() {
        println!("  {:>12} : {}", name, if supported { "YES" } else { " NO" });
    }
}

fn print_cache(label: &str, level: Option<CacheLevel>) {
    match level {
        Some(l) => println!(
            "  {label} : {} KiB, {}-byte lines, assoc {}",
            l.size_kib, l.line_size_bytes, l.associativity_ways
        ),
        None => println!("  {label} : not reported"),
    }
}
