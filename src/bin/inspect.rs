use clap::Parser;
use cpucaps::{probe, CacheLevel, CpuCaps, Vendor};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(about = "Inspect the host CPU capability snapshot", long_about = None)]
struct Args {
    /// Emit the snapshot as pretty-printed JSON.
    #[arg(long)]
    json: bool,

    /// Cross-check core counts against what the OS reports.
    #[arg(long)]
    compare: bool,
}

#[derive(Serialize)]
struct CapsReport {
    vendor: String,
    brand: String,
    vendor_kind: String,
    signature: SignatureReport,
    caches: Vec<CacheReport>,
    topology: TopologyReport,
    features: Vec<FeatureReport>,
}

#[derive(Serialize)]
struct SignatureReport {
    stepping: u8,
    model: u8,
    family: u8,
    cpu_type: u8,
    ext_model: u8,
    ext_family: u8,
}

#[derive(Serialize)]
struct CacheReport {
    level: &'static str,
    line_size_bytes: u32,
    size_kib: u32,
    associativity_ways: u32,
}

#[derive(Serialize)]
struct TopologyReport {
    physical_cores: u32,
    logical_cores: u32,
    core_ids: Vec<u8>,
}

#[derive(Serialize)]
struct FeatureReport {
    name: &'static str,
    supported: bool,
}

fn build_report(caps: &CpuCaps) -> CapsReport {
    let mut caches = Vec::new();
    let mut push = |level: &'static str, entry: Option<CacheLevel>| {
        if let Some(l) = entry {
            caches.push(CacheReport {
                level,
                line_size_bytes: l.line_size_bytes,
                size_kib: l.size_kib,
                associativity_ways: l.associativity_ways,
            });
        }
    };
    push("L1d", caps.l1d);
    push("L1i", caps.l1i);
    push("L2", caps.l2);
    push("L3", caps.l3);

    CapsReport {
        vendor: caps.vendor_str().to_string(),
        brand: caps.brand_str().to_string(),
        vendor_kind: match caps.vendor_kind {
            Vendor::Intel => "Intel".to_string(),
            Vendor::Amd => "AMD".to_string(),
            Vendor::Unknown => "Unknown".to_string(),
        },
        signature: SignatureReport {
            stepping: caps.signature.stepping,
            model: caps.signature.model,
            family: caps.signature.family,
            cpu_type: caps.signature.cpu_type,
            ext_model: caps.signature.ext_model,
            ext_family: caps.signature.ext_family,
        },
        caches,
        topology: TopologyReport {
            physical_cores: caps.topology.physical_cores,
            logical_cores: caps.topology.logical_cores,
            core_ids: caps.topology.core_ids().to_vec(),
        },
        features: caps
            .feature_report()
            .into_iter()
            .map(|(name, supported)| FeatureReport { name, supported })
            .collect(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let caps = probe();
    let report = build_report(&caps);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} ({})", report.brand, report.vendor);
        println!(
            "family {} model {} stepping {}",
            report.signature.family, report.signature.model, report.signature.stepping
        );
        for cache in &report.caches {
            println!(
                "{:>4}: {} KiB, {}-byte lines, assoc {}",
                cache.level, cache.size_kib, cache.line_size_bytes, cache.associativity_ways
            );
        }
        println!(
            "cores: {} physical / {} logical",
            report.topology.physical_cores, report.topology.logical_cores
        );
        let supported: Vec<&str> = report
            .features
            .iter()
            .filter(|f| f.supported)
            .map(|f| f.name)
            .collect();
        println!("features: {}", supported.join(" "));
    }

    if args.compare {
        let mut sys = sysinfo::System::new_all();
        sys.refresh_all();
        let os_logical = sys.cpus().len();
        let os_physical = sys.physical_core_count();

        println!();
        println!(
            "cpuid logical cores : {:>3}   os: {}",
            report.topology.logical_cores, os_logical
        );
        match os_physical {
            Some(n) => println!(
                "cpuid phys. cores   : {:>3}   os: {}",
                report.topology.physical_cores, n
            ),
            None => println!(
                "cpuid phys. cores   : {:>3}   os: unknown",
                report.topology.physical_cores
            ),
        }
        println!(
            "cpuid brand         : {}\nos brand            : {}",
            report.brand,
            sys.global_cpu_info().brand().trim()
        );
    }

    Ok(())
}
