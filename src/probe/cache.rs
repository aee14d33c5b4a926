//! Cache geometry decoding.
//!
//! Intel reports caches through the deterministic cache parameters leaf
//! (leaf 4, one sub-leaf per cache); AMD reports L1 and L2/L3 through the
//! fixed-field extended leaves 0x80000005/0x80000006, falling back to the
//! deterministic-style leaf 0x8000001D where the legacy encoding runs out.

use tracing::trace;

use super::cpuid::CpuidSource;
use crate::caps::{CacheLevel, CpuCaps};

/// The hardware is expected to report a terminating null entry well before
/// this; the cap bounds the loop on malformed or emulated hardware.
const MAX_DETERMINISTIC_SUBLEAVES: u32 = 8;

/// On Zen 2 and newer the legacy L3 associativity field holds this reserved
/// value, deferring the real geometry to leaf 0x8000001D.
const L3_ASSOC_SENTINEL: u32 = 9;

/// Intel "Deterministic Cache Parameters" leaf.
pub(crate) fn decode_intel(cpu: &impl CpuidSource, caps: &mut CpuCaps) {
    for subleaf in 0..MAX_DETERMINISTIC_SUBLEAVES {
        let r = cpu.query(4, subleaf);

        let cache_type = r.eax & 0x1F;
        if cache_type == 0 {
            // Null entry, no more caches.
            break;
        }
        let cache_level = (r.eax >> 5) & 0x7;

        let line_size = (r.ebx & 0xFFF) + 1;
        let partitions = ((r.ebx >> 12) & 0x3FF) + 1;
        let ways = ((r.ebx >> 22) & 0x3FF) + 1;
        let sets = r.ecx + 1;
        // Cache size = ways * partitions * line size * sets.
        let size_kib = ways * partitions * line_size * sets / 1024;

        trace!(subleaf, cache_type, cache_level, size_kib, "deterministic cache sub-leaf");

        let entry = CacheLevel {
            line_size_bytes: line_size,
            size_kib,
            associativity_ways: ways,
        };
        match (cache_level, cache_type) {
            (1, 1) => caps.l1d = Some(entry), // data
            (1, 2) => caps.l1i = Some(entry), // instruction
            (2, 3) => caps.l2 = Some(entry),  // unified
            (3, 3) => caps.l3 = Some(entry),
            _ => {} // other level/type combinations are not reported
        }
    }
}

/// AMD legacy cache leaves, with the 0x8000001D re-derivation for L3.
pub(crate) fn decode_amd(cpu: &impl CpuidSource, highest_ext: u32, caps: &mut CpuCaps) {
    if highest_ext >= 0x8000_0005 {
        let r = cpu.query(0x8000_0005, 0);
        caps.l1d = l1_from_word(r.ecx);
        caps.l1i = l1_from_word(r.edx);
    }

    if highest_ext >= 0x8000_0006 {
        let r = cpu.query(0x8000_0006, 0);

        let l2 = CacheLevel {
            line_size_bytes: r.ecx & 0xFF,
            size_kib: (r.ecx >> 16) & 0xFFFF,
            associativity_ways: (r.ecx >> 12) & 0xF,
        };
        if l2.size_kib != 0 {
            caps.l2 = Some(l2);
        }

        // The L3 size field counts 512 KiB units; zero means no L3.
        let l3_size_kib = ((r.edx >> 18) & 0x3FFF) * 512;
        if l3_size_kib != 0 {
            let mut l3 = CacheLevel {
                line_size_bytes: r.edx & 0xFF,
                size_kib: l3_size_kib,
                associativity_ways: (r.edx >> 12) & 0xF,
            };
            if l3.associativity_ways == L3_ASSOC_SENTINEL && highest_ext >= 0x8000_001D {
                // Sub-leaf 3 is the L3 entry; same bit layout as the Intel
                // deterministic leaf.
                let ext = cpu.query(0x8000_001D, 3);
                l3.line_size_bytes = (ext.ebx & 0xFFF) + 1;
                l3.associativity_ways = ((ext.ebx >> 22) & 0x3FF) + 1;
            }
            caps.l3 = Some(l3);
        }
    }
}

// L1 data and instruction words share a layout: line size in bits 7:0,
// associativity in 23:16, size in KiB in 31:24.
fn l1_from_word(word: u32) -> Option<CacheLevel> {
    let entry = CacheLevel {
        line_size_bytes: word & 0xFF,
        size_kib: (word >> 24) & 0xFF,
        associativity_ways: (word >> 16) & 0xFF,
    };
    (entry.size_kib != 0).then_some(entry)
}
