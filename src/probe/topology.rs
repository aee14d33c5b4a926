//! Core/thread topology enumeration.
//!
//! Leaf iteration yields the SMT/core level structure; exact physical-core
//! counting then pins the calling thread to each logical processor in turn,
//! samples that processor's topology id, and groups adjacent equal core ids.
//! The grouping is neighbor-to-neighbor only, so the pin loop must visit
//! logical processors in increasing index order.

use tracing::{debug, trace, warn};

use super::affinity::{AffinityController, AffinityGuard};
use super::cpuid::CpuidSource;
use crate::caps::{CpuCaps, MAX_LOGICAL_CPUS};

/// Level type 0 terminates the walk; the cap bounds it on malformed or
/// emulated hardware.
const MAX_TOPOLOGY_LEVELS: u32 = 7;

/// Intel extended topology enumeration (leaf 11, or its V2 superset 31).
pub(crate) fn enumerate_intel<C, A>(cpu: &C, affinity: &mut A, highest_leaf: u32, caps: &mut CpuCaps)
where
    C: CpuidSource,
    A: AffinityController,
{
    if highest_leaf < 11 {
        // No extended topology leaf; the single-core default stands.
        return;
    }
    let leaf = if highest_leaf >= 31 { 31 } else { 11 };

    let mut smt_width = 1u32;
    let mut logical = 1u32;
    let mut smt_shift = 0u32;
    let mut core_mask = 0u32;

    for level in 0..MAX_TOPOLOGY_LEVELS {
        let r = cpu.query(leaf, level);

        // Level types: 0 invalid, 1 SMT, 2 core, 3+ module/tile/die.
        let level_type = (r.ecx >> 8) & 0xFF;
        if level_type == 0 {
            break;
        }

        // EAX bits 4:0: right-shift that turns an x2APIC id into the next
        // level's id; processors sharing the shifted id share this level.
        let next_shift = r.eax & 0x1F;
        trace!(level, level_type, next_shift, "topology level");

        match level_type {
            1 => {
                smt_width = (r.ebx & 0xFFFF).max(1);
                smt_shift = next_shift;
            }
            2 => {
                logical = r.ebx & 0xFFFF;
                core_mask = mask_for_shift(next_shift);
            }
            _ => {}
        }
    }

    caps.topology.logical_cores = logical.max(1);
    caps.topology.physical_cores = (logical / smt_width).max(1);

    if caps.topology.logical_cores > 1 {
        let sample = |cpu: &C| {
            let r = cpu.query(leaf, 0);
            (((r.edx >> smt_shift) & core_mask) & 0xFF) as u8
        };
        if let Some((ids, sampled)) = sample_core_ids(cpu, affinity, logical, sample) {
            caps.topology.core_ids = ids;
            caps.topology.sampled = sampled;
            caps.topology.physical_cores = count_adjacent_groups(&ids[..sampled]);
        }
    }

    debug!(
        physical = caps.topology.physical_cores,
        logical = caps.topology.logical_cores,
        "intel topology enumerated"
    );
}

/// AMD topology via leaf 0x8000001E.
pub(crate) fn enumerate_amd<C, A>(cpu: &C, affinity: &mut A, highest_ext: u32, caps: &mut CpuCaps)
where
    C: CpuidSource,
    A: AffinityController,
{
    // Without the TopologyExtensions bit the leaf's contents are
    // architecturally undefined and must not be read.
    if highest_ext < 0x8000_001E || !caps.has_topology_extensions() {
        return;
    }

    let logical = (cpu.query(1, 0).ebx >> 16) & 0xFF;
    if logical <= 1 {
        return;
    }

    // The leaf reports the core id directly; no shift/mask derivation.
    let sample = |cpu: &C| (cpu.query(0x8000_001E, 0).ebx & 0xFF) as u8;
    if let Some((ids, sampled)) = sample_core_ids(cpu, affinity, logical, sample) {
        caps.topology.logical_cores = logical;
        caps.topology.core_ids = ids;
        caps.topology.sampled = sampled;
        caps.topology.physical_cores = count_adjacent_groups(&ids[..sampled]);
    }

    debug!(
        physical = caps.topology.physical_cores,
        logical = caps.topology.logical_cores,
        "amd topology enumerated"
    );
}

/// Pins the calling thread to each logical processor in increasing index
/// order and samples its core id. Returns `None` when affinity control is
/// unavailable or a pin fails mid-loop; either way the guard restores the
/// original mask.
fn sample_core_ids<C, A>(
    cpu: &C,
    affinity: &mut A,
    logical: u32,
    sample: impl Fn(&C) -> u8,
) -> Option<([u8; MAX_LOGICAL_CPUS], usize)>
where
    C: CpuidSource,
    A: AffinityController,
{
    let wanted = logical as usize;
    let sampled = wanted.min(MAX_LOGICAL_CPUS);
    if sampled < wanted {
        warn!(
            logical,
            limit = MAX_LOGICAL_CPUS,
            "affinity mask is 64 bits wide; sampling only the first 64 logical processors"
        );
    }

    let mut guard = match AffinityGuard::pin(affinity, 1) {
        Ok(guard) => guard,
        Err(err) => {
            debug!(error = %err, "affinity control unavailable, keeping seeded core counts");
            return None;
        }
    };

    let mut ids = [0u8; MAX_LOGICAL_CPUS];
    for k in 0..sampled {
        if let Err(err) = guard.repin(1u64 << k) {
            debug!(error = %err, processor = k, "pin failed, abandoning refinement");
            return None;
        }
        ids[k] = sample(cpu);
    }
    Some((ids, sampled))
}

/// Number of runs of equal adjacent ids. `[0, 0, 1, 1, 1, 2]` has three.
fn count_adjacent_groups(ids: &[u8]) -> u32 {
    let mut groups = 1u32;
    for pair in ids.windows(2) {
        if pair[0] != pair[1] {
            groups += 1;
        }
    }
    groups
}

fn mask_for_shift(shift: u32) -> u32 {
    (1u32 << (shift & 0x1F)).wrapping_sub(1)
}
