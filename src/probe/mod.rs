//! Capability probing.
//!
//! [`probe`] runs once, synchronously, on the calling thread and returns a
//! fresh [`CpuCaps`] snapshot. Nothing here can fail: leaves the hardware
//! does not support leave their fields at the defaults.

pub mod affinity;
mod cache;
pub mod cpuid;
mod topology;

pub use affinity::{AffinityController, AffinityError, OsAffinity};
pub use cpuid::{CpuidRegs, CpuidSource, HostCpuid};

use tracing::debug;

use crate::caps::{CpuCaps, Signature, Vendor};

const EXT_BASE: u32 = 0x8000_0000;

/// Build a capability snapshot from the host processor.
///
/// Topology refinement temporarily narrows the calling thread's affinity
/// mask and restores it before returning; do not run two probes on the same
/// thread concurrently, and do not change the thread's affinity from
/// elsewhere while a probe is in flight.
pub fn probe() -> CpuCaps {
    probe_with(&HostCpuid, &mut OsAffinity)
}

/// [`probe`] against explicit identification and affinity backends.
pub fn probe_with<C, A>(cpu: &C, affinity: &mut A) -> CpuCaps
where
    C: CpuidSource,
    A: AffinityController,
{
    let mut caps = CpuCaps::default();

    // Leaf 0: highest standard leaf plus the vendor string (EBX, EDX, ECX).
    let r0 = cpu.query(0, 0);
    let highest = r0.eax;
    caps.vendor[0..4].copy_from_slice(&r0.ebx.to_le_bytes());
    caps.vendor[4..8].copy_from_slice(&r0.edx.to_le_bytes());
    caps.vendor[8..12].copy_from_slice(&r0.ecx.to_le_bytes());
    caps.vendor_kind = Vendor::from_vendor_bytes(&caps.vendor);

    if highest >= 1 {
        let r1 = cpu.query(1, 0);
        caps.leaf1_ecx = r1.ecx;
        caps.leaf1_edx = r1.edx;
        caps.signature = Signature::from_leaf1_eax(r1.eax);
    }

    if highest >= 4 && caps.vendor_kind == Vendor::Intel {
        cache::decode_intel(cpu, &mut caps);
        topology::enumerate_intel(cpu, affinity, highest, &mut caps);
    }

    if highest >= 7 {
        let r7 = cpu.query(7, 0);
        caps.leaf7_ebx = r7.ebx;
        caps.leaf7_ecx = r7.ecx;
    }

    let highest_ext = cpu.query(EXT_BASE, 0).eax;

    if highest_ext >= 0x8000_0001 {
        let r = cpu.query(0x8000_0001, 0);
        caps.ext1_ecx = r.ecx;
        caps.ext1_edx = r.edx;
    }

    decode_brand(cpu, highest_ext, &mut caps);

    if highest_ext >= 0x8000_0005 && caps.vendor_kind == Vendor::Amd {
        cache::decode_amd(cpu, highest_ext, &mut caps);
        topology::enumerate_amd(cpu, affinity, highest_ext, &mut caps);
    }

    debug!(
        vendor = ?caps.vendor_kind,
        brand = caps.brand_str(),
        physical = caps.topology.physical_cores,
        logical = caps.topology.logical_cores,
        "capability probe complete"
    );
    caps
}

// Brand string: three consecutive 16-byte register blocks. A chunk whose
// leaf is unsupported truncates the string right there.
fn decode_brand<C: CpuidSource>(cpu: &C, highest_ext: u32, caps: &mut CpuCaps) {
    for (i, leaf) in (0x8000_0002u32..=0x8000_0004).enumerate() {
        if highest_ext < leaf {
            break;
        }
        let r = cpu.query(leaf, 0);
        caps.brand[i * 16..(i + 1) * 16].copy_from_slice(bytemuck::bytes_of(&r));
        caps.brand_len = (i + 1) * 16;
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::affinity::{AffinityController, AffinityError};
    use super::cpuid::{CpuidRegs, CpuidSource};

    /// Synthetic identification source: a leaf table, plus per-processor
    /// register overrides for the topology leaf keyed off the processor the
    /// fake affinity controller currently has the thread pinned to.
    pub(crate) struct FakeCpu {
        leaves: HashMap<(u32, u32), CpuidRegs>,
        pub default_regs: CpuidRegs,
        pub topo_leaf: u32,
        pub per_cpu_edx: Vec<u32>,
        pub per_cpu_ebx: Vec<u32>,
        pub log: RefCell<Vec<(u32, u32)>>,
        pub pinned: Rc<Cell<u64>>,
    }

    impl Default for FakeCpu {
        fn default() -> Self {
            Self {
                leaves: HashMap::new(),
                default_regs: CpuidRegs::default(),
                topo_leaf: u32::MAX,
                per_cpu_edx: Vec::new(),
                per_cpu_ebx: Vec::new(),
                log: RefCell::new(Vec::new()),
                pinned: Rc::new(Cell::new(1)),
            }
        }
    }

    impl FakeCpu {
        pub fn set(&mut self, leaf: u32, subleaf: u32, regs: CpuidRegs) {
            self.leaves.insert((leaf, subleaf), regs);
        }

        pub fn set_vendor(&mut self, highest: u32, vendor: &[u8; 12]) {
            let word = |range: std::ops::Range<usize>| {
                u32::from_le_bytes(vendor[range].try_into().unwrap())
            };
            self.set(
                0,
                0,
                CpuidRegs {
                    eax: highest,
                    ebx: word(0..4),
                    edx: word(4..8),
                    ecx: word(8..12),
                },
            );
        }
    }

    impl CpuidSource for FakeCpu {
        fn query(&self, leaf: u32, subleaf: u32) -> CpuidRegs {
            self.log.borrow_mut().push((leaf, subleaf));
            let mut r = self
                .leaves
                .get(&(leaf, subleaf))
                .copied()
                .unwrap_or(self.default_regs);
            if leaf == self.topo_leaf && subleaf == 0 {
                let current = self.pinned.get().trailing_zeros() as usize;
                if let Some(&edx) = self.per_cpu_edx.get(current) {
                    r.edx = edx;
                }
                if let Some(&ebx) = self.per_cpu_ebx.get(current) {
                    r.ebx = ebx;
                }
            }
            r
        }
    }

    /// Fake affinity controller sharing its mask cell with a [`FakeCpu`].
    pub(crate) struct FakeAffinity {
        mask: Rc<Cell<u64>>,
        pub history: Vec<u64>,
        /// 1-based index of a `set_affinity` call that should fail once.
        pub fail_on_call: Option<usize>,
        calls: usize,
    }

    impl FakeAffinity {
        pub fn new(cpu: &FakeCpu, initial: u64) -> Self {
            cpu.pinned.set(initial);
            Self {
                mask: Rc::clone(&cpu.pinned),
                history: Vec::new(),
                fail_on_call: None,
                calls: 0,
            }
        }

        pub fn current(&self) -> u64 {
            self.mask.get()
        }
    }

    impl AffinityController for FakeAffinity {
        fn set_affinity(&mut self, mask: u64) -> Result<u64, AffinityError> {
            self.calls += 1;
            if self.fail_on_call == Some(self.calls) {
                return Err(AffinityError::Unsupported);
            }
            let previous = self.mask.replace(mask);
            self.history.push(mask);
            Ok(previous)
        }
    }
}
