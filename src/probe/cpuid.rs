//! The identification primitive.
//!
//! A single opaque operation: given a leaf and sub-leaf index, return the
//! four 32-bit registers. Leaves the hardware does not implement read as
//! zero/reserved patterns, never as a failure; support is decided by the
//! highest-supported-leaf convention at the call sites.

use bytemuck::{Pod, Zeroable};

/// One CPUID result block.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct CpuidRegs {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

/// Source of identification data.
///
/// The decoders are written against this trait so tests can substitute
/// synthetic leaf tables for the executing processor.
pub trait CpuidSource {
    fn query(&self, leaf: u32, subleaf: u32) -> CpuidRegs;
}

/// CPUID issued on the executing processor.
///
/// Which processor that is depends on the calling thread's affinity mask,
/// which is exactly what the topology enumerator exploits.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostCpuid;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl CpuidSource for HostCpuid {
    fn query(&self, leaf: u32, subleaf: u32) -> CpuidRegs {
        #[cfg(target_arch = "x86")]
        use core::arch::x86::__cpuid_count;
        #[cfg(target_arch = "x86_64")]
        use core::arch::x86_64::__cpuid_count;

        // CPUID is unprivileged and defined for any leaf index.
        let r = unsafe { __cpuid_count(leaf, subleaf) };
        CpuidRegs {
            eax: r.eax,
            ebx: r.ebx,
            ecx: r.ecx,
            edx: r.edx,
        }
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
impl CpuidSource for HostCpuid {
    fn query(&self, _leaf: u32, _subleaf: u32) -> CpuidRegs {
        // No identification instruction: every leaf reads as zero and the
        // snapshot degrades to its defaults.
        CpuidRegs::default()
    }
}
