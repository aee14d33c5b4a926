//! Feature-word views and predicates.
//!
//! The snapshot stores each feature word verbatim; the `bitflags` types below
//! name the individual bits at their vendor-published positions, and every
//! `has_*` predicate is a single bit test against one fixed word.

use bitflags::bitflags;

use super::CpuCaps;

bitflags! {
    /// Leaf 1 EDX feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Leaf1Edx: u32 {
        const FPU = 1 << 0;
        const PSE = 1 << 3;
        const TSC = 1 << 4;
        const CMPXCHG8B = 1 << 8;
        const MMX = 1 << 23;
        const SSE = 1 << 25;
        const SSE2 = 1 << 26;
    }

    /// Leaf 1 ECX feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Leaf1Ecx: u32 {
        const SSE3 = 1 << 0;
        const SSSE3 = 1 << 9;
        const FMA3 = 1 << 12;
        const CMPXCHG16B = 1 << 13;
        const SSE41 = 1 << 19;
        const SSE42 = 1 << 20;
        const AES = 1 << 25;
        const AVX = 1 << 28;
        const F16C = 1 << 29;
        const RDRAND = 1 << 30;
    }

    /// Leaf 7 (sub-leaf 0) EBX feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Leaf7Ebx: u32 {
        const AVX2 = 1 << 5;
        const AVX512F = 1 << 16;
        const RDSEED = 1 << 18;
        const AVX512PF = 1 << 26;
        const AVX512ER = 1 << 27;
        const AVX512CD = 1 << 28;
    }

    /// Leaf 0x80000001 ECX feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ext1Ecx: u32 {
        const ABM = 1 << 5;
        const SSE4A = 1 << 6;
        const MISALIGN_SSE = 1 << 7;
        const FMA4 = 1 << 16;
        const TOPOLOGY_EXTENSIONS = 1 << 22;
    }

    /// Leaf 0x80000001 EDX feature bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ext1Edx: u32 {
        const MMX_EXT = 1 << 23;
        const THREEDNOW_EXT = 1 << 30;
        const THREEDNOW = 1 << 31;
    }
}

impl CpuCaps {
    pub fn leaf1_edx_flags(&self) -> Leaf1Edx {
        Leaf1Edx::from_bits_retain(self.leaf1_edx)
    }

    pub fn leaf1_ecx_flags(&self) -> Leaf1Ecx {
        Leaf1Ecx::from_bits_retain(self.leaf1_ecx)
    }

    pub fn leaf7_ebx_flags(&self) -> Leaf7Ebx {
        Leaf7Ebx::from_bits_retain(self.leaf7_ebx)
    }

    pub fn ext1_ecx_flags(&self) -> Ext1Ecx {
        Ext1Ecx::from_bits_retain(self.ext1_ecx)
    }

    pub fn ext1_edx_flags(&self) -> Ext1Edx {
        Ext1Edx::from_bits_retain(self.ext1_edx)
    }

    pub fn has_fpu(&self) -> bool {
        self.leaf1_edx_flags().contains(Leaf1Edx::FPU)
    }
    pub fn has_pse(&self) -> bool {
        self.leaf1_edx_flags().contains(Leaf1Edx::PSE)
    }
    pub fn has_tsc(&self) -> bool {
        self.leaf1_edx_flags().contains(Leaf1Edx::TSC)
    }
    pub fn has_cmpxchg8b(&self) -> bool {
        self.leaf1_edx_flags().contains(Leaf1Edx::CMPXCHG8B)
    }
    pub fn has_cmpxchg16b(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::CMPXCHG16B)
    }
    pub fn has_mmx(&self) -> bool {
        self.leaf1_edx_flags().contains(Leaf1Edx::MMX)
    }
    pub fn has_mmx_ext(&self) -> bool {
        self.ext1_edx_flags().contains(Ext1Edx::MMX_EXT)
    }
    pub fn has_3dnow(&self) -> bool {
        self.ext1_edx_flags().contains(Ext1Edx::THREEDNOW)
    }
    pub fn has_3dnow_ext(&self) -> bool {
        self.ext1_edx_flags().contains(Ext1Edx::THREEDNOW_EXT)
    }
    pub fn has_sse(&self) -> bool {
        self.leaf1_edx_flags().contains(Leaf1Edx::SSE)
    }
    pub fn has_sse2(&self) -> bool {
        self.leaf1_edx_flags().contains(Leaf1Edx::SSE2)
    }
    pub fn has_sse3(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::SSE3)
    }
    pub fn has_ssse3(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::SSSE3)
    }
    pub fn has_sse41(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::SSE41)
    }
    pub fn has_sse42(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::SSE42)
    }
    /// POPCNT and LZCNT.
    pub fn has_abm(&self) -> bool {
        self.ext1_ecx_flags().contains(Ext1Ecx::ABM)
    }
    pub fn has_sse4a(&self) -> bool {
        self.ext1_ecx_flags().contains(Ext1Ecx::SSE4A)
    }
    pub fn has_misalign_sse(&self) -> bool {
        self.ext1_ecx_flags().contains(Ext1Ecx::MISALIGN_SSE)
    }
    pub fn has_aes(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::AES)
    }
    pub fn has_avx(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::AVX)
    }
    pub fn has_avx2(&self) -> bool {
        self.leaf7_ebx_flags().contains(Leaf7Ebx::AVX2)
    }
    pub fn has_avx512f(&self) -> bool {
        self.leaf7_ebx_flags().contains(Leaf7Ebx::AVX512F)
    }
    pub fn has_avx512pf(&self) -> bool {
        self.leaf7_ebx_flags().contains(Leaf7Ebx::AVX512PF)
    }
    pub fn has_avx512er(&self) -> bool {
        self.leaf7_ebx_flags().contains(Leaf7Ebx::AVX512ER)
    }
    pub fn has_avx512cd(&self) -> bool {
        self.leaf7_ebx_flags().contains(Leaf7Ebx::AVX512CD)
    }
    pub fn has_f16c(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::F16C)
    }
    pub fn has_rdrand(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::RDRAND)
    }
    pub fn has_rdseed(&self) -> bool {
        self.leaf7_ebx_flags().contains(Leaf7Ebx::RDSEED)
    }
    pub fn has_fma3(&self) -> bool {
        self.leaf1_ecx_flags().contains(Leaf1Ecx::FMA3)
    }
    pub fn has_fma4(&self) -> bool {
        self.ext1_ecx_flags().contains(Ext1Ecx::FMA4)
    }

    /// Leaf 0x8000001E is architecturally undefined without this bit.
    pub(crate) fn has_topology_extensions(&self) -> bool {
        self.ext1_ecx_flags().contains(Ext1Ecx::TOPOLOGY_EXTENSIONS)
    }

    /// Every known feature with its support status, for report/table output.
    pub fn feature_report(&self) -> Vec<(&'static str, bool)> {
        let mut rows = Vec::new();
        for (name, flag) in Leaf1Edx::all().iter_names() {
            rows.push((name, self.leaf1_edx_flags().contains(flag)));
        }
        for (name, flag) in Leaf1Ecx::all().iter_names() {
            rows.push((name, self.leaf1_ecx_flags().contains(flag)));
        }
        for (name, flag) in Leaf7Ebx::all().iter_names() {
            rows.push((name, self.leaf7_ebx_flags().contains(flag)));
        }
        for (name, flag) in Ext1Ecx::all().iter_names() {
            if flag == Ext1Ecx::TOPOLOGY_EXTENSIONS {
                continue; // internal gate, not an instruction-set feature
            }
            rows.push((name, self.ext1_ecx_flags().contains(flag)));
        }
        for (name, flag) in Ext1Edx::all().iter_names() {
            rows.push((name, self.ext1_edx_flags().contains(flag)));
        }
        rows
    }
}
