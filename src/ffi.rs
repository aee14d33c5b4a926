//! C ABI for callers outside Rust.
//!
//! Mirrors the classic capability-library contract: one call fills a flat,
//! caller-owned record. The only failure is a null destination.

use std::os::raw::c_int;

use crate::caps::{CacheLevel, CpuCaps, Vendor, BRAND_LEN, MAX_LOGICAL_CPUS, VENDOR_LEN};
use crate::probe;

pub const CPUCAPS_OK: c_int = 0;
pub const CPUCAPS_ERR_FAILED: c_int = -1;
pub const CPUCAPS_ERR_INVALID_PARAM: c_int = -2;

/// Flat snapshot record. Strings are NUL-terminated; absent cache levels
/// read as all zeroes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CpuCapsRaw {
    pub vendor: [u8; VENDOR_LEN + 1],
    pub brand: [u8; BRAND_LEN + 1],

    pub is_intel: u8,
    pub is_amd: u8,

    pub stepping: u8,
    pub model: u8,
    pub family: u8,
    pub cpu_type: u8,
    pub ext_model: u8,
    pub ext_family: u8,

    pub l1d_line_size: u32,
    pub l1d_size_kib: u32,
    pub l1d_assoc: u32,
    pub l1i_line_size: u32,
    pub l1i_size_kib: u32,
    pub l1i_assoc: u32,
    pub l2_line_size: u32,
    pub l2_size_kib: u32,
    pub l2_assoc: u32,
    pub l3_line_size: u32,
    pub l3_size_kib: u32,
    pub l3_assoc: u32,

    pub func1_ecx: u32,
    pub func1_edx: u32,
    pub func7_ebx: u32,
    pub func7_ecx: u32,
    pub func80000001_ecx: u32,
    pub func80000001_edx: u32,

    pub physical_cores: u32,
    pub logical_cores: u32,
    pub core_ids: [u8; MAX_LOGICAL_CPUS],
}

impl From<&CpuCaps> for CpuCapsRaw {
    fn from(caps: &CpuCaps) -> Self {
        let unpack = |level: Option<CacheLevel>| {
            let l = level.unwrap_or(CacheLevel {
                line_size_bytes: 0,
                size_kib: 0,
                associativity_ways: 0,
            });
            (l.line_size_bytes, l.size_kib, l.associativity_ways)
        };
        let (l1d_line_size, l1d_size_kib, l1d_assoc) = unpack(caps.l1d);
        let (l1i_line_size, l1i_size_kib, l1i_assoc) = unpack(caps.l1i);
        let (l2_line_size, l2_size_kib, l2_assoc) = unpack(caps.l2);
        let (l3_line_size, l3_size_kib, l3_assoc) = unpack(caps.l3);

        let mut vendor = [0u8; VENDOR_LEN + 1];
        vendor[..VENDOR_LEN].copy_from_slice(&caps.vendor);
        let mut brand = [0u8; BRAND_LEN + 1];
        brand[..BRAND_LEN].copy_from_slice(&caps.brand);

        let mut core_ids = [0u8; MAX_LOGICAL_CPUS];
        let sampled = caps.topology.core_ids();
        core_ids[..sampled.len()].copy_from_slice(sampled);

        Self {
            vendor,
            brand,
            is_intel: (caps.vendor_kind == Vendor::Intel) as u8,
            is_amd: (caps.vendor_kind == Vendor::Amd) as u8,
            stepping: caps.signature.stepping,
            model: caps.signature.model,
            family: caps.signature.family,
            cpu_type: caps.signature.cpu_type,
            ext_model: caps.signature.ext_model,
            ext_family: caps.signature.ext_family,
            l1d_line_size,
            l1d_size_kib,
            l1d_assoc,
            l1i_line_size,
            l1i_size_kib,
            l1i_assoc,
            l2_line_size,
            l2_size_kib,
            l2_assoc,
            l3_line_size,
            l3_size_kib,
            l3_assoc,
            func1_ecx: caps.leaf1_ecx,
            func1_edx: caps.leaf1_edx,
            func7_ebx: caps.leaf7_ebx,
            func7_ecx: caps.leaf7_ecx,
            func80000001_ecx: caps.ext1_ecx,
            func80000001_edx: caps.ext1_edx,
            physical_cores: caps.topology.physical_cores,
            logical_cores: caps.topology.logical_cores,
            core_ids,
        }
    }
}

/// Probe the host processor and write the snapshot to `out`.
///
/// Returns `CPUCAPS_ERR_INVALID_PARAM` if and only if `out` is null; every
/// other path succeeds, with unsupported leaves degrading to zeroed fields.
///
/// # Safety
///
/// `out` must be null or valid for writing one `CpuCapsRaw`.
#[no_mangle]
pub unsafe extern "C" fn cpucaps_get_caps(out: *mut CpuCapsRaw) -> c_int {
    if out.is_null() {
        return CPUCAPS_ERR_INVALID_PARAM;
    }
    let caps = probe::probe();
    unsafe { out.write(CpuCapsRaw::from(&caps)) };
    CPUCAPS_OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_destination_is_the_only_error() {
        let rc = unsafe { cpucaps_get_caps(std::ptr::null_mut()) };
        assert_eq!(rc, CPUCAPS_ERR_INVALID_PARAM);
    }

    #[test]
    fn valid_destination_succeeds() {
        let mut raw = std::mem::MaybeUninit::<CpuCapsRaw>::uninit();
        let rc = unsafe { cpucaps_get_caps(raw.as_mut_ptr()) };
        assert_eq!(rc, CPUCAPS_OK);

        let raw = unsafe { raw.assume_init() };
        assert!(raw.logical_cores >= raw.physical_cores);
        assert!(raw.physical_cores >= 1);
        assert_eq!(raw.vendor[VENDOR_LEN], 0);
        assert_eq!(raw.brand[BRAND_LEN], 0);
        // At most one vendor flag set.
        assert!(raw.is_intel + raw.is_amd <= 1);
    }

    #[test]
    fn raw_record_flattens_the_snapshot() {
        let mut caps = CpuCaps::default();
        caps.l2 = Some(CacheLevel {
            line_size_bytes: 64,
            size_kib: 512,
            associativity_ways: 8,
        });
        caps.leaf1_edx = 0xDEAD_BEEF;

        let raw = CpuCapsRaw::from(&caps);
        assert_eq!(raw.l2_size_kib, 512);
        assert_eq!(raw.l3_size_kib, 0);
        assert_eq!(raw.func1_edx, 0xDEAD_BEEF);
        assert_eq!(raw.is_intel, 0);
        assert_eq!(raw.is_amd, 0);
    }
}
