//! Runtime CPU capability snapshots.
//!
//! Queries the processor identification facility (CPUID) once, at startup,
//! and produces an immutable [`CpuCaps`] record: vendor, model signature,
//! instruction-set feature bits, cache geometry and core/thread topology.
//! Dispatch code (SIMD kernel selection, codec paths) reads the snapshot to
//! decide which implementations are safe to run.
//!
//! Unsupported identification leaves are never errors: the affected fields
//! stay at their zero/default values and probing continues.

pub mod caps;
pub mod ffi;
pub mod probe;

pub use caps::{CacheLevel, CpuCaps, Signature, Topology, Vendor};
pub use probe::{probe, probe_with};
