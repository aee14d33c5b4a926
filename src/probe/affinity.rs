//! Thread-affinity control, used as a measurement tool.
//!
//! The topology enumerator pins the calling thread to one logical processor
//! at a time so the identification primitive reports that processor's
//! registers. The controller mutates per-thread kernel state and is therefore
//! not thread-safe: a topology query must own its OS thread for the whole
//! save/pin/restore sequence, and nothing else may change that thread's
//! affinity concurrently.

use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AffinityError {
    #[error("affinity syscall failed: {0}")]
    Os(#[from] std::io::Error),
    #[error("thread affinity control is not available on this platform")]
    Unsupported,
}

/// Read-modify access to the calling thread's allowed-processor mask.
///
/// The mask is fixed at 64 bits; machines with more logical processors than
/// mask bits are out of scope and get sampled only up to processor 63.
pub trait AffinityController {
    /// Restrict the calling thread to the processors set in `mask`, returning
    /// the mask that was in effect immediately before the call.
    fn set_affinity(&mut self, mask: u64) -> Result<u64, AffinityError>;
}

/// The operating system's scheduling-affinity API.
#[derive(Debug, Default)]
pub struct OsAffinity;

#[cfg(target_os = "linux")]
impl AffinityController for OsAffinity {
    fn set_affinity(&mut self, mask: u64) -> Result<u64, AffinityError> {
        let tid = unsafe { libc::gettid() };
        let set_size = std::mem::size_of::<libc::cpu_set_t>();

        let mut current: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        if unsafe { libc::sched_getaffinity(tid, set_size, &mut current) } != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        let mut previous = 0u64;
        for cpu in 0..64 {
            if unsafe { libc::CPU_ISSET(cpu, &current) } {
                previous |= 1 << cpu;
            }
        }

        let mut wanted: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        for cpu in 0..64 {
            if mask & (1 << cpu) != 0 {
                unsafe { libc::CPU_SET(cpu, &mut wanted) };
            }
        }
        if unsafe { libc::sched_setaffinity(tid, set_size, &wanted) } != 0 {
            return Err(std::io::Error::last_os_error().into());
        }

        Ok(previous)
    }
}

#[cfg(not(target_os = "linux"))]
impl AffinityController for OsAffinity {
    fn set_affinity(&mut self, _mask: u64) -> Result<u64, AffinityError> {
        // Topology refinement is skipped and the seeded estimates stand.
        Err(AffinityError::Unsupported)
    }
}

/// Scoped pin: captures the pre-existing mask on the first pin and restores
/// it when dropped, whichever way the sampling loop exits.
pub struct AffinityGuard<'a, A: AffinityController> {
    controller: &'a mut A,
    previous: u64,
}

impl<'a, A: AffinityController> AffinityGuard<'a, A> {
    pub fn pin(controller: &'a mut A, mask: u64) -> Result<Self, AffinityError> {
        let previous = controller.set_affinity(mask)?;
        Ok(Self {
            controller,
            previous,
        })
    }

    pub fn repin(&mut self, mask: u64) -> Result<(), AffinityError> {
        self.controller.set_affinity(mask)?;
        Ok(())
    }
}

impl<A: AffinityController> Drop for AffinityGuard<'_, A> {
    fn drop(&mut self) {
        // Restoration failure is an accepted platform risk; it is logged but
        // never surfaced to the topology query.
        if let Err(err) = self.controller.set_affinity(self.previous) {
            warn!(error = %err, "failed to restore thread affinity mask");
        }
    }
}
