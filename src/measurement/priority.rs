//! Process priority elevation for reduced preemption during calibration.
//!
//! Best effort: raises the process to the most favorable nice value and
//! falls back to normal priority when privileges are insufficient. Timing
//! gets noisier without it, but the calibration still runs.
//!
//! # Example
//!
//! ```ignore
//! use rewind_calibrate::measurement::{PriorityGuard, PriorityResult};
//!
//! let _guard = match PriorityGuard::try_elevate() {
//!     PriorityResult::Elevated(guard) => Some(guard),
//!     PriorityResult::NotElevated { reason } => {
//!         tracing::warn!("priority -20 failed: {}", reason);
//!         None
//!     }
//! };
//! // ... trial loop ...
//! ```

/// Most favorable nice value.
pub const TARGET_NICE: i32 = -20;

/// Result of attempting to elevate process priority.
#[derive(Debug)]
pub enum PriorityResult {
    /// Priority raised; keep the guard alive for the duration of the run.
    Elevated(PriorityGuard),
    /// Priority unchanged; the run continues at normal priority.
    NotElevated {
        /// Human-readable explanation.
        reason: String,
    },
}

/// RAII guard that restores the original nice value when dropped.
#[derive(Debug)]
pub struct PriorityGuard {
    original_nice: i32,
}

impl PriorityGuard {
    /// Try to set the process nice value to [`TARGET_NICE`].
    pub fn try_elevate() -> PriorityResult {
        #[cfg(unix)]
        {
            let original_nice = match current_nice() {
                Ok(n) => n,
                Err(e) => {
                    return PriorityResult::NotElevated {
                        reason: format!("getpriority failed: {}", e),
                    };
                }
            };

            match set_nice(TARGET_NICE) {
                Ok(()) => {
                    tracing::debug!("Raised nice value from {} to {}", original_nice, TARGET_NICE);
                    PriorityResult::Elevated(PriorityGuard { original_nice })
                }
                Err(e) => PriorityResult::NotElevated {
                    reason: format!("priority {} failed: {}", TARGET_NICE, e),
                },
            }
        }

        #[cfg(not(unix))]
        {
            PriorityResult::NotElevated {
                reason: "process priority elevation not supported on this platform".to_string(),
            }
        }
    }

    /// The nice value restored on drop.
    pub fn original_nice(&self) -> i32 {
        self.original_nice
    }
}

impl Drop for PriorityGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        match set_nice(self.original_nice) {
            Ok(()) => tracing::debug!("Restored nice value to {}", self.original_nice),
            Err(e) => tracing::warn!("Failed to restore nice value: {}", e),
        }
    }
}

#[cfg(unix)]
fn current_nice() -> std::io::Result<i32> {
    // getpriority may legitimately return -1, so errno must be cleared first
    #[cfg(target_os = "linux")]
    unsafe {
        *libc::__errno_location() = 0;
    }

    let nice = unsafe { libc::getpriority(libc::PRIO_PROCESS, 0) };
    if nice == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error().unwrap_or(0) != 0 {
            return Err(err);
        }
    }
    Ok(nice)
}

#[cfg(unix)]
fn set_nice(value: i32) -> std::io::Result<()> {
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, value) };
    if rc < 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevate_and_restore() {
        // Single test: the nice value is process-wide, parallel tests would race
        match PriorityGuard::try_elevate() {
            PriorityResult::Elevated(guard) => {
                #[cfg(unix)]
                let original = guard.original_nice();
                #[cfg(unix)]
                assert_eq!(current_nice().expect("getpriority"), TARGET_NICE);
                drop(guard);
                #[cfg(unix)]
                assert_eq!(current_nice().expect("getpriority"), original);
            }
            PriorityResult::NotElevated { reason } => {
                assert!(!reason.is_empty());
            }
        }
    }
}
