//! Platform cycle counters.
//!
//! Provides the counter read and the serializing fence the sampler places
//! in front of every read:
//! - x86_64: `mfence` + `rdtsc`
//! - aarch64: `dsb sy` + `isb; mrs cntvct_el0`
//! - Fallback: `std::time::Instant` nanoseconds

use std::hint::black_box as std_black_box;
use std::sync::atomic::{compiler_fence, Ordering};

/// Wrapper around `std::hint::black_box`.
///
/// Keeps a primitive's witness value alive so the measured body is not
/// optimized away or moved across the counter reads.
#[inline]
pub fn black_box<T>(x: T) -> T {
    std_black_box(x)
}

/// A monotonic per-core tick source.
///
/// Contract: `read()` never goes backwards on a core, and `fence()` completes
/// all earlier memory operations and instructions before it returns.
pub trait CycleCounter {
    /// Full memory/execution fence.
    fn fence(&self);

    /// Current tick count.
    fn read(&self) -> u64;

    /// Counter name for diagnostics and metadata.
    fn name(&self) -> &'static str;
}

impl<C: CycleCounter + ?Sized> CycleCounter for &C {
    #[inline]
    fn fence(&self) {
        (**self).fence()
    }

    #[inline]
    fn read(&self) -> u64 {
        (**self).read()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Full memory fence.
#[inline]
pub fn serialize() {
    compiler_fence(Ordering::SeqCst);

    #[cfg(target_arch = "x86_64")]
    unsafe {
        std::arch::asm!("mfence", options(nostack, preserves_flags));
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        std::arch::asm!("dsb sy", options(nostack, preserves_flags));
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    std::sync::atomic::fence(Ordering::SeqCst);

    compiler_fence(Ordering::SeqCst);
}

/// Read the hardware cycle counter.
///
/// On x86_64 this is `rdtsc`; on aarch64 `isb; mrs cntvct_el0`. Other
/// platforms fall back to nanoseconds since the first call.
#[inline]
pub fn read_cycle_counter() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        rdtsc_x86_64()
    }

    #[cfg(target_arch = "aarch64")]
    {
        cntvct_aarch64()
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        instant_fallback()
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
fn rdtsc_x86_64() -> u64 {
    compiler_fence(Ordering::SeqCst);

    let cycles: u64;
    unsafe {
        std::arch::asm!(
            "rdtsc",
            "shl rdx, 32",
            "or rax, rdx",
            out("rax") cycles,
            out("rdx") _,
            options(nostack, nomem),
        );
    }

    compiler_fence(Ordering::SeqCst);
    cycles
}

#[cfg(target_arch = "aarch64")]
#[inline]
fn cntvct_aarch64() -> u64 {
    compiler_fence(Ordering::SeqCst);

    let ticks: u64;
    unsafe {
        std::arch::asm!(
            "isb",
            "mrs {}, cntvct_el0",
            out(reg) ticks,
            options(nostack, nomem),
        );
    }

    compiler_fence(Ordering::SeqCst);
    ticks
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline]
fn instant_fallback() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();

    let start = START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

/// The platform's hardware counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareCounter;

impl HardwareCounter {
    /// Create a handle to the hardware counter.
    pub fn new() -> Self {
        Self
    }
}

impl CycleCounter for HardwareCounter {
    #[inline]
    fn fence(&self) {
        serialize();
    }

    #[inline]
    fn read(&self) -> u64 {
        read_cycle_counter()
    }

    fn name(&self) -> &'static str {
        #[cfg(target_arch = "x86_64")]
        {
            "rdtsc"
        }
        #[cfg(target_arch = "aarch64")]
        {
            "cntvct_el0"
        }
        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            "Instant"
        }
    }
}
