//! Software free-running counter.
//!
//! On cores whose hardware counter is too coarse or not ordered with respect
//! to the surrounding loads (e.g. `cntvct_el0` on most ARM parts), a sibling
//! thread increments a shared cell in a tight loop and the sampler reads that
//! cell instead.
//!
//! Single writer, any number of readers, `Relaxed` on both sides. The value
//! is only compared against itself, so "approximately monotonic" is enough.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use super::timer::{serialize, CycleCounter};

/// How often (in increments) the writer polls the stop flag.
const STOP_POLL_MASK: u64 = 0xFFF;

/// Handle to a running counter thread.
///
/// The thread is stopped and joined on drop.
pub struct CounterThread {
    counter: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CounterThread {
    /// Spawn the counter thread and wait until it has started counting.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn() -> std::io::Result<Self> {
        let counter = Arc::new(AtomicU64::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let writer = Arc::clone(&counter);
        let stop_flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("rewind-counter".to_string())
            .spawn(move || count(&writer, &stop_flag))?;

        tracing::info!("Waiting for the counter thread...");
        while counter.load(Ordering::Relaxed) == 0 {
            std::hint::spin_loop();
        }
        tracing::info!("Counter thread running: {}", counter.load(Ordering::Relaxed));

        Ok(Self {
            counter,
            stop,
            handle: Some(handle),
        })
    }
}

fn count(counter: &AtomicU64, stop: &AtomicBool) {
    let mut local: u64 = 0;
    loop {
        local = local.wrapping_add(1);
        counter.store(local, Ordering::Relaxed);
        if local & STOP_POLL_MASK == 0 && stop.load(Ordering::Relaxed) {
            break;
        }
    }
}

impl CycleCounter for CounterThread {
    #[inline]
    fn fence(&self) {
        serialize();
    }

    #[inline]
    fn read(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    fn name(&self) -> &'static str {
        "counter-thread"
    }
}

impl Drop for CounterThread {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Counter thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for CounterThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CounterThread")
            .field("value", &self.counter.load(Ordering::Relaxed))
            .field("running", &self.handle.is_some())
            .finish()
    }
}
