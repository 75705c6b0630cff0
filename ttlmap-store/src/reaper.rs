//! Periodic background sweeper.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, trace};

use ttlmap_core::constants::{FAR_FUTURE, REAPER_THREAD_NAME};
use ttlmap_core::error::Result;

#[derive(Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Background thread calling a sweep function at a fixed cadence.
///
/// The sweep returns `false` when its target is gone, which ends the thread.
/// Dropping the reaper stops and joins the thread.
pub struct Reaper {
    signal: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Reaper {
    /// Starts a reaper that runs `sweep` every `interval`.
    pub fn spawn<F>(interval: Duration, mut sweep: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let interval = interval.min(FAR_FUTURE);
        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);

        let handle = thread::Builder::new()
            .name(REAPER_THREAD_NAME.into())
            .spawn(move || {
                debug!(?interval, "Reaper started");
                let mut stopped = thread_signal.stopped.lock();
                loop {
                    let wake_at = Instant::now() + interval;
                    while !*stopped {
                        if thread_signal.wake.wait_until(&mut stopped, wake_at).timed_out() {
                            break;
                        }
                    }
                    if *stopped {
                        break;
                    }
                    let alive = MutexGuard::unlocked(&mut stopped, &mut sweep);
                    if !alive {
                        trace!("Reaper target dropped");
                        break;
                    }
                }
                debug!("Reaper stopped");
            })?;

        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Returns true while the background thread is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stops the thread and waits for an in-progress sweep to finish.
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        {
            let mut stopped = self.signal.stopped.lock();
            *stopped = true;
            self.signal.wake.notify_all();
        }
        if let Some(handle) = self.handle.take() {
            // A removal callback running on the reaper thread may drop the
            // last handle to its store; joining ourselves would deadlock.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Reaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaper")
            .field("running", &self.is_running())
            .finish()
    }
}
