//! Background maintenance
//!
//! Backends that accumulate dead entries want a periodic purge. The
//! loop here runs on a plain thread and calls
//! [`CacheProxy::purge`](crate::proxy::CacheProxy::purge) at a fixed
//! interval until its handle is stopped or dropped. Registering the
//! purge with a host scheduler instead is the application's business;
//! this is the in-process variant.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::lock;
use crate::proxy::CacheProxy;

const SOURCE: &str = "maintenance";

struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Controls a running purge loop
///
/// Dropping the handle stops the loop and joins the thread.
pub struct PurgeLoopHandle {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<()>>,
}

impl PurgeLoopHandle {
    /// Stop the loop and wait for the thread to finish
    pub fn stop(mut self) {
        self.signal_stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Purge loop thread panicked");
            }
        }
    }

    fn signal_stop(&self) {
        let mut stopped = lock::mutex_lock(&self.signal.stopped, SOURCE, "signal_stop");
        *stopped = true;
        self.signal.wake.notify_all();
    }
}

impl Drop for PurgeLoopHandle {
    fn drop(&mut self) {
        self.signal_stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Purge both tiers of `proxy` every `interval` until stopped
pub fn spawn_purge_loop(proxy: Arc<CacheProxy>, interval: Duration) -> PurgeLoopHandle {
    let signal = Arc::new(StopSignal {
        stopped: Mutex::new(false),
        wake: Condvar::new(),
    });
    let thread_signal = Arc::clone(&signal);

    info!(?interval, "Starting cache purge loop");

    let thread = thread::spawn(move || loop {
        let guard = match thread_signal.stopped.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *guard {
            break;
        }
        let (guard, timeout) = match thread_signal.wake.wait_timeout(guard, interval) {
            Ok(pair) => pair,
            Err(poisoned) => poisoned.into_inner(),
        };
        let stop = *guard;
        drop(guard);
        if stop {
            break;
        }
        if !timeout.timed_out() {
            // Spurious wakeup; the interval has not elapsed yet.
            continue;
        }

        if proxy.purge() {
            debug!("Cache purge pass completed");
        } else {
            warn!("Cache purge pass reported failures");
        }
    });

    PurgeLoopHandle {
        signal,
        thread: Some(thread),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;

    #[test]
    fn test_purge_loop_runs_and_stops() {
        let proxy = Arc::new(CacheProxy::from_config(&ProxyConfig::ephemeral()));
        let handle = spawn_purge_loop(Arc::clone(&proxy), Duration::from_millis(10));

        thread::sleep(Duration::from_millis(50));
        handle.stop();
    }

    #[test]
    fn test_stop_does_not_wait_out_the_interval() {
        let proxy = Arc::new(CacheProxy::from_config(&ProxyConfig::ephemeral()));
        let handle = spawn_purge_loop(proxy, Duration::from_secs(3600));

        let started = std::time::Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_dropping_the_handle_stops_the_loop() {
        let proxy = Arc::new(CacheProxy::from_config(&ProxyConfig::ephemeral()));
        let handle = spawn_purge_loop(proxy, Duration::from_secs(3600));

        let started = std::time::Instant::now();
        drop(handle);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
