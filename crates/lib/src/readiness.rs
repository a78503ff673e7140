//! Readiness monitor: polls the assistant's health endpoint until it reports "ok".
//!
//! `Checking -> Ready` is terminal; any failed or negative probe stays in `Checking` and retries
//! after a fixed interval, forever. `stop()` (or dropping the monitor) ends polling early and
//! moves the monitor to `Stopped`; a probe that lands after that cannot change the state.

use crate::assistant::AssistantBackend;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Probing; the assistant has not yet confirmed it can serve requests.
    Checking,
    /// A probe succeeded. Terminal.
    Ready,
    /// Stopped before the assistant became ready. Terminal.
    Stopped,
}

pub struct ReadinessMonitor {
    state: Arc<watch::Sender<Readiness>>,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReadinessMonitor {
    /// Spawn the polling loop on the current tokio runtime. The first probe is issued immediately.
    pub fn start(backend: Arc<dyn AssistantBackend>, interval: Duration) -> Self {
        let state = Arc::new(watch::Sender::new(Readiness::Checking));
        let running = Arc::new(AtomicBool::new(true));
        log::debug!("readiness: polling health every {:?}", interval);
        let task = tokio::spawn(run_health_loop(
            backend,
            interval,
            Arc::clone(&running),
            Arc::clone(&state),
        ));
        Self {
            state,
            running,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn state(&self) -> Readiness {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == Readiness::Ready
    }

    pub fn is_checking(&self) -> bool {
        self.state() == Readiness::Checking
    }

    /// Wait until the monitor leaves `Checking`. Returns true if it became ready, false if stopped.
    pub async fn wait_ready(&self) -> bool {
        let mut rx = self.state.subscribe();
        // Bound so the borrowed `Ref` is dropped before `rx`.
        #[allow(clippy::let_and_return)]
        let ready = match rx.wait_for(|s| *s != Readiness::Checking).await {
            Ok(s) => *s == Readiness::Ready,
            Err(_) => false,
        };
        ready
    }

    /// Stop polling. A pending probe or retry sleep is cancelled. No-op once ready.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            task.abort();
        }
        let stopped = self.state.send_if_modified(|s| {
            if *s == Readiness::Checking {
                *s = Readiness::Stopped;
                true
            } else {
                false
            }
        });
        if stopped {
            log::debug!("readiness: stopped before assistant became ready");
        }
    }
}

impl Drop for ReadinessMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_health_loop(
    backend: Arc<dyn AssistantBackend>,
    interval: Duration,
    running: Arc<AtomicBool>,
    state: Arc<watch::Sender<Readiness>>,
) {
    let mut probes: u64 = 0;
    while running.load(Ordering::SeqCst) {
        probes += 1;
        let ready = match backend.health().await {
            Ok(health) if health.is_ok() => true,
            Ok(health) => {
                log::debug!("readiness: probe {} reported status {:?}", probes, health.status);
                false
            }
            Err(e) => {
                log::debug!("readiness: probe {} failed: {}", probes, e);
                false
            }
        };
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if ready {
            let became_ready = state.send_if_modified(|s| {
                if *s == Readiness::Checking {
                    *s = Readiness::Ready;
                    true
                } else {
                    false
                }
            });
            if became_ready {
                log::info!("readiness: assistant ready after {} probe(s)", probes);
            }
            running.store(false, Ordering::SeqCst);
            return;
        }
        tokio::time::sleep(interval).await;
    }
    log::debug!("readiness: health loop stopped");
}
