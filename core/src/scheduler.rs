//! Cancellable task scope for everything a session runs in the background.
//!
//! RULE: Every periodic task is spawned through a TaskScope. Ending the
//! session cancels the scope, which signals every task and aborts any
//! that are still parked, so no timer outlives its profile.

use crate::{clock::WallClock, game::SessionState, tasks::ClockTask};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct TaskScope {
    shutdown:  watch::Sender<bool>,
    handles:   Vec<(&'static str, JoinHandle<()>)>,
    cancelled: bool,
}

impl Default for TaskScope {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScope {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            shutdown,
            handles: Vec::new(),
            cancelled: false,
        }
    }

    /// Run `task` against `state` until the scope is cancelled. The task
    /// sleeps for whatever delay its previous run asked for.
    pub fn spawn_clock_task(
        &mut self,
        mut task: Box<dyn ClockTask>,
        state: Arc<Mutex<SessionState>>,
        clock: Arc<dyn WallClock>,
    ) {
        let name = task.name();
        let mut shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            let mut delay = task.initial_delay();
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                if *shutdown.borrow() {
                    break;
                }
                let now = clock.now_ms();
                delay = match state.lock() {
                    Ok(mut guard) => task.run(&mut guard, now),
                    Err(_) => {
                        log::warn!("clock task '{name}': session state poisoned");
                        break;
                    }
                };
                delay = delay.max(Duration::from_millis(1));
            }
            log::debug!("clock task '{name}' stopped");
        });
        self.handles.push((name, handle));
    }

    /// A receiver that turns true when the scope is cancelled. Work
    /// spawned outside the scope, such as background pushes, watches it.
    pub fn signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Names of tasks that have not finished.
    pub fn running(&self) -> Vec<&'static str> {
        self.handles
            .iter()
            .filter(|(_, h)| !h.is_finished())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Signal every task and abort the ones still running. Idempotent.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        let _ = self.shutdown.send(true);
        for (name, handle) in self.handles.drain(..) {
            handle.abort();
            log::debug!("clock task '{name}' cancelled");
        }
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.cancel();
    }
}
