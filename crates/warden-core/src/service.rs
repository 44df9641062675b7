//! Trigger dispatcher
//!
//! Drains the trigger channel and runs one report per trigger, one at a
//! time. A stop request is only observed between runs.

use crate::orchestrator::ReportRunner;
use crate::ports::hub::{NotificationPort, StatePort};
use crate::scheduler::SchedulerError;
use crate::trigger::TriggerReceiver;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Runs reports for incoming triggers, serially
pub struct TriggerDispatcher<S, N>
where
    S: StatePort + 'static,
    N: NotificationPort + 'static,
{
    runner: Arc<ReportRunner<S, N>>,
    running: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
    /// Runs that returned a report outcome
    runs_completed: Arc<AtomicU64>,
    /// Runs that ended in a fault
    runs_failed: Arc<AtomicU64>,
}

impl<S, N> TriggerDispatcher<S, N>
where
    S: StatePort + 'static,
    N: NotificationPort + 'static,
{
    pub fn new(runner: Arc<ReportRunner<S, N>>) -> Self {
        Self {
            runner,
            running: Arc::new(AtomicBool::new(false)),
            stop_signal: Arc::new(Notify::new()),
            runs_completed: Arc::new(AtomicU64::new(0)),
            runs_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::SeqCst)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::SeqCst)
    }

    /// Spawns the dispatch loop on `receiver`
    ///
    /// The loop ends on [`Self::stop`] or when every sender is dropped.
    ///
    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if the dispatcher is already active
    pub fn start(&self, mut receiver: TriggerReceiver) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let runner = Arc::clone(&self.runner);
        let running = Arc::clone(&self.running);
        let stop_signal = Arc::clone(&self.stop_signal);
        let runs_completed = Arc::clone(&self.runs_completed);
        let runs_failed = Arc::clone(&self.runs_failed);

        tokio::spawn(async move {
            info!("Trigger dispatcher started");

            loop {
                let trigger = tokio::select! {
                    biased;
                    _ = stop_signal.notified() => {
                        info!("Received stop signal, shutting down dispatcher");
                        break;
                    }
                    received = receiver.recv() => match received {
                        Some(trigger) => trigger,
                        None => {
                            warn!("All trigger sources closed, dispatcher exiting");
                            break;
                        }
                    },
                };

                // Awaited outside the select so a stop never cancels a run
                match runner.run_and_report(&trigger).await {
                    Ok(_) => runs_completed.fetch_add(1, Ordering::SeqCst),
                    Err(_) => runs_failed.fetch_add(1, Ordering::SeqCst),
                };
            }

            running.store(false, Ordering::SeqCst);
            info!("Trigger dispatcher stopped");
        });

        Ok(())
    }

    /// Stops the dispatch loop after any in-flight run
    ///
    /// # Errors
    /// Returns `SchedulerError::NotRunning` if the dispatcher is not active
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping dispatcher...");
        self.stop_signal.notify_one();
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Ok(())
    }
}
