//! Polling state watcher
//!
//! Reads each watched entity on a fixed interval and calls its handler when
//! the state value differs from the previous poll. The first successful read
//! of an entity only records a baseline.

use crate::config::Config;
use crate::ports::hub::StatePort;
use crate::scheduler::SchedulerError;
use crate::trigger::{ButtonPressHandler, StateChangeHandler, TriggerSender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

#[derive(Clone)]
struct Watch {
    entity_id: String,
    handler: Arc<dyn StateChangeHandler>,
}

/// Last seen state per entity; `None` when the hub did not know the entity
type Baseline = HashMap<String, Option<String>>;

/// Watches entities for state changes by polling the hub
pub struct StateWatcher<S>
where
    S: StatePort + 'static,
{
    state_port: Arc<S>,
    interval: Duration,
    watches: Vec<Watch>,
    baseline: Arc<Mutex<Baseline>>,
    running: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
}

impl<S> StateWatcher<S>
where
    S: StatePort + 'static,
{
    pub fn new(state_port: Arc<S>, interval: Duration) -> Self {
        Self {
            state_port,
            interval,
            watches: Vec::new(),
            baseline: Arc::new(Mutex::new(HashMap::new())),
            running: Arc::new(AtomicBool::new(false)),
            stop_signal: Arc::new(Notify::new()),
        }
    }

    /// Registers `handler` for state changes of `entity_id`
    pub fn watch(&mut self, entity_id: impl Into<String>, handler: Arc<dyn StateChangeHandler>) {
        let entity_id = entity_id.into();
        info!(entity_id = %entity_id, "Watching entity for state changes");
        self.watches.push(Watch { entity_id, handler });
    }

    /// Entity ids currently registered, in registration order
    pub fn watched_entities(&self) -> Vec<&str> {
        self.watches.iter().map(|w| w.entity_id.as_str()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Polls every watched entity once
    pub async fn poll_once(&self) {
        Self::poll_watches(self.state_port.as_ref(), &self.watches, &self.baseline).await;
    }

    async fn poll_watches(state_port: &S, watches: &[Watch], baseline: &Mutex<Baseline>) {
        for watch in watches {
            let current = match state_port.get_state(&watch.entity_id).await {
                Ok(state) => state.map(|s| s.state),
                Err(e) => {
                    warn!(entity_id = %watch.entity_id, error = %e, "Failed to poll entity");
                    continue;
                }
            };

            let previous = {
                let mut seen = match baseline.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                seen.insert(watch.entity_id.clone(), current.clone())
            };

            match (previous, current) {
                (None, _) => debug!(entity_id = %watch.entity_id, "Baseline recorded"),
                (Some(old), Some(new)) if old.as_deref() != Some(new.as_str()) => {
                    watch
                        .handler
                        .on_state_change(&watch.entity_id, old.as_deref(), &new);
                }
                (Some(Some(_)), None) => {
                    warn!(entity_id = %watch.entity_id, "Watched entity disappeared from hub");
                }
                _ => {}
            }
        }
    }

    /// Spawns the polling task
    ///
    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if the watcher is already active
    pub fn start(&self) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let state_port = Arc::clone(&self.state_port);
        let watches = self.watches.clone();
        let baseline = Arc::clone(&self.baseline);
        let interval = self.interval;
        let running = Arc::clone(&self.running);
        let stop_signal = Arc::clone(&self.stop_signal);

        tokio::spawn(async move {
            info!(?interval, entities = watches.len(), "State watcher started");

            loop {
                Self::poll_watches(state_port.as_ref(), &watches, &baseline).await;

                tokio::select! {
                    _ = stop_signal.notified() => {
                        info!("Received stop signal, shutting down state watcher");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("State watcher stopped");
        });

        Ok(())
    }

    /// Stops the polling task and waits for it to exit
    ///
    /// # Errors
    /// Returns `SchedulerError::NotRunning` if the watcher is not active
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        self.stop_signal.notify_one();
        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Ok(())
    }
}

/// Builds the watcher for the configured helper and trigger buttons
pub fn build_watcher<S>(config: &Config, state_port: Arc<S>, sender: TriggerSender) -> StateWatcher<S>
where
    S: StatePort + 'static,
{
    let mut watcher = StateWatcher::new(
        state_port,
        Duration::from_secs(config.hub.poll_interval_seconds),
    );

    watcher.watch(
        config.triggers.helper_button.clone(),
        Arc::new(ButtonPressHandler::new(
            Some(config.triggers.helper_fire_on.clone()),
            sender.clone(),
        )),
    );

    if let Some(button) = &config.triggers.trigger_button {
        watcher.watch(
            button.clone(),
            Arc::new(ButtonPressHandler::new(
                Some(config.triggers.trigger_fire_on.clone()),
                sender,
            )),
        );
    }

    watcher
}
