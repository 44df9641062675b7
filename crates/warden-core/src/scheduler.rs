//! Daily report timer
//!
//! Sleeps until the configured local time of day, pushes [`Trigger::Daily`]
//! and repeats. The timer never runs a report itself.

use crate::clock::{Clock, SystemClock};
use crate::trigger::{Trigger, TriggerSender};
use chrono::{Duration as ChronoDuration, NaiveDateTime, NaiveTime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Errors that can occur during scheduler operations
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Scheduler is already running
    #[error("Scheduler is already running")]
    AlreadyRunning,

    /// Scheduler is not running
    #[error("Scheduler is not running")]
    NotRunning,
}

/// Time left until the next occurrence of `at` after `now`
///
/// When `now` is exactly `at`, the next occurrence is tomorrow.
pub fn duration_until_next(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let mut next = now.date().and_time(at);
    if next <= now {
        next += ChronoDuration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Fires [`Trigger::Daily`] once a day at a fixed local time
pub struct DailyScheduler {
    at: NaiveTime,
    sender: TriggerSender,
    clock: Arc<dyn Clock>,
    /// Flag to indicate if scheduler is running
    running: Arc<AtomicBool>,
    /// Signal to stop the scheduler
    stop_signal: Arc<Notify>,
}

impl DailyScheduler {
    pub fn new(at: NaiveTime, sender: TriggerSender) -> Self {
        Self {
            at,
            sender,
            clock: Arc::new(SystemClock),
            running: Arc::new(AtomicBool::new(false)),
            stop_signal: Arc::new(Notify::new()),
        }
    }

    /// Replaces the clock used to compute the next firing time
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Configured time of day
    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// Returns whether the scheduler is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Time left until the next firing, according to the scheduler's clock
    pub fn next_delay(&self) -> Duration {
        duration_until_next(self.clock.now(), self.at)
    }

    /// Spawns the timer task
    ///
    /// # Errors
    /// Returns `SchedulerError::AlreadyRunning` if scheduler is already active
    pub fn start(&self) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let at = self.at;
        let sender = self.sender.clone();
        let clock = Arc::clone(&self.clock);
        let running = Arc::clone(&self.running);
        let stop_signal = Arc::clone(&self.stop_signal);

        tokio::spawn(async move {
            info!(at = %at.format("%H:%M:%S"), "Daily report scheduled");

            loop {
                let delay = duration_until_next(clock.now(), at);
                debug!(?delay, "Sleeping until next daily report");

                tokio::select! {
                    _ = stop_signal.notified() => {
                        info!("Received stop signal, shutting down daily scheduler");
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        info!("Daily report due");
                        if sender.send(Trigger::Daily).is_err() {
                            warn!("Dispatcher is gone, stopping daily scheduler");
                            break;
                        }
                    }
                }
            }

            running.store(false, Ordering::SeqCst);
            info!("Daily scheduler stopped");
        });

        Ok(())
    }

    /// Stops the timer task and waits for it to exit
    ///
    /// # Errors
    /// Returns `SchedulerError::NotRunning` if scheduler is not active
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping daily scheduler...");
        self.stop_signal.notify_one();

        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::trigger::trigger_channel;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn test_duration_until_later_today() {
        assert_eq!(
            duration_until_next(at(19, 0, 0), time(20, 0, 0)),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn test_duration_until_tomorrow_when_passed() {
        assert_eq!(
            duration_until_next(at(20, 30, 0), time(20, 0, 0)),
            Duration::from_secs(23 * 3600 + 30 * 60)
        );
    }

    #[test]
    fn test_duration_at_exact_time_waits_a_day() {
        assert_eq!(
            duration_until_next(at(20, 0, 0), time(20, 0, 0)),
            Duration::from_secs(24 * 3600)
        );
    }

    #[test]
    fn test_duration_crosses_midnight() {
        assert_eq!(
            duration_until_next(at(23, 59, 30), time(0, 0, 15)),
            Duration::from_secs(45)
        );
    }

    #[test]
    fn test_next_delay_uses_clock() {
        let (tx, _rx) = trigger_channel();
        let scheduler = DailyScheduler::new(time(20, 0, 0), tx)
            .with_clock(Arc::new(FixedClock(at(19, 59, 0))));

        assert_eq!(scheduler.next_delay(), Duration::from_secs(60));
        assert_eq!(scheduler.at(), time(20, 0, 0));
    }

    #[tokio::test]
    async fn test_scheduler_start_stop() {
        let (tx, _rx) = trigger_channel();
        let scheduler = DailyScheduler::new(time(20, 0, 0), tx);

        assert!(!scheduler.is_running());
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        scheduler.stop().await.unwrap();
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_scheduler_double_start_fails() {
        let (tx, _rx) = trigger_channel();
        let scheduler = DailyScheduler::new(time(20, 0, 0), tx);

        scheduler.start().unwrap();
        assert!(matches!(scheduler.start(), Err(SchedulerError::AlreadyRunning)));

        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_stop_when_not_running_fails() {
        let (tx, _rx) = trigger_channel();
        let scheduler = DailyScheduler::new(time(20, 0, 0), tx);

        assert!(matches!(
            scheduler.stop().await,
            Err(SchedulerError::NotRunning)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_fires_daily_trigger() {
        let (tx, mut rx) = trigger_channel();
        let scheduler = DailyScheduler::new(time(20, 0, 0), tx)
            .with_clock(Arc::new(FixedClock(at(19, 59, 58))));

        scheduler.start().unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        assert_eq!(rx.recv().await, Some(Trigger::Daily));
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_scheduler_exits_when_dispatcher_gone() {
        let (tx, rx) = trigger_channel();
        drop(rx);
        let scheduler = DailyScheduler::new(time(20, 0, 0), tx)
            .with_clock(Arc::new(FixedClock(at(19, 59, 59))));

        scheduler.start().unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while scheduler.is_running() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }
}
