//! Notification publishing through the hub

use crate::clock::Clock;
use crate::ports::hub::{HubError, NotificationPort};
use std::sync::Arc;
use tracing::info;

/// A notification handed to the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Title without the time suffix
    pub title: String,
    /// Message body
    pub body: String,
    /// Wall-clock time of publishing, `HH:MM`
    pub timestamp: String,
}

impl Notification {
    /// Title as shown on the hub: `"{title} ({HH:MM})"`
    pub fn display_title(&self) -> String {
        format!("{} ({})", self.title, self.timestamp)
    }
}

/// Publishes titled, timestamped notifications
pub struct Notifier<N: NotificationPort> {
    port: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<N: NotificationPort> Notifier<N> {
    pub fn new(port: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self { port, clock }
    }

    /// Same port, different clock
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self {
            port: self.port,
            clock,
        }
    }

    /// Stamps `title` with the current time and publishes it with `body`
    ///
    /// Returns the published notification; delivery beyond "accepted" is the hub's concern.
    pub async fn publish(&self, body: &str, title: &str) -> Result<Notification, HubError> {
        let notification = Notification {
            title: title.to_string(),
            body: body.to_string(),
            timestamp: self.clock.now().format("%H:%M").to_string(),
        };
        let display_title = notification.display_title();

        info!(title = %display_title, "Notification");
        self.port
            .create_notification(&display_title, &notification.body)
            .await?;

        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPort {
        sent: Mutex<Vec<(String, String)>>,
        reject: AtomicBool,
    }

    #[async_trait]
    impl NotificationPort for RecordingPort {
        async fn create_notification(&self, title: &str, message: &str) -> Result<(), HubError> {
            if self.reject.load(Ordering::SeqCst) {
                return Err(HubError::UnexpectedStatus(500, "boom".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2024, 6, 15)
                .unwrap()
                .and_hms_opt(8, 5, 59)
                .unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_publish_appends_time_to_title() {
        let port = Arc::new(RecordingPort::default());
        let notifier = Notifier::new(Arc::clone(&port), clock());

        let notification = notifier.publish("body text", "System Health Summary").await.unwrap();

        assert_eq!(notification.title, "System Health Summary");
        assert_eq!(notification.timestamp, "08:05");
        assert_eq!(notification.display_title(), "System Health Summary (08:05)");

        let sent = port.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![(
                "System Health Summary (08:05)".to_string(),
                "body text".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_publish_propagates_hub_error() {
        let port = Arc::new(RecordingPort::default());
        port.reject.store(true, Ordering::SeqCst);
        let notifier = Notifier::new(port, clock());

        let result = notifier.publish("body", "Title").await;
        assert!(matches!(result, Err(HubError::UnexpectedStatus(500, _))));
    }
}
