//! Report run orchestration
//!
//! One run: fetch snapshot, analyze, optionally narrate, publish. Nothing is
//! kept between runs.

use crate::analyzer::{HealthAnalyzer, HealthReport, SensorReadings};
use crate::clock::{Clock, SystemClock};
use crate::config::SensorConfig;
use crate::narrative::NarrativeGenerator;
use crate::notifier::{Notification, Notifier};
use crate::ports::hub::{HubError, NotificationPort, StatePort};
use crate::trigger::Trigger;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Title of the regular report
pub const SUMMARY_TITLE: &str = "System Health Summary";

/// Title used when the hub returned no entities
pub const CONNECTION_ERROR_TITLE: &str = "Connection Error";

/// Body used when the hub returned no entities
pub const CONNECTION_ERROR_BODY: &str = "No entities found. Check the Home Assistant connection.";

/// Title used when a run failed
pub const RUN_ERROR_TITLE: &str = "Summary Error";

/// Appended when narrative generation failed
pub const NARRATIVE_SKIPPED_NOTICE: &str = "⚠️ AI analysis skipped due to error.";

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum RunFault {
    /// Snapshot or sensor read failed
    #[error("failed to read hub state: {0}")]
    StateRead(HubError),

    /// The hub refused the notification
    #[error("failed to publish notification: {0}")]
    Publish(HubError),
}

/// What happened to the narrative section of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeStatus {
    /// No usable credential; section omitted and no call made
    Disabled,
    /// Analysis appended
    Included,
    /// Provider failed; skip notice appended
    Skipped { reason: String },
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    /// The health summary was published
    Published {
        notification: Notification,
        report: HealthReport,
        narrative: NarrativeStatus,
    },
    /// The hub returned no entities; a connection error was published instead
    ConnectionError { notification: Notification },
}

impl ReportOutcome {
    pub fn notification(&self) -> &Notification {
        match self {
            ReportOutcome::Published { notification, .. } => notification,
            ReportOutcome::ConnectionError { notification } => notification,
        }
    }
}

/// Runs health reports against the hub
pub struct ReportRunner<S, N>
where
    S: StatePort + 'static,
    N: NotificationPort + 'static,
{
    state_port: Arc<S>,
    notifier: Notifier<N>,
    narrative: Option<NarrativeGenerator>,
    sensors: SensorConfig,
    clock: Arc<dyn Clock>,
}

impl<S, N> ReportRunner<S, N>
where
    S: StatePort + 'static,
    N: NotificationPort + 'static,
{
    /// Creates a runner without narrative analysis, using the system clock
    pub fn new(state_port: Arc<S>, notification_port: Arc<N>, sensors: SensorConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            state_port,
            notifier: Notifier::new(notification_port, Arc::clone(&clock)),
            narrative: None,
            sensors,
            clock,
        }
    }

    /// Enables (or, with `None`, disables) narrative analysis
    pub fn with_narrative(mut self, narrative: Option<NarrativeGenerator>) -> Self {
        self.narrative = narrative;
        self
    }

    /// Replaces the clock used for headers and notification titles
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.notifier = self.notifier.with_clock(Arc::clone(&clock));
        self.clock = clock;
        self
    }

    /// Whether narrative analysis will be attempted
    pub fn narrative_enabled(&self) -> bool {
        self.narrative.is_some()
    }

    /// Executes one run
    ///
    /// Narrative failures are contained here; any other failure is returned
    /// as a [`RunFault`] without notifying. See [`Self::run_and_report`].
    pub async fn run(&self) -> Result<ReportOutcome, RunFault> {
        info!("Creating system summary");
        let now = self.clock.now();

        let snapshot = self
            .state_port
            .get_states()
            .await
            .map_err(RunFault::StateRead)?;

        if snapshot.is_empty() {
            warn!("Hub returned no entities");
            let notification = self
                .notifier
                .publish(CONNECTION_ERROR_BODY, CONNECTION_ERROR_TITLE)
                .await
                .map_err(RunFault::Publish)?;
            return Ok(ReportOutcome::ConnectionError { notification });
        }

        let readings = self.read_sensors().await?;
        let report = HealthAnalyzer::analyze(&snapshot, &readings);
        let report_text = report.render();
        info!(
            entities = report.entity_count,
            devices = report.device_count,
            automations = report.automation_count,
            issues = report.issues.len(),
            "System health analyzed"
        );

        let mut body = format!(
            "📅 Report generated: {} ({})\n\n{}",
            now.format("%Y-%m-%d %H:%M:%S"),
            now.format("%A"),
            report_text
        );

        let narrative = match &self.narrative {
            None => NarrativeStatus::Disabled,
            Some(generator) => match generator.generate(&report_text, now).await {
                Ok(analysis) => {
                    body.push_str("\n\n--- AI Analysis ---\n");
                    body.push_str(&analysis);
                    NarrativeStatus::Included
                }
                Err(e) => {
                    error!(error = %e, "AI analysis failed");
                    body.push_str("\n\n");
                    body.push_str(NARRATIVE_SKIPPED_NOTICE);
                    NarrativeStatus::Skipped {
                        reason: e.to_string(),
                    }
                }
            },
        };

        let notification = self
            .notifier
            .publish(&body, SUMMARY_TITLE)
            .await
            .map_err(RunFault::Publish)?;

        Ok(ReportOutcome::Published {
            notification,
            report,
            narrative,
        })
    }

    /// Executes one run and turns a fault into an error notification
    ///
    /// This is the outermost boundary of a run: a notification is always
    /// attempted. The fault is still returned so callers can log or set an
    /// exit status.
    pub async fn run_and_report(&self, trigger: &Trigger) -> Result<ReportOutcome, RunFault> {
        info!(trigger = %trigger, "Report run started");

        match self.run().await {
            Ok(outcome) => {
                info!(
                    trigger = %trigger,
                    title = %outcome.notification().display_title(),
                    "Report run finished"
                );
                Ok(outcome)
            }
            Err(fault) => {
                error!(trigger = %trigger, error = %fault, "Failed to create summary");
                let body = format!("Error creating summary: {}", fault);
                if let Err(e) = self.notifier.publish(&body, RUN_ERROR_TITLE).await {
                    error!(error = %e, "Failed to publish error notification");
                }
                Err(fault)
            }
        }
    }

    async fn read_sensors(&self) -> Result<SensorReadings, RunFault> {
        Ok(SensorReadings {
            device_count: self.read_value(&self.sensors.device_count).await?,
            entity_count: self.read_value(&self.sensors.entity_count).await?,
            uptime: self.read_value(&self.sensors.uptime).await?,
        })
    }

    async fn read_value(&self, entity_id: &str) -> Result<Option<String>, RunFault> {
        let state = self
            .state_port
            .get_state(entity_id)
            .await
            .map_err(RunFault::StateRead)?;
        Ok(state.map(|s| s.state))
    }
}
