//! Health analysis of a hub snapshot
//!
//! Derives entity, device and automation counts plus an issue list from the
//! full entity mapping and a few well-known sensors.

use crate::ports::hub::EntitySnapshot;
use std::fmt;
use tracing::{info, warn};

/// Entity id prefix counted as a device when hub counters are unusable
pub const DEVICE_TRACKER_PREFIX: &str = "device_tracker.";

/// Entity id prefix of automations
pub const AUTOMATION_PREFIX: &str = "automation.";

/// States that mark an entity as not reporting
pub const UNAVAILABLE_STATES: [&str; 2] = ["unavailable", "unknown"];

/// Uptime shown when the uptime sensor is missing
pub const UPTIME_FALLBACK: &str = "N/A";

/// Raw values of the named sensors read alongside the snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorReadings {
    /// Hub-provided device counter
    pub device_count: Option<String>,
    /// Hub-provided entity counter
    pub entity_count: Option<String>,
    /// Uptime sensor value
    pub uptime: Option<String>,
}

/// Where the entity and device counts came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    /// Both hub counter sensors parsed
    HubSensors,
    /// Counted directly from the snapshot
    Snapshot,
}

/// Derived health summary of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub entity_count: usize,
    pub device_count: usize,
    pub automation_count: usize,
    pub uptime: String,
    pub issues: Vec<String>,
    pub count_source: CountSource,
}

impl HealthReport {
    /// Whether the issues section will be rendered
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Renders the plain-text report body
    pub fn render(&self) -> String {
        let mut report = format!(
            "📋 Entities: {}\n📡 Devices: {}\n⚙️ Automations: {}\n⏰ System Uptime: {}\n",
            self.entity_count, self.device_count, self.automation_count, self.uptime
        );

        if !self.has_issues() {
            report.push_str("\n✅ No major issues detected");
        } else {
            report.push_str("\n🚨 Issues:\n");
            report.push_str(&self.issues.join("\n"));
        }

        report
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Parses a hub counter such as `"42"` or `"42.0"`
///
/// Decimal values are truncated toward zero. Negative, non-finite and
/// non-numeric values (including `unavailable`) are rejected.
pub fn parse_counter(raw: &str) -> Option<usize> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.trunc() as usize)
}

/// Stateless health analyzer
pub struct HealthAnalyzer;

impl HealthAnalyzer {
    /// Builds a health report from a snapshot and the sensor readings
    pub fn analyze(snapshot: &EntitySnapshot, readings: &SensorReadings) -> HealthReport {
        let (entity_count, device_count, count_source) =
            match Self::hub_counters(readings) {
                Some((entities, devices)) => {
                    info!("Using hub template sensors for counts");
                    (entities, devices, CountSource::HubSensors)
                }
                None => (
                    snapshot.len(),
                    Self::count_prefix(snapshot, DEVICE_TRACKER_PREFIX),
                    CountSource::Snapshot,
                ),
            };

        let automation_count = Self::count_prefix(snapshot, AUTOMATION_PREFIX);

        let unavailable = snapshot
            .values()
            .filter(|entity| UNAVAILABLE_STATES.contains(&entity.state.as_str()))
            .count();

        let mut issues = Vec::new();
        if unavailable > 0 {
            issues.push(format!("⚠️ {} entities unavailable", unavailable));
        }

        let uptime = readings
            .uptime
            .clone()
            .unwrap_or_else(|| UPTIME_FALLBACK.to_string());

        HealthReport {
            entity_count,
            device_count,
            automation_count,
            uptime,
            issues,
            count_source,
        }
    }

    /// Returns `(entities, devices)` when both counters are present and parse
    fn hub_counters(readings: &SensorReadings) -> Option<(usize, usize)> {
        let (Some(raw_devices), Some(raw_entities)) =
            (&readings.device_count, &readings.entity_count)
        else {
            return None;
        };

        match (parse_counter(raw_entities), parse_counter(raw_devices)) {
            (Some(entities), Some(devices)) => Some((entities, devices)),
            _ => {
                warn!(
                    device_count = %raw_devices,
                    entity_count = %raw_entities,
                    "Failed to parse hub device/entity counts, falling back"
                );
                None
            }
        }
    }

    fn count_prefix(snapshot: &EntitySnapshot, prefix: &str) -> usize {
        snapshot.keys().filter(|id| id.starts_with(prefix)).count()
    }
}
