//! Run command
//!
//! Handles `warden run`: one report for a manual trigger, then exit.

use super::{build_hub_adapter, build_runner};
use crate::app::AppContext;
use anyhow::{Context, Result};
use warden_core::{NarrativeStatus, ReportOutcome, Trigger};

pub async fn run(ctx: &AppContext) -> Result<()> {
    let config = ctx.config();
    let hub = build_hub_adapter(config)?;
    let runner = build_runner(config, hub);

    let outcome = runner
        .run_and_report(&Trigger::Manual)
        .await
        .context("Report run failed (an error notification was attempted)")?;

    println!("{}", describe(&outcome));
    Ok(())
}

/// One-line terminal summary of a run
fn describe(outcome: &ReportOutcome) -> String {
    match outcome {
        ReportOutcome::Published {
            notification,
            report,
            narrative,
        } => {
            let narrative = match narrative {
                NarrativeStatus::Disabled => "no AI analysis".to_string(),
                NarrativeStatus::Included => "with AI analysis".to_string(),
                NarrativeStatus::Skipped { reason } => format!("AI analysis skipped: {}", reason),
            };
            format!(
                "Published \"{}\": {} entities, {} issue(s), {}",
                notification.display_title(),
                report.entity_count,
                report.issues.len(),
                narrative
            )
        }
        ReportOutcome::ConnectionError { notification } => format!(
            "Published \"{}\": the hub returned no entities",
            notification.display_title()
        ),
    }
}
