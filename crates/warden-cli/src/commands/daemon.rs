//! Daemon command
//!
//! Handles `warden daemon`: a foreground service that publishes a report at
//! startup, once a day and whenever a trigger button is pressed.

use super::{build_hub_adapter, build_runner};
use crate::app::AppContext;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use warden_core::{build_watcher, trigger_channel, DailyScheduler, Trigger, TriggerDispatcher};

pub async fn run(ctx: &AppContext) -> Result<()> {
    let config = ctx.config();
    info!("Initializing Warden");

    let daily_at = config.daily_time().context("Invalid schedule.daily_at")?;
    let hub = build_hub_adapter(config)?;
    let runner = Arc::new(build_runner(config, Arc::clone(&hub)));

    let (sender, receiver) = trigger_channel();

    let dispatcher = TriggerDispatcher::new(runner);
    dispatcher
        .start(receiver)
        .context("Failed to start dispatcher")?;

    if config.schedule.run_on_startup {
        sender
            .send(Trigger::Startup)
            .context("Failed to queue startup report")?;
    }

    let scheduler = DailyScheduler::new(daily_at, sender.clone());
    scheduler.start().context("Failed to start daily scheduler")?;

    let watcher = build_watcher(config, hub, sender);
    watcher.start().context("Failed to start state watcher")?;

    println!("Warden daemon started");
    println!("  Hub: {}", config.hub.url);
    let next = scheduler.next_delay();
    println!(
        "  Daily report at: {} (next in {}h {:02}m)",
        scheduler.at().format("%H:%M:%S"),
        next.as_secs() / 3600,
        next.as_secs() % 3600 / 60
    );
    println!("  Watching: {}", watcher.watched_entities().join(", "));
    info!(
        hub = %config.hub.url,
        daily_at = %daily_at,
        "Warden daemon started"
    );

    signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    println!("\nReceived Ctrl+C, shutting down...");
    info!("Received Ctrl+C signal");

    if let Err(e) = watcher.stop().await {
        warn!("Error stopping state watcher: {}", e);
    }
    if let Err(e) = scheduler.stop().await {
        warn!("Error stopping daily scheduler: {}", e);
    }
    // Waits for an in-flight report to finish
    if let Err(e) = dispatcher.stop().await {
        warn!("Error stopping dispatcher: {}", e);
    }

    info!(
        completed = dispatcher.runs_completed(),
        failed = dispatcher.runs_failed(),
        "Warden daemon stopped"
    );
    println!("Warden daemon stopped");

    Ok(())
}
