//! Status command
//!
//! Handles `warden status`: configuration summary and a hub connectivity check.

use super::{build_hub_adapter, build_narrative};
use crate::app::AppContext;
use anyhow::Result;
use warden_core::ports::StatePort;
use warden_core::{ApiKeyManager, Config};

pub async fn run(ctx: &AppContext) -> Result<()> {
    let config = ctx.config();
    let narrative_enabled = build_narrative(config).is_some();

    println!("Warden Status");
    println!("=============");
    println!();
    for line in configuration_lines(config, narrative_enabled, &ctx.config_warnings) {
        println!("{}", line);
    }
    if !narrative_enabled {
        println!();
        println!("{}", ApiKeyManager::missing_key_guidance());
    }

    println!();
    println!("Hub");
    println!("---");
    let hub = build_hub_adapter(config)?;
    match hub.get_states().await {
        Ok(snapshot) => println!("  Connected: {} entities", snapshot.len()),
        Err(e) => println!("  Unreachable: {}", e),
    }

    Ok(())
}

fn configuration_lines(
    config: &Config,
    narrative_enabled: bool,
    warnings: &[String],
) -> Vec<String> {
    let mut lines = vec![
        "Configuration".to_string(),
        "-------------".to_string(),
        format!("  Hub URL: {}", config.hub.url),
        format!(
            "  Daily report at: {}{}",
            config.schedule.daily_at,
            if config.schedule.run_on_startup {
                " (and at startup)"
            } else {
                ""
            }
        ),
        format!(
            "  Helper button: {} (fires on '{}')",
            config.triggers.helper_button, config.triggers.helper_fire_on
        ),
    ];

    if let Some(button) = &config.triggers.trigger_button {
        lines.push(format!(
            "  Trigger button: {} (fires on '{}')",
            button, config.triggers.trigger_fire_on
        ));
    }

    lines.push(format!(
        "  AI analysis: {}",
        if narrative_enabled {
            format!("enabled ({})", config.ai.model)
        } else {
            "disabled".to_string()
        }
    ));
    lines.push(format!(
        "  Data directory: {}",
        config.storage.data_dir.to_string_lossy()
    ));
    for warning in warnings {
        lines.push(format!("  Fallback: {}", warning));
    }

    lines
}
