//! Integration settings commands.

use crate::app::App;
use crate::output::{print_heading, print_json, print_row};
use anyhow::{Context, Result};
use mapping_rules::EVENT_DEFINITIONS;
use std::path::Path;

/// Sanitise a raw settings submission and persist it.
pub fn settings_import(app: &App, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let raw: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", file.display()))?;

    let settings = app.settings().import(&raw)?;

    print_heading("Saved event settings");
    for def in EVENT_DEFINITIONS {
        let Some(config) = settings.get(def.key) else {
            continue;
        };
        let state = if config.enabled { "on " } else { "off" };
        print_row(
            def.label,
            format!(
                "{} {} ({} rules)",
                state,
                config.output_event_name,
                config.mapping_rules.len()
            ),
        );
    }
    Ok(())
}

pub fn settings_show(app: &App) -> Result<()> {
    print_json(&app.settings().load()?)
}

/// List the custom field keys defined in the Bento account.
pub async fn settings_fields(app: &App) -> Result<()> {
    let keys = app.client()?.fetch_field_keys().await?;
    if keys.is_empty() {
        println!("No custom fields defined");
    }
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}
