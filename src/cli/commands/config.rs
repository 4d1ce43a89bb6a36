//! Config command handlers

use anyhow::Result;

use crate::domain::models::Config;

/// Handle `fonpick config show`: YAML by default, JSON with `--json`
pub fn handle_show(config: &Config, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", serde_yaml::to_string(config)?);
    }
    Ok(())
}
