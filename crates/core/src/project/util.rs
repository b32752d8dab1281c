use std::fs;

use anyhow::{Context, Result};

use crate::project::{ProjectConfig, ProjectLayout};

/// Read `.attackgen/project.json`.
pub fn load_project_config(layout: &ProjectLayout) -> Result<ProjectConfig> {
    let path = &layout.project_config_path;
    let body = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project config at {}", path.display()))?;
    serde_json::from_str(&body).context("Failed to parse project config JSON")
}

/// Write the config back as pretty-printed JSON.
pub fn save_project_config(layout: &ProjectLayout, config: &ProjectConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    fs::write(&layout.project_config_path, json).with_context(|| {
        format!("Failed to write project config: {}", layout.project_config_path.display())
    })?;
    Ok(())
}
