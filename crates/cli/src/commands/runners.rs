use anyhow::Result;
use attackgen_core::project::{ProjectContext, ProjectLayout};
use attackgen_core::services::runner::{default_runner_name, default_runner_registry};
use serde::Serialize;
use tracing::debug;

use crate::canonicalize_or_current;

#[derive(Debug, Serialize)]
pub struct RunnerInfo {
    pub name: String,
    pub description: String,
    pub default: bool,
}

/// List the script runners available for the project at `root`.
///
/// Outside a project only the built-in runners are listed.
pub fn list_runners_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = ProjectLayout::new(&root_path);
    let (registry, default) = if layout.project_config_path.is_file() {
        let ctx = ProjectContext::from_root(&root_path)?;
        (ctx.runners(), ctx.runner_name(None))
    } else {
        debug!(root = %root_path.display(), "no project config; listing built-in runners");
        (default_runner_registry(None), default_runner_name().to_string())
    };

    let entries: Vec<RunnerInfo> = registry
        .names()
        .into_iter()
        .map(|name| {
            let description = match name.as_str() {
                "validate-only" => {
                    "Checks the script hash and structure without executing it".to_string()
                }
                "external" => {
                    "Runs the configured program with the script path and entry point".to_string()
                }
                other => format!("Runner '{}'", other),
            };
            let is_default = name == default;
            RunnerInfo { name, description, default: is_default }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Runners: (none)");
        return Ok(());
    }

    println!("Runners:");
    for entry in entries {
        let marker = if entry.default { " (default)" } else { "" };
        println!("- {}{}: {}", entry.name, marker, entry.description);
    }

    Ok(())
}
