use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::project::{load_project_config, ProjectConfig, ProjectLayout};
use crate::services::runner::{default_runner_name, default_runner_registry, RunnerRegistry};

/// Convenience wrapper bundling layout and config for a project root.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub layout: ProjectLayout,
    pub config: ProjectConfig,
}

impl ProjectContext {
    /// Load the project config for a given root.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self> {
        let layout = ProjectLayout::new(root);
        let config = load_project_config(&layout)?;
        Ok(Self { layout, config })
    }

    /// Absolute path of the auto-generated script.
    pub fn default_script_path(&self) -> PathBuf {
        self.layout.resolve(&self.config.default_script)
    }

    /// Runner registry for this project (external runner only if configured).
    pub fn runners(&self) -> RunnerRegistry {
        default_runner_registry(self.config.runner.as_ref())
    }

    /// Runner name: explicit override > project default > validate-only.
    pub fn runner_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_string)
            .or_else(|| self.config.default_runner.clone())
            .unwrap_or_else(|| default_runner_name().to_string())
    }
}
