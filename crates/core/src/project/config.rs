use serde::{Deserialize, Serialize};

use crate::services::scriptgen::ScriptTemplate;

/// Default location of the auto-generated script, relative to the project root.
pub const DEFAULT_SCRIPT_PATH: &str = "scripts/auto_generated.py";

fn default_script_path() -> String {
    DEFAULT_SCRIPT_PATH.to_string()
}

/// External program used by the `external` runner.
///
/// The program is invoked as `<program> <args...> <script> [entry]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Serializable configuration describing an attackgen project.
///
/// This lives at `.attackgen/project.json` in the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Human-friendly project name.
    pub name: String,
    /// Optional description / notes.
    pub description: Option<String>,
    /// Schema/config version. This is about the config format, not the tool version.
    pub config_version: String,
    /// Auto-generated script path (typically relative to project root).
    #[serde(default = "default_script_path")]
    pub default_script: String,
    /// Runner to use when none is given on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_runner: Option<String>,
    /// Settings for the `external` runner; it is only available when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerConfig>,
    /// Fixed parts of generated scripts.
    #[serde(default)]
    pub template: ScriptTemplate,
}

impl ProjectConfig {
    /// Create a new project configuration using the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            config_version: "0.1.0".to_string(),
            default_script: default_script_path(),
            default_runner: None,
            runner: None,
            template: ScriptTemplate::default(),
        }
    }
}
