use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::project::RunnerConfig;
use crate::services::scriptgen::{GeneratedScript, HEADER_TIMESTAMP_FORMAT};

/// Class every runnable script must define.
pub const ENTRY_CLASS: &str = "UserScript";

const VALIDATE_ONLY_RUNNER: &str = "validate-only";
const EXTERNAL_RUNNER: &str = "external";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Script not found at {0}")]
    MissingScript(PathBuf),
    #[error("Invalid script metadata at {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Script {path} changed since generation (expected sha256 {expected}, found {found})")]
    HashMismatch { path: PathBuf, expected: String, found: String },
    #[error("Script {path} failed validation: {reason}")]
    InvalidScript { path: PathBuf, reason: String },
    #[error("Runner not found: {0}")]
    UnknownRunner(String),
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Runner exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },
}

/// Sidecar written next to each persisted script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMetadata {
    pub generated_at: String,
    pub sha256: String,
    pub entry_class: String,
}

/// A script on disk, with the hash recorded when it was written (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedScript {
    pub path: PathBuf,
    pub metadata: Option<ScriptMetadata>,
}

/// What a runner reports back after handling a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub runner: String,
    pub script: String,
    pub entry: Option<String>,
    pub stdout: String,
    pub stderr: String,
}

/// Plugin that executes a persisted script, optionally at a named entry point.
///
/// `entry == None` means "load the script and run its default flow".
pub trait ScriptRunner {
    fn run(&self, script: &PersistedScript, entry: Option<&str>) -> Result<RunOutcome, RunnerError>;
    fn name(&self) -> &'static str;
}

/// Path of the metadata sidecar for `script` (`foo.py` -> `foo.meta.json`).
pub fn metadata_path_for(script: &Path) -> PathBuf {
    script.with_extension("meta.json")
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write the script and its sidecar, creating parent directories as needed.
pub fn persist_script(
    path: &Path,
    script: &GeneratedScript,
) -> Result<PersistedScript, RunnerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| RunnerError::Io { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, &script.text)
        .map_err(|source| RunnerError::Io { path: path.to_path_buf(), source })?;

    let metadata = ScriptMetadata {
        generated_at: script.generated_at.format(HEADER_TIMESTAMP_FORMAT).to_string(),
        sha256: sha256_hex(script.text.as_bytes()),
        entry_class: ENTRY_CLASS.to_string(),
    };
    let meta_path = metadata_path_for(path);
    let body = serde_json::to_string_pretty(&metadata)
        .map_err(|source| RunnerError::Metadata { path: meta_path.clone(), source })?;
    fs::write(&meta_path, body).map_err(|source| RunnerError::Io { path: meta_path, source })?;

    info!(path = %path.display(), sha256 = %metadata.sha256, "persisted generated script");
    Ok(PersistedScript { path: path.to_path_buf(), metadata: Some(metadata) })
}

/// Locate a script on disk and read its sidecar if one exists.
///
/// Hand-written scripts have no sidecar; they are still structurally checked
/// before running.
pub fn load_persisted(path: &Path) -> Result<PersistedScript, RunnerError> {
    if !path.is_file() {
        return Err(RunnerError::MissingScript(path.to_path_buf()));
    }
    let meta_path = metadata_path_for(path);
    let metadata = if meta_path.is_file() {
        let body = fs::read_to_string(&meta_path)
            .map_err(|source| RunnerError::Io { path: meta_path.clone(), source })?;
        Some(
            serde_json::from_str(&body)
                .map_err(|source| RunnerError::Metadata { path: meta_path, source })?,
        )
    } else {
        None
    };
    Ok(PersistedScript { path: path.to_path_buf(), metadata })
}

/// Re-read the script, check it against its recorded hash, and check that it
/// defines the entry class with a body under every block header.
pub fn verify_script(script: &PersistedScript) -> Result<String, RunnerError> {
    if !script.path.is_file() {
        return Err(RunnerError::MissingScript(script.path.clone()));
    }
    let text = fs::read_to_string(&script.path)
        .map_err(|source| RunnerError::Io { path: script.path.clone(), source })?;

    if let Some(meta) = &script.metadata {
        let found = sha256_hex(text.as_bytes());
        if found != meta.sha256 {
            return Err(RunnerError::HashMismatch {
                path: script.path.clone(),
                expected: meta.sha256.clone(),
                found,
            });
        }
    }

    validate_structure(&text)
        .map_err(|reason| RunnerError::InvalidScript { path: script.path.clone(), reason })?;
    Ok(text)
}

/// Structural check of a runnable script: the entry class exists, runs to
/// the end of the file, and no `class`/`def` header is left without an
/// indented body.
pub fn validate_structure(text: &str) -> Result<(), String> {
    let class_header = format!("class {ENTRY_CLASS}(");

    let code: Vec<(usize, &str)> = text
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .map(|l| (l.len() - l.trim_start().len(), l.trim()))
        .collect();

    let start = code
        .iter()
        .position(|(indent, line)| *indent == 0 && line.starts_with(&class_header))
        .ok_or_else(|| format!("missing `{class_header}...):` definition"))?;
    if let Some((_, line)) = code[start + 1..].iter().find(|(indent, _)| *indent == 0) {
        return Err(format!("`{line}` at column 0 ends `{ENTRY_CLASS}` early"));
    }

    for (i, (indent, line)) in code.iter().enumerate() {
        let opens_block =
            (line.starts_with("def ") || line.starts_with("class ")) && line.ends_with(':');
        if !opens_block {
            continue;
        }
        match code.get(i + 1) {
            Some((next_indent, _)) if next_indent > indent => {}
            _ => return Err(format!("block `{line}` has no body")),
        }
    }
    Ok(())
}

/// Checks the script and reports success without executing anything.
pub struct ValidateOnlyRunner;

impl ScriptRunner for ValidateOnlyRunner {
    fn run(
        &self,
        script: &PersistedScript,
        entry: Option<&str>,
    ) -> Result<RunOutcome, RunnerError> {
        verify_script(script)?;
        debug!(path = %script.path.display(), ?entry, "validated script");
        Ok(RunOutcome {
            runner: self.name().to_string(),
            script: script.path.display().to_string(),
            entry: entry.map(str::to_string),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn name(&self) -> &'static str {
        VALIDATE_ONLY_RUNNER
    }
}

/// Hands the script to an external interpreter/launcher.
///
/// Invoked as `<program> <args...> <script path> [entry]`; the launcher is
/// responsible for loading `UserScript` and calling the entry point.
pub struct ExternalRunner {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ExternalRunner {
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self { program: PathBuf::from(&config.program), args: config.args.clone() }
    }
}

impl ScriptRunner for ExternalRunner {
    fn run(
        &self,
        script: &PersistedScript,
        entry: Option<&str>,
    ) -> Result<RunOutcome, RunnerError> {
        verify_script(script)?;

        let mut command = Command::new(&self.program);
        command.args(&self.args).arg(&script.path);
        if let Some(entry) = entry {
            command.arg(entry);
        }
        info!(
            program = %self.program.display(),
            script = %script.path.display(),
            ?entry,
            "running script"
        );

        let output = command.output().map_err(|source| RunnerError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            return Err(RunnerError::Exit { status: output.status.to_string(), stderr });
        }

        Ok(RunOutcome {
            runner: self.name().to_string(),
            script: script.path.display().to_string(),
            entry: entry.map(str::to_string),
            stdout,
            stderr,
        })
    }

    fn name(&self) -> &'static str {
        EXTERNAL_RUNNER
    }
}

/// Registry for script runners; callers select by name.
#[derive(Default)]
pub struct RunnerRegistry {
    runners: HashMap<String, Box<dyn ScriptRunner>>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self { runners: HashMap::new() }
    }

    pub fn register<R: ScriptRunner + 'static>(&mut self, runner: R) -> &mut Self {
        self.runners.insert(runner.name().to_string(), Box::new(runner));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn ScriptRunner> {
        self.runners.get(name).map(|r| &**r)
    }

    /// Like `get`, but a missing runner is an error.
    pub fn resolve(&self, name: &str) -> Result<&dyn ScriptRunner, RunnerError> {
        self.get(name).ok_or_else(|| RunnerError::UnknownRunner(name.to_string()))
    }

    /// Return a sorted list of registered runner names for error messages/help.
    pub fn names(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.runners.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Registry with the validate-only runner, plus the external runner when the
/// project configures one.
pub fn default_runner_registry(config: Option<&RunnerConfig>) -> RunnerRegistry {
    let mut registry = RunnerRegistry::new();
    registry.register(ValidateOnlyRunner);
    if let Some(config) = config {
        registry.register(ExternalRunner::from_config(config));
    }
    registry
}

/// Name of the runner used when neither the caller nor the project picks one.
pub fn default_runner_name() -> &'static str {
    VALIDATE_ONLY_RUNNER
}
