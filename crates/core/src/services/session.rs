use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::model::{ResultWidget, Stage};
use crate::pipeline::Pipeline;
use crate::services::runner::{
    load_persisted, persist_script, PersistedScript, RunOutcome, ScriptRunner,
};
use crate::services::scriptgen::{GeneratedScript, ScriptAssembler, ScriptBuffer, ScriptGenError};

/// Description of the target the assembler writes into.
pub const AUTO_GENERATED_DESCRIPTION: &str = "Auto-Generated";

/// A script file known to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTarget {
    pub filename: PathBuf,
    pub description: String,
}

/// Registry of script files. The auto-generated target is always first;
/// exactly one target is the default, and only the default can be run.
#[derive(Debug, Clone)]
pub struct ScriptTargets {
    targets: Vec<ScriptTarget>,
    default_index: usize,
}

impl ScriptTargets {
    pub fn new(auto_generated: impl Into<PathBuf>) -> Self {
        Self {
            targets: vec![ScriptTarget {
                filename: auto_generated.into(),
                description: AUTO_GENERATED_DESCRIPTION.to_string(),
            }],
            default_index: 0,
        }
    }

    /// Register `filename` (or update its description if already known),
    /// optionally making it the default target.
    pub fn register(
        &mut self,
        filename: impl Into<PathBuf>,
        description: impl Into<String>,
        make_default: bool,
    ) -> &ScriptTarget {
        let filename = filename.into();
        let index = match self.targets.iter().position(|t| t.filename == filename) {
            Some(index) => index,
            None => {
                self.targets.push(ScriptTarget { filename, description: String::new() });
                self.targets.len() - 1
            }
        };
        self.targets[index].description = description.into();
        if make_default {
            self.default_index = index;
        }
        &self.targets[index]
    }

    pub fn auto_generated(&self) -> &ScriptTarget {
        &self.targets[0]
    }

    pub fn default_target(&self) -> &ScriptTarget {
        &self.targets[self.default_index]
    }

    /// The target a run request refers to. Asking for anything but the
    /// default target is a configuration error.
    pub fn runnable(&self, filename: Option<&Path>) -> Result<&ScriptTarget, ScriptGenError> {
        let default = self.default_target();
        match filename {
            Some(requested) if requested != default.filename => {
                Err(ScriptGenError::NonDefaultTarget {
                    requested: requested.display().to_string(),
                    default: default.filename.display().to_string(),
                })
            }
            _ => Ok(default),
        }
    }
}

/// Callback fired after every regeneration with the fresh script.
pub type ScriptListener = Box<dyn FnMut(&GeneratedScript)>;

/// Result of one regenerate-persist-run cycle.
#[derive(Debug, Clone)]
pub struct ReloadOutcome {
    pub script: GeneratedScript,
    pub persisted: PersistedScript,
    pub run: RunOutcome,
}

/// Stateful generator: owns the pipeline slots and rewrites the
/// auto-generated script every time the configuration changes.
pub struct ScriptSession<'a> {
    pipeline: Pipeline,
    assembler: ScriptAssembler,
    targets: ScriptTargets,
    runner: &'a dyn ScriptRunner,
    listeners: Vec<ScriptListener>,
}

impl<'a> ScriptSession<'a> {
    pub fn new(
        pipeline: Pipeline,
        assembler: ScriptAssembler,
        auto_generated: impl Into<PathBuf>,
        runner: &'a dyn ScriptRunner,
    ) -> Self {
        Self {
            pipeline,
            assembler,
            targets: ScriptTargets::new(auto_generated),
            runner,
            listeners: Vec::new(),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn targets(&self) -> &ScriptTargets {
        &self.targets
    }

    pub fn buffer(&self) -> &ScriptBuffer {
        self.assembler.buffer()
    }

    /// Register a script file; see `ScriptTargets::register`.
    pub fn register_target(
        &mut self,
        filename: impl Into<PathBuf>,
        description: impl Into<String>,
        make_default: bool,
    ) -> &ScriptTarget {
        self.targets.register(filename, description, make_default)
    }

    pub fn subscribe(&mut self, listener: ScriptListener) {
        self.listeners.push(listener);
    }

    pub fn set_preprocessing(
        &mut self,
        slot: usize,
        stage: Option<Box<dyn Stage>>,
    ) -> Result<ReloadOutcome, ScriptGenError> {
        self.pipeline.set_preprocessing(slot, stage)?;
        self.reload_scripts()
    }

    pub fn set_attack(
        &mut self,
        stage: Option<Box<dyn Stage>>,
    ) -> Result<ReloadOutcome, ScriptGenError> {
        self.pipeline.set_attack(stage);
        self.reload_scripts()
    }

    pub fn add_utility(&mut self, stage: Box<dyn Stage>) -> Result<ReloadOutcome, ScriptGenError> {
        self.pipeline.add_utility(stage);
        self.reload_scripts()
    }

    pub fn add_widget(
        &mut self,
        widget: Box<dyn ResultWidget>,
    ) -> Result<ReloadOutcome, ScriptGenError> {
        self.pipeline.add_widget(widget);
        self.reload_scripts()
    }

    /// Rewrite the auto-generated script from the current pipeline, notify
    /// listeners, then hand the default target to the runner.
    pub fn reload_scripts(&mut self) -> Result<ReloadOutcome, ScriptGenError> {
        let script = self.assembler.regenerate(&self.pipeline);
        let persisted = persist_script(&self.targets.auto_generated().filename, &script)?;

        for listener in self.listeners.iter_mut() {
            listener(&script);
        }

        let run = self.run_default(None).map_err(|err| {
            warn!(%err, "script run failed");
            err
        })?;
        info!(runner = %run.runner, script = %run.script, "reloaded scripts");
        Ok(ReloadOutcome { script, persisted, run })
    }

    /// Run one function of a script. `filename` must be `None` or the default
    /// target.
    pub fn run_script_function(
        &self,
        function: &str,
        filename: Option<&Path>,
    ) -> Result<RunOutcome, ScriptGenError> {
        self.targets.runnable(filename)?;
        self.run_default(Some(function))
    }

    fn run_default(&self, entry: Option<&str>) -> Result<RunOutcome, ScriptGenError> {
        let target = self.targets.runnable(None)?;
        let script = load_persisted(&target.filename)?;
        Ok(self.runner.run(&script, entry)?)
    }
}
