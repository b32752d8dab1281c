use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::model::{
    is_reserved_fragment, Bindings, Capability, Stage, INIT_FRAGMENT, NONE_STAGE_NAME,
};
use crate::pipeline::Pipeline;
use crate::services::runner::RunnerError;

/// Format of the generation timestamp in the script header.
pub const HEADER_TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H.%M.%S";

/// Indentation unit used when rendering the buffer.
const INDENT: &str = "    ";

/// Indentation of class members (attributes and `def` lines).
const MEMBER_LEVEL: usize = 1;

/// Indentation of method bodies.
const BODY_LEVEL: usize = 2;

#[derive(Debug, Error)]
pub enum ScriptGenError {
    /// Only the default target can be executed.
    #[error(
        "Script Error: Cannot run script from non-default target {requested} (default is {default})"
    )]
    NonDefaultTarget { requested: String, default: String },

    #[error("Preprocessing slot {slot} is out of range; {max} slots are available")]
    SlotOutOfRange { slot: usize, max: usize },

    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

/// Source of the header timestamp.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at one instant; regeneration becomes byte-reproducible.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Project-level knobs for the fixed parts of generated scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptTemplate {
    /// Import line that brings the base class into scope.
    pub base_import: String,
    /// Base class the generated `UserScript` extends.
    pub base_class: String,
    /// Import line for the preprocessing package.
    pub preprocessing_import: String,
    /// Name the preprocessing package is bound to by `preprocessing_import`.
    pub preprocessing_alias: String,
    /// Expression yielding the raw trace source fed to the first stage.
    pub trace_root: String,
    pub script_name: String,
    pub script_description: String,
}

impl Default for ScriptTemplate {
    fn default() -> Self {
        Self {
            base_import: "from chipwhisperer.common.scripts._base import UserScriptBase".into(),
            base_class: "UserScriptBase".into(),
            preprocessing_import: "import chipwhisperer.analyzer.preprocessing as preprocessing"
                .into(),
            preprocessing_alias: "preprocessing".into(),
            trace_root: "self.api.project().traceManager()".into(),
            script_name: "Auto-generated".into(),
            script_description: "Auto-generated Attack Script".into(),
        }
    }
}

/// One emitted line and its indentation level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub text: String,
    pub indent: usize,
}

/// Append-only line buffer, rebuilt from scratch on each regeneration.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuffer {
    lines: Vec<ScriptLine>,
}

impl ScriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: impl Into<String>, indent: usize) {
        self.lines.push(ScriptLine { text: text.into(), indent });
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render with four spaces per level; blank lines carry no indentation.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if !line.text.is_empty() {
                for _ in 0..line.indent {
                    out.push_str(INDENT);
                }
                out.push_str(&line.text);
            }
            out.push('\n');
        }
        out
    }

    fn top(&mut self, text: impl Into<String>) {
        self.append(text, 0);
    }

    fn member(&mut self, text: impl Into<String>) {
        self.append(text, MEMBER_LEVEL);
    }

    fn body(&mut self, text: impl Into<String>) {
        self.append(text, BODY_LEVEL);
    }
}

/// Generated script text together with the instant stamped into its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub text: String,
    pub generated_at: NaiveDateTime,
}

/// Builds the `UserScript` program text from a pipeline.
pub struct ScriptAssembler {
    template: ScriptTemplate,
    clock: Box<dyn Clock>,
    buffer: ScriptBuffer,
}

impl ScriptAssembler {
    pub fn new(template: ScriptTemplate, clock: Box<dyn Clock>) -> Self {
        Self { template, clock, buffer: ScriptBuffer::new() }
    }

    pub fn with_system_clock(template: ScriptTemplate) -> Self {
        Self::new(template, Box::new(SystemClock))
    }

    pub fn template(&self) -> &ScriptTemplate {
        &self.template
    }

    pub fn buffer(&self) -> &ScriptBuffer {
        &self.buffer
    }

    /// Clear the buffer and rebuild the whole script from `pipeline`.
    pub fn regenerate(&mut self, pipeline: &Pipeline) -> GeneratedScript {
        let generated_at = self.clock.now();
        self.buffer.clear();

        self.emit_header(generated_at);
        self.emit_imports(pipeline);
        self.emit_class(pipeline);
        self.emit_attack_methods(pipeline);
        self.emit_utility_methods(pipeline);

        debug!(lines = self.buffer.len(), "regenerated script buffer");
        GeneratedScript { text: self.buffer.render(), generated_at }
    }

    fn emit_header(&mut self, generated_at: NaiveDateTime) {
        let stamp = generated_at.format(HEADER_TIMESTAMP_FORMAT);
        self.buffer.top(format!("# Date Auto-Generated: {stamp}"));
        self.buffer.top(self.template.base_import.clone());
    }

    fn emit_imports(&mut self, pipeline: &Pipeline) {
        let buffer = &mut self.buffer;

        buffer.top("# Imports from Preprocessing");
        buffer.top(self.template.preprocessing_import.clone());
        for stage in pipeline.preprocessing().flatten() {
            for line in stage.import_statements() {
                buffer.top(line.clone());
            }
        }

        buffer.top("# Imports from Attack");
        if let Some(attack) = pipeline.attack() {
            for line in attack.import_statements() {
                buffer.top(line.clone());
            }
        }

        buffer.top("# Imports from utilList");
        for utility in pipeline.utilities().filter(|u| takes_part(*u)) {
            for line in utility.import_statements() {
                buffer.top(line.clone());
            }
        }

        buffer.top("");
    }

    fn emit_class(&mut self, pipeline: &Pipeline) {
        let template = &self.template;
        let buffer = &mut self.buffer;

        buffer.top(format!("class UserScript({}):", template.base_class));
        buffer.member(format!("name = \"{}\"", template.script_name));
        buffer.member(format!("description = \"{}\"", template.script_description));

        buffer.member("def __init__(self, api):");
        buffer.body(format!("{}.__init__(self, api)", template.base_class));
        buffer.body("self.initProject()");
        buffer.body("self.initPreprocessing()");
        buffer.body("self.initAnalysis()");
        buffer.body("self.initReporting()");

        buffer.member("def initProject(self):");
        buffer.body("pass");

        buffer.member("def initPreprocessing(self):");
        let mut last_output = template.trace_root.clone();
        for (slot, stage) in pipeline.preprocessing().enumerate() {
            let Some(stage) = stage else { continue };
            if stage.display_name() == NONE_STAGE_NAME {
                debug!(slot, "skipping placeholder preprocessing stage");
                continue;
            }
            let instance = format!("ppMod{slot}");
            let class = stage.type_name();
            buffer.body(format!(
                "{instance} = {}.{class}.{class}(None, {last_output})",
                template.preprocessing_alias
            ));
            let bindings = Bindings::new(format!("{instance}."), "self.");
            for statement in stage.statements(INIT_FRAGMENT) {
                buffer.body(statement.render(&bindings));
            }
            buffer.body(format!("{instance}.init()"));
            last_output = instance;
        }
        buffer.body(format!("self.traces = {last_output}"));

        buffer.member("def initAnalysis(self):");
        match pipeline.attack() {
            Some(attack) => {
                buffer.body(format!("self.attack = {}()", attack.type_name()));
                let bindings = Bindings::new("self.attack.", "self.");
                for statement in attack.statements(INIT_FRAGMENT) {
                    buffer.body(statement.render(&bindings));
                }
            }
            None => buffer.body("pass"),
        }

        buffer.member("def initReporting(self):");
        buffer.body("# Configures the attack observers (usually a set of GUI widgets)");
        let mut wired = 0;
        for widget in pipeline.widgets() {
            if widget.supports(Capability::TraceSource) {
                buffer.body(format!(
                    "self.api.resultWidgets[\"{}\"].setTraceSource(self.traces)",
                    widget.name()
                ));
                wired += 1;
            }
            if widget.supports(Capability::AnalysisSource) {
                buffer.body(format!(
                    "self.api.resultWidgets[\"{}\"].setAnalysisSource(self.attack)",
                    widget.name()
                ));
                wired += 1;
            }
        }
        if wired == 0 {
            buffer.body("pass");
        }

        buffer.member("def run(self):");
        buffer.body("self.attack.processTraces()");
    }

    fn emit_attack_methods(&mut self, pipeline: &Pipeline) {
        let Some(attack) = pipeline.attack() else { return };
        let Some(fragments) = attack.fragments() else { return };

        let bindings = Bindings::new("self.api.getAttack().", "self.");
        for group in fragments.groups().iter().filter(|g| !is_reserved_fragment(&g.key)) {
            self.buffer.member(format!("def {}(self):", group.key));
            if group.statements.is_empty() {
                self.buffer.body("pass");
            }
            for statement in &group.statements {
                self.buffer.body(statement.render(&bindings));
            }
        }
    }

    fn emit_utility_methods(&mut self, pipeline: &Pipeline) {
        for (index, utility) in pipeline.utilities().enumerate() {
            if !takes_part(utility) {
                continue;
            }
            let Some(fragments) = utility.fragments() else { continue };

            let bindings = Bindings::new(format!("self.parent.utilList[{index}]."), "self.");
            for group in fragments.groups() {
                if is_reserved_fragment(&group.key) || group.statements.is_empty() {
                    continue;
                }
                self.buffer.member(format!("def {}_{}(self):", utility.type_name(), group.key));
                for statement in &group.statements {
                    self.buffer.body(statement.render(&bindings));
                }
            }
        }
    }
}

/// Utilities contribute only when visible and declaring fragment groups.
fn takes_part(utility: &dyn Stage) -> bool {
    utility.is_visible() && utility.fragments().is_some()
}
