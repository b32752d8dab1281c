//! Pipeline descriptions and the live stage configuration they build.
//!
//! A pipeline file (YAML or JSON, chosen by extension) lists up to
//! `MAX_PREPROCESSING_SLOTS` preprocessing slots, an optional attack, utility
//! stages, and the result widgets the generated script should wire up.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{Fragments, ResultWidget, Stage, StageSpec, WidgetSpec};
use crate::services::scriptgen::ScriptGenError;

/// Number of preprocessing slots the generator exposes.
pub const MAX_PREPROCESSING_SLOTS: usize = 4;

/// Live stage configuration consumed by the script assembler.
pub struct Pipeline {
    preprocessing: Vec<Option<Box<dyn Stage>>>,
    attack: Option<Box<dyn Stage>>,
    utilities: Vec<Box<dyn Stage>>,
    widgets: Vec<Box<dyn ResultWidget>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Empty pipeline: all preprocessing slots vacant, no attack.
    pub fn new() -> Self {
        Self {
            preprocessing: (0..MAX_PREPROCESSING_SLOTS).map(|_| None).collect(),
            attack: None,
            utilities: Vec::new(),
            widgets: Vec::new(),
        }
    }

    /// Place (or clear) the preprocessing stage at `slot`.
    pub fn set_preprocessing(
        &mut self,
        slot: usize,
        stage: Option<Box<dyn Stage>>,
    ) -> Result<(), ScriptGenError> {
        let entry = self.preprocessing.get_mut(slot).ok_or(ScriptGenError::SlotOutOfRange {
            slot,
            max: MAX_PREPROCESSING_SLOTS,
        })?;
        *entry = stage;
        Ok(())
    }

    pub fn set_attack(&mut self, stage: Option<Box<dyn Stage>>) {
        self.attack = stage;
    }

    /// Append a utility stage and return its index in the utility list.
    pub fn add_utility(&mut self, stage: Box<dyn Stage>) -> usize {
        self.utilities.push(stage);
        self.utilities.len() - 1
    }

    pub fn add_widget(&mut self, widget: Box<dyn ResultWidget>) {
        self.widgets.push(widget);
    }

    /// Preprocessing slots in order, vacant ones included.
    pub fn preprocessing(&self) -> impl Iterator<Item = Option<&dyn Stage>> + '_ {
        self.preprocessing.iter().map(|slot| slot.as_deref())
    }

    pub fn attack(&self) -> Option<&dyn Stage> {
        self.attack.as_deref()
    }

    pub fn utilities(&self) -> impl Iterator<Item = &dyn Stage> + '_ {
        self.utilities.iter().map(|u| &**u)
    }

    pub fn widgets(&self) -> impl Iterator<Item = &dyn ResultWidget> + '_ {
        self.widgets.iter().map(|w| &**w)
    }
}

/// Serializable pipeline description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    #[serde(default)]
    pub preprocessing: Vec<Option<StageSpec>>,
    #[serde(default)]
    pub attack: Option<StageSpec>,
    #[serde(default)]
    pub utilities: Vec<StageSpec>,
    #[serde(default)]
    pub widgets: Vec<WidgetSpec>,
}

impl PipelineSpec {
    /// Check everything that ends up as an identifier in generated code.
    pub fn validate(&self) -> Result<(), ScriptGenError> {
        if self.preprocessing.len() > MAX_PREPROCESSING_SLOTS {
            return Err(ScriptGenError::InvalidPipeline(format!(
                "{} preprocessing slots given, at most {} supported",
                self.preprocessing.len(),
                MAX_PREPROCESSING_SLOTS
            )));
        }

        let stages = self
            .preprocessing
            .iter()
            .flatten()
            .chain(self.attack.iter())
            .chain(self.utilities.iter());
        for stage in stages {
            if !is_identifier(&stage.type_name) {
                return Err(ScriptGenError::InvalidPipeline(format!(
                    "stage type '{}' is not a valid identifier",
                    stage.type_name
                )));
            }
            if let Some(fragments) = &stage.fragments {
                validate_fragments(&stage.type_name, fragments)?;
            }
        }

        if let Some(widget) =
            self.widgets.iter().find(|w| w.name.contains(['"', '\\', '\n', '\r']))
        {
            return Err(ScriptGenError::InvalidPipeline(format!(
                "widget name {:?} may not contain quotes, backslashes, or line breaks",
                widget.name
            )));
        }
        Ok(())
    }

    /// Validate and materialize the description into a live pipeline.
    pub fn into_pipeline(self) -> Result<Pipeline, ScriptGenError> {
        self.validate()?;
        let mut pipeline = Pipeline::new();
        for (slot, stage) in self.preprocessing.into_iter().enumerate() {
            pipeline.set_preprocessing(slot, stage.map(|s| Box::new(s) as Box<dyn Stage>))?;
        }
        pipeline.set_attack(self.attack.map(|s| Box::new(s) as Box<dyn Stage>));
        for utility in self.utilities {
            pipeline.add_utility(Box::new(utility));
        }
        for widget in self.widgets {
            pipeline.add_widget(Box::new(widget));
        }
        Ok(pipeline)
    }
}

/// Load a pipeline description; `.json` files are JSON, anything else YAML.
pub fn load_pipeline_spec(path: &Path) -> Result<PipelineSpec> {
    let body = fs::read(path)
        .with_context(|| format!("Failed to read pipeline file at {}", path.display()))?;
    let spec: PipelineSpec = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_slice(&body).context("Failed to parse pipeline JSON")?
    } else {
        serde_yaml::from_slice(&body).context("Failed to parse pipeline YAML")?
    };
    Ok(spec)
}

/// Keys must be unique identifiers and every statement a single line.
fn validate_fragments(stage: &str, fragments: &Fragments) -> Result<(), ScriptGenError> {
    let mut seen = HashSet::new();
    for group in fragments.groups() {
        if !is_identifier(&group.key) {
            return Err(ScriptGenError::InvalidPipeline(format!(
                "fragment key '{}' of stage '{}' is not a valid identifier",
                group.key, stage
            )));
        }
        if !seen.insert(group.key.as_str()) {
            return Err(ScriptGenError::InvalidPipeline(format!(
                "fragment key '{}' appears more than once in stage '{}'",
                group.key, stage
            )));
        }
        if let Some(statement) =
            group.statements.iter().find(|s| s.to_string().contains(['\n', '\r']))
        {
            return Err(ScriptGenError::InvalidPipeline(format!(
                "statement {:?} in '{}.{}' spans several lines",
                statement.to_string(),
                stage,
                group.key
            )));
        }
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_checked() {
        assert!(is_identifier("CPA"));
        assert!(is_identifier("_private2"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("has space"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn too_many_slots_is_rejected() {
        let spec = PipelineSpec { preprocessing: vec![None; 5], ..Default::default() };
        assert!(matches!(spec.validate(), Err(ScriptGenError::InvalidPipeline(_))));
    }

    #[test]
    fn slot_out_of_range_is_rejected() {
        let mut pipeline = Pipeline::new();
        let err = pipeline.set_preprocessing(4, None).unwrap_err();
        assert!(matches!(err, ScriptGenError::SlotOutOfRange { slot: 4, max: 4 }));
    }
}
