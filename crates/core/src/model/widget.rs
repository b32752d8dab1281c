use serde::{Deserialize, Serialize};

/// Optional source a result widget can be wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Widget accepts `setTraceSource(traces)`.
    TraceSource,
    /// Widget accepts `setAnalysisSource(attack)`.
    AnalysisSource,
}

/// A registered result-display widget that generated scripts wire up.
pub trait ResultWidget {
    fn name(&self) -> &str;
    fn supports(&self, capability: Capability) -> bool;
}

/// Serializable widget description, as written in pipeline files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetSpec {
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl WidgetSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), capabilities: Vec::new() }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }
}

impl ResultWidget for WidgetSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
