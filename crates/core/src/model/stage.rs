use serde::{Deserialize, Serialize};

use crate::model::Statement;

/// Fragment keys that belong to the stage lifecycle rather than to
/// user-invokable script methods.
pub const RESERVED_FRAGMENT_KEYS: [&str; 3] = ["init", "go", "done"];

/// Fragment group holding the statements that configure a freshly built stage.
pub const INIT_FRAGMENT: &str = "init";

/// Display name of the placeholder preprocessing module that does nothing.
pub const NONE_STAGE_NAME: &str = "None";

pub fn is_reserved_fragment(key: &str) -> bool {
    RESERVED_FRAGMENT_KEYS.contains(&key)
}

/// A named bucket of statements belonging to one lifecycle phase of a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentGroup {
    pub key: String,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// Ordered collection of fragment groups, keyed by name.
///
/// Order is declaration order; it decides the order of generated methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragments {
    groups: Vec<FragmentGroup>,
}

impl Fragments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append statements to the group `key`, creating it at the end if needed.
    pub fn push<I, S>(&mut self, key: &str, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        let statements = lines.into_iter().map(Into::into);
        match self.groups.iter().position(|g| g.key == key) {
            Some(idx) => self.groups[idx].statements.extend(statements),
            None => self
                .groups
                .push(FragmentGroup { key: key.to_string(), statements: statements.collect() }),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.key.as_str())
    }

    pub fn groups(&self) -> &[FragmentGroup] {
        &self.groups
    }

    /// Statements of group `key`; a missing group reads as empty.
    pub fn get(&self, key: &str) -> &[Statement] {
        self.groups.iter().find(|g| g.key == key).map(|g| g.statements.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// A configured pipeline step contributing imports and code fragments.
pub trait Stage {
    /// Type name used in constructor calls and utility method names.
    fn type_name(&self) -> &str;

    /// Human-facing name; `None` marks the do-nothing preprocessing module.
    fn display_name(&self) -> &str;

    /// Import lines this stage needs, in declaration order.
    fn import_statements(&self) -> &[String];

    /// Declared fragment groups. `None` means the stage does not take part in
    /// script generation at all, which differs from declaring zero groups.
    fn fragments(&self) -> Option<&Fragments>;

    fn is_visible(&self) -> bool {
        true
    }

    fn statements(&self, key: &str) -> &[Statement] {
        self.fragments().map(|f| f.get(key)).unwrap_or(&[])
    }
}

fn default_visible() -> bool {
    true
}

/// Serializable stage description, as written in pipeline files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragments: Option<Fragments>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl StageSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: None,
            imports: Vec::new(),
            fragments: None,
            visible: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_import(mut self, line: impl Into<String>) -> Self {
        self.imports.push(line.into());
        self
    }

    /// Add a fragment group; this also marks the stage as declaring fragments.
    pub fn with_fragment<I, S>(mut self, key: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Statement>,
    {
        self.fragments.get_or_insert_with(Fragments::new).push(key, lines);
        self
    }

    /// Declare an empty fragment set without adding any group.
    pub fn with_empty_fragments(mut self) -> Self {
        self.fragments.get_or_insert_with(Fragments::new);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

impl Stage for StageSpec {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.type_name)
    }

    fn import_statements(&self) -> &[String] {
        &self.imports
    }

    fn fragments(&self) -> Option<&Fragments> {
        self.fragments.as_ref()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }
}
