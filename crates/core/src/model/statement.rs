use std::fmt;

use serde::{Deserialize, Serialize};

/// Object a fragment statement refers to through a receiver prefix.
///
/// Fragments are written from the point of view of the stage that owns them:
/// `self.` names the stage itself and `UserScript.` names the generated script.
/// The assembler decides what each receiver becomes in the emitted program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Receiver {
    /// The stage that declared the fragment (`self.`).
    Stage,
    /// The generated script class (`UserScript.`).
    Script,
}

impl Receiver {
    const ALL: [Receiver; 2] = [Receiver::Stage, Receiver::Script];

    /// Source spelling of the receiver prefix, including the trailing dot.
    pub fn token(self) -> &'static str {
        match self {
            Receiver::Stage => "self.",
            Receiver::Script => "UserScript.",
        }
    }
}

/// One piece of a parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal source text, emitted verbatim.
    Text(String),
    /// A receiver prefix to be rebound at render time.
    Ref(Receiver),
}

/// Replacement prefixes applied to receiver references when rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bindings {
    pub stage: String,
    pub script: String,
}

impl Bindings {
    pub fn new(stage: impl Into<String>, script: impl Into<String>) -> Self {
        Self { stage: stage.into(), script: script.into() }
    }

    /// Bindings that reproduce the statement exactly as written.
    pub fn identity() -> Self {
        Self::new(Receiver::Stage.token(), Receiver::Script.token())
    }

    fn prefix(&self, receiver: Receiver) -> &str {
        match receiver {
            Receiver::Stage => &self.stage,
            Receiver::Script => &self.script,
        }
    }
}

/// A fragment line with its receiver references resolved structurally.
///
/// Receivers are only recognized at identifier boundaries and never inside
/// string literals or comments, so `print("self.x")` or `# UserScript.run`
/// survive rebinding untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Statement {
    segments: Vec<Segment>,
}

impl Statement {
    /// Parse a single source line into text and receiver segments.
    pub fn parse(line: &str) -> Self {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut quote: Option<&'static str> = None;
        let mut pos = 0;

        while let Some(ch) = line[pos..].chars().next() {
            let rest = &line[pos..];

            if let Some(delim) = quote {
                if ch == '\\' {
                    text.push(ch);
                    pos += ch.len_utf8();
                    if let Some(escaped) = line[pos..].chars().next() {
                        text.push(escaped);
                        pos += escaped.len_utf8();
                    }
                    continue;
                }
                if rest.starts_with(delim) {
                    text.push_str(delim);
                    pos += delim.len();
                    quote = None;
                    continue;
                }
                text.push(ch);
                pos += ch.len_utf8();
                continue;
            }

            if ch == '#' {
                text.push_str(rest);
                break;
            }

            if let Some(delim) = opening_quote(rest) {
                text.push_str(delim);
                pos += delim.len();
                quote = Some(delim);
                continue;
            }

            if at_identifier_boundary(&line[..pos]) {
                if let Some(receiver) =
                    Receiver::ALL.into_iter().find(|r| rest.starts_with(r.token()))
                {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Ref(receiver));
                    pos += receiver.token().len();
                    continue;
                }
            }

            text.push(ch);
            pos += ch.len_utf8();
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Render the statement with each receiver replaced by its bound prefix.
    pub fn render(&self, bindings: &Bindings) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Ref(receiver) => out.push_str(bindings.prefix(*receiver)),
            }
        }
        out
    }
}

fn opening_quote(rest: &str) -> Option<&'static str> {
    ["\"\"\"", "'''", "\"", "'"].into_iter().find(|q| rest.starts_with(q))
}

fn at_identifier_boundary(before: &str) -> bool {
    match before.chars().next_back() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || c == '_' || c == '.'),
    }
}

impl From<String> for Statement {
    fn from(line: String) -> Self {
        Statement::parse(&line)
    }
}

impl From<&str> for Statement {
    fn from(line: &str) -> Self {
        Statement::parse(line)
    }
}

impl From<Statement> for String {
    fn from(statement: Statement) -> Self {
        statement.render(&Bindings::identity())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&Bindings::identity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebind(line: &str) -> String {
        Statement::parse(line).render(&Bindings::new("ppMod0.", "self."))
    }

    #[test]
    fn parse_splits_text_around_receivers() {
        let statement = Statement::parse("self.a(UserScript.b)");
        assert_eq!(
            statement.segments(),
            [
                Segment::Ref(Receiver::Stage),
                Segment::Text("a(".into()),
                Segment::Ref(Receiver::Script),
                Segment::Text("b)".into()),
            ]
        );
    }

    #[test]
    fn rebinds_both_receivers() {
        assert_eq!(rebind("self.setEnabled(UserScript.traces)"), "ppMod0.setEnabled(self.traces)");
    }

    #[test]
    fn script_rebinding_is_not_reapplied() {
        // `UserScript.` becomes `self.`, which must not then turn into `ppMod0.`.
        assert_eq!(rebind("UserScript.api.foo()"), "self.api.foo()");
    }

    #[test]
    fn ignores_receivers_inside_strings_and_comments() {
        let quoted = "print('self.x', \"UserScript.y\")";
        assert_eq!(rebind(quoted), quoted);
        assert_eq!(rebind("self.go()  # self.stop()"), "ppMod0.go()  # self.stop()");
        assert_eq!(
            rebind("s = \"\"\"it's self.x\"\"\"; self.y = 1"),
            "s = \"\"\"it's self.x\"\"\"; ppMod0.y = 1"
        );
    }

    #[test]
    fn ignores_receivers_inside_identifiers() {
        assert_eq!(rebind("myself.x = other.self.y"), "myself.x = other.self.y");
        assert_eq!(rebind("f(self.a,self.b)"), "f(ppMod0.a,ppMod0.b)");
    }

    #[test]
    fn escaped_quotes_do_not_end_literal() {
        assert_eq!(rebind("x = 'a\\'self.b'; self.c"), "x = 'a\\'self.b'; ppMod0.c");
    }

    #[test]
    fn identity_render_reproduces_source() {
        let line = "self.setReportingInterval(UserScript.interval) # 'self.'";
        assert_eq!(Statement::parse(line).to_string(), line);
    }
}
