//! Script generation services.
//!
//! - `scriptgen`: the line buffer and the assembler that turns a pipeline into
//!   `UserScript` source text.
//! - `runner`: persistence, validation, and the runner plugins that execute
//!   persisted scripts.
//! - `session`: the stateful generator tying pipeline, targets, and runner
//!   together.

pub mod runner;
pub mod scriptgen;
pub mod session;
