//! attackgen-core
//!
//! Core library for building side-channel attack scripts from a configured
//! pipeline of stages, and for shaping attack results into plot-ready series.
//!
//! This crate defines the stage model, pipeline descriptions, project layout,
//! the script assembler and session, the runner plugins that execute
//! generated scripts, and the result series extractor.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends (CLI, GUI shells, etc.).

pub mod model;
pub mod pipeline;
pub mod project;
pub mod results;
pub mod services;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
