//! Core data model for script generation.
//!
//! This module contains:
//! - `Statement`: a fragment line parsed into text and receiver references,
//!   plus the `Bindings` used to rebind receivers when rendering.
//! - `Stage` / `StageSpec`: pipeline steps contributing imports and fragments.
//! - `ResultWidget` / `WidgetSpec`: result displays with explicit capabilities.

mod stage;
mod statement;
mod widget;

pub use stage::*;
pub use statement::*;
pub use widget::*;
