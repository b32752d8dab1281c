//! Project configuration and on-disk layout.
//!
//! - `ProjectConfig`: serializable project metadata (`.attackgen/project.json`).
//! - `ProjectLayout`: computed paths for project directories/files.
//! - `ProjectContext`: layout + loaded config, with runner selection helpers.

mod config;
mod context;
mod layout;
mod util;

pub use config::*;
pub use context::*;
pub use layout::*;
pub use util::*;
