use std::path::Path;

use anyhow::Result;
use attackgen_core::project::ProjectContext;

use crate::canonicalize_or_current;

/// Resolve `root` and load the project found there.
pub fn load_project(root: &str) -> Result<ProjectContext> {
    let root_path = canonicalize_or_current(root)?;
    ProjectContext::from_root(root_path)
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}
