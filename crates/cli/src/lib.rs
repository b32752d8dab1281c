use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod commands;

/// Absolute project root for a `--root` argument. Roots that do not exist
/// yet (as with `init-project`) are anchored at the working directory.
pub fn canonicalize_or_current(root: &str) -> Result<PathBuf> {
    let cwd = env::current_dir().context("Failed to get current directory")?;
    let path = Path::new(root);
    if path == Path::new(".") {
        return Ok(cwd);
    }
    Ok(path.canonicalize().unwrap_or_else(|_| cwd.join(path)))
}

/// Default project name: the root's directory name, or `unnamed-project`
/// for roots like `/` that have none.
pub fn infer_project_name(root: &Path) -> String {
    match root.file_name().and_then(|name| name.to_str()) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => "unnamed-project".to_owned(),
    }
}
