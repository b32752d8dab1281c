use std::path::{Path, PathBuf};

/// Where an attackgen project keeps its config, scripts, pipelines, and results.
///
/// Pure path arithmetic; frontends create the directories.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    /// `.attackgen`
    pub meta_dir: PathBuf,
    pub project_config_path: PathBuf,
    /// Directory for generated and hand-written scripts.
    pub scripts_dir: PathBuf,
    /// Directory for pipeline descriptions.
    pub pipelines_dir: PathBuf,
    /// Directory for attack result files.
    pub results_dir: PathBuf,
}

impl ProjectLayout {
    /// Layout for a project rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let meta_dir = root.join(".attackgen");
        let project_config_path = meta_dir.join("project.json");
        let scripts_dir = root.join("scripts");
        let pipelines_dir = root.join("pipelines");
        let results_dir = root.join("results");

        Self { root, meta_dir, project_config_path, scripts_dir, pipelines_dir, results_dir }
    }

    /// Resolve a path from config or the command line against the root,
    /// leaving absolute paths untouched.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
