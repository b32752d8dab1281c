use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use attackgen_core::project::{save_project_config, ProjectConfig, ProjectLayout};
use serde::Serialize;

use crate::commands::{load_project, print_dir_status};
use crate::{canonicalize_or_current, infer_project_name};

#[derive(Serialize)]
pub struct ProjectInfoSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub root: String,
    pub config_file: String,
    pub config_version: String,
    pub default_script: String,
    pub default_runner: String,
    pub available_runners: Vec<String>,
    pub layout: ProjectInfoLayout,
    pub pipelines: Vec<String>,
}

#[derive(Serialize)]
pub struct ProjectInfoLayout {
    pub meta_dir: String,
    pub scripts_dir: String,
    pub pipelines_dir: String,
    pub results_dir: String,
}

/// Initialize a new project at `root`.
pub fn init_project_command(root: &str, name: Option<String>) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let layout = ProjectLayout::new(&root_path);

    // Derive project name if not provided.
    let project_name = match name {
        Some(n) => n,
        None => infer_project_name(&root_path),
    };

    for (label, dir) in [
        ("meta", &layout.meta_dir),
        ("scripts", &layout.scripts_dir),
        ("pipelines", &layout.pipelines_dir),
        ("results", &layout.results_dir),
    ] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {label} dir: {}", dir.display()))?;
    }

    let config = ProjectConfig::new(&project_name);
    save_project_config(&layout, &config)?;

    println!("Initialized attackgen project:");
    println!("  Name: {}", project_name);
    println!("  Root: {}", layout.root.display());
    println!("  Config: {}", layout.project_config_path.display());
    println!("  Default script: {}", config.default_script);
    println!("  Scripts dir: {}", layout.scripts_dir.display());
    println!("  Pipelines dir: {}", layout.pipelines_dir.display());
    println!("  Results dir: {}", layout.results_dir.display());

    Ok(())
}

/// Show basic information about an existing project.
pub fn project_info_command(root: &str, json: bool) -> Result<()> {
    let ctx = load_project(root)?;
    let layout = &ctx.layout;
    let config = &ctx.config;
    let available_runners = ctx.runners().names();
    let default_runner = ctx.runner_name(None);
    let pipelines = collect_pipeline_files(&layout.pipelines_dir)?;

    if json {
        let snapshot = ProjectInfoSnapshot {
            name: config.name.clone(),
            description: config.description.clone(),
            root: layout.root.display().to_string(),
            config_file: layout.project_config_path.display().to_string(),
            config_version: config.config_version.clone(),
            default_script: config.default_script.clone(),
            default_runner,
            available_runners,
            layout: ProjectInfoLayout {
                meta_dir: layout.meta_dir.display().to_string(),
                scripts_dir: layout.scripts_dir.display().to_string(),
                pipelines_dir: layout.pipelines_dir.display().to_string(),
                results_dir: layout.results_dir.display().to_string(),
            },
            pipelines,
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("attackgen Project Info");
    println!("======================");
    println!("Name: {}", config.name);
    if let Some(desc) = &config.description {
        println!("Description: {}", desc);
    }
    println!("Root: {}", layout.root.display());
    println!("Config file: {}", layout.project_config_path.display());
    println!("Config version: {}", config.config_version);
    println!("Default script: {}", config.default_script);
    println!("Default runner: {}", default_runner);
    println!("Available runners: {}", available_runners.join(", "));
    println!();

    println!("Directories:");
    print_dir_status("Meta dir (.attackgen)", &layout.meta_dir);
    print_dir_status("Scripts dir", &layout.scripts_dir);
    print_dir_status("Pipelines dir", &layout.pipelines_dir);
    print_dir_status("Results dir", &layout.results_dir);
    println!();

    println!("Pipelines ({}):", pipelines.len());
    if pipelines.is_empty() {
        println!("  (none)");
    }
    for name in pipelines {
        println!("  - {}", name);
    }

    Ok(())
}

/// File names of pipeline descriptions (`.yaml`, `.yml`, `.json`), sorted.
pub fn collect_pipeline_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !dir.is_dir() {
        return Ok(names);
    }
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?
    {
        let path = entry?.path();
        let is_pipeline = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml") | Some("json")
        );
        if path.is_file() && is_pipeline {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
