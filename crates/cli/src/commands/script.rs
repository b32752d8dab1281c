use std::path::PathBuf;

use anyhow::{Context, Result};
use attackgen_core::pipeline::{load_pipeline_spec, Pipeline};
use attackgen_core::project::ProjectContext;
use attackgen_core::services::runner::{persist_script, PersistedScript, RunOutcome};
use attackgen_core::services::scriptgen::ScriptAssembler;
use attackgen_core::services::session::ScriptSession;
use tracing::info;

use crate::commands::load_project;

/// Regenerate the auto-generated script from a pipeline file, persist it,
/// and (unless `no_run`) hand it to the selected runner.
///
/// With `print`, the script text is the only thing written to stdout.
pub fn generate_command(
    root: &str,
    pipeline: &str,
    print: bool,
    no_run: bool,
    runner: Option<&str>,
) -> Result<()> {
    let ctx = load_project(root)?;
    let pipeline_path = resolve_pipeline_path(&ctx, pipeline);
    let pipeline = load_pipeline_spec(&pipeline_path)?
        .into_pipeline()
        .with_context(|| format!("Invalid pipeline {}", pipeline_path.display()))?;

    let script_path = ctx.default_script_path();
    let mut assembler = ScriptAssembler::with_system_clock(ctx.config.template.clone());

    let (text, persisted, run) = if no_run {
        let script = assembler.regenerate(&pipeline);
        let persisted = persist_script(&script_path, &script)?;
        (script.text, persisted, None)
    } else {
        let registry = ctx.runners();
        let runner = registry.resolve(&ctx.runner_name(runner))?;
        let mut session = ScriptSession::new(pipeline, assembler, script_path, runner);
        let outcome = session.reload_scripts()?;
        (outcome.script.text, outcome.persisted, Some(outcome.run))
    };
    info!(
        pipeline = %pipeline_path.display(),
        script = %persisted.path.display(),
        "generated script"
    );

    if print {
        print!("{}", text);
        return Ok(());
    }

    print_persisted(&persisted);
    match run {
        Some(outcome) => print_outcome(&outcome),
        None => println!("Run: skipped (--no-run)"),
    }
    Ok(())
}

/// Run one function of the project's default script.
///
/// `file` may name the default script explicitly; any other file is refused.
pub fn run_function_command(
    root: &str,
    function: &str,
    file: Option<&str>,
    runner: Option<&str>,
) -> Result<()> {
    let ctx = load_project(root)?;
    let registry = ctx.runners();
    let runner = registry.resolve(&ctx.runner_name(runner))?;

    let assembler = ScriptAssembler::with_system_clock(ctx.config.template.clone());
    let session = ScriptSession::new(Pipeline::new(), assembler, ctx.default_script_path(), runner);
    let file = file.map(|f| ctx.layout.resolve(f));
    let outcome = session.run_script_function(function, file.as_deref())?;

    print_outcome(&outcome);
    Ok(())
}

/// Pipeline paths are tried relative to the project root first, then inside
/// the project's pipelines directory.
fn resolve_pipeline_path(ctx: &ProjectContext, pipeline: &str) -> PathBuf {
    let direct = ctx.layout.resolve(pipeline);
    if direct.is_file() {
        return direct;
    }
    let in_pipelines_dir = ctx.layout.pipelines_dir.join(pipeline);
    if in_pipelines_dir.is_file() {
        in_pipelines_dir
    } else {
        direct
    }
}

fn print_persisted(persisted: &PersistedScript) {
    println!("Generated script:");
    println!("  Path: {}", persisted.path.display());
    if let Some(meta) = &persisted.metadata {
        println!("  Generated at: {}", meta.generated_at);
        println!("  SHA-256: {}", meta.sha256);
    }
}

fn print_outcome(outcome: &RunOutcome) {
    println!("Run:");
    println!("  Runner: {}", outcome.runner);
    println!("  Script: {}", outcome.script);
    println!("  Entry: {}", outcome.entry.as_deref().unwrap_or("(default flow)"));
    if !outcome.stdout.is_empty() {
        println!("  Stdout:");
        for line in outcome.stdout.lines() {
            println!("    {}", line);
        }
    }
    if !outcome.stderr.is_empty() {
        println!("  Stderr:");
        for line in outcome.stderr.lines() {
            println!("    {}", line);
        }
    }
}
