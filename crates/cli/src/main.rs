use anyhow::Result;
use attackgen::commands::{
    generate_command, init_project_command, list_runners_command, project_info_command,
    run_function_command, series_command, SeriesKind,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Attack script generator CLI.
///
/// This CLI is a thin wrapper around `attackgen-core` (exposed in code as
/// `attackgen_core`). All substantive logic lives in the library so it can be
/// tested thoroughly and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "attackgen",
    version,
    about = "Generate side-channel attack scripts and extract result series",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new attackgen project at the given root.
    ///
    /// This will:
    /// - Create a `.attackgen` metadata directory.
    /// - Create `scripts`, `pipelines`, and `results` directories.
    /// - Write a `.attackgen/project.json` config file.
    InitProject {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Optional project name. If omitted, the name is derived from the root directory.
        #[arg(long)]
        name: Option<String>,
    },

    /// Show basic information about an existing project.
    ProjectInfo {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Regenerate the auto-generated script from a pipeline description.
    ///
    /// The script is written to the project's default script path along with
    /// a `.meta.json` sidecar, then handed to the selected runner.
    Generate {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Pipeline file (YAML, or JSON with a `.json` extension).
        #[arg(long)]
        pipeline: String,

        /// Print the generated script instead of a summary.
        #[arg(long, default_value_t = false)]
        print: bool,

        /// Persist the script without running it.
        #[arg(long, default_value_t = false)]
        no_run: bool,

        /// Runner to use (defaults to the project's configured runner).
        #[arg(long)]
        runner: Option<String>,
    },

    /// Run one function of the default script.
    RunFunction {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Name of the script method to invoke.
        #[arg(long)]
        function: String,

        /// Script file; only the default script may be run.
        #[arg(long)]
        file: Option<String>,

        /// Runner to use (defaults to the project's configured runner).
        #[arg(long)]
        runner: Option<String>,
    },

    /// List available script runners.
    ListRunners {
        /// Project root directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        root: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Extract a plot-ready series from an attack results file.
    Series {
        /// Results file (JSON).
        #[arg(long)]
        results: String,

        /// Subkey index.
        #[arg(long)]
        subkey: usize,

        /// Series to extract.
        #[arg(long, value_enum)]
        kind: SeriesKind,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::InitProject { root, name } => init_project_command(&root, name)?,
        Command::ProjectInfo { root, json } => project_info_command(&root, json)?,
        Command::Generate { root, pipeline, print, no_run, runner } => {
            generate_command(&root, &pipeline, print, no_run, runner.as_deref())?
        }
        Command::RunFunction { root, function, file, runner } => {
            run_function_command(&root, &function, file.as_deref(), runner.as_deref())?
        }
        Command::ListRunners { root, json } => list_runners_command(&root, json)?,
        Command::Series { results, subkey, kind, json } => {
            series_command(&results, subkey, kind, json)?
        }
    }

    Ok(())
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
