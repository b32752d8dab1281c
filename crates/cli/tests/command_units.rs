use std::fs;

use attackgen::commands::{
    collect_pipeline_files, generate_command, init_project_command, list_runners_command,
    load_project, project_info_command, run_function_command, series_command, SeriesKind,
};
use attackgen_core::project::{save_project_config, RunnerConfig};
use tempfile::tempdir;

const PIPELINE_JSON: &str = r#"{
    "preprocessing": [
        null,
        {"type": "Decimate",
         "fragments": [{"key": "init", "statements": ["self.setFactor(2)"]}]}
    ],
    "attack": {
        "type": "CPA",
        "fragments": [{"key": "go", "statements": ["self.processKnownKey()"]}]
    },
    "utilities": [],
    "widgets": [{"name": "Trace Output Plot", "capabilities": ["trace_source"]}]
}"#;

fn init(root: &std::path::Path) -> String {
    let root_str = root.to_str().unwrap().to_string();
    init_project_command(&root_str, Some("Units".into())).expect("init project");
    root_str
}

#[test]
fn init_then_info_in_both_formats() {
    let dir = tempdir().unwrap();
    let root = init(dir.path());
    project_info_command(&root, false).expect("text info");
    project_info_command(&root, true).expect("json info");

    let ctx = load_project(&root).unwrap();
    assert_eq!(ctx.config.name, "Units");
}

#[test]
fn pipeline_listing_filters_by_extension() {
    let dir = tempdir().unwrap();
    let root = init(dir.path());
    let pipelines = dir.path().join("pipelines");
    fs::write(pipelines.join("b.yml"), "").unwrap();
    fs::write(pipelines.join("a.json"), "{}").unwrap();
    fs::write(pipelines.join("notes.txt"), "").unwrap();
    fs::create_dir_all(pipelines.join("nested.yaml")).unwrap();

    let ctx = load_project(&root).unwrap();
    assert_eq!(collect_pipeline_files(&ctx.layout.pipelines_dir).unwrap(), ["a.json", "b.yml"]);
    assert!(collect_pipeline_files(&dir.path().join("absent")).unwrap().is_empty());
}

#[test]
fn json_pipeline_generates_and_runs_functions() {
    let dir = tempdir().unwrap();
    let root = init(dir.path());
    fs::write(dir.path().join("pipelines").join("decimate.json"), PIPELINE_JSON).unwrap();

    generate_command(&root, "decimate.json", false, false, None).expect("generate");
    let script =
        fs::read_to_string(dir.path().join("scripts").join("auto_generated.py")).unwrap();
    assert!(script.contains(
        "        ppMod1 = preprocessing.Decimate.Decimate(None, self.api.project().traceManager())"
    ));
    assert!(script.contains("        ppMod1.setFactor(2)"));
    assert!(script.contains(
        "        self.api.resultWidgets[\"Trace Output Plot\"].setTraceSource(self.traces)"
    ));
    // `go` is a lifecycle group, not a script method.
    assert!(!script.contains("def go(self)"));

    run_function_command(&root, "run", None, None).expect("default script");
    run_function_command(&root, "run", Some("scripts/auto_generated.py"), None)
        .expect("explicit default script");
    let err = run_function_command(&root, "run", Some("scripts/other.py"), None).unwrap_err();
    assert!(err.to_string().contains("non-default target"));
}

#[test]
fn invalid_pipeline_is_rejected_before_writing() {
    let dir = tempdir().unwrap();
    let root = init(dir.path());
    fs::write(dir.path().join("pipelines").join("bad.yaml"), "attack:\n  type: 'C P A'\n")
        .unwrap();

    let err = generate_command(&root, "bad.yaml", false, true, None).unwrap_err();
    assert!(format!("{err:#}").contains("not a valid identifier"));
    assert!(!dir.path().join("scripts").join("auto_generated.py").exists());
}

#[test]
fn edited_script_is_refused_by_run_function() {
    let dir = tempdir().unwrap();
    let root = init(dir.path());
    fs::write(dir.path().join("pipelines").join("decimate.json"), PIPELINE_JSON).unwrap();
    generate_command(&root, "decimate.json", false, true, None).unwrap();

    let script_path = dir.path().join("scripts").join("auto_generated.py");
    let mut text = fs::read_to_string(&script_path).unwrap();
    text.push_str("print('extra')\n");
    fs::write(&script_path, text).unwrap();

    let err = run_function_command(&root, "run", None, None).unwrap_err();
    assert!(err.to_string().contains("changed since generation"));
}

#[test]
fn list_runners_includes_configured_external_runner() {
    let dir = tempdir().unwrap();
    let root = init(dir.path());
    list_runners_command(&root, false).expect("builtin runners");

    let ctx = load_project(&root).unwrap();
    let mut config = ctx.config.clone();
    config.runner = Some(RunnerConfig { program: "python3".into(), args: vec![] });
    save_project_config(&ctx.layout, &config).unwrap();

    let ctx = load_project(&root).unwrap();
    assert_eq!(ctx.runners().names(), ["external", "validate-only"]);
    list_runners_command(&root, true).expect("json runners");
}

#[test]
fn series_command_reports_missing_results_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let err = series_command(missing.to_str().unwrap(), 0, SeriesKind::Corr, false).unwrap_err();
    assert!(err.to_string().contains("Failed to read results file"));
}

#[test]
fn series_command_prints_correlation_rows() {
    let dir = tempdir().unwrap();
    let results = dir.path().join("results.json");
    fs::write(
        &results,
        r#"{"num_subkeys": 1,
            "maxes_list": [[{"trace": 5, "maxes": [[0, 0, 0.3], [1, 0, 0.2]]}]],
            "diffs": [[[0.0], [0.0]]],
            "known_key": [0],
            "pge_total": []}"#,
    )
    .unwrap();
    series_command(results.to_str().unwrap(), 0, SeriesKind::Corr, false).expect("corr text");
    series_command(results.to_str().unwrap(), 0, SeriesKind::Corr, true).expect("corr json");
    series_command(results.to_str().unwrap(), 0, SeriesKind::Pge, false).expect("empty pge");
    let err = series_command(results.to_str().unwrap(), 3, SeriesKind::Pge, false).unwrap_err();
    assert!(err.to_string().contains("out of range"));
}
