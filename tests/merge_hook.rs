use std::fs;
use std::path::Path;

use confmerge::hook::PARAMETERS_KEY;
use confmerge::{default_hooks, HookRegistry, MergeParamsHook, MergeSettings, RunParams};
use tempfile::TempDir;
use toml::{Table, Value};

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn table(s: &str) -> Table {
    toml::from_str(s).unwrap()
}

/// Project whose configuration yields
/// `{"model": {"lr": 0.1}, "spark": {"executor.memory": "4g"}, "flag": true}`.
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "conf/base/parameters.yml", "model:\n  lr: 0.1\n");
    write(
        dir.path(),
        "conf/base/spark.toml",
        "[spark]\n\"executor.memory\" = \"4g\"\n",
    );
    write(dir.path(), "conf/base/flags.json", r#"{"flag": true}"#);
    dir
}

#[test]
fn caller_parameters_override_and_spark_is_excluded() {
    let dir = project();
    let hooks: HookRegistry<(), ()> = default_hooks(MergeSettings::for_project(dir.path()));
    let mut run_params = table("[parameters]\nlr = 0.5\n");

    hooks.before_pipeline_run(&mut run_params, &(), &());

    assert_eq!(
        run_params[PARAMETERS_KEY],
        Value::Table(table("lr = 0.5\nflag = true\n"))
    );
}

#[test]
fn excluded_section_may_still_come_from_caller() {
    let dir = project();
    let hook = MergeParamsHook::new(MergeSettings::for_project(dir.path()));
    let mut run_params = table("[parameters]\nspark = \"local[*]\"\n");

    hook.merge_into(&mut run_params);

    let parameters = run_params[PARAMETERS_KEY].as_table().unwrap();
    assert_eq!(parameters["spark"].as_str(), Some("local[*]"));
    assert!(parameters.get("executor.memory").is_none());
}

#[test]
fn loader_failure_without_parameters_yields_empty_table() {
    let dir = project();
    write(dir.path(), "conf/base/broken.yml", "model: {lr: \n");
    let hook = MergeParamsHook::new(MergeSettings::for_project(dir.path()));
    let mut run_params = RunParams::new();

    hook.merge_into(&mut run_params);

    assert_eq!(run_params[PARAMETERS_KEY], Value::Table(Table::new()));
}

#[test]
fn missing_configuration_root_keeps_caller_parameters() {
    let dir = TempDir::new().unwrap();
    let hook = MergeParamsHook::new(MergeSettings::for_project(dir.path().join("absent")));
    let mut run_params = table("[parameters]\nseed = 42\n[runtime_params]\nx = 1\n");
    let before = run_params.clone();

    hook.merge_into(&mut run_params);

    assert_eq!(run_params, before);
}

#[test]
fn run_environment_and_custom_exclusions() {
    let dir = project();
    write(dir.path(), "conf/local/parameters.yml", "model:\n  lr: 0.01\n");
    write(dir.path(), "conf/base/mlflow.yml", "mlflow:\n  uri: http://tracking\n");
    let settings = MergeSettings::for_project(dir.path())
        .with_run_env("local")
        .exclude("mlflow");
    let hook = MergeParamsHook::new(settings);
    let mut run_params = RunParams::new();

    hook.merge_into(&mut run_params);

    assert_eq!(
        run_params[PARAMETERS_KEY],
        Value::Table(table("lr = 0.01\nflag = true\n"))
    );
}

#[test]
fn merging_twice_does_not_accumulate() {
    let dir = project();
    let hook = MergeParamsHook::new(MergeSettings::for_project(dir.path()));
    let mut run_params = RunParams::new();

    hook.merge_into(&mut run_params);
    let first = run_params.clone();
    hook.merge_into(&mut run_params);

    assert_eq!(run_params, first);
}
