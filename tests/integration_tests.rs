//! Integration tests for the `tidytux` command-line surface.

mod common;

use std::fs;

const MIB: u64 = 1024 * 1024;

fn scenario_tree(home: &std::path::Path) -> std::path::PathBuf {
    let target = home.join("Downloads");
    fs::create_dir_all(&target).expect("mkdir");
    common::aged_file(&target, "old-backup.tar.gz", 50 * MIB, 45);
    common::aged_file(&target, "setup_v1.sh", 10 * MIB, 3);
    common::aged_file(&target, "setup_v2.sh", 2048, 1);
    target
}

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: tidytux [OPTIONS]"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
    for flag in ["--yes", "--emergency", "--report-only", "--quiet", "--verbose"] {
        assert!(result.stdout.contains(flag), "help lacks {flag}");
    }
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(
        result.stdout.contains("tidytux"),
        "missing version output; log: {}",
        result.log_path.display()
    );
}

#[test]
fn completions_command_generates_shell_script() {
    let result = common::run_cli_case(
        "completions_command_generates_shell_script",
        &["--completions", "bash"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(
        result.stdout.contains("tidytux"),
        "expected completion script contents; log: {}",
        result.log_path.display()
    );
}

#[test]
fn emergency_yes_run_cleans_and_writes_artifacts() {
    let home = tempfile::tempdir().expect("tempdir");
    scenario_tree(home.path());
    let result = common::run_cli_case_in(
        "emergency_yes_run_cleans_and_writes_artifacts",
        home.path(),
        &["--emergency", "--yes"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(
        result.stdout.contains("Items cleaned: 2"),
        "log: {}",
        result.log_path.display()
    );
    assert!(result.stdout.contains("(62914560 bytes)"));

    let backups = home.path().join(".tidytux").join("backups");
    let runs: Vec<_> = fs::read_dir(&backups).expect("backups").collect();
    assert_eq!(runs.len(), 1);

    let logs: Vec<String> = fs::read_dir(home.path().join(".tidytux").join("logs"))
        .expect("logs")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(logs.iter().any(|n| n.ends_with(".jsonl")), "logs: {logs:?}");
    assert!(logs.iter().any(|n| n.ends_with(".html")), "logs: {logs:?}");
}

#[test]
fn report_only_json_lists_plan_without_changes() {
    let home = tempfile::tempdir().expect("tempdir");
    let target = scenario_tree(home.path());
    let result = common::run_cli_case_in(
        "report_only_json_lists_plan_without_changes",
        home.path(),
        &["-e", "-r", "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let json: serde_json::Value =
        serde_json::from_str(&result.stdout).expect("stdout is the JSON report");
    assert_eq!(json["summary"]["items_cleaned"], 0);
    assert_eq!(json["planned"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["header"]["report_only"], true);
    assert!(!home.path().join(".tidytux").join("backups").exists());
    assert!(target.join("setup_v1.sh").exists());
}

#[test]
fn quiet_mode_prints_nothing() {
    let home = tempfile::tempdir().expect("tempdir");
    scenario_tree(home.path());
    let result = common::run_cli_case_in("quiet_mode_prints_nothing", home.path(), &["-q", "-e"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.is_empty(), "log: {}", result.log_path.display());
}

#[test]
fn missing_target_exits_with_inspection_code() {
    let home = tempfile::tempdir().expect("tempdir");
    let missing = home.path().join("nowhere");
    let result = common::run_cli_case_in(
        "missing_target_exits_with_inspection_code",
        home.path(),
        &["--yes", "--target", missing.to_str().expect("utf8 path")],
    );
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("TT-2001"));
}

#[test]
fn explicit_missing_config_is_rejected() {
    let home = tempfile::tempdir().expect("tempdir");
    let result = common::run_cli_case_in(
        "explicit_missing_config_is_rejected",
        home.path(),
        &["--config", "/definitely/not/here.toml"],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("TT-1002"));
}

#[test]
fn config_file_adds_duplicate_family() {
    let home = tempfile::tempdir().expect("tempdir");
    let target = home.path().join("Downloads");
    fs::create_dir_all(&target).expect("mkdir");
    common::aged_file(&target, "deploy_old.sh", 100, 5);
    common::aged_file(&target, "deploy_new.sh", 100, 1);
    let root = home.path().join(".tidytux");
    fs::create_dir_all(&root).expect("mkdir");
    fs::write(
        root.join("config.toml"),
        "[[dedup.family]]\nname = \"deploy\"\npattern = '^deploy.*\\.sh$'\n",
    )
    .expect("write config");

    let result = common::run_cli_case_in(
        "config_file_adds_duplicate_family",
        home.path(),
        &["-e", "-y", "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let json: serde_json::Value = serde_json::from_str(&result.stdout).expect("json");
    assert_eq!(json["completed"][0]["kind"], "dedup");
    assert!(!target.join("deploy_old.sh").exists());
    assert!(target.join("deploy_new.sh").exists());
}
