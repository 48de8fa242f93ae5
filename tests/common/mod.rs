//! Shared harness: run the `tidytux` binary in an isolated home and keep a
//! per-case log of what it printed.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

pub struct CliResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn log_dir() -> PathBuf {
    let dir = std::env::temp_dir().join("tidytux-cli-tests");
    let _ = fs::create_dir_all(&dir);
    dir
}

/// Run with `HOME` pointed at `home` and colors off.
pub fn run_cli_case_in(case: &str, home: &Path, args: &[&str]) -> CliResult {
    let output = Command::new(env!("CARGO_BIN_EXE_tidytux"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .output()
        .expect("spawn tidytux");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let log_path = log_dir().join(format!("{case}.log"));
    let _ = fs::write(
        &log_path,
        format!(
            "args: {args:?}\nstatus: {:?}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n",
            output.status
        ),
    );
    CliResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

pub fn run_cli_case(case: &str, args: &[&str]) -> CliResult {
    let home = tempfile::tempdir().expect("tempdir");
    run_cli_case_in(case, home.path(), args)
}

/// Sparse file with an mtime `age_days` in the past.
pub fn aged_file(dir: &Path, name: &str, size: u64, age_days: i64) -> PathBuf {
    let path = dir.join(name);
    let file = fs::File::create(&path).expect("create");
    file.set_len(size).expect("set_len");
    drop(file);
    let now = filetime::FileTime::now();
    let mtime = filetime::FileTime::from_unix_time(now.unix_seconds() - age_days * 86_400, 0);
    filetime::set_file_mtime(&path, mtime).expect("mtime");
    path
}
