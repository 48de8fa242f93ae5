//! Verified backup copies.
//!
//! A copy is only trusted once its size and SHA-256 digest match the source.
//! Backups are created with create-new semantics, so nothing already in the
//! backup directory is ever overwritten.

use std::ffi::{OsStr, OsString};
use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::errors::{Result, TidyError};

const COPY_BUFFER_BYTES: usize = 64 * 1024;
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Proof that a verified copy of `original_path` exists at `backup_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    /// Live file that was copied.
    pub original_path: PathBuf,
    /// Verified copy inside the run's backup directory.
    pub backup_path: PathBuf,
    /// Verified length of the copy.
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 shared by source and copy.
    pub sha256: String,
    /// Run start time.
    pub timestamp: DateTime<Local>,
}

/// Create the run's backup directory. Failure here is fatal to the run.
pub fn ensure_backup_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|err| TidyError::BackupRoot {
        path: dir.to_path_buf(),
        details: err.to_string(),
    })
}

/// `dir/name`, or `dir/stem_N.ext` for the first N that does not exist yet.
///
/// Fails with `AlreadyExists` once every numbered candidate is taken.
pub fn unique_path(dir: &Path, name: &OsStr) -> io::Result<PathBuf> {
    let first = dir.join(name);
    if !first.exists() {
        return Ok(first);
    }
    for n in 1..MAX_NAME_ATTEMPTS {
        let candidate = dir.join(numbered_name(name, n));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", first.display(), dir.display()),
    ))
}

fn numbered_name(name: &OsStr, n: u32) -> OsString {
    let path = Path::new(name);
    let mut numbered = OsString::new();
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => {
            numbered.push(stem);
            numbered.push(format!("_{n}."));
            numbered.push(ext);
        }
        _ => {
            numbered.push(name);
            numbered.push(format!("_{n}"));
        }
    }
    numbered
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Size and SHA-256 of a file's current contents.
pub fn digest_file(path: &Path) -> io::Result<(u64, String)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut total = 0u64;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    Ok((total, hex(&hasher.finalize())))
}

fn open_new_backup(dir: &Path, name: &OsStr) -> io::Result<(File, PathBuf)> {
    let mut attempt = 0;
    loop {
        let candidate = if attempt == 0 {
            dir.join(name)
        } else {
            dir.join(numbered_name(name, attempt))
        };
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((file, candidate)),
            Err(err) if err.kind() == ErrorKind::AlreadyExists && attempt < MAX_NAME_ATTEMPTS => {
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn copy_with_digest(input: &mut File, output: &mut File) -> io::Result<(u64, String)> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut total = 0u64;
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        output.write_all(&buf[..n])?;
        total += n as u64;
    }
    output.sync_all()?;
    Ok((total, hex(&hasher.finalize())))
}

/// Check a finished copy at `backup_path` against the length and digest read
/// from `source`. A copy that does not match is removed.
///
/// Returns the verified size and digest.
pub fn verify_copy(
    source: &Path,
    expected_len: u64,
    source_digest: &str,
    backup_path: &Path,
) -> Result<(u64, String)> {
    let mismatch = match digest_file(backup_path) {
        Ok((copy_len, _)) if copy_len != expected_len => {
            format!("size mismatch: source {expected_len} bytes, copy {copy_len}")
        }
        Ok((copy_len, copy_digest)) if copy_digest == source_digest => return Ok((copy_len, copy_digest)),
        Ok(_) => "sha256 mismatch between source and copy".to_string(),
        Err(err) => format!("cannot re-read copy: {err}"),
    };
    Err(discard_copy(source, backup_path, mismatch))
}

fn discard_copy(source: &Path, backup_path: &Path, details: String) -> TidyError {
    let _ = fs::remove_file(backup_path);
    TidyError::CopyVerification {
        path: source.to_path_buf(),
        details,
    }
}

fn unavailable(path: &Path, err: &io::Error) -> TidyError {
    TidyError::TargetUnavailable {
        path: path.to_path_buf(),
        details: err.to_string(),
    }
}

/// Copy `source` into `backup_dir` under its original name and verify it.
///
/// Errors: [`TidyError::TargetUnavailable`] when the source cannot be read,
/// [`TidyError::CopyVerification`] when the copy does not match (the partial
/// copy is removed).
pub fn backup_file(source: &Path, backup_dir: &Path, timestamp: DateTime<Local>) -> Result<BackupRecord> {
    let name = source.file_name().ok_or_else(|| TidyError::TargetUnavailable {
        path: source.to_path_buf(),
        details: "path has no file name".to_string(),
    })?;

    let mut input = File::open(source).map_err(|err| unavailable(source, &err))?;
    let expected_len = input
        .metadata()
        .map_err(|err| unavailable(source, &err))?
        .len();

    let (mut output, backup_path) =
        open_new_backup(backup_dir, name).map_err(|err| TidyError::io(backup_dir, err))?;

    let copied = copy_with_digest(&mut input, &mut output);
    drop(output);

    let (size_bytes, sha256) = match copied {
        Ok((read_len, _)) if read_len != expected_len => {
            return Err(discard_copy(
                source,
                &backup_path,
                format!("size mismatch: source {expected_len} bytes, read {read_len}"),
            ));
        }
        Ok((_, source_digest)) => verify_copy(source, expected_len, &source_digest, &backup_path)?,
        Err(err) => {
            return Err(discard_copy(source, &backup_path, format!("copy interrupted: {err}")));
        }
    };

    Ok(BackupRecord {
        original_path: source.to_path_buf(),
        backup_path,
        size_bytes,
        sha256,
        timestamp,
    })
}
