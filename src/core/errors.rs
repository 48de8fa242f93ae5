//! TT-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, TidyError>;

/// Top-level error type for TidyTux.
#[derive(Debug, Error)]
pub enum TidyError {
    #[error("[TT-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[TT-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[TT-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[TT-2001] cannot inspect filesystem at {path}: {details}")]
    Inspection { path: PathBuf, details: String },

    #[error("[TT-2002] cannot create backup directory {path}: {details}")]
    BackupRoot { path: PathBuf, details: String },

    #[error("[TT-3001] backup copy of {path} could not be verified: {details}")]
    CopyVerification { path: PathBuf, details: String },

    #[error("[TT-3002] target unavailable: {path}: {details}")]
    TargetUnavailable { path: PathBuf, details: String },

    #[error("[TT-3003] no answer within {timeout_secs}s for: {action}")]
    TimeoutDenied { action: String, timeout_secs: u64 },

    #[error("[TT-3101] external command `{command}` failed: {details}")]
    Command { command: String, details: String },

    #[error("[TT-3201] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[TT-3900] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TidyError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "TT-1001",
            Self::MissingConfig { .. } => "TT-1002",
            Self::ConfigParse { .. } => "TT-1003",
            Self::Inspection { .. } => "TT-2001",
            Self::BackupRoot { .. } => "TT-2002",
            Self::CopyVerification { .. } => "TT-3001",
            Self::TargetUnavailable { .. } => "TT-3002",
            Self::TimeoutDenied { .. } => "TT-3003",
            Self::Command { .. } => "TT-3101",
            Self::Serialization { .. } => "TT-3201",
            Self::Io { .. } => "TT-3900",
        }
    }

    /// Whether the failure terminates the whole run rather than one action.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::Inspection { .. }
                | Self::BackupRoot { .. }
        )
    }

    /// Process exit code used by the CLI when this error ends a run.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Inspection { .. } => 2,
            Self::BackupRoot { .. } => 3,
            _ => 1,
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for TidyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for TidyError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TidyError;
    use std::path::PathBuf;

    #[test]
    fn codes_are_embedded_in_messages() {
        let err = TidyError::Inspection {
            path: PathBuf::from("/nope"),
            details: "no such file".to_string(),
        };
        assert_eq!(err.code(), "TT-2001");
        assert!(err.to_string().starts_with("[TT-2001]"));
    }

    #[test]
    fn only_run_level_failures_are_fatal() {
        let fatal = TidyError::BackupRoot {
            path: PathBuf::from("/ro/backups"),
            details: "read-only file system".to_string(),
        };
        let local = TidyError::CopyVerification {
            path: PathBuf::from("/tmp/a.zip"),
            details: "size mismatch".to_string(),
        };
        assert!(fatal.is_fatal());
        assert_eq!(fatal.exit_code(), 3);
        assert!(!local.is_fatal());
    }

    #[test]
    fn toml_errors_map_to_config_parse() {
        let err: TidyError = toml::from_str::<toml::Value>("= broken")
            .map_err(TidyError::from)
            .expect_err("invalid toml should fail");
        assert_eq!(err.code(), "TT-1003");
    }
}
