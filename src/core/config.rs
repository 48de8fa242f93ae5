//! TOML configuration with compiled-in defaults.
//!
//! The home directory is resolved once by the caller and handed to
//! [`Config::for_home`]; nothing below reads the environment.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TidyError};

/// Directory (under the home directory) holding backups, logs and config.
pub const CONFIG_DIR_NAME: &str = ".tidytux";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub dedup: DedupConfig,
    pub system: SystemConfig,
}

/// What to organize and inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directory whose top-level files are classified. Its volume is the one
    /// the Space Inspector reads.
    pub target: PathBuf,
}

/// Extra duplicate families on top of the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    #[serde(rename = "family")]
    pub families: Vec<FamilyConfig>,
}

/// A named regex over file names identifying one duplicate family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub name: String,
    pub pattern: String,
}

/// Delegated system maintenance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Propose package-cache, journal and container cleanup tasks.
    pub tasks: bool,
    /// Also propose a package upgrade (never auto-approved in emergency mode).
    pub upgrade: bool,
}

/// Resolved on-disk locations for one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub config_root: PathBuf,
}

impl Paths {
    #[must_use]
    pub fn new(config_root: impl Into<PathBuf>) -> Self {
        Self {
            config_root: config_root.into(),
        }
    }

    /// `~/.tidytux` for the given home directory.
    #[must_use]
    pub fn for_home(home: &Path) -> Self {
        Self::new(home.join(CONFIG_DIR_NAME))
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_root.join("config.toml")
    }

    #[must_use]
    pub fn backups_dir(&self) -> PathBuf {
        self.config_root.join("backups")
    }

    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.config_root.join("logs")
    }
}

impl Config {
    /// Defaults for a given home directory (`~/Downloads` as the target).
    #[must_use]
    pub fn for_home(home: &Path) -> Self {
        Self {
            scan: ScanConfig {
                target: home.join("Downloads"),
            },
            ..Self::default()
        }
    }

    /// Parse a TOML document, filling unspecified fields from `defaults`.
    pub fn parse(text: &str, defaults: &Self) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        if config.scan.target.as_os_str().is_empty() {
            config.scan.target.clone_from(&defaults.scan.target);
        }
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file is only an error when `required`.
    pub fn load(path: &Path, required: bool, defaults: Self) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, &defaults),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if required {
                    Err(TidyError::MissingConfig {
                        path: path.to_path_buf(),
                    })
                } else {
                    Ok(defaults)
                }
            }
            Err(err) => Err(TidyError::io(path, err)),
        }
    }

    /// Reject empty family names and patterns that do not compile.
    pub fn validate(&self) -> Result<()> {
        for family in &self.dedup.families {
            if family.name.trim().is_empty() {
                return Err(TidyError::InvalidConfig {
                    details: format!("dedup family with pattern `{}` has no name", family.pattern),
                });
            }
            Regex::new(&family.pattern).map_err(|err| TidyError::InvalidConfig {
                details: format!("dedup family `{}`: {err}", family.name),
            })?;
        }
        Ok(())
    }
}
