//! YAML configuration for the source, the directory and snapshot staging.
//!
//! # Storage layout
//!
//! ```text
//! ~/.ldapsync/
//!   config.yaml
//! ```
//!
//! # API pattern
//!
//! - `load_at(home)`: explicit home; used in tests with `TempDir`
//! - `load()`: derives home from `dirs::home_dir()`, delegates to `load_at`
//! - `load_from(path)`: an explicit file, as passed with `--config`
//!
//! The bind password may be supplied through [`BIND_PASSWORD_ENV`] instead of
//! the file; the environment wins.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding `directory.bind_password`.
pub const BIND_PASSWORD_ENV: &str = "LDAPSYNC_BIND_PASSWORD";

/// Subtree holding every student entry.
pub const DEFAULT_BASE_DN: &str = "ou=students,o=mlu,c=de";

/// Query returning one row per student, columns named as in
/// [`crate::record::Field::column_name`].
pub const DEFAULT_SOURCE_QUERY: &str = "SELECT * FROM students_list";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Root of the YAML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub staging: StagingConfig,
}

/// Where the student rows come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the relational export.
    pub database: PathBuf,
    #[serde(default = "default_query")]
    pub query: String,
}

/// Directory server connection.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// `ldap://host:port` or `ldaps://host:port`.
    pub url: String,
    pub bind_dn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,
    #[serde(default = "default_base_dn")]
    pub base_dn: String,
    #[serde(default)]
    pub starttls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field(
                "bind_password",
                &self.bind_password.as_ref().map(|_| "***REDACTED***"),
            )
            .field("base_dn", &self.base_dn)
            .field("starttls", &self.starttls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Optional on-disk staging of the run's snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StagingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_query() -> String {
    DEFAULT_SOURCE_QUERY.to_string()
}

fn default_base_dn() -> String {
    DEFAULT_BASE_DN.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.ldapsync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".ldapsync").join("config.yaml")
}

/// Load `<home>/.ldapsync/config.yaml`.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    load_from(&config_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
    load_at(&home)
}

/// Load a config file, then apply the environment override.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML, and
/// `ConfigError::MissingBindPassword` when neither the file nor the
/// environment supplies a password. An empty password would make the bind
/// anonymous.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let mut config = parse_file(path)?;
    if let Ok(password) = std::env::var(BIND_PASSWORD_ENV) {
        config.directory.bind_password = Some(password);
    }
    if config.directory.bind_password.as_deref().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingBindPassword {
            path: path.to_path_buf(),
        });
    }
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
