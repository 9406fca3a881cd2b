//! Error types for ldapsync-core and the collaborator adapters.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed adapter error, so the traits in this crate stay free of
/// driver-specific types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error: includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.ldapsync/`.
    #[error("cannot determine home directory; set $HOME or pass --config")]
    HomeNotFound,

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    #[error("no bind password in {path}; set directory.bind_password or $LDAPSYNC_BIND_PASSWORD")]
    MissingBindPassword { path: PathBuf },
}

/// Errors from the relational source. Always fatal to a run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open source database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("source query failed: {source}")]
    Query {
        #[source]
        source: BoxError,
    },
}

/// Errors reaching or talking to the directory.
///
/// Fatal when connecting or searching. Rejected add/delete requests are not
/// errors at all: they come back as a non-success
/// [`crate::directory::OperationResult`].
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to connect to directory at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("directory bind as {bind_dn} rejected (code {code}): {message}")]
    Bind {
        bind_dn: String,
        code: u32,
        message: String,
    },

    #[error("directory search under {base} failed: {message}")]
    Search { base: String, message: String },

    /// The request never produced a protocol result (connection dropped, etc.).
    #[error("directory request for {dn} failed: {source}")]
    Transport {
        dn: String,
        #[source]
        source: BoxError,
    },
}
