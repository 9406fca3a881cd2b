//! Error types for ldapsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use ldapsync_core::{DirectoryError, Fingerprint, IdentityKey, SourceError};

/// Errors that abort a sync run.
///
/// Per-entry write rejections are not here; the writer logs them and reports
/// them as [`crate::WriteResult::Failed`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// The relational source could not be read.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The directory could not be reached or searched.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A delta named an identity the source snapshot does not hold.
    #[error("no staged record for identity '{0}'")]
    IdentityNotFound(IdentityKey),

    /// A delta named a fingerprint the source snapshot does not hold.
    #[error("no staged record for fingerprint {0}")]
    FingerprintNotFound(Fingerprint),

    /// An I/O error while staging snapshots, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (snapshot staging).
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
