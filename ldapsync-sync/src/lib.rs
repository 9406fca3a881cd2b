//! # ldapsync-sync
//!
//! Snapshot store, reconciliation and the directory writer.
//!
//! Call [`driver::run`] with [`Pass::New`] to create every missing entry, or
//! with [`Pass::Update`] to refresh every stale one.

pub mod driver;
pub mod error;
pub mod reconcile;
pub mod scan;
pub mod snapshot;
pub mod writer;

pub use driver::{Pass, PassOutcome, PassReport, RunOptions, RunState, SyncDriver};
pub use error::SyncError;
pub use reconcile::{compute_missing, compute_stale_fingerprints};
pub use snapshot::{DirectorySnapshot, SnapshotStore, SourceSnapshot, StagedRecord};
pub use writer::{DirectoryWriter, WriteResult};
