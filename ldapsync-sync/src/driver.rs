//! Sync driver shared by the `new` and `update` commands.
//!
//! ```text
//! Idle → SnapshotLoaded → Reconciled → Applying → Done
//!                              └──────→ Aborted   (update with missing entries)
//! ```
//!
//! Every run resets the snapshot store, scans the source, then the
//! directory, and only then computes deltas. Deltas are applied one identity
//! at a time. A fatal error leaves the driver in the state it failed in.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::Utc;

use ldapsync_core::config::DEFAULT_BASE_DN;
use ldapsync_core::{Directory, Fingerprint, IdentityKey, RecordSource};

use crate::reconcile::{compute_missing, compute_stale_fingerprints};
use crate::scan::{scan_directory, scan_source};
use crate::snapshot::{self, SnapshotStore};
use crate::writer::{DirectoryWriter, WriteResult};
use crate::SyncError;

/// Which pass to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Create every missing entry.
    New,
    /// Refresh every stale entry; refuses to run while entries are missing.
    Update,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::New => write!(f, "new"),
            Pass::Update => write!(f, "update"),
        }
    }
}

/// Driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    SnapshotLoaded,
    Reconciled,
    Applying,
    Done,
    Aborted,
}

/// Per-run settings taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Subtree holding the student entries.
    pub base_dn: String,
    /// Where to stage the loaded snapshots, if anywhere.
    pub staging_dir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            base_dn: DEFAULT_BASE_DN.to_string(),
            staging_dir: None,
        }
    }
}

/// Summary of a completed pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass: Pass,
    pub source_records: usize,
    pub directory_entries: usize,
    pub writes: Vec<WriteResult>,
}

impl PassReport {
    pub fn succeeded(&self) -> usize {
        self.writes.iter().filter(|w| !w.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.writes.iter().filter(|w| w.is_failed()).count()
    }
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Done(PassReport),
    /// `update` found entries missing from the directory; nothing was written.
    Aborted { missing: BTreeSet<IdentityKey> },
}

/// Owns the snapshot store for the runs it drives.
pub struct SyncDriver<'a> {
    source: &'a mut dyn RecordSource,
    directory: &'a mut dyn Directory,
    options: RunOptions,
    store: SnapshotStore,
    state: RunState,
}

impl<'a> SyncDriver<'a> {
    pub fn new(
        source: &'a mut dyn RecordSource,
        directory: &'a mut dyn Directory,
        options: RunOptions,
    ) -> Self {
        Self {
            source,
            directory,
            options,
            store: SnapshotStore::new(),
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Snapshots loaded by the last run.
    pub fn snapshot(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run one pass from a clean snapshot.
    pub fn run(&mut self, pass: Pass) -> Result<PassOutcome, SyncError> {
        self.state = RunState::Idle;
        tracing::info!(pass = %pass, base_dn = %self.options.base_dn, "sync pass starting");

        let (source_records, directory_entries) = self.load()?;

        let missing = compute_missing(&self.store.source, &self.store.directory);
        self.transition(RunState::Reconciled);
        tracing::info!(missing = missing.len(), "missing entries computed");

        let writes = match pass {
            Pass::New => {
                self.transition(RunState::Applying);
                self.apply_creates(&missing)?
            }
            Pass::Update => {
                if !missing.is_empty() {
                    self.transition(RunState::Aborted);
                    tracing::error!(
                        missing = missing.len(),
                        "missing entries left; run the new pass first"
                    );
                    return Ok(PassOutcome::Aborted { missing });
                }
                let stale = compute_stale_fingerprints(&self.store.source, &self.store.directory);
                tracing::info!(stale = stale.len(), "stale entries computed");
                self.transition(RunState::Applying);
                self.apply_updates(&stale)?
            }
        };

        self.transition(RunState::Done);
        let report = PassReport {
            pass,
            source_records,
            directory_entries,
            writes,
        };
        tracing::info!(
            pass = %pass,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "sync pass finished"
        );
        Ok(PassOutcome::Done(report))
    }

    /// Reset, scan both sides, stage. Source first, always.
    fn load(&mut self) -> Result<(usize, usize), SyncError> {
        self.store.reset();
        if let Some(dir) = &self.options.staging_dir {
            snapshot::reset_at(dir)?;
        }

        let source_records = scan_source(&mut *self.source, &mut self.store.source)?;
        let directory_entries = scan_directory(
            &mut *self.directory,
            &self.options.base_dn,
            &mut self.store.directory,
        )?;
        self.store.loaded_at = Some(Utc::now());

        if let Some(dir) = &self.options.staging_dir {
            snapshot::save_at(dir, &self.store)?;
        }

        self.transition(RunState::SnapshotLoaded);
        Ok((source_records, directory_entries))
    }

    fn apply_creates(
        &mut self,
        missing: &BTreeSet<IdentityKey>,
    ) -> Result<Vec<WriteResult>, SyncError> {
        let mut writer =
            DirectoryWriter::new(&mut *self.directory, &self.store.source, &self.options.base_dn);
        let total = missing.len();
        let mut writes = Vec::with_capacity(total);
        for (n, identity) in missing.iter().enumerate() {
            tracing::info!("{}/{}: {}", n + 1, total, identity);
            writes.push(writer.create(identity)?);
        }
        Ok(writes)
    }

    fn apply_updates(
        &mut self,
        stale: &BTreeSet<Fingerprint>,
    ) -> Result<Vec<WriteResult>, SyncError> {
        let mut writer =
            DirectoryWriter::new(&mut *self.directory, &self.store.source, &self.options.base_dn);
        let total = stale.len();
        let mut writes = Vec::with_capacity(total);
        for (n, fingerprint) in stale.iter().enumerate() {
            let result = writer.update(fingerprint)?;
            tracing::info!("{}/{}: {}", n + 1, total, result.identity());
            writes.push(result);
        }
        Ok(writes)
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }
}

/// Run a single pass with a fresh driver.
pub fn run(
    pass: Pass,
    source: &mut dyn RecordSource,
    directory: &mut dyn Directory,
    options: RunOptions,
) -> Result<PassOutcome, SyncError> {
    SyncDriver::new(source, directory, options).run(pass)
}
