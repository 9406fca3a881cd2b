//! Snapshot store: the two views a sync run compares.
//!
//! The source side holds identity and fingerprint sets plus the staged
//! record under both keys; the directory side holds only the two sets.
//! Every run starts with [`SnapshotStore::reset`]: leftovers from a previous
//! run would corrupt the delta computation.
//!
//! When a staging directory is configured, the loaded snapshots are also
//! written to `<dir>/source.json` and `<dir>/directory.json` using the same
//! atomic `.tmp` + rename pattern as the rest of the workspace, and
//! [`reset_at`] removes them.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use ldapsync_core::{Fingerprint, IdentityKey, Record};

use crate::error::{io_err, SyncError};

pub const SOURCE_FILE: &str = "source.json";
pub const DIRECTORY_FILE: &str = "directory.json";

// ---------------------------------------------------------------------------
// Source side
// ---------------------------------------------------------------------------

/// A source record together with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedRecord {
    pub fingerprint: Fingerprint,
    pub record: Record,
}

/// Source-of-truth snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    identities: BTreeSet<IdentityKey>,
    fingerprints: BTreeSet<Fingerprint>,
    by_identity: BTreeMap<IdentityKey, StagedRecord>,
    by_fingerprint: BTreeMap<Fingerprint, StagedRecord>,
}

impl SourceSnapshot {
    pub fn add_identity(&mut self, key: IdentityKey) {
        self.identities.insert(key);
    }

    pub fn add_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.fingerprints.insert(fingerprint);
    }

    /// Overwrites any record already staged under `key`.
    pub fn put_by_identity(&mut self, key: IdentityKey, staged: StagedRecord) {
        self.by_identity.insert(key, staged);
    }

    /// Overwrites any record already staged under `fingerprint`.
    pub fn put_by_fingerprint(&mut self, fingerprint: Fingerprint, staged: StagedRecord) {
        self.by_fingerprint.insert(fingerprint, staged);
    }

    pub fn identities(&self) -> &BTreeSet<IdentityKey> {
        &self.identities
    }

    pub fn fingerprints(&self) -> &BTreeSet<Fingerprint> {
        &self.fingerprints
    }

    pub fn by_identity(&self, key: &IdentityKey) -> Option<&StagedRecord> {
        self.by_identity.get(key)
    }

    pub fn by_fingerprint(&self, fingerprint: &Fingerprint) -> Option<&StagedRecord> {
        self.by_fingerprint.get(fingerprint)
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
            && self.fingerprints.is_empty()
            && self.by_identity.is_empty()
            && self.by_fingerprint.is_empty()
    }

    pub fn clear(&mut self) {
        self.identities.clear();
        self.fingerprints.clear();
        self.by_identity.clear();
        self.by_fingerprint.clear();
    }
}

// ---------------------------------------------------------------------------
// Directory side
// ---------------------------------------------------------------------------

/// What the directory currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySnapshot {
    identities: BTreeSet<IdentityKey>,
    fingerprints: BTreeSet<Fingerprint>,
}

impl DirectorySnapshot {
    pub fn add_identity(&mut self, key: IdentityKey) {
        self.identities.insert(key);
    }

    pub fn add_fingerprint(&mut self, fingerprint: Fingerprint) {
        self.fingerprints.insert(fingerprint);
    }

    pub fn identities(&self) -> &BTreeSet<IdentityKey> {
        &self.identities
    }

    pub fn fingerprints(&self) -> &BTreeSet<Fingerprint> {
        &self.fingerprints
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty() && self.fingerprints.is_empty()
    }

    pub fn clear(&mut self) {
        self.identities.clear();
        self.fingerprints.clear();
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Both sides of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStore {
    pub source: SourceSnapshot,
    pub directory: DirectorySnapshot,
    /// Set once both sides are fully scanned.
    pub loaded_at: Option<DateTime<Utc>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all four containers.
    pub fn reset(&mut self) {
        self.source.clear();
        self.directory.clear();
        self.loaded_at = None;
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty() && self.directory.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Staging on disk
// ---------------------------------------------------------------------------

/// On-disk payload for one side.
#[derive(Debug, Serialize, Deserialize)]
struct StagedSide<T> {
    loaded_at: DateTime<Utc>,
    snapshot: T,
}

/// `<dir>/source.json`
pub fn source_path_at(dir: &Path) -> PathBuf {
    dir.join(SOURCE_FILE)
}

/// `<dir>/directory.json`
pub fn directory_path_at(dir: &Path) -> PathBuf {
    dir.join(DIRECTORY_FILE)
}

/// Remove both staged files. Files that do not exist are fine.
pub fn reset_at(dir: &Path) -> Result<(), SyncError> {
    for path in [source_path_at(dir), directory_path_at(dir)] {
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed staged snapshot"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(&path, err)),
        }
    }
    Ok(())
}

/// Stage both sides of `store` atomically.
pub fn save_at(dir: &Path, store: &SnapshotStore) -> Result<(), SyncError> {
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let loaded_at = store.loaded_at.unwrap_or_else(Utc::now);

    write_atomic(
        &source_path_at(dir),
        &StagedSide {
            loaded_at,
            snapshot: &store.source,
        },
    )?;
    write_atomic(
        &directory_path_at(dir),
        &StagedSide {
            loaded_at,
            snapshot: &store.directory,
        },
    )?;
    Ok(())
}

/// Load the staged snapshots. Returns an empty store if nothing is staged.
pub fn load_at(dir: &Path) -> Result<SnapshotStore, SyncError> {
    let source: Option<StagedSide<SourceSnapshot>> = read_optional(&source_path_at(dir))?;
    let directory: Option<StagedSide<DirectorySnapshot>> =
        read_optional(&directory_path_at(dir))?;

    let loaded_at = source
        .as_ref()
        .map(|s| s.loaded_at)
        .or(directory.as_ref().map(|d| d.loaded_at));

    Ok(SnapshotStore {
        source: source.map(|s| s.snapshot).unwrap_or_default(),
        directory: directory.map(|d| d.snapshot).unwrap_or_default(),
        loaded_at,
    })
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SyncError> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn read_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SyncError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldapsync_core::{fingerprint, Field};
    use tempfile::TempDir;

    fn staged(identity: &str, mail: &str) -> StagedRecord {
        let record = Record::new(identity).with(Field::Mail, mail);
        StagedRecord {
            fingerprint: fingerprint(&record),
            record,
        }
    }

    fn populated() -> SnapshotStore {
        let mut store = SnapshotStore::new();
        let a = staged("abcde", "a@example.org");
        store.source.add_identity(a.record.identity.clone());
        store.source.add_fingerprint(a.fingerprint.clone());
        store
            .source
            .put_by_identity(a.record.identity.clone(), a.clone());
        store.source.put_by_fingerprint(a.fingerprint.clone(), a);
        store.directory.add_identity(IdentityKey::from("zzzzz"));
        store.directory.add_fingerprint(Fingerprint::from("cafebabe"));
        store.loaded_at = Some(Utc::now());
        store
    }

    #[test]
    fn adds_are_idempotent() {
        let mut snapshot = DirectorySnapshot::default();
        snapshot.add_identity(IdentityKey::from("a"));
        snapshot.add_identity(IdentityKey::from("a"));
        snapshot.add_fingerprint(Fingerprint::from("f"));
        snapshot.add_fingerprint(Fingerprint::from("f"));
        assert_eq!(snapshot.identities().len(), 1);
        assert_eq!(snapshot.fingerprints().len(), 1);
    }

    #[test]
    fn put_overwrites() {
        let mut snapshot = SourceSnapshot::default();
        let key = IdentityKey::from("abcde");
        snapshot.put_by_identity(key.clone(), staged("abcde", "old@example.org"));
        snapshot.put_by_identity(key.clone(), staged("abcde", "new@example.org"));
        let record = &snapshot.by_identity(&key).unwrap().record;
        assert_eq!(record.mail.as_deref(), Some("new@example.org"));
    }

    #[test]
    fn reset_clears_all_four_containers() {
        let mut store = populated();
        assert!(!store.is_empty());
        store.reset();
        assert!(store.is_empty());
        assert!(store.loaded_at.is_none());
        assert!(store.source.by_identity(&IdentityKey::from("abcde")).is_none());
    }

    #[test]
    fn empty_store_when_nothing_staged() {
        let tmp = TempDir::new().unwrap();
        let store = load_at(tmp.path()).unwrap();
        assert!(store.is_empty());
        assert!(store.loaded_at.is_none());
    }

    #[test]
    fn roundtrip_save_load() {
        let tmp = TempDir::new().unwrap();
        let store = populated();
        save_at(tmp.path(), &store).unwrap();
        let loaded = load_at(tmp.path()).unwrap();
        assert_eq!(loaded.source, store.source);
        assert_eq!(loaded.directory, store.directory);
        assert_eq!(loaded.loaded_at, store.loaded_at);
    }

    #[test]
    fn tmp_files_cleaned_up_after_save() {
        let tmp = TempDir::new().unwrap();
        save_at(tmp.path(), &populated()).unwrap();
        for path in [source_path_at(tmp.path()), directory_path_at(tmp.path())] {
            assert!(path.exists());
            assert!(
                !path.with_extension("json.tmp").exists(),
                "tmp file should be removed after atomic rename"
            );
        }
    }

    #[test]
    fn reset_at_removes_staged_files_and_tolerates_absence() {
        let tmp = TempDir::new().unwrap();
        reset_at(tmp.path()).unwrap();

        save_at(tmp.path(), &populated()).unwrap();
        reset_at(tmp.path()).unwrap();
        assert!(!source_path_at(tmp.path()).exists());
        assert!(!directory_path_at(tmp.path()).exists());
        assert!(load_at(tmp.path()).unwrap().is_empty());
    }
}
