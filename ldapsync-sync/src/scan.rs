//! Full scans that populate the two sides of the snapshot store.

use ldapsync_core::{fingerprint, Directory, Fingerprint, IdentityKey, RecordSource};

use crate::snapshot::{DirectorySnapshot, SourceSnapshot, StagedRecord};
use crate::SyncError;

/// Directory attribute holding the identity key.
pub const IDENTITY_ATTRIBUTE: &str = "uid";

/// Directory attribute holding the fingerprint the entry was written from.
pub const FINGERPRINT_ATTRIBUTE: &str = "carLicense";

/// Search filter matching every student entry.
pub const ENTRY_FILTER: &str = "(uid=*)";

/// Fetch every source record, fingerprint it and stage it under both keys.
///
/// Returns the number of records read.
pub fn scan_source(
    source: &mut dyn RecordSource,
    snapshot: &mut SourceSnapshot,
) -> Result<usize, SyncError> {
    let records = source.fetch_all()?;
    let count = records.len();

    for record in records {
        let fp = fingerprint(&record);
        let identity = record.identity.clone();
        let staged = StagedRecord {
            fingerprint: fp.clone(),
            record,
        };

        snapshot.put_by_fingerprint(fp.clone(), staged.clone());
        snapshot.put_by_identity(identity.clone(), staged);
        snapshot.add_fingerprint(fp);
        snapshot.add_identity(identity);
    }

    tracing::info!(
        records = count,
        identities = snapshot.identities().len(),
        "source snapshot loaded"
    );
    Ok(count)
}

/// Search every entry under `base_dn` and record its identity and fingerprint.
///
/// An entry without a fingerprint still counts as present, but adds nothing
/// to the fingerprint set, so the next update pass treats it as stale.
/// Returns the number of entries read.
pub fn scan_directory(
    directory: &mut dyn Directory,
    base_dn: &str,
    snapshot: &mut DirectorySnapshot,
) -> Result<usize, SyncError> {
    let entries = directory.search(
        base_dn,
        ENTRY_FILTER,
        &[FINGERPRINT_ATTRIBUTE, IDENTITY_ATTRIBUTE],
    )?;
    let count = entries.len();
    let mut without_fingerprint = 0usize;

    for entry in entries {
        let Some(uid) = entry.first_value(IDENTITY_ATTRIBUTE) else {
            tracing::warn!(dn = %entry.dn, "directory entry has no uid; skipped");
            continue;
        };

        match entry.first_value(FINGERPRINT_ATTRIBUTE) {
            Some(fp) if !fp.is_empty() => snapshot.add_fingerprint(Fingerprint::from(fp)),
            _ => without_fingerprint += 1,
        }
        snapshot.add_identity(IdentityKey::from(uid));
    }

    tracing::info!(
        entries = count,
        without_fingerprint,
        "directory snapshot loaded"
    );
    Ok(count)
}
