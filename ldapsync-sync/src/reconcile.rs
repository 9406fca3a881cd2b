//! Delta computation between the source and directory snapshots.
//!
//! Both functions are plain set differences over fully loaded snapshots.
//! The returned sets are ordered only so that logs read the same from run to
//! run; nothing depends on the order for correctness.

use std::collections::BTreeSet;

use ldapsync_core::{Fingerprint, IdentityKey};

use crate::snapshot::{DirectorySnapshot, SourceSnapshot};

/// Identities in the source that the directory does not hold.
pub fn compute_missing(
    source: &SourceSnapshot,
    directory: &DirectorySnapshot,
) -> BTreeSet<IdentityKey> {
    source
        .identities()
        .difference(directory.identities())
        .cloned()
        .collect()
}

/// Source fingerprints the directory does not hold.
///
/// Once no identity is missing, each of these names a directory entry whose
/// content is out of date.
pub fn compute_stale_fingerprints(
    source: &SourceSnapshot,
    directory: &DirectorySnapshot,
) -> BTreeSet<Fingerprint> {
    source
        .fingerprints()
        .difference(directory.fingerprints())
        .cloned()
        .collect()
}
