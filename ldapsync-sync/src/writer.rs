//! Directory writer: applies one change for one identity.
//!
//! ## `create` protocol
//!
//! 1. Look up the staged record by identity (absent → fatal).
//! 2. Build the DN `uid=<identity>,<base_dn>`.
//! 3. Map every present field through [`ATTRIBUTE_MAP`], add the derived and
//!    fixed attributes and the object classes. Absent fields are omitted,
//!    except `cn`, which falls back to the identity when both name parts are
//!    absent.
//! 4. Issue the add. A rejection is logged and returned as
//!    [`WriteResult::Failed`]; it never aborts the batch.
//!
//! ## `update` protocol
//!
//! 1. Look up the staged record by fingerprint (absent → fatal).
//! 2. Delete the entry's DN; a failed delete is logged and ignored.
//! 3. `create` the same identity.
//!
//! If the process dies between 2 and 3 the entry is gone until the next
//! `new` pass recreates it.

use ldapsync_core::directory::escape_dn_value;
use ldapsync_core::record::ATTRIBUTE_MAP;
use ldapsync_core::{AttributeMap, Directory, Fingerprint, IdentityKey, OperationResult};

use crate::scan::IDENTITY_ATTRIBUTE;
use crate::snapshot::{SourceSnapshot, StagedRecord};
use crate::SyncError;

/// Object classes attached to every student entry.
pub const OBJECT_CLASSES: &[&str] = &[
    "top",
    "person",
    "organizationalPerson",
    "inetOrgPerson",
    "mluPerson",
    "mluStudent",
    "schacPersonalCharacteristics",
];

/// Attributes with the same value on every student entry.
pub const FIXED_ATTRIBUTES: &[(&str, &str)] = &[("mlupersontype", "2"), ("mlustatus", "active")];

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of a single directory change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// A new entry was added.
    Created { identity: IdentityKey, dn: String },
    /// The entry was deleted (or already absent) and added again.
    Replaced { identity: IdentityKey, dn: String },
    /// The directory rejected the add. `code` is `None` when no protocol
    /// result came back at all.
    Failed {
        identity: IdentityKey,
        dn: String,
        code: Option<u32>,
        message: String,
    },
}

impl WriteResult {
    pub fn identity(&self) -> &IdentityKey {
        match self {
            WriteResult::Created { identity, .. }
            | WriteResult::Replaced { identity, .. }
            | WriteResult::Failed { identity, .. } => identity,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, WriteResult::Failed { .. })
    }
}

// ---------------------------------------------------------------------------
// Entry synthesis
// ---------------------------------------------------------------------------

/// DN of the entry for `identity` under `base_dn`.
pub fn entry_dn(identity: &IdentityKey, base_dn: &str) -> String {
    format!(
        "{IDENTITY_ATTRIBUTE}={},{base_dn}",
        escape_dn_value(identity.as_str())
    )
}

/// Attribute map for the add request.
pub fn build_attributes(staged: &StagedRecord) -> AttributeMap {
    let record = &staged.record;
    let mut attrs = AttributeMap::new();

    for (field, name) in ATTRIBUTE_MAP {
        if let Some(value) = record.get(*field) {
            attrs.insert((*name).to_string(), vec![value.to_string()]);
        }
    }

    // cn is required by `person`; a nameless record falls back to its uid.
    let cn = record
        .display_name()
        .unwrap_or_else(|| record.identity.to_string());
    attrs.insert("cn".to_string(), vec![cn]);
    attrs.insert(
        "carlicense".to_string(),
        vec![staged.fingerprint.to_string()],
    );
    for (name, value) in FIXED_ATTRIBUTES {
        attrs.insert((*name).to_string(), vec![(*value).to_string()]);
    }
    attrs.insert(
        "objectClass".to_string(),
        OBJECT_CLASSES.iter().map(|c| (*c).to_string()).collect(),
    );

    attrs
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Applies creates and updates against one directory for one run.
pub struct DirectoryWriter<'a> {
    directory: &'a mut dyn Directory,
    source: &'a SourceSnapshot,
    base_dn: &'a str,
}

impl<'a> DirectoryWriter<'a> {
    pub fn new(
        directory: &'a mut dyn Directory,
        source: &'a SourceSnapshot,
        base_dn: &'a str,
    ) -> Self {
        Self {
            directory,
            source,
            base_dn,
        }
    }

    /// Add the entry for `identity`.
    pub fn create(&mut self, identity: &IdentityKey) -> Result<WriteResult, SyncError> {
        let staged = self
            .source
            .by_identity(identity)
            .ok_or_else(|| SyncError::IdentityNotFound(identity.clone()))?;

        let dn = entry_dn(identity, self.base_dn);
        let attrs = build_attributes(staged);

        match self.directory.add(&dn, &attrs) {
            Ok(result) if result.is_success() => {
                tracing::info!(dn = %dn, "entry written");
                Ok(WriteResult::Created {
                    identity: identity.clone(),
                    dn,
                })
            }
            Ok(OperationResult { code, message }) => {
                tracing::warn!(dn = %dn, code, message = %message, "add rejected");
                Ok(WriteResult::Failed {
                    identity: identity.clone(),
                    dn,
                    code: Some(code),
                    message,
                })
            }
            Err(err) => {
                tracing::warn!(dn = %dn, error = %err, "add failed");
                Ok(WriteResult::Failed {
                    identity: identity.clone(),
                    dn,
                    code: None,
                    message: err.to_string(),
                })
            }
        }
    }

    /// Delete and recreate the entry whose source record has `fingerprint`.
    pub fn update(&mut self, fingerprint: &Fingerprint) -> Result<WriteResult, SyncError> {
        let identity = self
            .source
            .by_fingerprint(fingerprint)
            .map(|staged| staged.record.identity.clone())
            .ok_or_else(|| SyncError::FingerprintNotFound(fingerprint.clone()))?;

        tracing::debug!(identity = %identity, fingerprint = %fingerprint, "refreshing entry");

        let dn = entry_dn(&identity, self.base_dn);
        match self.directory.delete(&dn) {
            Ok(result) if result.is_success() => {
                tracing::debug!(dn = %dn, "entry deleted");
            }
            Ok(OperationResult { code, message }) => {
                tracing::warn!(dn = %dn, code, message = %message, "delete rejected; recreating anyway");
            }
            Err(err) => {
                tracing::warn!(dn = %dn, error = %err, "delete failed; recreating anyway");
            }
        }

        Ok(match self.create(&identity)? {
            WriteResult::Created { identity, dn } => WriteResult::Replaced { identity, dn },
            other => other,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
