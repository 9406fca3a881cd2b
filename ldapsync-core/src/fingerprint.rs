//! Content fingerprint of a [`Record`].
//!
//! SHA-256 over the concatenation of every field's text in
//! [`Field::in_column_order`]. Absent fields contribute `""` so the
//! concatenation boundaries of the remaining fields never move.

use sha2::{Digest, Sha256};

use crate::record::{Field, Record};
use crate::types::Fingerprint;

/// Hex SHA-256 of the record's fields in column order.
pub fn fingerprint(record: &Record) -> Fingerprint {
    let mut h = Sha256::new();
    for field in Field::in_column_order() {
        h.update(record.get(field).unwrap_or("").as_bytes());
    }
    Fingerprint(hex::encode(h.finalize()))
}
