//! Directory protocol interface.
//!
//! The sync engine only needs three requests: a subtree search, add-entry and
//! delete-entry. `ldapsync-ldap` implements them over LDAP; tests use
//! in-memory fakes.

use std::collections::{BTreeMap, HashMap};

use crate::error::DirectoryError;

/// Attribute name → values for an add request. Ordered for stable logs.
pub type AttributeMap = BTreeMap<String, Vec<String>>;

/// LDAP result code for success.
pub const RESULT_SUCCESS: u32 = 0;

/// Protocol-level result of a mutating request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub code: u32,
    pub message: String,
}

impl OperationResult {
    pub fn success() -> Self {
        Self {
            code: RESULT_SUCCESS,
            message: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == RESULT_SUCCESS
    }
}

/// One entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl SearchEntry {
    /// First value of `name`, matched case-insensitively as LDAP does.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// A directory the sync engine can read and write.
pub trait Directory {
    /// Subtree search under `base`, returning `attrs` for each match.
    fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError>;

    /// Add a new entry. A rejected add is `Ok` with a non-success result.
    fn add(&mut self, dn: &str, attrs: &AttributeMap) -> Result<OperationResult, DirectoryError>;

    /// Delete an entry. A rejected delete is `Ok` with a non-success result.
    fn delete(&mut self, dn: &str) -> Result<OperationResult, DirectoryError>;
}

/// Escape an attribute value for use inside a DN (RFC 4514).
pub fn escape_dn_value(value: &str) -> String {
    let char_count = value.chars().count();
    let mut result = String::with_capacity(value.len() * 2);

    for (i, ch) in value.chars().enumerate() {
        let is_first = i == 0;
        let is_last = i + 1 == char_count;

        match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(ch);
            }
            '\0' => result.push_str("\\00"),
            ' ' if is_first || is_last => result.push_str("\\20"),
            '#' if is_first => result.push_str("\\23"),
            _ => result.push(ch),
        }
    }

    result
}
