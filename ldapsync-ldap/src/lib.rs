//! LDAP implementation of [`Directory`] over a synchronous `ldap3` connection.
//!
//! A connection is bound once in [`LdapDirectory::connect`] and reused for
//! every request of the run. Protocol results on add/delete are handed back
//! as [`OperationResult`] so the writer can log them and move on; only a
//! request that never produced a result becomes a [`DirectoryError`].
//!
//! Searches use simple paged results, so subtrees larger than the server's
//! size limit come back whole.

use std::collections::HashSet;
use std::time::Duration;

use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{LdapConn, LdapConnSettings, LdapResult, Scope};

use ldapsync_core::{
    AttributeMap, Directory, DirectoryConfig, DirectoryError, OperationResult, SearchEntry,
};

/// LDAP result code for invalid credentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Entries per page of a search. Stays at or under the common server size
/// limit so a large subtree never trips sizeLimitExceeded.
pub const PAGE_SIZE: i32 = 500;

type SearchAdapter = Box<dyn Adapter<'static, String, Vec<String>>>;

/// A bound LDAP session.
pub struct LdapDirectory {
    conn: LdapConn,
}

impl LdapDirectory {
    /// Connect to `config.url` and bind as `config.bind_dn`.
    pub fn connect(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.timeout_secs))
            .set_starttls(config.starttls);

        tracing::debug!(url = %config.url, "connecting to directory");
        let mut conn =
            LdapConn::with_settings(settings, &config.url).map_err(|e| DirectoryError::Connect {
                url: config.url.clone(),
                source: Box::new(e),
            })?;

        let password = config.bind_password.as_deref().unwrap_or("");
        let result = conn
            .simple_bind(&config.bind_dn, password)
            .map_err(|e| DirectoryError::Connect {
                url: config.url.clone(),
                source: Box::new(e),
            })?;

        if result.rc != 0 {
            if result.rc == RC_INVALID_CREDENTIALS {
                tracing::error!(bind_dn = %config.bind_dn, "directory rejected credentials");
            }
            return Err(DirectoryError::Bind {
                bind_dn: config.bind_dn.clone(),
                code: result.rc,
                message: result.text,
            });
        }

        tracing::info!(url = %config.url, bind_dn = %config.bind_dn, "directory bound");
        Ok(Self { conn })
    }

    /// Unbind and drop the connection. Errors are logged, not returned.
    pub fn close(mut self) {
        if let Err(e) = self.conn.unbind() {
            tracing::warn!(error = %e, "error during directory unbind");
        }
    }
}

impl Directory for LdapDirectory {
    fn search(
        &mut self,
        base: &str,
        filter: &str,
        attrs: &[&str],
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let search_err = |e: ldap3::LdapError| DirectoryError::Search {
            base: base.to_string(),
            message: e.to_string(),
        };
        let attrs: Vec<String> = attrs.iter().map(|a| (*a).to_string()).collect();

        let mut stream = self
            .conn
            .streaming_search_with(paged_adapters(), base, Scope::Subtree, filter, attrs)
            .map_err(search_err)?;

        let mut entries = Vec::new();
        while let Some(entry) = stream.next().map_err(search_err)? {
            entries.push(into_entry(ldap3::SearchEntry::construct(entry)));
        }
        stream.result().success().map_err(search_err)?;

        tracing::debug!(base = %base, entries = entries.len(), "directory search finished");
        Ok(entries)
    }

    fn add(&mut self, dn: &str, attrs: &AttributeMap) -> Result<OperationResult, DirectoryError> {
        let result = self
            .conn
            .add(dn, add_request(attrs))
            .map_err(|e| transport_err(dn, e))?;
        Ok(into_result(result))
    }

    fn delete(&mut self, dn: &str) -> Result<OperationResult, DirectoryError> {
        let result = self.conn.delete(dn).map_err(|e| transport_err(dn, e))?;
        Ok(into_result(result))
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Simple paged results (RFC 2696), with referrals and intermediate
/// messages dropped from the stream.
fn paged_adapters() -> Vec<SearchAdapter> {
    vec![
        Box::new(EntriesOnly::new()) as SearchAdapter,
        Box::new(PagedResults::new(PAGE_SIZE)) as SearchAdapter,
    ]
}

/// Attribute list in the shape `ldap3` expects. Empty value lists are dropped.
fn add_request(attrs: &AttributeMap) -> Vec<(&str, HashSet<&str>)> {
    attrs
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| {
            (
                name.as_str(),
                values.iter().map(String::as_str).collect(),
            )
        })
        .collect()
}

fn into_entry(entry: ldap3::SearchEntry) -> SearchEntry {
    SearchEntry {
        dn: entry.dn,
        attrs: entry.attrs,
    }
}

fn into_result(result: LdapResult) -> OperationResult {
    OperationResult {
        code: result.rc,
        message: result.text,
    }
}

fn transport_err(dn: &str, e: ldap3::LdapError) -> DirectoryError {
    DirectoryError::Transport {
        dn: dn.to_string(),
        source: Box::new(e),
    }
}
