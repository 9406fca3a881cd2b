//! Relational source interface.

use crate::error::SourceError;
use crate::record::Record;

/// The authoritative record source. One call returns every current record.
pub trait RecordSource {
    fn fetch_all(&mut self) -> Result<Vec<Record>, SourceError>;
}

impl RecordSource for Vec<Record> {
    fn fetch_all(&mut self) -> Result<Vec<Record>, SourceError> {
        Ok(self.clone())
    }
}
