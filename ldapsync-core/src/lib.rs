//! ldapsync core library: record model, fingerprinting, collaborator
//! interfaces, configuration and errors.
//!
//! - [`types`]: identity and fingerprint newtypes
//! - [`record`]: the named-field student record and its field tables
//! - [`fingerprint`]: content hash over a record
//! - [`source`] / [`directory`]: traits implemented by the I/O adapters
//! - [`config`]: YAML configuration load
//! - [`error`]: [`ConfigError`], [`SourceError`], [`DirectoryError`]

pub mod config;
pub mod directory;
pub mod error;
pub mod fingerprint;
pub mod record;
pub mod source;
pub mod types;

pub use config::{Config, DirectoryConfig, SourceConfig, StagingConfig};
pub use directory::{AttributeMap, Directory, OperationResult, SearchEntry};
pub use error::{ConfigError, DirectoryError, SourceError};
pub use fingerprint::fingerprint;
pub use record::{Field, Program, Record, StudyField, StudyPart, StudyProgram};
pub use source::RecordSource;
pub use types::{Fingerprint, IdentityKey};
