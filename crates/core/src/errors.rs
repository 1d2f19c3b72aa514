//! Error taxonomy for the resume document core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Umbrella error for core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A mutation addressed something that does not exist in the document.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A cached or remote payload could not be decoded or encoded.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The local persistence backend failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Invalid mutation path. Always a programmer error on the caller's side.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("unknown field '{field}' in section '{section}'")]
    UnknownField { section: String, field: String },

    #[error("index {index} out of range for '{section}' (len {len})")]
    IndexOutOfRange {
        section: String,
        index: usize,
        len: usize,
    },

    #[error("unknown skill category '{0}'")]
    UnknownSkillCategory(String),

    #[error("skill category '{0}' already exists")]
    DuplicateSkillCategory(String),

    #[error("item kind does not match section '{section}'")]
    ItemKindMismatch { section: String },
}

impl SchemaError {
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn unknown_field(section: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            section: section.into(),
            field: field.into(),
        }
    }

    pub fn out_of_range(section: impl Into<String>, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange {
            section: section.into(),
            index,
            len,
        }
    }
}

/// Corrupt cached or remote JSON.
#[derive(Debug, Error)]
#[error("failed to parse {source_label}: {source}")]
pub struct ParseError {
    pub source_label: String,
    #[source]
    pub source: serde_json::Error,
}

impl ParseError {
    pub fn new(source_label: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            source_label: source_label.into(),
            source,
        }
    }
}

/// Local persistence backend failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("storage lock poisoned")]
    Poisoned,
}

impl StorageError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}
