//! Error types for the NANIM container.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the entry-archive magic. Callers that do
    /// not need character data fall back to single-document mode on this.
    #[error("not a NANIM entry archive")]
    NotAnArchive,

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("unsupported NANIM version {0} (supported: 1-{max})", max = crate::nanim::MAX_VERSION)]
    UnsupportedVersion(u32),

    #[error("archive entry '{0}' not found")]
    MissingEntry(String),
}

pub type Result<T> = std::result::Result<T, FormatError>;
