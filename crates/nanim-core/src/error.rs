//! Error types for the runtime crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Format(#[from] nanim_format::FormatError),

    #[error("animation '{id}' not present in file")]
    AnimationNotFound { id: String },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
