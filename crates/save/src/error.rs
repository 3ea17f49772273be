//! Error types for the serialization boundary.

use strata_tree::TreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SaveError {
    /// Encoding or decoding failed, including underlying I/O errors.
    #[error("codec failure: {0}")]
    Codec(#[from] bincode::Error),

    /// The stream carries a format version this build cannot read.
    #[error("unsupported format version {0}")]
    UnsupportedFormat(u32),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type Result<T, E = SaveError> = std::result::Result<T, E>;
