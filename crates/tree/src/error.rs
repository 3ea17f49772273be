//! Error types for tree operations.

use crate::path::TreePath;
use thiserror::Error;

/// Errors surfaced by generation operations. Structural violations are
/// always reported to the caller rather than repaired silently.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The addressed element (or a required ancestor) does not exist
    /// in this generation.
    #[error("element not found: {0}")]
    ElementNotFound(TreePath),

    /// The operation is not legal for the generation's current
    /// lifecycle state.
    #[error("illegal generation state: {0}")]
    IllegalState(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The involved generations do not belong to a single lineage.
    #[error("generations do not form a single lineage")]
    LineageInconsistent,
}

pub type Result<T, E = TreeError> = std::result::Result<T, E>;
