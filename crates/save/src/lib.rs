//! strata-save: serialization boundary and retention policy for
//! strata trees.
//!
//! Generations cross process boundaries as version-tagged op streams:
//! a complete snapshot or a delta chain whose spans rebuild each
//! generation over its predecessor. The retention table tracks which
//! generations subsystems still need and compacts the chain before a
//! save so history stays bounded.

mod error;
mod format;
mod reader;
mod retention;
mod writer;

pub use error::{Result, SaveError};
pub use format::{TreeOp, FORMAT_VERSION};
pub use reader::{read_delta_chain, read_tree};
pub use retention::RetentionTable;
pub use writer::{write_delta_chain, write_tree};
