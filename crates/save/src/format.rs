//! On-stream format.
//!
//! Every stream opens with a `u32` format version tag. The payload is
//! a bincode-encoded op stream: a complete tree is a top-down
//! `Create` sequence, a delta span is the ops of its composed layer.
//! Parents always precede their children, so a reader can apply ops
//! in order.

use serde::{Deserialize, Serialize};
use strata_tree::TreePath;

/// Version tag written at the head of every stream.
pub const FORMAT_VERSION: u32 = 1;

/// One element-level operation of an encoded tree or delta span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeOp<T> {
    /// Insert the element (replacing data and children if present).
    Create { path: TreePath, data: T },
    /// Replace the element's data, children untouched.
    SetData { path: TreePath, data: T },
    /// Remove the element and its subtree.
    Delete { path: TreePath },
}
