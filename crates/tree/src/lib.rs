//! strata-tree: a persistent, path-keyed, versioned hierarchical tree.
//!
//! Content lives in generations. A generation is created mutable,
//! populated, then frozen; the next generation is an O(1) empty delta
//! layered over it. Reads on any generation walk its delta chain
//! toward the oldest complete ancestor. `collapse_to` and
//! `make_complete` compact a chain without changing any generation's
//! observable content, which lets long-lived histories stay bounded
//! while old handles keep working.
//!
//! Payloads are opaque `T: Clone` values; payload comparison is
//! injected through [`ElementComparator`].

mod chain;
mod delta;
mod error;
mod node;
mod path;
mod tree;

pub use chain::Change;
pub use delta::{ChangeKind, ElementComparator, TreeDelta};
pub use error::{Result, TreeError};
pub use path::TreePath;
pub use tree::{ElementTree, TreeIter};
