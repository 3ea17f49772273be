//! Tree and delta-chain encoding.

use crate::error::Result;
use crate::format::{TreeOp, FORMAT_VERSION};
use serde::Serialize;
use std::io::Write;
use strata_tree::{Change, ElementTree, TreeError, TreePath};
use tracing::debug;

/// Writes one generation as a complete snapshot.
pub fn write_tree<T, W>(tree: &ElementTree<T>, mut out: W) -> Result<()>
where
    T: Clone + Serialize,
    W: Write,
{
    bincode::serialize_into(&mut out, &FORMAT_VERSION)?;
    let ops = complete_ops(tree)?;
    debug!(ops = ops.len(), "writing complete tree");
    bincode::serialize_into(&mut out, &ops)?;
    Ok(())
}

/// Writes a set of generations of one lineage as a delta chain:
/// the oldest as a complete snapshot, every later generation as the
/// composed delta span from its predecessor in lineage order. An
/// input that does not form a single lineage is an error.
pub fn write_delta_chain<T, W>(trees: &[ElementTree<T>], mut out: W) -> Result<()>
where
    T: Clone + Serialize,
    W: Write,
{
    let sorted = ElementTree::sort_by_lineage(trees)?;
    if sorted.is_empty() {
        return Err(TreeError::InvalidArgument("empty generation set".into()).into());
    }
    bincode::serialize_into(&mut out, &FORMAT_VERSION)?;
    bincode::serialize_into(&mut out, &(sorted.len() as u32))?;
    debug!(generations = sorted.len(), "writing delta chain");
    bincode::serialize_into(&mut out, &complete_ops(&sorted[0])?)?;
    for pair in sorted.windows(2) {
        let ops = delta_ops(&pair[0], &pair[1])?;
        bincode::serialize_into(&mut out, &ops)?;
    }
    Ok(())
}

fn complete_ops<T: Clone>(tree: &ElementTree<T>) -> Result<Vec<TreeOp<T>>> {
    let mut ops = Vec::new();
    for (path, data) in tree.iter_from(&TreePath::root())? {
        if let Some(data) = data {
            ops.push(TreeOp::Create { path, data });
        }
    }
    Ok(ops)
}

fn delta_ops<T: Clone>(older: &ElementTree<T>, newer: &ElementTree<T>) -> Result<Vec<TreeOp<T>>> {
    if ElementTree::ptr_eq(older, newer) {
        return Ok(Vec::new());
    }
    Ok(newer
        .changes_since(older)?
        .into_iter()
        .map(|change| match change {
            Change::Created { path, data } => TreeOp::Create { path, data },
            Change::DataSet { path, data } => TreeOp::SetData { path, data },
            Change::Removed { path } => TreeOp::Delete { path },
        })
        .collect())
}
