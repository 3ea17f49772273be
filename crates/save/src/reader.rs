//! Tree and delta-chain decoding.

use crate::error::{Result, SaveError};
use crate::format::{TreeOp, FORMAT_VERSION};
use serde::de::DeserializeOwned;
use std::io::Read;
use strata_tree::ElementTree;
use tracing::debug;

/// Reads one complete generation. The result is frozen.
pub fn read_tree<T, R>(mut input: R) -> Result<ElementTree<T>>
where
    T: Clone + DeserializeOwned,
    R: Read,
{
    check_version(&mut input)?;
    let ops: Vec<TreeOp<T>> = bincode::deserialize_from(&mut input)?;
    debug!(ops = ops.len(), "reading complete tree");
    let tree = ElementTree::new();
    apply_ops(&tree, ops)?;
    tree.immutable();
    Ok(tree)
}

/// Reads a delta chain, reconstructing a frozen forward chain where
/// `chain[i]` is a direct delta child of `chain[i - 1]` and
/// `chain[0]` is complete.
pub fn read_delta_chain<T, R>(mut input: R) -> Result<Vec<ElementTree<T>>>
where
    T: Clone + DeserializeOwned,
    R: Read,
{
    check_version(&mut input)?;
    let count: u32 = bincode::deserialize_from(&mut input)?;
    debug!(generations = count, "reading delta chain");
    // the count is untrusted stream data; grow as generations decode
    let mut chain: Vec<ElementTree<T>> = Vec::new();
    for _ in 0..count {
        let ops: Vec<TreeOp<T>> = bincode::deserialize_from(&mut input)?;
        let tree = match chain.last() {
            None => ElementTree::new(),
            Some(prev) => prev.new_empty_delta(),
        };
        apply_ops(&tree, ops)?;
        tree.immutable();
        chain.push(tree);
    }
    Ok(chain)
}

fn check_version<R: Read>(input: &mut R) -> Result<()> {
    let version: u32 = bincode::deserialize_from(input)?;
    if version != FORMAT_VERSION {
        return Err(SaveError::UnsupportedFormat(version));
    }
    Ok(())
}

fn apply_ops<T: Clone>(tree: &ElementTree<T>, ops: Vec<TreeOp<T>>) -> Result<()> {
    for op in ops {
        match op {
            TreeOp::Create { path, data } => tree.create(&path, data)?,
            TreeOp::SetData { path, data } => tree.set_data(&path, data)?,
            // A composed span may delete an element its base never
            // had (created and deleted within the span); skip those.
            TreeOp::Delete { path } => {
                if tree.includes(&path) {
                    tree.delete(&path)?;
                }
            }
        }
    }
    Ok(())
}
