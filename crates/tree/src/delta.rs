//! Delta computation between arbitrary generations.
//!
//! The tree treats payloads as opaque; whether two payloads differ,
//! and how, is the caller's judgement, injected as an
//! `ElementComparator`. Subtrees shared by reference between the two
//! generations are skipped without invoking the comparator at all,
//! which is what makes diffing two distant generations cheap.

use crate::node::NodeRef;
use crate::path::TreePath;
use std::sync::Arc;

/// Domain verdict for a changed element, carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeKind(pub u32);

/// Caller-supplied payload comparison. `None` means unchanged.
pub trait ElementComparator<T> {
    fn compare(&self, older: &T, newer: &T) -> Option<ChangeKind>;
}

impl<T, F> ElementComparator<T> for F
where
    F: Fn(&T, &T) -> Option<ChangeKind>,
{
    fn compare(&self, older: &T, newer: &T) -> Option<ChangeKind> {
        self(older, newer)
    }
}

/// The enumerable difference between two generations under one path.
/// Added and removed subtrees list every affected path, parents
/// before children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDelta {
    added: Vec<TreePath>,
    removed: Vec<TreePath>,
    changed: Vec<(TreePath, ChangeKind)>,
}

impl TreeDelta {
    pub fn added(&self) -> &[TreePath] {
        &self.added
    }

    pub fn removed(&self) -> &[TreePath] {
        &self.removed
    }

    pub fn changed(&self) -> &[(TreePath, ChangeKind)] {
        &self.changed
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

pub(crate) fn between<T>(
    older: Option<NodeRef<T>>,
    newer: Option<NodeRef<T>>,
    path: &TreePath,
    comparator: &dyn ElementComparator<T>,
) -> TreeDelta {
    let mut delta = TreeDelta::default();
    walk(older.as_ref(), newer.as_ref(), path, comparator, &mut delta);
    delta
}

fn walk<T>(
    older: Option<&NodeRef<T>>,
    newer: Option<&NodeRef<T>>,
    path: &TreePath,
    comparator: &dyn ElementComparator<T>,
    out: &mut TreeDelta,
) {
    match (older, newer) {
        (None, None) => {}
        (Some(o), None) => collect(o, path, &mut out.removed),
        (None, Some(n)) => collect(n, path, &mut out.added),
        (Some(o), Some(n)) => {
            if Arc::ptr_eq(o, n) {
                return;
            }
            if let (Some(Some(a)), Some(Some(b))) = (o.carried_data(), n.carried_data()) {
                if let Some(kind) = comparator.compare(a, b) {
                    out.changed.push((path.clone(), kind));
                }
            }
            let (oc, nc) = (o.children(), n.children());
            let (mut i, mut j) = (0, 0);
            while i < oc.len() && j < nc.len() {
                match oc[i].name().cmp(nc[j].name()) {
                    std::cmp::Ordering::Less => {
                        collect(&oc[i], &path.child(oc[i].name()), &mut out.removed);
                        i += 1;
                    }
                    std::cmp::Ordering::Greater => {
                        collect(&nc[j], &path.child(nc[j].name()), &mut out.added);
                        j += 1;
                    }
                    std::cmp::Ordering::Equal => {
                        walk(
                            Some(&oc[i]),
                            Some(&nc[j]),
                            &path.child(oc[i].name()),
                            comparator,
                            out,
                        );
                        i += 1;
                        j += 1;
                    }
                }
            }
            for o in &oc[i..] {
                collect(o, &path.child(o.name()), &mut out.removed);
            }
            for n in &nc[j..] {
                collect(n, &path.child(n.name()), &mut out.added);
            }
        }
    }
}

// Whole-subtree enumeration, parents first.
fn collect<T>(node: &NodeRef<T>, path: &TreePath, out: &mut Vec<TreePath>) {
    out.push(path.clone());
    for child in node.children() {
        collect(child, &path.child(child.name()), out);
    }
}
