//! Immutable node store shared between generations.
//!
//! A generation's layer is a tree of `Node`s. A node is either part of
//! a complete snapshot or one entry of a delta layer: a data
//! replacement, a pure spine entry carrying child changes, or a
//! tombstone. Nodes are reference-counted and never mutated after
//! construction, so unchanged subtrees are shared across generations
//! and `Arc` identity doubles as an unchanged-subtree test.

use std::sync::Arc;

pub(crate) type NodeRef<T> = Arc<Node<T>>;

#[derive(Debug)]
pub(crate) struct Node<T> {
    name: String,
    kind: NodeKind<T>,
    /// Children sorted by name. A complete node lists its full child
    /// set; a delta node lists only the changed subtrees.
    children: Vec<NodeRef<T>>,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind<T> {
    /// Full snapshot of the element at this position.
    Complete(Option<T>),
    /// Delta entry replacing the element's data.
    DataDelta(Option<T>),
    /// Delta entry touching only descendants.
    NoDataDelta,
    /// Delta entry removing the element and its subtree.
    Deleted,
}

impl<T> Node<T> {
    pub(crate) fn complete(name: impl Into<String>, data: Option<T>, children: Vec<NodeRef<T>>) -> Self {
        debug_assert!(children.windows(2).all(|w| w[0].name < w[1].name));
        Self { name: name.into(), kind: NodeKind::Complete(data), children }
    }

    pub(crate) fn data_delta(name: impl Into<String>, data: Option<T>) -> Self {
        Self { name: name.into(), kind: NodeKind::DataDelta(data), children: Vec::new() }
    }

    pub(crate) fn no_data_delta(name: impl Into<String>, children: Vec<NodeRef<T>>) -> Self {
        Self { name: name.into(), kind: NodeKind::NoDataDelta, children }
    }

    pub(crate) fn deleted(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: NodeKind::Deleted, children: Vec::new() }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn kind(&self) -> &NodeKind<T> {
        &self.kind
    }

    pub(crate) fn children(&self) -> &[NodeRef<T>] {
        &self.children
    }

    pub(crate) fn child(&self, name: &str) -> Option<&NodeRef<T>> {
        self.children
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.children[i])
    }

    pub(crate) fn is_delta(&self) -> bool {
        !matches!(self.kind, NodeKind::Complete(_))
    }

    pub(crate) fn is_deleted(&self) -> bool {
        matches!(self.kind, NodeKind::Deleted)
    }

    /// Whether this entry fully decides the subtree at its position:
    /// a complete node carries everything beneath it, a tombstone
    /// proves there is nothing. Chain walks stop falling through to
    /// older layers once they pass such a node.
    pub(crate) fn decides_subtree(&self) -> bool {
        matches!(self.kind, NodeKind::Complete(_) | NodeKind::Deleted)
    }

    /// The data slot this node carries, when its kind carries one.
    pub(crate) fn carried_data(&self) -> Option<&Option<T>> {
        match &self.kind {
            NodeKind::Complete(d) | NodeKind::DataDelta(d) => Some(d),
            NodeKind::NoDataDelta | NodeKind::Deleted => None,
        }
    }
}

impl<T: Clone> Node<T> {
    /// This node's child set with `child` replaced or inserted,
    /// rebuilt as a new node of the same name and kind.
    fn with_child(&self, child: NodeRef<T>) -> NodeRef<T> {
        let mut children = self.children.clone();
        match children.binary_search_by(|c| c.name.as_str().cmp(child.name())) {
            Ok(i) => children[i] = child,
            Err(i) => children.insert(i, child),
        }
        Arc::new(Node { name: self.name.clone(), kind: self.kind.clone(), children })
    }

    /// This node rebuilt without the named child.
    fn without_child(&self, name: &str) -> NodeRef<T> {
        let mut children = self.children.clone();
        if let Ok(i) = children.binary_search_by(|c| c.name.as_str().cmp(name)) {
            children.remove(i);
        }
        Arc::new(Node { name: self.name.clone(), kind: self.kind.clone(), children })
    }

    /// A shallow copy under a different name; children stay shared.
    pub(crate) fn with_name(self: &Arc<Self>, name: &str) -> NodeRef<T> {
        if self.name == name {
            return Arc::clone(self);
        }
        Arc::new(Node {
            name: name.to_string(),
            kind: self.kind.clone(),
            children: self.children.clone(),
        })
    }
}

/// Applies a delta node to a complete base node, yielding a complete
/// node. `Deleted` results are dropped one level up, at the child
/// merge; the root of a layer is never deleted.
pub(crate) fn assemble<T: Clone>(base: &NodeRef<T>, delta: &NodeRef<T>) -> NodeRef<T> {
    debug_assert!(!base.is_delta());
    match &delta.kind {
        NodeKind::Complete(_) | NodeKind::Deleted => Arc::clone(delta),
        NodeKind::DataDelta(d) => Arc::new(Node {
            name: base.name.clone(),
            kind: NodeKind::Complete(d.clone()),
            children: assemble_children(&base.children, &delta.children),
        }),
        NodeKind::NoDataDelta => {
            let data = match &base.kind {
                NodeKind::Complete(d) => d.clone(),
                _ => None,
            };
            Arc::new(Node {
                name: base.name.clone(),
                kind: NodeKind::Complete(data),
                children: assemble_children(&base.children, &delta.children),
            })
        }
    }
}

fn assemble_children<T: Clone>(base: &[NodeRef<T>], delta: &[NodeRef<T>]) -> Vec<NodeRef<T>> {
    let mut out = Vec::with_capacity(base.len() + delta.len());
    let (mut i, mut j) = (0, 0);
    while i < base.len() && j < delta.len() {
        match base[i].name.cmp(&delta[j].name) {
            std::cmp::Ordering::Less => {
                out.push(Arc::clone(&base[i]));
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                push_unmatched_delta(&mut out, &delta[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                if !delta[j].is_deleted() {
                    out.push(assemble(&base[i], &delta[j]));
                }
                i += 1;
                j += 1;
            }
        }
    }
    out.extend(base[i..].iter().cloned());
    for d in &delta[j..] {
        push_unmatched_delta(&mut out, d);
    }
    out
}

// A delta child with no base counterpart is either a creation or a
// tombstone for something the base never had.
fn push_unmatched_delta<T>(out: &mut Vec<NodeRef<T>>, delta: &NodeRef<T>) {
    match &delta.kind {
        NodeKind::Complete(_) => out.push(Arc::clone(delta)),
        NodeKind::Deleted => {}
        NodeKind::DataDelta(_) | NodeKind::NoDataDelta => {
            debug_assert!(false, "delta entry for an element absent from its base");
        }
    }
}

/// Composes two delta layers into one: applying the result to a base
/// is equivalent to applying `older` then `newer`. Either side may
/// contain complete nodes (creations); the result keeps tombstones so
/// it remains a delta.
pub(crate) fn compose<T: Clone>(older: &NodeRef<T>, newer: &NodeRef<T>) -> NodeRef<T> {
    match (&older.kind, &newer.kind) {
        // A newer full snapshot or tombstone supersedes everything older.
        (_, NodeKind::Complete(_)) | (_, NodeKind::Deleted) => Arc::clone(newer),
        // Deltas over an older creation fold into the creation.
        (NodeKind::Complete(_), _) => assemble(older, newer),
        (NodeKind::Deleted, _) => {
            // The mutation API never records a change beneath a tombstone.
            debug_assert!(false, "delta entry beneath a deleted element");
            Arc::clone(newer)
        }
        (older_kind, newer_kind) => {
            let kind = match (older_kind, newer_kind) {
                (_, NodeKind::DataDelta(d)) => NodeKind::DataDelta(d.clone()),
                (NodeKind::DataDelta(d), NodeKind::NoDataDelta) => NodeKind::DataDelta(d.clone()),
                (NodeKind::NoDataDelta, NodeKind::NoDataDelta) => NodeKind::NoDataDelta,
                _ => unreachable!(),
            };
            Arc::new(Node {
                name: newer.name.clone(),
                kind,
                children: compose_children(&older.children, &newer.children),
            })
        }
    }
}

pub(crate) fn compose_children<T: Clone>(older: &[NodeRef<T>], newer: &[NodeRef<T>]) -> Vec<NodeRef<T>> {
    let mut out = Vec::with_capacity(older.len() + newer.len());
    let (mut i, mut j) = (0, 0);
    while i < older.len() && j < newer.len() {
        match older[i].name.cmp(&newer[j].name) {
            std::cmp::Ordering::Less => {
                out.push(Arc::clone(&older[i]));
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(Arc::clone(&newer[j]));
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(compose(&older[i], &newer[j]));
                i += 1;
                j += 1;
            }
        }
    }
    out.extend(older[i..].iter().cloned());
    out.extend(newer[j..].iter().cloned());
    out
}

/// Grafts `delta` into a layer at the position named by `segs`
/// (relative to `current`), composing with any existing entry and
/// building spine entries for untouched intermediate levels.
pub(crate) fn graft<T: Clone>(current: &NodeRef<T>, segs: &[String], delta: NodeRef<T>) -> NodeRef<T> {
    debug_assert!(!segs.is_empty());
    let new_child = match (current.child(&segs[0]), segs.len()) {
        (Some(c), 1) => compose(c, &delta),
        (Some(c), _) => graft(c, &segs[1..], delta),
        (None, _) => spine(segs, delta),
    };
    // a complete node lists no tombstones; deleting an element the
    // layer itself introduced just removes it
    if !current.is_delta() && new_child.is_deleted() {
        return current.without_child(new_child.name());
    }
    current.with_child(new_child)
}

fn spine<T: Clone>(segs: &[String], delta: NodeRef<T>) -> NodeRef<T> {
    if segs.len() == 1 {
        debug_assert_eq!(segs[0].as_str(), delta.name());
        return delta;
    }
    Arc::new(Node::no_data_delta(segs[0].clone(), vec![spine(&segs[1..], delta)]))
}

/// Canonicalizes a delta layer: drops spine entries whose subtree
/// carries no effective change. The root entry itself is kept even
/// when empty.
pub(crate) fn prune_layer<T: Clone>(root: &NodeRef<T>) -> NodeRef<T> {
    let children: Vec<_> = root.children.iter().filter_map(prune).collect();
    if children.len() == root.children.len()
        && children.iter().zip(&root.children).all(|(a, b)| Arc::ptr_eq(a, b))
    {
        return Arc::clone(root);
    }
    Arc::new(Node { name: root.name.clone(), kind: root.kind.clone(), children })
}

fn prune<T: Clone>(node: &NodeRef<T>) -> Option<NodeRef<T>> {
    match &node.kind {
        NodeKind::Complete(_) | NodeKind::Deleted => Some(Arc::clone(node)),
        NodeKind::DataDelta(_) | NodeKind::NoDataDelta => {
            let children: Vec<_> = node.children.iter().filter_map(prune).collect();
            if matches!(node.kind, NodeKind::NoDataDelta) && children.is_empty() {
                return None;
            }
            if children.len() == node.children.len()
                && children.iter().zip(&node.children).all(|(a, b)| Arc::ptr_eq(a, b))
            {
                return Some(Arc::clone(node));
            }
            Some(Arc::new(Node {
                name: node.name.clone(),
                kind: node.kind.clone(),
                children,
            }))
        }
    }
}
