//! Delta chain: the shared versioned representation behind the
//! `ElementTree` handle.
//!
//! Each generation owns one layer (a `Node` tree) and an optional
//! parent generation. The oldest generation of a lineage holds a
//! complete layer; every other generation holds a forward delta over
//! its parent. Reads walk from the queried generation toward the
//! oldest ancestor and stop at the first layer that decides the path.
//! `collapse_to` and `make_complete` swap a generation's
//! representation in place without changing its observable content,
//! so older handles keep working across compaction.

use crate::error::{Result, TreeError};
use crate::node::{self, Node, NodeKind, NodeRef};
use crate::path::TreePath;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

pub(crate) struct DeltaTree<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    repr: RwLock<Repr<T>>,
    frozen: AtomicBool,
    /// Creation-ordered id, for diagnostics only.
    stamp: u64,
}

struct Repr<T> {
    root: NodeRef<T>,
    parent: Option<DeltaTree<T>>,
}

/// Outcome of a chain lookup.
pub(crate) struct Lookup<T> {
    pub(crate) present: bool,
    pub(crate) data: Option<T>,
}

impl<T> Clone for DeltaTree<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> DeltaTree<T> {
    fn with_repr(root: NodeRef<T>, parent: Option<DeltaTree<T>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                repr: RwLock::new(Repr { root, parent }),
                frozen: AtomicBool::new(false),
                stamp: NEXT_STAMP.fetch_add(1, Ordering::Relaxed),
            }),
        }
    }

    /// A mutable generation holding the given complete layer.
    pub(crate) fn new_complete(root: NodeRef<T>) -> Self {
        debug_assert!(!root.is_delta());
        Self::with_repr(root, None)
    }

    /// A mutable empty delta child of `self`. The caller must have
    /// frozen `self` first.
    pub(crate) fn new_empty_delta(&self) -> Self {
        debug_assert!(self.is_immutable());
        Self::with_repr(Arc::new(Node::no_data_delta("", Vec::new())), Some(self.clone()))
    }

    pub(crate) fn is_immutable(&self) -> bool {
        self.inner.frozen.load(Ordering::Acquire)
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn stamp(&self) -> u64 {
        self.inner.stamp
    }

    fn snapshot(&self) -> (NodeRef<T>, Option<DeltaTree<T>>) {
        let repr = self.inner.repr.read();
        (Arc::clone(&repr.root), repr.parent.clone())
    }

    pub(crate) fn parent(&self) -> Option<DeltaTree<T>> {
        self.inner.repr.read().parent.clone()
    }

    /// Parent hops to the nearest complete representation.
    pub(crate) fn delta_depth(&self) -> usize {
        let mut depth = 0;
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            depth += 1;
            cur = p;
        }
        depth
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_immutable() {
            return Err(TreeError::IllegalState("generation is immutable"));
        }
        Ok(())
    }
}

impl<T: Clone> DeltaTree<T> {
    /// Freezes and canonicalizes the layer. Idempotent.
    pub(crate) fn freeze(&self) {
        if self.inner.frozen.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut repr = self.inner.repr.write();
        if repr.parent.is_some() {
            repr.root = node::prune_layer(&repr.root);
        }
    }

    /// Walks the chain resolving `path`. Each layer is consulted in
    /// turn; a layer decides the path when it carries data for it,
    /// deletes it, or proves absence by covering the position with a
    /// complete node.
    pub(crate) fn lookup(&self, path: &TreePath) -> Lookup<T> {
        let mut tree = self.clone();
        loop {
            let (layer, parent) = tree.snapshot();
            let mut complete = !layer.is_delta();
            let mut node = Some(layer);
            for seg in path.segments() {
                node = node.as_ref().and_then(|n| n.child(seg).cloned());
                match &node {
                    Some(n) if n.decides_subtree() => complete = true,
                    Some(_) => {}
                    None => break,
                }
            }
            if let Some(n) = node {
                if let Some(data) = n.carried_data() {
                    return Lookup { present: true, data: data.clone() };
                }
                if n.is_deleted() {
                    return Lookup { present: false, data: None };
                }
            }
            match (complete, parent) {
                (true, _) | (false, None) => return Lookup { present: false, data: None },
                (false, Some(p)) => tree = p,
            }
        }
    }

    pub(crate) fn includes(&self, path: &TreePath) -> bool {
        self.lookup(path).present
    }

    /// Full assembled child set of the element at `path`, accumulated
    /// across layers down to the first complete coverage.
    pub(crate) fn child_nodes(&self, path: &TreePath) -> Result<Vec<NodeRef<T>>> {
        let mut acc: Option<Vec<NodeRef<T>>> = None;
        let mut tree = self.clone();
        loop {
            let (layer, parent) = tree.snapshot();
            let mut complete = !layer.is_delta();
            let mut node = Some(layer);
            for seg in path.segments() {
                node = node.as_ref().and_then(|n| n.child(seg).cloned());
                match &node {
                    Some(n) if n.decides_subtree() => complete = true,
                    Some(_) => {}
                    None => break,
                }
            }
            if let Some(n) = node {
                if n.is_deleted() {
                    break;
                }
                acc = Some(match acc {
                    None => n.children().to_vec(),
                    Some(newer) => node::compose_children(n.children(), &newer),
                });
            }
            if complete {
                if let Some(list) = acc {
                    return Ok(list.into_iter().filter(|c| !c.is_deleted()).collect());
                }
                break;
            }
            match parent {
                Some(p) => tree = p,
                None => break,
            }
        }
        Err(TreeError::ElementNotFound(path.clone()))
    }

    /// Newest layer entry mentioning `path`, or `None` when the chain
    /// proves the path absent.
    fn search_node(&self, path: &TreePath) -> Option<NodeRef<T>> {
        let mut tree = self.clone();
        loop {
            let (layer, parent) = tree.snapshot();
            let mut complete = !layer.is_delta();
            let mut node = Some(layer);
            for seg in path.segments() {
                node = node.as_ref().and_then(|n| n.child(seg).cloned());
                match &node {
                    Some(n) if n.decides_subtree() => complete = true,
                    Some(_) => {}
                    None => break,
                }
            }
            if let Some(n) = node {
                if n.is_deleted() {
                    return None;
                }
                return Some(n);
            }
            match (complete, parent) {
                (true, _) | (false, None) => return None,
                (false, Some(p)) => tree = p,
            }
        }
    }

    /// A complete node for the subtree at `path`, sharing the stored
    /// node when the newest mention is already complete.
    pub(crate) fn copy_complete_subtree(&self, path: &TreePath) -> Result<NodeRef<T>> {
        match self.search_node(path) {
            None => Err(TreeError::ElementNotFound(path.clone())),
            Some(n) if !n.is_delta() => Ok(n),
            Some(_) => self.assemble_subtree(path),
        }
    }

    fn assemble_subtree(&self, path: &TreePath) -> Result<NodeRef<T>> {
        let name = path.last().unwrap_or("").to_string();
        let data = if path.is_root() { None } else { self.lookup(path).data };
        let mut children = Vec::new();
        for child in self.child_nodes(path)? {
            children.push(self.copy_complete_subtree(&path.child(child.name()))?);
        }
        Ok(Arc::new(Node::complete(name, data, children)))
    }

    fn graft_at(&self, path: &TreePath, delta: NodeRef<T>) {
        let mut repr = self.inner.repr.write();
        repr.root = node::graft(&repr.root, path.segments(), delta);
    }

    /// Inserts a fresh element, or replaces data and discards children
    /// when `path` already exists. The caller guarantees a non-root
    /// path.
    pub(crate) fn create_child(&self, path: &TreePath, data: T) -> Result<()> {
        self.ensure_mutable()?;
        let parent = match path.parent() {
            Some(p) => p,
            None => return Ok(()),
        };
        if !self.includes(&parent) {
            return Err(TreeError::ElementNotFound(parent));
        }
        let name = path.last().unwrap_or("");
        self.graft_at(path, Arc::new(Node::complete(name, Some(data), Vec::new())));
        Ok(())
    }

    pub(crate) fn set_data(&self, path: &TreePath, data: T) -> Result<()> {
        self.ensure_mutable()?;
        if path.is_root() {
            return Ok(());
        }
        if !self.includes(path) {
            return Err(TreeError::ElementNotFound(path.clone()));
        }
        let name = path.last().unwrap_or("");
        self.graft_at(path, Arc::new(Node::data_delta(name, Some(data))));
        Ok(())
    }

    pub(crate) fn delete_child(&self, path: &TreePath) -> Result<()> {
        self.ensure_mutable()?;
        if path.is_root() {
            return Ok(());
        }
        if !self.includes(path) {
            return Err(TreeError::ElementNotFound(path.clone()));
        }
        let name = path.last().unwrap_or("");
        self.graft_at(path, Arc::new(Node::deleted(name)));
        Ok(())
    }

    /// Grafts a complete subtree node at `path`, replacing anything
    /// already there.
    pub(crate) fn create_subtree_node(&self, path: &TreePath, node: NodeRef<T>) -> Result<()> {
        self.ensure_mutable()?;
        debug_assert!(!node.is_delta());
        let parent = match path.parent() {
            Some(p) => p,
            None => return Ok(()),
        };
        if !self.includes(&parent) {
            return Err(TreeError::ElementNotFound(parent));
        }
        self.graft_at(path, node);
        Ok(())
    }

    /// Composes the layers strictly between `ancestor` and `self`
    /// (inclusive of `self`) into a single delta layer over
    /// `ancestor`'s content.
    pub(crate) fn compose_to(&self, ancestor: &DeltaTree<T>) -> Result<NodeRef<T>> {
        if self.ptr_eq(ancestor) {
            return Ok(Arc::new(Node::no_data_delta("", Vec::new())));
        }
        let mut layers = Vec::new();
        let mut cur = self.clone();
        loop {
            let (layer, parent) = cur.snapshot();
            layers.push(layer);
            match parent {
                Some(p) if p.ptr_eq(ancestor) => break,
                Some(p) => cur = p,
                None => return Err(TreeError::LineageInconsistent),
            }
        }
        // layers is newest-first; fold oldest-first.
        let mut iter = layers.into_iter().rev();
        let mut composed = iter.next().unwrap_or_else(|| Arc::new(Node::no_data_delta("", Vec::new())));
        for newer in iter {
            composed = node::compose(&composed, &newer);
        }
        Ok(composed)
    }

    /// Rechains this generation directly onto `ancestor`, replacing
    /// its representation with the composed span. Content is
    /// unchanged; handles to bypassed generations keep working.
    pub(crate) fn collapse_to(&self, ancestor: &DeltaTree<T>) -> Result<()> {
        if self.ptr_eq(ancestor) {
            return Ok(());
        }
        if let Some(p) = self.parent() {
            if p.ptr_eq(ancestor) {
                return Ok(());
            }
        }
        let composed = self.compose_to(ancestor)?;
        let mut repr = self.inner.repr.write();
        repr.root = composed;
        repr.parent = Some(ancestor.clone());
        Ok(())
    }

    /// Assembles the whole chain into one complete layer and detaches
    /// this generation from its ancestors.
    pub(crate) fn make_complete(&self) {
        let mut layers = Vec::new();
        let mut cur = self.clone();
        loop {
            let (layer, parent) = cur.snapshot();
            layers.push(layer);
            match parent {
                Some(p) => cur = p,
                None => break,
            }
        }
        if layers.len() == 1 {
            return;
        }
        let mut iter = layers.into_iter().rev();
        let mut assembled = match iter.next() {
            Some(base) => base,
            None => return,
        };
        for delta in iter {
            assembled = node::assemble(&assembled, &delta);
        }
        debug_assert!(!assembled.is_delta());
        let mut repr = self.inner.repr.write();
        repr.root = assembled;
        repr.parent = None;
    }

    /// True when `ancestor` lies on this generation's parent chain
    /// (itself included).
    pub(crate) fn has_ancestor_or_self(&self, ancestor: &DeltaTree<T>) -> bool {
        let mut cur = self.clone();
        loop {
            if cur.ptr_eq(ancestor) {
                return true;
            }
            match cur.parent() {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Enumerates the composed span between `ancestor` and `self` as
    /// change records, parents before children.
    pub(crate) fn changes_since(&self, ancestor: &DeltaTree<T>) -> Result<Vec<Change<T>>> {
        let composed = self.compose_to(ancestor)?;
        let mut out = Vec::new();
        emit_changes(&composed, &TreePath::root(), &mut out);
        Ok(out)
    }
}

/// One entry of an enumerated delta span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    /// Element created (or wholly replaced) with the given data.
    Created { path: TreePath, data: T },
    /// Element data replaced; children untouched.
    DataSet { path: TreePath, data: T },
    /// Element and subtree removed.
    Removed { path: TreePath },
}

fn emit_changes<T: Clone>(node: &NodeRef<T>, path: &TreePath, out: &mut Vec<Change<T>>) {
    match node.kind() {
        NodeKind::Complete(data) => {
            if !path.is_root() {
                match data {
                    Some(d) => out.push(Change::Created { path: path.clone(), data: d.clone() }),
                    None => {
                        debug_assert!(false, "non-root element without data");
                        return;
                    }
                }
            }
            for child in node.children() {
                emit_changes(child, &path.child(child.name()), out);
            }
        }
        NodeKind::DataDelta(data) => {
            if let Some(d) = data {
                out.push(Change::DataSet { path: path.clone(), data: d.clone() });
            }
            for child in node.children() {
                emit_changes(child, &path.child(child.name()), out);
            }
        }
        NodeKind::NoDataDelta => {
            for child in node.children() {
                emit_changes(child, &path.child(child.name()), out);
            }
        }
        NodeKind::Deleted => out.push(Change::Removed { path: path.clone() }),
    }
}
