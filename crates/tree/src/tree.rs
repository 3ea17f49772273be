//! `ElementTree`: the generation handle.
//!
//! A handle is a cheaply cloneable reference to one generation of a
//! versioned tree. Handles add per-generation conveniences on top of
//! the delta chain: a single-slot lookup cache, a children cache,
//! tree-level user data, and the lineage utilities (`find_oldest`,
//! `sort_by_lineage`, `merge_delta_chain`).

use crate::chain::{Change, DeltaTree};
use crate::delta::{ElementComparator, TreeDelta};
use crate::error::{Result, TreeError};
use crate::node::{Node, NodeRef};
use crate::path::TreePath;
use ahash::AHashMap;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;

/// One generation of a persistent, path-keyed tree.
///
/// Cloning a handle clones the reference, not the generation. Reads
/// are valid on any generation; mutations only on an unfrozen one.
/// Payloads are cloned out of read operations, so large payloads are
/// best wrapped in `Arc` by the caller.
pub struct ElementTree<T> {
    inner: Arc<Handle<T>>,
}

struct Handle<T> {
    tree: DeltaTree<T>,
    /// The logically older neighbor; rewired by `collapse_to` and
    /// cleared by `make_complete`.
    parent: RwLock<Option<ElementTree<T>>>,
    lookup_cache: Mutex<Option<CachedLookup<T>>>,
    children_cache: Mutex<Option<CachedChildren>>,
    user_data: RwLock<Option<T>>,
}

struct CachedLookup<T> {
    path: TreePath,
    present: bool,
    data: Option<T>,
}

struct CachedChildren {
    path: TreePath,
    children: Vec<TreePath>,
}

impl<T> Clone for ElementTree<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> fmt::Debug for ElementTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementTree({})", self.inner.tree.stamp())
    }
}

impl<T: Clone> Default for ElementTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ElementTree<T> {
    /// A new mutable generation holding only the root.
    pub fn new() -> Self {
        Self::from_parts(
            DeltaTree::new_complete(Arc::new(Node::complete("", None, Vec::new()))),
            None,
            None,
        )
    }

    fn from_parts(
        tree: DeltaTree<T>,
        parent: Option<ElementTree<T>>,
        user_data: Option<T>,
    ) -> Self {
        Self {
            inner: Arc::new(Handle {
                tree,
                parent: RwLock::new(parent),
                lookup_cache: Mutex::new(None),
                children_cache: Mutex::new(None),
                user_data: RwLock::new(user_data),
            }),
        }
    }

    fn from_root_node(root: NodeRef<T>) -> Self {
        Self::from_parts(DeltaTree::new_complete(root), None, None)
    }

    /// A new mutable generation layered over this one. This
    /// generation is frozen first if it is still open. O(1): no
    /// content is copied. Tree-level user data is carried forward.
    pub fn new_empty_delta(&self) -> ElementTree<T> {
        if !self.is_immutable() {
            self.immutable();
        }
        Self::from_parts(
            self.inner.tree.new_empty_delta(),
            Some(self.clone()),
            self.tree_data(),
        )
    }

    /// Freezes this generation: no further mutation, the layer is
    /// canonicalized against its parent, and the handle caches are
    /// cleared. Idempotent.
    pub fn immutable(&self) {
        if self.is_immutable() {
            return;
        }
        self.inner.tree.freeze();
        self.invalidate_caches();
    }

    pub fn is_immutable(&self) -> bool {
        self.inner.tree.is_immutable()
    }

    /// Whether two handles refer to the same generation.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    /// The generation this one's representation is layered over, or
    /// `None` for a complete generation.
    pub fn parent(&self) -> Option<ElementTree<T>> {
        self.inner.parent.read().clone()
    }

    /// Parent hops from this generation to the nearest complete
    /// representation.
    pub fn delta_depth(&self) -> usize {
        self.inner.tree.delta_depth()
    }

    /// Tree-level user data: a side attribute of the generation, not
    /// part of any element. Carried forward by `new_empty_delta`,
    /// ignored by content comparisons and serialization.
    pub fn tree_data(&self) -> Option<T> {
        self.inner.user_data.read().clone()
    }

    pub fn set_tree_data(&self, data: T) {
        *self.inner.user_data.write() = Some(data);
    }

    fn invalidate_caches(&self) {
        *self.inner.lookup_cache.lock() = None;
        *self.inner.children_cache.lock() = None;
    }

    fn cached_lookup(&self, path: &TreePath) -> (bool, Option<T>) {
        let mut cache = self.inner.lookup_cache.lock();
        if let Some(c) = cache.as_ref() {
            if c.path == *path {
                return (c.present, c.data.clone());
            }
        }
        let found = self.inner.tree.lookup(path);
        *cache = Some(CachedLookup {
            path: path.clone(),
            present: found.present,
            data: found.data.clone(),
        });
        (found.present, found.data)
    }

    /// Whether `path` exists in this generation.
    pub fn includes(&self, path: &TreePath) -> bool {
        self.cached_lookup(path).0
    }

    /// The data of the element at `path`. The root has no data slot.
    pub fn data(&self, path: &TreePath) -> Result<T> {
        if path.is_root() {
            return Err(TreeError::InvalidArgument(
                "the root element has no data slot".into(),
            ));
        }
        match self.cached_lookup(path) {
            (true, Some(data)) => Ok(data),
            _ => Err(TreeError::ElementNotFound(path.clone())),
        }
    }

    /// Paths of the element's children, sorted by name.
    pub fn children(&self, path: &TreePath) -> Result<Vec<TreePath>> {
        let mut cache = self.inner.children_cache.lock();
        if let Some(c) = cache.as_ref() {
            if c.path == *path {
                return Ok(c.children.clone());
            }
        }
        let children: Vec<TreePath> = self
            .inner
            .tree
            .child_nodes(path)?
            .iter()
            .map(|n| path.child(n.name()))
            .collect();
        *cache = Some(CachedChildren { path: path.clone(), children: children.clone() });
        Ok(children)
    }

    /// Names of the element's children, sorted.
    pub fn child_names(&self, path: &TreePath) -> Result<Vec<String>> {
        Ok(self
            .inner
            .tree
            .child_nodes(path)?
            .iter()
            .map(|n| n.name().to_string())
            .collect())
    }

    /// Inserts an element with the given data. Re-creating an
    /// existing element replaces its data and discards its children.
    /// Creating the root is silently ignored.
    pub fn create(&self, path: &TreePath, data: T) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        self.invalidate_caches();
        self.inner.tree.create_child(path, data)
    }

    /// Replaces the element's data, leaving its children untouched.
    /// Setting the root's data is silently ignored.
    pub fn set_data(&self, path: &TreePath, data: T) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        self.invalidate_caches();
        self.inner.tree.set_data(path, data)
    }

    /// Removes the element and its whole subtree. Deleting the root
    /// is silently ignored.
    pub fn delete(&self, path: &TreePath) -> Result<()> {
        if path.is_root() {
            return Ok(());
        }
        self.invalidate_caches();
        self.inner.tree.delete_child(path)
    }

    /// An independent, frozen, complete generation holding the
    /// subtree at `path` as its single top-level child. For the root
    /// this is the generation itself.
    pub fn subtree(&self, path: &TreePath) -> Result<ElementTree<T>> {
        if path.is_root() {
            return Ok(self.clone());
        }
        let node = self.inner.tree.copy_complete_subtree(path)?;
        let out = Self::from_root_node(Arc::new(Node::complete("", None, vec![node])));
        out.immutable();
        Ok(out)
    }

    /// Grafts the content of `subtree` (a generation with exactly one
    /// top-level child, as produced by [`subtree`](Self::subtree)) at
    /// `path`, replacing anything already there.
    pub fn create_subtree(&self, path: &TreePath, subtree: &ElementTree<T>) -> Result<()> {
        if path.is_root() {
            return Err(TreeError::InvalidArgument(
                "cannot replace the root element".into(),
            ));
        }
        let top = subtree.children(&TreePath::root())?;
        let donor = match top.as_slice() {
            [only] => only,
            _ => {
                return Err(TreeError::InvalidArgument(
                    "subtree must have exactly one top-level element".into(),
                ))
            }
        };
        let node = subtree.inner.tree.copy_complete_subtree(donor)?;
        let name = path.last().unwrap_or("");
        self.invalidate_caches();
        self.inner.tree.create_subtree_node(path, node.with_name(name))
    }

    /// Rechains this frozen generation directly onto `ancestor`,
    /// discarding the representations in between. Observable content
    /// never changes; handles to bypassed generations keep working.
    pub fn collapse_to(&self, ancestor: &ElementTree<T>) -> Result<()> {
        if !self.is_immutable() {
            return Err(TreeError::IllegalState("collapse requires a frozen generation"));
        }
        if Arc::ptr_eq(&self.inner, &ancestor.inner) {
            return Ok(());
        }
        self.inner.tree.collapse_to(&ancestor.inner.tree)?;
        *self.inner.parent.write() = Some(ancestor.clone());
        Ok(())
    }

    /// Rebuilds this generation as a complete one, detaching it from
    /// all ancestors. Content is unchanged; `delta_depth` becomes 0.
    pub fn make_complete(&self) {
        self.inner.tree.make_complete();
        *self.inner.parent.write() = None;
    }

    /// Computes the delta between `older` and this generation,
    /// restricted to the subtree at `path`. The comparator judges
    /// elements present on both sides; subtrees shared by reference
    /// are skipped without comparison.
    pub fn compute_delta_with(
        &self,
        older: &ElementTree<T>,
        comparator: &dyn ElementComparator<T>,
        path: &TreePath,
    ) -> TreeDelta {
        let older_node = older.inner.tree.copy_complete_subtree(path).ok();
        let newer_node = self.inner.tree.copy_complete_subtree(path).ok();
        crate::delta::between(older_node, newer_node, path, comparator)
    }

    /// Enumerates the changes between `ancestor` (a true ancestor of
    /// this generation) and this generation, parents before children.
    pub fn changes_since(&self, ancestor: &ElementTree<T>) -> Result<Vec<Change<T>>> {
        self.inner.tree.changes_since(&ancestor.inner.tree)
    }

    /// Depth-first iterator over `(path, data)` of the subtree at
    /// `path`, parents before children; the root yields `None` data.
    pub fn iter_from(&self, path: &TreePath) -> Result<TreeIter<T>> {
        let node = self.inner.tree.copy_complete_subtree(path)?;
        Ok(TreeIter { stack: vec![(path.clone(), node)] })
    }

    /// Index of the oldest generation: the one that is an ancestor
    /// (or duplicate) of every other entry. `LineageInconsistent`
    /// when the set does not form a single lineage.
    pub fn find_oldest(trees: &[ElementTree<T>]) -> Result<usize> {
        if trees.is_empty() {
            return Err(TreeError::InvalidArgument("empty generation set".into()));
        }
        let mut oldest = 0;
        for (i, tree) in trees.iter().enumerate().skip(1) {
            if tree.inner.tree.has_ancestor_or_self(&trees[oldest].inner.tree) {
                continue;
            }
            if trees[oldest].inner.tree.has_ancestor_or_self(&tree.inner.tree) {
                oldest = i;
                continue;
            }
            return Err(TreeError::LineageInconsistent);
        }
        Ok(oldest)
    }

    /// The given generations sorted oldest first. Duplicate handles
    /// are kept and end up adjacent.
    pub fn sort_by_lineage(trees: &[ElementTree<T>]) -> Result<Vec<ElementTree<T>>> {
        let mut counts: AHashMap<usize, usize> = AHashMap::new();
        let mut distinct: Vec<ElementTree<T>> = Vec::new();
        for tree in trees {
            let key = Arc::as_ptr(&tree.inner) as usize;
            let count = counts.entry(key).or_insert(0);
            if *count == 0 {
                distinct.push(tree.clone());
            }
            *count += 1;
        }
        let mut sorted = Vec::with_capacity(trees.len());
        while !distinct.is_empty() {
            let idx = Self::find_oldest(&distinct)?;
            let gen = distinct.swap_remove(idx);
            let key = Arc::as_ptr(&gen.inner) as usize;
            for _ in 0..counts.get(&key).copied().unwrap_or(1) {
                sorted.push(gen.clone());
            }
        }
        Ok(sorted)
    }

    /// Merges a foreign delta chain into this open generation at
    /// `path` (or per top-level element when `path` is the root).
    /// Each foreign generation's subtree content is grafted into a
    /// successive frozen generation of the receiving chain, and the
    /// corresponding `foreign` entries are rewritten in place to the
    /// merged generations. Returns the new open frontier.
    pub fn merge_delta_chain(
        &self,
        path: &TreePath,
        foreign: &mut [ElementTree<T>],
    ) -> Result<ElementTree<T>> {
        if self.is_immutable() {
            return Err(TreeError::IllegalState("merge requires an open generation"));
        }
        if foreign.is_empty() {
            return Ok(self.clone());
        }
        let order = Self::sort_by_lineage(foreign)?;
        let mut current = self.clone();
        let mut previous: Option<ElementTree<T>> = None;
        for gen in order {
            if let Some(prev) = &previous {
                if Arc::ptr_eq(&prev.inner, &gen.inner) {
                    continue;
                }
            }
            if path.is_root() {
                for child in gen.children(&TreePath::root())? {
                    current.create_subtree(&child, &gen.subtree(&child)?)?;
                }
            } else {
                current.create_subtree(path, &gen.subtree(path)?)?;
            }
            current.immutable();
            for slot in foreign.iter_mut() {
                if Arc::ptr_eq(&slot.inner, &gen.inner) {
                    *slot = current.clone();
                }
            }
            previous = Some(gen);
            current = current.new_empty_delta();
        }
        Ok(current)
    }
}

/// Depth-first pre-order iterator over a subtree's `(path, data)`.
pub struct TreeIter<T> {
    stack: Vec<(TreePath, NodeRef<T>)>,
}

impl<T: Clone> Iterator for TreeIter<T> {
    type Item = (TreePath, Option<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        for child in node.children().iter().rev() {
            self.stack.push((path.child(child.name()), Arc::clone(child)));
        }
        let data = node.carried_data().and_then(|d| d.clone());
        Some((path, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> TreePath {
        TreePath::parse(s)
    }

    fn seeded() -> ElementTree<String> {
        let tree = ElementTree::new();
        tree.create(&p("/a"), "A".into()).unwrap();
        tree.create(&p("/a/b"), "B".into()).unwrap();
        tree.create(&p("/a/c"), "C".into()).unwrap();
        tree.create(&p("/d"), "D".into()).unwrap();
        tree
    }

    #[test]
    fn test_create_and_read() {
        let tree = seeded();
        assert!(tree.includes(&p("/a/b")));
        assert_eq!(tree.data(&p("/a/b")).unwrap(), "B");
        assert_eq!(tree.children(&p("/a")).unwrap(), vec![p("/a/b"), p("/a/c")]);
        assert_eq!(tree.child_names(&p("/")).unwrap(), vec!["a", "d"]);
        assert!(tree.includes(&p("/")));
    }

    #[test]
    fn test_root_has_no_data_slot() {
        let tree = seeded();
        assert!(matches!(
            tree.data(&TreePath::root()),
            Err(TreeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_root_mutations_are_ignored() {
        let tree = seeded();
        tree.create(&TreePath::root(), "X".into()).unwrap();
        tree.set_data(&TreePath::root(), "X".into()).unwrap();
        tree.delete(&TreePath::root()).unwrap();
        assert!(tree.includes(&p("/a/b")));
    }

    #[test]
    fn test_create_requires_parent() {
        let tree = ElementTree::<String>::new();
        let err = tree.create(&p("/x/y"), "Y".into()).unwrap_err();
        assert!(matches!(err, TreeError::ElementNotFound(path) if path == p("/x")));
    }

    #[test]
    fn test_recreate_discards_children() {
        let tree = seeded();
        tree.create(&p("/a"), "A2".into()).unwrap();
        assert_eq!(tree.data(&p("/a")).unwrap(), "A2");
        assert!(!tree.includes(&p("/a/b")));
        assert!(tree.children(&p("/a")).unwrap().is_empty());
    }

    #[test]
    fn test_set_data_keeps_children() {
        let tree = seeded();
        tree.set_data(&p("/a"), "A2".into()).unwrap();
        assert_eq!(tree.data(&p("/a")).unwrap(), "A2");
        assert!(tree.includes(&p("/a/b")));
    }

    #[test]
    fn test_delete_removes_subtree() {
        let tree = seeded();
        tree.delete(&p("/a")).unwrap();
        assert!(!tree.includes(&p("/a")));
        assert!(!tree.includes(&p("/a/b")));
        assert!(matches!(
            tree.children(&p("/a")),
            Err(TreeError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_delete_then_recreate_is_fresh() {
        let tree = seeded();
        tree.immutable();
        let next = tree.new_empty_delta();
        next.delete(&p("/a")).unwrap();
        next.create(&p("/a"), "A2".into()).unwrap();
        assert_eq!(next.data(&p("/a")).unwrap(), "A2");
        assert!(!next.includes(&p("/a/b")));
        // the frozen ancestor is untouched
        assert_eq!(tree.data(&p("/a")).unwrap(), "A");
        assert!(tree.includes(&p("/a/b")));
    }

    #[test]
    fn test_mutation_after_freeze_fails() {
        let tree = seeded();
        tree.immutable();
        assert!(matches!(
            tree.create(&p("/x"), "X".into()),
            Err(TreeError::IllegalState(_))
        ));
        assert!(matches!(
            tree.set_data(&p("/a"), "X".into()),
            Err(TreeError::IllegalState(_))
        ));
        assert!(matches!(tree.delete(&p("/a")), Err(TreeError::IllegalState(_))));
    }

    #[test]
    fn test_mutations_invalidate_handle_caches() {
        let tree = seeded();
        // prime the single-slot caches
        assert_eq!(tree.data(&p("/a/b")).unwrap(), "B");
        assert_eq!(tree.children(&p("/a")).unwrap(), vec![p("/a/b"), p("/a/c")]);
        // a mutation through the same handle must not serve stale slots
        tree.set_data(&p("/a/b"), "B2".into()).unwrap();
        assert_eq!(tree.data(&p("/a/b")).unwrap(), "B2");
        tree.delete(&p("/a/c")).unwrap();
        assert_eq!(tree.children(&p("/a")).unwrap(), vec![p("/a/b")]);
        assert!(!tree.includes(&p("/a/c")));
        tree.create(&p("/a/c"), "C2".into()).unwrap();
        assert!(tree.includes(&p("/a/c")));
        assert_eq!(tree.children(&p("/a")).unwrap(), vec![p("/a/b"), p("/a/c")]);
    }

    #[test]
    fn test_freeze_is_idempotent() {
        let tree = seeded();
        tree.immutable();
        tree.immutable();
        assert!(tree.is_immutable());
        assert_eq!(tree.data(&p("/a")).unwrap(), "A");
    }

    #[test]
    fn test_new_empty_delta_freezes_parent() {
        let tree = seeded();
        assert!(!tree.is_immutable());
        let next = tree.new_empty_delta();
        assert!(tree.is_immutable());
        assert!(!next.is_immutable());
        assert_eq!(next.delta_depth(), 1);
        assert_eq!(tree.delta_depth(), 0);
    }

    #[test]
    fn test_lookup_walks_to_nearest_layer() {
        let g1 = seeded();
        let g2 = g1.new_empty_delta();
        g2.set_data(&p("/a/b"), "B2".into()).unwrap();
        let g3 = g2.new_empty_delta();
        // /a/b resolves in g2's layer, /a/c falls through to g1
        assert_eq!(g3.data(&p("/a/b")).unwrap(), "B2");
        assert_eq!(g3.data(&p("/a/c")).unwrap(), "C");
        assert_eq!(g1.data(&p("/a/b")).unwrap(), "B");
    }

    #[test]
    fn test_subtree_and_create_subtree() {
        let tree = seeded();
        let sub = tree.subtree(&p("/a")).unwrap();
        assert!(sub.is_immutable());
        assert_eq!(sub.children(&TreePath::root()).unwrap(), vec![p("/a")]);
        assert_eq!(sub.data(&p("/a/b")).unwrap(), "B");

        let other = ElementTree::new();
        other.create(&p("/grafted"), "G".into()).unwrap();
        other.create_subtree(&p("/grafted"), &sub).unwrap();
        assert_eq!(other.data(&p("/grafted")).unwrap(), "A");
        assert_eq!(other.data(&p("/grafted/b")).unwrap(), "B");
        // donor is unaffected by later edits to the graft
        other.set_data(&p("/grafted/b"), "B2".into()).unwrap();
        assert_eq!(sub.data(&p("/a/b")).unwrap(), "B");
    }

    #[test]
    fn test_create_subtree_validation() {
        let tree = seeded();
        let sub = tree.subtree(&p("/a")).unwrap();
        assert!(matches!(
            tree.create_subtree(&TreePath::root(), &sub),
            Err(TreeError::InvalidArgument(_))
        ));
        let two_tops = ElementTree::new();
        two_tops.create(&p("/x"), "X".into()).unwrap();
        two_tops.create(&p("/y"), "Y".into()).unwrap();
        assert!(matches!(
            tree.create_subtree(&p("/a"), &two_tops),
            Err(TreeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_subtree_of_root_is_self() {
        let tree = seeded();
        let sub = tree.subtree(&TreePath::root()).unwrap();
        assert!(Arc::ptr_eq(&tree.inner, &sub.inner));
    }

    #[test]
    fn test_tree_data_carried_forward() {
        let tree = ElementTree::new();
        tree.set_tree_data("meta".to_string());
        let next = tree.new_empty_delta();
        assert_eq!(next.tree_data().as_deref(), Some("meta"));
        next.set_tree_data("meta2".to_string());
        assert_eq!(tree.tree_data().as_deref(), Some("meta"));
    }

    #[test]
    fn test_collapse_requires_frozen() {
        let g1 = seeded();
        let g2 = g1.new_empty_delta();
        assert!(matches!(
            g2.collapse_to(&g1),
            Err(TreeError::IllegalState(_))
        ));
    }

    #[test]
    fn test_collapse_to_non_ancestor_fails() {
        let g1 = seeded();
        let g2 = g1.new_empty_delta();
        g2.immutable();
        let stranger = ElementTree::<String>::new();
        stranger.immutable();
        assert!(matches!(
            g2.collapse_to(&stranger),
            Err(TreeError::LineageInconsistent)
        ));
    }

    #[test]
    fn test_make_complete_detaches() {
        let g1 = seeded();
        let g2 = g1.new_empty_delta();
        g2.set_data(&p("/a"), "A2".into()).unwrap();
        g2.immutable();
        g2.make_complete();
        assert_eq!(g2.delta_depth(), 0);
        assert!(g2.parent().is_none());
        assert_eq!(g2.data(&p("/a")).unwrap(), "A2");
        assert_eq!(g2.data(&p("/a/b")).unwrap(), "B");
        assert_eq!(g1.data(&p("/a")).unwrap(), "A");
    }

    #[test]
    fn test_find_oldest_and_sort() {
        let g1 = seeded();
        let g2 = g1.new_empty_delta();
        let g3 = g2.new_empty_delta();
        let trees = vec![g3.clone(), g1.clone(), g2.clone(), g3.clone()];
        assert_eq!(ElementTree::find_oldest(&trees).unwrap(), 1);
        let sorted = ElementTree::sort_by_lineage(&trees).unwrap();
        assert_eq!(sorted.len(), 4);
        assert!(Arc::ptr_eq(&sorted[0].inner, &g1.inner));
        assert!(Arc::ptr_eq(&sorted[1].inner, &g2.inner));
        assert!(Arc::ptr_eq(&sorted[2].inner, &g3.inner));
        assert!(Arc::ptr_eq(&sorted[3].inner, &g3.inner));
    }

    #[test]
    fn test_find_oldest_forest_fails() {
        let g1 = ElementTree::<String>::new();
        let g2 = ElementTree::<String>::new();
        assert!(matches!(
            ElementTree::find_oldest(&[g1, g2]),
            Err(TreeError::LineageInconsistent)
        ));
    }

    #[test]
    fn test_iter_from_preorder() {
        let tree = seeded();
        let all: Vec<_> = tree.iter_from(&TreePath::root()).unwrap().collect();
        assert_eq!(
            all,
            vec![
                (TreePath::root(), None),
                (p("/a"), Some("A".to_string())),
                (p("/a/b"), Some("B".to_string())),
                (p("/a/c"), Some("C".to_string())),
                (p("/d"), Some("D".to_string())),
            ]
        );
    }

    #[test]
    fn test_merge_frozen_receiver_fails() {
        let tree = seeded();
        tree.immutable();
        let mut foreign = [ElementTree::<String>::new()];
        assert!(matches!(
            tree.merge_delta_chain(&p("/a"), &mut foreign),
            Err(TreeError::IllegalState(_))
        ));
    }
}
