//! Generation retention: pinned generations and collapse-before-save.
//!
//! Long-lived subsystems pin the generation they still need; anything
//! between two pins exists only as delta layers and is released once
//! the chain is compacted. Compaction runs before every save and is
//! strictly best-effort: a save never fails because compaction could
//! not run.

use ahash::AHashMap;
use strata_tree::ElementTree;
use tracing::{debug, warn};

/// Named-subsystem pin table.
pub struct RetentionTable<T> {
    pins: AHashMap<String, ElementTree<T>>,
}

impl<T: Clone> RetentionTable<T> {
    pub fn new() -> Self {
        Self { pins: AHashMap::new() }
    }

    /// Pins `tree` for `subsystem`, returning the previously pinned
    /// generation if any.
    pub fn retain(&mut self, subsystem: impl Into<String>, tree: ElementTree<T>) -> Option<ElementTree<T>> {
        self.pins.insert(subsystem.into(), tree)
    }

    pub fn release(&mut self, subsystem: &str) -> Option<ElementTree<T>> {
        self.pins.remove(subsystem)
    }

    pub fn retained(&self, subsystem: &str) -> Option<&ElementTree<T>> {
        self.pins.get(subsystem)
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ElementTree<T>)> {
        self.pins.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Compacts the chain spanned by the pinned generations and
    /// `current`: sorts them by lineage, makes the oldest complete so
    /// everything below it is released, then collapses each later
    /// generation onto its predecessor. Content never changes.
    ///
    /// Returns `false` when compaction was skipped or abandoned (an
    /// inconsistent pin set, a still-open pinned generation); partial
    /// progress is kept and the condition is logged, never raised.
    pub fn collapse_before_save(&self, current: &ElementTree<T>) -> bool {
        if self.pins.is_empty() {
            return false;
        }
        let mut trees: Vec<ElementTree<T>> = self.pins.values().cloned().collect();
        trees.push(current.clone());
        let sorted = match ElementTree::sort_by_lineage(&trees) {
            Ok(sorted) => sorted,
            Err(err) => {
                warn!(%err, pins = self.pins.len(), "generation collapse skipped");
                return false;
            }
        };
        sorted[0].make_complete();
        for pair in sorted.windows(2) {
            if ElementTree::ptr_eq(&pair[0], &pair[1]) {
                continue;
            }
            if let Err(err) = pair[1].collapse_to(&pair[0]) {
                warn!(%err, "generation collapse abandoned");
                return false;
            }
        }
        debug!(generations = sorted.len(), "generation chain collapsed");
        true
    }
}

impl<T: Clone> Default for RetentionTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
