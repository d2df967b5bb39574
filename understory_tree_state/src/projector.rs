// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visibility projector: the ordered sequence of visible node ids.
//!
//! The sequence is a pre-order traversal restricted to nodes whose ancestors
//! are all expanded. It is never recomputed wholesale on query. Instead every
//! mutation is expressed as a single range replacement ([`Splice`]):
//!
//! - expanding a node inserts its newly visible descendants right after it,
//! - collapsing a node deletes the run that follows it, which is contiguous
//!   because of the pre-order layout and ends at the first entry whose level
//!   is not deeper than the collapsed node.
//!
//! A position map gives O(1) `id -> index`. Entries before a splice keep
//! their index; only the shifted tail is re-indexed.

use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::store::NodeStore;
use crate::types::TreeId;

/// One contiguous replacement in the visible sequence.
///
/// Entries `start..start + removed` of the old sequence were replaced by
/// entries `start..start + inserted` of the new one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Splice {
    /// Index of the first replaced entry.
    pub start: usize,
    /// Number of entries removed.
    pub removed: usize,
    /// Number of entries inserted.
    pub inserted: usize,
}

impl Splice {
    /// Returns `true` if nothing was removed or inserted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.removed == 0 && self.inserted == 0
    }

    /// Map an index of the old sequence to the new one.
    ///
    /// Returns `None` for indices inside the removed range.
    #[must_use]
    pub const fn map_index(&self, index: usize) -> Option<usize> {
        if index < self.start {
            Some(index)
        } else if index < self.start + self.removed {
            None
        } else {
            Some(index - self.removed + self.inserted)
        }
    }

    /// Map a scroll anchor (for example the first visible row) across the splice.
    ///
    /// Indices that survive are mapped with [`Splice::map_index`]. Indices
    /// inside the removed range snap to the entry right before it, which for a
    /// collapse is the collapsed node itself.
    #[must_use]
    pub const fn anchor(&self, index: usize) -> usize {
        match self.map_index(index) {
            Some(i) => i,
            None => self.start.saturating_sub(1),
        }
    }
}

/// Ordered, index-addressable list of visible node ids.
#[derive(Clone, Debug)]
pub struct VisibleList<Id> {
    ids: Vec<Id>,
    positions: HashMap<Id, usize>,
}

impl<Id: TreeId> VisibleList<Id> {
    pub(crate) fn new() -> Self {
        Self {
            ids: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// The visible ids in display order.
    pub fn as_slice(&self) -> &[Id] {
        &self.ids
    }

    /// Number of visible entries.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id displayed at `index`.
    pub fn get(&self, index: usize) -> Option<Id> {
        self.ids.get(index).copied()
    }

    /// Display index of `id`, or `None` if it is hidden or unknown.
    pub fn index_of(&self, id: Id) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Returns `true` if `id` is currently displayed.
    pub fn contains(&self, id: Id) -> bool {
        self.positions.contains_key(&id)
    }

    /// One past the last entry of the visible subtree starting at `index`.
    ///
    /// The run after a node is its visible subtree for as long as entries are
    /// deeper than the node. Cost is proportional to the run.
    pub(crate) fn subtree_end(&self, index: usize, store: &NodeStore<Id>) -> usize {
        let Some(level) = self.get(index).and_then(|id| store.level(id)) else {
            return index;
        };
        let mut end = index + 1;
        while let Some(&id) = self.ids.get(end)
            && store.level(id).is_some_and(|l| l > level)
        {
            end += 1;
        }
        end
    }

    /// Replace `removed` entries at `start` with `inserted`.
    pub(crate) fn splice<I>(&mut self, start: usize, removed: usize, inserted: I) -> Splice
    where
        I: IntoIterator<Item = Id>,
    {
        let end = start + removed;
        for id in &self.ids[start..end] {
            self.positions.remove(id);
        }
        let before = self.ids.len();
        let _ = self.ids.splice(start..end, inserted);
        let inserted = self.ids.len() + removed - before;
        for (index, id) in self.ids.iter().enumerate().skip(start) {
            self.positions.insert(*id, index);
        }
        log::trace!("visible splice at {start}: -{removed} +{inserted}");
        Splice {
            start,
            removed,
            inserted,
        }
    }

    /// Recompute the whole sequence from the store.
    pub(crate) fn rebuild(&mut self, store: &NodeStore<Id>) {
        self.ids = full_sequence(store);
        self.positions.clear();
        for (index, id) in self.ids.iter().enumerate() {
            self.positions.insert(*id, index);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.ids.clear();
        self.positions.clear();
    }
}

/// Visible descendants of `id` in pre-order, assuming `id` itself is shown.
///
/// Descends only through expanded nodes.
pub(crate) fn visible_below<Id: TreeId>(store: &NodeStore<Id>, id: Id) -> Vec<Id> {
    let mut out = Vec::new();
    if !store.is_expanded(id) {
        return out;
    }
    let mut stack: Vec<Id> = store.children_of(id).iter().rev().copied().collect();
    while let Some(next) = stack.pop() {
        out.push(next);
        if store.is_expanded(next) {
            stack.extend(store.children_of(next).iter().rev().copied());
        }
    }
    out
}

/// Full visible sequence of the tree.
pub(crate) fn full_sequence<Id: TreeId>(store: &NodeStore<Id>) -> Vec<Id> {
    let mut out = Vec::new();
    for &root in store.roots() {
        out.push(root);
        out.extend(visible_below(store, root));
    }
    out
}
