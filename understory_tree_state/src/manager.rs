// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree state manager: the facade over the node store, the visible sequence,
//! and the observer registry.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write as _};
use core::iter;
use smallvec::SmallVec;

use crate::error::TreeError;
use crate::observer::{ChangeKinds, ObserverHandle, ObserverRegistry, TreeEvent, TreeObserver};
use crate::projector::{Splice, VisibleList, visible_below};
use crate::store::NodeStore;
use crate::types::{Expansion, InsertPosition, TreeId, TreeNodeInfo};

/// Events produced by a single mutation. Most mutations produce one.
type Events<Id> = SmallVec<[TreeEvent<Id>; 2]>;

/// Behavior switches for a [`TreeStateManager`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TreeOptions {
    /// Expand a visible, collapsed parent when a child is inserted under it.
    ///
    /// Off by default: new children of a collapsed parent stay hidden until
    /// the parent is expanded.
    pub expand_on_insert: bool,
}

/// Read-only view of a tree.
///
/// Handed to observers during notification and available from
/// [`TreeStateManager::view`]. All answers reflect the state at call time.
#[derive(Debug)]
pub struct TreeView<'a, Id> {
    store: &'a NodeStore<Id>,
    visible: &'a VisibleList<Id>,
}

impl<Id> Clone for TreeView<'_, Id> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Id> Copy for TreeView<'_, Id> {}

impl<'a, Id: TreeId> TreeView<'a, Id> {
    /// Structural data: parents, children, siblings, levels.
    pub fn store(&self) -> &'a NodeStore<Id> {
        self.store
    }

    /// The visible sequence with its index lookups.
    pub fn visible(&self) -> &'a VisibleList<Id> {
        self.visible
    }

    /// Number of visible rows.
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Visible ids in display order.
    pub fn visible_list(&self) -> &'a [Id] {
        self.visible.as_slice()
    }

    /// Id displayed at `index`.
    pub fn id_at(&self, index: usize) -> Option<Id> {
        self.visible.get(index)
    }

    /// Display index of `id`, or `None` if it is hidden or unknown.
    pub fn index_of(&self, id: Id) -> Option<usize> {
        self.visible.index_of(id)
    }

    /// Returns `true` if `id` is displayed.
    pub fn is_visible(&self, id: Id) -> bool {
        self.visible.contains(id)
    }

    /// Snapshot of a node's state.
    pub fn node_info(&self, id: Id) -> Result<TreeNodeInfo<Id>, TreeError<Id>> {
        self.store.info(id)
    }

    /// Returns `true` if `id` is in the tree.
    pub fn contains(&self, id: Id) -> bool {
        self.store.contains(id)
    }

    /// Total number of nodes, visible or not.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Compact debug string of the ids from the root down to `id`.
    ///
    /// For `D` in `A(B(D))` with `char` ids this is `'A' > 'B' > 'D'`.
    pub fn hierarchy_description(&self, id: Id) -> Result<String, TreeError<Id>> {
        if !self.store.contains(id) {
            return Err(TreeError::UnknownId(id));
        }
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            path.push(node);
            current = self.store.parent_of(node);
        }
        let mut out = String::new();
        for (i, node) in path.iter().rev().enumerate() {
            if i > 0 {
                out.push_str(" > ");
            }
            let _ = write!(out, "{node:?}");
        }
        Ok(out)
    }
}

/// Owner of the tree structure, its visible sequence, and its observers.
///
/// All mutations go through this type. Each one updates the store, splices
/// the visible sequence, and only then notifies observers, so a callback
/// that reads the tree sees the finished state.
///
/// ## Expansion policy
///
/// Collapsing a node also collapses everything below it. Expanding a node
/// therefore always reveals its direct children in the collapsed state; use
/// [`TreeStateManager::expand_everything_below`] to open a whole subtree.
/// Expanding a node that is hidden first expands its collapsed ancestors.
///
/// ## Example
///
/// ```rust
/// use understory_tree_state::{Expansion, TreeStateManager};
///
/// let mut tree = TreeStateManager::new();
/// tree.insert(None, "A", None).unwrap();
/// tree.insert(Some("A"), "B", None).unwrap();
/// tree.insert(Some("A"), "C", None).unwrap();
/// tree.insert(Some("B"), "D", None).unwrap();
///
/// // Only roots are visible at first.
/// assert_eq!(tree.visible_list(), &["A"]);
///
/// tree.expand_direct_children("A").unwrap();
/// tree.expand_direct_children("B").unwrap();
/// assert_eq!(tree.visible_list(), &["A", "B", "D", "C"]);
///
/// tree.collapse_children("B").unwrap();
/// assert_eq!(tree.visible_list(), &["A", "B", "C"]);
///
/// // Leaves cannot be expanded; that is reported, not raised.
/// assert_eq!(tree.expand_direct_children("C"), Ok(Expansion::NotExpandable));
/// ```
pub struct TreeStateManager<Id> {
    store: NodeStore<Id>,
    visible: VisibleList<Id>,
    observers: ObserverRegistry<Id>,
    options: TreeOptions,
}

impl<Id> fmt::Debug for TreeStateManager<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeStateManager")
            .field("store", &self.store)
            .field("observers", &self.observers)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<Id: TreeId> Default for TreeStateManager<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: TreeId> TreeStateManager<Id> {
    /// Create an empty tree with default options.
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    /// Create an empty tree with the given options.
    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            store: NodeStore::new(),
            visible: VisibleList::new(),
            observers: ObserverRegistry::new(),
            options,
        }
    }

    /// Options this tree was created with.
    pub fn options(&self) -> TreeOptions {
        self.options
    }

    /// Read-only view of the whole tree.
    pub fn view(&self) -> TreeView<'_, Id> {
        TreeView {
            store: &self.store,
            visible: &self.visible,
        }
    }

    /// Structural data: parents, children, siblings, levels.
    pub fn store(&self) -> &NodeStore<Id> {
        &self.store
    }

    // --- reads ---

    /// Number of visible rows. Always equals `visible_list().len()`.
    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Visible ids in display order.
    pub fn visible_list(&self) -> &[Id] {
        self.visible.as_slice()
    }

    /// Snapshot of a node's state.
    pub fn node_info(&self, id: Id) -> Result<TreeNodeInfo<Id>, TreeError<Id>> {
        self.store.info(id)
    }

    /// Id displayed at `index`.
    pub fn id_at(&self, index: usize) -> Option<Id> {
        self.visible.get(index)
    }

    /// Display index of `id`, or `None` if it is hidden or unknown.
    pub fn index_of(&self, id: Id) -> Option<usize> {
        self.visible.index_of(id)
    }

    /// Returns `true` if `id` is displayed.
    pub fn is_visible(&self, id: Id) -> bool {
        self.visible.contains(id)
    }

    /// Returns `true` if `id` is in the tree.
    pub fn contains(&self, id: Id) -> bool {
        self.store.contains(id)
    }

    /// Total number of nodes, visible or not.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// See [`TreeView::hierarchy_description`].
    pub fn hierarchy_description(&self, id: Id) -> Result<String, TreeError<Id>> {
        self.view().hierarchy_description(id)
    }

    // --- structure ---

    /// Add `id` under `parent` (or as a root), right after `after` among its
    /// siblings, or last when `after` is `None`.
    pub fn insert(
        &mut self,
        parent: Option<Id>,
        id: Id,
        after: Option<Id>,
    ) -> Result<(), TreeError<Id>> {
        self.insert_at(parent, id, InsertPosition::after(after))
    }

    /// Add `id` under `parent` (or as a root) at `position`.
    ///
    /// The node is shown right away if it is a root or its parent is
    /// expanded. Otherwise it stays hidden, unless
    /// [`TreeOptions::expand_on_insert`] is set and the parent is visible.
    pub fn insert_at(
        &mut self,
        parent: Option<Id>,
        id: Id,
        position: InsertPosition<Id>,
    ) -> Result<(), TreeError<Id>> {
        let parent_was_leaf = parent.is_some_and(|p| self.store.children_of(p).is_empty());
        self.store.insert_at(parent, id, position)?;

        let mut events = Events::new();
        match parent {
            None => events.push(TreeEvent::Structural(self.show_subtree(id))),
            Some(p) if self.store.is_expanded(p) => {
                events.push(TreeEvent::Structural(self.show_subtree(id)));
            }
            Some(p) if self.visible.contains(p) => {
                if self.options.expand_on_insert {
                    self.store.set_expanded(p, true)?;
                    if let Some(splice) = self.refill(p) {
                        events.push(TreeEvent::Structural(splice));
                    }
                } else if parent_was_leaf {
                    events.push(TreeEvent::NodeChanged(p));
                }
            }
            Some(_) => {}
        }
        self.dispatch(&events);
        Ok(())
    }

    /// Delete `id` and its whole subtree, returning the removed ids in pre-order.
    pub fn remove(&mut self, id: Id) -> Result<Vec<Id>, TreeError<Id>> {
        let parent = self.store.info(id)?.parent;
        let range = self
            .visible
            .index_of(id)
            .map(|pos| (pos, self.visible.subtree_end(pos, &self.store)));
        let removed = self.store.remove(id)?;

        let mut events = Events::new();
        if let Some((pos, end)) = range {
            let splice = self.visible.splice(pos, end - pos, iter::empty());
            events.push(TreeEvent::Structural(splice));
        }
        if let Some(p) = parent
            && self.store.children_of(p).is_empty()
            && self.visible.contains(p)
        {
            events.push(TreeEvent::NodeChanged(p));
        }
        self.dispatch(&events);
        Ok(removed)
    }

    /// Move `id` and its subtree under `new_parent` (or to the root list) at `position`.
    ///
    /// Fails with [`TreeError::CyclicInsertion`] if `new_parent` is `id` or
    /// one of its descendants. A subtree moved under a collapsed parent is
    /// collapsed as well.
    pub fn reparent(
        &mut self,
        id: Id,
        new_parent: Option<Id>,
        position: InsertPosition<Id>,
    ) -> Result<(), TreeError<Id>> {
        self.store.check_move(id, new_parent, &position)?;
        let old_parent = self.store.parent_of(id);
        let new_parent_was_leaf =
            new_parent.is_some_and(|p| self.store.children_of(p).is_empty());

        let mut events = Events::new();
        if let Some(pos) = self.visible.index_of(id) {
            let end = self.visible.subtree_end(pos, &self.store);
            let splice = self.visible.splice(pos, end - pos, iter::empty());
            events.push(TreeEvent::Structural(splice));
        }
        self.store.reparent(id, new_parent, position)?;

        if new_parent.is_none_or(|p| self.store.is_expanded(p)) {
            events.push(TreeEvent::Structural(self.show_subtree(id)));
        } else {
            self.store.collapse_subtree(id);
            if new_parent_was_leaf
                && let Some(p) = new_parent
                && self.visible.contains(p)
            {
                events.push(TreeEvent::NodeChanged(p));
            }
        }
        if old_parent != new_parent
            && let Some(p) = old_parent
            && self.store.children_of(p).is_empty()
            && self.visible.contains(p)
        {
            events.push(TreeEvent::NodeChanged(p));
        }
        self.dispatch(&events);
        Ok(())
    }

    /// Drop every node and tell observers to forget cached rows.
    pub fn clear(&mut self) {
        self.store.clear();
        self.visible.clear();
        log::debug!("tree cleared");
        self.dispatch(&[TreeEvent::Invalidated]);
    }

    // --- expansion ---

    /// Show the direct children of `id`, right after it and in sibling order.
    ///
    /// Deeper descendants stay hidden. If `id` itself is hidden, its
    /// collapsed ancestors are expanded first.
    pub fn expand_direct_children(&mut self, id: Id) -> Result<Expansion, TreeError<Id>> {
        let info = self.store.info(id)?;
        if !info.has_children {
            return Ok(not_expandable(id));
        }
        if info.expanded {
            return Ok(Expansion::Unchanged);
        }
        let top = self.open_ancestors(id);
        self.store.set_expanded(id, true)?;
        self.apply_refill(top);
        Ok(Expansion::Changed)
    }

    /// Expand `id` and every descendant that has children.
    pub fn expand_everything_below(&mut self, id: Id) -> Result<Expansion, TreeError<Id>> {
        let info = self.store.info(id)?;
        if !info.has_children {
            return Ok(not_expandable(id));
        }
        let targets: Vec<Id> = iter::once(id)
            .chain(self.store.descendants(id))
            .filter(|&n| !self.store.children_of(n).is_empty() && !self.store.is_expanded(n))
            .collect();
        if targets.is_empty() {
            return Ok(Expansion::Unchanged);
        }
        let top = self.open_ancestors(id);
        for n in targets {
            self.store.set_expanded(n, true)?;
        }
        self.apply_refill(top);
        Ok(Expansion::Changed)
    }

    /// Hide every descendant of `id`.
    ///
    /// The removed rows are the contiguous run right after `id`; expanded
    /// descendants are collapsed along with it.
    pub fn collapse_children(&mut self, id: Id) -> Result<Expansion, TreeError<Id>> {
        let info = self.store.info(id)?;
        if !info.has_children {
            return Ok(not_expandable(id));
        }
        if !info.expanded {
            return Ok(Expansion::Unchanged);
        }
        let Some(pos) = self.visible.index_of(id) else {
            // Expanded nodes are always visible.
            self.store.collapse_subtree(id);
            return Ok(Expansion::Changed);
        };
        let end = self.visible.subtree_end(pos, &self.store);
        for &below in &self.visible.as_slice()[pos + 1..end] {
            self.store.clear_expanded(below);
        }
        self.store.clear_expanded(id);
        let splice = self.visible.splice(pos + 1, end - pos - 1, iter::empty());
        self.dispatch(&[TreeEvent::Structural(splice)]);
        Ok(Expansion::Changed)
    }

    /// Expand (`true`) or collapse (`false`) `id`.
    ///
    /// Same as [`expand_direct_children`](Self::expand_direct_children) or
    /// [`collapse_children`](Self::collapse_children).
    pub fn set_expanded(&mut self, id: Id, expanded: bool) -> Result<Expansion, TreeError<Id>> {
        if expanded {
            self.expand_direct_children(id)
        } else {
            self.collapse_children(id)
        }
    }

    /// Collapse `id` if it is expanded, expand its direct children otherwise.
    pub fn toggle(&mut self, id: Id) -> Result<Expansion, TreeError<Id>> {
        let info = self.store.info(id)?;
        if !info.has_children {
            return Ok(not_expandable(id));
        }
        if info.expanded {
            self.collapse_children(id)
        } else {
            self.expand_direct_children(id)
        }
    }

    /// Make `id` visible by expanding its collapsed ancestors.
    pub fn reveal(&mut self, id: Id) -> Result<Expansion, TreeError<Id>> {
        if !self.store.contains(id) {
            return Err(TreeError::UnknownId(id));
        }
        if self.visible.contains(id) {
            return Ok(Expansion::Unchanged);
        }
        let top = self.open_ancestors(id);
        self.apply_refill(top);
        Ok(Expansion::Changed)
    }

    /// Expand every node that has children.
    pub fn expand_all(&mut self) -> Expansion {
        let targets: Vec<Id> = self
            .store
            .ids()
            .filter(|&n| !self.store.children_of(n).is_empty() && !self.store.is_expanded(n))
            .collect();
        if targets.is_empty() {
            return Expansion::Unchanged;
        }
        for n in targets {
            let _ = self.store.set_expanded(n, true);
        }
        self.replace_all();
        Expansion::Changed
    }

    /// Collapse every node; only roots stay visible.
    pub fn collapse_all(&mut self) -> Expansion {
        let targets: Vec<Id> = self
            .store
            .ids()
            .filter(|&n| self.store.is_expanded(n))
            .collect();
        if targets.is_empty() {
            return Expansion::Unchanged;
        }
        for n in targets {
            self.store.clear_expanded(n);
        }
        self.replace_all();
        Expansion::Changed
    }

    // --- observers ---

    /// Notify observers without a structural change.
    ///
    /// For hosts that changed row content outside this API.
    pub fn refresh(&mut self) {
        self.dispatch(&[TreeEvent::Refreshed]);
    }

    /// Register an observer for every kind of change.
    pub fn subscribe<O>(&mut self, observer: O) -> ObserverHandle
    where
        O: TreeObserver<Id> + 'static,
    {
        self.subscribe_filtered(ChangeKinds::all(), observer)
    }

    /// Register an observer for the given kinds of change only.
    pub fn subscribe_filtered<O>(&mut self, kinds: ChangeKinds, observer: O) -> ObserverHandle
    where
        O: TreeObserver<Id> + 'static,
    {
        self.observers.subscribe(kinds, Box::new(observer))
    }

    /// Register a closure observer.
    ///
    /// Same as [`TreeStateManager::subscribe`], but lets the compiler infer
    /// the closure's argument types.
    pub fn subscribe_fn<F>(&mut self, f: F) -> ObserverHandle
    where
        F: FnMut(&TreeView<'_, Id>, &TreeEvent<Id>) + 'static,
    {
        self.subscribe(f)
    }

    /// Remove a subscription. Unknown or stale handles are ignored.
    ///
    /// Returns `true` if an observer was removed.
    pub fn unsubscribe(&mut self, handle: ObserverHandle) -> bool {
        self.observers.unsubscribe(handle)
    }

    /// Returns `true` if `handle` refers to a live subscription.
    pub fn is_subscribed(&self, handle: ObserverHandle) -> bool {
        self.observers.is_subscribed(handle)
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // --- internals ---

    fn dispatch(&mut self, events: &[TreeEvent<Id>]) {
        if events.is_empty() {
            return;
        }
        let view = TreeView {
            store: &self.store,
            visible: &self.visible,
        };
        for event in events {
            self.observers.notify(&view, event);
        }
    }

    /// Expand every collapsed ancestor of `id`, top-down.
    ///
    /// Returns the topmost node whose visible block changed: the highest
    /// ancestor that was collapsed, or `id` itself when it was visible.
    fn open_ancestors(&mut self, id: Id) -> Id {
        let mut top = id;
        let mut current = self.store.parent_of(id);
        while let Some(p) = current {
            if !self.store.is_expanded(p) {
                let _ = self.store.set_expanded(p, true);
                top = p;
            }
            current = self.store.parent_of(p);
        }
        top
    }

    /// Replace the visible block below the visible node `id` with what the
    /// store says it should be now.
    fn refill(&mut self, id: Id) -> Option<Splice> {
        let pos = self.visible.index_of(id)?;
        let end = self.visible.subtree_end(pos, &self.store);
        let block = visible_below(&self.store, id);
        Some(self.visible.splice(pos + 1, end - pos - 1, block))
    }

    fn apply_refill(&mut self, top: Id) {
        if let Some(splice) = self.refill(top) {
            self.dispatch(&[TreeEvent::Structural(splice)]);
        }
    }

    /// Insert the block of a node whose parent is expanded (or which is a root).
    fn show_subtree(&mut self, id: Id) -> Splice {
        let at = match self.store.prev_sibling(id) {
            Some(prev) => self
                .visible
                .index_of(prev)
                .map(|i| self.visible.subtree_end(i, &self.store)),
            None => match self.store.parent_of(id) {
                Some(parent) => self.visible.index_of(parent).map(|i| i + 1),
                None => Some(0),
            },
        };
        debug_assert!(at.is_some(), "neighbors of a shown node are visible");
        let at = at.unwrap_or(self.visible.len());
        let mut block = Vec::with_capacity(1);
        block.push(id);
        block.extend(visible_below(&self.store, id));
        self.visible.splice(at, 0, block)
    }

    fn replace_all(&mut self) {
        let removed = self.visible.len();
        self.visible.rebuild(&self.store);
        let splice = Splice {
            start: 0,
            removed,
            inserted: self.visible.len(),
        };
        self.dispatch(&[TreeEvent::Structural(splice)]);
    }
}

fn not_expandable<Id: TreeId>(id: Id) -> Expansion {
    log::debug!("node {id:?} has no children; ignoring expand/collapse request");
    Expansion::NotExpandable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::full_sequence;
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    /// `A(B(D), C)`, all collapsed.
    fn abcd() -> TreeStateManager<char> {
        let mut tree = TreeStateManager::new();
        tree.insert(None, 'A', None).unwrap();
        tree.insert(Some('A'), 'B', None).unwrap();
        tree.insert(Some('A'), 'C', None).unwrap();
        tree.insert(Some('B'), 'D', None).unwrap();
        tree
    }

    fn all_ids<Id: TreeId>(store: &NodeStore<Id>) -> Vec<Id> {
        let mut out = Vec::new();
        for &root in store.roots() {
            out.push(root);
            out.extend(store.descendants(root));
        }
        out
    }

    /// Checks the incremental state against a from-scratch computation.
    fn assert_consistent<Id: TreeId>(tree: &TreeStateManager<Id>) {
        let store = tree.store();
        assert_eq!(
            tree.visible_list(),
            full_sequence(store).as_slice(),
            "incremental sequence diverged from pre-order"
        );
        assert_eq!(tree.visible_count(), tree.visible_list().len());
        for (i, &id) in tree.visible_list().iter().enumerate() {
            assert_eq!(tree.index_of(id), Some(i), "stale position for {id:?}");
        }
        let ids = all_ids(store);
        assert_eq!(ids.len(), store.len());
        for id in ids {
            let info = store.info(id).unwrap();
            if info.expanded {
                assert!(info.visible, "expanded node {id:?} must be visible");
                assert!(info.has_children, "expanded node {id:?} must have children");
            }
            assert_eq!(info.visible, tree.is_visible(id), "visibility of {id:?}");
            let expected = info.parent.map_or(0, |p| store.level(p).unwrap() + 1);
            assert_eq!(info.level, expected, "level of {id:?}");
        }
    }

    type Log<Id> = Rc<RefCell<Vec<TreeEvent<Id>>>>;

    fn record<Id: TreeId + 'static>(tree: &mut TreeStateManager<Id>) -> (ObserverHandle, Log<Id>) {
        let log: Log<Id> = Rc::default();
        let sink = Rc::clone(&log);
        let handle = tree.subscribe_fn(move |_, event| sink.borrow_mut().push(*event));
        (handle, log)
    }

    #[test]
    fn expand_then_collapse_scenario() {
        let mut tree = abcd();
        assert_eq!(tree.visible_list(), &['A']);

        assert_eq!(tree.expand_direct_children('A'), Ok(Expansion::Changed));
        assert_eq!(tree.visible_list(), &['A', 'B', 'C']);
        assert_eq!(tree.expand_direct_children('A'), Ok(Expansion::Unchanged));

        assert_eq!(tree.expand_direct_children('B'), Ok(Expansion::Changed));
        assert_eq!(tree.visible_list(), &['A', 'B', 'D', 'C']);

        assert_eq!(tree.collapse_children('B'), Ok(Expansion::Changed));
        assert_eq!(tree.visible_list(), &['A', 'B', 'C']);
        assert_consistent(&tree);
    }

    #[test]
    fn expanding_a_leaf_is_reported_not_raised() {
        let mut tree = abcd();
        tree.expand_direct_children('A').unwrap();
        let (_, log) = record(&mut tree);
        let before = tree.visible_list().to_vec();
        assert_eq!(tree.expand_direct_children('C'), Ok(Expansion::NotExpandable));
        assert_eq!(tree.collapse_children('C'), Ok(Expansion::NotExpandable));
        assert_eq!(tree.toggle('C'), Ok(Expansion::NotExpandable));
        assert_eq!(tree.visible_list(), before.as_slice());
        assert!(log.borrow().is_empty(), "no-ops must not notify");
    }

    #[test]
    fn unknown_ids_are_hard_errors() {
        let mut tree = abcd();
        assert_eq!(tree.expand_direct_children('Z'), Err(TreeError::UnknownId('Z')));
        assert_eq!(tree.collapse_children('Z'), Err(TreeError::UnknownId('Z')));
        assert_eq!(tree.node_info('Z'), Err(TreeError::UnknownId('Z')));
        assert_eq!(tree.remove('Z'), Err(TreeError::UnknownId('Z')));
        assert_eq!(tree.insert(None, 'A', None), Err(TreeError::DuplicateId('A')));
        assert_eq!(
            tree.insert(Some('Z'), 'E', None),
            Err(TreeError::UnknownParent('Z'))
        );
    }

    #[test]
    fn expand_shows_direct_children_only() {
        let mut tree = abcd();
        tree.expand_everything_below('A').unwrap();
        tree.collapse_children('A').unwrap();
        tree.expand_direct_children('A').unwrap();
        // B was collapsed along with A, so D stays hidden.
        assert_eq!(tree.visible_list(), &['A', 'B', 'C']);
        assert!(!tree.node_info('B').unwrap().expanded);
        assert_consistent(&tree);
    }

    #[test]
    fn collapse_removes_contiguous_block() {
        let mut tree = TreeStateManager::new();
        tree.insert(None, 0, None).unwrap();
        for (parent, id) in [(0, 1), (1, 2), (2, 3), (1, 4), (0, 5)] {
            tree.insert(Some(parent), id, None).unwrap();
        }
        tree.insert(None, 6, None).unwrap();
        tree.expand_all();
        assert_eq!(tree.visible_list(), &[0, 1, 2, 3, 4, 5, 6]);

        let (_, log) = record(&mut tree);
        let before = tree.visible_list().to_vec();
        let pos = tree.index_of(1).unwrap();
        tree.collapse_children(1).unwrap();

        let events = log.borrow();
        assert_eq!(events.len(), 1);
        let TreeEvent::Structural(splice) = events[0] else {
            panic!("expected a structural event, got {:?}", events[0]);
        };
        assert_eq!(splice.start, pos + 1);
        assert_eq!(&before[splice.start..splice.start + splice.removed], &[2, 3, 4]);
        assert_eq!(splice.inserted, 0);
        assert_eq!(tree.visible_list(), &[0, 1, 5, 6]);
        assert_consistent(&tree);
    }

    #[test]
    fn set_expanded_dispatches_both_ways() {
        let mut tree = abcd();
        assert_eq!(tree.set_expanded('A', true), Ok(Expansion::Changed));
        assert_eq!(tree.visible_list(), &['A', 'B', 'C']);
        assert_eq!(tree.set_expanded('A', false), Ok(Expansion::Changed));
        assert_eq!(tree.visible_list(), &['A']);
        assert_eq!(tree.set_expanded('D', true), Ok(Expansion::NotExpandable));
    }

    #[test]
    fn collapse_is_idempotent_and_expand_round_trips() {
        let mut tree = abcd();
        tree.expand_direct_children('A').unwrap();
        let before = tree.visible_list().to_vec();
        tree.expand_direct_children('B').unwrap();
        tree.collapse_children('B').unwrap();
        assert_eq!(tree.visible_list(), before.as_slice());
        assert_eq!(tree.collapse_children('B'), Ok(Expansion::Unchanged));
        assert_eq!(tree.visible_list(), before.as_slice());
    }

    #[test]
    fn remove_drops_subtree_from_store_and_view() {
        let mut tree = abcd();
        tree.expand_everything_below('A').unwrap();
        assert_eq!(tree.visible_list(), &['A', 'B', 'D', 'C']);
        let removed = tree.remove('B').unwrap();
        assert_eq!(removed, vec!['B', 'D']);
        assert!(!tree.contains('B'));
        assert!(!tree.contains('D'));
        assert_eq!(tree.visible_list(), &['A', 'C']);
        assert_consistent(&tree);
    }

    #[test]
    fn removing_last_child_turns_parent_into_leaf() {
        let mut tree = abcd();
        tree.expand_everything_below('A').unwrap();
        let (_, log) = record(&mut tree);
        tree.remove('D').unwrap();
        let info = tree.node_info('B').unwrap();
        assert!(!info.has_children);
        assert!(!info.expanded);
        assert_eq!(
            log.borrow().as_slice(),
            &[
                TreeEvent::Structural(Splice {
                    start: 2,
                    removed: 1,
                    inserted: 0
                }),
                TreeEvent::NodeChanged('B'),
            ]
        );
    }

    #[test]
    fn insert_lands_after_visible_subtree_of_sibling() {
        let mut tree = abcd();
        tree.expand_everything_below('A').unwrap();
        tree.insert(Some('A'), 'E', Some('B')).unwrap();
        assert_eq!(tree.visible_list(), &['A', 'B', 'D', 'E', 'C']);
        tree.insert_at(Some('A'), 'F', InsertPosition::First).unwrap();
        assert_eq!(tree.visible_list(), &['A', 'F', 'B', 'D', 'E', 'C']);
        tree.insert(None, 'R', None).unwrap();
        assert_eq!(tree.visible_list().last(), Some(&'R'));
        tree.insert_at(None, 'S', InsertPosition::Before('A')).unwrap();
        assert_eq!(tree.visible_list().first(), Some(&'S'));
        assert_consistent(&tree);
    }

    #[test]
    fn insert_under_collapsed_parent_stays_hidden() {
        let mut tree = abcd();
        tree.expand_direct_children('A').unwrap();
        let (_, log) = record(&mut tree);
        tree.insert(Some('C'), 'x', None).unwrap();
        assert!(!tree.is_visible('x'));
        assert_eq!(log.borrow().as_slice(), &[TreeEvent::NodeChanged('C')]);
        assert!(tree.node_info('C').unwrap().has_children);
        assert_consistent(&tree);
    }

    #[test]
    fn expand_on_insert_opens_visible_parent() {
        let mut tree = TreeStateManager::with_options(TreeOptions {
            expand_on_insert: true,
        });
        tree.insert(None, 'A', None).unwrap();
        tree.insert(Some('A'), 'B', None).unwrap();
        tree.insert(Some('A'), 'C', None).unwrap();
        assert_eq!(tree.visible_list(), &['A', 'B', 'C']);
        assert!(tree.node_info('A').unwrap().expanded);
        assert_consistent(&tree);
    }

    #[test]
    fn expanding_hidden_node_opens_ancestors() {
        let mut tree = abcd();
        assert_eq!(tree.expand_direct_children('B'), Ok(Expansion::Changed));
        assert_eq!(tree.visible_list(), &['A', 'B', 'D', 'C']);
        assert_consistent(&tree);
    }

    #[test]
    fn reveal_makes_deep_node_visible() {
        let mut tree = abcd();
        assert_eq!(tree.reveal('D'), Ok(Expansion::Changed));
        assert!(tree.is_visible('D'));
        assert_eq!(tree.reveal('D'), Ok(Expansion::Unchanged));
        assert_eq!(tree.reveal('Q'), Err(TreeError::UnknownId('Q')));
        assert_consistent(&tree);
    }

    #[test]
    fn expand_all_and_collapse_all() {
        let mut tree = abcd();
        tree.insert(None, 'E', None).unwrap();
        assert_eq!(tree.expand_all(), Expansion::Changed);
        assert_eq!(tree.visible_list(), &['A', 'B', 'D', 'C', 'E']);
        assert_eq!(tree.expand_all(), Expansion::Unchanged);
        assert_eq!(tree.collapse_all(), Expansion::Changed);
        assert_eq!(tree.visible_list(), &['A', 'E']);
        assert_eq!(tree.collapse_all(), Expansion::Unchanged);
        assert_consistent(&tree);
    }

    #[test]
    fn reparent_moves_visible_block() {
        let mut tree = abcd();
        tree.insert(None, 'E', None).unwrap();
        tree.insert(Some('E'), 'F', None).unwrap();
        tree.expand_all();
        assert_eq!(tree.visible_list(), &['A', 'B', 'D', 'C', 'E', 'F']);

        tree.reparent('B', Some('E'), InsertPosition::Last).unwrap();
        assert_eq!(tree.visible_list(), &['A', 'C', 'E', 'F', 'B', 'D']);
        assert_eq!(tree.node_info('D').unwrap().level, 2);
        assert_consistent(&tree);
    }

    #[test]
    fn reparent_under_collapsed_parent_hides_and_collapses() {
        let mut tree = abcd();
        tree.insert(None, 'E', None).unwrap();
        tree.expand_everything_below('A').unwrap();
        let (_, log) = record(&mut tree);

        tree.reparent('B', Some('C'), InsertPosition::Last).unwrap();
        assert_eq!(tree.visible_list(), &['A', 'C', 'E']);
        assert!(!tree.node_info('B').unwrap().expanded);
        assert!(log.borrow().contains(&TreeEvent::NodeChanged('C')));
        assert_consistent(&tree);
    }

    #[test]
    fn reparent_rejects_cycles_without_side_effects() {
        let mut tree = abcd();
        tree.expand_all();
        let before = tree.visible_list().to_vec();
        assert_eq!(
            tree.reparent('A', Some('D'), InsertPosition::Last),
            Err(TreeError::CyclicInsertion {
                id: 'A',
                parent: 'D'
            })
        );
        assert_eq!(tree.visible_list(), before.as_slice());
        assert_consistent(&tree);
    }

    #[test]
    fn observers_see_post_mutation_state() {
        let mut tree = abcd();
        let seen: Rc<RefCell<Vec<(usize, Vec<char>)>>> = Rc::default();
        let sink = Rc::clone(&seen);
        tree.subscribe_fn(move |view, _| {
            sink.borrow_mut()
                .push((view.visible_count(), view.visible_list().to_vec()));
        });
        tree.expand_direct_children('A').unwrap();
        tree.expand_direct_children('B').unwrap();
        assert_eq!(
            seen.borrow().as_slice(),
            &[
                (3, vec!['A', 'B', 'C']),
                (4, vec!['A', 'B', 'D', 'C']),
            ]
        );
    }

    #[test]
    fn refresh_and_clear_signals() {
        let mut tree = abcd();
        let (_, log) = record(&mut tree);
        tree.refresh();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.visible_count(), 0);
        assert_eq!(
            log.borrow().as_slice(),
            &[TreeEvent::Refreshed, TreeEvent::Invalidated]
        );
    }

    #[test]
    fn filtered_subscription_skips_other_kinds() {
        let mut tree = abcd();
        let log: Log<char> = Rc::default();
        let sink = Rc::clone(&log);
        tree.subscribe_filtered(
            ChangeKinds::REFRESH | ChangeKinds::INVALIDATE,
            move |_: &TreeView<'_, char>, event: &TreeEvent<char>| sink.borrow_mut().push(*event),
        );
        tree.expand_direct_children('A').unwrap();
        tree.refresh();
        assert_eq!(log.borrow().as_slice(), &[TreeEvent::Refreshed]);
    }

    #[test]
    fn unsubscribe_is_safe_for_unknown_and_stale_handles() {
        let mut tree = abcd();
        let (first, first_log) = record(&mut tree);
        assert!(tree.unsubscribe(first));
        assert!(!tree.unsubscribe(first), "second unsubscribe is a no-op");

        // The freed slot is reused; the stale handle must not reach the new observer.
        let (second, second_log) = record(&mut tree);
        assert_ne!(first, second);
        assert!(!tree.unsubscribe(first));
        assert!(tree.is_subscribed(second));
        assert_eq!(tree.observer_count(), 1);

        tree.refresh();
        assert!(first_log.borrow().is_empty());
        assert_eq!(second_log.borrow().as_slice(), &[TreeEvent::Refreshed]);
    }

    #[test]
    fn multiple_observers_all_notified() {
        let mut tree = abcd();
        let (_, a) = record(&mut tree);
        let (_, b) = record(&mut tree);
        tree.toggle('A').unwrap();
        tree.toggle('A').unwrap();
        assert_eq!(a.borrow().len(), 2);
        assert_eq!(*a.borrow(), *b.borrow());
        assert_eq!(tree.visible_list(), &['A']);
    }

    #[test]
    fn hierarchy_description_lists_path_from_root() {
        let tree = abcd();
        assert_eq!(tree.hierarchy_description('A').unwrap(), "'A'");
        assert_eq!(tree.hierarchy_description('C').unwrap(), "'A' > 'C'");
        assert_eq!(tree.hierarchy_description('D').unwrap(), "'A' > 'B' > 'D'");
        assert_eq!(tree.hierarchy_description('Q'), Err(TreeError::UnknownId('Q')));
    }

    /// Small deterministic generator; keeps the test free of extra dependencies.
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }

        fn below(&mut self, n: usize) -> usize {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "Test helper; the modulus keeps the value small."
            )]
            let v = (self.next() % n as u64) as usize;
            v
        }

        fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
            if items.is_empty() {
                None
            } else {
                Some(items[self.below(items.len())])
            }
        }
    }

    #[test]
    fn random_operations_match_full_recomputation() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        let mut tree: TreeStateManager<u32> = TreeStateManager::new();
        let mut next_id = 0_u32;

        for _ in 0..3000 {
            let ids = all_ids(tree.store());
            match rng.below(9) {
                0..=2 => {
                    let parent = if rng.below(4) == 0 { None } else { rng.pick(&ids) };
                    let siblings = match parent {
                        Some(p) => tree.store().children_of(p).to_vec(),
                        None => tree.store().roots().to_vec(),
                    };
                    let position = match (rng.below(3), rng.pick(&siblings)) {
                        (0, _) => InsertPosition::First,
                        (1, Some(s)) => InsertPosition::After(s),
                        (2, Some(s)) => InsertPosition::Before(s),
                        _ => InsertPosition::Last,
                    };
                    tree.insert_at(parent, next_id, position).unwrap();
                    next_id += 1;
                }
                3 => {
                    let Some(id) = rng.pick(&ids) else { continue };
                    let was_visible = tree.is_visible(id);
                    if tree.expand_direct_children(id).unwrap().is_changed() && was_visible {
                        let pos = tree.index_of(id).unwrap();
                        let children = tree.store().children_of(id);
                        let shown = &tree.visible_list()[pos + 1..pos + 1 + children.len()];
                        assert_eq!(shown, children, "direct children follow the node");
                    }
                }
                4 => {
                    let Some(id) = rng.pick(&ids) else { continue };
                    let before = tree.visible_list().to_vec();
                    let pos = tree.index_of(id);
                    if tree.collapse_children(id).unwrap().is_changed()
                        && let Some(pos) = pos
                    {
                        let removed = before.len() - tree.visible_count();
                        let block = &before[pos + 1..pos + 1 + removed];
                        let below: Vec<u32> = tree.store().descendants(id).collect();
                        assert!(block.iter().all(|b| below.contains(b)));
                        assert_eq!(&before[..=pos], &tree.visible_list()[..=pos]);
                        assert_eq!(&before[pos + 1 + removed..], &tree.visible_list()[pos + 1..]);
                    }
                }
                5 => {
                    let Some(id) = rng.pick(&ids) else { continue };
                    tree.toggle(id).unwrap();
                }
                6 => {
                    if rng.below(3) == 0
                        && let Some(id) = rng.pick(&ids)
                    {
                        let removed = tree.remove(id).unwrap();
                        assert!(removed.iter().all(|r| !tree.contains(*r)));
                    }
                }
                7 => {
                    let Some(id) = rng.pick(&ids) else { continue };
                    let parent = if rng.below(4) == 0 { None } else { rng.pick(&ids) };
                    match tree.reparent(id, parent, InsertPosition::Last) {
                        Ok(()) | Err(TreeError::CyclicInsertion { .. }) => {}
                        Err(e) => panic!("unexpected error {e:?}"),
                    }
                }
                _ => {
                    let Some(id) = rng.pick(&ids) else { continue };
                    tree.expand_everything_below(id).unwrap();
                }
            }
            assert_consistent(&tree);
        }
    }
}
