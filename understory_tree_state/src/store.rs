// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node store: parent/child edges, sibling order, levels, and flags.

use alloc::vec::Vec;
use core::fmt;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::error::TreeError;
use crate::types::{Expansion, InsertPosition, NodeFlags, TreeId, TreeNodeInfo};

/// Ordered sibling list. Most nodes have a handful of children.
pub(crate) type Siblings<Id> = SmallVec<[Id; 4]>;

#[derive(Clone, Debug)]
pub(crate) struct Node<Id> {
    pub(crate) parent: Option<Id>,
    pub(crate) children: Siblings<Id>,
    pub(crate) level: usize,
    pub(crate) flags: NodeFlags,
}

impl<Id> Node<Id> {
    fn new(parent: Option<Id>, level: usize) -> Self {
        Self {
            parent,
            children: SmallVec::new(),
            level,
            flags: NodeFlags::empty(),
        }
    }

    pub(crate) fn is_expanded(&self) -> bool {
        self.flags.contains(NodeFlags::EXPANDED)
    }
}

/// Structural storage for the tree.
///
/// The store is read-only outside this crate: every mutation goes through
/// [`TreeStateManager`](crate::TreeStateManager) so that the visible sequence
/// and observers stay in sync with it. Lookups by id are O(1); child lists are
/// kept in sibling order.
///
/// The store relies on one invariant maintained by the manager: the
/// [`NodeFlags::EXPANDED`] bit is only set on visible nodes. That makes
/// [`NodeStore::is_visible`] a parent-flag check instead of an ancestor walk.
#[derive(Clone)]
pub struct NodeStore<Id> {
    nodes: HashMap<Id, Node<Id>>,
    roots: Siblings<Id>,
}

impl<Id> fmt::Debug for NodeStore<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("nodes", &self.nodes.len())
            .field("roots", &self.roots.len())
            .finish_non_exhaustive()
    }
}

impl<Id: TreeId> NodeStore<Id> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            roots: SmallVec::new(),
        }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if `id` is in the tree.
    pub fn contains(&self, id: Id) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn get(&self, id: Id) -> Option<&Node<Id>> {
        self.nodes.get(&id)
    }

    /// All ids, in no particular order.
    pub(crate) fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.nodes.keys().copied()
    }

    /// Snapshot of a node's state.
    pub fn info(&self, id: Id) -> Result<TreeNodeInfo<Id>, TreeError<Id>> {
        let node = self.get(id).ok_or(TreeError::UnknownId(id))?;
        Ok(TreeNodeInfo {
            id,
            parent: node.parent,
            level: node.level,
            has_children: !node.children.is_empty(),
            expanded: node.is_expanded(),
            visible: self.is_visible(id),
        })
    }

    /// Returns `true` if all ancestors of `id` are expanded.
    ///
    /// Roots are always visible; unknown ids are not.
    pub fn is_visible(&self, id: Id) -> bool {
        match self.get(id) {
            None => false,
            Some(node) => match node.parent {
                None => true,
                Some(parent) => self.is_expanded(parent),
            },
        }
    }

    /// Returns `true` if `id` is in the tree and expanded.
    pub fn is_expanded(&self, id: Id) -> bool {
        self.get(id).is_some_and(Node::is_expanded)
    }

    /// Depth of `id`, or `None` if it is not in the tree.
    pub fn level(&self, id: Id) -> Option<usize> {
        self.get(id).map(|n| n.level)
    }

    /// Parent of `id`, or `None` for roots and unknown ids.
    pub fn parent_of(&self, id: Id) -> Option<Id> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of `id` in sibling order, or an empty slice for unknown ids.
    pub fn children_of(&self, id: Id) -> &[Id] {
        match self.get(id) {
            Some(node) => node.children.as_slice(),
            None => &[],
        }
    }

    /// Root nodes in order.
    pub fn roots(&self) -> &[Id] {
        &self.roots
    }

    /// Position of `id` among its siblings.
    pub fn sibling_position(&self, id: Id) -> Option<usize> {
        let node = self.get(id)?;
        self.siblings(node.parent)?.iter().position(|&s| s == id)
    }

    /// The sibling right after `id`, if any.
    pub fn next_sibling(&self, id: Id) -> Option<Id> {
        let pos = self.sibling_position(id)?;
        self.siblings(self.parent_of(id))?.get(pos + 1).copied()
    }

    /// The sibling right before `id`, if any.
    pub fn prev_sibling(&self, id: Id) -> Option<Id> {
        let pos = self.sibling_position(id)?.checked_sub(1)?;
        self.siblings(self.parent_of(id))?.get(pos).copied()
    }

    /// Iterate all descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        let mut stack: Vec<Id> = self.children_of(id).iter().rev().copied().collect();
        core::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(self.children_of(next).iter().rev().copied());
            Some(next)
        })
    }

    /// Next node in a full pre-order traversal, ignoring expansion state.
    ///
    /// Returns `None` at the end of the tree or for unknown ids.
    pub fn next_depth_first(&self, current: Id) -> Option<Id> {
        if let Some(&first_child) = self.children_of(current).first() {
            return Some(first_child);
        }
        let mut node = current;
        loop {
            if let Some(next) = self.next_sibling(node) {
                return Some(next);
            }
            node = self.parent_of(node)?;
        }
    }

    /// Previous node in a full pre-order traversal, ignoring expansion state.
    pub fn prev_depth_first(&self, current: Id) -> Option<Id> {
        if !self.contains(current) {
            return None;
        }
        match self.prev_sibling(current) {
            Some(prev) => Some(self.last_in_subtree(prev)),
            None => self.parent_of(current),
        }
    }

    fn last_in_subtree(&self, mut node: Id) -> Id {
        while let Some(&last) = self.children_of(node).last() {
            node = last;
        }
        node
    }

    fn siblings(&self, parent: Option<Id>) -> Option<&Siblings<Id>> {
        match parent {
            None => Some(&self.roots),
            Some(p) => self.get(p).map(|n| &n.children),
        }
    }

    fn siblings_mut(&mut self, parent: Option<Id>) -> Option<&mut Siblings<Id>> {
        match parent {
            None => Some(&mut self.roots),
            Some(p) => self.nodes.get_mut(&p).map(|n| &mut n.children),
        }
    }

    /// Index in `parent`'s child list where a node placed at `position` lands.
    fn slot_for(
        &self,
        parent: Option<Id>,
        position: &InsertPosition<Id>,
    ) -> Result<usize, TreeError<Id>> {
        let siblings = match parent {
            None => &self.roots,
            Some(p) => &self.get(p).ok_or(TreeError::UnknownParent(p))?.children,
        };
        let find = |sibling: Id| {
            siblings
                .iter()
                .position(|&s| s == sibling)
                .ok_or_else(|| {
                    if self.contains(sibling) {
                        TreeError::NotAChild { parent, sibling }
                    } else {
                        TreeError::UnknownId(sibling)
                    }
                })
        };
        match *position {
            InsertPosition::First => Ok(0),
            InsertPosition::Last => Ok(siblings.len()),
            InsertPosition::After(sibling) => find(sibling).map(|i| i + 1),
            InsertPosition::Before(sibling) => find(sibling),
        }
    }

    /// Add a new node under `parent` (or as a root).
    pub(crate) fn insert_at(
        &mut self,
        parent: Option<Id>,
        id: Id,
        position: InsertPosition<Id>,
    ) -> Result<(), TreeError<Id>> {
        if self.contains(id) {
            return Err(TreeError::DuplicateId(id));
        }
        let level = match parent {
            Some(p) => self.get(p).ok_or(TreeError::UnknownParent(p))?.level + 1,
            None => 0,
        };
        let slot = self.slot_for(parent, &position)?;
        self.nodes.insert(id, Node::new(parent, level));
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.insert(slot, id);
        }
        Ok(())
    }

    /// Delete `id` and its subtree, returning the removed ids in pre-order.
    pub(crate) fn remove(&mut self, id: Id) -> Result<Vec<Id>, TreeError<Id>> {
        let parent = self.get(id).ok_or(TreeError::UnknownId(id))?.parent;
        let mut removed = Vec::with_capacity(1);
        removed.push(id);
        removed.extend(self.descendants(id));
        self.unlink(id, parent);
        for r in &removed {
            self.nodes.remove(r);
        }
        if let Some(p) = parent {
            self.settle_leaf(p);
        }
        Ok(removed)
    }

    /// Set or clear the expanded bit.
    ///
    /// Childless nodes report [`Expansion::NotExpandable`] and are left alone.
    pub(crate) fn set_expanded(
        &mut self,
        id: Id,
        expanded: bool,
    ) -> Result<Expansion, TreeError<Id>> {
        let node = self.nodes.get_mut(&id).ok_or(TreeError::UnknownId(id))?;
        if node.children.is_empty() {
            return Ok(Expansion::NotExpandable);
        }
        if node.is_expanded() == expanded {
            return Ok(Expansion::Unchanged);
        }
        node.flags.set(NodeFlags::EXPANDED, expanded);
        Ok(Expansion::Changed)
    }

    pub(crate) fn clear_expanded(&mut self, id: Id) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.flags.remove(NodeFlags::EXPANDED);
        }
    }

    /// Clear the expanded bit on `id` and every expanded node below it.
    ///
    /// Only walks through expanded nodes, so the cost is bounded by the part
    /// of the subtree that was visible.
    pub(crate) fn collapse_subtree(&mut self, id: Id) {
        let mut stack = Vec::new();
        stack.push(id);
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.get_mut(&next) else {
                continue;
            };
            if node.is_expanded() {
                node.flags.remove(NodeFlags::EXPANDED);
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Validate a move of `id` under `new_parent` without touching the tree.
    pub(crate) fn check_move(
        &self,
        id: Id,
        new_parent: Option<Id>,
        position: &InsertPosition<Id>,
    ) -> Result<(), TreeError<Id>> {
        if !self.contains(id) {
            return Err(TreeError::UnknownId(id));
        }
        if let Some(p) = new_parent {
            if !self.contains(p) {
                return Err(TreeError::UnknownParent(p));
            }
            if self.is_ancestor_or_self(id, p) {
                return Err(TreeError::CyclicInsertion { id, parent: p });
            }
        }
        if let Some(&sibling) = position.sibling() {
            if sibling == id {
                return Err(TreeError::NotAChild {
                    parent: new_parent,
                    sibling,
                });
            }
            self.slot_for(new_parent, position)?;
        }
        Ok(())
    }

    /// Move `id` (with its subtree) under `new_parent`, recomputing levels.
    ///
    /// Expansion bits inside the moved subtree are left as they were; the
    /// caller decides whether the subtree is still visible.
    pub(crate) fn reparent(
        &mut self,
        id: Id,
        new_parent: Option<Id>,
        position: InsertPosition<Id>,
    ) -> Result<(), TreeError<Id>> {
        self.check_move(id, new_parent, &position)?;
        let old_parent = self.parent_of(id);
        self.unlink(id, old_parent);
        let slot = self.slot_for(new_parent, &position)?;
        if let Some(siblings) = self.siblings_mut(new_parent) {
            siblings.insert(slot, id);
        }
        let level = new_parent
            .and_then(|p| self.level(p))
            .map_or(0, |l| l + 1);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = new_parent;
            node.level = level;
        }
        let below: Vec<Id> = self.descendants(id).collect();
        for d in below {
            let level = self
                .parent_of(d)
                .and_then(|p| self.level(p))
                .map_or(0, |l| l + 1);
            if let Some(node) = self.nodes.get_mut(&d) {
                node.level = level;
            }
        }
        if let Some(p) = old_parent
            && old_parent != new_parent
        {
            self.settle_leaf(p);
        }
        Ok(())
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.roots.clear();
    }

    fn is_ancestor_or_self(&self, ancestor: Id, mut node: Id) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.parent_of(node) {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    fn unlink(&mut self, id: Id, parent: Option<Id>) {
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.retain(|s| *s != id);
        }
    }

    /// A node whose last child is gone becomes a leaf, and leaves are never expanded.
    fn settle_leaf(&mut self, id: Id) {
        if let Some(node) = self.nodes.get_mut(&id)
            && node.children.is_empty()
        {
            node.flags.remove(NodeFlags::EXPANDED);
        }
    }
}
