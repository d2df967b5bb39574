// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types: identifiers, node flags, snapshots, and mutation outcomes.

use core::fmt::Debug;
use core::hash::Hash;

/// Identifier bound for tree nodes.
///
/// Any small, copyable, hashable key works: integers, interned symbols, or a
/// generational handle from another tree. The identifier is the node's
/// identity for its whole lifetime and is also what views use as their tag.
pub trait TreeId: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> TreeId for T {}

bitflags::bitflags! {
    /// Per-node state bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// The node's direct children are part of the visible sequence.
        ///
        /// Only ever set on visible nodes that have children.
        const EXPANDED = 0b0000_0001;
    }
}

/// Read-only snapshot of a node, computed from the store at call time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TreeNodeInfo<Id> {
    /// The node's identifier.
    pub id: Id,
    /// Parent identifier, `None` for roots.
    pub parent: Option<Id>,
    /// Depth of the node; roots are at level `0`.
    pub level: usize,
    /// Whether the node currently has at least one child.
    pub has_children: bool,
    /// Whether the node's direct children are shown.
    pub expanded: bool,
    /// Whether the node itself is part of the visible sequence.
    pub visible: bool,
}

/// Where a node lands among its siblings on insertion or re-parenting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InsertPosition<Id> {
    /// Before every existing sibling.
    First,
    /// After every existing sibling.
    #[default]
    Last,
    /// Immediately after the given sibling.
    After(Id),
    /// Immediately before the given sibling.
    Before(Id),
}

impl<Id> InsertPosition<Id> {
    /// Maps the `after_sibling` argument of [`insert`](crate::TreeStateManager::insert).
    ///
    /// `None` appends.
    pub fn after(sibling: Option<Id>) -> Self {
        match sibling {
            Some(s) => Self::After(s),
            None => Self::Last,
        }
    }

    pub(crate) fn sibling(&self) -> Option<&Id> {
        match self {
            Self::After(s) | Self::Before(s) => Some(s),
            Self::First | Self::Last => None,
        }
    }
}

/// Result of an expand or collapse request that did not hit a hard error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Expansion {
    /// The node's state and the visible sequence changed.
    Changed,
    /// The node was already in the requested state.
    Unchanged,
    /// The node has no children, so there is nothing to expand or collapse.
    NotExpandable,
}

impl Expansion {
    /// Returns `true` if the request changed the visible sequence.
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}
