// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building a tree from a flat, level-annotated listing.

use alloc::vec::Vec;

use crate::error::TreeError;
use crate::manager::{TreeOptions, TreeStateManager};
use crate::types::TreeId;

/// Incremental builder for outlines given in pre-order with levels.
///
/// Each node's parent is the most recent node one level up, which is how
/// outlines, indented files, and table-of-contents data usually arrive.
///
/// ```rust
/// use understory_tree_state::TreeBuilder;
///
/// let mut builder = TreeBuilder::new();
/// builder
///     .sequentially_add(1, 0)?
///     .sequentially_add(2, 1)?
///     .sequentially_add(3, 2)?
///     .sequentially_add(4, 1)?
///     .sequentially_add(5, 0)?;
/// let mut tree = builder.build();
///
/// assert_eq!(tree.store().children_of(1), &[2, 4]);
/// tree.expand_all();
/// assert_eq!(tree.visible_list(), &[1, 2, 3, 4, 5]);
/// # Ok::<(), understory_tree_state::TreeError<i32>>(())
/// ```
#[derive(Debug)]
pub struct TreeBuilder<Id> {
    tree: TreeStateManager<Id>,
    /// Ancestor chain of the last added node; `path[level]` is the node at `level`.
    path: Vec<Id>,
}

impl<Id: TreeId> Default for TreeBuilder<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: TreeId> TreeBuilder<Id> {
    /// Start an empty tree with default options.
    pub fn new() -> Self {
        Self::with_options(TreeOptions::default())
    }

    /// Start an empty tree with the given options.
    pub fn with_options(options: TreeOptions) -> Self {
        Self {
            tree: TreeStateManager::with_options(options),
            path: Vec::new(),
        }
    }

    /// Append `id` at `level`, under the most recent node at `level - 1`.
    ///
    /// The first node must be at level 0, and no node may be more than one
    /// level deeper than the node before it.
    pub fn sequentially_add(&mut self, id: Id, level: usize) -> Result<&mut Self, TreeError<Id>> {
        let max = self.path.len();
        if level > max {
            return Err(TreeError::LevelJump { id, level, max });
        }
        let parent = level.checked_sub(1).and_then(|l| self.path.get(l).copied());
        self.tree.insert(parent, id, None)?;
        self.path.truncate(level);
        self.path.push(id);
        Ok(self)
    }

    /// Attach `child` as the last child of `parent` (or as a root).
    ///
    /// Subsequent [`sequentially_add`](Self::sequentially_add) calls continue
    /// from `child`.
    pub fn add_relation(&mut self, parent: Option<Id>, child: Id) -> Result<&mut Self, TreeError<Id>> {
        self.tree.insert(parent, child, None)?;
        self.path.clear();
        let mut current = Some(child);
        while let Some(node) = current {
            self.path.push(node);
            current = self.tree.store().parent_of(node);
        }
        self.path.reverse();
        Ok(self)
    }

    /// The tree built so far.
    pub fn tree(&self) -> &TreeStateManager<Id> {
        &self.tree
    }

    /// Drop everything added so far.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.path.clear();
    }

    /// Finish building.
    pub fn build(self) -> TreeStateManager<Id> {
        self.tree
    }
}
