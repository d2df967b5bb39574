// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_tree_state --heading-base-level=0

//! Understory Tree State: expand/collapse state for tree-backed list views.
//!
//! A tree view is usually drawn as a flat list: each row is one node, indented
//! by its depth, and a node's children appear right below it only while it is
//! expanded. This crate owns that state and keeps the flat list in sync with
//! the tree.
//!
//! - Nodes are identified by caller-chosen, stable ids (any `Copy + Eq + Hash + Debug` type).
//!   The same id is the node's key in the tree and its row tag in the list.
//! - The visible sequence is a pre-order walk restricted to nodes whose
//!   ancestors are all expanded. It is updated incrementally: every mutation is
//!   a single contiguous [`Splice`], never a full rebuild.
//! - Observers subscribe for change events and receive a read-only
//!   [`TreeView`], so a callback that re-reads the list sees the finished state.
//!
//! This crate deliberately does **not** know about widgets, drawing, or
//! scrolling. Hosts feed [`TreeStateManager::visible_count`] into their list or
//! virtualizer, draw rows via [`TreeRows`], and use [`Splice::anchor`] to keep
//! the scroll position stable across expand and collapse.
//!
//! ## Example
//!
//! ```rust
//! use understory_tree_state::{TreeEvent, TreeStateManager};
//!
//! let mut tree = TreeStateManager::new();
//! tree.insert(None, 1_u32, None).unwrap();
//! tree.insert(Some(1), 2, None).unwrap();
//! tree.insert(Some(1), 3, None).unwrap();
//!
//! tree.subscribe_fn(|view, event| {
//!     if let TreeEvent::Structural(splice) = event {
//!         // The list is already updated when observers run.
//!         assert_eq!(view.visible_count(), 3);
//!         assert_eq!(splice.inserted, 2);
//!     }
//! });
//!
//! tree.expand_direct_children(1).unwrap();
//! assert_eq!(tree.visible_list(), &[1, 2, 3]);
//! assert_eq!(tree.index_of(3), Some(2));
//! ```
//!
//! Key operations:
//! - [`TreeStateManager::insert`] / [`TreeStateManager::insert_at`], [`TreeStateManager::remove`],
//!   [`TreeStateManager::reparent`], [`TreeStateManager::clear`].
//! - [`TreeStateManager::expand_direct_children`] and [`TreeStateManager::collapse_children`];
//!   [`TreeStateManager::toggle`], [`TreeStateManager::reveal`],
//!   [`TreeStateManager::expand_everything_below`], [`TreeStateManager::expand_all`],
//!   [`TreeStateManager::collapse_all`].
//! - [`TreeStateManager::visible_list`], [`TreeStateManager::id_at`],
//!   [`TreeStateManager::index_of`], [`TreeStateManager::node_info`].
//! - [`TreeStateManager::subscribe`] → [`ObserverHandle`]; [`TreeStateManager::unsubscribe`].
//! - [`TreeBuilder`] builds a tree from a level-annotated pre-order listing.
//!
//! Expanding a leaf is not an error: it returns [`Expansion::NotExpandable`]
//! and logs at debug level through the [`log`] facade. Misuse of ids
//! (unknown, duplicate, cyclic) returns a [`TreeError`].
//!
//! ## Examples
//!
//! - `examples/outline.rs`: builds an outline, expands and collapses it, and
//!   prints the rows along with the change events.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod builder;
mod error;
mod manager;
mod observer;
mod projector;
mod rows;
mod store;
mod types;

pub use builder::TreeBuilder;
pub use error::TreeError;
pub use manager::{TreeOptions, TreeStateManager, TreeView};
pub use observer::{ChangeKinds, ObserverHandle, TreeEvent, TreeObserver};
pub use projector::{Splice, VisibleList};
pub use rows::{ContextAction, Indicator, Row, RowOptions, TreeRows};
pub use store::NodeStore;
pub use types::{Expansion, InsertPosition, NodeFlags, TreeId, TreeNodeInfo};
