// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural errors.
//!
//! Every variant here is caller misuse of the stable-identity contract.
//! Requests that are merely pointless (expanding a leaf, collapsing a
//! collapsed node) are reported through [`Expansion`](crate::Expansion)
//! instead.

use thiserror::Error;

/// Errors returned by structural operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TreeError<Id> {
    /// The operation referenced a node that is not in the tree.
    #[error("node {0:?} is not in the tree")]
    UnknownId(Id),
    /// Insertion used an identifier that is already in the tree.
    #[error("node {0:?} is already in the tree")]
    DuplicateId(Id),
    /// Insertion named a parent that is not in the tree.
    #[error("parent {0:?} is not in the tree")]
    UnknownParent(Id),
    /// Placing `id` under `parent` would make it its own ancestor.
    #[error("cannot place {id:?} under {parent:?}: {parent:?} is inside the subtree of {id:?}")]
    CyclicInsertion {
        /// The node being placed.
        id: Id,
        /// The requested parent.
        parent: Id,
    },
    /// A sibling reference does not belong to the requested parent.
    #[error("{sibling:?} is not a child of {parent:?}")]
    NotAChild {
        /// The requested parent, `None` for the root list.
        parent: Option<Id>,
        /// The sibling that was referenced.
        sibling: Id,
    },
    /// Builder input skipped a level.
    #[error("node {id:?} at level {level} skips a level (deepest allowed is {max})")]
    LevelJump {
        /// The node being added.
        id: Id,
        /// The requested level.
        level: usize,
        /// The deepest level allowed at this point.
        max: usize,
    },
}
