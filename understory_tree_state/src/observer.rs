// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Observer registry: change events and subscriptions.
//!
//! Observers are owned by the [`TreeStateManager`](crate::TreeStateManager)
//! and receive a read-only [`TreeView`] together with each event. Events are
//! delivered after the mutation is complete, so a callback that re-reads the
//! visible list sees the post-mutation state.
//!
//! Subscriptions are identified by generational [`ObserverHandle`]s: a stale
//! handle never unsubscribes an observer that later reused its slot, and
//! unsubscribing an unknown handle is a no-op.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::manager::TreeView;
use crate::projector::Splice;

bitflags::bitflags! {
    /// Kinds of change an observer can subscribe to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ChangeKinds: u8 {
        /// Visible entries were inserted or removed ([`TreeEvent::Structural`]).
        const STRUCTURE  = 0b0000_0001;
        /// A visible row changed in place ([`TreeEvent::NodeChanged`]).
        const CONTENT    = 0b0000_0010;
        /// [`refresh`](crate::TreeStateManager::refresh) was called.
        const REFRESH    = 0b0000_0100;
        /// All previous state is gone ([`TreeEvent::Invalidated`]).
        const INVALIDATE = 0b0000_1000;
    }
}

impl Default for ChangeKinds {
    fn default() -> Self {
        Self::all()
    }
}

/// Change notification delivered to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeEvent<Id> {
    /// The visible sequence changed by one contiguous replacement.
    ///
    /// Item identities and positions shifted. Rows adjacent to the splice
    /// (such as the node that was expanded or collapsed) should be rebound too.
    Structural(Splice),
    /// A visible node changed in place without moving, for example a leaf
    /// that gained its first child while staying collapsed.
    NodeChanged(Id),
    /// Explicit refresh request; the structure is unchanged.
    Refreshed,
    /// The tree was cleared. Drop any cached rows.
    Invalidated,
}

impl<Id> TreeEvent<Id> {
    /// The [`ChangeKinds`] bit this event belongs to.
    pub const fn kind(&self) -> ChangeKinds {
        match self {
            Self::Structural(_) => ChangeKinds::STRUCTURE,
            Self::NodeChanged(_) => ChangeKinds::CONTENT,
            Self::Refreshed => ChangeKinds::REFRESH,
            Self::Invalidated => ChangeKinds::INVALIDATE,
        }
    }
}

/// A change listener.
///
/// Closures of the form `FnMut(&TreeView<'_, Id>, &TreeEvent<Id>)` implement
/// this trait.
pub trait TreeObserver<Id> {
    /// Called once per event, after the mutation that produced it.
    fn on_event(&mut self, tree: &TreeView<'_, Id>, event: &TreeEvent<Id>);
}

impl<Id, F> TreeObserver<Id> for F
where
    F: FnMut(&TreeView<'_, Id>, &TreeEvent<Id>),
{
    fn on_event(&mut self, tree: &TreeView<'_, Id>, event: &TreeEvent<Id>) {
        self(tree, event);
    }
}

/// Handle of a subscription (generational).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObserverHandle(u32, u32);

impl ObserverHandle {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

struct Entry<Id> {
    generation: u32,
    kinds: ChangeKinds,
    observer: Box<dyn TreeObserver<Id>>,
}

/// Subscription list.
pub(crate) struct ObserverRegistry<Id> {
    slots: Vec<Option<Entry<Id>>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
}

impl<Id> fmt::Debug for ObserverRegistry<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<Id> ObserverRegistry<Id> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub(crate) fn subscribe(
        &mut self,
        kinds: ChangeKinds,
        observer: Box<dyn TreeObserver<Id>>,
    ) -> ObserverHandle {
        let idx = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(Entry {
                generation,
                kinds,
                observer,
            });
            idx
        } else {
            self.slots.push(Some(Entry {
                generation: 1,
                kinds,
                observer,
            }));
            self.generations.push(1);
            self.slots.len() - 1
        };
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ObserverHandle stores 32-bit slot indices."
        )]
        let slot = idx as u32;
        ObserverHandle(slot, self.generations[idx])
    }

    /// Returns `true` if `handle` was live and is now removed.
    pub(crate) fn unsubscribe(&mut self, handle: ObserverHandle) -> bool {
        if !self.is_subscribed(handle) {
            return false;
        }
        self.slots[handle.idx()] = None;
        self.free_list.push(handle.idx());
        true
    }

    pub(crate) fn is_subscribed(&self, handle: ObserverHandle) -> bool {
        self.slots
            .get(handle.idx())
            .and_then(|s| s.as_ref())
            .is_some_and(|e| e.generation == handle.1)
    }

    /// Deliver `event` to every observer interested in its kind, in slot order.
    pub(crate) fn notify(&mut self, tree: &TreeView<'_, Id>, event: &TreeEvent<Id>) {
        let kind = event.kind();
        for entry in self.slots.iter_mut().flatten() {
            if entry.kinds.intersects(kind) {
                entry.observer.on_event(tree, event);
            }
        }
    }
}
