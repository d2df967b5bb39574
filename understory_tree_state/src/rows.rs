// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Row model: what a list view needs to draw one visible node.
//!
//! [`TreeRows`] maps display positions to [`Row`]s with an expand/collapse
//! indicator and an indentation, and routes indicator clicks and long-press
//! menus back to the [`TreeStateManager`]. It carries no drawing code; hosts
//! turn a `Row` into whatever widget they use.

use crate::error::TreeError;
use crate::manager::{TreeStateManager, TreeView};
use crate::types::{Expansion, TreeId, TreeNodeInfo};

/// Presentation switches for [`TreeRows`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RowOptions {
    /// Indentation per level, in the host's units.
    pub indent_width: u32,
    /// Whether rows show an indicator and react to toggles.
    ///
    /// When off, the list is a static outline: no indicators, no toggling,
    /// and no indicator column in the indentation.
    pub collapsible: bool,
    /// Whether long-pressing a row with children offers expand/collapse.
    pub handle_long_press: bool,
}

impl Default for RowOptions {
    fn default() -> Self {
        Self {
            indent_width: 16,
            collapsible: true,
            handle_long_press: false,
        }
    }
}

/// Expand/collapse marker drawn next to a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Indicator {
    /// Nothing to draw: a leaf, or the list is not collapsible.
    None,
    /// The node has hidden children.
    Collapsed,
    /// The node's children are shown.
    Expanded,
}

/// Action offered by a row's long-press menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextAction {
    /// Show the node's children.
    Expand,
    /// Hide the node's children.
    Collapse,
}

/// One visible row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Row<Id> {
    /// Node state at the time the row was produced.
    pub info: TreeNodeInfo<Id>,
    /// Marker to draw.
    pub indicator: Indicator,
    /// Leading indentation.
    pub indent: u32,
}

/// Adapter from a tree's visible sequence to list rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TreeRows {
    levels: usize,
    /// Presentation switches.
    pub options: RowOptions,
}

impl TreeRows {
    /// Rows for a tree at most `levels` deep, with default options.
    pub fn new(levels: usize) -> Self {
        Self::with_options(levels, RowOptions::default())
    }

    /// Rows for a tree at most `levels` deep.
    pub fn with_options(levels: usize, options: RowOptions) -> Self {
        Self { levels, options }
    }

    /// Number of distinct row kinds; one per level.
    pub fn view_type_count(&self) -> usize {
        self.levels
    }

    /// Row kind at `position`: its level.
    pub fn view_type<Id: TreeId>(&self, tree: &TreeView<'_, Id>, position: usize) -> Option<usize> {
        let id = tree.id_at(position)?;
        tree.store().level(id)
    }

    /// Number of rows.
    pub fn len<Id: TreeId>(&self, tree: &TreeView<'_, Id>) -> usize {
        tree.visible_count()
    }

    /// Returns `true` if there are no rows.
    pub fn is_empty<Id: TreeId>(&self, tree: &TreeView<'_, Id>) -> bool {
        tree.visible_count() == 0
    }

    /// Id shown at `position`. Ids double as stable row keys.
    pub fn id_at<Id: TreeId>(&self, tree: &TreeView<'_, Id>, position: usize) -> Option<Id> {
        tree.id_at(position)
    }

    /// Row shown at `position`.
    pub fn row<Id: TreeId>(&self, tree: &TreeView<'_, Id>, position: usize) -> Option<Row<Id>> {
        let info = tree.node_info(tree.id_at(position)?).ok()?;
        Some(Row {
            info,
            indicator: self.indicator(&info),
            indent: self.indent(info.level),
        })
    }

    /// Indicator for a node in the given state.
    pub fn indicator<Id>(&self, info: &TreeNodeInfo<Id>) -> Indicator {
        if !info.has_children || !self.options.collapsible {
            Indicator::None
        } else if info.expanded {
            Indicator::Expanded
        } else {
            Indicator::Collapsed
        }
    }

    /// Indentation for a row at `level`.
    ///
    /// Collapsible lists reserve one extra step for the indicator column.
    pub fn indent(&self, level: usize) -> u32 {
        let steps = level + usize::from(self.options.collapsible);
        u32::try_from(steps)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.options.indent_width)
    }

    /// Indicator click: expand or collapse `id`.
    ///
    /// Does nothing when the list is not collapsible.
    pub fn toggle<Id: TreeId>(
        &self,
        tree: &mut TreeStateManager<Id>,
        id: Id,
    ) -> Result<Expansion, TreeError<Id>> {
        if !self.options.collapsible {
            tree.node_info(id)?;
            log::debug!("list is not collapsible; ignoring toggle of {id:?}");
            return Ok(Expansion::Unchanged);
        }
        tree.toggle(id)
    }

    /// Long-press menu entry for `id`, if any.
    ///
    /// Only rows with children offer one, and only when both
    /// [`RowOptions::collapsible`] and [`RowOptions::handle_long_press`] are set.
    pub fn context_action<Id: TreeId>(
        &self,
        tree: &TreeView<'_, Id>,
        id: Id,
    ) -> Result<Option<ContextAction>, TreeError<Id>> {
        let info = tree.node_info(id)?;
        if !info.has_children || !self.options.collapsible || !self.options.handle_long_press {
            return Ok(None);
        }
        Ok(Some(if info.expanded {
            ContextAction::Collapse
        } else {
            ContextAction::Expand
        }))
    }

    /// Apply a long-press menu choice.
    pub fn apply<Id: TreeId>(
        &self,
        tree: &mut TreeStateManager<Id>,
        id: Id,
        action: ContextAction,
    ) -> Result<Expansion, TreeError<Id>> {
        match action {
            ContextAction::Expand => tree.expand_direct_children(id),
            ContextAction::Collapse => tree.collapse_children(id),
        }
    }
}
