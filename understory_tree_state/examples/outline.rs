// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Outline: expand/collapse a small document outline and print the rows.
//!
//! This example shows how to:
//! - build a tree from a level-annotated listing with `TreeBuilder`,
//! - observe structural changes and keep a scroll anchor stable,
//! - render rows with indentation and indicators via `TreeRows`.
//!
//! Run:
//! - `cargo run -p understory_tree_state --example outline`

use std::cell::Cell;
use std::rc::Rc;

use understory_tree_state::{
    Indicator, RowOptions, TreeBuilder, TreeError, TreeEvent, TreeRows, TreeStateManager,
};

const OUTLINE: &[(&str, usize)] = &[
    ("Introduction", 0),
    ("Motivation", 1),
    ("Prior work", 1),
    ("Tree views", 2),
    ("Outliners", 2),
    ("Design", 0),
    ("Store", 1),
    ("Visible sequence", 1),
    ("Splices", 2),
    ("Observers", 1),
    ("Conclusion", 0),
];

fn print_rows(tree: &TreeStateManager<&'static str>, rows: &TreeRows) {
    let view = tree.view();
    for position in 0..rows.len(&view) {
        let Some(row) = rows.row(&view, position) else {
            continue;
        };
        let marker = match row.indicator {
            Indicator::Expanded => "v ",
            Indicator::Collapsed => "> ",
            Indicator::None => "  ",
        };
        let pad = " ".repeat(row.indent as usize);
        println!("{position:>3} {pad}{marker}{}", row.info.id);
    }
    println!();
}

fn main() -> Result<(), TreeError<&'static str>> {
    let mut builder = TreeBuilder::new();
    for &(title, level) in OUTLINE {
        builder.sequentially_add(title, level)?;
    }
    let mut tree = builder.build();
    let rows = TreeRows::with_options(
        3,
        RowOptions {
            indent_width: 2,
            ..RowOptions::default()
        },
    );

    // Keep the first displayed row stable across changes, as a scrolling list would.
    let anchor = Rc::new(Cell::new(0_usize));
    let tracked = Rc::clone(&anchor);
    tree.subscribe_fn(move |view, event| match event {
        TreeEvent::Structural(splice) => {
            let top = splice.anchor(tracked.get());
            tracked.set(top);
            println!(
                "splice at {}: -{} +{} (top row now {:?})",
                splice.start,
                splice.removed,
                splice.inserted,
                view.id_at(top)
            );
        }
        TreeEvent::NodeChanged(id) => println!("row {id:?} changed"),
        TreeEvent::Refreshed => println!("refresh"),
        TreeEvent::Invalidated => tracked.set(0),
    });

    print_rows(&tree, &rows);

    rows.toggle(&mut tree, "Design")?;
    anchor.set(tree.index_of("Visible sequence").unwrap_or(0));
    tree.expand_everything_below("Introduction")?;
    print_rows(&tree, &rows);

    tree.collapse_children("Design")?;
    print_rows(&tree, &rows);

    tree.reveal("Splices")?;
    println!("path: {}", tree.hierarchy_description("Splices")?);
    print_rows(&tree, &rows);

    tree.collapse_all();
    print_rows(&tree, &rows);
    Ok(())
}
