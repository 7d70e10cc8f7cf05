//! Component removal command.

use anyhow::Result;
use std::path::Path;

use crate::layout::RuntimeLayout;
use crate::trim;

/// Remove the requested components from the tree.
pub fn cmd_trim(tree: &Path, components: &[String], strict: bool, json: bool) -> Result<()> {
    let layout = RuntimeLayout::discover(tree)?;

    let report = trim::trim(&layout, components, strict)?;
    report.print();

    if report.nothing_matched() {
        println!("Warning: no requested component matched anything.");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
