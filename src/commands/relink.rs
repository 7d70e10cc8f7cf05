//! Load-path relink command.

use anyhow::Result;
use std::path::Path;

use crate::layout::RuntimeLayout;
use crate::pipeline;
use crate::relink;

/// Rewrite install names and intra-tree load references.
pub fn cmd_relink(tree: &Path, json: bool) -> Result<()> {
    pipeline::check_host_tools(false)?;
    let layout = RuntimeLayout::discover(tree)?;

    let report = relink::relink(&layout)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
