//! Architecture thinning command.

use anyhow::Result;
use std::path::Path;

use crate::layout::RuntimeLayout;
use crate::macho::Arch;
use crate::pipeline;
use crate::thin;

/// Collapse universal binaries to a single architecture.
///
/// Per-file extraction failures are reported but do not fail the command;
/// `verify` flags any binary left with the wrong slice set.
pub fn cmd_thin(tree: &Path, arch: Arch, json: bool) -> Result<()> {
    pipeline::check_host_tools(true)?;
    let layout = RuntimeLayout::discover(tree)?;

    let report = thin::thin(&layout, arch)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
