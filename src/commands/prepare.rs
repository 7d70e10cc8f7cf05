//! Full pipeline command.

use anyhow::{bail, Result};
use std::path::Path;

use crate::pipeline::{self, PrepareOptions};

/// Run trim, relink, optional thin, and verify against the tree.
pub fn cmd_prepare(tree: &Path, opts: &PrepareOptions, json: bool) -> Result<()> {
    pipeline::check_host_tools(opts.target_arch.is_some())?;

    let report = pipeline::prepare(tree, opts)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.passed() {
        bail!("Tree is not consistent; every offending path is listed above.");
    }

    println!("Prepared {} successfully.", tree.display());
    Ok(())
}
