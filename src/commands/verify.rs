//! Tree verification command.

use anyhow::{bail, Result};
use std::path::Path;

use crate::verify::{self, ArchRequirement};

/// Check the tree for dangling links and architecture completeness.
pub fn cmd_verify(tree: &Path, require: Option<ArchRequirement>, json: bool) -> Result<()> {
    let report = verify::verify(tree, require)?;
    report.print();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if !report.passed() {
        bail!("Verification failed; every offending path is listed above.");
    }
    Ok(())
}
