//! Phase orchestration.
//!
//! The passes run in a fixed order: Trim → Relink → Thin (optional) →
//! Verify. Trimming runs first so deleted binaries are never relinked or
//! sliced; verification runs last over the final tree. Within the relink
//! and thin phases, per-binary work is parallel; the phases themselves
//! never overlap.
//!
//! The tree is assumed exclusively owned for the duration of the run;
//! concurrent invocations against the same tree are out of contract.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::path::Path;

use crate::layout::RuntimeLayout;
use crate::macho::Arch;
use crate::relink::{self, RelinkReport};
use crate::thin::{self, ThinReport};
use crate::trim::{self, TrimReport};
use crate::verify::{self, ArchRequirement, VerifyReport};

/// What a prepare run should do.
#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
    /// Components to remove, in the order requested.
    pub components: Vec<String>,
    /// Collapse universal binaries to this architecture.
    pub target_arch: Option<Arch>,
    /// Require both architectures at verification (no thinning requested).
    pub verify_universal: bool,
    /// Strict extension-name matching for the trim phase.
    pub strict_match: bool,
}

impl PrepareOptions {
    /// Architecture requirement implied by the options.
    pub fn arch_requirement(&self) -> Option<ArchRequirement> {
        match self.target_arch {
            Some(arch) => Some(ArchRequirement::Only(arch)),
            None if self.verify_universal => Some(ArchRequirement::Universal),
            None => None,
        }
    }
}

/// Combined report of all phases.
#[derive(Debug, Serialize)]
pub struct PrepareReport {
    pub trim: TrimReport,
    pub relink: RelinkReport,
    pub thin: Option<ThinReport>,
    pub verify: VerifyReport,
}

impl PrepareReport {
    /// Overall success signal.
    ///
    /// Per-item failures (unmatched components, failed extractions) do not
    /// fail the run by themselves; a failed extraction leaves a universal
    /// binary behind, which the verification phase then reports as an
    /// architecture mismatch.
    pub fn passed(&self) -> bool {
        self.verify.passed()
    }
}

/// Run the full pipeline against a tree.
///
/// Mutations are not rolled back on failure; callers needing atomicity
/// must operate on a disposable copy of the tree.
pub fn prepare(root: &Path, opts: &PrepareOptions) -> Result<PrepareReport> {
    let layout = RuntimeLayout::discover(root)?;

    let trim_report = trim::trim(&layout, &opts.components, opts.strict_match)?;
    if !opts.components.is_empty() && trim_report.nothing_matched() {
        println!("Note: no requested component matched anything.");
    }

    let relink_report = relink::relink(&layout)?;

    let thin_report = match opts.target_arch {
        Some(arch) => Some(thin::thin(&layout, arch)?),
        None => None,
    };

    let verify_report = verify::verify(layout.root(), opts.arch_requirement())?;
    verify_report.print();

    Ok(PrepareReport {
        trim: trim_report,
        relink: relink_report,
        thin: thin_report,
        verify: verify_report,
    })
}

/// Check that the Apple tools the mutating phases shell out to exist.
///
/// Run before any mutation so a missing toolchain never leaves a
/// half-processed tree.
pub fn check_host_tools(thinning: bool) -> Result<()> {
    let mut tools = vec!["install_name_tool", "codesign"];
    if thinning {
        tools.push("lipo");
    }

    for tool in tools {
        which::which(tool).map_err(|_| {
            anyhow!(
                "'{}' not found. It ships with the Xcode Command Line Tools; \
                 install them with `xcode-select --install`.",
                tool
            )
        })?;
    }
    Ok(())
}
