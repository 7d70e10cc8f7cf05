//! Consistency verifier.
//!
//! Read-only, re-runnable checks over the finished tree:
//!
//! - **Dangling links**: every symbolic link must resolve. A broken link
//!   inside an app bundle fails code-signing and launch on the target
//!   platform, so this check has zero tolerance: every offender is
//!   enumerated and any one of them fails the whole operation.
//! - **Architecture completeness** (when requested): every Mach-O must
//!   carry exactly the required slice set.
//!
//! Unlike trimming's best-effort matching, a failure here is terminal for
//! the overall result. Mutations already performed are not rolled back.

use anyhow::{bail, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::macho::{classify, Arch, FileClass};

/// Architecture requirement for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArchRequirement {
    /// Every binary must carry both arm64 and x86_64.
    Universal,
    /// Every binary must carry exactly this one slice (after thinning).
    Only(Arch),
}

impl ArchRequirement {
    fn required_set(&self) -> BTreeSet<Arch> {
        match self {
            Self::Universal => BTreeSet::from([Arch::Arm64, Arch::X86_64]),
            Self::Only(arch) => BTreeSet::from([*arch]),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Universal => "universal (arm64 + x86_64)".to_string(),
            Self::Only(arch) => format!("{} only", arch),
        }
    }
}

/// A symbolic link whose target does not exist.
#[derive(Debug, Clone, Serialize)]
pub struct BrokenLink {
    pub link: PathBuf,
    pub target: PathBuf,
}

/// A binary whose slice set does not match the requirement.
#[derive(Debug, Clone, Serialize)]
pub struct ArchMismatch {
    pub path: PathBuf,
    pub present: Vec<Arch>,
}

/// Result of a verification pass.
#[derive(Debug, Default, Serialize)]
pub struct VerifyReport {
    pub links_checked: usize,
    pub binaries_checked: usize,
    pub broken_links: Vec<BrokenLink>,
    pub arch_mismatches: Vec<ArchMismatch>,
    /// The requirement the binaries were checked against, if any.
    pub requirement: Option<String>,
}

impl VerifyReport {
    /// True when the tree is internally consistent.
    pub fn passed(&self) -> bool {
        self.broken_links.is_empty() && self.arch_mismatches.is_empty()
    }

    pub fn print(&self) {
        println!("=== Verification ===\n");

        if self.broken_links.is_empty() {
            println!(
                "  ✓ [PASS] symbolic links: {} checked, none broken",
                self.links_checked
            );
        } else {
            println!(
                "  ✗ [FAIL] symbolic links: {} of {} broken",
                self.broken_links.len(),
                self.links_checked
            );
            for broken in &self.broken_links {
                println!(
                    "      {} -> {}",
                    broken.link.display(),
                    broken.target.display()
                );
            }
        }

        if let Some(requirement) = &self.requirement {
            if self.arch_mismatches.is_empty() {
                println!(
                    "  ✓ [PASS] architectures: {} binaries are {}",
                    self.binaries_checked, requirement
                );
            } else {
                println!(
                    "  ✗ [FAIL] architectures: {} of {} binaries are not {}",
                    self.arch_mismatches.len(),
                    self.binaries_checked,
                    requirement
                );
                for mismatch in &self.arch_mismatches {
                    let present: Vec<&str> =
                        mismatch.present.iter().map(Arch::as_str).collect();
                    println!(
                        "      {} (has: {})",
                        mismatch.path.display(),
                        present.join(", ")
                    );
                }
            }
        }

        println!();
        if self.passed() {
            println!("Verification: PASS");
        } else {
            println!("Verification: FAIL");
        }
    }
}

/// Verify the tree. Safe to re-run any time after the mutating passes.
pub fn verify(root: &Path, require: Option<ArchRequirement>) -> Result<VerifyReport> {
    if !root.is_dir() {
        bail!("Runtime tree not found: {}", root.display());
    }

    let mut report = VerifyReport {
        requirement: require.map(|r| r.describe()),
        ..Default::default()
    };
    let required_set = require.map(|r| r.required_set());

    for entry in WalkDir::new(root).sort_by_file_name() {
        let Ok(entry) = entry else { continue };

        if entry.path_is_symlink() {
            report.links_checked += 1;
            if let Some(broken) = check_link(entry.path()) {
                report.broken_links.push(broken);
            }
            continue;
        }

        if let Some(required) = &required_set {
            if !entry.file_type().is_file() {
                continue;
            }
            if let FileClass::Mach(info) = classify(entry.path()) {
                report.binaries_checked += 1;
                if info.archs != *required {
                    report.arch_mismatches.push(ArchMismatch {
                        path: entry.path().to_path_buf(),
                        present: info.archs.iter().copied().collect(),
                    });
                }
            }
        }
    }

    Ok(report)
}

/// Resolve a link target relative to the link's own directory.
fn check_link(link: &Path) -> Option<BrokenLink> {
    let target = fs::read_link(link).ok()?;

    let resolved = if target.is_absolute() {
        target.clone()
    } else {
        link.parent()?.join(&target)
    };

    if resolved.exists() {
        None
    } else {
        Some(BrokenLink {
            link: link.to_path_buf(),
            target,
        })
    }
}
