//! Architecture slicer.
//!
//! Collapses universal Mach-O files to a single architecture with
//! `lipo -thin`. Extraction always goes to a fresh temporary file in the
//! same directory, atomically renamed over the original only after lipo
//! succeeds, so an interrupted run never leaves a half-written binary.
//!
//! A binary that lacks the target slice is recorded as a per-file failure
//! and left untouched; the rest of the tree continues processing. Runs
//! after removal (deleted binaries are never sliced) and independent of
//! relinking (slicing changes code, not the load-path table).

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::layout::RuntimeLayout;
use crate::macho::{self, Arch, MachInfo};
use crate::process::Cmd;
use crate::relink::{sign_adhoc, worker_count};

/// A binary that could not be thinned. Non-fatal; the original file is
/// unchanged.
#[derive(Debug, Clone, Serialize)]
pub struct ThinFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Report of a thin pass.
#[derive(Debug, Default, Serialize)]
pub struct ThinReport {
    /// Universal binaries successfully collapsed to the target slice.
    pub thinned: Vec<PathBuf>,
    /// Binaries skipped because they were already single-architecture.
    pub already_single: usize,
    /// Per-file extraction failures.
    pub failures: Vec<ThinFailure>,
}

impl ThinReport {
    pub fn total_thinned(&self) -> usize {
        self.thinned.len()
    }

    pub fn print(&self) {
        println!(
            "Thin summary: {} thinned, {} already single-architecture, {} failed",
            self.thinned.len(),
            self.already_single,
            self.failures.len()
        );
        for failure in &self.failures {
            println!("  ✗ {}: {}", failure.path.display(), failure.reason);
        }
    }
}

/// Outcome of slicing one binary.
enum Outcome {
    Thinned(PathBuf),
    AlreadySingle,
    Failed(ThinFailure),
}

/// Thin every universal Mach-O under the tree to `target`.
pub fn thin(layout: &RuntimeLayout, target: Arch) -> Result<ThinReport> {
    println!("Thinning universal binaries to {}...", target);

    let binaries = macho::mach_files(layout.root());

    let runtime = tokio::runtime::Runtime::new()?;
    let outcomes = runtime.block_on(thin_all(binaries, target))?;

    let mut report = ThinReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Thinned(path) => report.thinned.push(path),
            Outcome::AlreadySingle => report.already_single += 1,
            Outcome::Failed(failure) => report.failures.push(failure),
        }
    }
    report.thinned.sort();
    report.failures.sort_by(|a, b| a.path.cmp(&b.path));
    report.print();
    Ok(report)
}

async fn thin_all(binaries: Vec<(PathBuf, MachInfo)>, target: Arch) -> Result<Vec<Outcome>> {
    let permits = Arc::new(Semaphore::new(worker_count()));
    let mut tasks = JoinSet::new();

    for (path, info) in binaries {
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| anyhow!("thin worker pool closed"))?;
            Ok::<_, anyhow::Error>(thin_one(&path, &info, target).await)
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        outcomes.push(joined.context("thin worker panicked")??);
    }
    Ok(outcomes)
}

/// Slice a single binary, converting any extraction error into a
/// recorded per-file failure.
async fn thin_one(path: &Path, info: &MachInfo, target: Arch) -> Outcome {
    if !info.is_universal() {
        return Outcome::AlreadySingle;
    }

    // Checked before lipo runs, so a missing slice never modifies the file.
    if !info.archs.contains(&target) {
        let present: Vec<&str> = info.archs.iter().map(Arch::as_str).collect();
        return Outcome::Failed(ThinFailure {
            path: path.to_path_buf(),
            reason: format!(
                "architecture {} not present (has: {})",
                target,
                present.join(", ")
            ),
        });
    }

    match extract_slice(path, target).await {
        Ok(()) => Outcome::Thinned(path.to_path_buf()),
        Err(err) => Outcome::Failed(ThinFailure {
            path: path.to_path_buf(),
            reason: format!("{:#}", err),
        }),
    }
}

/// Extract the target slice to a sibling temp file and rename it over the
/// original.
async fn extract_slice(path: &Path, target: Arch) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("No parent directory for {}", path.display()))?;

    let perms = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .permissions();

    let tmp = tempfile::Builder::new()
        .prefix(".thin-")
        .tempfile_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;

    Cmd::new("lipo")
        .arg("-thin")
        .arg(target.as_str())
        .arg_path(path)
        .arg("-output")
        .arg_path(tmp.path())
        .error_msg(format!("lipo failed for {}", path.display()))
        .run()
        .await?;

    tmp.persist(path)
        .map_err(|err| anyhow!("Failed to replace {}: {}", path.display(), err))?;

    // lipo wrote through the 0600 temp file; restore the original mode.
    fs::set_permissions(path, perms)
        .with_context(|| format!("Failed to restore permissions on {}", path.display()))?;

    sign_adhoc(path).await
}
