//! Load-path relinker.
//!
//! Rewrites every Mach-O file's install name and intra-tree load
//! references to `@executable_path`-relative form so the tree can be
//! moved anywhere without re-linking. Reading link metadata is done with
//! `goblin`; writing goes through `install_name_tool`, followed by ad-hoc
//! re-signing (modifying a binary invalidates its signature, which makes
//! it unloadable on Apple Silicon).
//!
//! Relinking one binary never depends on another having been relinked,
//! so per-binary work fans out on a worker pool bounded by the CPU count.
//! Rewriting an already-relinked tree plans zero changes and touches
//! nothing.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::layout::RuntimeLayout;
use crate::macho::{self, MachInfo};
use crate::process::Cmd;

/// One binary whose link metadata was rewritten.
#[derive(Debug, Clone, Serialize)]
pub struct RelinkedBinary {
    pub path: PathBuf,
    pub id_rewritten: bool,
    pub refs_rewritten: usize,
}

/// Report of a relink pass. Zero rewrites is a valid outcome: the tree
/// was already relocatable.
#[derive(Debug, Default, Serialize)]
pub struct RelinkReport {
    /// Mach-O files inspected.
    pub binaries_seen: usize,
    /// Binaries actually modified.
    pub rewritten: Vec<RelinkedBinary>,
    /// Intra-tree load references rewritten across all binaries.
    pub edges_rewritten: usize,
}

impl RelinkReport {
    pub fn print(&self) {
        println!(
            "Relink summary: {} load references rewritten in {} of {} binaries",
            self.edges_rewritten,
            self.rewritten.len(),
            self.binaries_seen
        );
    }
}

/// Planned rewrites for a single binary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelinkPlan {
    /// New install name, when the current one is not the relocatable form.
    pub new_id: Option<String>,
    /// `(old, new)` pairs for intra-tree load references.
    pub ref_changes: Vec<(String, String)>,
}

impl RelinkPlan {
    pub fn is_empty(&self) -> bool {
        self.new_id.is_none() && self.ref_changes.is_empty()
    }
}

/// Compute the rewrites a binary needs.
///
/// External references (`/usr/lib/...`, `/System/...`, anything already in
/// `@`-form) are left untouched; only literal paths under the tree's own
/// root are rewritten.
pub fn plan_relink(layout: &RuntimeLayout, binary: &Path, info: &MachInfo) -> Result<RelinkPlan> {
    let mut plan = RelinkPlan::default();

    if let Some(current) = &info.install_name {
        let desired = layout.relocatable_reference(binary)?;
        if *current != desired {
            plan.new_id = Some(desired);
        }
    }

    for load_ref in &info.load_refs {
        if layout.is_intra_tree(load_ref) {
            let desired = layout.relocatable_reference(Path::new(load_ref))?;
            plan.ref_changes.push((load_ref.clone(), desired));
        }
    }

    Ok(plan)
}

/// Relink every Mach-O file under the tree.
pub fn relink(layout: &RuntimeLayout) -> Result<RelinkReport> {
    println!("Relinking Mach-O load paths...");

    let binaries = macho::mach_files(layout.root());
    let mut report = RelinkReport {
        binaries_seen: binaries.len(),
        ..Default::default()
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let rewritten = runtime.block_on(relink_all(layout, binaries))?;

    report.edges_rewritten = rewritten.iter().map(|b| b.refs_rewritten).sum();
    report.rewritten = rewritten;
    report.print();
    Ok(report)
}

/// Fan per-binary rewrites out on a bounded worker pool.
async fn relink_all(
    layout: &RuntimeLayout,
    binaries: Vec<(PathBuf, MachInfo)>,
) -> Result<Vec<RelinkedBinary>> {
    let permits = Arc::new(Semaphore::new(worker_count()));
    let mut tasks = JoinSet::new();

    for (path, info) in binaries {
        let plan = plan_relink(layout, &path, &info)?;
        if plan.is_empty() {
            continue;
        }

        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| anyhow!("relink worker pool closed"))?;
            apply_plan(&path, &plan).await?;
            Ok::<_, anyhow::Error>(RelinkedBinary {
                path,
                id_rewritten: plan.new_id.is_some(),
                refs_rewritten: plan.ref_changes.len(),
            })
        });
    }

    let mut rewritten = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        rewritten.push(joined.context("relink worker panicked")??);
    }
    rewritten.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(rewritten)
}

/// Apply a plan with a single `install_name_tool` invocation, then re-sign.
async fn apply_plan(path: &Path, plan: &RelinkPlan) -> Result<()> {
    let mut cmd = Cmd::new("install_name_tool");

    if let Some(id) = &plan.new_id {
        cmd = cmd.arg("-id").arg(id);
    }
    for (old, new) in &plan.ref_changes {
        cmd = cmd.arg("-change").arg(old).arg(new);
    }

    cmd.arg_path(path)
        .error_msg(format!("install_name_tool failed for {}", path.display()))
        .run()
        .await?;

    sign_adhoc(path).await
}

/// Ad-hoc re-sign a binary after modifying it.
///
/// Shared with the thin pass, which also invalidates signatures.
pub(crate) async fn sign_adhoc(path: &Path) -> Result<()> {
    Cmd::new("codesign")
        .args(["--force", "--sign", "-"])
        .arg_path(path)
        .error_msg(format!("codesign failed for {}", path.display()))
        .run()
        .await?;
    Ok(())
}

/// Worker pool size for per-binary fan-out.
pub(crate) fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
}
