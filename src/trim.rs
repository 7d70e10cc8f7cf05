//! Component removal engine.
//!
//! Interprets the catalog's removal rules against the distribution tree.
//! Components are processed in the order requested; every filesystem
//! object actually deleted is recorded. A component that matches nothing
//! is reported, not an error; the caller decides whether that matters.
//!
//! Shared-resource guards are evaluated exactly once against the full
//! requested set after all per-component removal, so the outcome never
//! depends on component ordering.
//!
//! Deletion is irreversible; there is no backup. Callers needing
//! atomicity must operate on a disposable copy of the tree.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog::{self, RemovalRule, SHARED_RESOURCE_GUARDS};
use crate::layout::RuntimeLayout;
use crate::macho::{classify, FileClass};

/// What one requested component ended up removing.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentRemoval {
    pub component: String,
    pub removed: Vec<PathBuf>,
}

impl ComponentRemoval {
    pub fn matched(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Report of a full trim pass.
#[derive(Debug, Default, Serialize)]
pub struct TrimReport {
    pub components: Vec<ComponentRemoval>,
    /// Guarded resources deleted because every dependent was requested.
    pub shared_resources_removed: Vec<PathBuf>,
}

impl TrimReport {
    pub fn total_removed(&self) -> usize {
        self.components.iter().map(|c| c.removed.len()).sum::<usize>()
            + self.shared_resources_removed.len()
    }

    /// True when the entire requested list resolved to zero matches.
    pub fn nothing_matched(&self) -> bool {
        self.total_removed() == 0
    }

    /// Components that matched nothing, in request order.
    pub fn unmatched(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| !c.matched())
            .map(|c| c.component.as_str())
            .collect()
    }

    pub fn print(&self) {
        println!("Trim summary: {} objects removed", self.total_removed());
        for component in self.unmatched() {
            println!("  (no match for '{}')", component);
        }
    }
}

/// Remove the requested components from the tree.
pub fn trim(layout: &RuntimeLayout, components: &[String], strict: bool) -> Result<TrimReport> {
    if !layout.root().is_dir() {
        bail!("Runtime tree not found: {}", layout.root().display());
    }

    let mut report = TrimReport::default();

    for component in components {
        println!("Trimming {}...", component);
        let mut removed = Vec::new();

        for rule in catalog::rules_for(component) {
            apply_rule(layout, component, *rule, strict, &mut removed)
                .with_context(|| format!("while trimming component '{}'", component))?;
        }

        for path in &removed {
            println!("  removed {}", path.display());
        }

        report.components.push(ComponentRemoval {
            component: component.clone(),
            removed,
        });
    }

    // Guards see the full requested set, never a per-component prefix.
    for guard in SHARED_RESOURCE_GUARDS {
        if guard.triggered_by(components) {
            println!("Removing shared resource '{}'...", guard.name);
            remove_guarded_libs(layout, guard.lib_prefixes, &mut report.shared_resources_removed)?;
            for path in &report.shared_resources_removed {
                println!("  removed {}", path.display());
            }
        }
    }

    Ok(report)
}

/// Apply one removal rule, appending every deleted object.
fn apply_rule(
    layout: &RuntimeLayout,
    component: &str,
    rule: RemovalRule,
    strict: bool,
    removed: &mut Vec<PathBuf>,
) -> Result<()> {
    match rule {
        RemovalRule::StdlibDir => {
            let dir = layout.stdlib_dir().join(component);
            if dir.is_dir() {
                remove_path(&dir)?;
                removed.push(dir);
            }
        }

        RemovalRule::StdlibModule => {
            let module = layout.stdlib_dir().join(format!("{}.py", component));
            if module.is_file() {
                remove_path(&module)?;
                removed.push(module);
            }
        }

        RemovalRule::DynloadExtension => {
            for entry in sorted_entries(&layout.dynload_dir())? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if entry.path().is_file() && catalog::extension_matches(&name, component, strict) {
                    remove_path(&entry.path())?;
                    removed.push(entry.path());
                }
            }
        }

        RemovalRule::SitePackage => {
            for entry in sorted_entries(&layout.site_packages_dir())? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.starts_with(component) {
                    remove_path(&entry.path())?;
                    removed.push(entry.path());
                }
            }
        }

        RemovalRule::BinScript => {
            for entry in sorted_entries(&layout.bin_dir())? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !entry.path().is_file() || !name.starts_with(component) {
                    continue;
                }
                if let FileClass::Script {
                    interpreter: Some(interp),
                } = classify(&entry.path())
                {
                    if layout.is_runtime_interpreter(&interp) {
                        remove_path(&entry.path())?;
                        removed.push(entry.path());
                    }
                }
            }
        }

        RemovalRule::BytecodeCaches => {
            remove_matching_dirs(layout.root(), removed, |name| name == "__pycache__")?;
            remove_matching_files(layout.root(), removed, |name| name.ends_with(".pyc"))?;
        }

        RemovalRule::HeaderTrees => {
            let include = layout.include_dir();
            if include.is_dir() {
                remove_path(&include)?;
                removed.push(include);
            }
        }

        RemovalRule::InstallerMetadata => {
            remove_matching_dirs(layout.root(), removed, |name| {
                name.ends_with(".dist-info") || name.ends_with(".egg-info")
            })?;
        }
    }

    Ok(())
}

/// Delete every guarded dylib in `lib/` matching one of the prefixes.
fn remove_guarded_libs(
    layout: &RuntimeLayout,
    prefixes: &[&str],
    removed: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in sorted_entries(&layout.lib_dir())? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if prefixes.iter().any(|prefix| name.starts_with(prefix)) {
            remove_path(&entry.path())?;
            removed.push(entry.path());
        }
    }
    Ok(())
}

/// Tree-wide removal of directories matching a name predicate.
///
/// Matching directories are deleted whole and never descended into.
fn remove_matching_dirs(
    root: &Path,
    removed: &mut Vec<PathBuf>,
    matches: impl Fn(&str) -> bool,
) -> Result<()> {
    let mut it = WalkDir::new(root).sort_by_file_name().into_iter();
    while let Some(entry) = it.next() {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().is_dir() && matches(&name) {
            it.skip_current_dir();
            remove_path(entry.path())?;
            removed.push(entry.path().to_path_buf());
        }
    }
    Ok(())
}

/// Tree-wide removal of regular files matching a name predicate.
fn remove_matching_files(
    root: &Path,
    removed: &mut Vec<PathBuf>,
    matches: impl Fn(&str) -> bool,
) -> Result<()> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().is_file() && matches(&name) {
            remove_path(entry.path())?;
            removed.push(entry.path().to_path_buf());
        }
    }
    Ok(())
}

/// Delete a filesystem object, whatever kind it is.
///
/// Symlinks are removed as links; their targets are never touched.
fn remove_path(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;

    if meta.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory {}", path.display()))?;
    } else {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Directory entries in stable name order; missing directories yield
/// nothing (the tree may legitimately lack site-packages or lib-dynload).
fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}
