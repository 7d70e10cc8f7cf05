//! Distribution-tree layout.
//!
//! A built CPython installation has a well-known shape:
//!
//! ```text
//! <root>/
//!   bin/                    python3.14, python3, pip3, helper scripts
//!   lib/                    libpython3.14.dylib, bundled OpenSSL dylibs
//!     python3.14/           pure-source stdlib
//!       lib-dynload/        native extension modules
//!       site-packages/      installed third-party packages
//!   include/python3.14/     SDK headers
//! ```
//!
//! The versioned directory name is discovered from the tree, never assumed.
//! All phases resolve paths through this type so the layout contract lives
//! in one place.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved layout of the runtime tree being prepared.
#[derive(Debug, Clone)]
pub struct RuntimeLayout {
    root: PathBuf,
    /// Versioned directory name, e.g. "python3.14".
    version_name: String,
}

impl RuntimeLayout {
    /// Discover the layout of a runtime installation.
    ///
    /// Fails before any mutation if the root, `bin/`, `lib/`, the versioned
    /// stdlib directory, or the interpreter executable are missing.
    pub fn discover(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("Runtime tree not found: {}", root.display());
        }

        let bin_dir = root.join("bin");
        if !bin_dir.is_dir() {
            bail!("Runtime tree has no bin/ directory: {}", root.display());
        }

        let lib_dir = root.join("lib");
        if !lib_dir.is_dir() {
            bail!("Runtime tree has no lib/ directory: {}", root.display());
        }

        let version_name = find_version_dir(&lib_dir)?;

        let layout = Self {
            root: root.to_path_buf(),
            version_name,
        };

        if !layout.interpreter().is_file() {
            bail!(
                "Interpreter executable not found: {}",
                layout.interpreter().display()
            );
        }

        Ok(layout)
    }

    /// Root of the distribution tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Versioned directory name, e.g. "python3.14".
    pub fn version_name(&self) -> &str {
        &self.version_name
    }

    /// `bin/` directory holding the interpreter and helper scripts.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// `lib/` directory holding shared libraries.
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    /// Versioned stdlib directory, e.g. `lib/python3.14`.
    pub fn stdlib_dir(&self) -> PathBuf {
        self.root.join("lib").join(&self.version_name)
    }

    /// Native extension directory, e.g. `lib/python3.14/lib-dynload`.
    pub fn dynload_dir(&self) -> PathBuf {
        self.stdlib_dir().join("lib-dynload")
    }

    /// Installed third-party package directory.
    pub fn site_packages_dir(&self) -> PathBuf {
        self.stdlib_dir().join("site-packages")
    }

    /// SDK header directory, e.g. `include/python3.14`.
    pub fn include_dir(&self) -> PathBuf {
        self.root.join("include")
    }

    /// The main interpreter executable, e.g. `bin/python3.14`.
    pub fn interpreter(&self) -> PathBuf {
        self.root.join("bin").join(&self.version_name)
    }

    /// Whether a shebang interpreter name refers to this runtime's own
    /// interpreter (covers the `python3` and `python` symlink spellings).
    pub fn is_runtime_interpreter(&self, name: &str) -> bool {
        name == self.version_name || name == "python3" || name == "python"
    }

    /// Whether a load reference's literal path falls inside the tree.
    ///
    /// References to system libraries and references already rewritten to
    /// `@executable_path` form are external.
    pub fn is_intra_tree(&self, reference: &str) -> bool {
        Path::new(reference).starts_with(&self.root)
    }

    /// Relocatable form of an intra-tree path, expressed through the
    /// eventual executable's location in `bin/`.
    ///
    /// `<root>/lib/libpython3.14.dylib` becomes
    /// `@executable_path/../lib/libpython3.14.dylib`.
    pub fn relocatable_reference(&self, path: &Path) -> Result<String> {
        let rel = path.strip_prefix(&self.root).with_context(|| {
            format!(
                "Path is not inside the runtime tree: {}",
                path.display()
            )
        })?;
        Ok(format!("@executable_path/../{}", rel.to_string_lossy()))
    }
}

/// Find the single `pythonX.Y` directory under `lib/`.
fn find_version_dir(lib_dir: &Path) -> Result<String> {
    let mut candidates: Vec<String> = fs::read_dir(lib_dir)
        .with_context(|| format!("Failed to read {}", lib_dir.display()))?
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("python"))
        .collect();
    candidates.sort();

    match candidates.first() {
        Some(name) => Ok(name.clone()),
        None => bail!(
            "No versioned python directory under {}",
            lib_dir.display()
        ),
    }
}
