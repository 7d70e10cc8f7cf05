//! Configuration management for relopy.
//!
//! Reads configuration from a `.env` file and environment variables.
//! Environment variables take precedence over the `.env` file (dotenvy
//! never overrides variables that are already set).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::macho::Arch;

/// Relopy configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Default runtime tree to operate on (RELOPY_TREE).
    pub default_tree: Option<PathBuf>,
    /// Default target architecture for thinning (RELOPY_ARCH).
    pub target_arch: Option<Arch>,
    /// Strict extension-name matching (RELOPY_STRICT_MATCH).
    pub strict_match: bool,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// `main` loads `.env` into the process environment first, so both
    /// sources are visible here.
    pub fn load() -> Self {
        let default_tree = env::var("RELOPY_TREE").ok().map(PathBuf::from);

        let target_arch = env::var("RELOPY_ARCH")
            .ok()
            .and_then(|value| Arch::from_str(&value).ok());

        let strict_match = env::var("RELOPY_STRICT_MATCH")
            .map(|value| matches!(value.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            default_tree,
            target_arch,
            strict_match,
        }
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        match &self.default_tree {
            Some(tree) => println!("  RELOPY_TREE: {}", tree.display()),
            None => println!("  RELOPY_TREE: (not set)"),
        }
        match self.target_arch {
            Some(arch) => println!("  RELOPY_ARCH: {}", arch),
            None => println!("  RELOPY_ARCH: (not set)"),
        }
        println!("  RELOPY_STRICT_MATCH: {}", self.strict_match);
    }
}
