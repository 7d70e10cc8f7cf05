//! Relopy - relocatable CPython runtime preparer.
//!
//! Takes a built CPython installation and makes it safe to embed in a
//! macOS application bundle:
//! - trims optional components (with shared-resource tracking)
//! - rewrites Mach-O load paths to @executable_path-relative form
//! - optionally thins universal binaries to one architecture
//! - verifies the tree is internally consistent

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use relopy::commands;
use relopy::config::Config;
use relopy::macho::Arch;
use relopy::pipeline::PrepareOptions;
use relopy::verify::ArchRequirement;

#[derive(Parser)]
#[command(name = "relopy")]
#[command(about = "Prepares a relocatable CPython runtime for macOS app bundles")]
#[command(
    after_help = "QUICK START:\n  relopy prepare <tree> -r tkinter -r idlelib   Trim, relink, verify\n  relopy prepare <tree> --arch arm64            ...and thin to arm64\n  relopy verify <tree>                          Re-check an existing tree"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: trim, relink, optionally thin, then verify
    Prepare {
        /// Runtime tree root (default: RELOPY_TREE)
        tree: Option<PathBuf>,

        /// Component to remove (repeatable, order-preserving)
        #[arg(short = 'r', long = "remove", value_name = "COMPONENT")]
        remove: Vec<String>,

        /// Collapse universal binaries to one architecture (arm64 or x86_64)
        #[arg(long)]
        arch: Option<String>,

        /// Require universal binaries at verification
        #[arg(long, conflicts_with = "arch")]
        universal: bool,

        /// Strict extension-name matching (prefix instead of substring)
        #[arg(long)]
        strict: bool,

        /// Print the combined report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove components from the tree
    Trim {
        /// Runtime tree root (default: RELOPY_TREE)
        tree: Option<PathBuf>,

        /// Components to remove, in order
        #[arg(required = true)]
        components: Vec<String>,

        /// Strict extension-name matching (prefix instead of substring)
        #[arg(long)]
        strict: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite Mach-O load paths to relocatable form
    Relink {
        /// Runtime tree root (default: RELOPY_TREE)
        tree: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Collapse universal binaries to a single architecture
    Thin {
        /// Runtime tree root (default: RELOPY_TREE)
        tree: Option<PathBuf>,

        /// Target architecture (arm64 or x86_64)
        arch: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the tree for dangling links and architecture completeness
    Verify {
        /// Runtime tree root (default: RELOPY_TREE)
        tree: Option<PathBuf>,

        /// Require exactly this architecture on every binary
        #[arg(long)]
        arch: Option<String>,

        /// Require universal (arm64 + x86_64) binaries
        #[arg(long, conflicts_with = "arch")]
        universal: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load();

    match cli.command {
        Commands::Prepare {
            tree,
            remove,
            arch,
            universal,
            strict,
            json,
        } => {
            let tree = resolve_tree(tree, &config)?;
            let opts = PrepareOptions {
                components: remove,
                target_arch: match arch {
                    Some(value) => Some(parse_arch(&value)?),
                    None => config.target_arch,
                },
                verify_universal: universal,
                strict_match: strict || config.strict_match,
            };
            commands::cmd_prepare(&tree, &opts, json)?;
        }

        Commands::Trim {
            tree,
            components,
            strict,
            json,
        } => {
            let tree = resolve_tree(tree, &config)?;
            commands::cmd_trim(&tree, &components, strict || config.strict_match, json)?;
        }

        Commands::Relink { tree, json } => {
            let tree = resolve_tree(tree, &config)?;
            commands::cmd_relink(&tree, json)?;
        }

        Commands::Thin { tree, arch, json } => {
            let tree = resolve_tree(tree, &config)?;
            commands::cmd_thin(&tree, parse_arch(&arch)?, json)?;
        }

        Commands::Verify {
            tree,
            arch,
            universal,
            json,
        } => {
            let tree = resolve_tree(tree, &config)?;
            let require = match arch {
                Some(value) => Some(ArchRequirement::Only(parse_arch(&value)?)),
                None if universal => Some(ArchRequirement::Universal),
                None => None,
            };
            commands::cmd_verify(&tree, require, json)?;
        }

        Commands::Show { what } => {
            let target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
            };
            commands::cmd_show(target, &config)?;
        }
    }

    Ok(())
}

/// Pick the tree from the CLI argument or the configured default.
fn resolve_tree(cli_tree: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    match cli_tree.or_else(|| config.default_tree.clone()) {
        Some(tree) => Ok(tree),
        None => bail!("No runtime tree given. Pass a path or set RELOPY_TREE."),
    }
}

fn parse_arch(value: &str) -> Result<Arch> {
    value.parse::<Arch>().map_err(|msg| anyhow!(msg))
}
