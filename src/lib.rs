//! Relopy library exports.
//!
//! Prepares a built CPython installation for embedding inside a macOS
//! application bundle: trims optional components, rewrites Mach-O load
//! paths to `@executable_path`-relative form, optionally thins universal
//! binaries to a single architecture, and verifies the result.
//!
//! Exposed as a library so the integration tests can exercise each phase
//! directly; the `relopy` binary is a thin CLI over [`pipeline`].

pub mod catalog;
pub mod commands;
pub mod config;
pub mod layout;
pub mod macho;
pub mod pipeline;
pub mod process;
pub mod relink;
pub mod thin;
pub mod trim;
pub mod verify;
