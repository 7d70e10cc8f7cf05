//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `prepare` - Run the full pipeline (trim, relink, thin, verify)
//! - `trim` - Remove components only
//! - `relink` - Rewrite load paths only
//! - `thin` - Collapse universal binaries only
//! - `verify` - Check tree consistency
//! - `show` - Display information

pub mod prepare;
pub mod relink;
pub mod show;
pub mod thin;
pub mod trim;
pub mod verify;

pub use prepare::cmd_prepare;
pub use relink::cmd_relink;
pub use show::cmd_show;
pub use thin::cmd_thin;
pub use trim::cmd_trim;
pub use verify::cmd_verify;
