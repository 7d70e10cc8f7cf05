//! Information display command.

use anyhow::Result;

use crate::config::Config;

/// What to show.
#[derive(Debug, Clone, Copy)]
pub enum ShowTarget {
    Config,
}

pub fn cmd_show(target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => config.print(),
    }
    Ok(())
}
