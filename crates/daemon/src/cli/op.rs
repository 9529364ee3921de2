use std::path::PathBuf;

use knot_daemon::Config;

/// Shared inputs for every command
#[derive(Debug, Clone)]
pub struct OpContext {
    /// Value of `--config`, if given
    pub config_path: Option<PathBuf>,
    /// Configuration loaded from `config_path`, or defaults
    pub config: Config,
}

/// A CLI command: runs once and hands back something printable
pub trait Op {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: std::fmt::Display;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}
