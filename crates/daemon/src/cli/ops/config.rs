use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use knot_daemon::ConfigError;

/// Print the effective configuration
#[derive(Args, Debug, Clone)]
pub struct ShowConfig;

#[derive(Debug)]
pub struct ShowConfigOutput {
    pub source: Option<PathBuf>,
    pub rendered: String,
}

impl fmt::Display for ShowConfigOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Some(path) => path.display().to_string(),
            None => "defaults".to_string(),
        };
        writeln!(f, "{} {}", "# source:".dimmed(), source)?;
        write!(f, "{}", self.rendered.trim_end())
    }
}

impl crate::cli::op::Op for ShowConfig {
    type Error = ConfigError;
    type Output = ShowConfigOutput;

    fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        Ok(ShowConfigOutput {
            source: ctx.config_path.clone(),
            rendered: ctx.config.to_toml_string()?,
        })
    }
}
