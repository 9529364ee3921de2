use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use common::nfs::{NfsError, NfsStatus, WccData};
use knot_daemon::{ExportState, StateError};

/// Rename a path inside the export through the RENAME handler
#[derive(Args, Debug, Clone)]
pub struct Mv {
    /// Source path, relative to the export root
    pub from: String,

    /// Destination path, relative to the export root
    pub to: String,
}

#[derive(Debug)]
pub struct MvOutput {
    pub from: String,
    pub to: String,
    pub from_dir_handle: String,
    pub to_dir_handle: String,
    pub from_dir_wcc: WccData,
    pub to_dir_wcc: WccData,
}

fn describe_wcc(wcc: &WccData) -> String {
    let before = wcc
        .before
        .map(|attr| format!("size {} mtime {}", attr.size, attr.mtime.seconds))
        .unwrap_or_else(|| "-".to_string());
    let after = wcc
        .after
        .as_ref()
        .map(|attr| format!("size {} mtime {}", attr.size, attr.mtime.seconds))
        .unwrap_or_else(|| "-".to_string());
    format!("{} -> {}", before, after)
}

impl fmt::Display for MvOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} -> {}",
            "Renamed".green().bold(),
            self.from.bold(),
            self.to.bold()
        )?;
        writeln!(f, "  {} {}", "source dir:".dimmed(), self.from_dir_handle)?;
        writeln!(f, "    {}", describe_wcc(&self.from_dir_wcc))?;
        writeln!(f, "  {} {}", "target dir:".dimmed(), self.to_dir_handle)?;
        write!(f, "    {}", describe_wcc(&self.to_dir_wcc))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MvError {
    #[error("mv failed: {0}")]
    State(#[from] StateError),

    #[error("rename refused with {status}")]
    Refused {
        status: NfsStatus,
        #[source]
        source: Option<NfsError>,
    },
}

impl crate::cli::op::Op for Mv {
    type Error = MvError;
    type Output = MvOutput;

    fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ExportState::from_config(ctx.config.clone())?;
        let outcome = state.rename(&self.from, &self.to)?;

        if outcome.reply.status != NfsStatus::Ok {
            return Err(MvError::Refused {
                status: outcome.reply.status,
                source: outcome.error,
            });
        }

        Ok(MvOutput {
            from: self.from.clone(),
            to: self.to.clone(),
            from_dir_handle: hex::encode(outcome.from_dir),
            to_dir_handle: hex::encode(outcome.to_dir),
            from_dir_wcc: outcome.reply.from_dir_wcc,
            to_dir_wcc: outcome.reply.to_dir_wcc,
        })
    }
}
