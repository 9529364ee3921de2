use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::op::{Op, OpContext};
use cli::ops::{Mv, ShowConfig};
use knot_daemon::Config;

#[derive(Parser, Debug)]
#[command(name = "knot", version, about = "Stable NFS file handles over storage backends")]
struct Cli {
    /// Path to knot.toml (defaults are used when omitted)
    #[arg(long, global = true, env = "KNOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Print the effective configuration
    Config(ShowConfig),
    /// Rename a path inside the export
    Mv(Mv),
}

fn run<O: Op>(op: &O, ctx: &OpContext) -> anyhow::Result<()> {
    let output = op.execute(ctx)?;
    println!("{}", output);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = Config::load(args.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ctx = OpContext {
        config_path: args.config,
        config,
    };

    match &args.command {
        Command::Config(op) => run(op, &ctx),
        Command::Mv(op) => run(op, &ctx),
    }
}
