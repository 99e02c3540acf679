//! Command-line arguments.

use clap::{ArgAction, Args, Parser, Subcommand};
use dtz_batch::RequestInput;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "dtz", version, about)]
pub struct Cli {
    /// Configuration file, layered above the user configuration file.
    #[arg(long, global = true, env = "DTZ_CONFIG")]
    pub config: Option<PathBuf>,
    /// More log output on stderr (`-v` debug, `-vv` trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the dates of a range of uploads from their Exif capture time.
    Run(RunArgs),
    /// Show the user the configured credential belongs to.
    Whoami,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// First file of the range: file name, `File:` title or page URL.
    #[arg(long)]
    pub first: Option<String>,
    /// Last file of the range; defaults to the first.
    #[arg(long)]
    pub last: Option<String>,
    /// Time zone the camera clock was set to, e.g. `+0900` or `Asia/Tokyo`.
    #[arg(long)]
    pub camera: Option<String>,
    /// Time zone where the photos were taken.
    #[arg(long)]
    pub location: Option<String>,
    /// Only edit pages whose author field contains this text.
    #[arg(long)]
    pub author: Option<String>,
    /// Only edit files whose camera model contains this text.
    #[arg(long)]
    pub model: Option<String>,
    /// Compute every edit but save nothing.
    #[arg(long)]
    pub dry_run: bool,
}

impl From<RunArgs> for RequestInput {
    fn from(args: RunArgs) -> Self {
        Self {
            first: args.first,
            last: args.last,
            camera: args.camera,
            location: args.location,
            author: args.author,
            model: args.model,
        }
    }
}

impl Cli {
    /// Default log filter when `DTZ_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
