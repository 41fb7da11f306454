use clap::{ArgAction, Parser, Subcommand};

use crate::config::Config;

/// Mail a digest of new papers matching your keywords.
///
/// Settings come from flags, the environment or a `.env` file in the working directory.
#[derive(Parser, Debug)]
#[command(name = "paper-digest", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Fetch all sources, mail the new papers and remember them (the default)
    Run,
    /// Fetch all sources and print the new papers without mailing or remembering them
    Check {
        /// Print one JSON object per paper instead of the digest text
        #[arg(long)]
        json: bool,
    },
    /// List the enabled sources and where they are read from
    Sources,
}

impl Cli {
    /// Log filter directive for the verbosity flags, used when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
