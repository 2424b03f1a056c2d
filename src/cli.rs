//! Command-line interface for the dist dialect elimination driver.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use dist_elim::{AllReduceLowering, ElimConfig};

#[derive(Parser)]
#[command(name = "dist-opt")]
#[command(about = "Eliminate the dist dialect from textual IR", long_about = None)]
pub struct Cli {
    /// Input IR file. Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,

    /// Write the rewritten IR here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How to lower `dist.all_reduce`: cast, forward or trace-call.
    #[arg(long, default_value = "cast")]
    pub all_reduce: AllReduceLowering,

    /// Skip IR validation before and after the pass.
    #[arg(long)]
    pub no_verify: bool,

    /// Raise log verbosity (-v debug, -vv trace). Overrides RUST_LOG.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn verify(&self) -> bool {
        !self.no_verify
    }

    pub fn elim_config(&self) -> ElimConfig {
        ElimConfig::new()
            .with_all_reduce(self.all_reduce)
            .with_verify_after_commit(self.verify())
    }

    /// The input path, or `None` for stdin.
    pub fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().filter(|p| p.as_os_str() != "-")
    }
}
