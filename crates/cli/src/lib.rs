//! sicheck CLI -- generate transactional histories and check them for
//! snapshot isolation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sicheck_core::config::CheckerConfig;

pub mod dot;

#[derive(Debug, Parser)]
#[command(
    name = "sicheck",
    about = "Offline snapshot isolation checking for transactional histories"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate random transactional histories
    Generate(GenerateArgs),
    /// Check snapshot isolation of recorded histories
    Verify(VerifyArgs),
}

#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Number of histories to generate
    #[arg(long)]
    pub n_hist: u64,
    /// Number of sessions
    #[arg(long)]
    pub n_session: u64,
    /// Number of keys
    #[arg(long)]
    pub n_key: u64,
    /// Number of transactions per session
    #[arg(long)]
    pub n_txn: u64,
    /// Number of events per transaction
    #[arg(long)]
    pub n_evt: u64,
    /// Output directory for generated history files
    #[arg(long)]
    pub output_dir: PathBuf,
}

#[derive(Debug, Parser)]
pub struct VerifyArgs {
    /// Input directory containing history JSON files
    #[arg(long)]
    pub input_dir: PathBuf,
    /// Emit one constraint per key and reader instead of one per
    /// conflicting pair
    #[arg(long)]
    pub no_coalesce: bool,
    /// Skip the reachability pruning pass
    #[arg(long)]
    pub no_prune: bool,
    /// Fraction of constraints below which a pruning round stops the loop
    #[arg(long, default_value_t = 0.01)]
    pub stop_threshold: f64,
    /// Render rejection witnesses as Graphviz dot
    #[arg(long)]
    pub dot: bool,
    /// Print witness details on FAIL
    #[arg(long)]
    pub verbose: bool,
}

impl VerifyArgs {
    #[must_use]
    pub fn checker_config(&self) -> CheckerConfig {
        CheckerConfig::builder()
            .coalesce_constraints(!self.no_coalesce)
            .enable_pruning(!self.no_prune)
            .stop_threshold(self.stop_threshold)
            .build()
    }
}
