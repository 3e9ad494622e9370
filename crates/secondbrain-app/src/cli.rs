//! CLI surface (spec §6): `run`, `check`, `briefing`, `nudge`,
//! `drain-queue`. Grounded on the `clap::Parser`/`Subcommand` derive shape
//! used throughout the pack (e.g. `aigent-app::main::Cli`).

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "secondbrain", version, about = "Personal knowledge-base assistant")]
pub struct Cli {
    /// Path to config.toml. Defaults to ~/.second-brain/config.toml.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start all configured transports, the nudge engine and the briefing loop.
    Run,
    /// Self-test: config parseable, knowledge base reachable.
    Check,
    /// Run the morning briefing once and send it if due.
    Briefing,
    /// Run one nudge scan/dispatch pass.
    Nudge,
    /// Replay the offline queue against the knowledge base.
    DrainQueue,
}
