//! Binary entry point: tracing/config bootstrap routed through a clap CLI
//! instead of a single always-on gateway process.

mod app;
mod cli;
mod geocoder;
mod transcriber;

use clap::Parser;
use tracing::warn;

use secondbrain_core::config::SecondBrainConfig;

use app::Application;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "secondbrain=info".into()))
        .init();

    let cli = Cli::parse();

    let config = match SecondBrainConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(err) => {
            if matches!(cli.command, Command::Check) {
                eprintln!("config error: {err}");
                std::process::exit(1);
            }
            warn!(%err, "config load failed, using defaults");
            SecondBrainConfig::default()
        }
    };

    let app = match Application::build(config) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("startup failed: {err}");
            std::process::exit(1);
        }
    };

    let exit_code = match cli.command {
        Command::Run => {
            app.run().await?;
            0
        }
        Command::Check => match app.check() {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("check failed: {err}");
                1
            }
        },
        Command::Briefing => match app.briefing_once().await {
            Ok(_) => 0,
            Err(err) => {
                eprintln!("briefing failed: {err}");
                1
            }
        },
        Command::Nudge => match app.nudge_once().await {
            Ok(_) => 0,
            Err(err) => {
                eprintln!("nudge pass failed: {err}");
                1
            }
        },
        Command::DrainQueue => match app.drain_queue() {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(err) => {
                eprintln!("drain-queue failed: {err}");
                1
            }
        },
    };

    std::process::exit(exit_code);
}
