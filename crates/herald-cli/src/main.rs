mod cli;
mod commands;
mod config;
mod engine;
mod logging;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbosity = cli.verbosity();

    // `completion` needs no config or logging, so handle it early
    if let Commands::Completion(args) = &cli.command {
        clap_complete::generate(
            args.shell,
            &mut <Cli as clap::CommandFactory>::command(),
            "herald",
            &mut std::io::stdout(),
        );
        return Ok(());
    }

    // Held until exit so file logs are flushed.
    let _log_guard = match logging::init(verbosity, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "ERROR".red().bold(), e);
            std::process::exit(1);
        }
    };

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {:#}", "ERROR".red().bold(), e);
            std::process::exit(1);
        }
    };
    settings.apply_color();

    let result = match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args, &settings)
            .await
            .map(|summary| {
                tracing::debug!(
                    rendered = summary.rendered,
                    filtered = summary.filtered,
                    "render loop finished"
                );
                if !summary.terminated {
                    tracing::warn!("event stream ended without a cancel event");
                }
                if summary.dropped_after_cancel > 0 {
                    tracing::warn!(
                        dropped = summary.dropped_after_cancel,
                        "producers emitted events after cancel"
                    );
                }
            }),
        Commands::Levels => {
            commands::levels::run(settings.render.min_severity);
            Ok(())
        }
        Commands::Completion(_) => unreachable!("completion handled above"),
    };

    if let Err(e) = result {
        eprintln!("\n{} {:#}", "FAILED".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

/// Load the config file and merge CLI flags over it.
fn load_settings(cli: &Cli) -> Result<config::Settings> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let file_config = config::load_config(cli.config.as_deref(), &cwd)?;
    Ok(config::Settings::resolve(cli, &file_config))
}
