use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use herald_core::Severity;

use crate::commands::simulate::SimulateArgs;

/// herald: render the event stream of a deployment engine
///
/// Runs a simulated plan/apply that reports progress and diagnostics over
/// the herald event channel, and renders the stream to the terminal.
#[derive(Parser, Debug)]
#[command(name = "herald", version, about, long_about = None)]
pub struct Cli {
    /// Increase output verbosity (show debug diagnostics)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (only warnings and errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to a herald.yaml config file (defaults to ./herald.yaml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Hide diagnostics below this severity
    #[arg(long, global = true, value_parser = parse_severity)]
    pub min_severity: Option<Severity>,

    /// When to use terminal colors
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorMode>,

    /// Print every event as a JSON line instead of rendered text
    #[arg(long, global = true)]
    pub json: bool,

    /// Write internal logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Verbosity level resolved from --verbose / --quiet flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// --quiet: only warnings, errors and essential output
    Quiet,
    /// default: normal output
    Normal,
    /// --verbose: debug diagnostics too
    Verbose,
}

impl Cli {
    /// Resolve the verbosity level from CLI flags
    pub fn verbosity(&self) -> Verbosity {
        match (self.quiet, self.verbose) {
            (true, _) => Verbosity::Quiet,
            (_, true) => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }
}

/// Terminal color policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Let `colored` decide from the environment (NO_COLOR, CLICOLOR, ...)
    #[default]
    Auto,
    /// Always emit ANSI colors
    Always,
    /// Never emit ANSI colors
    Never,
}

fn parse_severity(s: &str) -> Result<Severity, String> {
    s.parse::<Severity>().map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulated engine operation and render its event stream
    Simulate(SimulateArgs),

    /// Print the severity levels in ascending order
    Levels,

    /// Generate shell completion scripts
    Completion(CompletionArgs),
}

/// Arguments for the `completion` command
#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_verbosity_resolution() {
        let cli = Cli::parse_from(["herald", "levels"]);
        assert_eq!(cli.verbosity(), Verbosity::Normal);

        let cli = Cli::parse_from(["herald", "--verbose", "levels"]);
        assert_eq!(cli.verbosity(), Verbosity::Verbose);

        let cli = Cli::parse_from(["herald", "levels", "-q"]);
        assert_eq!(cli.verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["herald", "-q", "-v", "levels"]).is_err());
    }

    #[test]
    fn test_min_severity_flag() {
        let cli = Cli::parse_from(["herald", "--min-severity", "WARNING", "levels"]);
        assert_eq!(cli.min_severity, Some(Severity::Warning));

        assert!(Cli::try_parse_from(["herald", "--min-severity", "loud", "levels"]).is_err());
    }
}
