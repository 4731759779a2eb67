use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::Verbosity;

/// Initialize internal logging (channel protocol violations and the like).
///
/// The filter comes from `HERALD_LOG`, then `RUST_LOG`, then defaults to
/// `warn` (`debug` with `--verbose`). Logs go to stderr unless `log_file`
/// is set, in which case they are appended to that file through a
/// non-blocking writer.
///
/// Returns a [`WorkerGuard`] when logging to a file. It **must** be held for
/// the lifetime of the program so buffered records are flushed on shutdown.
pub fn init(verbosity: Verbosity, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = match verbosity {
        Verbosity::Verbose => "debug",
        Verbosity::Normal | Verbosity::Quiet => "warn",
    };
    let env_filter = EnvFilter::try_from_env("HERALD_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = log_file.is_none().then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(env_filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
