use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;

use herald_core::{EventSink, channel};
use tokio::task::JoinHandle;

use crate::config::Settings;
use crate::engine::{Operation, Scenario, SimulatedEngine};
use crate::render::{RenderSummary, spawn_renderer};

/// Arguments for the `simulate` command
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Operation to simulate
    #[arg(value_enum, default_value_t = Operation::Plan)]
    pub operation: Operation,

    /// Number of generated resources (ignored when --resource is given)
    #[arg(short = 'n', long, default_value_t = 3)]
    pub resources: usize,

    /// Explicit resource name (can be repeated)
    #[arg(long = "resource")]
    pub names: Vec<String>,

    /// Maximum number of concurrent resource operations
    #[arg(short = 'c', long, default_value_t = 4)]
    pub concurrency: usize,

    /// Make the named resource fail (can be repeated)
    #[arg(long)]
    pub fail: Vec<String>,

    /// Make the named resource report a warning (can be repeated)
    #[arg(long)]
    pub warn: Vec<String>,

    /// Simulated provider latency per resource, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub delay_ms: u64,
}

impl SimulateArgs {
    /// Resource names to operate on: explicit names, or `resource-1..=n`.
    pub fn resource_names(&self) -> Vec<String> {
        if self.names.is_empty() {
            (1..=self.resources)
                .map(|i| format!("resource-{}", i))
                .collect()
        } else {
            self.names.clone()
        }
    }

    /// Build the provider scenario, rejecting names that match no resource.
    pub fn scenario(&self, resources: &[String]) -> Result<Scenario> {
        let known: HashSet<&str> = resources.iter().map(String::as_str).collect();
        for (flag, list) in [("--fail", &self.fail), ("--warn", &self.warn)] {
            if let Some(unknown) = list.iter().find(|n| !known.contains(n.as_str())) {
                bail!("Unknown resource '{}' passed to {}", unknown, flag);
            }
        }

        Ok(Scenario {
            fail: self.fail.iter().cloned().collect(),
            warn: self.warn.iter().cloned().collect(),
            delay: Duration::from_millis(self.delay_ms),
        })
    }
}

/// Run a simulated operation and render its event stream.
pub async fn run(args: SimulateArgs, settings: &Settings) -> Result<RenderSummary> {
    let resources = args.resource_names();
    let scenario = args.scenario(&resources)?;

    let (sink, stream) = channel();
    let renderer = spawn_renderer(stream, settings.render);

    let engine = SimulatedEngine::new(args.operation, args.concurrency);
    let outcome = engine.run(&resources, &scenario, &sink).await;

    let (report, summary) = finish_stream(outcome, sink, renderer).await?;
    tracing::debug!(?report, ?summary, "simulation complete");

    Ok(summary)
}

/// Wait for the renderer to flush, even when the engine failed.
///
/// A failed engine may not have reached its cancel, so one is sent here
/// before the renderer is awaited. The engine error wins over a renderer error.
async fn finish_stream<T>(
    outcome: Result<T>,
    sink: EventSink,
    renderer: JoinHandle<Result<RenderSummary>>,
) -> Result<(T, RenderSummary)> {
    if outcome.is_err() && !sink.is_cancelled() {
        sink.cancel();
    }
    drop(sink);

    let rendered = renderer
        .await
        .context("Renderer task panicked")
        .and_then(|summary| summary);
    let report = outcome?;
    Ok((report, rendered?))
}
