use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tokio::sync::Semaphore;

use herald_core::{Color, EventSink};

/// Engine operation being simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Operation {
    /// Compute changes without applying them
    #[default]
    Plan,
    /// Apply changes to every resource
    Apply,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Operation::Plan => "planning",
            Operation::Apply => "creating",
        }
    }

    fn past(self) -> &'static str {
        match self {
            Operation::Plan => "planned",
            Operation::Apply => "created",
        }
    }

    fn step_color(self) -> Color {
        match self {
            Operation::Plan => Color::new("cyan"),
            Operation::Apply => Color::new("green"),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Plan => "plan",
            Operation::Apply => "apply",
        })
    }
}

/// A resource step line, rendered lazily by the event constructor.
struct StepLine<'a> {
    op: Operation,
    resource: &'a str,
}

impl fmt::Display for StepLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Operation::Plan => write!(f, "+ {} (will be created)", self.resource),
            Operation::Apply => write!(f, "+ create {}", self.resource),
        }
    }
}

/// Per-resource behavior of the simulated provider.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    /// Resources whose step fails with an error diagnostic.
    pub fail: HashSet<String>,
    /// Resources that report a warning but still succeed.
    pub warn: HashSet<String>,
    /// Simulated provider latency per resource.
    pub delay: Duration,
}

/// Outcome of one simulated operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Simulated deployment engine that walks resources concurrently and reports
/// through an [`EventSink`].
pub struct SimulatedEngine {
    /// Maximum concurrent resource operations
    concurrency: usize,
    op: Operation,
}

impl SimulatedEngine {
    pub fn new(op: Operation, concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            op,
        }
    }

    /// Run the operation over `resources` and terminate the stream.
    ///
    /// Each resource gets its own producer task holding a sink clone, so its
    /// events arrive in order while different resources interleave. Once
    /// every task has finished the engine emits a summary and the single
    /// cancel event.
    pub async fn run(
        &self,
        resources: &[String],
        scenario: &Scenario,
        sink: &EventSink,
    ) -> Result<EngineReport> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let failed = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        sink.info(
            "bold",
            format!("Starting {} of {} resource(s)", self.op, resources.len()),
        );

        let mut handles = Vec::new();

        for name in resources {
            let sem = semaphore.clone();
            let failed = failed.clone();
            let sink = sink.clone();
            let op = self.op;
            let name = name.clone();
            let fails = scenario.fail.contains(&name);
            let warns = scenario.warn.contains(&name);
            let delay = scenario.delay;

            let handle = tokio::spawn(async move {
                // safety: the semaphore is never closed, so acquire always succeeds
                let _permit = sem.acquire().await.expect("semaphore closed unexpectedly");

                sink.debug("", format!("{}: {}", name, op.verb()));
                sink.stdout(
                    StepLine {
                        op,
                        resource: &name,
                    },
                    op.step_color(),
                );

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                if warns {
                    sink.warning(
                        "yellow",
                        format!("{}: property 'acl' is deprecated and will be ignored", name),
                    );
                }

                if fails {
                    sink.error("red", format!("{}: provider returned an error", name));
                    failed.fetch_add(1, Ordering::Relaxed);
                } else {
                    sink.info("", format!("{}: {}", name, op.past()));
                }
            });

            handles.push(handle);
        }

        for handle in handles {
            handle.await.context("Resource task panicked")?;
        }

        let failed = failed.load(Ordering::Relaxed);
        let report = EngineReport {
            succeeded: resources.len() - failed,
            failed,
        };

        if report.failed > 0 {
            sink.infoerr(
                "",
                format!(
                    "{} of {} resource(s) failed; see errors above",
                    report.failed,
                    resources.len()
                ),
            );
        }
        sink.info(
            "bold",
            format!(
                "{} finished: {} succeeded, {} failed ({:.1}s)",
                self.op,
                report.succeeded,
                report.failed,
                start.elapsed().as_secs_f64()
            ),
        );
        sink.cancel();

        tracing::debug!(
            op = %self.op,
            succeeded = report.succeeded,
            failed = report.failed,
            "simulated operation finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::{Event, Severity, channel};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn collect(mut stream: herald_core::EventStream) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = stream.recv().await {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_step_line_display() {
        let plan = StepLine {
            op: Operation::Plan,
            resource: "bucket",
        };
        assert_eq!(plan.to_string(), "+ bucket (will be created)");
        let apply = StepLine {
            op: Operation::Apply,
            resource: "bucket",
        };
        assert_eq!(apply.to_string(), "+ create bucket");
    }

    #[tokio::test]
    async fn test_run_ends_with_single_cancel() {
        let (sink, stream) = channel();
        let engine = SimulatedEngine::new(Operation::Apply, 2);
        let report = engine
            .run(&names(&["a", "b", "c"]), &Scenario::default(), &sink)
            .await
            .expect("engine should run");
        drop(sink);

        assert_eq!(
            report,
            EngineReport {
                succeeded: 3,
                failed: 0
            }
        );

        let events = collect(stream).await;
        assert_eq!(events.last(), Some(&Event::Cancel));
        assert_eq!(events.iter().filter(|e| e.is_cancel()).count(), 1);
    }

    #[tokio::test]
    async fn test_per_resource_events_in_order() {
        let (sink, stream) = channel();
        let scenario = Scenario {
            warn: ["b".to_string()].into_iter().collect(),
            ..Scenario::default()
        };
        SimulatedEngine::new(Operation::Plan, 4)
            .run(&names(&["a", "b"]), &scenario, &sink)
            .await
            .expect("engine should run");

        let events = collect(stream).await;
        let for_b: Vec<&Event> = events
            .iter()
            .filter(|e| {
                e.message()
                    .is_some_and(|m| m.starts_with("b:") || m.starts_with("+ b "))
            })
            .collect();

        assert_eq!(for_b[0], &Event::debug("", "b: planning"));
        assert_eq!(for_b[1], &Event::stdout("+ b (will be created)", "cyan"));
        assert_eq!(for_b[2].severity(), Some(Severity::Warning));
        assert_eq!(for_b[3], &Event::info("", "b: planned"));
    }

    #[tokio::test]
    async fn test_failures_reported() {
        let (sink, stream) = channel();
        let scenario = Scenario {
            fail: ["db".to_string()].into_iter().collect(),
            ..Scenario::default()
        };
        let report = SimulatedEngine::new(Operation::Apply, 1)
            .run(&names(&["web", "db"]), &scenario, &sink)
            .await
            .expect("engine should run");
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded, 1);

        let events = collect(stream).await;
        assert!(events.contains(&Event::error("red", "db: provider returned an error")));
        assert!(
            events
                .iter()
                .any(|e| e.severity() == Some(Severity::Infoerr))
        );
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let (sink, stream) = channel();
        let report = SimulatedEngine::new(Operation::Plan, 0)
            .run(&names(&["only"]), &Scenario::default(), &sink)
            .await
            .expect("engine should run");
        assert_eq!(report.succeeded, 1);
        assert!(collect(stream).await.iter().any(|e| e.is_cancel()));
    }
}
