use std::io::{self, Write};

use anyhow::{Context, Result};
use colored::{Color as TermColor, ColoredString, Colorize};
use tokio::task::JoinHandle;

use herald_core::{Color, Event, EventStream, Severity};

/// How the renderer presents the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Diagnostics below this level are filtered out.
    pub min_severity: Severity,
    /// Print one JSON object per event instead of styled text.
    pub json: bool,
    /// Print a warning/error tally once the stream ends.
    pub summary: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            json: false,
            summary: true,
        }
    }
}

/// Which terminal stream a rendered line belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stdout,
    Stderr,
}

/// A single formatted line, ready to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub target: Target,
    pub line: String,
}

/// What the render loop saw over the lifetime of the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Lines actually printed.
    pub rendered: usize,
    /// Diagnostics hidden by the severity filter.
    pub filtered: usize,
    pub warnings: usize,
    pub errors: usize,
    /// Whether the stream ended with a cancel event.
    pub terminated: bool,
    /// Events a producer sent after the cancel; logged and discarded.
    pub dropped_after_cancel: usize,
}

impl RenderSummary {
    /// Count a diagnostic that passed the severity filter.
    fn record(&mut self, event: &Event) {
        match event.severity() {
            Some(Severity::Warning) => self.warnings += 1,
            Some(Severity::Error) => self.errors += 1,
            _ => {}
        }
    }

    /// One-line tally, e.g. `2 warnings, 1 error`.
    pub fn tally(&self) -> String {
        format!(
            "{} {}, {} {}",
            self.warnings,
            plural(self.warnings, "warning"),
            self.errors,
            plural(self.errors, "error"),
        )
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

/// Map an opaque color tag onto terminal styling.
///
/// Unknown tags render unstyled; the tag is a hint, never an error.
fn term_color(tag: &str) -> Option<TermColor> {
    let color = match tag {
        "black" => TermColor::Black,
        "red" => TermColor::Red,
        "green" => TermColor::Green,
        "yellow" => TermColor::Yellow,
        "blue" => TermColor::Blue,
        "magenta" => TermColor::Magenta,
        "cyan" => TermColor::Cyan,
        "white" => TermColor::White,
        "bright-black" => TermColor::BrightBlack,
        "bright-red" => TermColor::BrightRed,
        "bright-green" => TermColor::BrightGreen,
        "bright-yellow" => TermColor::BrightYellow,
        "bright-blue" => TermColor::BrightBlue,
        "bright-magenta" => TermColor::BrightMagenta,
        "bright-cyan" => TermColor::BrightCyan,
        "bright-white" => TermColor::BrightWhite,
        _ => return None,
    };
    Some(color)
}

/// Apply a color tag to a message.
fn styled(message: &str, color: &Color) -> ColoredString {
    let tag = color.as_str().trim().to_ascii_lowercase();
    match tag.as_str() {
        "bold" => message.bold(),
        "dimmed" => message.dimmed(),
        other => match term_color(other) {
            Some(c) => message.color(c),
            None => message.normal(),
        },
    }
}

/// Format one event for display.
///
/// Returns `Ok(None)` when the event produces no output: a diagnostic below
/// the severity threshold, or the cancel sentinel in text mode.
pub fn format_event(event: &Event, opts: &RenderOptions) -> Result<Option<Rendered>> {
    if let Some(severity) = event.severity()
        && severity < opts.min_severity
    {
        return Ok(None);
    }

    if opts.json {
        let line = serde_json::to_string(event).context("Failed to serialize event")?;
        return Ok(Some(Rendered {
            target: Target::Stdout,
            line,
        }));
    }

    let rendered = match event {
        Event::Cancel => return Ok(None),
        Event::StdoutColor(payload) => Rendered {
            target: Target::Stdout,
            line: styled(&payload.message, &payload.color).to_string(),
        },
        Event::Diag(payload) => {
            let message = styled(&payload.message, &payload.color);
            let line = match payload.severity {
                Severity::Debug => format!("{} {}", "DEBUG".dimmed(), message),
                Severity::Info | Severity::Infoerr => message.to_string(),
                Severity::Warning => format!("{} {}", "WARNING:".yellow().bold(), message),
                Severity::Error => format!("{} {}", "ERROR:".red().bold(), message),
            };
            let target = if payload.severity.prefers_stderr() {
                Target::Stderr
            } else {
                Target::Stdout
            };
            Rendered { target, line }
        }
    };

    Ok(Some(rendered))
}

/// Spawn the render loop on its own task, printing to stdout and stderr.
///
/// The task runs until the stream yields its cancel (or every sink is
/// dropped), then returns what it saw.
pub fn spawn_renderer(
    stream: EventStream,
    opts: RenderOptions,
) -> JoinHandle<Result<RenderSummary>> {
    tokio::spawn(async move {
        let mut out = io::stdout();
        let mut err = io::stderr();
        render_loop(stream, opts, &mut out, &mut err).await
    })
}

/// Where rendered lines go. Once a reader hangs up, nothing more is written.
struct Output<'a, O, E> {
    out: &'a mut O,
    err: &'a mut E,
    closed: bool,
}

impl<O: Write, E: Write> Output<'_, O, E> {
    /// Write one line. A broken pipe means the reader went away: output
    /// stops but the caller keeps consuming the stream.
    fn line(&mut self, target: Target, line: &str) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let written = match target {
            Target::Stdout => writeln!(self.out, "{}", line),
            Target::Stderr => writeln!(self.err, "{}", line),
        };

        match written {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("output closed by reader, rendering stops");
                self.closed = true;
                Ok(())
            }
            Err(e) => Err(e).context("Failed to write rendered event"),
        }
    }
}

/// Internal render loop that processes events and produces terminal output.
async fn render_loop<O: Write, E: Write>(
    mut stream: EventStream,
    opts: RenderOptions,
    out: &mut O,
    err: &mut E,
) -> Result<RenderSummary> {
    let mut output = Output {
        out,
        err,
        closed: false,
    };
    let mut summary = RenderSummary::default();

    while let Some(event) = stream.recv().await {
        match format_event(&event, &opts)? {
            Some(Rendered { target, line }) => {
                summary.record(&event);
                output.line(target, &line)?;
                if !output.closed {
                    summary.rendered += 1;
                }
            }
            None => {
                if event.severity().is_some() {
                    summary.filtered += 1;
                }
            }
        }
    }

    summary.terminated = stream.terminated();
    summary.dropped_after_cancel = stream.drain_after_cancel();

    if opts.summary && !opts.json {
        let tally = summary.tally();
        let (target, tally) = if summary.errors > 0 {
            (Target::Stderr, tally.red())
        } else if summary.warnings > 0 {
            (Target::Stderr, tally.yellow())
        } else {
            (Target::Stdout, tally.dimmed())
        };
        output.line(target, &format!("\n{} {}", "Diagnostics:".bold(), tally))?;
    }

    Ok(summary)
}
