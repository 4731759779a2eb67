//! In-process delivery of [`Event`]s from many producers to one consumer.
//!
//! Each producer holds its own [`EventSink`] clone. Events sent through one
//! sink arrive in the order they were emitted; events from different sinks
//! interleave arbitrarily. The stream ends with a single [`Event::Cancel`]:
//! the first cancel wins, everything emitted after it is logged and dropped.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::diag::Color;
use crate::error::{HeraldError, Result};
use crate::events::Event;

/// Create a connected sink/stream pair.
///
/// The channel is unbounded, so emitting never blocks and never applies
/// backpressure to the engine.
pub fn channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    (
        EventSink {
            tx,
            cancelled: cancelled.clone(),
        },
        EventStream {
            rx,
            terminated: false,
        },
    )
}

/// Producer handle. Clone one per concurrent producer.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<Event>,
    /// Shared by every clone so a cancel from any producer closes the stream for all.
    cancelled: Arc<AtomicBool>,
}

impl EventSink {
    /// Send an event, reporting why it could not be delivered.
    ///
    /// A `Cancel` goes through this path too: the first one is delivered,
    /// later ones fail with [`HeraldError::AfterCancel`].
    pub fn try_emit(&self, event: Event) -> Result<()> {
        if event.is_cancel() {
            if self.cancelled.swap(true, Ordering::AcqRel) {
                return Err(HeraldError::AfterCancel);
            }
        } else if self.cancelled.load(Ordering::Acquire) {
            return Err(HeraldError::AfterCancel);
        }

        self.tx.send(event).map_err(|_| HeraldError::ChannelClosed)
    }

    /// Send an event, logging instead of failing.
    ///
    /// A dropped receiver is not an error for the engine (nobody is watching);
    /// emitting after cancel is a producer bug and gets a warning.
    pub fn emit(&self, event: Event) {
        let kind = event.event_type();
        match self.try_emit(event) {
            Ok(()) => {}
            Err(HeraldError::AfterCancel) => {
                tracing::warn!(event = %kind, "dropping event emitted after cancel");
            }
            Err(e) => {
                tracing::trace!(event = %kind, error = %e, "event not delivered");
            }
        }
    }

    /// Terminate the stream.
    ///
    /// Returns `true` if this call delivered the terminating cancel, `false`
    /// if the stream had already been cancelled (the extra cancel is ignored).
    pub fn cancel(&self) -> bool {
        match self.try_emit(Event::cancel()) {
            Ok(()) => true,
            Err(HeraldError::AfterCancel) => {
                tracing::warn!("ignoring repeated cancel");
                false
            }
            // The flag is set even when nobody is listening any more.
            Err(_) => true,
        }
    }

    /// Whether any clone of this sink has cancelled the stream.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn stdout(&self, text: impl fmt::Display, color: impl Into<Color>) {
        self.emit(Event::stdout(text, color));
    }

    pub fn debug(&self, color: impl Into<Color>, text: impl fmt::Display) {
        self.emit(Event::debug(color, text));
    }

    pub fn info(&self, color: impl Into<Color>, text: impl fmt::Display) {
        self.emit(Event::info(color, text));
    }

    pub fn infoerr(&self, color: impl Into<Color>, text: impl fmt::Display) {
        self.emit(Event::infoerr(color, text));
    }

    pub fn warning(&self, color: impl Into<Color>, text: impl fmt::Display) {
        self.emit(Event::warning(color, text));
    }

    pub fn error(&self, color: impl Into<Color>, text: impl fmt::Display) {
        self.emit(Event::error(color, text));
    }
}

/// Consumer handle. Yields events until the terminating cancel.
#[derive(Debug)]
pub struct EventStream {
    rx: UnboundedReceiver<Event>,
    terminated: bool,
}

impl EventStream {
    /// Receive the next event.
    ///
    /// Returns the `Cancel` event once, then `None` forever. Also returns
    /// `None` if every sink was dropped without cancelling.
    pub async fn recv(&mut self) -> Option<Event> {
        if self.terminated {
            return None;
        }

        match self.rx.recv().await {
            Some(event) => {
                if event.is_cancel() {
                    self.terminated = true;
                }
                Some(event)
            }
            None => {
                tracing::debug!("event stream closed without a cancel event");
                None
            }
        }
    }

    /// Whether the terminating cancel has been received.
    pub fn terminated(&self) -> bool {
        self.terminated
    }

    /// Discard events still buffered behind the terminating cancel.
    ///
    /// Each one is a protocol violation by some producer; they are logged and
    /// counted, never rendered. Does nothing before the stream has terminated.
    pub fn drain_after_cancel(&mut self) -> usize {
        if !self.terminated {
            return 0;
        }

        let mut dropped = 0;
        while let Ok(event) = self.rx.try_recv() {
            tracing::warn!(event = %event.event_type(), "ignoring event received after cancel");
            dropped += 1;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Severity;

    #[tokio::test]
    async fn test_single_producer_order_preserved() {
        let (sink, mut stream) = channel();
        sink.info("", "A");
        sink.info("", "B");
        sink.info("", "C");
        assert!(sink.cancel());

        let mut seen = Vec::new();
        while let Some(event) = stream.recv().await {
            seen.push(event);
        }

        assert_eq!(
            seen,
            vec![
                Event::info("", "A"),
                Event::info("", "B"),
                Event::info("", "C"),
                Event::cancel(),
            ]
        );
        assert!(stream.terminated());
    }

    #[tokio::test]
    async fn test_recv_returns_none_after_cancel() {
        let (sink, mut stream) = channel();
        sink.cancel();

        assert_eq!(stream.recv().await, Some(Event::Cancel));
        assert_eq!(stream.recv().await, None);
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn test_emit_after_cancel_is_rejected() {
        let (sink, mut stream) = channel();
        let other = sink.clone();

        assert!(sink.cancel());
        assert!(other.is_cancelled());
        assert_eq!(
            other.try_emit(Event::warning("", "too late")),
            Err(HeraldError::AfterCancel)
        );
        // emit swallows the violation
        other.error("", "also too late");

        assert_eq!(stream.recv().await, Some(Event::Cancel));
        assert_eq!(stream.recv().await, None);
    }

    #[tokio::test]
    async fn test_repeated_cancel_is_ignored() {
        let (sink, mut stream) = channel();
        let other = sink.clone();

        assert!(sink.cancel());
        assert!(!other.cancel());
        assert!(!sink.cancel());

        assert_eq!(stream.recv().await, Some(Event::Cancel));
        drop(sink);
        drop(other);
        assert_eq!(stream.drain_after_cancel(), 0);
    }

    #[tokio::test]
    async fn test_stream_closed_without_cancel() {
        let (sink, mut stream) = channel();
        sink.debug("", "only event");
        drop(sink);

        assert_eq!(stream.recv().await, Some(Event::debug("", "only event")));
        assert_eq!(stream.recv().await, None);
        assert!(!stream.terminated());
    }

    #[tokio::test]
    async fn test_drain_after_cancel_before_termination_is_noop() {
        let (sink, mut stream) = channel();
        sink.info("", "pending");
        assert_eq!(stream.drain_after_cancel(), 0);
        assert_eq!(stream.recv().await, Some(Event::info("", "pending")));
    }

    #[test]
    fn test_try_emit_with_dropped_receiver() {
        let (sink, stream) = channel();
        drop(stream);
        assert_eq!(
            sink.try_emit(Event::info("", "nobody listening")),
            Err(HeraldError::ChannelClosed)
        );
        // Dropped receiver still lets the producer wind down.
        assert!(sink.cancel());
    }

    #[tokio::test]
    async fn test_shorthands_emit_expected_severities() {
        let (sink, mut stream) = channel();
        sink.debug("", "d");
        sink.info("", "i");
        sink.infoerr("", "ie");
        sink.warning("", "w");
        sink.error("", "e");
        sink.stdout("out", "green");
        sink.cancel();

        let mut severities = Vec::new();
        let mut stdout_lines = Vec::new();
        while let Some(event) = stream.recv().await {
            match event {
                Event::Diag(payload) => severities.push(payload.severity),
                Event::StdoutColor(payload) => stdout_lines.push(payload.message),
                Event::Cancel => {}
            }
        }

        assert_eq!(severities, Severity::ALL.to_vec());
        assert_eq!(stdout_lines, vec!["out".to_string()]);
    }
}
