//! Typed event notifications for a long-running deployment engine.
//!
//! Engine internals build [`Event`] values with the constructors on
//! [`Event`] (or the shorthands on [`EventSink`]) and push them through a
//! [`channel`]. A single consumer reads the [`EventStream`] until the
//! terminating [`Event::Cancel`] and renders each event by its tag.

pub mod channel;
pub mod diag;
pub mod error;
pub mod events;

pub use channel::{EventSink, EventStream, channel};
pub use diag::{Color, Severity};
pub use error::{HeraldError, Result};
pub use events::{DiagEventPayload, Event, EventType, StdoutEventPayload};
