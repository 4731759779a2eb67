use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diag::{Color, Severity};

/// Events emitted by the engine while an operation (plan/apply) executes.
///
/// Each variant owns the payload that belongs to its tag, so a `diag` event
/// can never carry a stdout payload and a `cancel` can never carry one at all.
/// Producers build events through the constructors below; consumers `match`
/// exhaustively and get a compile error when a new kind is added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    /// The stream is ending. No further events follow.
    Cancel,
    /// A plain output line with a presentation color.
    StdoutColor(StdoutEventPayload),
    /// A diagnostic line with a severity.
    Diag(DiagEventPayload),
}

/// The discriminant of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Cancel,
    StdoutColor,
    Diag,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Cancel => "cancel",
            EventType::StdoutColor => "stdout-color",
            EventType::Diag => "diag",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `diag` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagEventPayload {
    pub severity: Severity,
    pub color: Color,
    pub message: String,
}

/// Payload of a `stdout-color` event. Implicitly informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdoutEventPayload {
    pub color: Color,
    pub message: String,
}

impl Event {
    /// Terminating sentinel.
    pub fn cancel() -> Self {
        Event::Cancel
    }

    /// A stdout line. `text` is rendered with its `Display` impl at
    /// construction, so structured values can format themselves.
    pub fn stdout(text: impl fmt::Display, color: impl Into<Color>) -> Self {
        Event::StdoutColor(StdoutEventPayload {
            color: color.into(),
            message: text.to_string(),
        })
    }

    /// A diagnostic at an explicit severity.
    pub fn diag(severity: Severity, color: impl Into<Color>, text: impl fmt::Display) -> Self {
        Event::Diag(DiagEventPayload {
            severity,
            color: color.into(),
            message: text.to_string(),
        })
    }

    pub fn debug(color: impl Into<Color>, text: impl fmt::Display) -> Self {
        Self::diag(Severity::Debug, color, text)
    }

    pub fn info(color: impl Into<Color>, text: impl fmt::Display) -> Self {
        Self::diag(Severity::Info, color, text)
    }

    pub fn infoerr(color: impl Into<Color>, text: impl fmt::Display) -> Self {
        Self::diag(Severity::Infoerr, color, text)
    }

    pub fn warning(color: impl Into<Color>, text: impl fmt::Display) -> Self {
        Self::diag(Severity::Warning, color, text)
    }

    pub fn error(color: impl Into<Color>, text: impl fmt::Display) -> Self {
        Self::diag(Severity::Error, color, text)
    }

    /// The tag of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            Event::Cancel => EventType::Cancel,
            Event::StdoutColor(_) => EventType::StdoutColor,
            Event::Diag(_) => EventType::Diag,
        }
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, Event::Cancel)
    }

    /// Severity of a `diag` event. Stdout lines and cancels have none.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Event::Diag(payload) => Some(payload.severity),
            Event::Cancel | Event::StdoutColor(_) => None,
        }
    }

    /// Message text, if the event carries any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Event::Cancel => None,
            Event::StdoutColor(payload) => Some(&payload.message),
            Event::Diag(payload) => Some(&payload.message),
        }
    }

    /// Color tag, if the event carries one.
    pub fn color(&self) -> Option<&Color> {
        match self {
            Event::Cancel => None,
            Event::StdoutColor(payload) => Some(&payload.color),
            Event::Diag(payload) => Some(&payload.color),
        }
    }
}
