use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HeraldError;

/// Importance of a diagnostic message.
///
/// Levels are totally ordered by [`Severity::rank`]:
/// `Debug < Info < Infoerr < Warning < Error`. Consumers use the ordering to
/// filter ("only show Warning and above"); the core never filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Verbose tracing output, hidden by default.
    Debug,
    /// Informational output.
    Info,
    /// Informational output that belongs on an error-like stream (stderr).
    ///
    /// A presentation hint only: it does not indicate a failure.
    Infoerr,
    /// Something looks wrong but the operation continues.
    Warning,
    /// The operation (or part of it) failed.
    Error,
}

impl Severity {
    /// Every level, lowest first.
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Infoerr,
        Severity::Warning,
        Severity::Error,
    ];

    /// Explicit ordinal used for ordering. Higher is more severe.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Debug => 0,
            Severity::Info => 1,
            Severity::Infoerr => 2,
            Severity::Warning => 3,
            Severity::Error => 4,
        }
    }

    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Infoerr => "infoerr",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Whether messages at this level should go to an error-like stream.
    pub fn prefers_stderr(self) -> bool {
        matches!(self, Severity::Infoerr | Severity::Warning | Severity::Error)
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = HeraldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Severity::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| HeraldError::UnknownSeverity(s.to_string()))
    }
}

/// Opaque presentation tag attached to every message.
///
/// The event model carries the tag to the consumer unchanged. It never
/// interprets or validates it; that is the renderer's business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The tag with no styling request attached.
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when no tag was supplied.
    pub fn is_plain(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for Color {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}
