use thiserror::Error;

/// Errors surfaced by the few fallible edges of the event channel.
///
/// Event construction itself is total and never produces one of these.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeraldError {
    /// A severity name did not match any known level.
    #[error("unknown severity '{0}' (expected one of: debug, info, infoerr, warning, error)")]
    UnknownSeverity(String),

    /// The consuming side of the channel has been dropped.
    #[error("event stream receiver has been dropped")]
    ChannelClosed,

    /// An event was emitted after the stream was terminated with `cancel`.
    #[error("event emitted after the stream was cancelled")]
    AfterCancel,
}

pub type Result<T, E = HeraldError> = std::result::Result<T, E>;
