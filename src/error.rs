use crate::frame::FrameNumber;
use std::fmt;



#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    // Frame sequencing
    SequenceGap { expected: FrameNumber, observed: FrameNumber },
    SequenceMismatch { expected: FrameNumber, observed: FrameNumber },

    // Event dispatch
    UnknownEvent(i64),

    // Session plumbing
    SessionClosed,
    ThreadPanicked,

    Config(String)
}

impl Error {
    /// Whether the session that produced this error has to stop acquiring.
    ///
    /// `SequenceMismatch` counts as fatal, but the monitor only returns it
    /// when `strict_image_sequence` is set; otherwise a lost image is just a
    /// [`Warning`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::SequenceGap { .. } | Error::SequenceMismatch { .. })
    }
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;

        match self {
            SequenceGap { expected, observed } => write!(
                fmt, "an exposure end event has been lost: expected frame {expected} but got frame {observed}"
            ),
            SequenceMismatch { expected, observed } => write!(
                fmt, "an image has been lost: expected frame {expected} but got frame {observed}"
            ),
            UnknownEvent(id) => write!(fmt, "no handler registered for camera event id {id}"),
            SessionClosed => write!(fmt, "capture session already stopped"),
            ThreadPanicked => write!(fmt, "event delivery thread panicked"),
            Config(msg) => write!(fmt, "invalid configuration: {msg}")
        }
    }
}



/// Problems that are worth recording but don't stop a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Warning {
    SequenceMismatch { expected: FrameNumber, observed: FrameNumber }
}

impl Warning {
    pub fn into_error(self) -> Error {
        match self {
            Warning::SequenceMismatch { expected, observed } => {
                Error::SequenceMismatch { expected, observed }
            }
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SequenceMismatch { expected, observed } => write!(
                fmt, "image sequence mismatch: expected frame {expected} but got frame {observed}"
            )
        }
    }
}
