//! Error types shared by events, buses and the dispatcher.
//!
//! Every state-misuse error carries the offending event's identity so the
//! caller can tell which registration was rejected.

use crate::event::{EventId, EventKind};

use std::fmt;
use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The event is in a state that forbids the requested operation.
    PermissionDenied,

    /// The dispatcher has no bus able to accept the event.
    Unsupported,

    /// The readiness poller reported a failure.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::PermissionDenied => write!(f, "permission denied"),
            ErrorKind::Unsupported => write!(f, "unsupported"),
            ErrorKind::Io => write!(f, "i/o error"),
        }
    }
}

/// Errors returned by event setters, buses and the dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// A mutation or a second registration was attempted on a pending event.
    #[error("{kind} event {id} has been added, cannot {action}")]
    Pending {
        id: EventId,
        kind: EventKind,
        action: &'static str,
    },

    /// The event is not registered with the bus it was removed from.
    #[error("{kind} event {id} is not pending")]
    NotPending { id: EventId, kind: EventKind },

    /// A timer event was registered before `set_timeout` was called.
    #[error("timer event {id} has no timeout set")]
    Unarmed { id: EventId },

    /// No bus for this event kind is configured on the dispatcher.
    #[error("no {kind} bus configured for event {id}")]
    Unsupported { id: EventId, kind: EventKind },

    /// The poller failed to register a handle or to wait.
    #[error("poller failure: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Pending { .. } | Error::NotPending { .. } | Error::Unarmed { .. } => {
                ErrorKind::PermissionDenied
            }
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// The event the error was raised for, if any.
    pub fn event(&self) -> Option<EventId> {
        match self {
            Error::Pending { id, .. }
            | Error::NotPending { id, .. }
            | Error::Unarmed { id }
            | Error::Unsupported { id, .. } => Some(*id),
            Error::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misuse_errors_are_permission_denied() {
        let id = EventId::next();

        let pending = Error::Pending {
            id,
            kind: EventKind::Timer,
            action: "set timeout",
        };
        assert_eq!(pending.kind(), ErrorKind::PermissionDenied);
        assert_eq!(pending.event(), Some(id));
        assert_eq!(
            pending.to_string(),
            format!("timer event {id} has been added, cannot set timeout")
        );

        let unarmed = Error::Unarmed { id };
        assert_eq!(unarmed.kind(), ErrorKind::PermissionDenied);
    }

    #[test]
    fn io_errors_carry_no_event() {
        let err = Error::from(io::Error::other("boom"));

        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.event(), None);
    }
}
