use crate::event::RawHandle;

use std::ops::BitOr;

/// The readiness a handle is watched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub const NONE: Interest = Interest {
        read: false,
        write: false,
    };

    pub const READ: Interest = Interest {
        read: true,
        write: false,
    };

    pub const WRITE: Interest = Interest {
        read: false,
        write: true,
    };

    pub fn is_empty(self) -> bool {
        !self.read && !self.write
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, other: Interest) -> Interest {
        Interest {
            read: self.read || other.read,
            write: self.write || other.write,
        }
    }
}

/// Readiness reported by a poller for one handle.
///
/// A single report may carry both directions; errors and hang-ups are
/// folded into them so waiters get a chance to observe the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub handle: RawHandle,
    pub readable: bool,
    pub writable: bool,
}

impl Readiness {
    pub fn readable(handle: RawHandle) -> Self {
        Self {
            handle,
            readable: true,
            writable: false,
        }
    }

    pub fn writable(handle: RawHandle) -> Self {
        Self {
            handle,
            readable: false,
            writable: true,
        }
    }

    /// Whether this report satisfies `interest` in any direction.
    pub fn matches(&self, interest: Interest) -> bool {
        (interest.read && self.readable) || (interest.write && self.writable)
    }
}
