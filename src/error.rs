//! Error taxonomy of the watch and of descriptor extraction.
use std::io;
use std::os::fd::RawFd;

use nix::errno::Errno;
use thiserror::Error;

/// Membership operation which a registration error originates from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Membership {
    Include,
    Exclude,
}

impl std::fmt::Display for Membership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Include => f.write_str("include"),
            Self::Exclude => f.write_str("exclude"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// The kernel denied the event queue, e.g. on descriptor exhaustion.
    #[error("no watch due to event queue creation error: {0}")]
    QueueCreate(#[source] Errno),

    /// Release of the event queue failed. Not retried.
    #[error("watch stuck on close of its event queue: {0}")]
    Close(#[source] Errno),

    /// The descriptor's file type can not be watched on this platform, such
    /// as regular files and directories with epoll(7).
    #[error("file type of fd {fd} not suitable for watch")]
    NotWatchable { fd: RawFd },

    #[error("watch {op} of fd {fd} denied: {errno}")]
    Registration {
        op: Membership,
        fd: RawFd,
        #[source]
        errno: Errno,
    },

    /// No descriptor got read available within the time bound.
    #[error("await interrupted by timeout")]
    Timeout,

    /// The event queue handle was no longer valid.
    #[error("watch event queue is closed")]
    Closed,

    #[error("watch unavailable due to wait error: {0}")]
    Wait(#[source] Errno),
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Originating OS error code, if any.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::QueueCreate(errno)
            | Self::Close(errno)
            | Self::Registration { errno, .. }
            | Self::Wait(errno) => Some(*errno),
            Self::Closed => Some(Errno::EBADF),
            Self::NotWatchable { .. } | Self::Timeout => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Timeout => io::Error::new(io::ErrorKind::TimedOut, err),
            Error::NotWatchable { .. } => io::Error::new(io::ErrorKind::Unsupported, err),
            err => match err.errno() {
                Some(errno) => io::Error::new(io::Error::from(errno).kind(), err),
                None => io::Error::other(err),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    /// Neither a file nor a nested connection is granted by the object.
    #[error("{kind} {type_name} does not provide its file")]
    NoFile {
        kind: &'static str,
        type_name: &'static str,
    },

    #[error("file descriptor duplication failed: {0}")]
    Dup(#[from] io::Error),
}
