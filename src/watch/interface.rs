//! Contract shared by the kernel-backed watch implementations.
//!
//! Each platform provides exactly one backend, chosen at compile time, and
//! all of them are level-triggered: a descriptor with unread data stays
//! read available on every await until the caller drains it. The notable
//! divergences between the backends are as follows:
//!
//! 1) epoll: regular files and directories are refused on include. A dead
//!           queue handle can not be told apart from other wait failures.
//!           The kernel rotates its ready list, so one event per await is
//!           fair on its own.
//! 2) kqueue: a dead queue handle is reported as [`Error::Closed`](crate::Error::Closed). Up to
//!            two events are read per await, and the watch alternates which
//!            one it reports.
//!
//! Await takes the watch mutably, while include and exclude borrow it
//! shared. Membership changes can therefore not race an await in progress,
//! and neither can close, which consumes the watch.
use std::os::fd::RawFd;

use crate::{Result, Timeout};

pub trait AsWatch: Sized {
    /// Creates a new event queue with an empty watch list.
    fn open() -> Result<Self>;

    /// Adds the file descriptor to the watch list. Duplicates are ignored
    /// silently. Inclusion never blocks.
    fn include_fd(&self, fd: RawFd) -> Result<()>;

    /// Removes the file descriptor from the watch list. Absence is ignored
    /// silently. No await after a successful exclude reports `fd`, even when
    /// the kernel had an event for it queued already.
    fn exclude_fd(&self, fd: RawFd) -> Result<()>;

    /// Blocks until it finds a file descriptor with read available. Bounded
    /// timeouts, including zero for non-blocking, cause an [`Error::Timeout`](crate::Error::Timeout)
    /// on expiry. Signal interruptions are retried within the same bound.
    ///
    /// Exactly one descriptor is reported per call.
    fn await_fd_with_read(&mut self, timeout: Timeout) -> Result<RawFd>;

    /// Releases the event queue. Monitored descriptors are left untouched.
    fn close(self) -> Result<()>;
}
