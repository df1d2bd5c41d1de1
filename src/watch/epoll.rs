use nix::errno::Errno;
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use nix::unistd;
use std::os::fd::{AsRawFd, BorrowedFd, IntoRawFd, RawFd};

use super::{check_fd, AsWatch};
use crate::timeout::{ceil_to_millis, Deadline};
use crate::{Error, Membership, Result, Timeout};

/// Watch list on an epoll(7) instance.
pub struct EpollWatch {
    epoll: Epoll,
    // epoll_wait(2) goes round robin on multiple matches
    event_buffer: [EpollEvent; 1],
}

impl EpollWatch {
    fn epoll_timeout(deadline: &Deadline) -> EpollTimeout {
        match deadline.remaining() {
            None => EpollTimeout::NONE,
            // timeouts round up as they are a minimum guarantee
            Some(left) => EpollTimeout::try_from(ceil_to_millis(left)).unwrap_or(EpollTimeout::MAX),
        }
    }
}

impl AsWatch for EpollWatch {
    fn open() -> Result<Self> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC).map_err(Error::QueueCreate)?;
        tracing::debug!(target: "fdmom::epoll", "opened watch on epoll fd {}", epoll.0.as_raw_fd());
        Ok(Self {
            epoll,
            event_buffer: [EpollEvent::empty(); 1],
        })
    }

    fn include_fd(&self, fd: RawFd) -> Result<()> {
        check_fd(fd, Membership::Include)?;
        // the kernel only reads the number; a stale one yields EBADF
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(fd) };
        let event = EpollEvent::new(EpollFlags::EPOLLIN, fd as u64);
        match self.epoll.add(borrowed_fd, event) {
            Ok(()) => {
                tracing::trace!(target: "fdmom::epoll", "included fd {fd}");
                Ok(())
            }
            Err(Errno::EEXIST) => Ok(()),
            Err(Errno::EPERM) => Err(Error::NotWatchable { fd }),
            Err(errno) => Err(Error::Registration {
                op: Membership::Include,
                fd,
                errno,
            }),
        }
    }

    fn exclude_fd(&self, fd: RawFd) -> Result<()> {
        check_fd(fd, Membership::Exclude)?;
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(fd) };
        match self.epoll.delete(borrowed_fd) {
            Ok(()) => {
                tracing::trace!(target: "fdmom::epoll", "excluded fd {fd}");
                Ok(())
            }
            // not on the list, or closed by its owner which drops it from
            // the list already
            Err(Errno::ENOENT) | Err(Errno::EBADF) => Ok(()),
            // not documented whether this can happen
            Err(Errno::EPERM) => Err(Error::NotWatchable { fd }),
            Err(errno) => Err(Error::Registration {
                op: Membership::Exclude,
                fd,
                errno,
            }),
        }
    }

    fn await_fd_with_read(&mut self, timeout: Timeout) -> Result<RawFd> {
        let deadline = timeout.deadline();
        loop {
            let timeout = Self::epoll_timeout(&deadline);
            match self.epoll.wait(&mut self.event_buffer, timeout) {
                Ok(0) => return Err(Error::Timeout),
                Ok(_) => return Ok(self.event_buffer[0].data() as RawFd),
                Err(Errno::EINTR) => {
                    tracing::trace!(target: "fdmom::epoll", "wait interrupted; retrying");
                    continue;
                }
                Err(errno) => return Err(Error::Wait(errno)),
            }
        }
    }

    fn close(self) -> Result<()> {
        let Epoll(fd) = self.epoll;
        let raw_fd = fd.into_raw_fd();
        unistd::close(raw_fd).map_err(Error::Close)?;
        tracing::debug!(target: "fdmom::epoll", "closed watch on epoll fd {raw_fd}");
        Ok(())
    }
}
