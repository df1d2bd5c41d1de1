use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::ptr;

use nix::errno::Errno;
use nix::libc;
use nix::unistd;

use super::{check_fd, AsWatch};
use crate::timeout::Deadline;
use crate::{Error, Membership, Result, Timeout};

// zero value indicates an immediate timeout
const NO_TIME_WAIT: libc::timespec = unsafe { mem::zeroed() };

/// Watch list on a kqueue(2) instance.
pub struct KqueueWatch {
    kq: OwnedFd,
    // flips whenever two events are read at once
    round_robin: bool,
}

impl KqueueWatch {
    fn read_change(fd: RawFd, flags: u32) -> libc::kevent {
        let mut ev: libc::kevent = unsafe { mem::zeroed() };
        ev.ident = fd as _;
        ev.filter = libc::EVFILT_READ as _;
        ev.flags = flags as _;
        ev
    }

    /// Applies a single change on `fd` and returns the error the kernel
    /// reported for that change, if any.
    fn submit(&self, fd: RawFd, flags: u32, op: Membership) -> Result<Option<Errno>> {
        let changelist = [Self::read_change(fd, flags)];
        let mut eventlist: [libc::kevent; 1] = unsafe { mem::zeroed() };

        let n = unsafe {
            libc::kevent(
                self.kq.as_raw_fd(),
                changelist.as_ptr(),
                changelist.len() as _,
                eventlist.as_mut_ptr(),
                eventlist.len() as _,
                &NO_TIME_WAIT,
            )
        };
        if n == -1 {
            return match Errno::last() {
                // "When kevent() call fails with EINTR error, all changes in
                // the changelist have been applied."
                // ―the System Calls Manual from FreeBSD
                Errno::EINTR => Ok(None),
                Errno::EBADF => Err(Error::Closed),
                errno => Err(Error::Registration { op, fd, errno }),
            };
        }

        let ev = &eventlist[0];
        if n != 0 && ev.ident == fd as libc::uintptr_t && (ev.flags & libc::EV_ERROR as _) != 0 {
            return Ok(Some(Errno::from_raw(ev.data as i32)));
        }
        Ok(None)
    }

    fn timespec(deadline: &Deadline) -> Option<libc::timespec> {
        deadline.remaining().map(|left| libc::timespec {
            tv_sec: libc::time_t::try_from(left.as_secs()).unwrap_or(libc::time_t::MAX),
            tv_nsec: left.subsec_nanos() as _,
        })
    }
}

impl AsWatch for KqueueWatch {
    fn open() -> Result<Self> {
        let kq_fd = unsafe { libc::kqueue() };
        if kq_fd == -1 {
            return Err(Error::QueueCreate(Errno::last()));
        }
        let kq = unsafe { OwnedFd::from_raw_fd(kq_fd) };
        tracing::debug!(target: "fdmom::kqueue", "opened watch on kqueue fd {kq_fd}");
        Ok(Self {
            kq,
            round_robin: false,
        })
    }

    fn include_fd(&self, fd: RawFd) -> Result<()> {
        check_fd(fd, Membership::Include)?;
        // EV_ADD on a present filter only modifies it
        match self.submit(fd, libc::EV_ADD as u32, Membership::Include)? {
            None => {
                tracing::trace!(target: "fdmom::kqueue", "included fd {fd}");
                Ok(())
            }
            Some(errno) => Err(Error::Registration {
                op: Membership::Include,
                fd,
                errno,
            }),
        }
    }

    fn exclude_fd(&self, fd: RawFd) -> Result<()> {
        check_fd(fd, Membership::Exclude)?;
        match self.submit(fd, libc::EV_DELETE as u32, Membership::Exclude)? {
            None => {
                tracing::trace!(target: "fdmom::kqueue", "excluded fd {fd}");
                Ok(())
            }
            // not on the list, or closed by its owner which removes the
            // filter already
            Some(Errno::ENOENT) | Some(Errno::EBADF) => Ok(()),
            Some(errno) => Err(Error::Registration {
                op: Membership::Exclude,
                fd,
                errno,
            }),
        }
    }

    fn await_fd_with_read(&mut self, timeout: Timeout) -> Result<RawFd> {
        let deadline = timeout.deadline();

        // When two events are read, then pick one in round-robin to prevent
        // a single descriptor from consuming all attention.
        let mut eventlist: [libc::kevent; 2] = unsafe { mem::zeroed() };
        let n = loop {
            let ts = Self::timespec(&deadline);
            let tsp = ts.as_ref().map_or(ptr::null(), |ts| ts as *const libc::timespec);
            let n = unsafe {
                libc::kevent(
                    self.kq.as_raw_fd(),
                    ptr::null(),
                    0,
                    eventlist.as_mut_ptr(),
                    eventlist.len() as _,
                    tsp,
                )
            };
            if n != -1 {
                break n;
            }
            match Errno::last() {
                Errno::EINTR => {
                    tracing::trace!(target: "fdmom::kqueue", "wait interrupted; retrying");
                }
                Errno::EBADF => return Err(Error::Closed),
                errno => return Err(Error::Wait(errno)),
            }
        };

        match n {
            0 => Err(Error::Timeout),
            1 => Ok(eventlist[0].ident as RawFd),
            _ => {
                self.round_robin = !self.round_robin;
                Ok(eventlist[self.round_robin as usize].ident as RawFd)
            }
        }
    }

    fn close(self) -> Result<()> {
        let raw_fd = self.kq.into_raw_fd();
        match unistd::close(raw_fd) {
            // released through another path already
            Ok(()) | Err(Errno::EBADF) => {
                tracing::debug!(target: "fdmom::kqueue", "closed watch on kqueue fd {raw_fd}");
                Ok(())
            }
            Err(errno) => Err(Error::Close(errno)),
        }
    }
}
