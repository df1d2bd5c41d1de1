mod interface;
pub use interface::AsWatch;

use std::os::fd::RawFd;

use nix::errno::Errno;

use crate::{Error, Membership, Result};

#[cfg(any(target_os = "linux", target_os = "android"))]
mod epoll;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use epoll::EpollWatch as Watch;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
mod kqueue;

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub use kqueue::KqueueWatch as Watch;

/// Rejects descriptor values no kernel hands out.
fn check_fd(fd: RawFd, op: Membership) -> Result<()> {
    if fd < 0 {
        return Err(Error::Registration {
            op,
            fd,
            errno: Errno::EBADF,
        });
    }
    Ok(())
}
