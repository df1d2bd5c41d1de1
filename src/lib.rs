//! Supervision over file descriptors: learn which of a set of descriptors
//! has data available to read, blocking with a timeout.
//!
//! The kernel facility is picked at compile time. Linux gets epoll(7), the
//! BSD family and macOS get kqueue(2). Both are exposed as [`Watch`] through
//! the [`AsWatch`] contract, and they differ only where the kernels do:
//!
//! 1) closed queue: kqueue reports a dead queue handle as [`Error::Closed`],
//!    epoll can not tell it apart and reports [`Error::Wait`].
//! 2) file types: epoll refuses regular files and directories with
//!    [`Error::NotWatchable`], kqueue accepts them.
//!
//! Descriptors are borrowed by number only. A [`Watch`] never reads, closes
//! or duplicates what it monitors.
//!
//! ```no_run
//! use fdmom::{AsWatch, Error, Timeout, Watch};
//! use std::os::fd::AsRawFd;
//! use std::time::Duration;
//!
//! let (r, _w) = nix::unistd::pipe()?;
//! let mut watch = Watch::open()?;
//! watch.include_fd(r.as_raw_fd())?;
//! match watch.await_fd_with_read(Timeout::from(Duration::from_millis(50))) {
//!     Ok(fd) => println!("fd {fd} has data"),
//!     Err(Error::Timeout) => println!("nothing yet"),
//!     Err(e) => return Err(e.into()),
//! }
//! watch.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod error;
pub mod extract;
pub mod timeout;
pub mod watch;

pub use error::{Error, ExtractError, Membership};
pub use extract::{conn_file, listener_file, Conn, Listener};
pub use timeout::Timeout;
pub use watch::{AsWatch, Watch};

/// Outcome of the watch operations.
pub type Result<T> = std::result::Result<T, Error>;
