//! Descriptors from listeners and connections.
//!
//! A watch takes plain descriptors. Network objects hand theirs out through
//! the [`Listener`] and [`Conn`] capabilities, and the functions here turn
//! that into a new representative: a duplicate with its own descriptor
//! number. Closing the duplicate does not affect the original, and vice
//! versa. Attempting to change properties of the original through the
//! duplicate may or may not have the desired effect.
use std::any;
use std::net::{TcpListener, TcpStream, UdpSocket};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::net::{UnixDatagram, UnixListener, UnixStream};

use crate::ExtractError;

/// A listener which may grant its file.
pub trait Listener {
    fn filer(&self) -> Option<BorrowedFd<'_>> {
        None
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<Self>()
    }
}

/// A connection which may grant its file, or the connection it wraps such
/// as a TLS session does.
pub trait Conn {
    fn net_conn(&self) -> Option<&dyn Conn> {
        None
    }

    fn filer(&self) -> Option<BorrowedFd<'_>> {
        None
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<Self>()
    }
}

macro_rules! impl_filer {
    ($trait:ident for $($ty:ty),+) => {
        $(
            impl $trait for $ty {
                fn filer(&self) -> Option<BorrowedFd<'_>> {
                    Some(self.as_fd())
                }
            }
        )+
    };
}

impl_filer!(Listener for TcpListener, UnixListener);
impl_filer!(Conn for TcpStream, UnixStream, UdpSocket, UnixDatagram);

/// Returns a new representative of the underlying file from the listener.
pub fn listener_file<L: Listener + ?Sized>(listener: &L) -> Result<OwnedFd, ExtractError> {
    let fd = listener.filer().ok_or_else(|| ExtractError::NoFile {
        kind: "listener",
        type_name: listener.type_name(),
    })?;
    dup(fd)
}

/// Returns a new representative of the underlying file from the connection.
/// A wrapping connection is unwrapped one level first.
pub fn conn_file<C: Conn + ?Sized>(conn: &C) -> Result<OwnedFd, ExtractError> {
    match conn.net_conn() {
        Some(nested) => filer_of(nested),
        None => filer_of(conn),
    }
}

fn filer_of<C: Conn + ?Sized>(conn: &C) -> Result<OwnedFd, ExtractError> {
    let fd = conn.filer().ok_or_else(|| ExtractError::NoFile {
        kind: "connection",
        type_name: conn.type_name(),
    })?;
    dup(fd)
}

fn dup(fd: BorrowedFd<'_>) -> Result<OwnedFd, ExtractError> {
    let owned = fd.try_clone_to_owned()?;
    tracing::trace!("duplicated fd {:?} into {:?}", fd, owned);
    Ok(owned)
}
