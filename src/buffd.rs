//! An owned file descriptor with a co-located buffer attached.
//!
//! The watch hands out bare descriptor numbers. Bundling the descriptor with
//! its read buffer lets the drain loop go from a number to the bytes in one
//! lookup, and the buffer lives exactly as long as the descriptor does.
use nix::errno::Errno;

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

#[derive(Debug)]
pub struct BufFd {
    fd: OwnedFd,
    buffer: Box<[u8]>,
    curr_len: usize,
}

impl BufFd {
    pub fn new(fd: OwnedFd, bufsize: usize) -> Self {
        Self {
            fd,
            buffer: vec![0; bufsize].into_boxed_slice(),
            curr_len: 0,
        }
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.curr_len]
    }

    /// Reads once. `Ok(Some(0))` is end-of-file, `Ok(None)` means there was
    /// nothing to read after all.
    pub fn read(&mut self) -> Result<Option<usize>, Errno> {
        match nix::unistd::read(self.fd.as_raw_fd(), &mut self.buffer) {
            Ok(n) => {
                self.curr_len = n;
                Ok(Some(n))
            }
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => {
                // the watch reports the fd again while data is pending
                self.curr_len = 0;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
