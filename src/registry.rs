//! Register sources and own them for the lifetime of the monitor.
//!
//! The watch only borrows descriptor numbers, so something has to own the
//! descriptors behind them. Sources are opened here, and dropping a source
//! closes its descriptor.
use std::fs::OpenOptions;
use std::os::fd::{BorrowedFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

use anyhow::{Context, Result};
use nix::libc;

use crate::buffd::BufFd;
use crate::conf::{Origin, SourceConf};

#[derive(Debug)]
pub struct Source {
    pub name: String,
    pub buf_fd: BufFd,
}

impl Source {
    pub fn open(conf: &SourceConf, bufsize: usize) -> Result<Self> {
        let fd: OwnedFd = match conf.origin()? {
            // Watch through a duplicate so the inherited descriptor keeps
            // its own lifecycle.
            Origin::Fd(fd) => unsafe { BorrowedFd::borrow_raw(fd) }
                .try_clone_to_owned()
                .with_context(|| format!("source {:?} can not use fd {fd}", conf.name))?,
            Origin::Path(path) => OpenOptions::new()
                .read(true)
                .custom_flags(libc::O_NONBLOCK)
                .open(path)
                .with_context(|| format!("source {:?} can not open {}", conf.name, path.display()))?
                .into(),
        };
        Ok(Self {
            name: conf.name.clone(),
            buf_fd: BufFd::new(fd, bufsize),
        })
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.buf_fd.as_raw_fd()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    pub sources: Vec<Source>,
}

impl Registry {
    pub fn new(sources: &[SourceConf], bufsize: usize) -> Result<Self> {
        let sources = sources
            .iter()
            .map(|conf| Source::open(conf, bufsize))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sources })
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn get_by_fd_mut(&mut self, fd: RawFd) -> Option<&mut Source> {
        self.sources.iter_mut().find(|src| src.as_raw_fd() == fd)
    }

    pub fn remove(&mut self, fd: RawFd) -> Option<Source> {
        let loc = self.sources.iter().position(|src| src.as_raw_fd() == fd)?;
        Some(self.sources.swap_remove(loc))
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.iter()
    }
}
