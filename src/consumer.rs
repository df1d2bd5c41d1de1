//! Defines Supported Consumers.
//!
//! A consumer receives the bytes drained from a ready source, tagged with
//! the source's name.
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
};

use crate::conf::ConsumerKind;

pub struct FileLogger {
    file: File,
}

impl FileLogger {
    pub fn new<T>(path: T) -> io::Result<Self>
    where
        T: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .inspect_err(|e| {
                tracing::error!("failed to open log file {}: {e}", path.as_ref().display())
            })?;

        Ok(Self { file })
    }
}

pub enum Consumer {
    File(FileLogger),
    StdOut,
    StdErr,
}

impl Consumer {
    pub fn new(kind: &ConsumerKind) -> io::Result<Self> {
        Ok(match kind {
            ConsumerKind::Log(path) => Self::File(FileLogger::new(path)?),
            ConsumerKind::StdOut => Self::StdOut,
            ConsumerKind::StdErr => Self::StdErr,
        })
    }

    pub fn deliver(&mut self, source: &str, bytes: &[u8]) -> io::Result<()> {
        match self {
            Self::File(x) => write_tagged(&mut x.file, source, bytes),
            Self::StdOut => write_tagged(&mut io::stdout().lock(), source, bytes),
            Self::StdErr => write_tagged(&mut io::stderr().lock(), source, bytes),
        }
    }
}

fn write_tagged(out: &mut impl Write, source: &str, bytes: &[u8]) -> io::Result<()> {
    write!(out, "{source}: ")?;
    out.write_all(bytes)?;
    if !bytes.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }
    out.flush()
}
