//! The Serializable configuration data structures used for setup.
use std::fs;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerKind {
    Log(PathBuf),
    StdOut,
    StdErr,
}

/// A descriptor to watch: either inherited by number, or a file to open.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SourceConf {
    pub name: String,

    #[serde(default)]
    pub fd: Option<RawFd>,

    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Origin<'a> {
    Fd(RawFd),
    Path(&'a Path),
}

impl SourceConf {
    pub fn origin(&self) -> Result<Origin<'_>> {
        match (self.fd, &self.path) {
            (Some(fd), None) if fd >= 0 => Ok(Origin::Fd(fd)),
            (Some(fd), None) => bail!("source {:?} has invalid fd {fd}", self.name),
            (None, Some(path)) => Ok(Origin::Path(path)),
            (Some(_), Some(_)) => bail!("source {:?} sets both fd and path", self.name),
            (None, None) => bail!("source {:?} needs either fd or path", self.name),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,

    #[serde(default = "default_read_bufsize")]
    pub read_bufsize: usize,

    #[serde(default)]
    pub exit_on_timeout: bool,

    #[serde(default = "default_output")]
    pub output: ConsumerKind,

    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConf>,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("in config {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces the configured timeout, as the command line does.
    pub fn override_timeout(&mut self, timeout_ms: i64) -> Result<()> {
        self.timeout_ms = timeout_ms;
        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.read_bufsize == 0 {
            bail!("read_bufsize must be positive");
        }
        // a zero timeout which never ends the loop spins on the watch
        if self.timeout_ms == 0 && !self.exit_on_timeout {
            bail!("timeout_ms of 0 needs exit_on_timeout");
        }
        for (i, src) in self.sources.iter().enumerate() {
            src.origin()?;
            if self.sources[..i].iter().any(|other| other.name == src.name) {
                bail!("source name {:?} is used twice", src.name);
            }
        }
        Ok(())
    }
}

fn default_timeout_ms() -> i64 {
    -1
}

fn default_read_bufsize() -> usize {
    2048
}

fn default_output() -> ConsumerKind {
    ConsumerKind::StdOut
}
