//! Uses clap to define the CLI interface declaratively.
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// watch configuration (TOML)
    #[arg(short, default_value = "fdmom.toml", long, value_name = "FILE")]
    pub config: PathBuf,

    /// await timeout in milliseconds, negative blocks indefinitely;
    /// overrides `timeout_ms` from the configuration
    #[arg(short, long, allow_negative_numbers = true, value_name = "MSEC")]
    pub timeout: Option<i64>,

    /// logging level; falls back to `FDMOM_LOG`, then to info
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}
