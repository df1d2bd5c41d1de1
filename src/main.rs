mod buffd;
mod cli;
mod conf;
mod consumer;
mod logging;
mod registry;
use crate::cli::Cli;
use crate::conf::Config;
use crate::consumer::Consumer;
use crate::registry::Registry;
use anyhow::{Context, Result};
use clap::Parser;
use fdmom::{AsWatch, Error, Timeout, Watch};

/// Drains ready sources into the consumer until none remain.
fn run<W: AsWatch>(
    watch: &mut W,
    registry: &mut Registry,
    consumer: &mut Consumer,
    timeout: Timeout,
    exit_on_timeout: bool,
) -> Result<()> {
    while !registry.is_empty() {
        let fd = match watch.await_fd_with_read(timeout) {
            Ok(fd) => fd,
            Err(Error::Timeout) if exit_on_timeout => {
                tracing::info!("no source got ready within {timeout}; exiting");
                return Ok(());
            }
            Err(Error::Timeout) => {
                tracing::debug!("no source got ready within {timeout}");
                continue;
            }
            Err(e) => return Err(e).context("await on watch failed"),
        };

        let Some(src) = registry.get_by_fd_mut(fd) else {
            tracing::warn!("event for fd {fd} which is not registered");
            watch.exclude_fd(fd)?;
            continue;
        };
        match src.buf_fd.read() {
            Ok(Some(0)) => {
                tracing::info!("source {:?} reached end-of-file", src.name);
                watch.exclude_fd(fd)?;
                registry.remove(fd);
            }
            Ok(Some(_)) => consumer
                .deliver(&src.name, src.buf_fd.data())
                .context("consumer lost data")?,
            Ok(None) => {}
            Err(errno) => {
                return Err(errno).with_context(|| format!("read from source {:?}", src.name))
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level)?;

    let mut config = Config::load(&cli.config)?;
    if let Some(timeout_ms) = cli.timeout {
        config.override_timeout(timeout_ms).context("invalid --timeout")?;
    }
    let timeout = Timeout::from_millis(config.timeout_ms);
    tracing::debug!("{config:#?}");

    // initialize our main objects
    let mut registry = Registry::new(&config.sources, config.read_bufsize)?;
    let mut consumer = Consumer::new(&config.output).context("output unavailable")?;
    let mut watch = Watch::open()?;

    let mut unwatchable = Vec::new();
    for src in &registry {
        match watch.include_fd(src.as_raw_fd()) {
            Ok(()) => {}
            Err(e @ Error::NotWatchable { .. }) => {
                tracing::warn!("skipping source {:?}: {e}", src.name);
                unwatchable.push(src.as_raw_fd());
            }
            Err(e) => return Err(e).with_context(|| format!("include source {:?}", src.name)),
        }
    }
    for fd in unwatchable {
        registry.remove(fd);
    }
    tracing::info!("watching {} source(s) with timeout {timeout}", registry.len());

    run(&mut watch, &mut registry, &mut consumer, timeout, config.exit_on_timeout)?;

    watch.close()?;
    Ok(())
}
