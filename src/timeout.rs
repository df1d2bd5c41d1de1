//! Time bounds for an await.
//!
//! A [`Timeout`] behaves like a signed duration: negative blocks
//! indefinitely, zero polls once, and positive blocks up to that long. The
//! bound is a minimum guarantee. Conversions to a coarser kernel resolution
//! round up, so a caller never sees a timeout shorter than requested.
use std::time::{Duration, Instant};

const NANOS_PER_MILLI: u128 = 1_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// Block until a descriptor is read available.
    Indefinite,
    /// Block at most for the duration. [`Duration::ZERO`] does not block.
    Bounded(Duration),
}

impl Timeout {
    /// Non-blocking poll.
    pub const ZERO: Self = Self::Bounded(Duration::ZERO);

    /// Negative values block indefinitely.
    pub fn from_millis(millis: i64) -> Self {
        match u64::try_from(millis) {
            Ok(millis) => Self::Bounded(Duration::from_millis(millis)),
            Err(_) => Self::Indefinite,
        }
    }

    /// Negative values block indefinitely.
    pub fn from_nanos(nanos: i64) -> Self {
        match u64::try_from(nanos) {
            Ok(nanos) => Self::Bounded(Duration::from_nanos(nanos)),
            Err(_) => Self::Indefinite,
        }
    }

    pub fn is_indefinite(&self) -> bool {
        matches!(self, Self::Indefinite)
    }

    /// Fixes the bound relative to now.
    pub(crate) fn deadline(self) -> Deadline {
        match self {
            Self::Indefinite => Deadline::Never,
            Self::Bounded(span) => match Instant::now().checked_add(span) {
                Some(at) => Deadline::At(at),
                // beyond what the clock represents
                None => Deadline::Never,
            },
        }
    }
}

impl From<Duration> for Timeout {
    fn from(span: Duration) -> Self {
        Self::Bounded(span)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(span: Option<Duration>) -> Self {
        match span {
            Some(span) => Self::Bounded(span),
            None => Self::Indefinite,
        }
    }
}

impl std::fmt::Display for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indefinite => f.write_str("indefinite"),
            Self::Bounded(span) => write!(f, "{span:?}"),
        }
    }
}

/// Absolute end of an await. Retries after a signal interruption ask for
/// the remaining time only, so the total never exceeds the caller's bound.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Deadline {
    Never,
    At(Instant),
}

impl Deadline {
    /// Time left, or `None` when unbounded. Saturates at zero.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::At(at) => Some(at.saturating_duration_since(Instant::now())),
        }
    }
}

/// Whole milliseconds, rounded up.
pub(crate) fn ceil_millis(span: Duration) -> u128 {
    span.as_nanos().div_ceil(NANOS_PER_MILLI)
}

/// Rounds up to the next whole millisecond.
pub(crate) fn ceil_to_millis(span: Duration) -> Duration {
    let millis = u64::try_from(ceil_millis(span)).unwrap_or(u64::MAX);
    Duration::from_millis(millis)
}
