//! # Level Module
//!
//! Ordered severity levels and the atomic runtime-mutable level handle.
//!
//! ## Level Semantics
//!
//! - **DEBUG (-1)**: Verbose output, typically disabled in production
//! - **INFO (0)**: Default production level
//! - **WARN (1)**: Conditions that should be noted
//! - **ERROR (2)**: High-priority failures
//! - **DPANIC (3)**: Panics in development mode, logs as an error otherwise
//! - **PANIC (4)**: Logs, then panics
//! - **FATAL (5)**: Logs, then terminates the process
//!
//! Levels implement `Ord` with natural ordering, which drives admission:
//! a sink at `INFO` accepts every level `>= INFO`.
//!
//! ## Runtime Mutation
//!
//! [`AtomicLevel`] is a cheaply clonable handle over one shared atomic. Every
//! logger and core derived from the same handle observes `set_level` calls
//! immediately, with the visibility guarantees of an atomic load.

mod __test__;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::Arc;

/// Compact `i8` representation of the logging levels.
///
/// `DEBUG` is `-1` so that `INFO` sits at zero, the default for a
/// zero-initialized atomic.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
  Debug = -1,
  Info = 0,
  Warn = 1,
  Error = 2,
  DPanic = 3,
  Panic = 4,
  Fatal = 5,
}

/// Every level from [`Level::Debug`] through [`Level::Fatal`], in order.
pub const ALL_LEVELS: [Level; 7] = [
  Level::Debug,
  Level::Info,
  Level::Warn,
  Level::Error,
  Level::DPanic,
  Level::Panic,
  Level::Fatal,
];

/// Error returned when parsing an unrecognized level string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized level: {0:?}")]
pub struct ParseLevelError(pub String);

impl Level {
  /// Lowercase text form, the wire spelling.
  #[inline]
  pub fn as_str(&self) -> &'static str {
    match self {
      Level::Debug => "debug",
      Level::Info => "info",
      Level::Warn => "warn",
      Level::Error => "error",
      Level::DPanic => "dpanic",
      Level::Panic => "panic",
      Level::Fatal => "fatal",
    }
  }

  /// Uppercase text form used by the console encoder.
  #[inline]
  pub fn capital_str(&self) -> &'static str {
    match self {
      Level::Debug => "DEBUG",
      Level::Info => "INFO",
      Level::Warn => "WARN",
      Level::Error => "ERROR",
      Level::DPanic => "DPANIC",
      Level::Panic => "PANIC",
      Level::Fatal => "FATAL",
    }
  }

  /// Convert from the `i8` discriminant, clamping unknown values to `Info`.
  #[inline]
  pub fn from_i8(value: i8) -> Level {
    match value {
      -1 => Level::Debug,
      0 => Level::Info,
      1 => Level::Warn,
      2 => Level::Error,
      3 => Level::DPanic,
      4 => Level::Panic,
      5 => Level::Fatal,
      _ => Level::Info,
    }
  }

  /// Dense index for per-level tables (`Debug` is 0, `Fatal` is 6).
  #[inline]
  pub fn index(&self) -> usize {
    (*self as i8 + 1) as usize
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Level {
  type Err = ParseLevelError;

  /// Parse a level from its text form. Accepts both spellings the library
  /// ever emits (`"info"` / `"INFO"`).
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "debug" | "DEBUG" => Ok(Level::Debug),
      "info" | "INFO" | "" => Ok(Level::Info),
      "warn" | "WARN" => Ok(Level::Warn),
      "error" | "ERROR" => Ok(Level::Error),
      "dpanic" | "DPANIC" => Ok(Level::DPanic),
      "panic" | "PANIC" => Ok(Level::Panic),
      "fatal" | "FATAL" => Ok(Level::Fatal),
      other => Err(ParseLevelError(other.to_string())),
    }
  }
}

impl Serialize for Level {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for Level {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(de::Error::custom)
  }
}

/// Admission predicate deciding whether a level should be logged.
///
/// [`Level`] itself is an enabler (`l.enabled(x)` is `x >= l`), and
/// [`AtomicLevel`] is the runtime-mutable variant. Cores hold an
/// `Arc<dyn LevelEnabler>` so a single atomic can gate an entire tree of
/// derived loggers.
pub trait LevelEnabler: Send + Sync {
  fn enabled(&self, level: Level) -> bool;
}

impl LevelEnabler for Level {
  #[inline]
  fn enabled(&self, level: Level) -> bool {
    level >= *self
  }
}

/// Shared, atomically mutable minimum level.
///
/// Cloning the handle shares the underlying atomic; it never copies the
/// value. Loads use `Acquire` and stores use `Release`, so a `set_level`
/// happens-before any subsequent `level()` on any thread.
#[derive(Debug, Clone)]
pub struct AtomicLevel {
  inner: Arc<AtomicI8>,
}

impl AtomicLevel {
  pub fn new(level: Level) -> Self {
    Self {
      inner: Arc::new(AtomicI8::new(level as i8)),
    }
  }

  /// Current minimum level.
  #[inline]
  pub fn level(&self) -> Level {
    Level::from_i8(self.inner.load(Ordering::Acquire))
  }

  /// Replace the minimum level for every logger sharing this handle.
  #[inline]
  pub fn set_level(&self, level: Level) {
    self.inner.store(level as i8, Ordering::Release);
  }
}

impl Default for AtomicLevel {
  fn default() -> Self {
    Self::new(Level::Info)
  }
}

impl LevelEnabler for AtomicLevel {
  #[inline]
  fn enabled(&self, level: Level) -> bool {
    level >= self.level()
  }
}

impl fmt::Display for AtomicLevel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.level().as_str())
  }
}

impl Serialize for AtomicLevel {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.level().serialize(serializer)
  }
}

impl<'de> Deserialize<'de> for AtomicLevel {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    Ok(AtomicLevel::new(Level::deserialize(deserializer)?))
  }
}
