//! # Encoder Module
//!
//! The format-agnostic serialization contract. An [`Encoder`] turns one
//! [`Entry`](crate::entry::Entry) plus its fields into bytes; the
//! [`ObjectEncoder`] and [`ArrayEncoder`] visitor traits are how typed
//! values reach the output without reflection, and the marshaler traits are
//! the user extension seam for nested objects and arrays.
//!
//! Encoders accumulate context: `clone_encoder` deep-copies the bytes
//! appended so far, which is what makes `Logger::with` cheap at log time.
//! An encoder is not safe for concurrent mutation; concurrent writers each
//! work on a clone plus a pooled scratch buffer.


use chrono::{DateTime, SecondsFormat, Utc};
use std::borrow::Cow;
use std::io;
use std::time::Duration;

use crate::buffer::Buffer;
use crate::entry::{Caller, Entry};
use crate::field::{Field, ReflectSer};
use crate::level::Level;

/// Implemented by values that can serialize themselves as a JSON-like
/// object. The encoder drives the visit; the marshaler appends typed
/// children.
pub trait ObjectMarshaler: Send + Sync {
  fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> io::Result<()>;
}

/// Implemented by values that can serialize themselves as an array.
pub trait ArrayMarshaler: Send + Sync {
  fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> io::Result<()>;
}

/// Visitor interface for appending keyed values to the current object
/// scope. Integer widths funnel through `add_i64`/`add_u64`; floats keep
/// their width so the shortest round-trip form is preserved.
pub trait ObjectEncoder {
  fn add_bool(&mut self, key: &str, value: bool);
  fn add_i64(&mut self, key: &str, value: i64);
  fn add_u64(&mut self, key: &str, value: u64);
  fn add_f64(&mut self, key: &str, value: f64);
  fn add_f32(&mut self, key: &str, value: f32);
  /// Complex values render as a `"re+imi"` string.
  fn add_complex(&mut self, key: &str, re: f64, im: f64);
  fn add_str(&mut self, key: &str, value: &str);
  /// Binary payloads; the JSON encoder base64-encodes these.
  fn add_bytes(&mut self, key: &str, value: &[u8]);
  fn add_time(&mut self, key: &str, value: DateTime<Utc>);
  fn add_duration(&mut self, key: &str, value: Duration);
  /// Arbitrary serde values, serialized lazily at encode time.
  fn add_reflected(&mut self, key: &str, value: &dyn ReflectSer) -> io::Result<()>;
  fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> io::Result<()>;
  fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> io::Result<()>;
  /// Open a nested object scope; every later field lands inside it until
  /// encoding ends or another namespace opens.
  fn open_namespace(&mut self, key: &str);
}

/// Visitor interface for appending unkeyed elements to the current array
/// scope. Also the target for time/duration formatter callbacks, so custom
/// formats can emit either numbers or strings.
pub trait ArrayEncoder {
  fn append_bool(&mut self, value: bool);
  fn append_i64(&mut self, value: i64);
  fn append_u64(&mut self, value: u64);
  fn append_f64(&mut self, value: f64);
  fn append_str(&mut self, value: &str);
  fn append_time(&mut self, value: DateTime<Utc>);
  fn append_duration(&mut self, value: Duration);
  fn append_object(&mut self, value: &dyn ObjectMarshaler) -> io::Result<()>;
  fn append_array(&mut self, value: &dyn ArrayMarshaler) -> io::Result<()>;
}

/// A format-specific entry serializer.
///
/// `clone_encoder` + `encode_entry` may be used from multiple threads as
/// long as each concurrent caller clones first; the accumulated prefix is
/// read-only during `encode_entry`.
pub trait Encoder: ObjectEncoder + Send + Sync {
  /// Deep-copy the encoder, including accumulated context bytes.
  fn clone_encoder(&self) -> Box<dyn Encoder>;

  /// Serialize a complete record into a pooled buffer, trailing line
  /// ending included.
  fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> io::Result<Buffer>;

  /// View the encoder as the object visitor, for appending context fields.
  fn as_object_encoder(&mut self) -> &mut dyn ObjectEncoder;
}

// ANSI escapes for the color level encoders.
const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";

/// Spelling of the level inside a record.
#[derive(Debug, Clone, Copy)]
pub enum LevelEncoder {
  /// `"info"` — the wire default.
  Lowercase,
  /// `"INFO"` — the console default.
  Capital,
  /// Lowercase wrapped in ANSI color.
  LowercaseColor,
  /// Uppercase wrapped in ANSI color.
  CapitalColor,
  Custom(fn(Level) -> String),
}

fn level_color(level: Level) -> &'static str {
  match level {
    Level::Debug => BLUE,
    Level::Info => GREEN,
    Level::Warn => YELLOW,
    Level::Error | Level::DPanic => RED,
    Level::Panic | Level::Fatal => MAGENTA,
  }
}

impl LevelEncoder {
  pub fn encode(&self, level: Level) -> Cow<'static, str> {
    match self {
      LevelEncoder::Lowercase => Cow::Borrowed(level.as_str()),
      LevelEncoder::Capital => Cow::Borrowed(level.capital_str()),
      LevelEncoder::LowercaseColor => Cow::Owned(format!(
        "{}{}{}",
        level_color(level),
        level.as_str(),
        RESET
      )),
      LevelEncoder::CapitalColor => Cow::Owned(format!(
        "{}{}{}",
        level_color(level),
        level.capital_str(),
        RESET
      )),
      LevelEncoder::Custom(f) => Cow::Owned(f(level)),
    }
  }
}

/// Spelling of the timestamp inside a record.
#[derive(Debug, Clone, Copy)]
pub enum TimeEncoder {
  /// Floating-point seconds since the Unix epoch — the wire default.
  EpochSeconds,
  /// Integer nanoseconds since the Unix epoch.
  EpochNanos,
  /// RFC 3339 with microsecond precision.
  Rfc3339,
  /// ISO 8601 with millisecond precision — the console default.
  Iso8601,
  Custom(fn(&DateTime<Utc>) -> String),
}

impl TimeEncoder {
  pub fn encode(&self, time: &DateTime<Utc>, enc: &mut dyn ArrayEncoder) {
    match self {
      TimeEncoder::EpochSeconds => {
        let seconds =
          time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9;
        enc.append_f64(seconds);
      },
      TimeEncoder::EpochNanos => {
        // Saturates for dates past 2262, which is out of range for logs.
        enc.append_i64(time.timestamp_nanos_opt().unwrap_or(i64::MAX));
      },
      TimeEncoder::Rfc3339 => {
        enc.append_str(&time.to_rfc3339_opts(SecondsFormat::Micros, true));
      },
      TimeEncoder::Iso8601 => {
        enc.append_str(&time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string());
      },
      TimeEncoder::Custom(f) => enc.append_str(&f(time)),
    }
  }
}

/// Spelling of duration fields.
#[derive(Debug, Clone, Copy)]
pub enum DurationEncoder {
  /// Floating-point seconds — the wire default.
  Seconds,
  /// Human form, e.g. `"1.5s"` or `"250ms"`.
  Text,
  /// Integer nanoseconds.
  Nanos,
  Custom(fn(Duration) -> String),
}

impl DurationEncoder {
  pub fn encode(&self, value: Duration, enc: &mut dyn ArrayEncoder) {
    match self {
      DurationEncoder::Seconds => enc.append_f64(value.as_secs_f64()),
      DurationEncoder::Text => enc.append_str(&format_duration_text(value)),
      DurationEncoder::Nanos => {
        enc.append_i64(i64::try_from(value.as_nanos()).unwrap_or(i64::MAX));
      },
      DurationEncoder::Custom(f) => enc.append_str(&f(value)),
    }
  }
}

fn format_duration_text(d: Duration) -> String {
  let nanos = d.as_nanos();
  if nanos < 1_000 {
    format!("{}ns", nanos)
  } else if nanos < 1_000_000 {
    format!("{}\u{b5}s", nanos as f64 / 1e3)
  } else if nanos < 1_000_000_000 {
    format!("{}ms", nanos as f64 / 1e6)
  } else {
    format!("{}s", d.as_secs_f64())
  }
}

/// Spelling of the caller location.
#[derive(Debug, Clone, Copy)]
pub enum CallerEncoder {
  /// Trimmed path: `dir/file.rs:42`.
  Short,
  /// Full path as resolved.
  Full,
  Custom(fn(&Caller) -> String),
}

impl CallerEncoder {
  pub fn encode(&self, caller: &Caller) -> String {
    match self {
      CallerEncoder::Short => caller.trimmed_path(),
      CallerEncoder::Full => caller.full_path(),
      CallerEncoder::Custom(f) => f(caller),
    }
  }
}

/// Key names and formatter choices shared by every encoder.
///
/// Setting any key to the empty string omits that built-in field from the
/// record.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
  pub message_key: String,
  pub level_key: String,
  pub time_key: String,
  pub name_key: String,
  pub caller_key: String,
  /// Empty by default; set to include the resolved function name.
  pub function_key: String,
  pub stacktrace_key: String,
  pub line_ending: String,
  pub level_encoder: LevelEncoder,
  pub time_encoder: TimeEncoder,
  pub duration_encoder: DurationEncoder,
  pub caller_encoder: CallerEncoder,
  /// Separator between the console encoder's built-in columns.
  pub console_separator: String,
  /// Separator used when deriving nested logger names.
  pub name_separator: String,
}

impl EncoderConfig {
  /// The JSON wire defaults: lowercase level, epoch-seconds timestamps.
  pub fn production() -> Self {
    Self {
      message_key: "msg".to_string(),
      level_key: "level".to_string(),
      time_key: "ts".to_string(),
      name_key: "logger".to_string(),
      caller_key: "caller".to_string(),
      function_key: String::new(),
      stacktrace_key: "stacktrace".to_string(),
      line_ending: "\n".to_string(),
      level_encoder: LevelEncoder::Lowercase,
      time_encoder: TimeEncoder::EpochSeconds,
      duration_encoder: DurationEncoder::Seconds,
      caller_encoder: CallerEncoder::Short,
      console_separator: "\t".to_string(),
      name_separator: ".".to_string(),
    }
  }

  /// Console-friendly defaults: capital level, ISO 8601 timestamps.
  pub fn development() -> Self {
    Self {
      message_key: "M".to_string(),
      level_key: "L".to_string(),
      time_key: "T".to_string(),
      name_key: "N".to_string(),
      caller_key: "C".to_string(),
      function_key: String::new(),
      stacktrace_key: "S".to_string(),
      line_ending: "\n".to_string(),
      level_encoder: LevelEncoder::Capital,
      time_encoder: TimeEncoder::Iso8601,
      duration_encoder: DurationEncoder::Text,
      caller_encoder: CallerEncoder::Short,
      console_separator: "\t".to_string(),
      name_separator: ".".to_string(),
    }
  }
}

impl Default for EncoderConfig {
  fn default() -> Self {
    Self::production()
  }
}
