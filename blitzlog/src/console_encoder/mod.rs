//! # Console Encoder Module
//!
//! Human-readable rendering of the same record shape: separator-delimited
//! built-in columns, then the user fields as a JSON-like object. Meant for
//! development terminals, not machines; the JSON encoder remains the wire
//! format.


use chrono::{DateTime, SecondsFormat, Utc};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::buffer::{self, Buffer};
use crate::encoder::{
  ArrayEncoder, ArrayMarshaler, Encoder, EncoderConfig, ObjectEncoder, ObjectMarshaler,
};
use crate::entry::Entry;
use crate::field::{Field, ReflectSer};
use crate::json_encoder::JsonEncoder;

/// Collects one built-in column as plain, unquoted text. The formatter
/// enums target [`ArrayEncoder`], so this is the bridge that lets a custom
/// time format emit either a number or a string into a console column.
struct RawColumn {
  buf: Buffer,
}

impl RawColumn {
  fn new() -> RawColumn {
    RawColumn {
      buf: buffer::global().get(),
    }
  }
}

impl ArrayEncoder for RawColumn {
  fn append_bool(&mut self, value: bool) {
    self.buf.append_str(if value { "true" } else { "false" });
  }

  fn append_i64(&mut self, value: i64) {
    self.buf.append_i64(value);
  }

  fn append_u64(&mut self, value: u64) {
    self.buf.append_u64(value);
  }

  fn append_f64(&mut self, value: f64) {
    self.buf.append_f64(value);
  }

  fn append_str(&mut self, value: &str) {
    self.buf.append_str(value);
  }

  fn append_time(&mut self, value: DateTime<Utc>) {
    self
      .buf
      .append_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true));
  }

  fn append_duration(&mut self, value: Duration) {
    self.buf.append_f64(value.as_secs_f64());
  }

  fn append_object(&mut self, _value: &dyn ObjectMarshaler) -> io::Result<()> {
    Ok(())
  }

  fn append_array(&mut self, _value: &dyn ArrayMarshaler) -> io::Result<()> {
    Ok(())
  }
}

/// The console encoder shares the JSON encoder's context machinery: `with`
/// fields accumulate in an embedded spaced JSON encoder and render inside
/// the trailing field object.
pub struct ConsoleEncoder {
  json: JsonEncoder,
}

impl ConsoleEncoder {
  pub fn new(config: EncoderConfig) -> ConsoleEncoder {
    ConsoleEncoder {
      json: JsonEncoder::spaced(Arc::new(config)),
    }
  }

  fn append_column(line: &mut Buffer, separator: &str, text: &[u8]) {
    if !line.is_empty() {
      line.append_str(separator);
    }
    line.append_bytes(text);
  }
}

impl ObjectEncoder for ConsoleEncoder {
  fn add_bool(&mut self, key: &str, value: bool) {
    self.json.add_bool(key, value);
  }

  fn add_i64(&mut self, key: &str, value: i64) {
    self.json.add_i64(key, value);
  }

  fn add_u64(&mut self, key: &str, value: u64) {
    self.json.add_u64(key, value);
  }

  fn add_f64(&mut self, key: &str, value: f64) {
    self.json.add_f64(key, value);
  }

  fn add_f32(&mut self, key: &str, value: f32) {
    self.json.add_f32(key, value);
  }

  fn add_complex(&mut self, key: &str, re: f64, im: f64) {
    self.json.add_complex(key, re, im);
  }

  fn add_str(&mut self, key: &str, value: &str) {
    self.json.add_str(key, value);
  }

  fn add_bytes(&mut self, key: &str, value: &[u8]) {
    self.json.add_bytes(key, value);
  }

  fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
    self.json.add_time(key, value);
  }

  fn add_duration(&mut self, key: &str, value: Duration) {
    self.json.add_duration(key, value);
  }

  fn add_reflected(&mut self, key: &str, value: &dyn ReflectSer) -> io::Result<()> {
    self.json.add_reflected(key, value)
  }

  fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> io::Result<()> {
    self.json.add_object(key, value)
  }

  fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> io::Result<()> {
    self.json.add_array(key, value)
  }

  fn open_namespace(&mut self, key: &str) {
    self.json.open_namespace(key);
  }
}

impl Encoder for ConsoleEncoder {
  fn clone_encoder(&self) -> Box<dyn Encoder> {
    Box::new(ConsoleEncoder {
      json: self.json.clone_state(),
    })
  }

  fn as_object_encoder(&mut self) -> &mut dyn ObjectEncoder {
    self
  }

  fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> io::Result<Buffer> {
    let cfg = Arc::clone(&self.json.config);
    let mut line = buffer::global().get();

    if !cfg.time_key.is_empty() {
      let mut column = RawColumn::new();
      cfg.time_encoder.encode(&entry.time, &mut column);
      Self::append_column(&mut line, &cfg.console_separator, column.buf.as_slice());
    }
    if !cfg.level_key.is_empty() {
      let text = cfg.level_encoder.encode(entry.level);
      Self::append_column(&mut line, &cfg.console_separator, text.as_bytes());
    }
    if !cfg.name_key.is_empty() && !entry.logger_name.is_empty() {
      Self::append_column(
        &mut line,
        &cfg.console_separator,
        entry.logger_name.as_bytes(),
      );
    }
    if let Some(caller) = &entry.caller {
      if !cfg.caller_key.is_empty() {
        let text = cfg.caller_encoder.encode(caller);
        Self::append_column(&mut line, &cfg.console_separator, text.as_bytes());
      }
    }
    if !cfg.message_key.is_empty() {
      Self::append_column(&mut line, &cfg.console_separator, entry.message.as_bytes());
    }

    // Context plus call fields render as one JSON-like object.
    let mut field_enc = self.json.clone_state();
    for field in fields {
      field.add_to(&mut field_enc);
    }
    field_enc.close_open_namespaces();
    if !field_enc.buf.is_empty() {
      Self::append_column(&mut line, &cfg.console_separator, b"{");
      line.append_bytes(field_enc.buf.as_slice());
      line.append_byte(b'}');
    }

    if let Some(stack) = &entry.stack {
      if !cfg.stacktrace_key.is_empty() {
        line.append_byte(b'\n');
        line.append_str(stack);
      }
    }

    line.append_str(&cfg.line_ending);
    Ok(line)
  }
}
