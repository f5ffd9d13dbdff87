//! # JSON Encoder Module
//!
//! The reference [`Encoder`]: line-oriented JSON with no reflection on the
//! fast path. Numbers go through `itoa`/`ryu` for shortest round-trip
//! output, binary payloads are base64, and the comma state machine works by
//! inspecting the last byte already in the buffer, so cloned context bytes
//! splice in without bookkeeping.
//!
//! Built-in fields always precede user fields: level, timestamp, logger
//! name, caller, message, then accumulated and call-site fields in order,
//! then the stack trace.
//!
//! The encoder is not safe for concurrent mutation. Concurrent `write`
//! paths share only the read-only context prefix; every `encode_entry`
//! renders into a fresh pooled scratch buffer.

mod __test__;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::buffer::{self, Buffer};
use crate::encoder::{
  ArrayEncoder, ArrayMarshaler, Encoder, EncoderConfig, ObjectEncoder, ObjectMarshaler,
};
use crate::entry::Entry;
use crate::field::{Field, ReflectSer};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

pub struct JsonEncoder {
  pub(crate) config: Arc<EncoderConfig>,
  pub(crate) buf: Buffer,
  /// Spaced output is used when the console encoder borrows this encoder
  /// for its field object.
  pub(crate) spaced: bool,
  pub(crate) open_namespaces: usize,
}

impl JsonEncoder {
  pub fn new(config: EncoderConfig) -> JsonEncoder {
    JsonEncoder {
      config: Arc::new(config),
      buf: buffer::global().get(),
      spaced: false,
      open_namespaces: 0,
    }
  }

  pub(crate) fn spaced(config: Arc<EncoderConfig>) -> JsonEncoder {
    JsonEncoder {
      config,
      buf: buffer::global().get(),
      spaced: true,
      open_namespaces: 0,
    }
  }

  /// Deep copy: fresh pooled buffer holding the same context bytes.
  pub(crate) fn clone_state(&self) -> JsonEncoder {
    let mut buf = buffer::global().get();
    buf.append_bytes(self.buf.as_slice());
    JsonEncoder {
      config: Arc::clone(&self.config),
      buf,
      spaced: self.spaced,
      open_namespaces: self.open_namespaces,
    }
  }

  /// Append a comma unless the buffer position is at the start of an
  /// object, array, or value.
  pub(crate) fn add_element_separator(&mut self) {
    match self.buf.last_byte() {
      None | Some(b'{') | Some(b'[') | Some(b':') | Some(b',') | Some(b' ') => {},
      _ => {
        self.buf.append_byte(b',');
        if self.spaced {
          self.buf.append_byte(b' ');
        }
      },
    }
  }

  pub(crate) fn add_key(&mut self, key: &str) {
    self.add_element_separator();
    self.buf.append_byte(b'"');
    self.safe_append_string(key);
    self.buf.append_str("\":");
    if self.spaced {
      self.buf.append_byte(b' ');
    }
  }

  pub(crate) fn append_quoted(&mut self, value: &str) {
    self.buf.append_byte(b'"');
    self.safe_append_string(value);
    self.buf.append_byte(b'"');
  }

  /// Escape per RFC 8259: control bytes, `"` and `\`. Everything else,
  /// including multibyte UTF-8 and the HTML-sensitive `<`, `>`, `&`, passes
  /// through untouched. `&str` input is valid UTF-8 by construction.
  fn safe_append_string(&mut self, value: &str) {
    let bytes = value.as_bytes();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
      if b >= 0x20 && b != b'"' && b != b'\\' {
        continue;
      }
      self.buf.append_bytes(&bytes[start..i]);
      match b {
        b'"' => self.buf.append_str("\\\""),
        b'\\' => self.buf.append_str("\\\\"),
        b'\n' => self.buf.append_str("\\n"),
        b'\r' => self.buf.append_str("\\r"),
        b'\t' => self.buf.append_str("\\t"),
        _ => {
          self.buf.append_str("\\u00");
          self.buf.append_byte(HEX_DIGITS[(b >> 4) as usize]);
          self.buf.append_byte(HEX_DIGITS[(b & 0xF) as usize]);
        },
      }
      start = i + 1;
    }
    self.buf.append_bytes(&bytes[start..]);
  }

  fn append_f64_value(&mut self, value: f64) {
    if value.is_nan() {
      self.buf.append_str("\"NaN\"");
    } else if value == f64::INFINITY {
      self.buf.append_str("\"+Inf\"");
    } else if value == f64::NEG_INFINITY {
      self.buf.append_str("\"-Inf\"");
    } else {
      self.buf.append_f64(value);
    }
  }

  fn append_f32_value(&mut self, value: f32) {
    if value.is_nan() {
      self.buf.append_str("\"NaN\"");
    } else if value == f32::INFINITY {
      self.buf.append_str("\"+Inf\"");
    } else if value == f32::NEG_INFINITY {
      self.buf.append_str("\"-Inf\"");
    } else {
      self.buf.append_f32(value);
    }
  }

  fn append_float_text(&mut self, value: f64) {
    if value.is_nan() {
      self.buf.append_str("NaN");
    } else if value == f64::INFINITY {
      self.buf.append_str("+Inf");
    } else if value == f64::NEG_INFINITY {
      self.buf.append_str("-Inf");
    } else {
      self.buf.append_f64(value);
    }
  }

  pub(crate) fn close_open_namespaces(&mut self) {
    for _ in 0..self.open_namespaces {
      self.buf.append_byte(b'}');
    }
    self.open_namespaces = 0;
  }
}

impl ObjectEncoder for JsonEncoder {
  fn add_bool(&mut self, key: &str, value: bool) {
    self.add_key(key);
    self.buf.append_str(if value { "true" } else { "false" });
  }

  fn add_i64(&mut self, key: &str, value: i64) {
    self.add_key(key);
    self.buf.append_i64(value);
  }

  fn add_u64(&mut self, key: &str, value: u64) {
    self.add_key(key);
    self.buf.append_u64(value);
  }

  fn add_f64(&mut self, key: &str, value: f64) {
    self.add_key(key);
    self.append_f64_value(value);
  }

  fn add_f32(&mut self, key: &str, value: f32) {
    self.add_key(key);
    self.append_f32_value(value);
  }

  fn add_complex(&mut self, key: &str, re: f64, im: f64) {
    self.add_key(key);
    self.buf.append_byte(b'"');
    self.append_float_text(re);
    // The imaginary sign is explicit; negative values carry their own.
    if !(im < 0.0) {
      self.buf.append_byte(b'+');
    }
    self.append_float_text(im);
    self.buf.append_str("i\"");
  }

  fn add_str(&mut self, key: &str, value: &str) {
    self.add_key(key);
    self.append_quoted(value);
  }

  fn add_bytes(&mut self, key: &str, value: &[u8]) {
    self.add_key(key);
    self.buf.append_byte(b'"');
    // Base64 output never needs escaping.
    self.buf.append_str(&BASE64.encode(value));
    self.buf.append_byte(b'"');
  }

  fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
    self.add_key(key);
    let encoder = self.config.time_encoder;
    encoder.encode(&value, self);
  }

  fn add_duration(&mut self, key: &str, value: Duration) {
    self.add_key(key);
    let encoder = self.config.duration_encoder;
    encoder.encode(value, self);
  }

  fn add_reflected(&mut self, key: &str, value: &dyn ReflectSer) -> io::Result<()> {
    // Serialize to a scratch buffer first so a failure leaves no partial
    // bytes behind the key.
    let mut scratch = buffer::global().get();
    value.reflect_serialize(&mut scratch)?;
    self.add_key(key);
    self.buf.append_bytes(scratch.as_slice());
    Ok(())
  }

  fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> io::Result<()> {
    self.add_key(key);
    self.buf.append_byte(b'{');
    let result = value.marshal_object(self);
    self.buf.append_byte(b'}');
    result
  }

  fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> io::Result<()> {
    self.add_key(key);
    self.buf.append_byte(b'[');
    let result = value.marshal_array(self);
    self.buf.append_byte(b']');
    result
  }

  fn open_namespace(&mut self, key: &str) {
    self.add_key(key);
    self.buf.append_byte(b'{');
    self.open_namespaces += 1;
  }
}

impl ArrayEncoder for JsonEncoder {
  fn append_bool(&mut self, value: bool) {
    self.add_element_separator();
    self.buf.append_str(if value { "true" } else { "false" });
  }

  fn append_i64(&mut self, value: i64) {
    self.add_element_separator();
    self.buf.append_i64(value);
  }

  fn append_u64(&mut self, value: u64) {
    self.add_element_separator();
    self.buf.append_u64(value);
  }

  fn append_f64(&mut self, value: f64) {
    self.add_element_separator();
    self.append_f64_value(value);
  }

  fn append_str(&mut self, value: &str) {
    self.add_element_separator();
    self.append_quoted(value);
  }

  fn append_time(&mut self, value: DateTime<Utc>) {
    let encoder = self.config.time_encoder;
    encoder.encode(&value, self);
  }

  fn append_duration(&mut self, value: Duration) {
    let encoder = self.config.duration_encoder;
    encoder.encode(value, self);
  }

  fn append_object(&mut self, value: &dyn ObjectMarshaler) -> io::Result<()> {
    self.add_element_separator();
    self.buf.append_byte(b'{');
    let result = value.marshal_object(self);
    self.buf.append_byte(b'}');
    result
  }

  fn append_array(&mut self, value: &dyn ArrayMarshaler) -> io::Result<()> {
    self.add_element_separator();
    self.buf.append_byte(b'[');
    let result = value.marshal_array(self);
    self.buf.append_byte(b']');
    result
  }
}

impl Encoder for JsonEncoder {
  fn clone_encoder(&self) -> Box<dyn Encoder> {
    Box::new(self.clone_state())
  }

  fn as_object_encoder(&mut self) -> &mut dyn ObjectEncoder {
    self
  }

  fn encode_entry(&self, entry: &Entry, fields: &[Field]) -> io::Result<Buffer> {
    let cfg = Arc::clone(&self.config);
    let mut out = JsonEncoder {
      config: Arc::clone(&self.config),
      buf: buffer::global().get(),
      spaced: self.spaced,
      open_namespaces: 0,
    };

    out.buf.append_byte(b'{');

    if !cfg.level_key.is_empty() {
      out.add_key(&cfg.level_key);
      let text = cfg.level_encoder.encode(entry.level);
      out.append_quoted(&text);
    }
    if !cfg.time_key.is_empty() {
      out.add_key(&cfg.time_key);
      cfg.time_encoder.encode(&entry.time, &mut out);
    }
    if !cfg.name_key.is_empty() && !entry.logger_name.is_empty() {
      out.add_key(&cfg.name_key);
      out.append_quoted(&entry.logger_name);
    }
    if let Some(caller) = &entry.caller {
      if !cfg.caller_key.is_empty() {
        out.add_key(&cfg.caller_key);
        out.append_quoted(&cfg.caller_encoder.encode(caller));
      }
      if !cfg.function_key.is_empty() {
        out.add_key(&cfg.function_key);
        out.append_quoted(&caller.function);
      }
    }
    if !cfg.message_key.is_empty() {
      out.add_key(&cfg.message_key);
      out.append_quoted(&entry.message);
    }

    // Accumulated context, already serialized at `with` time.
    if !self.buf.is_empty() {
      out.add_element_separator();
      out.buf.append_bytes(self.buf.as_slice());
      out.open_namespaces = self.open_namespaces;
    }

    for field in fields {
      field.add_to(&mut out);
    }
    out.close_open_namespaces();

    if let Some(stack) = &entry.stack {
      if !cfg.stacktrace_key.is_empty() {
        out.add_key(&cfg.stacktrace_key);
        out.append_quoted(stack);
      }
    }

    out.buf.append_byte(b'}');
    out.buf.append_str(&cfg.line_ending);
    Ok(out.buf)
  }
}
