//! # Field Module
//!
//! The type-tagged, allocation-free representation of structured values.
//!
//! ## Design
//!
//! A [`Field`] is a key plus a [`FieldValue`], a tagged union that keeps
//! small scalars inline (per-width integer variants, float bit patterns) and
//! holds larger payloads behind `Cow`/`Arc` references. Fields are cheap to
//! clone and carry no encoder state; the encoder visits them through
//! [`Field::add_to`].
//!
//! ## Float Storage
//!
//! Floats and complex parts are stored as raw bit patterns (`to_bits`).
//! NaN payloads survive the round trip and the variant stays comparable
//! without tripping over NaN equality.
//!
//! ## Usage
//!
//! ```rust
//! use blitzlog::field::Field;
//!
//! let fields = [
//!   Field::string("user", "alice"),
//!   Field::i64("attempt", 3),
//!   Field::bool("cached", false),
//! ];
//! assert_eq!(fields[0].key, "user");
//! ```


use chrono::{DateTime, Utc};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::encoder::{ArrayEncoder, ArrayMarshaler, ObjectEncoder, ObjectMarshaler};

/// Shared error payload; the field borrows the caller's error, it never
/// formats it until encode time.
pub type ErrorRef = Arc<dyn std::error::Error + Send + Sync>;

/// Lazily rendered `Display` payload.
pub type StringerRef = Arc<dyn fmt::Display + Send + Sync>;

/// Type-erased serde payload serialized only when the record is encoded.
///
/// Blanket-implemented for every `Serialize + Send + Sync` type, so
/// [`Field::reflect`] accepts plain values.
pub trait ReflectSer: Send + Sync {
  fn reflect_serialize(&self, w: &mut dyn io::Write) -> io::Result<()>;
}

impl<T> ReflectSer for T
where
  T: Serialize + Send + Sync,
{
  fn reflect_serialize(&self, w: &mut dyn io::Write) -> io::Result<()> {
    serde_json::to_writer(&mut *w, self).map_err(io::Error::other)
  }
}

/// The tagged value union.
///
/// Scalar variants are inline; `Str`/`Bytes` borrow static data or own it
/// behind a `Cow`; marshaler variants hold shared trait objects. The `Skip`
/// variant is a no-op placeholder for dropping fields conditionally without
/// changing call signatures.
#[derive(Clone)]
pub enum FieldValue {
  Skip,
  Bool(bool),
  I8(i8),
  I16(i16),
  I32(i32),
  I64(i64),
  U8(u8),
  U16(u16),
  U32(u32),
  U64(u64),
  Usize(usize),
  /// `f32::to_bits` pattern.
  F32(u32),
  /// `f64::to_bits` pattern.
  F64(u64),
  /// Real and imaginary `f32::to_bits` patterns.
  Complex64(u32, u32),
  /// Real and imaginary `f64::to_bits` patterns.
  Complex128(u64, u64),
  Str(Cow<'static, str>),
  Bytes(Cow<'static, [u8]>),
  Time(DateTime<Utc>),
  Duration(Duration),
  Error(ErrorRef),
  /// Rendered via `Display` at encode time.
  Stringer(StringerRef),
  /// Rendered via serde at encode time.
  Reflect(Arc<dyn ReflectSer>),
  Object(Arc<dyn ObjectMarshaler>),
  Array(Arc<dyn ArrayMarshaler>),
  /// Opens a nested object scope in the encoder.
  Namespace,
}

impl fmt::Debug for FieldValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      FieldValue::Skip => f.write_str("Skip"),
      FieldValue::Bool(v) => write!(f, "Bool({})", v),
      FieldValue::I8(v) => write!(f, "I8({})", v),
      FieldValue::I16(v) => write!(f, "I16({})", v),
      FieldValue::I32(v) => write!(f, "I32({})", v),
      FieldValue::I64(v) => write!(f, "I64({})", v),
      FieldValue::U8(v) => write!(f, "U8({})", v),
      FieldValue::U16(v) => write!(f, "U16({})", v),
      FieldValue::U32(v) => write!(f, "U32({})", v),
      FieldValue::U64(v) => write!(f, "U64({})", v),
      FieldValue::Usize(v) => write!(f, "Usize({})", v),
      FieldValue::F32(bits) => write!(f, "F32({})", f32::from_bits(*bits)),
      FieldValue::F64(bits) => write!(f, "F64({})", f64::from_bits(*bits)),
      FieldValue::Complex64(re, im) => {
        write!(f, "Complex64({}, {})", f32::from_bits(*re), f32::from_bits(*im))
      },
      FieldValue::Complex128(re, im) => {
        write!(f, "Complex128({}, {})", f64::from_bits(*re), f64::from_bits(*im))
      },
      FieldValue::Str(v) => write!(f, "Str({:?})", v),
      FieldValue::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
      FieldValue::Time(v) => write!(f, "Time({})", v),
      FieldValue::Duration(v) => write!(f, "Duration({:?})", v),
      FieldValue::Error(e) => write!(f, "Error({})", e),
      FieldValue::Stringer(_) => f.write_str("Stringer(..)"),
      FieldValue::Reflect(_) => f.write_str("Reflect(..)"),
      FieldValue::Object(_) => f.write_str("Object(..)"),
      FieldValue::Array(_) => f.write_str("Array(..)"),
      FieldValue::Namespace => f.write_str("Namespace"),
    }
  }
}

/// A typed key/value pair.
#[derive(Debug, Clone)]
pub struct Field {
  pub key: Cow<'static, str>,
  pub value: FieldValue,
}

impl Field {
  fn new(key: impl Into<Cow<'static, str>>, value: FieldValue) -> Field {
    Field {
      key: key.into(),
      value,
    }
  }

  /// A placeholder that encodes nothing.
  pub fn skip() -> Field {
    Field::new("", FieldValue::Skip)
  }

  pub fn bool(key: impl Into<Cow<'static, str>>, value: bool) -> Field {
    Field::new(key, FieldValue::Bool(value))
  }

  pub fn i8(key: impl Into<Cow<'static, str>>, value: i8) -> Field {
    Field::new(key, FieldValue::I8(value))
  }

  pub fn i16(key: impl Into<Cow<'static, str>>, value: i16) -> Field {
    Field::new(key, FieldValue::I16(value))
  }

  pub fn i32(key: impl Into<Cow<'static, str>>, value: i32) -> Field {
    Field::new(key, FieldValue::I32(value))
  }

  pub fn i64(key: impl Into<Cow<'static, str>>, value: i64) -> Field {
    Field::new(key, FieldValue::I64(value))
  }

  pub fn u8(key: impl Into<Cow<'static, str>>, value: u8) -> Field {
    Field::new(key, FieldValue::U8(value))
  }

  pub fn u16(key: impl Into<Cow<'static, str>>, value: u16) -> Field {
    Field::new(key, FieldValue::U16(value))
  }

  pub fn u32(key: impl Into<Cow<'static, str>>, value: u32) -> Field {
    Field::new(key, FieldValue::U32(value))
  }

  pub fn u64(key: impl Into<Cow<'static, str>>, value: u64) -> Field {
    Field::new(key, FieldValue::U64(value))
  }

  pub fn usize(key: impl Into<Cow<'static, str>>, value: usize) -> Field {
    Field::new(key, FieldValue::Usize(value))
  }

  pub fn f32(key: impl Into<Cow<'static, str>>, value: f32) -> Field {
    Field::new(key, FieldValue::F32(value.to_bits()))
  }

  pub fn f64(key: impl Into<Cow<'static, str>>, value: f64) -> Field {
    Field::new(key, FieldValue::F64(value.to_bits()))
  }

  pub fn complex64(key: impl Into<Cow<'static, str>>, re: f32, im: f32) -> Field {
    Field::new(key, FieldValue::Complex64(re.to_bits(), im.to_bits()))
  }

  pub fn complex128(key: impl Into<Cow<'static, str>>, re: f64, im: f64) -> Field {
    Field::new(key, FieldValue::Complex128(re.to_bits(), im.to_bits()))
  }

  /// A string field. Static string slices are borrowed, not copied.
  pub fn string(
    key: impl Into<Cow<'static, str>>,
    value: impl Into<Cow<'static, str>>,
  ) -> Field {
    Field::new(key, FieldValue::Str(value.into()))
  }

  /// A binary field; the JSON encoder base64-encodes the payload.
  pub fn bytes(
    key: impl Into<Cow<'static, str>>,
    value: impl Into<Cow<'static, [u8]>>,
  ) -> Field {
    Field::new(key, FieldValue::Bytes(value.into()))
  }

  pub fn time(key: impl Into<Cow<'static, str>>, value: DateTime<Utc>) -> Field {
    Field::new(key, FieldValue::Time(value))
  }

  pub fn duration(key: impl Into<Cow<'static, str>>, value: Duration) -> Field {
    Field::new(key, FieldValue::Duration(value))
  }

  /// An error under the conventional `"error"` key.
  pub fn error(err: impl std::error::Error + Send + Sync + 'static) -> Field {
    Field::new("error", FieldValue::Error(Arc::new(err)))
  }

  pub fn named_error(
    key: impl Into<Cow<'static, str>>,
    err: impl std::error::Error + Send + Sync + 'static,
  ) -> Field {
    Field::new(key, FieldValue::Error(Arc::new(err)))
  }

  /// A shared error that is already behind an `Arc`.
  pub fn shared_error(key: impl Into<Cow<'static, str>>, err: ErrorRef) -> Field {
    Field::new(key, FieldValue::Error(err))
  }

  /// An optional error; `None` produces a skip field so call sites keep a
  /// fixed shape.
  pub fn maybe_error(
    key: impl Into<Cow<'static, str>>,
    err: Option<impl std::error::Error + Send + Sync + 'static>,
  ) -> Field {
    match err {
      Some(err) => Field::named_error(key, err),
      None => Field::skip(),
    }
  }

  /// A lazily rendered `Display` value; `to_string` runs at encode time,
  /// and only if the entry is admitted.
  pub fn stringer(
    key: impl Into<Cow<'static, str>>,
    value: impl fmt::Display + Send + Sync + 'static,
  ) -> Field {
    Field::new(key, FieldValue::Stringer(Arc::new(value)))
  }

  /// The serde fallback for values with no best-fit typed constructor.
  /// Serialization is deferred to encode time; a failure surfaces as a
  /// `<key>Error` sibling field.
  pub fn reflect(
    key: impl Into<Cow<'static, str>>,
    value: impl Serialize + Send + Sync + 'static,
  ) -> Field {
    Field::new(key, FieldValue::Reflect(Arc::new(value)))
  }

  pub fn object(
    key: impl Into<Cow<'static, str>>,
    value: impl ObjectMarshaler + 'static,
  ) -> Field {
    Field::new(key, FieldValue::Object(Arc::new(value)))
  }

  pub fn array(
    key: impl Into<Cow<'static, str>>,
    value: impl ArrayMarshaler + 'static,
  ) -> Field {
    Field::new(key, FieldValue::Array(Arc::new(value)))
  }

  /// Open a nested object scope; subsequent fields on the same encoder land
  /// inside it.
  pub fn namespace(key: impl Into<Cow<'static, str>>) -> Field {
    Field::new(key, FieldValue::Namespace)
  }

  pub fn strings(key: impl Into<Cow<'static, str>>, values: Vec<String>) -> Field {
    Field::array(key, Strings(values))
  }

  pub fn ints(key: impl Into<Cow<'static, str>>, values: Vec<i64>) -> Field {
    Field::array(key, Ints(values))
  }

  pub fn uints(key: impl Into<Cow<'static, str>>, values: Vec<u64>) -> Field {
    Field::array(key, Uints(values))
  }

  pub fn floats(key: impl Into<Cow<'static, str>>, values: Vec<f64>) -> Field {
    Field::array(key, Floats(values))
  }

  pub fn bools(key: impl Into<Cow<'static, str>>, values: Vec<bool>) -> Field {
    Field::array(key, Bools(values))
  }

  /// Best-fit dispatch on the value's type. The `Into<FieldValue>` impl set
  /// picks the typed variant at compile time; use [`Field::reflect`] for
  /// anything outside it.
  pub fn any(key: impl Into<Cow<'static, str>>, value: impl Into<FieldValue>) -> Field {
    Field::new(key, value.into())
  }

  /// Visit this field's value on an encoder.
  ///
  /// A failed user marshaler does not lose the record: the error message is
  /// appended as a `<key>Error` string field and encoding continues.
  pub fn add_to(&self, enc: &mut dyn ObjectEncoder) {
    let result = match &self.value {
      FieldValue::Skip => return,
      FieldValue::Bool(v) => {
        enc.add_bool(&self.key, *v);
        Ok(())
      },
      FieldValue::I8(v) => {
        enc.add_i64(&self.key, i64::from(*v));
        Ok(())
      },
      FieldValue::I16(v) => {
        enc.add_i64(&self.key, i64::from(*v));
        Ok(())
      },
      FieldValue::I32(v) => {
        enc.add_i64(&self.key, i64::from(*v));
        Ok(())
      },
      FieldValue::I64(v) => {
        enc.add_i64(&self.key, *v);
        Ok(())
      },
      FieldValue::U8(v) => {
        enc.add_u64(&self.key, u64::from(*v));
        Ok(())
      },
      FieldValue::U16(v) => {
        enc.add_u64(&self.key, u64::from(*v));
        Ok(())
      },
      FieldValue::U32(v) => {
        enc.add_u64(&self.key, u64::from(*v));
        Ok(())
      },
      FieldValue::U64(v) => {
        enc.add_u64(&self.key, *v);
        Ok(())
      },
      FieldValue::Usize(v) => {
        enc.add_u64(&self.key, *v as u64);
        Ok(())
      },
      FieldValue::F32(bits) => {
        enc.add_f32(&self.key, f32::from_bits(*bits));
        Ok(())
      },
      FieldValue::F64(bits) => {
        enc.add_f64(&self.key, f64::from_bits(*bits));
        Ok(())
      },
      FieldValue::Complex64(re, im) => {
        enc.add_complex(
          &self.key,
          f64::from(f32::from_bits(*re)),
          f64::from(f32::from_bits(*im)),
        );
        Ok(())
      },
      FieldValue::Complex128(re, im) => {
        enc.add_complex(&self.key, f64::from_bits(*re), f64::from_bits(*im));
        Ok(())
      },
      FieldValue::Str(v) => {
        enc.add_str(&self.key, v);
        Ok(())
      },
      FieldValue::Bytes(v) => {
        enc.add_bytes(&self.key, v);
        Ok(())
      },
      FieldValue::Time(v) => {
        enc.add_time(&self.key, *v);
        Ok(())
      },
      FieldValue::Duration(v) => {
        enc.add_duration(&self.key, *v);
        Ok(())
      },
      FieldValue::Error(e) => {
        enc.add_str(&self.key, &e.to_string());
        Ok(())
      },
      FieldValue::Stringer(s) => {
        enc.add_str(&self.key, &s.to_string());
        Ok(())
      },
      FieldValue::Reflect(r) => enc.add_reflected(&self.key, r.as_ref()),
      FieldValue::Object(m) => enc.add_object(&self.key, m.as_ref()),
      FieldValue::Array(m) => enc.add_array(&self.key, m.as_ref()),
      FieldValue::Namespace => {
        enc.open_namespace(&self.key);
        Ok(())
      },
    };

    if let Err(err) = result {
      let sibling = format!("{}Error", self.key);
      enc.add_str(&sibling, &err.to_string());
    }
  }
}

macro_rules! impl_into_field_value {
  ($($ty:ty => $variant:ident),* $(,)?) => {
    $(
      impl From<$ty> for FieldValue {
        fn from(value: $ty) -> FieldValue {
          FieldValue::$variant(value)
        }
      }
    )*
  };
}

impl_into_field_value! {
  bool => Bool,
  i8 => I8,
  i16 => I16,
  i32 => I32,
  i64 => I64,
  u8 => U8,
  u16 => U16,
  u32 => U32,
  u64 => U64,
  usize => Usize,
  Duration => Duration,
}

impl From<f32> for FieldValue {
  fn from(value: f32) -> FieldValue {
    FieldValue::F32(value.to_bits())
  }
}

impl From<f64> for FieldValue {
  fn from(value: f64) -> FieldValue {
    FieldValue::F64(value.to_bits())
  }
}

impl From<&'static str> for FieldValue {
  fn from(value: &'static str) -> FieldValue {
    FieldValue::Str(Cow::Borrowed(value))
  }
}

impl From<String> for FieldValue {
  fn from(value: String) -> FieldValue {
    FieldValue::Str(Cow::Owned(value))
  }
}

impl From<Vec<u8>> for FieldValue {
  fn from(value: Vec<u8>) -> FieldValue {
    FieldValue::Bytes(Cow::Owned(value))
  }
}

impl From<DateTime<Utc>> for FieldValue {
  fn from(value: DateTime<Utc>) -> FieldValue {
    FieldValue::Time(value)
  }
}

/// Owned-vector array payloads backing the collection constructors.
pub struct Strings(pub Vec<String>);

impl ArrayMarshaler for Strings {
  fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> io::Result<()> {
    for value in &self.0 {
      enc.append_str(value);
    }
    Ok(())
  }
}

pub struct Ints(pub Vec<i64>);

impl ArrayMarshaler for Ints {
  fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> io::Result<()> {
    for value in &self.0 {
      enc.append_i64(*value);
    }
    Ok(())
  }
}

pub struct Uints(pub Vec<u64>);

impl ArrayMarshaler for Uints {
  fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> io::Result<()> {
    for value in &self.0 {
      enc.append_u64(*value);
    }
    Ok(())
  }
}

pub struct Floats(pub Vec<f64>);

impl ArrayMarshaler for Floats {
  fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> io::Result<()> {
    for value in &self.0 {
      enc.append_f64(*value);
    }
    Ok(())
  }
}

pub struct Bools(pub Vec<bool>);

impl ArrayMarshaler for Bools {
  fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> io::Result<()> {
    for value in &self.0 {
      enc.append_bool(*value);
    }
    Ok(())
  }
}
