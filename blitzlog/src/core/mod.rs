//! # Core Module
//!
//! The leveled write pipeline primitive. A [`Core`] decides admission,
//! attaches itself to the commit ticket, serializes, and emits. Cores are
//! pure compositions: fan-out ([`tee`]), admission tightening
//! ([`increase_level`]), field dropping ([`filter_fields`]) and the discard
//! sink ([`NopCore`]) are all decorators over the same trait.
//!
//! `check` takes `self: Arc<Self>` so any core in a decorator chain can
//! attach the right write target to the ticket without knowing its place in
//! the composition.


use std::fmt;
use std::io;
use std::sync::Arc;

use crate::encoder::Encoder;
use crate::entry::{CheckedEntry, Entry};
use crate::field::Field;
use crate::level::{Level, LevelEnabler};
use crate::sink::{self, WriteSyncer};

/// The leveled write path.
pub trait Core: Send + Sync {
  /// Admission predicate for a bare level.
  fn enabled(&self, level: Level) -> bool;

  /// If the entry should be logged here, attach this core (or a delegate)
  /// to the ticket. A declined check hands back the ticket untouched.
  fn check(
    self: Arc<Self>,
    entry: &Entry,
    ce: Option<Box<CheckedEntry>>,
  ) -> Option<Box<CheckedEntry>>;

  /// A child core carrying `fields` as accumulated, pre-serialized context.
  fn with(&self, fields: &[Field]) -> Arc<dyn Core>;

  /// Serialize and emit one record.
  fn write(&self, entry: &Entry, fields: &[Field]) -> io::Result<()>;

  /// Flush the underlying sink.
  fn sync(&self) -> io::Result<()>;
}

impl fmt::Debug for dyn Core {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("dyn Core")
  }
}

/// A core that accepts and discards everything.
pub struct NopCore;

impl Core for NopCore {
  fn enabled(&self, _level: Level) -> bool {
    false
  }

  fn check(
    self: Arc<Self>,
    _entry: &Entry,
    ce: Option<Box<CheckedEntry>>,
  ) -> Option<Box<CheckedEntry>> {
    ce
  }

  fn with(&self, _fields: &[Field]) -> Arc<dyn Core> {
    Arc::new(NopCore)
  }

  fn write(&self, _entry: &Entry, _fields: &[Field]) -> io::Result<()> {
    Ok(())
  }

  fn sync(&self) -> io::Result<()> {
    Ok(())
  }
}

/// The reference core: an encoder, a sink, and a level predicate.
///
/// `with` clones the encoder and appends the fields to the clone, so the
/// context is serialized exactly once, at `with` time. `write` renders into
/// a pooled scratch buffer; entries at `Error` and above also flush the
/// sink, since the process may be about to die.
pub struct IoCore {
  enc: Box<dyn Encoder>,
  out: Arc<dyn WriteSyncer>,
  enab: Arc<dyn LevelEnabler>,
}

impl IoCore {
  pub fn new(
    enc: Box<dyn Encoder>,
    out: Arc<dyn WriteSyncer>,
    enab: Arc<dyn LevelEnabler>,
  ) -> IoCore {
    IoCore { enc, out, enab }
  }
}

impl Core for IoCore {
  fn enabled(&self, level: Level) -> bool {
    self.enab.enabled(level)
  }

  fn check(
    self: Arc<Self>,
    entry: &Entry,
    ce: Option<Box<CheckedEntry>>,
  ) -> Option<Box<CheckedEntry>> {
    if self.enabled(entry.level) {
      let this: Arc<dyn Core> = self;
      return Some(CheckedEntry::add_core(ce, entry, this));
    }
    ce
  }

  fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
    let mut enc = self.enc.clone_encoder();
    for field in fields {
      field.add_to(enc.as_object_encoder());
    }
    Arc::new(IoCore {
      enc,
      out: Arc::clone(&self.out),
      enab: Arc::clone(&self.enab),
    })
  }

  fn write(&self, entry: &Entry, fields: &[Field]) -> io::Result<()> {
    let buf = self.enc.encode_entry(entry, fields)?;
    let written = self.out.write_bytes(buf.as_slice())?;
    if written < buf.len() {
      return Err(io::Error::new(
        io::ErrorKind::WriteZero,
        format!("short write: {} of {} bytes", written, buf.len()),
      ));
    }
    if entry.level >= Level::Error {
      // Best effort: the record itself made it out.
      let _ = self.out.sync();
    }
    Ok(())
  }

  fn sync(&self) -> io::Result<()> {
    self.out.sync()
  }
}

/// Fan-out over several cores. Children are consulted in insertion order;
/// a ticket may accumulate several write targets.
pub struct Tee {
  cores: Vec<Arc<dyn Core>>,
}

/// Combine cores into one. Zero children collapse to [`NopCore`], one child
/// is returned as-is.
pub fn tee(mut cores: Vec<Arc<dyn Core>>) -> Arc<dyn Core> {
  match cores.len() {
    0 => Arc::new(NopCore),
    1 => cores.remove(0),
    _ => Arc::new(Tee { cores }),
  }
}

impl Core for Tee {
  fn enabled(&self, level: Level) -> bool {
    self.cores.iter().any(|core| core.enabled(level))
  }

  fn check(
    self: Arc<Self>,
    entry: &Entry,
    ce: Option<Box<CheckedEntry>>,
  ) -> Option<Box<CheckedEntry>> {
    let mut ce = ce;
    for core in &self.cores {
      ce = Arc::clone(core).check(entry, ce);
    }
    ce
  }

  fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
    let children = self.cores.iter().map(|core| core.with(fields)).collect();
    Arc::new(Tee { cores: children })
  }

  fn write(&self, entry: &Entry, fields: &[Field]) -> io::Result<()> {
    let mut err: Option<String> = None;
    for core in &self.cores {
      if let Err(e) = core.write(entry, fields) {
        sink::append_error(&mut err, &e);
      }
    }
    match err {
      Some(message) => Err(io::Error::other(message)),
      None => Ok(()),
    }
  }

  fn sync(&self) -> io::Result<()> {
    let mut err: Option<String> = None;
    for core in &self.cores {
      if let Err(e) = core.sync() {
        sink::append_error(&mut err, &e);
      }
    }
    match err {
      Some(message) => Err(io::Error::other(message)),
      None => Ok(()),
    }
  }
}

/// Error from [`increase_level`] when the proposed floor would weaken the
/// wrapped core's admission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid level increase: {proposed} is already disabled by the wrapped core")]
pub struct InvalidLevelIncrease {
  pub proposed: Level,
}

struct IncreaseLevel {
  inner: Arc<dyn Core>,
  min: Level,
}

/// Tighten a core's admission floor. Construction fails if `min` is below
/// what the wrapped core already rejects, because the wrapper can only
/// tighten, never loosen.
pub fn increase_level(
  inner: Arc<dyn Core>,
  min: Level,
) -> Result<Arc<dyn Core>, InvalidLevelIncrease> {
  if !inner.enabled(min) {
    return Err(InvalidLevelIncrease { proposed: min });
  }
  Ok(Arc::new(IncreaseLevel { inner, min }))
}

impl Core for IncreaseLevel {
  fn enabled(&self, level: Level) -> bool {
    level >= self.min && self.inner.enabled(level)
  }

  fn check(
    self: Arc<Self>,
    entry: &Entry,
    ce: Option<Box<CheckedEntry>>,
  ) -> Option<Box<CheckedEntry>> {
    if !self.enabled(entry.level) {
      return ce;
    }
    Arc::clone(&self.inner).check(entry, ce)
  }

  fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
    Arc::new(IncreaseLevel {
      inner: self.inner.with(fields),
      min: self.min,
    })
  }

  fn write(&self, entry: &Entry, fields: &[Field]) -> io::Result<()> {
    self.inner.write(entry, fields)
  }

  fn sync(&self) -> io::Result<()> {
    self.inner.sync()
  }
}

/// Predicate deciding whether a field is dropped before delegation.
pub type FieldPredicate = Arc<dyn Fn(&Field) -> bool + Send + Sync>;

struct FieldFilter {
  inner: Arc<dyn Core>,
  drop_if: FieldPredicate,
}

/// A core that drops fields matching `drop_if` before handing the record
/// to `inner`. Both accumulated context and per-call fields are filtered.
pub fn filter_fields(inner: Arc<dyn Core>, drop_if: FieldPredicate) -> Arc<dyn Core> {
  Arc::new(FieldFilter { inner, drop_if })
}

impl FieldFilter {
  fn keep(&self, fields: &[Field]) -> Vec<Field> {
    fields
      .iter()
      .filter(|field| !(self.drop_if)(field))
      .cloned()
      .collect()
  }
}

impl Core for FieldFilter {
  fn enabled(&self, level: Level) -> bool {
    self.inner.enabled(level)
  }

  fn check(
    self: Arc<Self>,
    entry: &Entry,
    ce: Option<Box<CheckedEntry>>,
  ) -> Option<Box<CheckedEntry>> {
    if self.enabled(entry.level) {
      let this: Arc<dyn Core> = self;
      return Some(CheckedEntry::add_core(ce, entry, this));
    }
    ce
  }

  fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
    Arc::new(FieldFilter {
      inner: self.inner.with(&self.keep(fields)),
      drop_if: Arc::clone(&self.drop_if),
    })
  }

  fn write(&self, entry: &Entry, fields: &[Field]) -> io::Result<()> {
    self.inner.write(entry, &self.keep(fields))
  }

  fn sync(&self) -> io::Result<()> {
    self.inner.sync()
  }
}
