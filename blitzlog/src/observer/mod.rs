//! # Observer Module
//!
//! Test support that ships with the library: an in-memory [`Core`] that
//! records every admitted entry with its fields, and capturing/failing
//! sinks for pipeline assertions. Production code never needs this module;
//! the library's own tests lean on it heavily.


use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::core::Core;
use crate::entry::{CheckedEntry, Entry};
use crate::field::Field;
use crate::level::{Level, LevelEnabler};
use crate::sink::WriteSyncer;

/// One recorded log call: the post-hook entry plus accumulated context and
/// call-site fields, in encoding order.
#[derive(Debug, Clone)]
pub struct ObservedEntry {
  pub entry: Entry,
  pub fields: Vec<Field>,
}

/// Shared view over everything an observer core recorded.
#[derive(Clone, Default)]
pub struct ObservedLogs {
  entries: Arc<Mutex<Vec<ObservedEntry>>>,
}

impl ObservedLogs {
  pub fn len(&self) -> usize {
    self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Snapshot of everything recorded so far.
  pub fn all(&self) -> Vec<ObservedEntry> {
    self
      .entries
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  /// Drain the recorded entries.
  pub fn take_all(&self) -> Vec<ObservedEntry> {
    std::mem::take(&mut *self.entries.lock().unwrap_or_else(|e| e.into_inner()))
  }

  fn push(&self, observed: ObservedEntry) {
    self
      .entries
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(observed);
  }
}

struct ObserverCore {
  enab: Arc<dyn LevelEnabler>,
  context: Vec<Field>,
  logs: ObservedLogs,
}

/// An in-memory core admitting everything `enab` allows, paired with the
/// handle that reads back what it saw.
pub fn new_observer(enab: Arc<dyn LevelEnabler>) -> (Arc<dyn Core>, ObservedLogs) {
  let logs = ObservedLogs::default();
  let core = Arc::new(ObserverCore {
    enab,
    context: Vec::new(),
    logs: logs.clone(),
  });
  (core, logs)
}

impl Core for ObserverCore {
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
    let mut context = self.context.clone();
    context.extend_from_slice(fields);
    Arc::new(ObserverCore {
      enab: Arc::clone(&self.enab),
      context,
      logs: self.logs.clone(),
    })
  }

  fn write(&self, entry: &Entry, fields: &[Field]) -> io::Result<()> {
    let mut all = self.context.clone();
    all.extend_from_slice(fields);
    self.logs.push(ObservedEntry {
      entry: entry.clone(),
      fields: all,
    });
    Ok(())
  }

  fn sync(&self) -> io::Result<()> {
    Ok(())
  }
}

/// A sink that records bytes and counts syncs.
#[derive(Clone, Default)]
pub struct TestSink {
  data: Arc<Mutex<Vec<u8>>>,
  syncs: Arc<AtomicUsize>,
}

impl TestSink {
  pub fn new() -> TestSink {
    TestSink::default()
  }

  pub fn contents(&self) -> Vec<u8> {
    self.data.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn as_string(&self) -> String {
    String::from_utf8_lossy(&self.contents()).into_owned()
  }

  /// Complete lines written so far, line endings stripped.
  pub fn lines(&self) -> Vec<String> {
    self
      .as_string()
      .lines()
      .map(|line| line.to_string())
      .collect()
  }

  pub fn sync_count(&self) -> usize {
    self.syncs.load(Ordering::Acquire)
  }
}

impl WriteSyncer for TestSink {
  fn write_bytes(&self, buf: &[u8]) -> io::Result<usize> {
    self
      .data
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .extend_from_slice(buf);
    Ok(buf.len())
  }

  fn sync(&self) -> io::Result<()> {
    self.syncs.fetch_add(1, Ordering::AcqRel);
    Ok(())
  }
}

/// A sink whose writes and syncs always fail, for error-path tests.
pub struct FailingSink;

impl WriteSyncer for FailingSink {
  fn write_bytes(&self, _buf: &[u8]) -> io::Result<usize> {
    Err(io::Error::other("sink write refused"))
  }

  fn sync(&self) -> io::Result<()> {
    Err(io::Error::other("sink sync refused"))
  }
}
