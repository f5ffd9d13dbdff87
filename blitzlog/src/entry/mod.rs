//! # Entry Module
//!
//! The record being emitted and its pooled commit ticket.
//!
//! ## Lifecycle
//!
//! ```text
//! (none) ── acquire from pool ─▶ Allocated(entry, should=Noop, cores=∅)
//! Allocated ── core.check attaches ─▶ Attached(entry, …cores)
//! Attached ── write(fields) ─▶ every core writes ─▶ released to pool
//! Attached ── write at panic/fatal level ─▶ released, then panic / exit
//! Allocated ── dropped without write ─▶ released to pool
//! ```
//!
//! `write` consumes the `Box`, so a ticket cannot be written twice or
//! retained afterwards; the type system enforces the acquire/release
//! pairing. Entries inside recycled tickets keep their string capacity, so
//! steady-state logging does not allocate for the record itself.

mod __test__;

use chrono::{DateTime, Utc};
use crossbeam_queue::ArrayQueue;
use smallvec::SmallVec;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::core::Core;
use crate::field::Field;
use crate::level::Level;
use crate::sink::{self, WriteSyncer};

/// Number of recycled tickets the process-wide pool retains.
const TICKET_POOL_SLOTS: usize = 64;

/// Resolved source location of a log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
  pub file: String,
  pub line: u32,
  pub function: String,
}

impl Caller {
  /// The full path form: `src/server/accept.rs:91`.
  pub fn full_path(&self) -> String {
    format!("{}:{}", self.file, self.line)
  }

  /// The trimmed form keeps the last directory and the file name:
  /// `server/accept.rs:91`.
  pub fn trimmed_path(&self) -> String {
    match self.file.rfind('/') {
      None => format!("{}:{}", self.file, self.line),
      Some(last) => {
        let prefix = &self.file[..last];
        let start = prefix.rfind('/').map(|i| i + 1).unwrap_or(0);
        format!("{}:{}", &self.file[start..], self.line)
      },
    }
  }
}

impl fmt::Display for Caller {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.file, self.line)
  }
}

/// A single log record.
#[derive(Debug, Clone)]
pub struct Entry {
  pub level: Level,
  pub time: DateTime<Utc>,
  pub logger_name: String,
  pub message: String,
  pub caller: Option<Caller>,
  pub stack: Option<String>,
}

impl Entry {
  pub fn new(level: Level, message: &str) -> Entry {
    Entry {
      level,
      time: Utc::now(),
      logger_name: String::new(),
      message: message.to_string(),
      caller: None,
      stack: None,
    }
  }

  fn placeholder() -> Entry {
    Entry {
      level: Level::Info,
      time: DateTime::UNIX_EPOCH,
      logger_name: String::new(),
      message: String::new(),
      caller: None,
      stack: None,
    }
  }
}

/// Side effect executed after a ticket's write completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckWriteAction {
  Noop,
  Panic,
  Fatal,
}

/// What a fatal-level write does once every core has written. The sink was
/// already synced by the write itself.
#[derive(Clone)]
pub enum OnFatal {
  /// Terminate the process with status 1. The default.
  Exit,
  /// Unwind instead of exiting, for embedders that trap panics.
  Panic,
  /// Hand control to the embedder.
  Hook(Arc<dyn Fn(&Entry) + Send + Sync>),
}

impl OnFatal {
  fn run(&self, entry: &Entry) {
    match self {
      OnFatal::Exit => std::process::exit(1),
      OnFatal::Panic => panic!("{}", entry.message),
      OnFatal::Hook(hook) => hook(entry),
    }
  }
}

impl fmt::Debug for OnFatal {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      OnFatal::Exit => f.write_str("Exit"),
      OnFatal::Panic => f.write_str("Panic"),
      OnFatal::Hook(_) => f.write_str("Hook(..)"),
    }
  }
}

/// A pooled commit ticket: the entry plus every core that admitted it.
///
/// Produced by a positive `check` decision; `None` in the
/// `Option<Box<CheckedEntry>>` position means "disabled — discard fields".
pub struct CheckedEntry {
  pub entry: Entry,
  should: CheckWriteAction,
  on_fatal: OnFatal,
  error_output: Option<Arc<dyn WriteSyncer>>,
  cores: SmallVec<[Arc<dyn Core>; 4]>,
}

fn ticket_pool() -> &'static ArrayQueue<Box<CheckedEntry>> {
  static POOL: OnceLock<ArrayQueue<Box<CheckedEntry>>> = OnceLock::new();
  POOL.get_or_init(|| ArrayQueue::new(TICKET_POOL_SLOTS))
}

fn release(mut ce: Box<CheckedEntry>) {
  ce.should = CheckWriteAction::Noop;
  ce.on_fatal = OnFatal::Exit;
  ce.error_output = None;
  ce.cores.clear();
  ce.entry.caller = None;
  ce.entry.stack = None;
  // Message and name keep their capacity for the next cycle; a full pool
  // drops the ticket on the floor.
  let _ = ticket_pool().push(ce);
}

impl CheckedEntry {
  /// Check a ticket out of the pool, carrying a copy of `entry`.
  pub fn acquire(entry: &Entry) -> Box<CheckedEntry> {
    match ticket_pool().pop() {
      Some(mut ce) => {
        ce.entry.clone_from(entry);
        ce
      },
      None => Box::new(CheckedEntry {
        entry: entry.clone(),
        should: CheckWriteAction::Noop,
        on_fatal: OnFatal::Exit,
        error_output: None,
        cores: SmallVec::new(),
      }),
    }
  }

  /// Attach `core` as a write target, acquiring a ticket first if this is
  /// the first core to admit the entry.
  pub fn add_core(
    ce: Option<Box<CheckedEntry>>,
    entry: &Entry,
    core: Arc<dyn Core>,
  ) -> Box<CheckedEntry> {
    let mut ce = ce.unwrap_or_else(|| CheckedEntry::acquire(entry));
    ce.cores.push(core);
    ce
  }

  /// Record the post-write side effect.
  pub fn should(mut self: Box<Self>, action: CheckWriteAction) -> Box<Self> {
    self.should = action;
    self
  }

  pub fn with_on_fatal(mut self: Box<Self>, action: OnFatal) -> Box<Self> {
    self.on_fatal = action;
    self
  }

  pub fn with_error_output(mut self: Box<Self>, sink: Arc<dyn WriteSyncer>) -> Box<Self> {
    self.error_output = Some(sink);
    self
  }

  /// Write targets attached so far.
  pub fn core_count(&self) -> usize {
    self.cores.len()
  }

  /// Release the ticket without writing. Dropping a ticket instead is safe
  /// but returns the allocation to the allocator rather than the pool.
  pub fn discard(self: Box<Self>) {
    release(self);
  }

  /// Commit the record: every attached core sees the same entry and the
  /// same field slice, write errors land on the error sink, the ticket
  /// returns to the pool, and only then does any terminal side effect run.
  pub fn write(mut self: Box<Self>, fields: &[Field]) {
    let mut err: Option<String> = None;
    for core in &self.cores {
      if let Err(e) = core.write(&self.entry, fields) {
        sink::append_error(&mut err, &e);
      }
    }

    if let Some(message) = err {
      match &self.error_output {
        Some(out) => sink::report_internal(out.as_ref(), "write error", &message),
        None => eprintln!("[blitzlog] write error: {}", message),
      }
    }

    let should = self.should;
    if should == CheckWriteAction::Noop {
      release(self);
      return;
    }

    let on_fatal = self.on_fatal.clone();
    let entry = std::mem::replace(&mut self.entry, Entry::placeholder());
    release(self);

    match should {
      CheckWriteAction::Noop => {},
      CheckWriteAction::Panic => panic!("{}", entry.message),
      CheckWriteAction::Fatal => on_fatal.run(&entry),
    }
  }
}

impl fmt::Debug for CheckedEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CheckedEntry")
      .field("entry", &self.entry)
      .field("should", &self.should)
      .field("cores", &self.cores.len())
      .finish()
  }
}
