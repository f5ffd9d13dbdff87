//! # Logger Module
//!
//! The user-facing front end over a [`Core`]. A `Logger` is a cheap handle:
//! cloning shares the core, `with` derives a child whose context is
//! serialized once, and the leveled methods ride the `check` fast path so a
//! disabled call costs one atomic load and one branch.
//!
//! ## Fatal and Panic Semantics
//!
//! `panic` unwinds and `fatal` terminates the process, but only after every
//! admitted core has written and pooled resources are back where they
//! belong. `dpanic` panics only in development mode; in production it is an
//! error-level record.
//!
//! ## Internal Errors
//!
//! Hook failures, encode failures, and sink failures never reach the
//! caller. They become single lines on the error sink (stderr by default),
//! and the log call carries on.


use std::io;
use std::sync::Arc;

use crate::core::{self, Core, NopCore};
use crate::entry::{CheckWriteAction, CheckedEntry, Entry, OnFatal};
use crate::field::Field;
use crate::level::Level;
use crate::sink::{self, StderrSink, WriteSyncer};
use crate::stacktrace;

/// An ordered callback that may rewrite the entry immediately before it is
/// written. Errors go to the error sink; the write proceeds regardless.
pub type Hook = Arc<dyn Fn(&mut Entry) -> io::Result<()> + Send + Sync>;

/// The leveled, structured logging front end.
///
/// Options are chainable consuming methods; each returns the reconfigured
/// logger and never mutates the original, so handing a customized child to
/// a subsystem cannot change the parent's behavior.
#[derive(Clone)]
pub struct Logger {
  core: Arc<dyn Core>,
  name: String,
  name_separator: String,
  development: bool,
  add_caller: bool,
  caller_skip: usize,
  stack_min: Option<Level>,
  error_output: Arc<dyn WriteSyncer>,
  hooks: Vec<Hook>,
  on_fatal: OnFatal,
}

impl Logger {
  /// A logger over `core` with production defaults: no caller capture, no
  /// stack traces, errors to stderr, fatal exits the process.
  pub fn new(core: Arc<dyn Core>) -> Logger {
    Logger {
      core,
      name: String::new(),
      name_separator: ".".to_string(),
      development: false,
      add_caller: false,
      caller_skip: 0,
      stack_min: None,
      error_output: Arc::new(StderrSink),
      hooks: Vec::new(),
      on_fatal: OnFatal::Exit,
    }
  }

  /// A logger that never writes anywhere. Useful as a default collaborator.
  pub fn nop() -> Logger {
    Logger::new(Arc::new(NopCore))
  }

  /// The underlying core, for composition.
  pub fn core(&self) -> Arc<dyn Core> {
    Arc::clone(&self.core)
  }

  /// Current logger name; empty for the root.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// A child logger carrying `fields` as pre-serialized context. Neither
  /// logger observes the other's later mutations.
  ///
  /// Context keys may shadow built-in keys such as `"level"`; the encoder
  /// emits the duplicate rather than guessing, so downstream schemas should
  /// avoid the collision.
  pub fn with(&self, fields: &[Field]) -> Logger {
    if fields.is_empty() {
      return self.clone();
    }
    let mut child = self.clone();
    child.core = self.core.with(fields);
    child
  }

  /// A child whose name extends this logger's by one segment.
  pub fn named(&self, segment: &str) -> Logger {
    let mut child = self.clone();
    if segment.is_empty() {
      return child;
    }
    child.name = if self.name.is_empty() {
      segment.to_string()
    } else {
      format!("{}{}{}", self.name, self.name_separator, segment)
    };
    child
  }

  /// Resolve the caller's file, line, and function at `check` time.
  pub fn with_caller(mut self, enabled: bool) -> Logger {
    self.add_caller = enabled;
    self
  }

  /// Skip `n` additional frames when resolving the caller; wrapper
  /// libraries set this to their own frame depth.
  pub fn with_caller_skip(mut self, n: usize) -> Logger {
    self.caller_skip += n;
    self
  }

  /// Capture a stack trace on every entry at or above `min`.
  pub fn with_stacktrace(mut self, min: Level) -> Logger {
    self.stack_min = Some(min);
    self
  }

  /// Route internal errors (hook, encode, sink failures) to `sink`.
  pub fn with_error_output(mut self, sink: Arc<dyn WriteSyncer>) -> Logger {
    self.error_output = sink;
    self
  }

  /// Append entry hooks, run in insertion order before every write.
  pub fn with_hooks(mut self, hooks: Vec<Hook>) -> Logger {
    self.hooks.extend(hooks);
    self
  }

  /// Baseline fields, equivalent to one `with` at construction.
  pub fn with_fields(&self, fields: &[Field]) -> Logger {
    self.with(fields)
  }

  /// Development mode: `dpanic` panics instead of logging an error.
  pub fn development(mut self) -> Logger {
    self.development = true;
    self
  }

  /// Tighten the admission floor. Fails if `min` is below the core's
  /// existing floor, since wrapping can only tighten.
  pub fn increase_level(mut self, min: Level) -> Result<Logger, core::InvalidLevelIncrease> {
    self.core = core::increase_level(self.core, min)?;
    Ok(self)
  }

  /// Replace the fatal action. The default exits with status 1 after the
  /// sinks are flushed.
  pub fn with_on_fatal(mut self, action: OnFatal) -> Logger {
    self.on_fatal = action;
    self
  }

  /// Separator used by [`Logger::named`] when joining segments.
  pub fn with_name_separator(mut self, separator: String) -> Logger {
    self.name_separator = separator;
    self
  }

  /// The fast path. Returns a commit ticket when the entry should be
  /// processed; `None` means the fields need not even be evaluated.
  ///
  /// `DPanic` (in development), `Panic`, and `Fatal` always produce a
  /// ticket: their side effect must fire even when every core declines the
  /// record.
  pub fn check(&self, level: Level, message: &str) -> Option<Box<CheckedEntry>> {
    let mut entry = Entry::new(level, message);
    entry.logger_name.clone_from(&self.name);

    let ce = Arc::clone(&self.core).check(&entry, None);

    let action = match level {
      Level::Panic => CheckWriteAction::Panic,
      Level::Fatal => CheckWriteAction::Fatal,
      Level::DPanic if self.development => CheckWriteAction::Panic,
      _ => CheckWriteAction::Noop,
    };

    let mut ce = match ce {
      Some(ce) => ce,
      None if action != CheckWriteAction::Noop => CheckedEntry::acquire(&entry),
      None => return None,
    };

    ce = ce
      .should(action)
      .with_error_output(Arc::clone(&self.error_output));
    if action == CheckWriteAction::Fatal {
      ce = ce.with_on_fatal(self.on_fatal.clone());
    }

    // Caller and stack resolve here, on the calling thread, before any
    // user hooks see the entry.
    if self.add_caller {
      match stacktrace::capture_caller(self.caller_skip) {
        Some(caller) => ce.entry.caller = Some(caller),
        None => sink::report_internal(
          self.error_output.as_ref(),
          "Logger.check error",
          &"failed to resolve caller",
        ),
      }
    }
    if let Some(min) = self.stack_min {
      if level >= min {
        ce.entry.stack = Some(stacktrace::capture_stack(self.caller_skip));
      }
    }
    for hook in &self.hooks {
      if let Err(err) = hook(&mut ce.entry) {
        sink::report_internal(self.error_output.as_ref(), "Logger.check hook error", &err);
      }
    }

    Some(ce)
  }

  fn log(&self, level: Level, message: &str, fields: &[Field]) {
    if let Some(ce) = self.check(level, message) {
      ce.write(fields);
    }
  }

  pub fn debug(&self, message: &str, fields: &[Field]) {
    self.log(Level::Debug, message, fields);
  }

  pub fn info(&self, message: &str, fields: &[Field]) {
    self.log(Level::Info, message, fields);
  }

  pub fn warn(&self, message: &str, fields: &[Field]) {
    self.log(Level::Warn, message, fields);
  }

  pub fn error(&self, message: &str, fields: &[Field]) {
    self.log(Level::Error, message, fields);
  }

  /// Logs at `DPanic` level, panicking afterwards in development mode.
  pub fn dpanic(&self, message: &str, fields: &[Field]) {
    self.log(Level::DPanic, message, fields);
  }

  /// Logs, then panics with the message.
  pub fn panic(&self, message: &str, fields: &[Field]) {
    self.log(Level::Panic, message, fields);
  }

  /// Logs, flushes, then runs the configured fatal action (default: exit
  /// with status 1).
  pub fn fatal(&self, message: &str, fields: &[Field]) {
    self.log(Level::Fatal, message, fields);
  }

  /// Flush the underlying sinks.
  pub fn sync(&self) -> io::Result<()> {
    self.core.sync()
  }
}
