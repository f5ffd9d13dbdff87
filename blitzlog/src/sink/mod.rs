//! # Sink Module
//!
//! The byte destination abstraction. A [`WriteSyncer`] accepts rendered
//! record bytes and can be flushed; combinators add locking and fan-out.
//! Everything here is object-safe and shared behind `Arc`, so one file can
//! back many cores.


use chrono::{SecondsFormat, Utc};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A byte sink with a flush primitive.
///
/// `write_bytes` must be atomic with respect to other writers on the same
/// sink: implementations either lock internally or are wrapped in
/// [`Locked`]. A successful call reports the full byte count written.
pub trait WriteSyncer: Send + Sync {
  fn write_bytes(&self, buf: &[u8]) -> io::Result<usize>;
  fn sync(&self) -> io::Result<()>;
}

/// Mutex wrapper turning any `io::Write` into a [`WriteSyncer`].
///
/// This is both the locking combinator and the plain-writer adapter: writes
/// are serialized, whole lines never interleave, and `sync` flushes the
/// inner writer.
pub struct Locked<W: Write + Send> {
  inner: Mutex<W>,
}

impl<W: Write + Send> Locked<W> {
  pub fn new(inner: W) -> Self {
    Self {
      inner: Mutex::new(inner),
    }
  }
}

/// Wrap a non-thread-safe writer with mutual exclusion.
pub fn lock<W: Write + Send>(w: W) -> Locked<W> {
  Locked::new(w)
}

/// Adapt a bare writer into a [`WriteSyncer`]; its `sync` is the writer's
/// flush.
pub fn add_sync<W: Write + Send>(w: W) -> Locked<W> {
  Locked::new(w)
}

impl<W: Write + Send> WriteSyncer for Locked<W> {
  fn write_bytes(&self, buf: &[u8]) -> io::Result<usize> {
    // A poisoned lock still holds a usable writer.
    let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    inner.write_all(buf)?;
    Ok(buf.len())
  }

  fn sync(&self) -> io::Result<()> {
    let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    inner.flush()
  }
}

/// Process standard output. The handle's own lock serializes writers.
pub struct StdoutSink;

impl WriteSyncer for StdoutSink {
  fn write_bytes(&self, buf: &[u8]) -> io::Result<usize> {
    let mut handle = io::stdout().lock();
    handle.write_all(buf)?;
    Ok(buf.len())
  }

  fn sync(&self) -> io::Result<()> {
    io::stdout().lock().flush()
  }
}

/// Process standard error.
pub struct StderrSink;

impl WriteSyncer for StderrSink {
  fn write_bytes(&self, buf: &[u8]) -> io::Result<usize> {
    let mut handle = io::stderr().lock();
    handle.write_all(buf)?;
    Ok(buf.len())
  }

  fn sync(&self) -> io::Result<()> {
    io::stderr().lock().flush()
  }
}

/// Append-mode file sink. `sync` reaches the disk via `sync_all`.
pub struct FileSink {
  file: Mutex<File>,
}

impl FileSink {
  /// Open (or create) the file for appending, creating parent directories
  /// as needed.
  pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)?;
      }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Self {
      file: Mutex::new(file),
    })
  }
}

impl WriteSyncer for FileSink {
  fn write_bytes(&self, buf: &[u8]) -> io::Result<usize> {
    let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
    file.write_all(buf)?;
    Ok(buf.len())
  }

  fn sync(&self) -> io::Result<()> {
    let file = self.file.lock().unwrap_or_else(|e| e.into_inner());
    file.sync_all()
  }
}

/// Fan-out sink. Reports the minimum byte count any child accepted and
/// aggregates child errors into one.
pub struct MultiWriteSyncer {
  sinks: Vec<Arc<dyn WriteSyncer>>,
}

impl MultiWriteSyncer {
  pub fn new(sinks: Vec<Arc<dyn WriteSyncer>>) -> Self {
    Self { sinks }
  }
}

impl WriteSyncer for MultiWriteSyncer {
  fn write_bytes(&self, buf: &[u8]) -> io::Result<usize> {
    let mut written = buf.len();
    let mut err: Option<String> = None;

    for sink in &self.sinks {
      match sink.write_bytes(buf) {
        Ok(n) => written = written.min(n),
        Err(e) => {
          written = 0;
          append_error(&mut err, &e);
        },
      }
    }

    match err {
      Some(message) => Err(io::Error::other(message)),
      None => Ok(written),
    }
  }

  fn sync(&self) -> io::Result<()> {
    let mut err: Option<String> = None;
    for sink in &self.sinks {
      if let Err(e) = sink.sync() {
        append_error(&mut err, &e);
      }
    }
    match err {
      Some(message) => Err(io::Error::other(message)),
      None => Ok(()),
    }
  }
}

/// Fan writes out to every given sink.
pub fn tee_sinks(sinks: Vec<Arc<dyn WriteSyncer>>) -> MultiWriteSyncer {
  MultiWriteSyncer::new(sinks)
}

pub(crate) fn append_error(acc: &mut Option<String>, err: &dyn fmt::Display) {
  match acc {
    Some(existing) => {
      existing.push_str("; ");
      existing.push_str(&err.to_string());
    },
    None => *acc = Some(err.to_string()),
  }
}

/// Resolve an output path. `"stdout"` and `"stderr"` map to the process
/// streams; anything else is opened as an append-mode file.
pub fn open(path: &str) -> io::Result<Arc<dyn WriteSyncer>> {
  match path {
    "stdout" => Ok(Arc::new(StdoutSink)),
    "stderr" => Ok(Arc::new(StderrSink)),
    other => Ok(Arc::new(FileSink::open(other)?)),
  }
}

/// Open several paths and fan out to all of them.
pub fn open_sinks(paths: &[String]) -> io::Result<Arc<dyn WriteSyncer>> {
  let mut sinks = Vec::with_capacity(paths.len());
  for path in paths {
    sinks.push(open(path)?);
  }
  if sinks.len() == 1 {
    return Ok(sinks.remove(0));
  }
  Ok(Arc::new(MultiWriteSyncer::new(sinks)))
}

/// Best-effort internal error reporting: one timestamped line on the error
/// sink, falling back to stderr when even that write fails. Never recurses
/// into the main pipeline.
pub(crate) fn report_internal(sink: &dyn WriteSyncer, context: &str, err: &dyn fmt::Display) {
  let line = format!(
    "{} {}: {}\n",
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    context,
    err
  );
  if sink.write_bytes(line.as_bytes()).is_err() {
    eprintln!("[blitzlog] {}: {}", context, err);
    return;
  }
  let _ = sink.sync();
}
