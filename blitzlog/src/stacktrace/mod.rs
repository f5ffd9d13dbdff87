//! # Stacktrace Module
//!
//! Caller resolution and stack capture on top of the `backtrace` crate.
//! Frames belonging to this crate and to the backtrace machinery are
//! stripped from the top of every capture, so the first reported frame is
//! the log call site; wrapper libraries push the start further out with a
//! skip count. Formatting runs through a pooled buffer.


use backtrace::Backtrace;

use crate::buffer;
use crate::entry::Caller;

struct Frame {
  function: String,
  file: String,
  line: u32,
}

fn is_internal(function: &str) -> bool {
  function.is_empty()
    || function.contains("blitzlog::")
    || function.starts_with("backtrace::")
    || function.starts_with("std::backtrace")
}

/// Resolve the current stack, already stripped of internal frames.
fn resolved_frames() -> Vec<Frame> {
  let bt = Backtrace::new();
  let mut frames = Vec::new();
  let mut past_internal = false;

  for frame in bt.frames() {
    for symbol in frame.symbols() {
      // `{:#}` drops the trailing hash from the demangled name.
      let function = symbol
        .name()
        .map(|name| format!("{:#}", name))
        .unwrap_or_default();

      if !past_internal {
        if is_internal(&function) {
          continue;
        }
        past_internal = true;
      }

      let file = symbol
        .filename()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_default();
      frames.push(Frame {
        function,
        file,
        line: symbol.lineno().unwrap_or(0),
      });
    }
  }
  frames
}

/// Resolve the log call site, `skip` frames above the immediate caller.
/// Returns `None` when symbols cannot be resolved; the record is still
/// written without a caller.
pub fn capture_caller(skip: usize) -> Option<Caller> {
  resolved_frames().into_iter().nth(skip).map(|frame| Caller {
    file: frame.file,
    line: frame.line,
    function: frame.function,
  })
}

/// Capture a textual stack trace starting `skip` frames above the call
/// site. Each frame renders as `function\n\tfile:line`.
pub fn capture_stack(skip: usize) -> String {
  let mut buf = buffer::global().get();

  for frame in resolved_frames().into_iter().skip(skip) {
    if !buf.is_empty() {
      buf.append_byte(b'\n');
    }
    buf.append_str(&frame.function);
    buf.append_str("\n\t");
    buf.append_str(&frame.file);
    buf.append_byte(b':');
    buf.append_u64(u64::from(frame.line));
  }

  String::from_utf8_lossy(buf.as_slice()).into_owned()
}
