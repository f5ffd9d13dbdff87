//! # Sampler Module
//!
//! A [`Core`] decorator that caps the rate of duplicate messages. Identity
//! is the `(level, message)` pair; within one tick the first `initial`
//! entries pass, then one out of every `thereafter` (zero drops the rest).
//!
//! ## Counter Table
//!
//! Lookup is a fixed-size, lossy hash table: 4096 buckets per level keyed
//! by an FNV-1a hash of the message. Collisions share a bucket and
//! over-sample; they never drop out of order, and the table neither grows
//! nor evicts — a colliding message simply overwrites nothing and shares
//! the count. Increments are relaxed fetch-adds; the tick roll-over is a
//! single CAS, and losers fall back to incrementing the fresh window.

mod __test__;

use std::io;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::Core;
use crate::entry::{CheckedEntry, Entry};
use crate::field::Field;
use crate::level::Level;

const COUNTERS_PER_LEVEL: usize = 4096;
const NUM_LEVELS: usize = 7;

/// What the sampler decided for one entry; observable through the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingDecision {
  Dropped,
  Sampled,
}

/// Observer invoked for every admission decision. Gives embedders a place
/// to count drops and emit a roll-over report entry.
pub type SamplerHook = fn(&Entry, SamplingDecision);

/// Error from [`new_sampler`] on out-of-range parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSamplerConfig {
  #[error("sampler initial must be at least 1, got {0}")]
  ZeroInitial(u64),
  #[error("sampler tick must be non-zero")]
  ZeroTick,
}

struct Counter {
  reset_at: AtomicI64,
  count: AtomicU64,
}

impl Counter {
  fn new() -> Counter {
    Counter {
      reset_at: AtomicI64::new(0),
      count: AtomicU64::new(0),
    }
  }

  /// Increment within the current tick, or reset the window if the tick
  /// rolled over. Returns the entry's 1-based ordinal in its window.
  fn inc_check_reset(&self, now_nanos: i64, tick_nanos: i64) -> u64 {
    let reset_after = self.reset_at.load(Ordering::Acquire);
    if reset_after > now_nanos {
      return self.count.fetch_add(1, Ordering::Relaxed) + 1;
    }

    self.count.store(1, Ordering::Relaxed);
    let until = now_nanos.saturating_add(tick_nanos);
    if self
      .reset_at
      .compare_exchange(reset_after, until, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      // Another writer won the roll-over; count into its window.
      return self.count.fetch_add(1, Ordering::Relaxed) + 1;
    }
    1
  }
}

struct CounterTable {
  counters: Vec<Counter>,
}

impl CounterTable {
  fn new() -> CounterTable {
    let counters = (0..NUM_LEVELS * COUNTERS_PER_LEVEL)
      .map(|_| Counter::new())
      .collect();
    CounterTable { counters }
  }

  fn bucket(&self, level: Level, message: &str) -> &Counter {
    let slot = fnv32a(message) as usize % COUNTERS_PER_LEVEL;
    &self.counters[level.index() * COUNTERS_PER_LEVEL + slot]
  }
}

/// FNV-1a, 32-bit. Cheap enough to run on every call and stable across
/// platforms.
fn fnv32a(message: &str) -> u32 {
  const OFFSET: u32 = 2_166_136_261;
  const PRIME: u32 = 16_777_619;

  let mut hash = OFFSET;
  for &b in message.as_bytes() {
    hash ^= u32::from(b);
    hash = hash.wrapping_mul(PRIME);
  }
  hash
}

struct Sampler {
  inner: Arc<dyn Core>,
  tick_nanos: i64,
  initial: u64,
  thereafter: u64,
  counts: Arc<CounterTable>,
  hook: Option<SamplerHook>,
}

/// Wrap `inner` with per-message sampling. `initial` entries per tick pass
/// untouched, then one of every `thereafter` (zero: drop all). Children
/// derived through `with` share the parent's counter table.
pub fn new_sampler(
  inner: Arc<dyn Core>,
  tick: Duration,
  initial: u64,
  thereafter: u64,
  hook: Option<SamplerHook>,
) -> Result<Arc<dyn Core>, InvalidSamplerConfig> {
  if initial == 0 {
    return Err(InvalidSamplerConfig::ZeroInitial(initial));
  }
  if tick.is_zero() {
    return Err(InvalidSamplerConfig::ZeroTick);
  }
  Ok(Arc::new(Sampler {
    inner,
    tick_nanos: i64::try_from(tick.as_nanos()).unwrap_or(i64::MAX),
    initial,
    thereafter,
    counts: Arc::new(CounterTable::new()),
    hook,
  }))
}

impl Core for Sampler {
  fn enabled(&self, level: Level) -> bool {
    self.inner.enabled(level)
  }

  fn check(
    self: Arc<Self>,
    entry: &Entry,
    ce: Option<Box<CheckedEntry>>,
  ) -> Option<Box<CheckedEntry>> {
    if !self.enabled(entry.level) {
      return ce;
    }

    let now = entry.time.timestamp_nanos_opt().unwrap_or(i64::MAX);
    let n = self
      .counts
      .bucket(entry.level, &entry.message)
      .inc_check_reset(now, self.tick_nanos);

    if n > self.initial && (self.thereafter == 0 || (n - self.initial) % self.thereafter != 0)
    {
      if let Some(hook) = self.hook {
        hook(entry, SamplingDecision::Dropped);
      }
      return ce;
    }

    if let Some(hook) = self.hook {
      hook(entry, SamplingDecision::Sampled);
    }
    Arc::clone(&self.inner).check(entry, ce)
  }

  fn with(&self, fields: &[Field]) -> Arc<dyn Core> {
    Arc::new(Sampler {
      inner: self.inner.with(fields),
      tick_nanos: self.tick_nanos,
      initial: self.initial,
      thereafter: self.thereafter,
      counts: Arc::clone(&self.counts),
      hook: self.hook,
    })
  }

  fn write(&self, entry: &Entry, fields: &[Field]) -> io::Result<()> {
    self.inner.write(entry, fields)
  }

  fn sync(&self) -> io::Result<()> {
    self.inner.sync()
  }
}
