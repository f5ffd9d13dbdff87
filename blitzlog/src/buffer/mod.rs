
use crossbeam_queue::ArrayQueue;
use std::io;
use std::sync::{Arc, OnceLock};

/// Initial capacity of a fresh buffer. Sized so that a typical log line
/// never reallocates.
const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Number of recycled buffers the process-wide pool retains.
const POOL_SLOTS: usize = 64;

/// A growable byte buffer checked out of a [`BufferPool`].
///
/// Dropping the buffer truncates it and returns the allocation to its pool,
/// so the hot path reuses capacity instead of hitting the allocator. A
/// buffer must not be retained after release; ownership makes that
/// unrepresentable.
pub struct Buffer {
  data: Vec<u8>,
  pool: Option<Arc<ArrayQueue<Vec<u8>>>>,
}

impl Buffer {
  /// A standalone buffer that returns its allocation to the global pool on
  /// drop.
  pub fn new() -> Self {
    global().get()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  #[inline]
  pub fn as_slice(&self) -> &[u8] {
    &self.data
  }

  #[inline]
  pub fn last_byte(&self) -> Option<u8> {
    self.data.last().copied()
  }

  #[inline]
  pub fn clear(&mut self) {
    self.data.clear();
  }

  #[inline]
  pub fn truncate(&mut self, len: usize) {
    self.data.truncate(len);
  }

  #[inline]
  pub fn append_byte(&mut self, b: u8) {
    self.data.push(b);
  }

  #[inline]
  pub fn append_bytes(&mut self, bytes: &[u8]) {
    self.data.extend_from_slice(bytes);
  }

  #[inline]
  pub fn append_str(&mut self, s: &str) {
    self.data.extend_from_slice(s.as_bytes());
  }

  /// Append a base-10 signed integer without allocating.
  #[inline]
  pub fn append_i64(&mut self, value: i64) {
    let mut scratch = itoa::Buffer::new();
    self.append_str(scratch.format(value));
  }

  /// Append a base-10 unsigned integer without allocating.
  #[inline]
  pub fn append_u64(&mut self, value: u64) {
    let mut scratch = itoa::Buffer::new();
    self.append_str(scratch.format(value));
  }

  /// Append the shortest round-trip decimal form of a finite `f64`.
  /// Non-finite values are the encoder's responsibility.
  #[inline]
  pub fn append_f64(&mut self, value: f64) {
    let mut scratch = ryu::Buffer::new();
    self.append_str(scratch.format(value));
  }

  /// Append the shortest round-trip decimal form of a finite `f32`.
  #[inline]
  pub fn append_f32(&mut self, value: f32) {
    let mut scratch = ryu::Buffer::new();
    self.append_str(scratch.format(value));
  }
}

impl Default for Buffer {
  fn default() -> Self {
    Self::new()
  }
}

impl io::Write for Buffer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.data.extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl Drop for Buffer {
  fn drop(&mut self) {
    if let Some(pool) = self.pool.take() {
      let mut data = std::mem::take(&mut self.data);
      data.truncate(0);
      // A full pool drops the allocation on the floor.
      let _ = pool.push(data);
    }
  }
}

/// A fixed-size free list of byte buffers.
///
/// `get` pops a recycled allocation or creates one sized at
/// [`DEFAULT_BUFFER_CAPACITY`]; the returned [`Buffer`] releases itself back
/// into the queue on drop.
#[derive(Debug, Clone)]
pub struct BufferPool {
  queue: Arc<ArrayQueue<Vec<u8>>>,
}

impl BufferPool {
  pub fn new(slots: usize) -> Self {
    Self {
      queue: Arc::new(ArrayQueue::new(slots)),
    }
  }

  /// Check a buffer out of the pool. Length is always zero on acquire.
  pub fn get(&self) -> Buffer {
    let mut data = self
      .queue
      .pop()
      .unwrap_or_else(|| Vec::with_capacity(DEFAULT_BUFFER_CAPACITY));
    data.clear();
    Buffer {
      data,
      pool: Some(Arc::clone(&self.queue)),
    }
  }

  /// Recycled buffers currently resident in the pool.
  pub fn idle(&self) -> usize {
    self.queue.len()
  }
}

impl Default for BufferPool {
  fn default() -> Self {
    Self::new(POOL_SLOTS)
  }
}

/// The process-wide pool shared by encoders and stack capture.
pub fn global() -> &'static BufferPool {
  static POOL: OnceLock<BufferPool> = OnceLock::new();
  POOL.get_or_init(BufferPool::default)
}
