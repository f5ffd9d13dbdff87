#[cfg(test)]
mod __test__ {

  use crate::core::Core;
  use crate::entry::Entry;
  use crate::level::Level;
  use crate::observer::new_observer;
  use crate::sampler::{new_sampler, InvalidSamplerConfig, SamplingDecision};
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  // A tick long enough that a test never straddles a roll-over.
  const TICK: Duration = Duration::from_secs(60);

  fn log_n(core: &Arc<dyn Core>, message: &str, n: usize) {
    for _ in 0..n {
      let entry = Entry::new(Level::Info, message);
      if let Some(ce) = Arc::clone(core).check(&entry, None) {
        ce.write(&[]);
      }
    }
  }

  #[test]
  fn test_rejects_zero_initial() {
    let (inner, _) = new_observer(Arc::new(Level::Debug));
    assert_eq!(
      new_sampler(inner, TICK, 0, 5, None).err(),
      Some(InvalidSamplerConfig::ZeroInitial(0))
    );
  }

  #[test]
  fn test_rejects_zero_tick() {
    let (inner, _) = new_observer(Arc::new(Level::Debug));
    assert_eq!(
      new_sampler(inner, Duration::ZERO, 1, 5, None).err(),
      Some(InvalidSamplerConfig::ZeroTick)
    );
  }

  #[test]
  fn test_initial_then_drop_all() {
    let (inner, logs) = new_observer(Arc::new(Level::Debug));
    let sampler = new_sampler(inner, TICK, 2, 0, None).unwrap();

    log_n(&sampler, "identical", 5);
    assert_eq!(logs.len(), 2);
  }

  #[test]
  fn test_thereafter_keeps_every_mth() {
    let (inner, logs) = new_observer(Arc::new(Level::Debug));
    let sampler = new_sampler(inner, TICK, 2, 3, None).unwrap();

    // 10 identical entries: 2 initial, then ordinals 5 and 8.
    log_n(&sampler, "identical", 10);
    assert_eq!(logs.len(), 4);
  }

  #[test]
  fn test_distinct_messages_sample_independently() {
    let (inner, logs) = new_observer(Arc::new(Level::Debug));
    let sampler = new_sampler(inner, TICK, 1, 0, None).unwrap();

    log_n(&sampler, "alpha", 3);
    log_n(&sampler, "beta", 3);

    let messages: Vec<String> = logs
      .all()
      .iter()
      .map(|observed| observed.entry.message.clone())
      .collect();
    assert_eq!(messages, vec!["alpha".to_string(), "beta".to_string()]);
  }

  #[test]
  fn test_levels_do_not_share_buckets() {
    let (inner, logs) = new_observer(Arc::new(Level::Debug));
    let sampler = new_sampler(inner, TICK, 1, 0, None).unwrap();

    for level in [Level::Info, Level::Warn] {
      let entry = Entry::new(level, "same message");
      if let Some(ce) = Arc::clone(&sampler).check(&entry, None) {
        ce.write(&[]);
      }
    }
    assert_eq!(logs.len(), 2);
  }

  #[test]
  fn test_disabled_levels_bypass_counters() {
    let (inner, logs) = new_observer(Arc::new(Level::Error));
    let sampler = new_sampler(inner, TICK, 1, 0, None).unwrap();

    log_n(&sampler, "quiet", 3);
    assert!(logs.is_empty());
  }

  #[test]
  fn test_with_shares_parent_counters() {
    let (inner, logs) = new_observer(Arc::new(Level::Debug));
    let sampler = new_sampler(inner, TICK, 2, 0, None).unwrap();
    let child = sampler.with(&[crate::field::Field::string("req", "abc")]);

    // Two through the parent exhaust the bucket for the child too.
    log_n(&sampler, "shared", 2);
    log_n(&child, "shared", 2);
    assert_eq!(logs.len(), 2);
  }

  static DROPPED: AtomicUsize = AtomicUsize::new(0);
  static SAMPLED: AtomicUsize = AtomicUsize::new(0);

  fn counting_hook(_entry: &Entry, decision: SamplingDecision) {
    match decision {
      SamplingDecision::Dropped => DROPPED.fetch_add(1, Ordering::Relaxed),
      SamplingDecision::Sampled => SAMPLED.fetch_add(1, Ordering::Relaxed),
    };
  }

  #[test]
  fn test_hook_observes_decisions() {
    let (inner, _) = new_observer(Arc::new(Level::Debug));
    let sampler = new_sampler(inner, TICK, 1, 0, Some(counting_hook)).unwrap();

    log_n(&sampler, "hooked", 4);
    assert_eq!(SAMPLED.load(Ordering::Relaxed), 1);
    assert_eq!(DROPPED.load(Ordering::Relaxed), 3);
  }

  #[test]
  fn test_concurrent_sampling_is_exact() {
    let (inner, logs) = new_observer(Arc::new(Level::Debug));
    let sampler = new_sampler(inner, TICK, 10, 0, None).unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
      let sampler = Arc::clone(&sampler);
      handles.push(std::thread::spawn(move || {
        log_n(&sampler, "contended", 100);
      }));
    }
    for handle in handles {
      handle.join().unwrap();
    }

    // 400 attempts, exactly the first 10 admitted.
    assert_eq!(logs.len(), 10);
  }
}
