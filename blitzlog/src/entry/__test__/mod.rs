#[cfg(test)]
mod __test__ {

  use crate::entry::{Caller, CheckWriteAction, CheckedEntry, Entry, OnFatal};
  use crate::field::Field;
  use crate::level::Level;
  use crate::observer::{new_observer, TestSink};
  use std::panic;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Arc;

  #[test]
  fn test_caller_paths() {
    let caller = Caller {
      file: "src/server/accept.rs".to_string(),
      line: 91,
      function: "accept".to_string(),
    };
    assert_eq!(caller.full_path(), "src/server/accept.rs:91");
    assert_eq!(caller.trimmed_path(), "server/accept.rs:91");
    assert_eq!(caller.to_string(), "src/server/accept.rs:91");

    let bare = Caller {
      file: "main.rs".to_string(),
      line: 3,
      function: "main".to_string(),
    };
    assert_eq!(bare.trimmed_path(), "main.rs:3");
  }

  #[test]
  fn test_entry_new_defaults() {
    let entry = Entry::new(Level::Warn, "careful");
    assert_eq!(entry.level, Level::Warn);
    assert_eq!(entry.message, "careful");
    assert!(entry.logger_name.is_empty());
    assert!(entry.caller.is_none());
    assert!(entry.stack.is_none());
  }

  #[test]
  fn test_ticket_write_reaches_every_attached_core() {
    let (core_a, logs_a) = new_observer(Arc::new(Level::Debug));
    let (core_b, logs_b) = new_observer(Arc::new(Level::Debug));

    let entry = Entry::new(Level::Info, "fan");
    let ce = Arc::clone(&core_a).check(&entry, None);
    let ce = Arc::clone(&core_b).check(&entry, ce).unwrap();
    assert_eq!(ce.core_count(), 2);

    ce.write(&[Field::i64("n", 7)]);

    for logs in [logs_a, logs_b] {
      let all = logs.all();
      assert_eq!(all.len(), 1);
      assert_eq!(all[0].entry.message, "fan");
      assert_eq!(all[0].fields.len(), 1);
    }
  }

  #[test]
  fn test_every_core_sees_post_hook_entry() {
    let (core_a, logs_a) = new_observer(Arc::new(Level::Debug));
    let (core_b, logs_b) = new_observer(Arc::new(Level::Debug));

    let entry = Entry::new(Level::Info, "original");
    let ce = Arc::clone(&core_a).check(&entry, None);
    let mut ce = Arc::clone(&core_b).check(&entry, ce).unwrap();

    // Simulate a hook rewriting the message before the write.
    ce.entry.message.push_str(" (annotated)");
    ce.write(&[]);

    assert_eq!(logs_a.all()[0].entry.message, "original (annotated)");
    assert_eq!(logs_b.all()[0].entry.message, "original (annotated)");
  }

  #[test]
  fn test_discard_without_write_emits_nothing() {
    let (core, logs) = new_observer(Arc::new(Level::Debug));
    let entry = Entry::new(Level::Info, "dropped");
    let ce = Arc::clone(&core).check(&entry, None).unwrap();
    ce.discard();
    assert!(logs.is_empty());
  }

  #[test]
  fn test_acquire_release_cycles_do_not_grow_pool() {
    // Churn a pile of tickets through the pool; the pool is bounded, so
    // this simply must not panic or leak tickets into user hands.
    for i in 0..200 {
      let entry = Entry::new(Level::Info, &format!("cycle {}", i));
      let ce = CheckedEntry::acquire(&entry);
      assert_eq!(ce.entry.message, format!("cycle {}", i));
      assert_eq!(ce.core_count(), 0);
      ce.discard();
    }
  }

  #[test]
  fn test_recycled_ticket_state_is_reset() {
    let (core, _logs) = new_observer(Arc::new(Level::Debug));
    let entry = Entry::new(Level::Error, "first");
    let mut ce = Arc::clone(&core).check(&entry, None).unwrap();
    ce.entry.stack = Some("trace".to_string());
    ce.discard();

    let entry = Entry::new(Level::Info, "second");
    let ce = CheckedEntry::acquire(&entry);
    assert_eq!(ce.entry.message, "second");
    assert!(ce.entry.stack.is_none());
    assert_eq!(ce.core_count(), 0);
    ce.discard();
  }

  #[test]
  fn test_panic_action_fires_after_write() {
    let (core, logs) = new_observer(Arc::new(Level::Debug));
    let entry = Entry::new(Level::Panic, "panic now");

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
      let ce = Arc::clone(&core)
        .check(&entry, None)
        .unwrap()
        .should(CheckWriteAction::Panic);
      ce.write(&[]);
    }));

    let err = result.unwrap_err();
    let message = err.downcast_ref::<String>().cloned().unwrap_or_default();
    assert_eq!(message, "panic now");
    // The record was written before the unwind.
    assert_eq!(logs.len(), 1);
  }

  #[test]
  fn test_fatal_hook_runs_after_write() {
    static FIRED: AtomicBool = AtomicBool::new(false);

    let (core, logs) = new_observer(Arc::new(Level::Debug));
    let entry = Entry::new(Level::Fatal, "goodbye");

    let ce = Arc::clone(&core)
      .check(&entry, None)
      .unwrap()
      .should(CheckWriteAction::Fatal)
      .with_on_fatal(OnFatal::Hook(Arc::new(|entry: &Entry| {
        assert_eq!(entry.message, "goodbye");
        FIRED.store(true, Ordering::SeqCst);
      })));
    ce.write(&[]);

    assert!(FIRED.load(Ordering::SeqCst));
    assert_eq!(logs.len(), 1);
  }

  #[test]
  fn test_fatal_panic_variant_unwinds() {
    let (core, _logs) = new_observer(Arc::new(Level::Debug));
    let entry = Entry::new(Level::Fatal, "abort requested");

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
      let ce = Arc::clone(&core)
        .check(&entry, None)
        .unwrap()
        .should(CheckWriteAction::Fatal)
        .with_on_fatal(OnFatal::Panic);
      ce.write(&[]);
    }));
    assert!(result.is_err());
  }

  #[test]
  fn test_write_errors_reach_error_output() {
    struct BrokenCore;
    impl crate::core::Core for BrokenCore {
      fn enabled(&self, _level: Level) -> bool {
        true
      }
      fn check(
        self: Arc<Self>,
        entry: &Entry,
        ce: Option<Box<CheckedEntry>>,
      ) -> Option<Box<CheckedEntry>> {
        let this: Arc<dyn crate::core::Core> = self;
        Some(CheckedEntry::add_core(ce, entry, this))
      }
      fn with(&self, _fields: &[Field]) -> Arc<dyn crate::core::Core> {
        Arc::new(BrokenCore)
      }
      fn write(&self, _entry: &Entry, _fields: &[Field]) -> std::io::Result<()> {
        Err(std::io::Error::other("encode blew up"))
      }
      fn sync(&self) -> std::io::Result<()> {
        Ok(())
      }
    }

    let errors = TestSink::new();
    let core: Arc<dyn crate::core::Core> = Arc::new(BrokenCore);
    let entry = Entry::new(Level::Info, "doomed");
    let ce = core
      .check(&entry, None)
      .unwrap()
      .with_error_output(Arc::new(errors.clone()));
    ce.write(&[]);

    let report = errors.as_string();
    assert!(report.contains("write error"));
    assert!(report.contains("encode blew up"));
  }
}
