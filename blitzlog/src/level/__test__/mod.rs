#[cfg(test)]
mod __test__ {

  use crate::level::{AtomicLevel, Level, LevelEnabler, ALL_LEVELS};
  use std::sync::Arc;
  use std::thread;

  #[test]
  fn test_level_ordering() {
    assert!(Level::Debug < Level::Info);
    assert!(Level::Info < Level::Warn);
    assert!(Level::Warn < Level::Error);
    assert!(Level::Error < Level::DPanic);
    assert!(Level::DPanic < Level::Panic);
    assert!(Level::Panic < Level::Fatal);
  }

  #[test]
  fn test_level_enabled() {
    assert!(Level::Info.enabled(Level::Warn));
    assert!(Level::Info.enabled(Level::Info));
    assert!(!Level::Info.enabled(Level::Debug));
    assert!(Level::Fatal.enabled(Level::Fatal));
    assert!(!Level::Fatal.enabled(Level::Panic));
  }

  #[test]
  fn test_level_text_round_trip() {
    for level in ALL_LEVELS {
      let parsed: Level = level.as_str().parse().unwrap();
      assert_eq!(parsed, level);
      let parsed: Level = level.capital_str().parse().unwrap();
      assert_eq!(parsed, level);
    }
  }

  #[test]
  fn test_level_parse_unknown() {
    let err = "verbose".parse::<Level>().unwrap_err();
    assert!(err.to_string().contains("verbose"));
  }

  #[test]
  fn test_level_from_i8_round_trip() {
    for level in ALL_LEVELS {
      assert_eq!(Level::from_i8(level as i8), level);
    }
    assert_eq!(Level::from_i8(99), Level::Info);
  }

  #[test]
  fn test_level_serde() {
    let json = serde_json::to_string(&Level::Warn).unwrap();
    assert_eq!(json, "\"warn\"");
    let back: Level = serde_json::from_str("\"dpanic\"").unwrap();
    assert_eq!(back, Level::DPanic);
    assert!(serde_json::from_str::<Level>("\"loud\"").is_err());
  }

  #[test]
  fn test_atomic_level_shared_mutation() {
    let handle = AtomicLevel::new(Level::Info);
    let clone = handle.clone();

    assert!(handle.enabled(Level::Info));
    clone.set_level(Level::Error);

    // The original handle observes the clone's store.
    assert_eq!(handle.level(), Level::Error);
    assert!(!handle.enabled(Level::Info));
    assert!(handle.enabled(Level::Error));
  }

  #[test]
  fn test_atomic_level_cross_thread_visibility() {
    let handle = Arc::new(AtomicLevel::new(Level::Debug));
    let writer = Arc::clone(&handle);

    thread::spawn(move || writer.set_level(Level::Fatal))
      .join()
      .unwrap();

    assert_eq!(handle.level(), Level::Fatal);
  }

  #[test]
  fn test_atomic_level_serde() {
    let handle = AtomicLevel::new(Level::Warn);
    assert_eq!(serde_json::to_string(&handle).unwrap(), "\"warn\"");

    let parsed: AtomicLevel = serde_json::from_str("\"error\"").unwrap();
    assert_eq!(parsed.level(), Level::Error);
  }
}
