#[cfg(test)]
mod __test__ {

  use crate::config::{new_development, BuildError, Config, SamplingConfig};
  use crate::level::Level;
  use std::io::Read;

  fn read_lines(path: &std::path::Path) -> Vec<String> {
    let mut contents = String::new();
    std::fs::File::open(path)
      .unwrap()
      .read_to_string(&mut contents)
      .unwrap();
    contents.lines().map(|line| line.to_string()).collect()
  }

  #[test]
  fn test_unknown_encoding_refuses_to_build() {
    let mut config = Config::production();
    config.encoding = "xml".to_string();
    match config.build() {
      Err(BuildError::UnknownEncoding(name)) => assert_eq!(name, "xml"),
      other => panic!("expected unknown encoding error, got {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn test_unopenable_path_refuses_to_build() {
    let file = tempfile::NamedTempFile::new().unwrap();
    // The parent of this path is a regular file, so the sink cannot open.
    let bad = file.path().join("nested").join("app.log");

    let mut config = Config::production();
    config.output_paths = vec![bad.to_string_lossy().into_owned()];
    assert!(matches!(config.build(), Err(BuildError::Io(_))));
  }

  #[test]
  fn test_invalid_sampling_refuses_to_build() {
    let mut config = Config::production();
    config.sampling = Some(SamplingConfig {
      initial: 0,
      thereafter: 5,
    });
    assert!(matches!(config.build(), Err(BuildError::Sampler(_))));
  }

  #[test]
  fn test_production_build_writes_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.log");

    let mut config = Config::production();
    config.output_paths = vec![path.to_string_lossy().into_owned()];
    config
      .initial_fields
      .insert("svc".to_string(), serde_json::json!("api"));

    let log = config.build().unwrap();
    log.info("user ok", &[crate::field::Field::i64("attempt", 3)]);
    log.sync().unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(value["level"], "info");
    assert_eq!(value["msg"], "user ok");
    assert_eq!(value["svc"], "api");
    assert_eq!(value["attempt"], 3);
    // Production wiring captures the caller.
    assert!(value["caller"].is_string());
  }

  #[test]
  fn test_initial_fields_are_sorted_by_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sorted.log");

    let mut config = Config::production();
    config.disable_caller = true;
    config.output_paths = vec![path.to_string_lossy().into_owned()];
    config
      .initial_fields
      .insert("zeta".to_string(), serde_json::json!(1));
    config
      .initial_fields
      .insert("alpha".to_string(), serde_json::json!(2));

    let log = config.build().unwrap();
    log.info("sorted", &[]);
    log.sync().unwrap();

    let line = &read_lines(&path)[0];
    let alpha = line.find("\"alpha\"").unwrap();
    let zeta = line.find("\"zeta\"").unwrap();
    assert!(alpha < zeta);
  }

  #[test]
  fn test_shared_level_retunes_after_build() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuned.log");

    let mut config = Config::production();
    config.disable_caller = true;
    config.sampling = None;
    config.output_paths = vec![path.to_string_lossy().into_owned()];

    let log = config.build().unwrap();
    log.info("audible", &[]);

    config.level.set_level(Level::Error);
    log.info("silenced", &[]);
    log.error("still audible", &[]);
    log.sync().unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("audible"));
    assert!(lines[1].contains("still audible"));
  }

  #[test]
  fn test_sampling_config_caps_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sampled.log");

    let mut config = Config::production();
    config.disable_caller = true;
    config.disable_stacktrace = true;
    config.sampling = Some(SamplingConfig {
      initial: 2,
      thereafter: 0,
    });
    config.output_paths = vec![path.to_string_lossy().into_owned()];

    let log = config.build().unwrap();
    for _ in 0..5 {
      log.info("identical burst", &[]);
    }
    log.sync().unwrap();

    assert_eq!(read_lines(&path).len(), 2);
  }

  #[test]
  fn test_development_preset_builds_console() {
    let config = Config::development();
    assert_eq!(config.encoding, "console");
    assert!(config.development);
    assert!(config.sampling.is_none());
    assert_eq!(config.level.level(), Level::Debug);
    assert!(new_development().is_ok());
  }

  #[test]
  fn test_sampling_config_serde_round_trip() {
    let sampling = SamplingConfig {
      initial: 100,
      thereafter: 50,
    };
    let json = serde_json::to_string(&sampling).unwrap();
    let back: SamplingConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.initial, 100);
    assert_eq!(back.thereafter, 50);
  }
}
