#[cfg(test)]
mod __test__ {

  use crate::encoder::{Encoder, EncoderConfig, ObjectEncoder, TimeEncoder};
  use crate::entry::{Caller, Entry};
  use crate::field::Field;
  use crate::json_encoder::JsonEncoder;
  use crate::level::Level;
  use chrono::{TimeZone, Utc};

  fn test_entry(level: Level, message: &str) -> Entry {
    let mut entry = Entry::new(level, message);
    entry.time = Utc.timestamp_opt(1_609_459_200, 123_000_000).unwrap();
    entry
  }

  fn encode(entry: &Entry, fields: &[Field]) -> String {
    let enc = JsonEncoder::new(EncoderConfig::production());
    let buf = enc.encode_entry(entry, fields).unwrap();
    String::from_utf8_lossy(buf.as_slice()).into_owned()
  }

  #[test]
  fn test_minimal_record_shape() {
    let line = encode(&test_entry(Level::Info, "hello"), &[]);

    assert!(line.ends_with('\n'));
    assert_eq!(line, "{\"level\":\"info\",\"ts\":1609459200.123,\"msg\":\"hello\"}\n");

    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["level"], "info");
    assert_eq!(value["msg"], "hello");
    assert!(value["ts"].is_number());
  }

  #[test]
  fn test_builtin_fields_precede_user_fields() {
    let mut entry = test_entry(Level::Warn, "ordered");
    entry.logger_name = "svc.rpc".to_string();
    entry.caller = Some(Caller {
      file: "pkg/file.rs".to_string(),
      line: 42,
      function: "handle".to_string(),
    });

    let line = encode(&entry, &[Field::string("user", "alice"), Field::i64("attempt", 3)]);
    assert_eq!(
      line,
      "{\"level\":\"warn\",\"ts\":1609459200.123,\"logger\":\"svc.rpc\",\
       \"caller\":\"pkg/file.rs:42\",\"msg\":\"ordered\",\
       \"user\":\"alice\",\"attempt\":3}\n"
    );
  }

  #[test]
  fn test_stacktrace_is_last() {
    let mut entry = test_entry(Level::Error, "boom");
    entry.stack = Some("main\n\tsrc/main.rs:10".to_string());

    let line = encode(&entry, &[Field::i64("n", 1)]);
    assert!(line.ends_with("\"n\":1,\"stacktrace\":\"main\\n\\tsrc/main.rs:10\"}\n"));
  }

  #[test]
  fn test_string_escaping() {
    let line = encode(
      &test_entry(Level::Info, "quote \" slash \\ tab \t nl \n cr \r ctl \u{1}"),
      &[],
    );
    assert!(line.contains(
      "quote \\\" slash \\\\ tab \\t nl \\n cr \\r ctl \\u0001"
    ));

    // Decoding restores the original message.
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["msg"], "quote \" slash \\ tab \t nl \n cr \r ctl \u{1}");
  }

  #[test]
  fn test_html_characters_and_utf8_pass_through() {
    let line = encode(&test_entry(Level::Info, "<a href=\"x\">&amp; héllo 日本</a>"), &[]);
    assert!(line.contains("<a href=\\\"x\\\">&amp; héllo 日本</a>"));
  }

  #[test]
  fn test_non_finite_floats_are_string_tokens() {
    let line = encode(
      &test_entry(Level::Info, "floats"),
      &[
        Field::f64("v", f64::NAN),
        Field::f64("p", f64::INFINITY),
        Field::f64("m", f64::NEG_INFINITY),
        Field::f32("q", f32::INFINITY),
      ],
    );
    assert!(line.contains("\"v\":\"NaN\",\"p\":\"+Inf\",\"m\":\"-Inf\",\"q\":\"+Inf\""));
  }

  #[test]
  fn test_round_trip_for_typical_record() {
    let line = encode(
      &test_entry(Level::Info, "round trip"),
      &[
        Field::string("s", "héllo\nworld"),
        Field::i64("i", -42),
        Field::u64("u", 42),
        Field::f64("f", 0.25),
        Field::bool("b", true),
      ],
    );

    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["s"], "héllo\nworld");
    assert_eq!(value["i"], -42);
    assert_eq!(value["u"], 42);
    assert_eq!(value["f"], 0.25);
    assert_eq!(value["b"], true);
  }

  #[test]
  fn test_empty_time_key_omits_timestamp() {
    let mut config = EncoderConfig::production();
    config.time_key = String::new();
    let enc = JsonEncoder::new(config);

    let buf = enc.encode_entry(&test_entry(Level::Info, "no ts"), &[]).unwrap();
    let line = String::from_utf8_lossy(buf.as_slice()).into_owned();
    assert_eq!(line, "{\"level\":\"info\",\"msg\":\"no ts\"}\n");
  }

  #[test]
  fn test_every_builtin_key_can_be_omitted() {
    let mut config = EncoderConfig::production();
    config.level_key = String::new();
    config.time_key = String::new();
    config.message_key = String::new();
    config.name_key = String::new();
    let enc = JsonEncoder::new(config);

    let mut entry = test_entry(Level::Info, "gone");
    entry.logger_name = "svc".to_string();
    let buf = enc.encode_entry(&entry, &[Field::i64("only", 1)]).unwrap();
    assert_eq!(
      String::from_utf8_lossy(buf.as_slice()),
      "{\"only\":1}\n"
    );
  }

  #[test]
  fn test_epoch_nanos_time_format() {
    let mut config = EncoderConfig::production();
    config.time_encoder = TimeEncoder::EpochNanos;
    let enc = JsonEncoder::new(config);

    let buf = enc.encode_entry(&test_entry(Level::Info, "ns"), &[]).unwrap();
    let line = String::from_utf8_lossy(buf.as_slice()).into_owned();
    assert!(line.contains("\"ts\":1609459200123000000"));
  }

  #[test]
  fn test_clone_isolates_context() {
    let mut parent = JsonEncoder::new(EncoderConfig::production());
    parent.add_str("req", "abc");

    let mut child = parent.clone_state();
    child.add_i64("n", 1);

    // The parent never sees the child's bytes, and vice versa.
    let parent_line = parent
      .encode_entry(&test_entry(Level::Info, "p"), &[])
      .unwrap();
    let child_line = child
      .encode_entry(&test_entry(Level::Info, "c"), &[])
      .unwrap();

    let parent_line = String::from_utf8_lossy(parent_line.as_slice()).into_owned();
    let child_line = String::from_utf8_lossy(child_line.as_slice()).into_owned();

    assert!(parent_line.contains("\"req\":\"abc\""));
    assert!(!parent_line.contains("\"n\":1"));
    assert!(child_line.contains("\"req\":\"abc\""));
    assert!(child_line.contains("\"n\":1"));
  }

  #[test]
  fn test_context_namespace_spans_call_fields() {
    let mut enc = JsonEncoder::new(EncoderConfig::production());
    enc.open_namespace("req");
    enc.add_str("id", "abc");

    let buf = enc
      .encode_entry(&test_entry(Level::Info, "scoped"), &[Field::i64("n", 1)])
      .unwrap();
    let line = String::from_utf8_lossy(buf.as_slice()).into_owned();
    assert!(line.contains("\"req\":{\"id\":\"abc\",\"n\":1}}"));

    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["req"]["n"], 1);
  }

  #[test]
  fn test_duplicate_keys_are_not_deduplicated() {
    let line = encode(
      &test_entry(Level::Info, "dup"),
      &[Field::i64("k", 1), Field::i64("k", 2)],
    );
    assert!(line.contains("\"k\":1,\"k\":2"));
  }

  #[test]
  fn test_caller_function_key_opt_in() {
    let mut config = EncoderConfig::production();
    config.function_key = "func".to_string();
    let enc = JsonEncoder::new(config);

    let mut entry = test_entry(Level::Info, "fn");
    entry.caller = Some(Caller {
      file: "src/a.rs".to_string(),
      line: 7,
      function: "serve".to_string(),
    });
    let buf = enc.encode_entry(&entry, &[]).unwrap();
    let line = String::from_utf8_lossy(buf.as_slice()).into_owned();
    assert!(line.contains("\"caller\":\"src/a.rs:7\",\"func\":\"serve\""));
  }

  #[test]
  fn test_written_bytes_equal_buffer_length() {
    let enc = JsonEncoder::new(EncoderConfig::production());
    let buf = enc.encode_entry(&test_entry(Level::Info, "len"), &[]).unwrap();
    assert_eq!(buf.as_slice().len(), buf.len());
    assert_eq!(buf.last_byte(), Some(b'\n'));
  }
}
