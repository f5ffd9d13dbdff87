//! # Config Module
//!
//! Declarative assembly of a full pipeline from already-constructed
//! options: sinks opened from paths, the encoder by name, the sampler, and
//! caller/stacktrace capture. Parsing config files into a [`Config`] is a
//! caller concern; this module only wires what it is given, and refuses to
//! construct a logger from invalid options.

mod __test__;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::console_encoder::ConsoleEncoder;
use crate::core::{Core, IoCore};
use crate::encoder::{Encoder, EncoderConfig};
use crate::field::Field;
use crate::json_encoder::JsonEncoder;
use crate::level::{AtomicLevel, Level, LevelEnabler};
use crate::logger::Logger;
use crate::sampler::{self, InvalidSamplerConfig};
use crate::sink;

/// Sampler parameters: `initial` entries per message per second pass, then
/// one in `thereafter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
  pub initial: u64,
  pub thereafter: u64,
}

/// Why a [`Config`] refused to build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
  #[error("unknown encoding {0:?}")]
  UnknownEncoding(String),
  #[error("failed to open sink: {0}")]
  Io(#[from] std::io::Error),
  #[error(transparent)]
  Sampler(#[from] InvalidSamplerConfig),
}

/// A fully described pipeline. Construct one directly or start from
/// [`Config::production`] / [`Config::development`] and adjust.
#[derive(Clone)]
pub struct Config {
  /// Shared with every logger the build produces; mutating it at runtime
  /// retunes them all.
  pub level: AtomicLevel,
  pub development: bool,
  pub disable_caller: bool,
  pub disable_stacktrace: bool,
  pub sampling: Option<SamplingConfig>,
  /// `"json"` or `"console"`.
  pub encoding: String,
  pub encoder_config: EncoderConfig,
  /// `"stdout"`, `"stderr"`, or filesystem paths.
  pub output_paths: Vec<String>,
  pub error_output_paths: Vec<String>,
  /// Baseline context, sorted by key for deterministic output.
  pub initial_fields: BTreeMap<String, serde_json::Value>,
}

impl Config {
  /// JSON to stderr at info, sampled 100/100, caller capture on, stack
  /// traces at error.
  pub fn production() -> Config {
    Config {
      level: AtomicLevel::new(Level::Info),
      development: false,
      disable_caller: false,
      disable_stacktrace: false,
      sampling: Some(SamplingConfig {
        initial: 100,
        thereafter: 100,
      }),
      encoding: "json".to_string(),
      encoder_config: EncoderConfig::production(),
      output_paths: vec!["stderr".to_string()],
      error_output_paths: vec!["stderr".to_string()],
      initial_fields: BTreeMap::new(),
    }
  }

  /// Console to stderr at debug, unsampled, stack traces at warn, dpanic
  /// panics.
  pub fn development() -> Config {
    Config {
      level: AtomicLevel::new(Level::Debug),
      development: true,
      disable_caller: false,
      disable_stacktrace: false,
      sampling: None,
      encoding: "console".to_string(),
      encoder_config: EncoderConfig::development(),
      output_paths: vec!["stderr".to_string()],
      error_output_paths: vec!["stderr".to_string()],
      initial_fields: BTreeMap::new(),
    }
  }

  fn build_encoder(&self) -> Result<Box<dyn Encoder>, BuildError> {
    match self.encoding.as_str() {
      "json" => Ok(Box::new(JsonEncoder::new(self.encoder_config.clone()))),
      "console" => Ok(Box::new(ConsoleEncoder::new(self.encoder_config.clone()))),
      other => Err(BuildError::UnknownEncoding(other.to_string())),
    }
  }

  /// Open the sinks, wire the pipeline, and return the logger.
  pub fn build(&self) -> Result<Logger, BuildError> {
    let encoder = self.build_encoder()?;
    let out = sink::open_sinks(&self.output_paths)?;
    let error_out = sink::open_sinks(&self.error_output_paths)?;

    let enab: Arc<dyn LevelEnabler> = Arc::new(self.level.clone());
    let mut core: Arc<dyn Core> = Arc::new(IoCore::new(encoder, out, enab));

    if let Some(sampling) = &self.sampling {
      core = sampler::new_sampler(
        core,
        Duration::from_secs(1),
        sampling.initial,
        sampling.thereafter,
        None,
      )?;
    }

    let mut logger = Logger::new(core)
      .with_error_output(error_out)
      .with_name_separator(self.encoder_config.name_separator.clone());

    if self.development {
      logger = logger.development();
    }
    if !self.disable_caller {
      logger = logger.with_caller(true);
    }
    if !self.disable_stacktrace {
      let min = if self.development {
        Level::Warn
      } else {
        Level::Error
      };
      logger = logger.with_stacktrace(min);
    }
    if !self.initial_fields.is_empty() {
      let fields: Vec<Field> = self
        .initial_fields
        .iter()
        .map(|(key, value)| Field::reflect(key.clone(), value.clone()))
        .collect();
      logger = logger.with(&fields);
    }

    Ok(logger)
  }
}

/// Build a logger from the production preset.
pub fn new_production() -> Result<Logger, BuildError> {
  Config::production().build()
}

/// Build a logger from the development preset.
pub fn new_development() -> Result<Logger, BuildError> {
  Config::development().build()
}
