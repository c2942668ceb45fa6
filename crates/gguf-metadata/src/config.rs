//! Decoder configuration with TOML, environment variable, and default
//! sources.

use std::path::Path;
use std::{env, fs};

use serde::{Deserialize, Serialize};

// ── Errors ──────────────────────────────────────────────────────────

/// Errors produced by configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid environment variable value for {key}: {value}")]
    InvalidEnvVar { key: String, value: String },
}

/// Default bound on array-in-array nesting.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 64;

pub const ENV_MAX_NESTING_DEPTH: &str = "GGUF_MAX_NESTING_DEPTH";
pub const ENV_REQUIRE_MAGIC: &str = "GGUF_REQUIRE_MAGIC";

// ── TOML wrapper ────────────────────────────────────────────────────

/// Wrapper used for the `[decoder]` table in TOML files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TomlWrapper {
    decoder: DecoderConfig,
}

// ── DecoderConfig ───────────────────────────────────────────────────

/// Knobs for [`GgufReader`](crate::GgufReader).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Maximum array nesting. A top-level array value is depth 1, so `0`
    /// rejects every array; the loaders refuse it.
    pub max_nesting_depth: usize,
    /// Reject files whose magic is not `GGUF` as soon as it is read.
    pub require_magic: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH, require_magic: false }
    }
}

impl DecoderConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// The file is expected to contain a `[decoder]` table. If the file
    /// does not exist, returns `Ok(Self::default())`.
    pub fn from_toml(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!("Config file not found: {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let wrapper: TomlWrapper = toml::from_str(text)?;
        wrapper.decoder.validate()?;
        Ok(wrapper.decoder)
    }

    /// Serialize to a TOML string (wrapped in `[decoder]`).
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let wrapper = TomlWrapper { decoder: self.clone() };
        Ok(toml::to_string_pretty(&wrapper)?)
    }

    /// Overlay `GGUF_*` environment variables on `Self::default()`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Ok(v) = env::var(ENV_MAX_NESTING_DEPTH) {
            cfg.max_nesting_depth = Self::parse_env_usize(ENV_MAX_NESTING_DEPTH, &v)?;
        }
        if let Ok(v) = env::var(ENV_REQUIRE_MAGIC) {
            cfg.require_magic = Self::parse_env_bool(ENV_REQUIRE_MAGIC, &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Validation("max_nesting_depth must be >= 1".into()));
        }
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────

    fn parse_env_usize(key: &str, val: &str) -> Result<usize, ConfigError> {
        val.parse::<usize>().map_err(|_| ConfigError::InvalidEnvVar {
            key: key.to_string(),
            value: val.to_string(),
        })
    }

    fn parse_env_bool(key: &str, val: &str) -> Result<bool, ConfigError> {
        match val.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidEnvVar { key: key.to_string(), value: val.to_string() }),
        }
    }
}
