//! WolfTail Configuration
//!
//! Decoder behavior knobs, loadable from a TOML file or built in code.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DecoderConfig {
    /// Cap on decoded query text, in bytes. Longer statements are
    /// truncated; the event is still consumed in full. `None` keeps
    /// whole statements.
    #[serde(default)]
    pub max_query_length: Option<usize>,

    /// What to do with event types the decoder has no parser for
    #[serde(default)]
    pub unhandled_events: UnhandledEventPolicy,
}

/// Policy for event types without a dedicated body parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnhandledEventPolicy {
    /// Skip the body and emit a `Skipped` record (default)
    #[default]
    Skip,
    /// Keep the raw body bytes so callers can forward them
    Keep,
    /// Fail decoding with `UnsupportedEvent`
    Fail,
}

impl DecoderConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.max_query_length == Some(0) {
            return Err(Error::Config(
                "max_query_length must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}
