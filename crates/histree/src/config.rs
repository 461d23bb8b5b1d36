#![forbid(unsafe_code)]

//! Configuration for the history engine.
//!
//! # Loading
//!
//! With the `config-serde` feature, [`HistoryConfig`] can be read from TOML
//! or JSON. Missing fields fall back to their defaults.
//!
//! ```toml
//! replay_warn_threshold = 512
//! branching = false
//! ```
//!
//! ```rust,ignore
//! let config = HistoryConfig::from_toml_file("histree.toml")?;
//! let config = HistoryConfig::from_json_str(r#"{"replay_warn_threshold": 64}"#)?;
//! ```

#[cfg(feature = "config-serde")]
use std::path::Path;

#[cfg(feature = "config-serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the history engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config-serde", serde(default))]
pub struct HistoryConfig {
    /// A single traversal (time travel or branch switch) replaying more than
    /// this many items logs a warning. Must be non-zero.
    pub replay_warn_threshold: usize,
    /// Fork a new branch when dispatching behind the head. When `false` the
    /// history is linear and the redo items are discarded instead.
    pub branching: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            replay_warn_threshold: 256,
            branching: true,
        }
    }
}

impl HistoryConfig {
    /// Create a new configuration with a custom replay warning threshold.
    #[must_use]
    pub fn new(replay_warn_threshold: usize) -> Self {
        Self {
            replay_warn_threshold,
            ..Self::default()
        }
    }

    /// Set the replay warning threshold.
    #[must_use]
    pub fn with_replay_warn_threshold(mut self, threshold: usize) -> Self {
        self.replay_warn_threshold = threshold;
        self
    }

    /// Never warn about long replays.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            replay_warn_threshold: usize::MAX,
            ..Self::default()
        }
    }

    /// Linear undo/redo: dispatching behind the head drops the redo items.
    #[must_use]
    pub fn linear() -> Self {
        Self::default().with_branching(false)
    }

    /// Enable or disable branching.
    #[must_use]
    pub fn with_branching(mut self, branching: bool) -> Self {
        self.branching = branching;
        self
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.replay_warn_threshold == 0 {
            errors.push("replay_warn_threshold must be at least 1".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load from a TOML string.
    #[cfg(feature = "config-serde")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config-serde")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config-serde")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
