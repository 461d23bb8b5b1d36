#![forbid(unsafe_code)]

//! Board configuration, loaded from TOML.
//!
//! ```toml
//! text_preview_chars = 24
//! log_filter = "info,histree.engine=debug"
//!
//! [history]
//! replay_warn_threshold = 64
//! ```

use std::path::Path;

use histree::{ConfigError, HistoryConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Characters of card text shown in "Update text" descriptions.
    pub text_preview_chars: usize,
    /// `tracing-subscriber` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Engine settings.
    pub history: HistoryConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            text_preview_chars: 16,
            log_filter: "info".to_string(),
            history: HistoryConfig::default(),
        }
    }
}

impl BoardConfig {
    #[must_use]
    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_text_preview_chars(mut self, chars: usize) -> Self {
        self.text_preview_chars = chars;
        self
    }

    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = match self.history.validate() {
            Ok(()) => Vec::new(),
            Err(ConfigError::Validation(errors)) => errors,
            Err(other) => return Err(other),
        };
        if self.text_preview_chars == 0 {
            errors.push("text_preview_chars must be at least 1".to_string());
        }
        if self.log_filter.trim().is_empty() {
            errors.push("log_filter must not be empty".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

// ============================================================================
// Tests
// ============================================================================
