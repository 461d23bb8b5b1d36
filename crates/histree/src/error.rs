#![forbid(unsafe_code)]

//! Error types for the history engine.
//!
//! Every variant of [`HistoryError`] is a caller programming error: the
//! engine validates before it commits or replays anything, so an `Err` means
//! neither the [`History`](crate::History) nor the external state was touched.
//! Boundary `undo`/`redo` calls are not errors; they return `Ok(false)`.

use thiserror::Error;

use crate::action::ActionType;
use crate::branch::BranchId;

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("unknown action type: {0}")]
    UnknownActionType(ActionType),

    #[error("action type {0} is already registered")]
    DuplicateActionType(ActionType),

    #[error("payload for action type {action} is not a {expected}")]
    PayloadMismatch {
        action: ActionType,
        expected: &'static str,
    },

    #[error("index {index} out of range for branch {branch} (stack length {len})")]
    IndexOutOfRange {
        branch: BranchId,
        index: isize,
        len: usize,
    },

    #[error("unknown branch: {0}")]
    UnknownBranch(BranchId),
}

/// Errors that can occur when loading a [`HistoryConfig`](crate::HistoryConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config-serde")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "config-serde")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
