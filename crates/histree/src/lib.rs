#![forbid(unsafe_code)]

//! Histree
//!
//! A branch-aware undo/redo engine. Every action the caller dispatches is
//! recorded as a reversible item; undoing and then doing something new forks
//! a branch instead of discarding the undone work, so every state the user
//! ever reached stays reachable.
//!
//! # Key Components
//!
//! - [`ActionRegistry`] - Binds action types to forward/backward mutators
//! - [`HistoryEngine`] - Dispatch, undo/redo, time travel, branch switching
//! - [`History`] - The branch tree and cursor, with read helpers for UIs
//! - [`HistoryConfig`] - Engine tuning, loadable from TOML/JSON with `config-serde`
//!
//! # Logging
//!
//! The engine emits `tracing` spans named `history.*` and events under the
//! `histree.engine` and `histree.registry` targets. Nothing is printed unless
//! the application installs a subscriber.

pub mod action;
pub mod branch;
pub mod config;
pub mod engine;
pub mod error;
mod path;

pub use action::{
    ActionHandle, ActionRegistry, ActionType, CustomFn, CustomHandler, Direction, Payload,
    PayloadShape, Standard,
};
pub use branch::{
    Branch, BranchConnection, BranchId, History, HistoryItem, HistoryStats, ItemId,
    ParentConnection, Position, START_INDEX, TimelineEntry,
};
pub use config::HistoryConfig;
pub use engine::{BranchInit, BranchSwitchMode, HistoryEngine};
pub use error::{ConfigError, HistoryError, Result};
