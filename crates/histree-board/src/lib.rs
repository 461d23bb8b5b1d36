#![forbid(unsafe_code)]

//! Card board on top of the `histree` engine.
//!
//! Cards can be added, removed, moved, scaled, reordered, recolored and
//! retexted. Each gesture is one undoable action; undoing and then acting
//! again forks a branch, and the board can jump to any point on any branch.

pub mod actions;
pub mod board;
pub mod cli;
pub mod config;
pub mod describe;
pub mod error;
pub mod geometry;
pub mod session;
pub mod timeline;

pub use actions::BoardActions;
pub use board::{Board, Card, CardId, IndexedCard};
pub use cli::{Cli, run, run_from_env};
pub use config::BoardConfig;
pub use error::{BoardError, Result};
pub use geometry::{Bounds, Vector};
pub use session::{BoardEngine, Session};
pub use timeline::{BranchLabel, render_branch_list, render_timeline};
