#![forbid(unsafe_code)]

//! Text rendering of the action list and the branch navigator.
//!
//! ```text
//! > just now         Move 1 card by (10, 10)
//!   12 seconds ago   Add card at (5, 5)        [switch to branch 2 and 3]
//!   1 minute ago     Start
//! ```

use std::time::Duration;

use histree::{BranchId, History, HistoryEngine};
use web_time::SystemTime;

/// Display metadata attached to every branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchLabel {
    pub name: String,
    pub number: u64,
}

impl BranchLabel {
    #[must_use]
    pub fn numbered(number: u64) -> Self {
        Self {
            name: format!("Branch {number}"),
            number,
        }
    }

    /// Label of the root branch.
    #[must_use]
    pub fn root() -> Self {
        Self::numbered(1)
    }

    /// Label for the branch about to be created; the counter has not been
    /// advanced yet.
    #[must_use]
    pub fn next(history: &History<BranchLabel>) -> Self {
        Self::numbered(history.stats().branch_counter + 1)
    }
}

/// Coarse age of `created` relative to `now`.
#[must_use]
pub fn format_relative(created: SystemTime, now: SystemTime) -> String {
    let secs = now
        .duration_since(created)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    match secs {
        0..10 => "just now".to_string(),
        10..60 => format!("{secs} seconds ago"),
        60..120 => "1 minute ago".to_string(),
        120..3600 => format!("{} minutes ago", secs / 60),
        3600..7200 => "1 hour ago".to_string(),
        _ => format!("{} hours ago", secs / 3600),
    }
}

/// `2`, `2 and 3`, `2, 3 and 4`.
fn join_numbers(numbers: &[u64]) -> String {
    match numbers {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => {
            let init: Vec<String> = init.iter().map(u64::to_string).collect();
            format!("{} and {last}", init.join(", "))
        }
    }
}

/// The action list of `branch`, newest first, ending with the start entry.
pub fn render_timeline<S>(
    engine: &HistoryEngine<S, BranchLabel>,
    branch: BranchId,
    now: SystemTime,
) -> histree::Result<String> {
    let history = engine.history();
    let start_time = history.try_branch(branch)?.created();
    let mut out = String::new();
    for entry in history.timeline(branch)? {
        let marker = if entry.is_current { '>' } else { ' ' };
        let (created, label) = match entry.item {
            Some(item) => (item.created(), engine.describe(item)),
            None => (start_time, "Start".to_string()),
        };
        out.push_str(&format!("{marker} {:<16} {label}", format_relative(created, now)));
        if !entry.connections.is_empty() {
            let numbers: Vec<u64> = entry.connections.iter().map(|b| b.custom().number).collect();
            out.push_str(&format!("  [switch to branch {}]", join_numbers(&numbers)));
        }
        out.push('\n');
    }
    Ok(out)
}

/// All branches, most recently active first, with their path length.
pub fn render_branch_list(history: &History<BranchLabel>, now: SystemTime) -> histree::Result<String> {
    let current = history.current_branch_id();
    let mut out = String::new();
    for branch in history.branches_by_activity() {
        let marker = if branch.id() == current { '*' } else { ' ' };
        out.push_str(&format!(
            "{marker} {} (size {}, {})\n",
            branch.custom().name,
            history.path_len(branch.id())?,
            format_relative(branch.last_activity(), now)
        ));
    }
    Ok(out)
}
