#![forbid(unsafe_code)]

//! Traversal planning between two cursor positions.
//!
//! A position is resolved to its *lineage*: the chain of branch spans from
//! the root down to the position, each span covering items `0..=end` of one
//! branch. Two lineages agree on a prefix of spans and then diverge; the
//! replay plan undoes the source's items past the divergence point (newest
//! first) and redoes the destination's items past it (oldest first).

use crate::branch::{BranchId, History, Position};
use crate::error::{HistoryError, Result};

/// Items `0..=end` of one branch on a path from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub branch: BranchId,
    pub end: isize,
}

/// Address of a committed item inside the branch arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ItemRef {
    pub branch: BranchId,
    pub index: usize,
}

/// Ordered items to apply for one traversal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Replay {
    pub backward: Vec<ItemRef>,
    pub forward: Vec<ItemRef>,
}

impl Replay {
    pub fn len(&self) -> usize {
        self.backward.len() + self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backward.is_empty() && self.forward.is_empty()
    }
}

/// Root-first spans leading to `target`. Fails if the branch is unknown or
/// the index is outside `-1..len`.
pub(crate) fn lineage<C>(history: &History<C>, target: Position) -> Result<Vec<Span>> {
    let branch = history.try_branch(target.branch)?;
    if !branch.contains_index(target.index) {
        return Err(HistoryError::IndexOutOfRange {
            branch: target.branch,
            index: target.index,
            len: branch.len(),
        });
    }

    let mut spans = vec![Span {
        branch: target.branch,
        end: target.index,
    }];
    let mut parent = branch.parent_connection();
    while let Some(connection) = parent {
        spans.push(Span {
            branch: connection.branch_id,
            end: connection.global_index,
        });
        parent = history.try_branch(connection.branch_id)?.parent_connection();
    }
    spans.reverse();
    Ok(spans)
}

/// First level at which two lineages disagree, and the last index of that
/// level's branch both still share (`-1` when the branches differ there).
fn divergence(a: &[Span], b: &[Span]) -> (usize, isize) {
    let mut level = 0;
    loop {
        match (a.get(level), b.get(level)) {
            (Some(x), Some(y)) if x.branch == y.branch => {
                if x.end != y.end {
                    return (level, x.end.min(y.end));
                }
                level += 1;
            }
            _ => return (level, -1),
        }
    }
}

/// The newest span endpoint both lineages contain.
fn last_shared(a: &[Span], b: &[Span]) -> Span {
    let (level, shared_end) = divergence(a, b);
    match (a.get(level), b.get(level)) {
        (Some(x), Some(y)) if x.branch == y.branch => Span {
            branch: x.branch,
            end: shared_end,
        },
        // Both lineages start at the root, so a mismatch is never at level 0.
        _ => a[level - 1],
    }
}

fn push_range(out: &mut Vec<ItemRef>, branch: BranchId, start: isize, end: isize, descending: bool) {
    let range = (start.max(0)..=end).map(|index| ItemRef {
        branch,
        index: index as usize,
    });
    if descending {
        out.extend(range.rev());
    } else {
        out.extend(range);
    }
}

/// Plan the moves between two positions. Both are validated first.
pub(crate) fn plan<C>(history: &History<C>, from: Position, to: Position) -> Result<Replay> {
    let source = lineage(history, from)?;
    let target = lineage(history, to)?;
    let (level, shared_end) = divergence(&source, &target);

    let mut replay = Replay::default();
    for (depth, span) in source.iter().enumerate().skip(level).rev() {
        let start = if depth == level { shared_end + 1 } else { 0 };
        push_range(&mut replay.backward, span.branch, start, span.end, true);
    }
    for (depth, span) in target.iter().enumerate().skip(level) {
        let start = if depth == level { shared_end + 1 } else { 0 };
        push_range(&mut replay.forward, span.branch, start, span.end, false);
    }
    Ok(replay)
}

/// Where the cursor lands when moving from the head of `from` onto `to` and
/// stopping at the last action both share.
///
/// The shared point is expressed on the deepest branch of `to`'s lineage
/// that can hold it: if it is exactly the fork point of the next branch
/// towards `to`, that branch's start index is used instead of the parent's
/// index, so sibling branches resolve onto the requested branch.
pub(crate) fn last_common_action<C>(history: &History<C>, from: BranchId, to: BranchId) -> Result<Position> {
    let from_head = history.try_branch(from)?.head_index();
    let to_head = history.try_branch(to)?.head_index();
    let source = lineage(history, Position::new(from, from_head))?;
    let target = lineage(history, Position::new(to, to_head))?;

    let shared = last_shared(&source, &target);
    let owner = target
        .iter()
        .position(|span| span.branch == shared.branch)
        .unwrap_or(0);
    match target.get(owner + 1) {
        Some(next) if target[owner].end == shared.end => Ok(Position::new(next.branch, -1)),
        _ => Ok(Position::new(shared.branch, shared.end)),
    }
}
