#![forbid(unsafe_code)]

//! Branch store: the tree of branches and the [`History`] aggregate.
//!
//! Branches live in a flat arena keyed by [`BranchId`]. A branch records
//! where it forked from its parent as a [`ParentConnection`] instead of
//! holding pointers, so the whole [`History`] is a plain value that can be
//! cloned for snapshots and test fixtures.
//!
//! # Coordinates
//!
//! Each branch stack only holds the items committed on that branch. A cursor
//! [`Position`] is `(branch, index)` with `index` in `-1..len`. Index `-1` is
//! the state before the branch's first item: the start state for the root,
//! and the fork point for every other branch.
//!
//! ```text
//! root  b0: [A, B, C]
//!             │
//!             └─ b1 (forked at 0): [D]
//!
//! b1@-1 == state after A
//! b1@0  == state after A, D
//! ```

use std::collections::BTreeMap;
use std::fmt;

use web_time::SystemTime;

use crate::action::{ActionType, Payload};
use crate::error::{HistoryError, Result};
use crate::path::{self, ItemRef};

/// Cursor index of the start state of a branch.
pub const START_INDEX: isize = -1;

/// Unique identifier of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(pub u64);

impl BranchId {
    /// Create a branch ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// Unique identifier of a committed history item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Create an item ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cursor position: an index into one branch's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub branch: BranchId,
    pub index: isize,
}

impl Position {
    #[must_use]
    pub const fn new(branch: BranchId, index: isize) -> Self {
        Self { branch, index }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.branch, self.index)
    }
}

/// One committed action. Immutable once committed.
#[derive(Debug, Clone)]
pub struct HistoryItem {
    id: ItemId,
    action: ActionType,
    payload: Payload,
    created: SystemTime,
}

impl HistoryItem {
    pub(crate) fn new(id: ItemId, action: ActionType, payload: Payload, created: SystemTime) -> Self {
        Self {
            id,
            action,
            payload,
            created,
        }
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn action(&self) -> &ActionType {
        &self.action
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    #[must_use]
    pub fn created(&self) -> SystemTime {
        self.created
    }
}

/// Where a branch forked: the parent branch and the index into the parent's
/// stack of the last item the two share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParentConnection {
    pub branch_id: BranchId,
    pub global_index: isize,
}

/// A linear, append-only run of history items.
#[derive(Debug, Clone)]
pub struct Branch<C> {
    id: BranchId,
    stack: Vec<HistoryItem>,
    parent_connection: Option<ParentConnection>,
    created: SystemTime,
    custom: C,
}

impl<C> Branch<C> {
    #[must_use]
    pub fn id(&self) -> BranchId {
        self.id
    }

    #[must_use]
    pub fn stack(&self) -> &[HistoryItem] {
        &self.stack
    }

    /// Fork point, `None` for the root branch.
    #[must_use]
    pub fn parent_connection(&self) -> Option<ParentConnection> {
        self.parent_connection
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_connection.is_none()
    }

    #[must_use]
    pub fn created(&self) -> SystemTime {
        self.created
    }

    /// Caller metadata attached when the branch was created.
    #[must_use]
    pub fn custom(&self) -> &C {
        &self.custom
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Index of the newest item, `-1` if the stack is empty.
    #[must_use]
    pub fn head_index(&self) -> isize {
        self.stack.len() as isize - 1
    }

    #[must_use]
    pub fn last_item(&self) -> Option<&HistoryItem> {
        self.stack.last()
    }

    /// Time of the newest item, or of the branch's creation if it has none.
    #[must_use]
    pub fn last_activity(&self) -> SystemTime {
        self.last_item().map_or(self.created, HistoryItem::created)
    }

    /// Item at a cursor index, `None` for `-1` or out-of-range indices.
    #[must_use]
    pub fn item(&self, index: isize) -> Option<&HistoryItem> {
        usize::try_from(index).ok().and_then(|i| self.stack.get(i))
    }

    #[must_use]
    pub fn contains_index(&self, index: isize) -> bool {
        (START_INDEX..=self.head_index()).contains(&index)
    }
}

/// Counters exposed to callers, e.g. for naming branches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    /// Number of branches ever created, the root included.
    pub branch_counter: u64,
}

/// Side branches forking from one stack index of a parent branch.
#[derive(Debug)]
pub struct BranchConnection<'a, C> {
    pub global_index: isize,
    pub branches: Vec<&'a Branch<C>>,
}

/// One row of a branch's action list.
#[derive(Debug)]
pub struct TimelineEntry<'a, C> {
    pub index: isize,
    /// `None` for the start entry.
    pub item: Option<&'a HistoryItem>,
    pub is_current: bool,
    /// Branches forking at this entry, descendants included.
    pub connections: Vec<&'a Branch<C>>,
}

/// The complete branching history: branch arena plus cursor.
#[derive(Debug, Clone)]
pub struct History<C> {
    branches: BTreeMap<BranchId, Branch<C>>,
    current_branch_id: BranchId,
    current_index: isize,
    stats: HistoryStats,
}

impl<C> History<C> {
    pub(crate) fn new(root_custom: C) -> Self {
        let root = BranchId::new(0);
        let mut branches = BTreeMap::new();
        branches.insert(
            root,
            Branch {
                id: root,
                stack: Vec::new(),
                parent_connection: None,
                created: SystemTime::now(),
                custom: root_custom,
            },
        );
        Self {
            branches,
            current_branch_id: root,
            current_index: START_INDEX,
            stats: HistoryStats { branch_counter: 1 },
        }
    }

    // ========================================================================
    // Cursor
    // ========================================================================

    #[must_use]
    pub fn current_branch_id(&self) -> BranchId {
        self.current_branch_id
    }

    #[must_use]
    pub fn current_index(&self) -> isize {
        self.current_index
    }

    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.current_branch_id, self.current_index)
    }

    /// The branch the cursor is on.
    #[must_use]
    pub fn current_branch(&self) -> &Branch<C> {
        &self.branches[&self.current_branch_id]
    }

    /// The item whose effect is the most recent one in the external state
    /// of the current branch, `None` at the start of the branch.
    #[must_use]
    pub fn current_item(&self) -> Option<&HistoryItem> {
        self.current_branch().item(self.current_index)
    }

    /// The item a redo would apply.
    #[must_use]
    pub fn next_item(&self) -> Option<&HistoryItem> {
        self.current_branch().item(self.current_index + 1)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.current_index > START_INDEX
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.current_index < self.current_branch().head_index()
    }

    /// Whether a dispatch would append to the current branch rather than fork.
    #[must_use]
    pub fn is_at_tip(&self) -> bool {
        !self.can_redo()
    }

    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        self.stats
    }

    // ========================================================================
    // Branch lookup
    // ========================================================================

    #[must_use]
    pub fn branch(&self, id: BranchId) -> Option<&Branch<C>> {
        self.branches.get(&id)
    }

    pub fn try_branch(&self, id: BranchId) -> Result<&Branch<C>> {
        self.branches.get(&id).ok_or(HistoryError::UnknownBranch(id))
    }

    /// All branches in creation order.
    pub fn branches(&self) -> impl Iterator<Item = &Branch<C>> {
        self.branches.values()
    }

    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Branches ordered by latest activity, most recent first.
    #[must_use]
    pub fn branches_by_activity(&self) -> Vec<&Branch<C>> {
        let mut list: Vec<_> = self.branches.values().collect();
        list.sort_by(|a, b| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a.id.cmp(&b.id))
        });
        list
    }

    /// Number of actions between the start state and the head of `branch`.
    pub fn path_len(&self, branch: BranchId) -> Result<usize> {
        let head = self.try_branch(branch)?.head_index();
        let spans = path::lineage(self, Position::new(branch, head))?;
        Ok(spans.iter().map(|span| (span.end + 1) as usize).sum())
    }

    /// The last action two branches have in common, expressed in the
    /// coordinates the cursor would use when moving from `from` onto `to`.
    ///
    /// The result lies on `to` when the shared action is in `to`'s own stack
    /// or at its fork point; otherwise it lies on the nearest branch of
    /// `to`'s lineage that can express it.
    pub fn last_common_action(&self, from: BranchId, to: BranchId) -> Result<Position> {
        path::last_common_action(self, from, to)
    }

    pub(crate) fn item(&self, item: ItemRef) -> Result<&HistoryItem> {
        let branch = self.try_branch(item.branch)?;
        branch
            .stack
            .get(item.index)
            .ok_or(HistoryError::IndexOutOfRange {
                branch: item.branch,
                index: item.index as isize,
                len: branch.len(),
            })
    }

    // ========================================================================
    // UI helpers
    // ========================================================================

    fn children(&self, id: BranchId) -> impl Iterator<Item = &Branch<C>> {
        self.branches
            .values()
            .filter(move |b| b.parent_connection.is_some_and(|p| p.branch_id == id))
    }

    fn collect_descendants<'a>(&'a self, id: BranchId, out: &mut Vec<&'a Branch<C>>) {
        for child in self.children(id) {
            out.push(child);
            self.collect_descendants(child.id, out);
        }
    }

    /// Branches forking from `branch_id`, grouped by fork index.
    ///
    /// Groups are ordered by `global_index`. Each group lists the direct
    /// children in creation order; with `flatten`, every child is followed by
    /// all of its descendants.
    #[must_use]
    pub fn side_branches(&self, branch_id: BranchId, flatten: bool) -> Vec<BranchConnection<'_, C>> {
        let mut groups: BTreeMap<isize, Vec<&Branch<C>>> = BTreeMap::new();
        for child in self.children(branch_id) {
            let Some(connection) = child.parent_connection else {
                continue;
            };
            let group = groups.entry(connection.global_index).or_default();
            group.push(child);
            if flatten {
                self.collect_descendants(child.id, group);
            }
        }
        groups
            .into_iter()
            .map(|(global_index, branches)| BranchConnection {
                global_index,
                branches,
            })
            .collect()
    }

    /// Action list of a branch, newest entry first and the start entry last.
    pub fn timeline(&self, branch_id: BranchId) -> Result<Vec<TimelineEntry<'_, C>>> {
        let branch = self.try_branch(branch_id)?;
        let mut connections: BTreeMap<isize, Vec<&Branch<C>>> = self
            .side_branches(branch_id, true)
            .into_iter()
            .map(|c| (c.global_index, c.branches))
            .collect();

        let entries = (START_INDEX..=branch.head_index())
            .rev()
            .map(|index| TimelineEntry {
                index,
                item: branch.item(index),
                is_current: branch_id == self.current_branch_id && index == self.current_index,
                connections: connections.remove(&index).unwrap_or_default(),
            })
            .collect();
        Ok(entries)
    }

    // ========================================================================
    // Mutation (engine only)
    // ========================================================================

    /// Append to the current branch and move the cursor onto the new item.
    pub(crate) fn append(&mut self, item: HistoryItem) {
        let Some(branch) = self.branches.get_mut(&self.current_branch_id) else {
            return;
        };
        branch.stack.push(item);
        self.current_index = branch.head_index();
    }

    /// Fork a new branch at the cursor holding `item` and move onto it.
    pub(crate) fn fork(&mut self, custom: C, item: HistoryItem) -> BranchId {
        let id = BranchId::new(self.stats.branch_counter);
        self.stats.branch_counter += 1;
        self.branches.insert(
            id,
            Branch {
                id,
                stack: vec![item],
                parent_connection: Some(ParentConnection {
                    branch_id: self.current_branch_id,
                    global_index: self.current_index,
                }),
                created: SystemTime::now(),
                custom,
            },
        );
        self.current_branch_id = id;
        self.current_index = 0;
        id
    }

    /// Drop the items after the cursor on the current branch together with
    /// every branch forking from them. Returns the number of items dropped.
    pub(crate) fn truncate_redo(&mut self) -> usize {
        let current = self.current_branch_id;
        let index = self.current_index;
        let mut forks = Vec::new();
        for child in self
            .children(current)
            .filter(|b| b.parent_connection.is_some_and(|p| p.global_index > index))
        {
            forks.push(child);
            self.collect_descendants(child.id, &mut forks);
        }
        let forks: Vec<BranchId> = forks.into_iter().map(|b| b.id).collect();
        for id in &forks {
            self.branches.remove(id);
        }

        let keep = usize::try_from(index + 1).unwrap_or(0);
        let Some(branch) = self.branches.get_mut(&current) else {
            return 0;
        };
        let dropped = branch.stack.len().saturating_sub(keep);
        branch.stack.truncate(keep);
        dropped
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.current_branch_id = position.branch;
        self.current_index = position.index;
    }
}

// ============================================================================
// Tests
// ============================================================================
