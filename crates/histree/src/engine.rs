#![forbid(unsafe_code)]

//! The history engine: dispatch, undo/redo, time travel and branch switching.
//!
//! [`HistoryEngine`] owns the [`ActionRegistry`] and the [`History`] and
//! drives caller state through the registered mutators. The caller keeps
//! its own state and lends it to every call:
//!
//! ```rust,ignore
//! let mut registry = ActionRegistry::<Vec<char>>::new();
//! let push = registry.register_custom("push", CustomHandler::new(
//!     |s: &mut Vec<char>, c: &char| s.push(*c),
//!     |s: &mut Vec<char>, _: &char| { s.pop(); },
//! ))?;
//!
//! let mut engine: HistoryEngine<Vec<char>> = HistoryEngine::new(registry);
//! let mut state = Vec::new();
//! engine.dispatch(&mut state, &push, 'a')?;
//! engine.undo(&mut state)?;
//! assert!(state.is_empty());
//! ```
//!
//! # Invariants
//!
//! 1. After every successful call, the caller state equals the result of
//!    applying the path from the start state to the cursor, in order.
//! 2. A call that returns `Err` has changed neither the history nor the
//!    state: targets and payloads are validated before anything is applied.
//! 3. Mutators receive only `&mut S`, so they cannot call back into the
//!    engine while it is replaying.
//!
//! # Branching
//!
//! Dispatching while the cursor is behind the head of its branch never
//! discards the redo items. A new branch is forked at the cursor instead,
//! and its metadata comes from the branch initializer. With
//! [`HistoryConfig::linear`] the engine behaves like a classic undo stack
//! and drops the redo items instead.

use std::any::Any;
use std::fmt;

use web_time::SystemTime;

use crate::action::{ActionHandle, ActionRegistry, ActionType, Direction};
use crate::branch::{BranchId, History, HistoryItem, ItemId, Position};
use crate::config::HistoryConfig;
use crate::error::Result;
use crate::path::{self, Replay};

/// Produces the metadata of a new branch from the history as it is just
/// before the fork.
pub type BranchInit<C> = Box<dyn Fn(&History<C>) -> C>;

/// Where [`HistoryEngine::switch_to_branch`] leaves the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchSwitchMode {
    /// Move to the newest item of the target branch.
    #[default]
    HeadOfBranch,
    /// Move to the last action the current and target branches share,
    /// comparing the lineages up to both heads.
    ///
    /// The cursor lands on the branch of the target's lineage that directly
    /// continues from that action. When the shared action is the fork point
    /// of an intermediate branch (switching from the root toward a
    /// grandchild, say) the cursor lands on the start of that intermediate
    /// branch, so a following redo replays its items rather than the
    /// target's.
    LastCommonAction,
}

fn default_custom<C: Default>(_: &History<C>) -> C {
    C::default()
}

/// Branch-aware undo/redo engine over caller state `S` with branch
/// metadata `C`.
pub struct HistoryEngine<S, C = ()> {
    registry: ActionRegistry<S>,
    history: History<C>,
    init_branch: BranchInit<C>,
    config: HistoryConfig,
    next_item_id: u64,
}

impl<S, C: fmt::Debug> fmt::Debug for HistoryEngine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEngine")
            .field("registry", &self.registry)
            .field("history", &self.history)
            .field("config", &self.config)
            .field("next_item_id", &self.next_item_id)
            .finish_non_exhaustive()
    }
}

impl<S, C: Default + 'static> HistoryEngine<S, C> {
    /// Create an engine whose branches all get `C::default()` metadata.
    #[must_use]
    pub fn new(registry: ActionRegistry<S>) -> Self {
        Self::with_branch_init(registry, C::default(), default_custom::<C>)
    }
}

impl<S, C> HistoryEngine<S, C> {
    /// Create an engine with explicit root metadata and a branch initializer.
    ///
    /// `init` runs once per fork, before the branch counter advances, so
    /// `history.stats().branch_counter` is the number of existing branches.
    #[must_use]
    pub fn with_branch_init<F>(registry: ActionRegistry<S>, root_custom: C, init: F) -> Self
    where
        F: Fn(&History<C>) -> C + 'static,
    {
        Self {
            registry,
            history: History::new(root_custom),
            init_branch: Box::new(init),
            config: HistoryConfig::default(),
            next_item_id: 0,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: HistoryConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn history(&self) -> &History<C> {
        &self.history
    }

    #[must_use]
    pub fn registry(&self) -> &ActionRegistry<S> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Human-readable label of a committed item.
    #[must_use]
    pub fn describe(&self, item: &HistoryItem) -> String {
        self.registry.describe(item)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Commit a new action and apply it forward.
    ///
    /// Appends to the current branch when the cursor is at its head and
    /// forks a new branch otherwise (or, in linear mode, drops the redo
    /// items and appends).
    pub fn dispatch<P: Any + Send + Sync>(
        &mut self,
        state: &mut S,
        action: &ActionHandle<P>,
        payload: P,
    ) -> Result<ItemId> {
        self.dispatch_dyn(state, action.action().clone(), payload)
    }

    /// Like [`dispatch`](Self::dispatch), addressing the action by name.
    /// The payload type is checked at runtime.
    pub fn dispatch_dyn<P: Any + Send + Sync>(
        &mut self,
        state: &mut S,
        action: impl Into<ActionType>,
        payload: P,
    ) -> Result<ItemId> {
        let action = action.into();
        let _span = tracing::debug_span!(
            "history.dispatch",
            action = %action,
            branch = %self.history.current_branch_id()
        )
        .entered();

        let payload = self.registry.payload_for(&action, payload)?;
        let id = ItemId::new(self.next_item_id);
        self.next_item_id += 1;
        let item = HistoryItem::new(id, action, payload, SystemTime::now());

        if self.history.is_at_tip() {
            self.history.append(item.clone());
        } else if !self.config.branching {
            let dropped = self.history.truncate_redo();
            tracing::debug!(
                target: "histree.engine",
                dropped,
                position = %self.history.position(),
                "redo items discarded"
            );
            self.history.append(item.clone());
        } else {
            let parent = self.history.position();
            let custom = (self.init_branch)(&self.history);
            let branch = self.history.fork(custom, item.clone());
            tracing::debug!(
                target: "histree.engine",
                branch = %branch,
                parent = %parent,
                "branch created"
            );
        }

        self.registry.apply(state, &item, Direction::Forward)?;
        tracing::debug!(
            target: "histree.engine",
            item = %id,
            action = %item.action(),
            position = %self.history.position(),
            "action dispatched"
        );
        Ok(id)
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    /// Reverse the current item. Returns `Ok(false)` at the start of the
    /// branch.
    pub fn undo(&mut self, state: &mut S) -> Result<bool> {
        let _span = tracing::debug_span!("history.undo").entered();
        let Some(item) = self.history.current_item() else {
            tracing::trace!(target: "histree.engine", "nothing to undo");
            return Ok(false);
        };
        self.registry.apply(state, item, Direction::Backward)?;
        let position = Position::new(
            self.history.current_branch_id(),
            self.history.current_index() - 1,
        );
        self.history.set_position(position);
        tracing::debug!(target: "histree.engine", position = %position, "undo");
        Ok(true)
    }

    /// Re-apply the next item of the current branch. Returns `Ok(false)` at
    /// the head of the branch.
    pub fn redo(&mut self, state: &mut S) -> Result<bool> {
        let _span = tracing::debug_span!("history.redo").entered();
        let Some(item) = self.history.next_item() else {
            tracing::trace!(target: "histree.engine", "nothing to redo");
            return Ok(false);
        };
        self.registry.apply(state, item, Direction::Forward)?;
        let position = Position::new(
            self.history.current_branch_id(),
            self.history.current_index() + 1,
        );
        self.history.set_position(position);
        tracing::debug!(target: "histree.engine", position = %position, "redo");
        Ok(true)
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Move the cursor to `index` on `branch` (the current branch if `None`),
    /// replaying every action on the way.
    pub fn time_travel(&mut self, state: &mut S, index: isize, branch: Option<BranchId>) -> Result<()> {
        let branch = branch.unwrap_or(self.history.current_branch_id());
        let _span = tracing::debug_span!("history.time_travel", branch = %branch, index).entered();
        self.travel(state, Position::new(branch, index))
    }

    /// Move onto another branch.
    pub fn switch_to_branch(&mut self, state: &mut S, branch: BranchId, mode: BranchSwitchMode) -> Result<()> {
        let _span = tracing::debug_span!("history.switch_branch", branch = %branch, mode = ?mode).entered();
        let head = self.history.try_branch(branch)?.head_index();
        let target = match mode {
            BranchSwitchMode::HeadOfBranch => Position::new(branch, head),
            BranchSwitchMode::LastCommonAction => self
                .history
                .last_common_action(self.history.current_branch_id(), branch)?,
        };
        self.travel(state, target)
    }

    fn travel(&mut self, state: &mut S, target: Position) -> Result<()> {
        let from = self.history.position();
        let replay = path::plan(&self.history, from, target)?;
        if replay.is_empty() {
            self.history.set_position(target);
            tracing::trace!(target: "histree.engine", from = %from, to = %target, "nothing to replay");
            return Ok(());
        }
        if replay.len() > self.config.replay_warn_threshold {
            tracing::warn!(
                target: "histree.engine",
                from = %from,
                to = %target,
                replayed = replay.len(),
                threshold = self.config.replay_warn_threshold,
                "long history replay"
            );
        }
        self.replay(state, &replay)?;
        self.history.set_position(target);
        tracing::debug!(
            target: "histree.engine",
            from = %from,
            to = %target,
            steps = replay.len(),
            undone = replay.backward.len(),
            redone = replay.forward.len(),
            "replay completed"
        );
        Ok(())
    }

    fn replay(&self, state: &mut S, replay: &Replay) -> Result<()> {
        let steps = replay
            .backward
            .iter()
            .map(|item| (item, Direction::Backward))
            .chain(replay.forward.iter().map(|item| (item, Direction::Forward)));
        for (item, direction) in steps {
            let item = self.history.item(*item)?;
            tracing::trace!(
                target: "histree.engine",
                direction = %direction,
                item = %item.id(),
                action = %item.action(),
                "replay step"
            );
            self.registry.apply(state, item, direction)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{CustomHandler, Standard};
    use crate::branch::START_INDEX;
    use crate::error::HistoryError;

    const ROOT: BranchId = BranchId(0);

    fn registry() -> (ActionRegistry<String>, ActionHandle<char>, ActionHandle<Standard<String>>) {
        let mut registry = ActionRegistry::new();
        let push = registry
            .register_custom(
                "push",
                CustomHandler::new(
                    |s: &mut String, c: &char| s.push(*c),
                    |s: &mut String, _: &char| {
                        s.pop();
                    },
                ),
            )
            .unwrap();
        let set = registry
            .register_standard("set", |s: &mut String, v: &String, _: &()| {
                s.clone_from(v);
            })
            .unwrap();
        (registry, push, set)
    }

    fn engine() -> (HistoryEngine<String>, ActionHandle<char>, ActionHandle<Standard<String>>) {
        let (registry, push, set) = registry();
        (HistoryEngine::new(registry), push, set)
    }

    #[test]
    fn fresh_engine_has_nothing_to_do() {
        let (mut engine, _, _) = engine();
        let mut state = String::new();
        assert!(!engine.can_undo());
        assert!(!engine.can_redo());
        assert!(!engine.undo(&mut state).unwrap());
        assert!(!engine.redo(&mut state).unwrap());
        assert_eq!(engine.history().position(), Position::new(ROOT, START_INDEX));
    }

    #[test]
    fn dispatch_undo_redo() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();
        engine.dispatch(&mut state, &push, 'b').unwrap();
        assert_eq!(state, "ab");
        assert_eq!(engine.history().current_index(), 1);

        assert!(engine.undo(&mut state).unwrap());
        assert_eq!(state, "a");
        assert!(engine.can_redo());

        assert!(engine.redo(&mut state).unwrap());
        assert_eq!(state, "ab");
        assert!(!engine.can_redo());
    }

    #[test]
    fn standard_payload_applies_from_and_to() {
        let (mut engine, _, set) = engine();
        let mut state = String::from("x");
        engine
            .dispatch(&mut state, &set, Standard::between("x".into(), "y".into()))
            .unwrap();
        assert_eq!(state, "y");
        engine.undo(&mut state).unwrap();
        assert_eq!(state, "x");
    }

    #[test]
    fn dispatch_behind_head_forks_and_keeps_redo_items() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();
        engine.dispatch(&mut state, &push, 'b').unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 'c').unwrap();
        assert_eq!(state, "ac");

        let history = engine.history();
        assert_eq!(history.branch_count(), 2);
        assert_eq!(history.branch(ROOT).unwrap().len(), 2);
        assert_eq!(history.position(), Position::new(BranchId(1), 0));
        assert_eq!(history.stats().branch_counter, 2);
    }

    #[test]
    fn item_ids_are_unique_across_branches() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        let a = engine.dispatch(&mut state, &push, 'a').unwrap();
        engine.undo(&mut state).unwrap();
        let b = engine.dispatch(&mut state, &push, 'b').unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn time_travel_across_branches() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        for c in ['a', 'b', 'c'] {
            engine.dispatch(&mut state, &push, c).unwrap();
        }
        engine.time_travel(&mut state, 0, None).unwrap();
        assert_eq!(state, "a");
        engine.dispatch(&mut state, &push, 'x').unwrap();
        assert_eq!(state, "ax");

        engine.time_travel(&mut state, 2, Some(ROOT)).unwrap();
        assert_eq!(state, "abc");
        engine.time_travel(&mut state, START_INDEX, None).unwrap();
        assert_eq!(state, "");
        engine.time_travel(&mut state, 0, Some(BranchId(1))).unwrap();
        assert_eq!(state, "ax");
    }

    #[test]
    fn invalid_targets_change_nothing() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();

        assert_eq!(
            engine.time_travel(&mut state, 5, None),
            Err(HistoryError::IndexOutOfRange {
                branch: ROOT,
                index: 5,
                len: 1
            })
        );
        assert_eq!(
            engine.time_travel(&mut state, 0, Some(BranchId(3))),
            Err(HistoryError::UnknownBranch(BranchId(3)))
        );
        assert_eq!(
            engine.switch_to_branch(&mut state, BranchId(3), BranchSwitchMode::HeadOfBranch),
            Err(HistoryError::UnknownBranch(BranchId(3)))
        );
        assert_eq!(state, "a");
        assert_eq!(engine.history().position(), Position::new(ROOT, 0));
    }

    #[test]
    fn bad_dispatch_changes_nothing() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();

        let err = engine.dispatch_dyn(&mut state, "nope", 1u8).unwrap_err();
        assert_eq!(err, HistoryError::UnknownActionType(ActionType::new("nope")));
        let err = engine.dispatch_dyn(&mut state, "push", 1u8).unwrap_err();
        assert!(matches!(err, HistoryError::PayloadMismatch { .. }));

        assert_eq!(state, "a");
        assert_eq!(engine.history().current_branch().len(), 1);
        engine.dispatch_dyn(&mut state, "push", 'b').unwrap();
        assert_eq!(state, "ab");
    }

    #[test]
    fn switch_to_branch_head_and_common_action() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();
        engine.dispatch(&mut state, &push, 'b').unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 'c').unwrap();
        engine.dispatch(&mut state, &push, 'd').unwrap();
        assert_eq!(state, "acd");

        engine
            .switch_to_branch(&mut state, ROOT, BranchSwitchMode::HeadOfBranch)
            .unwrap();
        assert_eq!(state, "ab");

        engine
            .switch_to_branch(&mut state, BranchId(1), BranchSwitchMode::LastCommonAction)
            .unwrap();
        assert_eq!(state, "a");
        assert_eq!(engine.history().position(), Position::new(BranchId(1), START_INDEX));
        assert!(engine.redo(&mut state).unwrap());
        assert_eq!(state, "ac");
    }

    #[test]
    fn branch_init_sees_counter_before_increment() {
        let (registry, push, _) = registry();
        let mut engine: HistoryEngine<String, String> = HistoryEngine::with_branch_init(
            registry,
            "Branch 1".to_string(),
            |history: &History<String>| format!("Branch {}", history.stats().branch_counter + 1),
        );
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 'b').unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 'c').unwrap();

        let names: Vec<&str> = engine
            .history()
            .branches()
            .map(|b| b.custom().as_str())
            .collect();
        assert_eq!(names, vec!["Branch 1", "Branch 2", "Branch 3"]);
    }

    #[test]
    fn with_config_replaces_defaults() {
        let (engine, _, _) = engine();
        let engine = engine.with_config(HistoryConfig::new(4));
        assert_eq!(engine.config().replay_warn_threshold, 4);
    }

    #[test]
    fn describe_falls_back_to_action_name() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();
        let item = engine.history().current_item().unwrap();
        assert_eq!(engine.describe(item), "push");
    }

    #[test]
    fn common_action_toward_grandchild_lands_on_intermediate_branch() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();
        engine.dispatch(&mut state, &push, 'b').unwrap();
        engine.undo(&mut state).unwrap();
        // b1 forks after 'a', b2 forks from the start of b1.
        engine.dispatch(&mut state, &push, 'c').unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 'd').unwrap();
        assert_eq!(state, "ad");
        assert_eq!(engine.history().position(), Position::new(BranchId(2), 0));

        engine
            .switch_to_branch(&mut state, ROOT, BranchSwitchMode::HeadOfBranch)
            .unwrap();
        assert_eq!(state, "ab");

        engine
            .switch_to_branch(&mut state, BranchId(2), BranchSwitchMode::LastCommonAction)
            .unwrap();
        assert_eq!(state, "a");
        assert_eq!(engine.history().position(), Position::new(BranchId(1), START_INDEX));
        assert!(engine.redo(&mut state).unwrap());
        assert_eq!(state, "ac");
    }

    #[test]
    fn travel_without_replay_still_moves_cursor() {
        let (mut engine, push, _) = engine();
        let mut state = String::new();
        engine.dispatch(&mut state, &push, 'a').unwrap();
        engine.dispatch(&mut state, &push, 'b').unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 'c').unwrap();
        engine.time_travel(&mut state, 0, Some(ROOT)).unwrap();
        assert_eq!(state, "a");

        // Same state, different coordinates: the start of b1 is root@0.
        engine.time_travel(&mut state, START_INDEX, Some(BranchId(1))).unwrap();
        assert_eq!(state, "a");
        assert_eq!(engine.history().position(), Position::new(BranchId(1), START_INDEX));

        engine.time_travel(&mut state, START_INDEX, None).unwrap();
        assert_eq!(state, "a");
        assert!(engine.redo(&mut state).unwrap());
        assert_eq!(state, "ac");
    }

    #[test]
    fn linear_history_discards_redo_items() {
        let (registry, push, _) = registry();
        let mut engine: HistoryEngine<String> =
            HistoryEngine::new(registry).with_config(HistoryConfig::linear());
        let mut state = String::new();
        for c in ['a', 'b', 'c'] {
            engine.dispatch(&mut state, &push, c).unwrap();
        }
        engine.undo(&mut state).unwrap();
        engine.undo(&mut state).unwrap();
        engine.dispatch(&mut state, &push, 'x').unwrap();

        assert_eq!(state, "ax");
        let history = engine.history();
        assert_eq!(history.branch_count(), 1);
        assert_eq!(history.position(), Position::new(ROOT, 1));
        assert!(!engine.can_redo());
        assert!(engine.undo(&mut state).unwrap());
        assert!(engine.redo(&mut state).unwrap());
        assert_eq!(state, "ax");
    }
}
