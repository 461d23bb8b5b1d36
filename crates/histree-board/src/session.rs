#![forbid(unsafe_code)]

//! A board wired to a history engine.
//!
//! [`Session`] owns the board state, the engine and the action handles, and
//! exposes one method per user gesture. Every gesture is dispatched as a
//! single history item.

use histree::{ActionRegistry, BranchId, BranchSwitchMode, HistoryEngine, ItemId, Standard};

use crate::actions::{BoardActions, ColorChange, move_selection, scale_selection};
use crate::board::{Board, Card, CardId};
use crate::config::BoardConfig;
use crate::geometry::{Bounds, Vector};
use crate::timeline::BranchLabel;

pub type BoardEngine = HistoryEngine<Board, BranchLabel>;

#[derive(Debug)]
pub struct Session {
    engine: BoardEngine,
    actions: BoardActions,
    board: Board,
    next_card: u64,
}

impl Session {
    pub fn new(config: &BoardConfig) -> histree::Result<Self> {
        let mut registry = ActionRegistry::new();
        let actions = BoardActions::register(&mut registry, config.text_preview_chars)?;
        let engine = HistoryEngine::with_branch_init(registry, BranchLabel::root(), BranchLabel::next)
            .with_config(config.history.clone());
        Ok(Self {
            engine,
            actions,
            board: Board::new(),
            next_card: 1,
        })
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn engine(&self) -> &BoardEngine {
        &self.engine
    }

    /// Add a default card centered on `point`.
    pub fn add_card(&mut self, point: Vector, text: impl Into<String>) -> histree::Result<CardId> {
        let id = CardId(self.next_card);
        self.next_card += 1;
        let card = Card::centered_at(id, point, text);
        self.engine
            .dispatch(&mut self.board, &self.actions.add_card, card)?;
        Ok(id)
    }

    /// Drag `ids` by `delta`. The drag anchor is the board origin.
    pub fn move_cards(&mut self, ids: &[CardId], delta: Vector) -> histree::Result<ItemId> {
        let selection = move_selection(&self.board, ids, Vector::ZERO);
        self.engine.dispatch(
            &mut self.board,
            &self.actions.move_cards,
            Standard::new(Vector::ZERO, delta, selection),
        )
    }

    /// Stretch the bounds of `ids` to `to`.
    pub fn scale_cards(&mut self, ids: &[CardId], to: Bounds) -> histree::Result<ItemId> {
        let (from, selection) = scale_selection(&self.board, ids);
        self.engine.dispatch(
            &mut self.board,
            &self.actions.scale_cards,
            Standard::new(from, to, selection),
        )
    }

    pub fn remove_cards(&mut self, ids: &[CardId]) -> histree::Result<ItemId> {
        let removed = self.board.indexed(ids);
        self.engine
            .dispatch(&mut self.board, &self.actions.remove_cards, removed)
    }

    /// Move `id` to `index` in the z order. Unknown cards record nothing.
    pub fn reorder_card(&mut self, id: CardId, index: usize) -> histree::Result<Option<ItemId>> {
        let Some(from) = self.board.index_of(id) else {
            return Ok(None);
        };
        self.engine
            .dispatch(
                &mut self.board,
                &self.actions.reorder_card,
                Standard::new(from, index, id),
            )
            .map(Some)
    }

    /// Replace the text of `id`. Unknown cards record nothing.
    pub fn update_text(&mut self, id: CardId, text: impl Into<String>) -> histree::Result<Option<ItemId>> {
        let Some(card) = self.board.card(id) else {
            return Ok(None);
        };
        let payload = Standard::new(card.text.clone(), text.into(), id);
        self.engine
            .dispatch(&mut self.board, &self.actions.update_text, payload)
            .map(Some)
    }

    pub fn update_color(&mut self, ids: &[CardId], color: impl Into<String>) -> histree::Result<ItemId> {
        let change = ColorChange::new(&self.board, ids, color);
        self.engine
            .dispatch(&mut self.board, &self.actions.update_color, change)
    }

    pub fn undo(&mut self) -> histree::Result<bool> {
        self.engine.undo(&mut self.board)
    }

    pub fn redo(&mut self) -> histree::Result<bool> {
        self.engine.redo(&mut self.board)
    }

    pub fn time_travel(&mut self, index: isize, branch: Option<BranchId>) -> histree::Result<()> {
        self.engine.time_travel(&mut self.board, index, branch)
    }

    pub fn switch_to_branch(&mut self, branch: BranchId, mode: BranchSwitchMode) -> histree::Result<()> {
        self.engine.switch_to_branch(&mut self.board, branch, mode)
    }
}
