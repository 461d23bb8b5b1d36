#![forbid(unsafe_code)]

//! The seven undoable board actions and their payloads.
//!
//! | action        | shape    | payload                              |
//! |---------------|----------|--------------------------------------|
//! | `moveCards`   | standard | `Standard<Vector, MoveSelection>`    |
//! | `scaleCards`  | standard | `Standard<Bounds, ScaleSelection>`   |
//! | `addCard`     | custom   | `Card`                               |
//! | `removeCards` | custom   | `Vec<IndexedCard>`                   |
//! | `reorderCard` | standard | `Standard<usize, CardId>`            |
//! | `updateText`  | standard | `Standard<String, CardId>`           |
//! | `updateColor` | custom   | `ColorChange`                        |
//!
//! Move and scale payloads store every selected card relative to the drag
//! anchor or the selection bounds, so applying `from` or `to` places all
//! cards without reading their previous positions.

use std::collections::BTreeMap;

use histree::{ActionHandle, ActionRegistry, CustomHandler, Standard};

use crate::board::{Board, Card, CardId, IndexedCard, MIN_CARD_SIZE};
use crate::describe;
use crate::geometry::{Bounds, Vector};

/// Per-card offset from the drag anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveItem {
    pub location_rel: Vector,
}

pub type MoveSelection = BTreeMap<CardId, MoveItem>;

/// Per-card placement normalized to the selection bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleItem {
    pub location_norm: Vector,
    pub dimensions_norm: Vector,
}

pub type ScaleSelection = BTreeMap<CardId, ScaleItem>;

/// Recolor of a selection, remembering each card's previous color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorChange {
    pub previous: BTreeMap<CardId, String>,
    pub to: String,
}

impl ColorChange {
    /// Capture the current colors of `ids`. Unknown ids are skipped.
    #[must_use]
    pub fn new(board: &Board, ids: &[CardId], to: impl Into<String>) -> Self {
        let previous = ids
            .iter()
            .filter_map(|id| board.card(*id).map(|c| (*id, c.color.clone())))
            .collect();
        Self {
            previous,
            to: to.into(),
        }
    }
}

/// Selection for a move anchored at `anchor`.
#[must_use]
pub fn move_selection(board: &Board, ids: &[CardId], anchor: Vector) -> MoveSelection {
    ids.iter()
        .filter_map(|id| {
            board.card(*id).map(|card| {
                (
                    *id,
                    MoveItem {
                        location_rel: card.location - anchor,
                    },
                )
            })
        })
        .collect()
}

/// Current bounds of `ids` and each card's placement normalized to them.
#[must_use]
pub fn scale_selection(board: &Board, ids: &[CardId]) -> (Bounds, ScaleSelection) {
    let bounds = board.selection_bounds(ids);
    let dimensions = bounds.dimensions();
    let selection = ids
        .iter()
        .filter_map(|id| {
            board.card(*id).map(|card| {
                (
                    *id,
                    ScaleItem {
                        location_norm: (card.location - bounds.top_left()).divide_by(dimensions),
                        dimensions_norm: card.dimensions.divide_by(dimensions),
                    },
                )
            })
        })
        .collect();
    (bounds, selection)
}

// ============================================================================
// State setters
// ============================================================================

fn place_cards(board: &mut Board, anchor: &Vector, selection: &MoveSelection) {
    for card in &mut board.cards {
        if let Some(item) = selection.get(&card.id) {
            card.location = *anchor + item.location_rel;
        }
    }
}

fn fit_cards(board: &mut Board, bounds: &Bounds, selection: &ScaleSelection) {
    let dimensions = bounds.dimensions();
    for card in &mut board.cards {
        if let Some(item) = selection.get(&card.id) {
            card.location = bounds.top_left() + item.location_norm.scale(dimensions);
            card.dimensions = item.dimensions_norm.scale(dimensions).max(MIN_CARD_SIZE);
        }
    }
}

fn set_index(board: &mut Board, index: &usize, id: &CardId) {
    board.move_to_index(*id, *index);
}

#[allow(clippy::ptr_arg)]
fn set_text(board: &mut Board, text: &String, id: &CardId) {
    if let Some(card) = board.card_mut(*id) {
        card.text.clone_from(text);
    }
}

fn paint(board: &mut Board, colors: Vec<(CardId, String)>) {
    for (id, color) in colors {
        if let Some(card) = board.card_mut(id) {
            card.color = color;
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Typed dispatch handles for every board action.
#[derive(Debug, Clone)]
pub struct BoardActions {
    pub move_cards: ActionHandle<Standard<Vector, MoveSelection>>,
    pub scale_cards: ActionHandle<Standard<Bounds, ScaleSelection>>,
    pub add_card: ActionHandle<Card>,
    pub remove_cards: ActionHandle<Vec<IndexedCard>>,
    pub reorder_card: ActionHandle<Standard<usize, CardId>>,
    pub update_text: ActionHandle<Standard<String, CardId>>,
    pub update_color: ActionHandle<ColorChange>,
}

impl BoardActions {
    /// Register all board actions with payload describers. Text previews in
    /// descriptions are cut to `text_preview_chars` characters.
    pub fn register(
        registry: &mut ActionRegistry<Board>,
        text_preview_chars: usize,
    ) -> histree::Result<Self> {
        let move_cards = registry.register_standard("moveCards", place_cards)?;
        let scale_cards = registry.register_standard("scaleCards", fit_cards)?;
        let add_card = registry.register_custom(
            "addCard",
            CustomHandler::new(
                |board: &mut Board, card: &Card| board.push(card.clone()),
                |board: &mut Board, card: &Card| {
                    board.remove(card.id);
                },
            ),
        )?;
        let remove_cards = registry.register_custom(
            "removeCards",
            CustomHandler::new(
                |board: &mut Board, cards: &Vec<IndexedCard>| {
                    for item in cards {
                        board.remove(item.card.id);
                    }
                },
                |board: &mut Board, cards: &Vec<IndexedCard>| board.insert_indexed(cards),
            ),
        )?;
        let reorder_card = registry.register_standard("reorderCard", set_index)?;
        let update_text = registry.register_standard("updateText", set_text)?;
        let update_color = registry.register_custom(
            "updateColor",
            CustomHandler::projected(
                |change: &ColorChange| {
                    change
                        .previous
                        .keys()
                        .map(|id| (*id, change.to.clone()))
                        .collect::<Vec<_>>()
                },
                paint,
                |change: &ColorChange| {
                    change
                        .previous
                        .iter()
                        .map(|(id, color)| (*id, color.clone()))
                        .collect::<Vec<_>>()
                },
                paint,
            ),
        )?;

        registry.describe_with(&move_cards, describe::move_cards)?;
        registry.describe_with(&scale_cards, describe::scale_cards)?;
        registry.describe_with(&add_card, describe::add_card)?;
        registry.describe_with(&remove_cards, describe::remove_cards)?;
        registry.describe_with(&reorder_card, describe::reorder_card)?;
        registry.describe_with(&update_text, move |p: &Standard<String, CardId>| {
            describe::update_text(p, text_preview_chars)
        })?;
        registry.describe_with(&update_color, describe::update_color)?;

        Ok(Self {
            move_cards,
            scale_cards,
            add_card,
            remove_cards,
            reorder_card,
            update_text,
            update_color,
        })
    }
}
