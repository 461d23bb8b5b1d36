#![forbid(unsafe_code)]

//! One-line labels for committed board actions, shown in the action list.

use histree::Standard;

use crate::actions::{ColorChange, MoveSelection, ScaleSelection};
use crate::board::{Card, CardId, IndexedCard};
use crate::geometry::{Bounds, Vector};

fn cards(amount: usize) -> String {
    if amount == 1 {
        "1 card".to_string()
    } else {
        format!("{amount} cards")
    }
}

pub fn move_cards(payload: &Standard<Vector, MoveSelection>) -> String {
    format!(
        "Move {} by {}",
        cards(payload.rest.len()),
        payload.to - payload.from
    )
}

pub fn scale_cards(payload: &Standard<Bounds, ScaleSelection>) -> String {
    let factor = payload
        .to
        .dimensions()
        .divide_by(payload.from.dimensions());
    format!(
        "Scale {} by {}",
        cards(payload.rest.len()),
        factor.to_rounded_string(2)
    )
}

pub fn add_card(card: &Card) -> String {
    format!("Add card at {}", card.location)
}

#[allow(clippy::ptr_arg)]
pub fn remove_cards(items: &Vec<IndexedCard>) -> String {
    format!("Remove {}", cards(items.len()))
}

pub fn reorder_card(payload: &Standard<usize, CardId>) -> String {
    format!("Reorder card from index {} to {}", payload.from, payload.to)
}

/// The new text cut to `preview_chars` characters.
pub fn update_text(payload: &Standard<String, CardId>, preview_chars: usize) -> String {
    let preview: String = payload.to.chars().take(preview_chars).collect();
    format!("Update text '{preview}...'")
}

pub fn update_color(change: &ColorChange) -> String {
    format!(
        "Change color of {} to {}",
        cards(change.previous.len()),
        change.to
    )
}
