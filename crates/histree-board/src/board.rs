#![forbid(unsafe_code)]

//! The card board: the application state the history engine mutates.
//!
//! Card order in [`Board::cards`] is the z order, last card on top.

use std::fmt;

use crate::geometry::{Bounds, Vector};

/// Size of a card created by [`Card::centered_at`].
pub const DEFAULT_CARD_SIZE: Vector = Vector::new(120.0, 90.0);

/// Scaling never shrinks a card below this size.
pub const MIN_CARD_SIZE: Vector = Vector::new(40.0, 30.0);

pub const DEFAULT_CARD_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardId(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub location: Vector,
    pub dimensions: Vector,
    pub text: String,
    pub color: String,
}

impl Card {
    /// A default-sized card centered on `point`.
    #[must_use]
    pub fn centered_at(id: CardId, point: Vector, text: impl Into<String>) -> Self {
        Self {
            id,
            location: point - DEFAULT_CARD_SIZE.multiply(0.5),
            dimensions: DEFAULT_CARD_SIZE,
            text: text.into(),
            color: DEFAULT_CARD_COLOR.to_string(),
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::from_rect(self.location, self.dimensions)
    }
}

/// A card together with its position in the z order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedCard {
    pub index: usize,
    pub card: Card,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    pub cards: Vec<Card>,
}

impl Board {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn card_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    #[must_use]
    pub fn index_of(&self, id: CardId) -> Option<usize> {
        self.cards.iter().position(|c| c.id == id)
    }

    #[must_use]
    pub fn ids(&self) -> Vec<CardId> {
        self.cards.iter().map(|c| c.id).collect()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn remove(&mut self, id: CardId) -> Option<Card> {
        self.index_of(id).map(|i| self.cards.remove(i))
    }

    /// Cards with the given ids, each paired with its current index, in z
    /// order. Unknown ids are skipped.
    #[must_use]
    pub fn indexed(&self, ids: &[CardId]) -> Vec<IndexedCard> {
        self.cards
            .iter()
            .enumerate()
            .filter(|(_, c)| ids.contains(&c.id))
            .map(|(index, card)| IndexedCard {
                index,
                card: card.clone(),
            })
            .collect()
    }

    /// Reinsert cards at their recorded indices, lowest index first so each
    /// index refers to the board as it was before the cards were removed.
    pub fn insert_indexed(&mut self, cards: &[IndexedCard]) {
        let mut sorted: Vec<&IndexedCard> = cards.iter().collect();
        sorted.sort_by_key(|c| c.index);
        for item in sorted {
            let index = item.index.min(self.cards.len());
            self.cards.insert(index, item.card.clone());
        }
    }

    /// Move a card to `index` in the z order.
    pub fn move_to_index(&mut self, id: CardId, index: usize) {
        if let Some(from) = self.index_of(id) {
            let card = self.cards.remove(from);
            let index = index.min(self.cards.len());
            self.cards.insert(index, card);
        }
    }

    /// Bounds enclosing the given cards.
    #[must_use]
    pub fn selection_bounds(&self, ids: &[CardId]) -> Bounds {
        Bounds::enclosing(
            self.cards
                .iter()
                .filter(|c| ids.contains(&c.id))
                .map(Card::bounds),
        )
    }
}
