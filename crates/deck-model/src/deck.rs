//! Ordered deck of cards and its model-mutation operations
//!
//! Every mutation validates first and only then applies, so a rejected
//! operation leaves the deck untouched. Nothing here performs I/O.

use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::card::{Card, CardId, CardImage};
use crate::types::{CardKind, Facing, Result, Sidedness, SizeClass, ValidationError};

/// One position in the deck's print order
#[derive(Debug, Clone, PartialEq)]
pub struct DeckEntry {
    pub card: Arc<Card>,
    pub facing: Facing,
}

/// The back artwork a card prints with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackFace<'a> {
    /// The card's own back image
    Own(&'a CardImage),
    /// The deck's back for the card's kind
    Kind(CardKind, &'a CardImage),
    /// The deck-level shared back
    Shared(&'a CardImage),
    /// No back artwork available
    Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deck {
    name: String,
    set_id: Uuid,
    entries: Vec<DeckEntry>,
    size_class: SizeClass,
    shared_back: Option<CardImage>,
    kind_backs: BTreeMap<CardKind, CardImage>,
    sidedness: Sidedness,
}

impl Default for Deck {
    fn default() -> Self {
        Self::new(SizeClass::default())
    }
}

impl Deck {
    pub fn new(size_class: SizeClass) -> Self {
        Self {
            name: String::from("Untitled deck"),
            set_id: Uuid::new_v4(),
            entries: Vec::new(),
            size_class,
            shared_back: None,
            kind_backs: BTreeMap::new(),
            sidedness: Sidedness::default(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the card set this deck exports as
    pub fn set_id(&self) -> Uuid {
        self.set_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[DeckEntry] {
        &self.entries
    }

    pub fn card(&self, index: usize) -> Option<&Arc<Card>> {
        self.entries.get(index).map(|e| &e.card)
    }

    pub fn size_class(&self) -> SizeClass {
        self.size_class
    }

    pub fn shared_back(&self) -> Option<&CardImage> {
        self.shared_back.as_ref()
    }

    /// Back used by double-sided cards of `kind` that carry no back of their own
    pub fn kind_back(&self, kind: CardKind) -> Option<&CardImage> {
        self.kind_backs.get(&kind)
    }

    pub fn kind_backs(&self) -> impl Iterator<Item = (CardKind, &CardImage)> {
        self.kind_backs.iter().map(|(kind, image)| (*kind, image))
    }

    pub fn sidedness(&self) -> Sidedness {
        self.sidedness
    }

    /// Distinct cards in order of first appearance
    pub fn unique_cards(&self) -> Vec<Arc<Card>> {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.card.id()))
            .map(|e| Arc::clone(&e.card))
            .collect()
    }

    pub fn find(&self, id: CardId) -> Option<&Arc<Card>> {
        self.entries
            .iter()
            .map(|e| &e.card)
            .find(|c| c.id() == id)
    }

    /// Back artwork for a card under the deck's sidedness mode.
    ///
    /// Double-sided decks fall back from the card's own back to the back for
    /// its kind, then to the shared back. Single-back decks only print the
    /// shared back.
    pub fn back_for<'a>(&'a self, card: &'a Card) -> BackFace<'a> {
        let shared = || {
            self.shared_back
                .as_ref()
                .map_or(BackFace::Blank, BackFace::Shared)
        };
        match self.sidedness {
            Sidedness::SingleBackShared => shared(),
            Sidedness::DoubleSided => {
                let kind = card.metadata().kind;
                match (card.back(), self.kind_backs.get(&kind)) {
                    (Some(own), _) => BackFace::Own(own),
                    (None, Some(image)) => BackFace::Kind(kind, image),
                    (None, None) => shared(),
                }
            }
        }
    }

    /// Back artwork for the entry at `index`
    pub fn resolve_back(&self, index: usize) -> Result<BackFace<'_>> {
        let card = self.card(index).ok_or(ValidationError::IndexOutOfBounds {
            index,
            len: self.len(),
        })?;
        Ok(self.back_for(card))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_set_id(&mut self, set_id: Uuid) {
        self.set_id = set_id;
    }

    /// Append a card to the end of the deck
    pub fn add_card(&mut self, card: impl Into<Arc<Card>>) -> Result<()> {
        self.insert_card(self.entries.len(), card)
    }

    /// Insert a card at `index` (0..=len), played front up
    pub fn insert_card(&mut self, index: usize, card: impl Into<Arc<Card>>) -> Result<()> {
        self.insert_entry(
            index,
            DeckEntry {
                card: card.into(),
                facing: Facing::Front,
            },
        )
    }

    /// Insert a fully specified entry at `index` (0..=len)
    pub fn insert_entry(&mut self, index: usize, entry: DeckEntry) -> Result<()> {
        if index > self.entries.len() {
            return Err(ValidationError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        let card = self.admit(entry.card)?;
        check_facing(&card, entry.facing)?;
        self.entries.insert(
            index,
            DeckEntry {
                card,
                facing: entry.facing,
            },
        );
        Ok(())
    }

    pub fn remove_card(&mut self, index: usize) -> Result<DeckEntry> {
        if index >= self.entries.len() {
            return Err(ValidationError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// Move the entry at `from` so that it ends up at position `to`
    pub fn move_card(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.entries.len();
        for index in [from, to] {
            if index >= len {
                return Err(ValidationError::IndexOutOfBounds { index, len });
            }
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }

    pub fn set_facing(&mut self, index: usize, facing: Facing) -> Result<()> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(ValidationError::IndexOutOfBounds { index, len })?;
        check_facing(&entry.card, facing)?;
        entry.facing = facing;
        Ok(())
    }

    pub fn set_shared_back(&mut self, back: Option<CardImage>) -> Result<()> {
        let back = back.filter(|b| !b.is_empty());
        if self.sidedness == Sidedness::SingleBackShared {
            self.check_no_conflicting_backs(back.as_ref())?;
        }
        self.shared_back = back;
        Ok(())
    }

    /// Set or clear the back for one card kind. Empty images clear it.
    pub fn set_kind_back(&mut self, kind: CardKind, back: Option<CardImage>) {
        match back.filter(|b| !b.is_empty()) {
            Some(image) => {
                self.kind_backs.insert(kind, image);
            }
            None => {
                self.kind_backs.remove(&kind);
            }
        }
    }

    pub fn set_sidedness(&mut self, sidedness: Sidedness) -> Result<()> {
        if sidedness == Sidedness::SingleBackShared {
            self.check_no_conflicting_backs(self.shared_back.as_ref())?;
        }
        self.sidedness = sidedness;
        Ok(())
    }

    /// Change the size class. Only allowed while the deck is empty.
    pub fn set_size_class(&mut self, size_class: SizeClass) -> Result<()> {
        if size_class == self.size_class {
            return Ok(());
        }
        size_class.validate()?;
        if !self.entries.is_empty() {
            return Err(ValidationError::SizeClassLocked {
                cards: self.entries.len(),
            });
        }
        self.size_class = size_class;
        Ok(())
    }

    // =========================================================================
    // Validation helpers
    // =========================================================================

    /// Validate a card for insertion, returning the shared handle to store.
    /// A card already in the deck is reused so copies stay reference-equal.
    fn admit(&self, card: Arc<Card>) -> Result<Arc<Card>> {
        if card.size() != self.size_class {
            return Err(ValidationError::SizeClassMismatch {
                expected: self.size_class,
                found: card.size(),
            });
        }
        if card.front().is_empty() {
            return Err(ValidationError::MissingFrontImage);
        }
        if self.sidedness == Sidedness::SingleBackShared
            && conflicts_with(&card, self.shared_back.as_ref())
        {
            return Err(ValidationError::ConflictingBack { id: card.id() });
        }
        match self.find(card.id()) {
            Some(existing) if Arc::ptr_eq(existing, &card) || **existing == *card => {
                Ok(Arc::clone(existing))
            }
            Some(_) => Err(ValidationError::DuplicateId { id: card.id() }),
            None => Ok(card),
        }
    }

    fn check_no_conflicting_backs(&self, shared: Option<&CardImage>) -> Result<()> {
        match self
            .entries
            .iter()
            .find(|e| conflicts_with(&e.card, shared))
        {
            Some(entry) => Err(ValidationError::ConflictingBack {
                id: entry.card.id(),
            }),
            None => Ok(()),
        }
    }
}

fn conflicts_with(card: &Card, shared: Option<&CardImage>) -> bool {
    match (card.back(), shared) {
        (Some(own), Some(shared)) => own.data() != shared.data(),
        (Some(_), None) => true,
        (None, _) => false,
    }
}

fn check_facing(card: &Card, facing: Facing) -> Result<()> {
    if facing == Facing::Alternate && card.back().is_none() {
        return Err(ValidationError::NoAlternateFace { id: card.id() });
    }
    Ok(())
}
