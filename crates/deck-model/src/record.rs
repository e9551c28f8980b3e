//! Card shapes produced by external card databases
//!
//! Importers hand these to the model; [`Card::from_record`] is the single
//! place where an external record becomes a validated card.

use std::collections::BTreeMap;

use crate::card::{Card, CardId, CardImage, CardMetadata};
use crate::types::{CardKind, Facing, Result, SizeClass};

/// A card as returned by a card database
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CardRecord {
    /// Database-specific card code
    pub code: String,
    /// Stable identifier when the database provides one
    pub id: Option<CardId>,
    pub name: Option<String>,
    pub set: Option<String>,
    pub kind: CardKind,
    pub front_image: Option<Vec<u8>>,
    pub back_image: Option<Vec<u8>>,
    pub back_name: Option<String>,
    pub fields: BTreeMap<String, String>,
}

/// One line of an external deck list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckListEntry {
    pub code: String,
    pub quantity: usize,
    pub facing: Facing,
}

impl DeckListEntry {
    pub fn new(code: impl Into<String>, quantity: usize) -> Self {
        Self {
            code: code.into(),
            quantity,
            facing: Facing::Front,
        }
    }
}

impl Card {
    /// Build a card from an external record. A record without front artwork is rejected.
    pub fn from_record(record: CardRecord, size: SizeClass) -> Result<Card> {
        let front = CardImage::new(record.front_image.unwrap_or_default());
        let id = record.id.unwrap_or_else(CardId::new_random);
        let card = Card::with_id(id, front, size)?
            .with_back(record.back_image.map(CardImage::new))
            .with_metadata(CardMetadata {
                name: record.name,
                set: record.set,
                kind: record.kind,
                fields: record.fields,
                back_name: record.back_name,
            });
        Ok(card)
    }
}
