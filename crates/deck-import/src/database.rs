//! Card database collaborators and deck assembly
//!
//! Databases hand back [`CardRecord`]s; the functions here turn a deck
//! list plus records into a validated [`Deck`].

use deck_model::{Card, CardRecord, Deck, DeckEntry, SizeClass};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use crate::types::{DeckListing, ImportError, Result};

/// An online card database
pub trait RemoteCardDatabase {
    /// Card record with its images
    fn fetch_card(&self, code: &str) -> impl Future<Output = Result<CardRecord>> + Send;

    fn fetch_deck_list(&self, deck_id: &str) -> impl Future<Output = Result<DeckListing>> + Send;
}

/// A card database on local disk
pub trait LocalCardDatabase {
    /// Every card the database knows, without images
    fn list_cards(&self) -> impl Future<Output = Result<Vec<CardRecord>>> + Send;

    /// Card record with its images
    fn load_card(&self, code: &str) -> impl Future<Output = Result<CardRecord>> + Send;

    fn load_deck_file(&self, path: &Path) -> impl Future<Output = Result<DeckListing>> + Send;
}

/// Build a deck from a deck list held by a remote database
pub async fn import_remote_deck<D: RemoteCardDatabase>(
    db: &D,
    deck_id: &str,
    size: SizeClass,
) -> Result<Deck> {
    let listing = db.fetch_deck_list(deck_id).await?;
    log::info!(
        "Importing deck '{}' ({} cards) from remote database",
        listing.name,
        listing.card_count()
    );
    let mut records = HashMap::new();
    for entry in &listing.entries {
        if !records.contains_key(&entry.code) {
            records.insert(entry.code.clone(), db.fetch_card(&entry.code).await?);
        }
    }
    build_deck(&listing, records, size)
}

/// Build a deck from a deck file read by a local database
pub async fn import_local_deck<D: LocalCardDatabase>(
    db: &D,
    path: &Path,
    size: SizeClass,
) -> Result<Deck> {
    let listing = db.load_deck_file(path).await?;
    log::info!(
        "Importing deck '{}' ({} cards) from {}",
        listing.name,
        listing.card_count(),
        path.display()
    );
    let mut records = HashMap::new();
    for entry in &listing.entries {
        if !records.contains_key(&entry.code) {
            records.insert(entry.code.clone(), db.load_card(&entry.code).await?);
        }
    }
    build_deck(&listing, records, size)
}

/// Deck in listing order. Copies of one code share a single card.
fn build_deck(
    listing: &DeckListing,
    mut records: HashMap<String, CardRecord>,
    size: SizeClass,
) -> Result<Deck> {
    let mut deck = Deck::new(size);
    deck.rename(listing.name.clone());
    let mut cards: HashMap<&str, Arc<Card>> = HashMap::new();

    for entry in &listing.entries {
        let card = match cards.get(entry.code.as_str()) {
            Some(card) => Arc::clone(card),
            None => {
                let record = records
                    .remove(&entry.code)
                    .ok_or_else(|| ImportError::UnknownCard(entry.code.clone()))?;
                if record.front_image.as_ref().is_none_or(|b| b.is_empty()) {
                    return Err(ImportError::MissingImage {
                        name: record.name.clone().unwrap_or_default(),
                        code: record.code,
                    });
                }
                let card = Arc::new(Card::from_record(record, size)?);
                cards.insert(entry.code.as_str(), Arc::clone(&card));
                card
            }
        };
        for _ in 0..entry.quantity {
            deck.insert_entry(
                deck.len(),
                DeckEntry {
                    card: Arc::clone(&card),
                    facing: entry.facing,
                },
            )?;
        }
    }
    Ok(deck)
}
