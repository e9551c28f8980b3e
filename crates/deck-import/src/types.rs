use deck_export::ExportError;
use deck_model::{DeckListEntry, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("Card database error: {0}")]
    Database(String),
    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Deck file error: {0}")]
    DeckFile(#[from] ExportError),
    #[error("Card {code} ({name}) has no front image")]
    MissingImage { code: String, name: String },
    #[error("Card {0} not found")]
    UnknownCard(String),
    #[error("Invalid card: {0}")]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, ImportError>;

/// A named deck list from a card database
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeckListing {
    pub name: String,
    pub entries: Vec<DeckListEntry>,
}

impl DeckListing {
    pub fn card_count(&self) -> usize {
        self.entries.iter().map(|e| e.quantity).sum()
    }
}
