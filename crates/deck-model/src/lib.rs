mod card;
mod deck;
pub mod project;
mod record;
mod types;

pub use card::{Card, CardId, CardImage, CardMetadata};
pub use deck::{BackFace, Deck, DeckEntry};
pub use project::{ProjectError, load_project, save_project};
pub use record::{CardRecord, DeckListEntry};
pub use types::*;
