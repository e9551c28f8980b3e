//! Persisted deck-project file
//!
//! A zip container holding a `deck.json` manifest and the raw bytes of every
//! image. Images are stored verbatim so a save/open cycle reproduces them
//! byte-for-byte.

use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::card::{Card, CardId, CardImage, CardMetadata};
use crate::deck::{Deck, DeckEntry};
use crate::types::{CardKind, Facing, Sidedness, SizeClass, ValidationError};

const PROJECT_VERSION: u32 = 1;
const MANIFEST_NAME: &str = "deck.json";
const SHARED_BACK_PATH: &str = "images/shared-back";
const KIND_BACK_DIR: &str = "images/kind-back";

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] ZipError),
    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid deck: {0}")]
    Validation(#[from] ValidationError),
    #[error("Unsupported project version {0}")]
    Version(u32),
    #[error("Missing archive entry {0}")]
    MissingEntry(String),
    #[error("Manifest references unknown card {0}")]
    UnknownCard(CardId),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type ProjectResult<T> = std::result::Result<T, ProjectError>;

#[derive(Serialize, Deserialize)]
struct Manifest {
    version: u32,
    name: String,
    set_id: Uuid,
    size_class: SizeClass,
    sidedness: Sidedness,
    #[serde(default)]
    shared_back: Option<ImageEntry>,
    #[serde(default)]
    kind_backs: Vec<KindBackEntry>,
    cards: Vec<CardEntry>,
    entries: Vec<EntryRef>,
}

#[derive(Serialize, Deserialize)]
struct ImageEntry {
    path: String,
    #[serde(default)]
    bleed_mm: f32,
}

#[derive(Serialize, Deserialize)]
struct KindBackEntry {
    kind: CardKind,
    image: ImageEntry,
}

#[derive(Serialize, Deserialize)]
struct CardEntry {
    id: CardId,
    front: ImageEntry,
    #[serde(default)]
    back: Option<ImageEntry>,
    #[serde(default)]
    metadata: CardMetadata,
}

#[derive(Serialize, Deserialize)]
struct EntryRef {
    card: CardId,
    #[serde(default)]
    facing: Facing,
}

/// Encode a deck as a project archive
pub fn to_bytes(deck: &Deck) -> ProjectResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    // Image payloads are already compressed
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut write_image = |path: String, image: &CardImage| -> ProjectResult<ImageEntry> {
        zip.start_file(path.as_str(), stored)?;
        zip.write_all(image.data())?;
        Ok(ImageEntry {
            path,
            bleed_mm: image.bleed_mm(),
        })
    };

    let shared_back = deck
        .shared_back()
        .map(|image| write_image(SHARED_BACK_PATH.to_string(), image))
        .transpose()?;

    let kind_backs = deck
        .kind_backs()
        .map(|(kind, image)| {
            let path = format!("{KIND_BACK_DIR}/{}", kind_slug(kind));
            Ok(KindBackEntry {
                kind,
                image: write_image(path, image)?,
            })
        })
        .collect::<ProjectResult<Vec<_>>>()?;

    let mut cards = Vec::new();
    for card in deck.unique_cards() {
        let front = write_image(format!("images/{}/front", card.id()), card.front())?;
        let back = card
            .back()
            .map(|image| write_image(format!("images/{}/back", card.id()), image))
            .transpose()?;
        cards.push(CardEntry {
            id: card.id(),
            front,
            back,
            metadata: card.metadata().clone(),
        });
    }

    let manifest = Manifest {
        version: PROJECT_VERSION,
        name: deck.name().to_string(),
        set_id: deck.set_id(),
        size_class: deck.size_class(),
        sidedness: deck.sidedness(),
        shared_back,
        kind_backs,
        cards,
        entries: deck
            .entries()
            .iter()
            .map(|e| EntryRef {
                card: e.card.id(),
                facing: e.facing,
            })
            .collect(),
    };

    zip.start_file(MANIFEST_NAME, deflated)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
    let cursor = zip.finish()?;

    log::debug!(
        "Encoded project '{}' with {} card(s)",
        deck.name(),
        deck.len()
    );
    Ok(cursor.into_inner())
}

/// Decode a project archive
pub fn from_bytes(bytes: &[u8]) -> ProjectResult<Deck> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let manifest: Manifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_NAME)?)?;
    if manifest.version != PROJECT_VERSION {
        return Err(ProjectError::Version(manifest.version));
    }

    let mut deck = Deck::new(manifest.size_class);
    deck.rename(manifest.name);
    deck.set_set_id(manifest.set_id);
    if let Some(entry) = &manifest.shared_back {
        deck.set_shared_back(Some(read_image(&mut archive, entry)?))?;
    }
    for entry in &manifest.kind_backs {
        deck.set_kind_back(entry.kind, Some(read_image(&mut archive, &entry.image)?));
    }
    deck.set_sidedness(manifest.sidedness)?;

    let mut cards = std::collections::HashMap::new();
    for entry in &manifest.cards {
        let front = read_image(&mut archive, &entry.front)?;
        let back = entry
            .back
            .as_ref()
            .map(|b| read_image(&mut archive, b))
            .transpose()?;
        let card = Card::with_id(entry.id, front, manifest.size_class)?
            .with_back(back)
            .with_metadata(entry.metadata.clone());
        cards.insert(entry.id, std::sync::Arc::new(card));
    }

    for entry in &manifest.entries {
        let card = cards
            .get(&entry.card)
            .ok_or(ProjectError::UnknownCard(entry.card))?;
        deck.insert_entry(
            deck.len(),
            DeckEntry {
                card: std::sync::Arc::clone(card),
                facing: entry.facing,
            },
        )?;
    }

    Ok(deck)
}

/// True if the archive bytes look like a deck project
pub fn is_project(bytes: &[u8]) -> bool {
    ZipArchive::new(Cursor::new(bytes))
        .map(|archive| archive.index_for_name(MANIFEST_NAME).is_some())
        .unwrap_or(false)
}

/// Save a deck project to disk
pub async fn save_project(deck: &Deck, path: impl AsRef<Path>) -> ProjectResult<()> {
    let deck = deck.clone();
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || to_bytes(&deck)).await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

/// Load a deck project from disk
pub async fn load_project(path: impl AsRef<Path>) -> ProjectResult<Deck> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    tokio::task::spawn_blocking(move || from_bytes(&bytes)).await?
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> ProjectResult<Vec<u8>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(ProjectError::MissingEntry(name.to_string())),
        Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

fn read_image<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    entry: &ImageEntry,
) -> ProjectResult<CardImage> {
    Ok(CardImage::new(read_entry(archive, &entry.path)?).with_bleed(entry.bleed_mm))
}

fn kind_slug(kind: CardKind) -> &'static str {
    match kind {
        CardKind::Player => "player",
        CardKind::Encounter => "encounter",
        CardKind::Villain => "villain",
        CardKind::Unspecified => "unspecified",
    }
}
