//! Local OCTGN installation as a card database
//!
//! Card sets live under `Data/GameDatabase/<game>/Sets/<set>/set.xml`, their
//! images under `Data/ImageDatabase/<game>/Sets/<set>/Cards/`.

use deck_export::constants::MARVEL_CHAMPIONS_GAME_ID;
use deck_export::octgn::{CardSet, SetCard, kind_for_size, parse_o8d, parse_set_xml};
use deck_model::{CardId, CardRecord, DeckListEntry, Facing};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::database::LocalCardDatabase;
use crate::types::{DeckListing, ImportError, Result};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone)]
pub struct OctgnDatabase {
    data_dir: PathBuf,
    game_id: String,
}

impl OctgnDatabase {
    /// Database over an OCTGN `Data/` directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            game_id: MARVEL_CHAMPIONS_GAME_ID.to_string(),
        }
    }

    pub fn with_game(mut self, game_id: impl Into<String>) -> Self {
        self.game_id = game_id.into();
        self
    }

    fn sets_dir(&self) -> PathBuf {
        self.data_dir
            .join("GameDatabase")
            .join(&self.game_id)
            .join("Sets")
    }

    fn cards_dir(&self, set_id: &str) -> PathBuf {
        self.data_dir
            .join("ImageDatabase")
            .join(&self.game_id)
            .join("Sets")
            .join(set_id)
            .join("Cards")
    }

    /// Every installed card set
    async fn card_sets(&self) -> Result<Vec<CardSet>> {
        let dir = self.sets_dir();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            ImportError::Database(format!("cannot read {}: {}", dir.display(), e))
        })?;
        let mut sets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path().join("set.xml");
            if !tokio::fs::try_exists(&path).await? {
                continue;
            }
            let xml = tokio::fs::read_to_string(&path).await?;
            match parse_set_xml(&xml) {
                Ok(set) => sets.push(set),
                Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        // Directory order is platform dependent
        sets.sort_by(|a, b| a.id.cmp(&b.id));
        log::debug!("Found {} card set(s) in {}", sets.len(), dir.display());
        Ok(sets)
    }

    async fn read_image(&self, set_id: &str, stem: &str) -> Result<Option<Vec<u8>>> {
        let dir = self.cards_dir(set_id);
        for ext in IMAGE_EXTENSIONS {
            let path = dir.join(format!("{}.{}", stem, ext));
            if tokio::fs::try_exists(&path).await? {
                return Ok(Some(tokio::fs::read(&path).await?));
            }
        }
        Ok(None)
    }
}

/// Record of a set card, without images
fn set_record(set: &CardSet, card: &SetCard) -> CardRecord {
    let mut fields = BTreeMap::new();
    let mut set_name = None;
    for (key, value) in &card.properties {
        if key == "Set" {
            set_name = Some(value.clone());
        } else {
            fields.insert(key.clone(), value.clone());
        }
    }
    CardRecord {
        code: card.id.clone(),
        id: CardId::parse(&card.id),
        name: Some(card.name.clone()),
        set: set_name.or_else(|| Some(set.name.clone())),
        kind: kind_for_size(card.size.as_deref()),
        front_image: None,
        back_image: None,
        back_name: card.alternate.as_ref().map(|alt| alt.name.clone()),
        fields,
    }
}

impl LocalCardDatabase for OctgnDatabase {
    async fn list_cards(&self) -> Result<Vec<CardRecord>> {
        let sets = self.card_sets().await?;
        Ok(sets
            .iter()
            .flat_map(|set| set.cards.iter().map(move |card| set_record(set, card)))
            .collect())
    }

    async fn load_card(&self, code: &str) -> Result<CardRecord> {
        let sets = self.card_sets().await?;
        let (set, card) = sets
            .iter()
            .find_map(|set| {
                set.cards
                    .iter()
                    .find(|c| c.id.eq_ignore_ascii_case(code))
                    .map(|card| (set, card))
            })
            .ok_or_else(|| ImportError::UnknownCard(code.to_string()))?;

        let mut record = set_record(set, card);
        record.front_image = self.read_image(&set.id, &card.id).await?;
        if card.alternate.is_some() {
            record.back_image = self.read_image(&set.id, &format!("{}.b", card.id)).await?;
        }
        Ok(record)
    }

    async fn load_deck_file(&self, path: &Path) -> Result<DeckListing> {
        let xml = tokio::fs::read_to_string(path).await?;
        let list = parse_o8d(&xml)?;
        if !list.game_id.eq_ignore_ascii_case(&self.game_id) {
            return Err(ImportError::Database(format!(
                "deck {} is for game {}, not {}",
                path.display(),
                list.game_id,
                self.game_id
            )));
        }
        let entries = list
            .cards()
            .map(|(_, card)| DeckListEntry {
                code: card.id.clone(),
                quantity: card.qty,
                facing: if card.alternate {
                    Facing::Alternate
                } else {
                    Facing::Front
                },
            })
            .collect();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(DeckListing { name, entries })
    }
}
