//! Zip container holding a card set, its images and a deck list

use deck_model::{
    Card, CardId, CardImage, CardKind, CardMetadata, Deck, DeckEntry, Facing, Sidedness, SizeClass,
};
use image::RgbaImage;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::OctgnOptions;
use super::o8d::{DeckList, DeckListCard, DeckSection, kind_for, parse_o8d, section_for, write_o8d};
use super::set_xml::{
    CardSet, SetAlternate, SetCard, kind_for_size, parse_set_xml, size_for, write_set_xml,
};
use crate::job::JobMonitor;
use crate::render::{ImageCodec, resize_to_width};
use crate::types::{ExportError, ImageFormat, Result};

/// Property carrying the card's set name
const SET_PROPERTY: &str = "Set";
const SHARED_BACK_STEM: &str = "SharedBack";
const ALTERNATE_SUFFIX: &str = ".b";

const NOTE_SIZE_CLASS: &str = "size_class";
const NOTE_SIDEDNESS: &str = "sidedness";
const NOTE_BLEED_PREFIX: &str = "bleed.";
/// Marks a card whose `Set` property is a free-text field, not its set name
const NOTE_SET_FIELD_PREFIX: &str = "set_field.";

/// Image stem of the deck's back for one card kind
fn kind_back_stem(kind: CardKind) -> &'static str {
    match kind {
        CardKind::Player => "PlayerBack",
        CardKind::Encounter => "EncounterBack",
        CardKind::Villain => "VillainBack",
        CardKind::Unspecified => "SpecialBack",
    }
}

/// Deck-level images live beside the set rather than under `Cards/`
fn is_deck_image(stem: &str) -> bool {
    stem == SHARED_BACK_STEM || CardKind::ALL.iter().any(|k| kind_back_stem(*k) == stem)
}

/// Archive paths for one card set
struct SetPaths {
    game: String,
    set: String,
}

impl SetPaths {
    fn set_xml(&self) -> String {
        format!("GameDatabase/{}/Sets/{}/set.xml", self.game, self.set)
    }

    fn image(&self, stem: &str, format: ImageFormat) -> String {
        if is_deck_image(stem) {
            format!(
                "ImageDatabase/{}/Sets/{}/{}.{}",
                self.game,
                self.set,
                stem,
                format.extension()
            )
        } else {
            format!(
                "ImageDatabase/{}/Sets/{}/Cards/{}.{}",
                self.game,
                self.set,
                stem,
                format.extension()
            )
        }
    }

    fn deck(&self, deck_name: &str) -> String {
        format!("GameDatabase/{}/FanMade/{}.o8d", self.game, file_name(deck_name))
    }
}

// =============================================================================
// Export
// =============================================================================

/// Export the deck as an OCTGN card set and deck list zip
pub fn export_octgn<C: ImageCodec + ?Sized>(
    deck: &Deck,
    options: &OctgnOptions,
    codec: &C,
) -> Result<Vec<u8>> {
    export_octgn_monitored(deck, options, codec, &JobMonitor::default())
}

pub fn export_octgn_monitored<C: ImageCodec + ?Sized>(
    deck: &Deck,
    options: &OctgnOptions,
    codec: &C,
    monitor: &JobMonitor,
) -> Result<Vec<u8>> {
    if deck.is_empty() {
        return Err(ExportError::EmptyDeck);
    }
    options.validate()?;
    let game = options.game_uuid()?;
    if deck.set_id() == game {
        return Err(ExportError::Config(
            "set id must differ from the game id".to_string(),
        ));
    }

    let paths = SetPaths {
        game: game.to_string(),
        set: deck.set_id().to_string(),
    };
    let cards = deck.unique_cards();
    let card_set = build_card_set(deck, &game, &cards)?;
    let mut deck_list = build_deck_list(deck, &game);
    check_integrity(&card_set, &deck_list)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut notes = vec![
        format!("{}={}", NOTE_SIZE_CLASS, deck.size_class()),
        format!("{}={}", NOTE_SIDEDNESS, deck.sidedness().name()),
    ];
    notes.extend(
        cards
            .iter()
            .filter(|card| holds_set_field(card))
            .map(|card| format!("{}{}=field", NOTE_SET_FIELD_PREFIX, card.id())),
    );
    let card_size = deck.size_class().dimensions_mm();
    let mut write_image = |stem: String, image: &CardImage| -> Result<()> {
        let (bytes, format, bleed_mm) = prepare_image(image, card_size, options, codec)
            .map_err(|e| match e {
                ExportError::Collaborator { context, source } => ExportError::Collaborator {
                    context: format!("{} image {}", context, stem),
                    source,
                },
                other => other,
            })?;
        if bleed_mm > 0.0 {
            notes.push(format!("{}{}={}", NOTE_BLEED_PREFIX, stem, bleed_mm));
        }
        zip.start_file(paths.image(&stem, format), stored)?;
        zip.write_all(&bytes)?;
        Ok(())
    };

    if let Some(shared) = deck.shared_back() {
        write_image(SHARED_BACK_STEM.to_string(), shared)?;
    }
    for (kind, back) in deck.kind_backs() {
        write_image(kind_back_stem(kind).to_string(), back)?;
    }
    for (step, card) in cards.iter().enumerate() {
        monitor.checkpoint("Exporting cards", step, cards.len())?;
        write_image(card.id().to_string(), card.front())?;
        if let Some(back) = card.back() {
            write_image(format!("{}{}", card.id(), ALTERNATE_SUFFIX), back)?;
        }
    }
    monitor.checkpoint("Exporting cards", cards.len(), cards.len())?;

    deck_list.notes = Some(notes.join("\n"));
    zip.start_file(paths.set_xml(), deflated)?;
    zip.write_all(write_set_xml(&card_set).as_bytes())?;
    zip.start_file(paths.deck(deck.name()), deflated)?;
    zip.write_all(write_o8d(&deck_list).as_bytes())?;
    let cursor = zip.finish()?;

    log::info!(
        "OCTGN export of '{}': {} card(s) in set, {} deck line(s)",
        deck.name(),
        card_set.cards.len(),
        deck_list.cards().count()
    );
    Ok(cursor.into_inner())
}

fn build_card_set(deck: &Deck, game: &Uuid, cards: &[Arc<Card>]) -> Result<CardSet> {
    let cards = cards
        .iter()
        .map(|card| {
            let meta = card.metadata();
            let name = card.display_name();
            if meta.set.is_some() && meta.fields.contains_key(SET_PROPERTY) {
                return Err(ExportError::Format(format!(
                    "card {} ({}) has both a set name and a '{}' field",
                    card.id(),
                    name,
                    SET_PROPERTY
                )));
            }
            let mut properties = Vec::new();
            if let Some(set) = &meta.set {
                properties.push((SET_PROPERTY.to_string(), set.clone()));
            }
            properties.extend(
                meta.fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
            Ok(SetCard {
                id: card.id().to_string(),
                size: size_for(meta.kind).map(str::to_string),
                properties,
                alternate: card.back().map(|_| SetAlternate {
                    name: meta.back_name.clone().unwrap_or_else(|| name.clone()),
                    properties: Vec::new(),
                }),
                name,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(CardSet {
        name: deck.name().to_string(),
        id: deck.set_id().to_string(),
        game_id: game.to_string(),
        cards,
    })
}

/// Card whose `Set` property comes from its free-text fields
fn holds_set_field(card: &Card) -> bool {
    let meta = card.metadata();
    meta.set.is_none() && meta.fields.contains_key(SET_PROPERTY)
}

/// Deck list in deck order. Runs of the same card, facing and section collapse into one line.
fn build_deck_list(deck: &Deck, game: &Uuid) -> DeckList {
    let mut sections: Vec<DeckSection> = Vec::new();
    for entry in deck.entries() {
        let (name, shared) = section_for(entry.card.metadata().kind);
        let alternate = entry.facing == Facing::Alternate;
        let id = entry.card.id().to_string();

        let same_section = sections
            .last()
            .is_some_and(|s| s.name == name && s.shared == shared);
        if !same_section {
            sections.push(DeckSection {
                name: name.to_string(),
                shared,
                cards: Vec::new(),
            });
        }
        let Some(section) = sections.last_mut() else {
            continue;
        };
        match section.cards.last_mut() {
            Some(last) if last.id == id && last.alternate == alternate => last.qty += 1,
            _ => section.cards.push(DeckListCard {
                id,
                qty: 1,
                alternate,
                name: entry.card.display_name(),
            }),
        }
    }
    DeckList {
        game_id: game.to_string(),
        sections,
        notes: None,
    }
}

/// Every deck line must name a card in the set, and alternate lines a card with an alternate
fn check_integrity(set: &CardSet, deck: &DeckList) -> Result<()> {
    let mut cards = HashMap::new();
    for card in &set.cards {
        if cards.insert(card.id.as_str(), card).is_some() {
            return Err(ExportError::Format(format!("duplicate card id {}", card.id)));
        }
    }
    for (_, line) in deck.cards() {
        let card = cards.get(line.id.as_str()).ok_or_else(|| {
            ExportError::Format(format!("deck list references unknown card {}", line.id))
        })?;
        if line.alternate && card.alternate.is_none() {
            return Err(ExportError::Format(format!(
                "deck list plays card {} ({}) on an alternate face it does not have",
                card.id, card.name
            )));
        }
    }
    Ok(())
}

/// Encoded bytes, their format and the bleed they still carry
fn prepare_image<C: ImageCodec + ?Sized>(
    image: &CardImage,
    card_size: (f32, f32),
    options: &OctgnOptions,
    codec: &C,
) -> Result<(Vec<u8>, ImageFormat, f32)> {
    let source = ImageFormat::sniff(image.data());
    if options.passes_through(source) {
        if let Some(format) = source {
            return Ok((image.data().to_vec(), format, image.bleed_mm()));
        }
    }

    let format = options.image_format.or(source).unwrap_or_default();
    let decoded = codec
        .decode(image.data())
        .map_err(|e| ExportError::collaborator("decoding", e))?;
    let mut trimmed = crop_bleed(&decoded, card_size, image.bleed_mm());
    if let Some(width) = options.image_width_px {
        trimmed = resize_to_width(&trimmed, width);
    }
    let bytes = codec
        .encode(&trimmed, format)
        .map_err(|e| ExportError::collaborator("encoding", e))?;
    Ok((bytes, format, 0.0))
}

/// Cut away the artwork's own bleed, leaving the card at trim size
fn crop_bleed(image: &RgbaImage, (width_mm, height_mm): (f32, f32), bleed_mm: f32) -> RgbaImage {
    if bleed_mm <= 0.0 {
        return image.clone();
    }
    let inset_x = (bleed_mm * image.width() as f32 / (width_mm + 2.0 * bleed_mm)).round() as u32;
    let inset_y = (bleed_mm * image.height() as f32 / (height_mm + 2.0 * bleed_mm)).round() as u32;
    let width = image.width().saturating_sub(2 * inset_x).max(1);
    let height = image.height().saturating_sub(2 * inset_y).max(1);
    image::imageops::crop_imm(image, inset_x, inset_y, width, height).to_image()
}

/// Deck name made safe for use as a file name
fn file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "deck".to_string()
    } else {
        cleaned.to_string()
    }
}

// =============================================================================
// Import
// =============================================================================

/// Rebuild a deck from an exported OCTGN zip
pub fn import_octgn(bytes: &[u8]) -> Result<Deck> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let names: Vec<String> = archive.file_names().map(str::to_string).collect();

    let set_path = names
        .iter()
        .find(|n| n.starts_with("GameDatabase/") && n.ends_with("/set.xml"))
        .ok_or_else(|| ExportError::Format("archive has no set.xml".to_string()))?;
    let set = parse_set_xml(&read_text(&mut archive, set_path)?)?;
    let deck_list = names
        .iter()
        .find(|n| n.starts_with("GameDatabase/") && n.ends_with(".o8d"))
        .map(|path| read_text(&mut archive, path).and_then(|xml| parse_o8d(&xml)))
        .transpose()?;

    let notes = parse_notes(deck_list.as_ref().and_then(|d| d.notes.as_deref()));
    let size_class = match notes.get(NOTE_SIZE_CLASS) {
        Some(value) => value.parse::<SizeClass>().map_err(ExportError::Format)?,
        None => SizeClass::default(),
    };
    let sidedness = notes
        .get(NOTE_SIDEDNESS)
        .and_then(|value| Sidedness::from_name(value))
        .unwrap_or_default();

    // Image entries by file stem
    let image_root = format!("ImageDatabase/{}/Sets/{}/", set.game_id, set.id);
    let images: HashMap<String, String> = names
        .iter()
        .filter(|n| n.starts_with(&image_root))
        .filter_map(|n| {
            let file = n.rsplit('/').next()?;
            let (stem, ext) = file.rsplit_once('.')?;
            ImageFormat::from_extension(ext)?;
            Some((stem.to_ascii_lowercase(), n.clone()))
        })
        .collect();
    let mut read_image = |stem: &str| -> Result<Option<CardImage>> {
        let Some(path) = images.get(&stem.to_ascii_lowercase()) else {
            return Ok(None);
        };
        let bleed = notes
            .get(&format!("{}{}", NOTE_BLEED_PREFIX, stem))
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(0.0);
        Ok(Some(
            CardImage::new(read_entry(&mut archive, path)?).with_bleed(bleed),
        ))
    };

    let mut deck = Deck::new(size_class);
    deck.rename(set.name.clone());
    if let Ok(set_id) = Uuid::parse_str(&set.id) {
        deck.set_set_id(set_id);
    }
    deck.set_shared_back(read_image(SHARED_BACK_STEM)?)?;
    for kind in CardKind::ALL {
        deck.set_kind_back(kind, read_image(kind_back_stem(kind))?);
    }
    deck.set_sidedness(sidedness)?;

    // Kinds come from the deck list section, falling back to the card size
    let mut kinds = HashMap::new();
    if let Some(list) = &deck_list {
        for (section, line) in list.cards() {
            kinds
                .entry(line.id.clone())
                .or_insert_with(|| kind_for(&section.name, section.shared));
        }
    }

    let mut cards: HashMap<String, Arc<Card>> = HashMap::new();
    for set_card in &set.cards {
        let id = CardId::parse(&set_card.id)
            .ok_or_else(|| ExportError::Format(format!("invalid card id '{}'", set_card.id)))?;
        let front = read_image(&set_card.id)?.ok_or_else(|| {
            ExportError::Format(format!(
                "card {} ({}) has no front image",
                set_card.id, set_card.name
            ))
        })?;
        let back = match &set_card.alternate {
            Some(_) => read_image(&format!("{}{}", set_card.id, ALTERNATE_SUFFIX))?,
            None => None,
        };
        let kind = kinds
            .get(&set_card.id)
            .copied()
            .unwrap_or_else(|| kind_for_size(set_card.size.as_deref()));
        let set_field = notes.contains_key(&format!("{}{}", NOTE_SET_FIELD_PREFIX, set_card.id));
        let card = Card::with_id(id, front, size_class)?
            .with_back(back)
            .with_metadata(card_metadata(set_card, kind, set_field));
        cards.insert(set_card.id.clone(), Arc::new(card));
    }

    match &deck_list {
        Some(list) => {
            for (_, line) in list.cards() {
                let card = cards.get(&line.id).ok_or_else(|| {
                    ExportError::Format(format!("deck list references unknown card {}", line.id))
                })?;
                let facing = if line.alternate {
                    Facing::Alternate
                } else {
                    Facing::Front
                };
                for _ in 0..line.qty {
                    deck.insert_entry(
                        deck.len(),
                        DeckEntry {
                            card: Arc::clone(card),
                            facing,
                        },
                    )?;
                }
            }
        }
        // A bare card set holds one copy of each card
        None => {
            for set_card in &set.cards {
                if let Some(card) = cards.get(&set_card.id) {
                    deck.add_card(Arc::clone(card))?;
                }
            }
        }
    }

    log::debug!(
        "Imported OCTGN set '{}' with {} card(s), deck of {}",
        set.name,
        set.cards.len(),
        deck.len()
    );
    Ok(deck)
}

/// Read and import an OCTGN zip from disk
pub async fn read_octgn(path: impl AsRef<Path>) -> Result<Deck> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    tokio::task::spawn_blocking(move || import_octgn(&bytes)).await?
}

/// Metadata of a set card. Names equal to their fallback are treated as unset.
/// With `set_field` the `Set` property stays among the fields.
fn card_metadata(card: &SetCard, kind: CardKind, set_field: bool) -> CardMetadata {
    let mut set = None;
    let mut fields = BTreeMap::new();
    for (key, value) in &card.properties {
        if key == SET_PROPERTY && !set_field {
            set = Some(value.clone());
        } else {
            fields.insert(key.clone(), value.clone());
        }
    }
    let name = (card.name != card.id).then(|| card.name.clone());
    let back_name = card
        .alternate
        .as_ref()
        .filter(|alt| alt.name != card.name)
        .map(|alt| alt.name.clone());
    CardMetadata {
        name,
        set,
        kind,
        fields,
        back_name,
    }
}

fn parse_notes(notes: Option<&str>) -> HashMap<String, String> {
    notes
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(ExportError::Format(format!("missing archive entry {}", name)));
        }
        Err(e) => return Err(e.into()),
    };
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

fn read_text<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    String::from_utf8(read_entry(archive, name)?)
        .map_err(|e| ExportError::Xml(format!("{} is not UTF-8: {}", name, e)))
}
