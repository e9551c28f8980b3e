use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::types::{CardKind, Result, SizeClass, ValidationError};

/// Stable card identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub Uuid);

impl CardId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Encoded image bytes plus the bleed already present around the artwork.
///
/// The bytes are kept exactly as supplied; decoding happens at export time.
#[derive(Clone, PartialEq)]
pub struct CardImage {
    data: Arc<[u8]>,
    bleed_mm: f32,
}

impl CardImage {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            data: data.into(),
            bleed_mm: 0.0,
        }
    }

    /// Artwork that extends `bleed_mm` beyond the card edge on every side
    pub fn with_bleed(mut self, bleed_mm: f32) -> Self {
        self.bleed_mm = bleed_mm.max(0.0);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bleed_mm(&self) -> f32 {
        self.bleed_mm
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for CardImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardImage")
            .field("bytes", &self.data.len())
            .field("bleed_mm", &self.bleed_mm)
            .finish()
    }
}

/// Informational card data. Never affects layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CardMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,
    #[serde(default)]
    pub kind: CardKind,
    /// Free-text fields such as rules text, cost or card number
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    /// Name shown on the card's own back face, if it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_name: Option<String>,
}

/// A single card: front artwork, optional own back, size class and metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    id: CardId,
    front: CardImage,
    back: Option<CardImage>,
    size: SizeClass,
    metadata: CardMetadata,
}

impl Card {
    /// Create a card with a fresh identifier. A card without front artwork is rejected.
    pub fn new(front: CardImage, size: SizeClass) -> Result<Self> {
        Self::with_id(CardId::new_random(), front, size)
    }

    pub fn with_id(id: CardId, front: CardImage, size: SizeClass) -> Result<Self> {
        if front.is_empty() {
            return Err(ValidationError::MissingFrontImage);
        }
        size.validate()?;
        Ok(Self {
            id,
            front,
            back: None,
            size,
            metadata: CardMetadata::default(),
        })
    }

    /// Attach an own back image. An empty image clears the back.
    pub fn with_back(mut self, back: Option<CardImage>) -> Self {
        self.back = back.filter(|b| !b.is_empty());
        self
    }

    pub fn with_metadata(mut self, metadata: CardMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn front(&self) -> &CardImage {
        &self.front
    }

    pub fn back(&self) -> Option<&CardImage> {
        self.back.as_ref()
    }

    pub fn size(&self) -> SizeClass {
        self.size
    }

    pub fn metadata(&self) -> &CardMetadata {
        &self.metadata
    }

    /// Display name, falling back to the identifier
    pub fn display_name(&self) -> String {
        self.metadata
            .name
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_requires_front_image() {
        let err = Card::new(CardImage::new(Vec::new()), SizeClass::Standard).unwrap_err();
        assert_eq!(err, ValidationError::MissingFrontImage);
    }

    #[test]
    fn test_empty_back_is_dropped() {
        let card = Card::new(CardImage::new(vec![1u8, 2, 3]), SizeClass::Small)
            .unwrap()
            .with_back(Some(CardImage::new(Vec::new())));
        assert!(card.back().is_none());
    }

    #[test]
    fn test_negative_bleed_clamped() {
        let image = CardImage::new(vec![1u8]).with_bleed(-2.0);
        assert_eq!(image.bleed_mm(), 0.0);
    }

    #[test]
    fn test_invalid_custom_size_rejected() {
        let size = SizeClass::Custom {
            width_mm: 0.0,
            height_mm: 50.0,
        };
        assert!(Card::new(CardImage::new(vec![1u8]), size).is_err());
    }
}
