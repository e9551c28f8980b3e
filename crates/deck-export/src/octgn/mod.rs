//! OCTGN structured-deck export and import
//!
//! A deck becomes a zip meant to be unpacked into an OCTGN `Data/`
//! directory: a card set (`set.xml`) with its images, plus a `.o8d` deck
//! list that reproduces the deck order. Importing the same zip gives back
//! an equivalent deck.

mod archive;
mod o8d;
mod set_xml;

pub use archive::{export_octgn, export_octgn_monitored, import_octgn, read_octgn};
pub use o8d::{DeckList, DeckListCard, DeckSection, kind_for, parse_o8d, section_for, write_o8d};
pub use set_xml::{
    CardSet, SetAlternate, SetCard, kind_for_size, parse_set_xml, size_for, write_set_xml,
};

use uuid::Uuid;

use crate::constants::{MARVEL_CHAMPIONS_GAME_ID, OCTGN_MAX_IMAGE_PX};
use crate::types::{ExportError, ImageFormat, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OctgnOptions {
    /// OCTGN game the set is installed under
    pub game_id: String,
    /// Re-encode every image to this format. `None` keeps each image's own format.
    pub image_format: Option<ImageFormat>,
    /// Resize card images to this width
    pub image_width_px: Option<u32>,
}

impl Default for OctgnOptions {
    fn default() -> Self {
        Self {
            game_id: MARVEL_CHAMPIONS_GAME_ID.to_string(),
            image_format: None,
            image_width_px: None,
        }
    }
}

impl OctgnOptions {
    pub fn validate(&self) -> Result<()> {
        self.game_uuid()?;
        if let Some(width) = self.image_width_px {
            if !(1..=OCTGN_MAX_IMAGE_PX).contains(&width) {
                return Err(ExportError::Config(format!(
                    "OCTGN image width must be within 1..{} pixels",
                    OCTGN_MAX_IMAGE_PX
                )));
            }
        }
        Ok(())
    }

    pub fn game_uuid(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.game_id)
            .map_err(|e| ExportError::Config(format!("invalid game id '{}': {}", self.game_id, e)))
    }

    /// Images are copied unchanged unless a format or width is forced
    pub fn passes_through(&self, source: Option<ImageFormat>) -> bool {
        self.image_width_px.is_none()
            && source.is_some()
            && self.image_format.is_none_or(|f| Some(f) == source)
    }
}
