//! Tabletop Simulator deck sheets
//!
//! The whole deck goes onto one front sheet and one back sheet, laid out by
//! the layout engine on a single page exactly the size of the card grid.
//! Backs share their front's cell, as Tabletop Simulator expects.

use deck_model::Deck;
use std::path::Path;

use crate::constants::{
    TABLETOP_DEFAULT_CARD_PX, TABLETOP_MAX_CARD_PX, TABLETOP_MAX_CARDS, TABLETOP_MAX_COLUMNS,
    TABLETOP_MAX_SHEET_PX, TABLETOP_MIN_CARD_PX,
};
use crate::job::JobMonitor;
use crate::layout::{BackAlignment, layout_with};
use crate::options::SheetSpec;
use crate::render::{ImageCodec, PageComposer, PixelScale};
use crate::types::{ExportError, ImageFormat, LayoutMode, PrinterMarks, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TabletopOptions {
    /// Width of one card on the sheet
    pub card_width_px: u32,
    pub format: ImageFormat,
}

impl Default for TabletopOptions {
    fn default() -> Self {
        Self {
            card_width_px: TABLETOP_DEFAULT_CARD_PX,
            format: ImageFormat::Png,
        }
    }
}

impl TabletopOptions {
    pub fn validate(&self) -> Result<()> {
        if !(TABLETOP_MIN_CARD_PX..=TABLETOP_MAX_CARD_PX).contains(&self.card_width_px) {
            return Err(ExportError::Config(format!(
                "Card width must be within {}..{} pixels",
                TABLETOP_MIN_CARD_PX, TABLETOP_MAX_CARD_PX
            )));
        }
        Ok(())
    }
}

/// Encoded front and back sheets plus the numbers needed to import them
#[derive(Debug, Clone, PartialEq)]
pub struct TabletopSheets {
    pub front: Vec<u8>,
    pub back: Vec<u8>,
    pub format: ImageFormat,
    pub columns: u32,
    pub rows: u32,
    pub card_count: usize,
    pub card_width_px: u32,
    pub card_height_px: u32,
}

impl TabletopSheets {
    /// Write both sheets. The two paths must differ.
    pub async fn save(&self, front: impl AsRef<Path>, back: impl AsRef<Path>) -> Result<()> {
        let (front, back) = (front.as_ref(), back.as_ref());
        if front == back {
            return Err(ExportError::Config(
                "Front and back images cannot have the same path".to_string(),
            ));
        }
        tokio::fs::write(front, &self.front).await?;
        tokio::fs::write(back, &self.back).await?;
        Ok(())
    }
}

/// Sheet grid (columns, rows) for `card_count` cards of `card_width_px`.
///
/// Columns are limited by the largest sheet width and by the column cap. A
/// deck that fits in one row gets exactly as many columns as cards. The
/// resulting sheet height is checked by the export.
pub fn tabletop_grid(card_count: usize, card_width_px: u32) -> (u32, u32) {
    let max_cols = (TABLETOP_MAX_SHEET_PX / card_width_px.max(1)).clamp(1, TABLETOP_MAX_COLUMNS);
    let rows = (card_count as u32).div_ceil(max_cols).max(1);
    let cols = if rows == 1 {
        card_count as u32
    } else {
        max_cols
    };
    (cols, rows)
}

/// Export the deck as a Tabletop Simulator front/back sheet pair
pub fn export_tabletop<C: ImageCodec + ?Sized>(
    deck: &Deck,
    options: &TabletopOptions,
    codec: &C,
) -> Result<TabletopSheets> {
    export_tabletop_monitored(deck, options, codec, &JobMonitor::default())
}

pub fn export_tabletop_monitored<C: ImageCodec + ?Sized>(
    deck: &Deck,
    options: &TabletopOptions,
    codec: &C,
    monitor: &JobMonitor,
) -> Result<TabletopSheets> {
    if deck.is_empty() {
        return Err(ExportError::EmptyDeck);
    }
    if deck.len() > TABLETOP_MAX_CARDS {
        return Err(ExportError::TooManyCards {
            count: deck.len(),
            max: TABLETOP_MAX_CARDS,
        });
    }
    options.validate()?;

    let (card_width_mm, card_height_mm) = deck.size_class().dimensions_mm();
    let (cols, rows) = tabletop_grid(deck.len(), options.card_width_px);
    let card_width_px = options.card_width_px;
    let card_height_px =
        ((card_width_px as f32 * card_height_mm / card_width_mm) as u32).max(1);
    let sheet_height_px = rows.saturating_mul(card_height_px);
    if sheet_height_px > TABLETOP_MAX_SHEET_PX {
        return Err(ExportError::Config(format!(
            "Tabletop sheet of {} row(s) would be {} px tall, over the {} px limit; \
             use a smaller card width",
            rows, sheet_height_px, TABLETOP_MAX_SHEET_PX
        )));
    }

    // One page exactly the size of the card grid
    let spec = SheetSpec {
        page_width_mm: cols as f32 * card_width_mm,
        page_height_mm: rows as f32 * card_height_mm,
        margin_mm: 0.0,
        spacing_mm: 0.0,
        bleed_mm: 0.0,
        fold_gap_mm: 0.0,
        back_offset_x_mm: 0.0,
        back_offset_y_mm: 0.0,
        mode: LayoutMode::TwoSided,
        marks: PrinterMarks::default(),
        ..SheetSpec::default()
    };
    let pages = layout_with(deck, &spec, BackAlignment::SameCell)?;
    let [page] = pages.as_slice() else {
        return Err(ExportError::Format(format!(
            "tabletop layout produced {} pages",
            pages.len()
        )));
    };

    let scale = PixelScale {
        x: card_width_px as f32 / card_width_mm,
        y: card_height_px as f32 / card_height_mm,
    };
    let size_px = (cols * card_width_px, rows * card_height_px);
    let mut composer = PageComposer::new(deck, codec);
    let mut encoded = Vec::with_capacity(2);
    let faces: Vec<_> = page.faces().collect();
    for (step, face) in faces.iter().enumerate() {
        monitor.checkpoint("Composing sheets", step, faces.len())?;
        let composed = composer.compose_face_scaled(page, face, &spec, scale, size_px)?;
        let bytes = codec
            .encode(&composed.image, options.format)
            .map_err(|e| ExportError::collaborator(format!("encoding {:?} sheet", face.side), e))?;
        encoded.push(bytes);
    }
    monitor.checkpoint("Composing sheets", faces.len(), faces.len())?;

    let back = encoded.pop().unwrap_or_default();
    let front = encoded.pop().unwrap_or_default();
    log::info!(
        "Tabletop sheets: {} cards in {}x{} grid, {}x{} px per card",
        deck.len(),
        cols,
        rows,
        card_width_px,
        card_height_px
    );
    Ok(TabletopSheets {
        front,
        back,
        format: options.format,
        columns: cols,
        rows,
        card_count: deck.len(),
        card_width_px,
        card_height_px,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_single_row_collapses() {
        assert_eq!(tabletop_grid(3, 512), (3, 1));
        assert_eq!(tabletop_grid(8, 512), (8, 1));
    }

    #[test]
    fn test_grid_wraps_at_sheet_width() {
        // 4096 / 512 = 8 columns
        assert_eq!(tabletop_grid(9, 512), (8, 2));
        assert_eq!(tabletop_grid(16, 512), (8, 2));
        assert_eq!(tabletop_grid(17, 512), (8, 3));
    }

    #[test]
    fn test_grid_column_cap() {
        assert_eq!(tabletop_grid(70, 100), (10, 7));
        assert_eq!(tabletop_grid(11, 32), (10, 2));
    }

    #[test]
    fn test_options_range() {
        let mut options = TabletopOptions::default();
        assert!(options.validate().is_ok());
        options.card_width_px = 31;
        assert!(options.validate().is_err());
        options.card_width_px = 4097;
        assert!(options.validate().is_err());
    }
}
