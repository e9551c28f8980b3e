use deck_model::Deck;

use crate::layout::{CardFace, layout};
use crate::options::SheetSpec;
use crate::types::{LayoutError, LayoutMode};

/// Summary of a print layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutStatistics {
    pub cards: usize,
    pub columns: usize,
    pub rows: usize,
    /// Cards (or fold pairs) per sheet
    pub slots_per_page: usize,
    pub sheets: usize,
    /// Pages in the PDF output (two per sheet when printing two-sided)
    pub output_pages: usize,
    /// Unused slots on the last sheet
    pub empty_slots: usize,
    /// Cards whose front or back artwork lacks the requested bleed
    pub cards_lacking_bleed: usize,
}

/// Calculate statistics for printing a deck
pub fn layout_statistics(deck: &Deck, spec: &SheetSpec) -> Result<LayoutStatistics, LayoutError> {
    let (card_width_mm, card_height_mm) = deck.size_class().dimensions_mm();
    let grid = crate::layout::create_grid_layout(spec, card_width_mm, card_height_mm)?;
    let pages = layout(deck, spec)?;

    let slots_per_page = grid.slots_per_page();
    let sheets = pages.len();
    let output_pages = match spec.mode {
        LayoutMode::TwoSided => sheets * 2,
        LayoutMode::FoldGlue => sheets,
    };

    let mut lacking: Vec<usize> = pages
        .iter()
        .flat_map(|p| p.faces())
        .flat_map(|f| f.placements.iter())
        .filter(|p| !p.bleed_covered)
        .map(|p| p.card_index)
        .collect();
    lacking.sort_unstable();
    lacking.dedup();

    let cards = pages
        .iter()
        .flat_map(|p| p.faces())
        .flat_map(|f| f.placements.iter())
        .filter(|p| p.face == CardFace::Front)
        .count();

    Ok(LayoutStatistics {
        cards,
        columns: grid.cols,
        rows: grid.rows,
        slots_per_page,
        sheets,
        output_pages,
        empty_slots: sheets * slots_per_page - cards,
        cards_lacking_bleed: lacking.len(),
    })
}
