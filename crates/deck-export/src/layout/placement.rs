//! Card placement on sheets
//!
//! Partitions the deck into pages and places every card front and back.
//! The result is a pure function of the deck and the sheet spec.

use deck_model::{BackFace, Card, Deck};

use crate::constants::EPSILON_MM;
use crate::options::SheetSpec;
use crate::types::{FoldAxis, LayoutError, LayoutMode, Rotation};

use super::{
    CardFace, CardPlacement, FoldLine, GridLayout, GridPosition, ImageSource, PageLayout, Rect,
    SheetFace, SheetSide, cell_bounds, create_grid_layout, fold_line, front_block_origin,
    mirror_across, trim_bounds,
};

/// Where a two-sided back lands relative to its front
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BackAlignment {
    /// Mirrored across the duplex turn-over edge, so a print lines up after cutting
    Mirrored,
    /// Same cell as the front, for digital sheets
    SameCell,
}

/// Lay out a deck on print sheets.
///
/// Pages hold consecutive runs of the deck in order. The last page may be
/// partially filled. An empty deck yields no pages.
pub fn layout(deck: &Deck, spec: &SheetSpec) -> Result<Vec<PageLayout>, LayoutError> {
    layout_with(deck, spec, BackAlignment::Mirrored)
}

pub(crate) fn layout_with(
    deck: &Deck,
    spec: &SheetSpec,
    alignment: BackAlignment,
) -> Result<Vec<PageLayout>, LayoutError> {
    spec.validate()?;
    let (card_width_mm, card_height_mm) = checked_card_size(deck)?;
    let grid = create_grid_layout(spec, card_width_mm, card_height_mm)?;
    let origin = front_block_origin(spec, &grid);
    let fold = fold_line(spec);

    let slots = grid.slots_per_page();
    let mut pages = Vec::with_capacity(deck.len().div_ceil(slots));
    let mut uncovered = 0;

    for (page_index, first) in (0..deck.len()).step_by(slots).enumerate() {
        let last = (first + slots).min(deck.len());
        let mut page = PageLayout {
            page_index,
            mode: spec.mode,
            front: SheetFace::new(SheetSide::Front),
            back: match spec.mode {
                LayoutMode::TwoSided => Some(SheetFace::new(SheetSide::Back)),
                LayoutMode::FoldGlue => None,
            },
            fold_line: fold,
            grid,
        };

        for (slot, card_index) in (first..last).enumerate() {
            let card = &deck.entries()[card_index].card;
            let pos = grid.position(slot);
            let cell = cell_bounds(&grid, origin, pos);

            let front = front_placement(card, card_index, pos, &grid, cell, spec.bleed_mm);
            let back = match (spec.mode, &fold) {
                (LayoutMode::FoldGlue, Some(fold)) => {
                    fold_back_placement(deck, card, card_index, pos, &grid, cell, fold, spec)
                }
                _ => two_sided_back_placement(
                    deck, card, card_index, pos, &grid, origin, alignment, spec,
                ),
            };

            uncovered += [&front, &back].iter().filter(|p| !p.bleed_covered).count();
            page.front.placements.push(front);
            match page.back.as_mut() {
                Some(back_face) => back_face.placements.push(back),
                None => page.front.placements.push(back),
            }
        }
        pages.push(page);
    }

    if uncovered > 0 {
        log::warn!(
            "{} card image(s) carry less than the requested {} mm bleed",
            uncovered,
            spec.bleed_mm
        );
    }
    log::debug!(
        "Laid out {} card(s) on {} sheet(s), {} per sheet",
        deck.len(),
        pages.len(),
        slots
    );
    Ok(pages)
}

/// Card size of the deck, re-checking that every card agrees with it
fn checked_card_size(deck: &Deck) -> Result<(f32, f32), LayoutError> {
    let expected = deck.size_class();
    expected
        .validate()
        .map_err(|e| LayoutError::InvalidSpec(e.to_string()))?;
    if let Some((index, found)) = deck
        .entries()
        .iter()
        .map(|e| e.card.size())
        .enumerate()
        .find(|(_, size)| *size != expected)
    {
        return Err(LayoutError::SizeClassMismatch {
            index,
            expected,
            found,
        });
    }
    Ok(expected.dimensions_mm())
}

fn front_placement(
    card: &Card,
    card_index: usize,
    pos: GridPosition,
    grid: &GridLayout,
    cell: Rect,
    bleed_mm: f32,
) -> CardPlacement {
    CardPlacement {
        card_index,
        face: CardFace::Front,
        source: Some(ImageSource::CardFront),
        grid_pos: pos,
        trim_rect: trim_bounds(grid, &cell),
        bleed_rect: cell,
        rotation: Rotation::None,
        bleed_covered: covers(card.front().bleed_mm(), bleed_mm),
    }
}

#[allow(clippy::too_many_arguments)]
fn two_sided_back_placement(
    deck: &Deck,
    card: &Card,
    card_index: usize,
    pos: GridPosition,
    grid: &GridLayout,
    origin: (f32, f32),
    alignment: BackAlignment,
    spec: &SheetSpec,
) -> CardPlacement {
    let back_pos = match alignment {
        BackAlignment::Mirrored
            if spec
                .duplex_flip
                .mirrors_columns(spec.page_width_mm, spec.page_height_mm) =>
        {
            GridPosition::new(pos.row, grid.cols - 1 - pos.col)
        }
        BackAlignment::Mirrored => GridPosition::new(grid.rows - 1 - pos.row, pos.col),
        BackAlignment::SameCell => pos,
    };
    let cell = cell_bounds(grid, origin, back_pos)
        .translate(spec.back_offset_x_mm, spec.back_offset_y_mm);
    let (source, bleed_covered) = back_source(deck, card, spec.bleed_mm);
    CardPlacement {
        card_index,
        face: CardFace::Back,
        source,
        grid_pos: back_pos,
        trim_rect: trim_bounds(grid, &cell),
        bleed_rect: cell,
        rotation: Rotation::None,
        bleed_covered,
    }
}

#[allow(clippy::too_many_arguments)]
fn fold_back_placement(
    deck: &Deck,
    card: &Card,
    card_index: usize,
    pos: GridPosition,
    grid: &GridLayout,
    front_cell: Rect,
    fold: &FoldLine,
    spec: &SheetSpec,
) -> CardPlacement {
    let cell = mirror_across(fold, &front_cell);
    let back_pos = match fold.axis {
        FoldAxis::Vertical => GridPosition::new(pos.row, grid.cols - 1 - pos.col),
        FoldAxis::Horizontal => GridPosition::new(grid.rows - 1 - pos.row, pos.col),
    };
    let (source, bleed_covered) = back_source(deck, card, spec.bleed_mm);
    CardPlacement {
        card_index,
        face: CardFace::Back,
        source,
        grid_pos: back_pos,
        trim_rect: trim_bounds(grid, &cell),
        bleed_rect: cell,
        rotation: Rotation::Half,
        bleed_covered,
    }
}

/// Back artwork for a card and whether it covers the sheet bleed
fn back_source(deck: &Deck, card: &Card, bleed_mm: f32) -> (Option<ImageSource>, bool) {
    match deck.back_for(card) {
        BackFace::Own(image) => (
            Some(ImageSource::CardBack),
            covers(image.bleed_mm(), bleed_mm),
        ),
        BackFace::Kind(kind, image) => (
            Some(ImageSource::KindBack(kind)),
            covers(image.bleed_mm(), bleed_mm),
        ),
        BackFace::Shared(image) => (
            Some(ImageSource::SharedBack),
            covers(image.bleed_mm(), bleed_mm),
        ),
        BackFace::Blank => (None, true),
    }
}

fn covers(image_bleed_mm: f32, sheet_bleed_mm: f32) -> bool {
    image_bleed_mm + EPSILON_MM >= sheet_bleed_mm
}
