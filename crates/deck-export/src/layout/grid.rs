//! Grid layout calculation
//!
//! This module handles the geometric layout of the card grid on a sheet:
//! how many cells fit, where the block of cells sits, and where the fold
//! line of a fold-and-glue sheet runs.

use crate::constants::EPSILON_MM;
use crate::options::SheetSpec;
use crate::types::{FoldAxis, LayoutError, LayoutMode};

use super::{FoldLine, GridLayout, GridPosition, Rect};

// =============================================================================
// Grid Creation
// =============================================================================

/// Number of cells that fit along one axis.
///
/// `n` cells need `n * cell + (n - 1) * spacing`, so the count is
/// `floor((available + spacing) / (cell + spacing))`.
pub fn fit_count(available_mm: f32, cell_mm: f32, spacing_mm: f32) -> usize {
    if cell_mm <= 0.0 || available_mm + EPSILON_MM < cell_mm {
        return 0;
    }
    ((available_mm + spacing_mm + EPSILON_MM) / (cell_mm + spacing_mm)).floor() as usize
}

/// Create the card grid for a sheet.
///
/// # Arguments
/// * `spec` - Sheet configuration (page size, margins, mode)
/// * `card_width_mm` - Trimmed card width
/// * `card_height_mm` - Trimmed card height
///
/// # Returns
/// The grid of one block. In fold-and-glue mode a block fills one half of
/// the usable area, and each cell holds one fold pair.
pub fn create_grid_layout(
    spec: &SheetSpec,
    card_width_mm: f32,
    card_height_mm: f32,
) -> Result<GridLayout, LayoutError> {
    let mut grid = GridLayout {
        cols: 0,
        rows: 0,
        card_width_mm,
        card_height_mm,
        bleed_mm: spec.bleed_mm,
        spacing_mm: spec.spacing_mm,
    };

    let (available_w, available_h) = block_area(spec);
    grid.cols = fit_count(available_w, grid.cell_width_mm(), spec.spacing_mm);
    grid.rows = fit_count(available_h, grid.cell_height_mm(), spec.spacing_mm);

    if grid.slots_per_page() == 0 {
        return Err(LayoutError::SheetTooSmall {
            usable_width_mm: available_w.max(0.0),
            usable_height_mm: available_h.max(0.0),
            cell_width_mm: grid.cell_width_mm(),
            cell_height_mm: grid.cell_height_mm(),
        });
    }

    log::debug!(
        "Grid {}x{} of {:.1}x{:.1} mm cells ({:?})",
        grid.cols,
        grid.rows,
        grid.cell_width_mm(),
        grid.cell_height_mm(),
        spec.mode
    );
    Ok(grid)
}

/// Area available to one block of cells
fn block_area(spec: &SheetSpec) -> (f32, f32) {
    let usable_w = spec.usable_width_mm();
    let usable_h = spec.usable_height_mm();
    match (spec.mode, spec.fold_axis) {
        (LayoutMode::TwoSided, _) => (usable_w, usable_h),
        (LayoutMode::FoldGlue, FoldAxis::Vertical) => {
            (usable_w / 2.0 - spec.fold_gap_mm, usable_h)
        }
        (LayoutMode::FoldGlue, FoldAxis::Horizontal) => {
            (usable_w, usable_h / 2.0 - spec.fold_gap_mm)
        }
    }
}

// =============================================================================
// Block Placement
// =============================================================================

/// Top-left corner of the block holding card fronts.
///
/// Two-sided blocks are centred on the page so the mirrored column of a
/// cell is also its physical mirror image. Fold-and-glue front blocks hug
/// the fold line, keeping `fold_gap_mm` clear of it.
pub fn front_block_origin(spec: &SheetSpec, grid: &GridLayout) -> (f32, f32) {
    let centred_x = (spec.page_width_mm - grid.block_width_mm()) / 2.0;
    let centred_y = (spec.page_height_mm - grid.block_height_mm()) / 2.0;
    match (spec.mode, fold_line(spec)) {
        (LayoutMode::FoldGlue, Some(fold)) => match fold.axis {
            FoldAxis::Vertical => (
                fold.position_mm - spec.fold_gap_mm - grid.block_width_mm(),
                centred_y,
            ),
            FoldAxis::Horizontal => (
                centred_x,
                fold.position_mm - spec.fold_gap_mm - grid.block_height_mm(),
            ),
        },
        _ => (centred_x, centred_y),
    }
}

/// Fold line of a fold-and-glue sheet, through the page centre
pub fn fold_line(spec: &SheetSpec) -> Option<FoldLine> {
    if spec.mode != LayoutMode::FoldGlue {
        return None;
    }
    let position_mm = match spec.fold_axis {
        FoldAxis::Vertical => spec.page_width_mm / 2.0,
        FoldAxis::Horizontal => spec.page_height_mm / 2.0,
    };
    Some(FoldLine {
        axis: spec.fold_axis,
        position_mm,
    })
}

// =============================================================================
// Cell Calculations
// =============================================================================

/// Bounds of a cell (bleed included) at the given grid position.
///
/// # Arguments
/// * `grid` - The grid layout
/// * `origin` - Top-left corner of the block (x, y)
/// * `pos` - Grid position (row, col)
pub fn cell_bounds(grid: &GridLayout, origin: (f32, f32), pos: GridPosition) -> Rect {
    let (x0, y0) = origin;
    Rect::new(
        x0 + pos.col as f32 * grid.pitch_x_mm(),
        y0 + pos.row as f32 * grid.pitch_y_mm(),
        grid.cell_width_mm(),
        grid.cell_height_mm(),
    )
}

/// Trim rect inside a cell
pub fn trim_bounds(grid: &GridLayout, cell: &Rect) -> Rect {
    Rect::new(
        cell.x + grid.bleed_mm,
        cell.y + grid.bleed_mm,
        grid.card_width_mm,
        grid.card_height_mm,
    )
}

/// Mirror image of a rect across the fold line
pub fn mirror_across(fold: &FoldLine, rect: &Rect) -> Rect {
    match fold.axis {
        FoldAxis::Vertical => Rect::new(
            2.0 * fold.position_mm - rect.right(),
            rect.y,
            rect.width,
            rect.height,
        ),
        FoldAxis::Horizontal => Rect::new(
            rect.x,
            2.0 * fold.position_mm - rect.bottom(),
            rect.width,
            rect.height,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_count_exact() {
        assert_eq!(fit_count(190.5, 63.5, 0.0), 3);
        assert_eq!(fit_count(190.4, 63.5, 0.0), 2);
    }

    #[test]
    fn test_fit_count_with_spacing() {
        // 3 cells of 60 need 180 + 2 * 5 = 190
        assert_eq!(fit_count(190.0, 60.0, 5.0), 3);
        assert_eq!(fit_count(189.0, 60.0, 5.0), 2);
    }

    #[test]
    fn test_fit_count_too_small() {
        assert_eq!(fit_count(50.0, 63.5, 0.0), 0);
        assert_eq!(fit_count(-10.0, 63.5, 0.0), 0);
    }

    #[test]
    fn test_mirror_across_vertical_fold() {
        let fold = FoldLine {
            axis: FoldAxis::Vertical,
            position_mm: 100.0,
        };
        let mirrored = mirror_across(&fold, &Rect::new(30.0, 10.0, 60.0, 80.0));
        assert_eq!(mirrored, Rect::new(110.0, 10.0, 60.0, 80.0));
    }

    #[test]
    fn test_fold_block_hugs_fold_line() {
        let spec = SheetSpec {
            mode: LayoutMode::FoldGlue,
            ..SheetSpec::default()
        };
        let grid = create_grid_layout(&spec, 63.5, 88.9).unwrap();
        let (x0, _) = front_block_origin(&spec, &grid);
        let fold = fold_line(&spec).unwrap();
        let gap = fold.position_mm - (x0 + grid.block_width_mm());
        assert!((gap - spec.fold_gap_mm).abs() < EPSILON_MM);
    }
}
