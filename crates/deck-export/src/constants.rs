//! Shared constants for deck export
//!
//! This module centralizes magic numbers used by the layout engine,
//! the page composer and the exporters.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Millimetres per inch
pub const MM_PER_INCH: f32 = 25.4;

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / MM_PER_INCH;

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Pixels per millimetre at the given resolution
#[inline]
pub fn px_per_mm(dpi: u32) -> f32 {
    dpi as f32 / MM_PER_INCH
}

/// Tolerance for geometric comparisons in millimetres
pub const EPSILON_MM: f32 = 1e-3;

// =============================================================================
// Raster Output
// =============================================================================

/// Lowest accepted raster resolution
pub const MIN_DPI: u32 = 36;

/// Highest accepted raster resolution
pub const MAX_DPI: u32 = 1200;

/// JPEG quality for page rasters embedded in PDF output
pub const PDF_JPEG_QUALITY: u8 = 92;

/// JPEG quality for exported card images
pub const IMAGE_JPEG_QUALITY: u8 = 90;

// =============================================================================
// Printer's Marks
// =============================================================================

/// Length of crop marks (mm)
pub const CROP_MARK_LENGTH_MM: f32 = 4.0;

/// Gap between the card block and the start of a crop mark (mm)
pub const CROP_MARK_GAP_MM: f32 = 1.0;

/// Stroke width of crop marks and fold lines (mm)
pub const MARK_STROKE_MM: f32 = 0.2;

/// Dash length of the fold line (mm)
pub const FOLD_DASH_MM: f32 = 3.0;

/// Gap between fold line dashes (mm)
pub const FOLD_DASH_GAP_MM: f32 = 2.0;

// =============================================================================
// Tabletop Simulator
// =============================================================================

/// Largest sheet width and height Tabletop Simulator accepts (px)
pub const TABLETOP_MAX_SHEET_PX: u32 = 4096;

/// Most columns on a Tabletop Simulator deck sheet
pub const TABLETOP_MAX_COLUMNS: u32 = 10;

/// Most cards on a Tabletop Simulator deck sheet
pub const TABLETOP_MAX_CARDS: usize = 70;

/// Card width bounds and default (px)
pub const TABLETOP_MIN_CARD_PX: u32 = 32;
pub const TABLETOP_MAX_CARD_PX: u32 = 4096;
pub const TABLETOP_DEFAULT_CARD_PX: u32 = 512;

// =============================================================================
// OCTGN
// =============================================================================

/// Marvel Champions game identifier
pub const MARVEL_CHAMPIONS_GAME_ID: &str = "055c536f-adba-4bc2-acbf-9aefb9756046";

/// Largest card image width written to an OCTGN image database (px)
pub const OCTGN_MAX_IMAGE_PX: u32 = 4096;
