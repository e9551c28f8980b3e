//! Printer's marks drawn onto composed pages
//!
//! Crop marks sit outside the block of cards at every trim line. The fold
//! line of a fold-and-glue sheet is dashed and spans the usable area.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as PixelBox;

use crate::constants::{
    CROP_MARK_GAP_MM, CROP_MARK_LENGTH_MM, EPSILON_MM, FOLD_DASH_GAP_MM, FOLD_DASH_MM,
    MARK_STROKE_MM,
};
use crate::layout::{FoldLine, Rect, SheetFace};
use crate::options::SheetSpec;
use crate::types::FoldAxis;

const MARK_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);
const FOLD_COLOR: Rgba<u8> = Rgba([128, 128, 128, 255]);

/// Draw crop marks for every trim line on a face
pub fn draw_crop_marks(canvas: &mut RgbaImage, face: &SheetFace, px_per_mm: f32) {
    let Some(bounds) = face.trim_bounds() else {
        return;
    };

    let xs = distinct(face.placements.iter().flat_map(|p| [p.trim_rect.x, p.trim_rect.right()]));
    let ys = distinct(face.placements.iter().flat_map(|p| [p.trim_rect.y, p.trim_rect.bottom()]));
    let stroke = stroke_mm(px_per_mm);

    for x in xs {
        // Above and below the block
        let top = bounds.y - CROP_MARK_GAP_MM - CROP_MARK_LENGTH_MM;
        let bottom = bounds.bottom() + CROP_MARK_GAP_MM;
        for y in [top, bottom] {
            let mark = Rect::new(x - stroke / 2.0, y, stroke, CROP_MARK_LENGTH_MM);
            fill(canvas, &mark, px_per_mm, MARK_COLOR);
        }
    }

    for y in ys {
        // Left and right of the block
        let left = bounds.x - CROP_MARK_GAP_MM - CROP_MARK_LENGTH_MM;
        let right = bounds.right() + CROP_MARK_GAP_MM;
        for x in [left, right] {
            let mark = Rect::new(x, y - stroke / 2.0, CROP_MARK_LENGTH_MM, stroke);
            fill(canvas, &mark, px_per_mm, MARK_COLOR);
        }
    }
}

/// Draw a dashed fold line across the usable area
pub fn draw_fold_line(canvas: &mut RgbaImage, fold: &FoldLine, spec: &SheetSpec, px_per_mm: f32) {
    let stroke = stroke_mm(px_per_mm);
    let (start, end) = match fold.axis {
        FoldAxis::Vertical => (spec.margin_mm, spec.page_height_mm - spec.margin_mm),
        FoldAxis::Horizontal => (spec.margin_mm, spec.page_width_mm - spec.margin_mm),
    };

    let mut pos = start;
    while pos < end {
        let len = FOLD_DASH_MM.min(end - pos);
        let dash = match fold.axis {
            FoldAxis::Vertical => Rect::new(fold.position_mm - stroke / 2.0, pos, stroke, len),
            FoldAxis::Horizontal => Rect::new(pos, fold.position_mm - stroke / 2.0, len, stroke),
        };
        fill(canvas, &dash, px_per_mm, FOLD_COLOR);
        pos += FOLD_DASH_MM + FOLD_DASH_GAP_MM;
    }
}

/// Stroke width in mm, at least one pixel
fn stroke_mm(px_per_mm: f32) -> f32 {
    MARK_STROKE_MM.max(1.0 / px_per_mm)
}

fn fill(canvas: &mut RgbaImage, rect: &Rect, px_per_mm: f32, color: Rgba<u8>) {
    let x = (rect.x * px_per_mm).round() as i32;
    let y = (rect.y * px_per_mm).round() as i32;
    let width = ((rect.width * px_per_mm).round() as u32).max(1);
    let height = ((rect.height * px_per_mm).round() as u32).max(1);
    draw_filled_rect_mut(canvas, PixelBox::at(x, y).of_size(width, height), color);
}

/// Sorted values with near-duplicates removed
fn distinct(values: impl Iterator<Item = f32>) -> Vec<f32> {
    let mut values: Vec<f32> = values.collect();
    values.sort_by(f32::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() < EPSILON_MM);
    values
}
