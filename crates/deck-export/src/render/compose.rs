//! Raster page composition
//!
//! Turns page descriptors into page-sized rasters: white background, card
//! artwork at its placement, then printer's marks.

use deck_model::{CardId, CardImage, Deck};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;

use crate::layout::{CardPlacement, ImageSource, PageLayout, Rect, SheetFace, SheetSide};
use crate::options::SheetSpec;
use crate::types::{CodecError, ExportError, Result};

use super::codec::{ImageCodec, PixelRect};
use super::marks::{draw_crop_marks, draw_fold_line};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// One finished sheet face
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    pub page_index: usize,
    pub side: SheetSide,
    pub image: RgbaImage,
    /// Physical size the raster represents
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Millimetre to pixel scale, per axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScale {
    pub x: f32,
    pub y: f32,
}

impl PixelScale {
    pub fn uniform(px_per_mm: f32) -> Self {
        Self {
            x: px_per_mm,
            y: px_per_mm,
        }
    }

    /// Snap a millimetre rect to whole pixels. Edges shared by two rects
    /// snap to the same pixel.
    pub fn to_pixels(&self, rect: &Rect) -> PixelRect {
        let x0 = (rect.x * self.x).round() as i64;
        let y0 = (rect.y * self.y).round() as i64;
        let x1 = (rect.right() * self.x).round() as i64;
        let y1 = (rect.bottom() * self.y).round() as i64;
        PixelRect::new(x0, y0, (x1 - x0).max(0) as u32, (y1 - y0).max(0) as u32)
    }
}

/// Composes sheet faces for one deck, caching decoded artwork
pub struct PageComposer<'a, C: ImageCodec + ?Sized> {
    deck: &'a Deck,
    codec: &'a C,
    cache: HashMap<(Option<CardId>, ImageSource), Arc<RgbaImage>>,
}

impl<'a, C: ImageCodec + ?Sized> PageComposer<'a, C> {
    pub fn new(deck: &'a Deck, codec: &'a C) -> Self {
        Self {
            deck,
            codec,
            cache: HashMap::new(),
        }
    }

    /// Compose every face of a page in print order
    pub fn compose_page(
        &mut self,
        page: &PageLayout,
        spec: &SheetSpec,
    ) -> Result<Vec<ComposedPage>> {
        page.faces()
            .map(|face| self.compose_face(page, face, spec))
            .collect()
    }

    /// Compose one face of a page at the sheet's resolution
    pub fn compose_face(
        &mut self,
        page: &PageLayout,
        face: &SheetFace,
        spec: &SheetSpec,
    ) -> Result<ComposedPage> {
        let scale = PixelScale::uniform(spec.px_per_mm());
        self.compose_face_scaled(page, face, spec, scale, spec.page_size_px())
    }

    /// Compose one face onto a canvas of `size_px` using an explicit scale
    pub(crate) fn compose_face_scaled(
        &mut self,
        page: &PageLayout,
        face: &SheetFace,
        spec: &SheetSpec,
        scale: PixelScale,
        size_px: (u32, u32),
    ) -> Result<ComposedPage> {
        let mut canvas = RgbaImage::from_pixel(size_px.0, size_px.1, BACKGROUND);

        for placement in &face.placements {
            self.draw_placement(&mut canvas, placement, page.page_index, scale)?;
        }

        if spec.marks.crop_marks {
            draw_crop_marks(&mut canvas, face, scale.x);
        }
        if spec.marks.fold_line {
            if let Some(fold) = &page.fold_line {
                draw_fold_line(&mut canvas, fold, spec, scale.x);
            }
        }

        log::debug!(
            "Composed page {} {:?} ({} placements)",
            page.page_index + 1,
            face.side,
            face.placements.len()
        );
        Ok(ComposedPage {
            page_index: page.page_index,
            side: face.side,
            image: canvas,
            width_mm: spec.page_width_mm,
            height_mm: spec.page_height_mm,
        })
    }

    fn draw_placement(
        &mut self,
        canvas: &mut RgbaImage,
        placement: &CardPlacement,
        page_index: usize,
        scale: PixelScale,
    ) -> Result<()> {
        let Some(source) = placement.source else {
            // Blank back
            return Ok(());
        };
        let deck = self.deck;
        let context = || {
            format!(
                "card {} ({}) {:?} on page {}",
                placement.card_index + 1,
                card_name(deck, placement.card_index),
                source,
                page_index + 1
            )
        };

        let artwork = self.artwork(placement.card_index, source)?;
        let decoded = self.decoded(placement.card_index, source, &artwork)?;

        let target = scale.to_pixels(&target_rect(placement, &artwork));
        let crop = crop_region(placement, &artwork, &decoded);
        if target.is_empty() || crop.is_empty() {
            return Err(ExportError::collaborator(
                context(),
                CodecError::InvalidRegion("artwork too small to place".to_string()),
            ));
        }
        self.codec
            .draw(&decoded, canvas, target, placement.rotation, crop)
            .map_err(|e| ExportError::collaborator(context(), e))
    }

    /// Encoded artwork behind an image source
    fn artwork(&self, card_index: usize, source: ImageSource) -> Result<CardImage> {
        let card = self.deck.card(card_index).ok_or_else(|| {
            ExportError::Format(format!(
                "placement references missing card {}",
                card_index + 1
            ))
        })?;
        let image = match source {
            ImageSource::CardFront => Some(card.front()),
            ImageSource::CardBack => card.back(),
            ImageSource::KindBack(kind) => self.deck.kind_back(kind),
            ImageSource::SharedBack => self.deck.shared_back(),
        };
        image.cloned().ok_or_else(|| {
            ExportError::Format(format!(
                "card {} has no {:?} artwork",
                card_index + 1,
                source
            ))
        })
    }

    fn decoded(
        &mut self,
        card_index: usize,
        source: ImageSource,
        artwork: &CardImage,
    ) -> Result<Arc<RgbaImage>> {
        let card_id = match source {
            ImageSource::KindBack(_) | ImageSource::SharedBack => None,
            _ => self.deck.card(card_index).map(|c| c.id()),
        };
        let key = (card_id, source);
        if let Some(image) = self.cache.get(&key) {
            log::trace!("Decode cache hit for card {}", card_index + 1);
            return Ok(Arc::clone(image));
        }
        let image = self.codec.decode(artwork.data()).map_err(|e| {
            ExportError::collaborator(
                format!(
                    "decoding card {} ({}) {:?}",
                    card_index + 1,
                    card_name(self.deck, card_index),
                    source
                ),
                e,
            )
        })?;
        let image = Arc::new(image);
        self.cache.insert(key, Arc::clone(&image));
        Ok(image)
    }
}

fn card_name(deck: &Deck, index: usize) -> String {
    deck.card(index)
        .map(|c| c.display_name())
        .unwrap_or_default()
}

/// Where the artwork lands on the sheet, in millimetres.
///
/// Artwork with enough bleed fills the bleed rect. Artwork with too little
/// is drawn at true scale around the trim rect, leaving the rest of the
/// bleed blank.
fn target_rect(placement: &CardPlacement, artwork: &CardImage) -> Rect {
    if placement.bleed_covered {
        placement.bleed_rect
    } else {
        placement.trim_rect.expand(artwork.bleed_mm())
    }
}

/// Part of the decoded artwork to draw.
///
/// Artwork spans the card plus its own bleed. Surplus bleed beyond the
/// sheet bleed is cropped away.
fn crop_region(placement: &CardPlacement, artwork: &CardImage, decoded: &RgbaImage) -> PixelRect {
    if !placement.bleed_covered {
        return PixelRect::full(decoded);
    }
    let own_bleed = artwork.bleed_mm();
    let trim = placement.trim_rect;
    let sheet_bleed = (placement.bleed_rect.width - trim.width) / 2.0;
    let inset = (own_bleed - sheet_bleed).max(0.0);

    let inset_x = (inset * decoded.width() as f32 / (trim.width + 2.0 * own_bleed)).round() as u32;
    let inset_y =
        (inset * decoded.height() as f32 / (trim.height + 2.0 * own_bleed)).round() as u32;
    PixelRect::new(
        inset_x as i64,
        inset_y as i64,
        decoded.width().saturating_sub(2 * inset_x),
        decoded.height().saturating_sub(2 * inset_y),
    )
}

/// Lay out and compose a whole deck
pub fn compose_deck<C: ImageCodec + ?Sized>(
    deck: &Deck,
    spec: &SheetSpec,
    codec: &C,
) -> Result<Vec<ComposedPage>> {
    let pages = crate::layout::layout(deck, spec)?;
    let mut composer = PageComposer::new(deck, codec);
    let mut composed = Vec::new();
    for page in &pages {
        composed.extend(composer.compose_page(page, spec)?);
    }
    Ok(composed)
}
