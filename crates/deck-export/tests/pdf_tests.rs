use deck_export::layout::SheetSide;
use deck_export::*;
use deck_model::{Card, CardImage, Deck, SizeClass};
use image::{Rgba, RgbaImage};
use std::io::Cursor;

/// Sink that remembers what it was given
#[derive(Default)]
struct RecordingSink {
    pages: Vec<(u32, u32, f32, f32)>,
}

impl DocumentSink for RecordingSink {
    fn add_page(&mut self, raster: &RgbaImage, width_mm: f32, height_mm: f32) -> Result<()> {
        self.pages
            .push((raster.width(), raster.height(), width_mm, height_mm));
        Ok(())
    }

    fn finish(self) -> Result<Vec<u8>> {
        Ok(format!("{} pages", self.pages.len()).into_bytes())
    }
}

fn page(index: usize, side: SheetSide, spec: &SheetSpec) -> ComposedPage {
    let (w, h) = spec.page_size_px();
    ComposedPage {
        page_index: index,
        side,
        image: RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])),
        width_mm: spec.page_width_mm,
        height_mm: spec.page_height_mm,
    }
}

fn small_spec() -> SheetSpec {
    SheetSpec {
        dpi: 36,
        ..SheetSpec::default()
    }
}

fn png_card() -> Card {
    let mut buf = Vec::new();
    RgbaImage::from_pixel(32, 45, Rgba([0, 128, 255, 255]))
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    Card::new(CardImage::new(buf), SizeClass::Standard).unwrap()
}

#[test]
fn test_two_sided_pages_interleave() {
    let spec = small_spec();
    let pages = vec![
        page(0, SheetSide::Front, &spec),
        page(0, SheetSide::Back, &spec),
        page(1, SheetSide::Front, &spec),
        page(1, SheetSide::Back, &spec),
    ];
    let bytes = assemble(&pages, &spec, RecordingSink::default()).unwrap();
    assert_eq!(bytes, b"4 pages");
}

#[test]
fn test_out_of_order_page_rejected() {
    let spec = small_spec();
    let pages = vec![
        page(0, SheetSide::Front, &spec),
        page(1, SheetSide::Front, &spec),
    ];
    assert!(matches!(
        assemble(&pages, &spec, RecordingSink::default()),
        Err(ExportError::DocumentAssembly(_))
    ));
}

#[test]
fn test_missing_back_rejected() {
    let spec = small_spec();
    let pages = vec![page(0, SheetSide::Front, &spec)];
    assert!(matches!(
        assemble(&pages, &spec, RecordingSink::default()),
        Err(ExportError::DocumentAssembly(_))
    ));
}

#[test]
fn test_fold_glue_pages_are_single() {
    let spec = SheetSpec {
        mode: LayoutMode::FoldGlue,
        ..small_spec()
    };
    let pages = vec![
        page(0, SheetSide::Front, &spec),
        page(1, SheetSide::Front, &spec),
    ];
    assert!(assemble(&pages, &spec, RecordingSink::default()).is_ok());
}

#[test]
fn test_zero_size_raster_rejected() {
    let spec = small_spec();
    let mut bad = page(0, SheetSide::Front, &spec);
    bad.image = RgbaImage::new(0, 0);
    let mut assembler = PdfAssembler::new(RecordingSink::default(), &spec);
    assert!(matches!(
        assembler.push(&bad),
        Err(ExportError::DocumentAssembly(_))
    ));
    assert_eq!(assembler.page_count(), 0);
}

#[test]
fn test_mismatched_page_size_rejected() {
    let spec = small_spec();
    let mut other = page(0, SheetSide::Front, &spec);
    other.width_mm += 10.0;
    let mut assembler = PdfAssembler::new(RecordingSink::default(), &spec);
    assert!(assembler.push(&other).is_err());
}

#[test]
fn test_no_pages_rejected() {
    let spec = small_spec();
    assert!(assemble(&[], &spec, RecordingSink::default()).is_err());
}

#[test]
fn test_export_pdf_produces_loadable_document() {
    let mut deck = Deck::default();
    for _ in 0..3 {
        deck.add_card(png_card()).unwrap();
    }
    let spec = small_spec();
    let bytes = export_pdf(&deck, &spec, &RasterCodec::default()).unwrap();

    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    // One sheet, front and back
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_export_pdf_empty_deck() {
    let result = export_pdf(&Deck::default(), &small_spec(), &RasterCodec::default());
    assert!(matches!(result, Err(ExportError::EmptyDeck)));
}

#[test]
fn test_lopdf_sink_page_size_in_points() {
    let mut sink = LopdfSink::new();
    sink.add_page(&RgbaImage::new(10, 10), 210.0, 297.0).unwrap();
    let bytes = sink.finish().unwrap();
    let doc = lopdf::Document::load_mem(&bytes).unwrap();
    let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
    let page = doc.get_dictionary(page_id).unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_float().unwrap();
    assert!((width - 595.28).abs() < 0.1);
}
