//! PDF assembly
//!
//! Composed pages go to a [`DocumentSink`]. [`LopdfSink`] writes each raster
//! as a JPEG image XObject filling its page.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage, buffer::ConvertBuffer};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::constants::{EPSILON_MM, PDF_JPEG_QUALITY, mm_to_pt};
use crate::layout::SheetSide;
use crate::options::SheetSpec;
use crate::render::ComposedPage;
use crate::types::{ExportError, LayoutMode, Result};

/// PDF-generation collaborator
pub trait DocumentSink {
    /// Append a page showing `raster` over `width_mm` x `height_mm`
    fn add_page(&mut self, raster: &RgbaImage, width_mm: f32, height_mm: f32) -> Result<()>;

    /// Finalize the document
    fn finish(self) -> Result<Vec<u8>>;
}

// =============================================================================
// lopdf sink
// =============================================================================

pub struct LopdfSink {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    jpeg_quality: u8,
}

impl Default for LopdfSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfSink {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            jpeg_quality: PDF_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    fn encode_jpeg(&self, raster: &RgbaImage) -> Result<Vec<u8>> {
        let rgb: RgbImage = raster.convert();
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality)
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| ExportError::DocumentAssembly(format!("JPEG encoding failed: {}", e)))?;
        Ok(jpeg)
    }
}

impl DocumentSink for LopdfSink {
    fn add_page(&mut self, raster: &RgbaImage, width_mm: f32, height_mm: f32) -> Result<()> {
        if raster.width() == 0 || raster.height() == 0 {
            return Err(ExportError::DocumentAssembly(
                "page raster has no pixels".to_string(),
            ));
        }
        let width_pt = mm_to_pt(width_mm);
        let height_pt = mm_to_pt(height_mm);

        let jpeg = self.encode_jpeg(raster)?;
        let image_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(raster.width() as i64)),
            ("Height", Object::Integer(raster.height() as i64)),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"DCTDecode".to_vec())),
        ]);
        let image_id = self
            .doc
            .add_object(Stream::new(image_dict, jpeg).with_compression(false));

        // Scale the unit image square to the full page
        let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", width_pt, height_pt);
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let resources = Dictionary::from_iter(vec![(
            "XObject",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "Im0",
                Object::Reference(image_id),
            )])),
        )]);

        let page_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width_pt),
                    Object::Real(height_pt),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));
        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let count = self.kids.len() as i64;
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", catalog_id);

        let mut writer = Vec::new();
        self.doc.save_to(&mut writer)?;
        Ok(writer)
    }
}

// =============================================================================
// Assembler
// =============================================================================

/// Feeds composed pages to a sink, enforcing page order and a uniform size
pub struct PdfAssembler<S: DocumentSink> {
    sink: S,
    spec: SheetSpec,
    raster_size: Option<(u32, u32)>,
    expected: (usize, SheetSide),
    pages: usize,
}

impl<S: DocumentSink> PdfAssembler<S> {
    pub fn new(sink: S, spec: &SheetSpec) -> Self {
        Self {
            sink,
            spec: spec.clone(),
            raster_size: None,
            expected: (0, SheetSide::Front),
            pages: 0,
        }
    }

    /// Number of pages accepted so far
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Append the next page in print order
    pub fn push(&mut self, page: &ComposedPage) -> Result<()> {
        if (page.page_index, page.side) != self.expected {
            return Err(ExportError::DocumentAssembly(format!(
                "expected page {} {:?}, got page {} {:?}",
                self.expected.0 + 1,
                self.expected.1,
                page.page_index + 1,
                page.side
            )));
        }

        let size = (page.image.width(), page.image.height());
        if size.0 == 0 || size.1 == 0 {
            return Err(ExportError::DocumentAssembly(format!(
                "page {} has a zero-size raster",
                page.page_index + 1
            )));
        }
        if *self.raster_size.get_or_insert(size) != size {
            return Err(ExportError::DocumentAssembly(format!(
                "page {} raster is {}x{}, document pages are {:?}",
                page.page_index + 1,
                size.0,
                size.1,
                self.raster_size
            )));
        }
        if (page.width_mm - self.spec.page_width_mm).abs() > EPSILON_MM
            || (page.height_mm - self.spec.page_height_mm).abs() > EPSILON_MM
        {
            return Err(ExportError::DocumentAssembly(format!(
                "page {} is {}x{} mm, sheet is {}x{} mm",
                page.page_index + 1,
                page.width_mm,
                page.height_mm,
                self.spec.page_width_mm,
                self.spec.page_height_mm
            )));
        }

        self.sink
            .add_page(&page.image, self.spec.page_width_mm, self.spec.page_height_mm)?;
        self.pages += 1;
        self.expected = match (self.spec.mode, page.side) {
            (LayoutMode::TwoSided, SheetSide::Front) => (page.page_index, SheetSide::Back),
            _ => (page.page_index + 1, SheetSide::Front),
        };
        Ok(())
    }

    /// Finish the document. A two-sided sheet missing its back is rejected.
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.expected.1 == SheetSide::Back {
            return Err(ExportError::DocumentAssembly(format!(
                "page {} has no back face",
                self.expected.0 + 1
            )));
        }
        if self.pages == 0 {
            return Err(ExportError::DocumentAssembly(
                "document has no pages".to_string(),
            ));
        }
        log::info!("Assembled PDF with {} page(s)", self.pages);
        self.sink.finish()
    }
}

/// Assemble already composed pages into a document
pub fn assemble<S: DocumentSink>(
    pages: &[ComposedPage],
    spec: &SheetSpec,
    sink: S,
) -> Result<Vec<u8>> {
    let mut assembler = PdfAssembler::new(sink, spec);
    for page in pages {
        assembler.push(page)?;
    }
    assembler.finish()
}
