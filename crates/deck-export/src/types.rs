use deck_model::{SizeClass, ValidationError};
use thiserror::Error;

/// Layout failed before any page was produced
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error(
        "sheet too small: usable area {usable_width_mm:.1}x{usable_height_mm:.1} mm cannot hold a {cell_width_mm:.1}x{cell_height_mm:.1} mm card"
    )]
    SheetTooSmall {
        usable_width_mm: f32,
        usable_height_mm: f32,
        cell_width_mm: f32,
        cell_height_mm: f32,
    },
    #[error("card {index} has size {found}, deck size is {expected}")]
    SizeClassMismatch {
        index: usize,
        expected: SizeClass,
        found: SizeClass,
    },
    #[error("invalid sheet: {0}")]
    InvalidSpec(String),
}

/// Failure reported by the image collaborator
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("invalid region: {0}")]
    InvalidRegion(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Deck is empty")]
    EmptyDeck,
    #[error("Deck has {count} cards, at most {max} are supported")]
    TooManyCards { count: usize, max: usize },
    #[error("{context}: {source}")]
    Collaborator { context: String, source: CodecError },
    #[error("Document assembly failed: {0}")]
    DocumentAssembly(String),
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("Export cancelled")]
    Cancelled,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("Invalid structured deck: {0}")]
    Format(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid deck: {0}")]
    Validation(#[from] ValidationError),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl ExportError {
    /// Wrap a codec failure with the card or page being processed
    pub fn collaborator(context: impl Into<String>, source: CodecError) -> Self {
        ExportError::Collaborator {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaperSize {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Tabloid => (279.4, 431.8),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Get dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// How card fronts and backs share a printed sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayoutMode {
    /// Fronts on one face of the sheet, backs on the reverse face
    #[default]
    TwoSided,
    /// Front and back side by side on one face, folded and glued
    FoldGlue,
}

/// Direction of the fold line in fold-and-glue layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FoldAxis {
    /// Fold line runs top to bottom; fronts left, backs right
    #[default]
    Vertical,
    /// Fold line runs left to right; fronts top, backs bottom
    Horizontal,
}

/// Sheet edge the duplex printer turns the page over for the back side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DuplexFlip {
    #[default]
    LongEdge,
    ShortEdge,
}

impl DuplexFlip {
    /// True when backs mirror across columns, false when they mirror across rows
    pub fn mirrors_columns(self, page_width_mm: f32, page_height_mm: f32) -> bool {
        let long_edge_vertical = page_height_mm >= page_width_mm;
        match self {
            DuplexFlip::LongEdge => long_edge_vertical,
            DuplexFlip::ShortEdge => !long_edge_vertical,
        }
    }
}

/// Rotation applied to a placed card image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Half,
}

impl Rotation {
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Half => 180,
        }
    }
}

/// Printer's marks options
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrinterMarks {
    /// L-shaped marks at every trim line, outside the card block
    pub crop_marks: bool,
    /// Dashed line where a fold-and-glue sheet is folded
    pub fold_line: bool,
}

impl PrinterMarks {
    pub fn any_enabled(&self) -> bool {
        self.crop_marks || self.fold_line
    }
}

/// Encoded raster formats produced by the exporters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// Identify the format of encoded bytes by their signature
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n']) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}
