use crate::constants::{EPSILON_MM, MAX_DPI, MIN_DPI, px_per_mm};
use crate::octgn::OctgnOptions;
use crate::tabletop::TabletopOptions;
use crate::types::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical sheet and layout configuration for print export.
///
/// All lengths are millimetres. The page origin is the top-left corner.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetSpec {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    /// Printer-safe margin on every page edge
    pub margin_mm: f32,
    /// Minimum gap between neighbouring card cells
    pub spacing_mm: f32,
    /// Artwork extension beyond each trim edge
    pub bleed_mm: f32,
    /// Distance between the fold line and the nearest card cells
    pub fold_gap_mm: f32,
    /// Shift applied to back faces in two-sided mode
    pub back_offset_x_mm: f32,
    pub back_offset_y_mm: f32,

    pub mode: LayoutMode,
    pub fold_axis: FoldAxis,
    /// Turn-over edge of two-sided duplex prints
    pub duplex_flip: DuplexFlip,
    pub marks: PrinterMarks,

    /// Raster resolution of composed pages
    pub dpi: u32,
}

impl Default for SheetSpec {
    fn default() -> Self {
        Self::for_paper(PaperSize::A4, Orientation::Portrait)
    }
}

impl SheetSpec {
    pub fn for_paper(paper: PaperSize, orientation: Orientation) -> Self {
        let (page_width_mm, page_height_mm) = paper.dimensions_with_orientation(orientation);
        Self {
            page_width_mm,
            page_height_mm,
            margin_mm: 5.0,
            spacing_mm: 0.0,
            bleed_mm: 0.0,
            fold_gap_mm: 3.0,
            back_offset_x_mm: 0.0,
            back_offset_y_mm: 0.0,
            mode: LayoutMode::TwoSided,
            fold_axis: FoldAxis::Vertical,
            duplex_flip: DuplexFlip::LongEdge,
            marks: PrinterMarks::default(),
            dpi: 300,
        }
    }

    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }

    /// Width of the area inside the page margins
    pub fn usable_width_mm(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    /// Height of the area inside the page margins
    pub fn usable_height_mm(&self) -> f32 {
        self.page_height_mm - 2.0 * self.margin_mm
    }

    pub fn px_per_mm(&self) -> f32 {
        px_per_mm(self.dpi)
    }

    /// Raster size of one composed page
    pub fn page_size_px(&self) -> (u32, u32) {
        let ppm = self.px_per_mm();
        (
            (self.page_width_mm * ppm).round() as u32,
            (self.page_height_mm * ppm).round() as u32,
        )
    }

    /// Check the values are usable. Whether a card fits is decided by the layout engine.
    pub fn validate(&self) -> std::result::Result<(), LayoutError> {
        let finite = [
            self.page_width_mm,
            self.page_height_mm,
            self.margin_mm,
            self.spacing_mm,
            self.bleed_mm,
            self.fold_gap_mm,
            self.back_offset_x_mm,
            self.back_offset_y_mm,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(LayoutError::InvalidSpec(
                "all lengths must be finite".to_string(),
            ));
        }

        if self.page_width_mm <= EPSILON_MM || self.page_height_mm <= EPSILON_MM {
            return Err(LayoutError::InvalidSpec(format!(
                "page size {}x{} mm must be positive",
                self.page_width_mm, self.page_height_mm
            )));
        }

        for (name, value) in [
            ("margin", self.margin_mm),
            ("spacing", self.spacing_mm),
            ("bleed", self.bleed_mm),
            ("fold gap", self.fold_gap_mm),
        ] {
            if value < 0.0 {
                return Err(LayoutError::InvalidSpec(format!(
                    "{} must not be negative (got {} mm)",
                    name, value
                )));
            }
        }

        if !(MIN_DPI..=MAX_DPI).contains(&self.dpi) {
            return Err(LayoutError::InvalidSpec(format!(
                "resolution must be between {} and {} dpi (got {})",
                MIN_DPI, MAX_DPI, self.dpi
            )));
        }

        Ok(())
    }
}

/// Settings for every export target
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExportSettings {
    pub sheet: SheetSpec,
    pub tabletop: TabletopOptions,
    pub octgn: OctgnOptions,
}

impl ExportSettings {
    /// Load settings from JSON file
    #[cfg(feature = "serde")]
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let settings = serde_json::from_slice(&bytes)
            .map_err(|e| ExportError::Config(format!("Failed to parse settings: {}", e)))?;
        Ok(settings)
    }

    /// Save settings to JSON file
    #[cfg(feature = "serde")]
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ExportError::Config(format!("Failed to serialize settings: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        self.sheet
            .validate()
            .map_err(|e| ExportError::Config(e.to_string()))?;
        self.tabletop.validate()?;
        self.octgn.validate()?;
        Ok(())
    }
}
