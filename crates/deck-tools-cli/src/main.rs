use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use deck_async_runtime::{Session, back_sheet_path};
use deck_export::{
    DuplexFlip, ExportSettings, FoldAxis, ImageFormat, LayoutMode, Orientation, PaperSize,
    RasterCodec, SheetSpec, export_octgn, export_pdf, export_tabletop, layout_statistics,
};
use deck_import::{MarvelCdbClient, OctgnDatabase, import_local_deck, import_remote_deck};
use deck_model::{Deck, SizeClass, save_project};
use std::path::{Path, PathBuf};

mod logger;

#[derive(Parser)]
#[command(name = "deckt", about = "Card deck export tools", version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Deck project or OCTGN deck to open and summarize
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a print-ready PDF
    Pdf {
        /// Deck project or OCTGN deck
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        settings: SettingsArg,
    },

    /// Export Tabletop Simulator front and back sheets
    Tts {
        /// Deck project or OCTGN deck
        input: PathBuf,

        /// Front sheet image
        #[arg(short, long)]
        output: PathBuf,

        /// Back sheet image (default: <output>_back)
        #[arg(long)]
        back: Option<PathBuf>,

        /// Width of one card in pixels
        #[arg(long)]
        card_width: Option<u32>,

        /// Sheet image format (default: from the output extension)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        #[command(flatten)]
        settings: SettingsArg,
    },

    /// Export an OCTGN card set and deck list
    Octgn {
        /// Deck project or OCTGN deck
        input: PathBuf,

        /// Output zip file
        #[arg(short, long)]
        output: PathBuf,

        /// Resize card images to this width in pixels
        #[arg(long)]
        image_width: Option<u32>,

        /// Re-encode card images in this format
        #[arg(long, value_enum)]
        image_format: Option<FormatArg>,

        #[command(flatten)]
        settings: SettingsArg,
    },

    /// Show print layout statistics without exporting
    Stats {
        /// Deck project or OCTGN deck
        input: PathBuf,

        #[command(flatten)]
        sheet: SheetArgs,

        #[command(flatten)]
        settings: SettingsArg,
    },

    /// Import a MarvelCDB deck into a new project
    ImportMarvelcdb {
        /// Public deck id
        deck_id: String,

        /// Output project file
        #[arg(short, long)]
        output: PathBuf,

        /// Card size class (standard, small, custom:WxH)
        #[arg(long, default_value = "standard")]
        size: SizeClass,

        /// Alternative MarvelCDB server
        #[arg(long)]
        base_url: Option<String>,

        #[command(flatten)]
        settings: SettingsArg,
    },

    /// Import an OCTGN deck file using a local OCTGN installation
    ImportOctgn {
        /// Deck file (.o8d)
        deck: PathBuf,

        /// OCTGN Data directory
        #[arg(long)]
        data_dir: PathBuf,

        /// Output project file
        #[arg(short, long)]
        output: PathBuf,

        /// Card size class (standard, small, custom:WxH)
        #[arg(long, default_value = "standard")]
        size: SizeClass,

        #[command(flatten)]
        settings: SettingsArg,
    },
}

#[derive(Args)]
struct SettingsArg {
    /// Export settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,
}

/// Sheet options that override the settings file
#[derive(Args, Default)]
struct SheetArgs {
    /// Output paper size
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Output orientation
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,

    /// Layout mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Fold axis for fold-and-glue sheets
    #[arg(long, value_enum)]
    fold_axis: Option<FoldAxisArg>,

    /// Edge the printer flips the sheet over for duplex backs
    #[arg(long, value_enum)]
    duplex_flip: Option<DuplexFlipArg>,

    /// Page margin in mm
    #[arg(long)]
    margin: Option<f32>,

    /// Gap between cards in mm
    #[arg(long)]
    spacing: Option<f32>,

    /// Bleed around each card in mm
    #[arg(long)]
    bleed: Option<f32>,

    /// Raster resolution
    #[arg(long)]
    dpi: Option<u32>,

    /// Add crop marks
    #[arg(long)]
    crop_marks: bool,

    /// Add a fold line
    #[arg(long)]
    fold_line: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    TwoSided,
    FoldGlue,
}

#[derive(Clone, Copy, ValueEnum)]
enum FoldAxisArg {
    Vertical,
    Horizontal,
}

#[derive(Clone, Copy, ValueEnum)]
enum DuplexFlipArg {
    LongEdge,
    ShortEdge,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<PaperArg> for PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

impl From<ModeArg> for LayoutMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::TwoSided => Self::TwoSided,
            ModeArg::FoldGlue => Self::FoldGlue,
        }
    }
}

impl From<FoldAxisArg> for FoldAxis {
    fn from(arg: FoldAxisArg) -> Self {
        match arg {
            FoldAxisArg::Vertical => Self::Vertical,
            FoldAxisArg::Horizontal => Self::Horizontal,
        }
    }
}

impl From<DuplexFlipArg> for DuplexFlip {
    fn from(arg: DuplexFlipArg) -> Self {
        match arg {
            DuplexFlipArg::LongEdge => Self::LongEdge,
            DuplexFlipArg::ShortEdge => Self::ShortEdge,
        }
    }
}

impl From<FormatArg> for ImageFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => Self::Png,
            FormatArg::Jpeg => Self::Jpeg,
        }
    }
}

impl SheetArgs {
    /// Apply the given options on top of `spec`
    fn apply(&self, spec: &mut SheetSpec) {
        if self.paper.is_some() || self.orientation.is_some() {
            // Whichever of paper and orientation is not given stays as configured
            let current = if spec.page_width_mm > spec.page_height_mm {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            };
            let orientation = self.orientation.map(Orientation::from).unwrap_or(current);
            let (width, height) = match self.paper {
                Some(paper) => PaperSize::from(paper).dimensions_with_orientation(orientation),
                None => {
                    let short = spec.page_width_mm.min(spec.page_height_mm);
                    let long = spec.page_width_mm.max(spec.page_height_mm);
                    match orientation {
                        Orientation::Portrait => (short, long),
                        Orientation::Landscape => (long, short),
                    }
                }
            };
            spec.page_width_mm = width;
            spec.page_height_mm = height;
        }
        if let Some(mode) = self.mode {
            spec.mode = mode.into();
        }
        if let Some(axis) = self.fold_axis {
            spec.fold_axis = axis.into();
        }
        if let Some(flip) = self.duplex_flip {
            spec.duplex_flip = flip.into();
        }
        if let Some(margin) = self.margin {
            spec.margin_mm = margin;
        }
        if let Some(spacing) = self.spacing {
            spec.spacing_mm = spacing;
        }
        if let Some(bleed) = self.bleed {
            spec.bleed_mm = bleed;
        }
        if let Some(dpi) = self.dpi {
            spec.dpi = dpi;
        }
        spec.marks.crop_marks |= self.crop_marks;
        spec.marks.fold_line |= self.fold_line;
    }
}

async fn load_settings(arg: &SettingsArg) -> Result<ExportSettings> {
    match &arg.settings {
        Some(path) => ExportSettings::load(path)
            .await
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(ExportSettings::default()),
    }
}

async fn open_deck(path: &Path) -> Result<Deck> {
    let session = Session::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(session.deck().clone())
}

/// Run blocking export work off the async runtime
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> deck_export::Result<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}

fn format_for(path: &Path) -> Option<ImageFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageFormat::from_extension)
}

fn print_summary(deck: &Deck) {
    println!("Deck: {}", deck.name());
    println!("  Cards: {}", deck.len());
    println!("  Unique cards: {}", deck.unique_cards().len());
    println!("  Size class: {}", deck.size_class());
    println!("  Sidedness: {}", deck.sidedness().name());
    println!(
        "  Shared back: {}",
        if deck.shared_back().is_some() { "yes" } else { "no" }
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::StderrLogger::from_env()
        .init()
        .context("Failed to install logger")?;
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        match cli.path {
            Some(path) => print_summary(&open_deck(&path).await?),
            None => println!("No deck given. Run `deckt --help` for usage."),
        }
        return Ok(());
    };

    match command {
        Commands::Pdf {
            input,
            output,
            sheet,
            settings,
        } => {
            let mut settings = load_settings(&settings).await?;
            sheet.apply(&mut settings.sheet);
            settings.validate()?;
            let deck = open_deck(&input).await?;
            let spec = settings.sheet;
            let pdf = blocking(move || export_pdf(&deck, &spec, &RasterCodec::default())).await?;
            tokio::fs::write(&output, pdf)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Exported PDF → {}", output.display());
        }

        Commands::Tts {
            input,
            output,
            back,
            card_width,
            format,
            settings,
        } => {
            let mut settings = load_settings(&settings).await?;
            if let Some(width) = card_width {
                settings.tabletop.card_width_px = width;
            }
            if let Some(format) = format.map(ImageFormat::from).or_else(|| format_for(&output)) {
                settings.tabletop.format = format;
            }
            settings.validate()?;
            let deck = open_deck(&input).await?;
            let options = settings.tabletop;
            let sheets =
                blocking(move || export_tabletop(&deck, &options, &RasterCodec::default())).await?;
            let back = back.unwrap_or_else(|| back_sheet_path(&output));
            sheets.save(&output, &back).await?;
            println!(
                "Exported {} cards in a {}x{} grid → {}, {}",
                sheets.card_count,
                sheets.columns,
                sheets.rows,
                output.display(),
                back.display()
            );
        }

        Commands::Octgn {
            input,
            output,
            image_width,
            image_format,
            settings,
        } => {
            let mut settings = load_settings(&settings).await?;
            if image_width.is_some() {
                settings.octgn.image_width_px = image_width;
            }
            if let Some(format) = image_format {
                settings.octgn.image_format = Some(format.into());
            }
            settings.validate()?;
            let deck = open_deck(&input).await?;
            let options = settings.octgn;
            let zip = blocking(move || export_octgn(&deck, &options, &RasterCodec::default())).await?;
            tokio::fs::write(&output, zip)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Exported OCTGN deck → {}", output.display());
        }

        Commands::Stats {
            input,
            sheet,
            settings,
        } => {
            let mut settings = load_settings(&settings).await?;
            sheet.apply(&mut settings.sheet);
            settings.validate()?;
            let deck = open_deck(&input).await?;
            let stats = layout_statistics(&deck, &settings.sheet)?;
            println!("Layout Statistics:");
            println!("  Cards: {}", stats.cards);
            println!("  Grid: {} x {}", stats.columns, stats.rows);
            println!("  Slots per sheet: {}", stats.slots_per_page);
            println!("  Sheets: {}", stats.sheets);
            println!("  Output pages: {}", stats.output_pages);
            println!("  Empty slots: {}", stats.empty_slots);
            if stats.cards_lacking_bleed > 0 {
                println!("  Cards lacking bleed: {}", stats.cards_lacking_bleed);
            }
        }

        Commands::ImportMarvelcdb {
            deck_id,
            output,
            size,
            base_url,
            settings,
        } => {
            // Settings are validated so a bad file fails before any download
            load_settings(&settings).await?.validate()?;
            let client = match base_url {
                Some(url) => MarvelCdbClient::with_base_url(url),
                None => MarvelCdbClient::new(),
            };
            let deck = import_remote_deck(&client, &deck_id, size)
                .await
                .with_context(|| format!("Failed to import MarvelCDB deck {}", deck_id))?;
            save_imported(&deck, &output).await?;
        }

        Commands::ImportOctgn {
            deck,
            data_dir,
            output,
            size,
            settings,
        } => {
            let game_id = load_settings(&settings).await?.octgn.game_id;
            if !data_dir.is_dir() {
                bail!("{} is not a directory", data_dir.display());
            }
            let db = OctgnDatabase::new(data_dir).with_game(game_id);
            let imported = import_local_deck(&db, &deck, size)
                .await
                .with_context(|| format!("Failed to import {}", deck.display()))?;
            save_imported(&imported, &output).await?;
        }
    }

    Ok(())
}

async fn save_imported(deck: &Deck, output: &Path) -> Result<()> {
    save_project(deck, output)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "Imported '{}' ({} cards) → {}",
        deck.name(),
        deck.len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_without_subcommand() {
        let cli = Cli::try_parse_from(["deckt", "deck.deck"]).unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("deck.deck")));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_sheet_args_override_settings() {
        let cli = Cli::try_parse_from([
            "deckt", "pdf", "in.deck", "-o", "out.pdf", "--paper", "letter", "--orientation",
            "landscape", "--mode", "fold-glue", "--bleed", "3", "--crop-marks",
        ])
        .unwrap();
        let Some(Commands::Pdf { sheet, .. }) = cli.command else {
            panic!("expected pdf command");
        };
        let mut spec = SheetSpec::default();
        sheet.apply(&mut spec);
        assert_eq!(spec.page_width_mm, 279.4);
        assert_eq!(spec.mode, LayoutMode::FoldGlue);
        assert_eq!(spec.bleed_mm, 3.0);
        assert!(spec.marks.crop_marks);
        assert!(!spec.marks.fold_line);
    }

    fn sheet_args(args: &[&str]) -> SheetArgs {
        let cli = Cli::try_parse_from(
            ["deckt", "pdf", "in.deck", "-o", "out.pdf"]
                .iter()
                .chain(args),
        )
        .unwrap();
        let Some(Commands::Pdf { sheet, .. }) = cli.command else {
            panic!("expected pdf command");
        };
        sheet
    }

    #[test]
    fn test_orientation_alone_keeps_configured_paper() {
        let mut spec = SheetSpec::for_paper(PaperSize::Letter, Orientation::Portrait);
        sheet_args(&["--orientation", "landscape"]).apply(&mut spec);
        assert_eq!((spec.page_width_mm, spec.page_height_mm), (279.4, 215.9));

        sheet_args(&["--orientation", "portrait"]).apply(&mut spec);
        assert_eq!((spec.page_width_mm, spec.page_height_mm), (215.9, 279.4));
    }

    #[test]
    fn test_paper_alone_keeps_configured_orientation() {
        let mut spec = SheetSpec::for_paper(PaperSize::A4, Orientation::Landscape);
        sheet_args(&["--paper", "letter"]).apply(&mut spec);
        assert_eq!((spec.page_width_mm, spec.page_height_mm), (279.4, 215.9));
    }

    #[test]
    fn test_duplex_flip_argument() {
        let mut spec = SheetSpec::default();
        sheet_args(&["--duplex-flip", "short-edge"]).apply(&mut spec);
        assert_eq!(spec.duplex_flip, DuplexFlip::ShortEdge);
    }

    #[test]
    fn test_unset_sheet_args_keep_settings() {
        let mut spec = SheetSpec {
            margin_mm: 12.0,
            dpi: 150,
            ..SheetSpec::default()
        };
        SheetArgs::default().apply(&mut spec);
        assert_eq!(spec.margin_mm, 12.0);
        assert_eq!(spec.dpi, 150);
    }

    #[test]
    fn test_size_class_argument() {
        let cli = Cli::try_parse_from([
            "deckt", "import-octgn", "deck.o8d", "--data-dir", "Data", "-o", "out.deck", "--size",
            "custom:60x90",
        ])
        .unwrap();
        let Some(Commands::ImportOctgn { size, .. }) = cli.command else {
            panic!("expected import-octgn command");
        };
        assert_eq!(
            size,
            SizeClass::Custom {
                width_mm: 60.0,
                height_mm: 90.0
            }
        );
    }
}
