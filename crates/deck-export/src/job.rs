//! Export jobs
//!
//! Each export target is one variant of [`ExportJob`]. Jobs run against an
//! immutable deck snapshot, report progress, and can be cancelled between
//! pages (between cards for structured decks). A cancelled job returns
//! [`ExportError::Cancelled`] and discards its partial output.

use deck_model::Deck;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::octgn::{OctgnOptions, export_octgn_monitored};
use crate::options::SheetSpec;
use crate::pdf::{LopdfSink, PdfAssembler};
use crate::render::{ImageCodec, PageComposer, RasterCodec};
use crate::tabletop::{TabletopOptions, TabletopSheets, export_tabletop_monitored};
use crate::types::{ExportError, Result};

/// Shared cancellation request
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress of a running export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    pub operation: String,
    pub current: usize,
    pub total: usize,
}

pub type ProgressFn = Arc<dyn Fn(ExportProgress) + Send + Sync>;

/// Cancellation and progress hooks handed to exporters
#[derive(Clone, Default)]
pub struct JobMonitor {
    cancel: CancelFlag,
    progress: Option<ProgressFn>,
}

impl JobMonitor {
    pub fn new(cancel: CancelFlag, progress: Option<ProgressFn>) -> Self {
        Self { cancel, progress }
    }

    /// Fail with `Cancelled` if cancellation was requested, else report progress
    pub fn checkpoint(&self, operation: &str, current: usize, total: usize) -> Result<()> {
        if self.cancel.is_cancelled() {
            log::info!("{} cancelled at {}/{}", operation, current, total);
            return Err(ExportError::Cancelled);
        }
        if let Some(progress) = &self.progress {
            progress(ExportProgress {
                operation: operation.to_string(),
                current,
                total,
            });
        }
        Ok(())
    }
}

/// An export target and its settings
#[derive(Debug, Clone, PartialEq)]
pub enum ExportJob {
    Pdf { spec: SheetSpec },
    Tabletop { options: TabletopOptions },
    Octgn { options: OctgnOptions },
}

impl ExportJob {
    pub fn name(&self) -> &'static str {
        match self {
            ExportJob::Pdf { .. } => "PDF export",
            ExportJob::Tabletop { .. } => "Tabletop Simulator export",
            ExportJob::Octgn { .. } => "OCTGN export",
        }
    }
}

/// Finished export
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutput {
    Pdf(Vec<u8>),
    Tabletop(TabletopSheets),
    Octgn(Vec<u8>),
}

/// Run a job synchronously with the default codec
pub fn run_job(deck: &Deck, job: &ExportJob, monitor: &JobMonitor) -> Result<ExportOutput> {
    run_job_with(deck, job, &RasterCodec::default(), monitor)
}

/// Run a job synchronously with the given codec
pub fn run_job_with<C: ImageCodec + ?Sized>(
    deck: &Deck,
    job: &ExportJob,
    codec: &C,
    monitor: &JobMonitor,
) -> Result<ExportOutput> {
    log::info!("Starting {} of '{}' ({} cards)", job.name(), deck.name(), deck.len());
    let output = match job {
        ExportJob::Pdf { spec } => ExportOutput::Pdf(export_pdf_monitored(deck, spec, codec, monitor)?),
        ExportJob::Tabletop { options } => {
            ExportOutput::Tabletop(export_tabletop_monitored(deck, options, codec, monitor)?)
        }
        ExportJob::Octgn { options } => {
            ExportOutput::Octgn(export_octgn_monitored(deck, options, codec, monitor)?)
        }
    };
    Ok(output)
}

/// Run a job off the async runtime against a deck snapshot
pub async fn run_export(
    deck: Arc<Deck>,
    job: ExportJob,
    monitor: JobMonitor,
) -> Result<ExportOutput> {
    tokio::task::spawn_blocking(move || run_job(&deck, &job, &monitor)).await?
}

/// Lay out, compose and assemble a print PDF
pub fn export_pdf<C: ImageCodec + ?Sized>(
    deck: &Deck,
    spec: &SheetSpec,
    codec: &C,
) -> Result<Vec<u8>> {
    export_pdf_monitored(deck, spec, codec, &JobMonitor::default())
}

pub fn export_pdf_monitored<C: ImageCodec + ?Sized>(
    deck: &Deck,
    spec: &SheetSpec,
    codec: &C,
    monitor: &JobMonitor,
) -> Result<Vec<u8>> {
    let pages = crate::layout::layout(deck, spec)?;
    if pages.is_empty() {
        return Err(ExportError::EmptyDeck);
    }

    let mut composer = PageComposer::new(deck, codec);
    let mut assembler = PdfAssembler::new(LopdfSink::new(), spec);
    let total = pages.len();
    for page in &pages {
        monitor.checkpoint("Composing pages", page.page_index, total)?;
        for composed in composer.compose_page(page, spec)? {
            assembler.push(&composed)?;
        }
    }
    monitor.checkpoint("Composing pages", total, total)?;
    assembler.finish()
}
