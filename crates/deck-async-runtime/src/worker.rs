use deck_export::{
    CancelFlag, ExportError, ExportJob, ExportOutput, ExportProgress, JobMonitor, ProgressFn,
    layout_statistics, run_export,
};
use deck_model::Deck;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::session::{Session, SessionError};
use crate::{DeckCommand, DeckUpdate, ExportOutputPaths};

/// Export running in the background
struct RunningExport {
    cancel: CancelFlag,
    handle: JoinHandle<()>,
}

/// Async worker task that owns the session and processes deck commands
pub async fn worker_task(
    mut command_rx: mpsc::UnboundedReceiver<DeckCommand>,
    update_tx: mpsc::UnboundedSender<DeckUpdate>,
) {
    let mut session = Session::default();
    let mut running: Option<RunningExport> = None;

    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &mut session, &mut running, &update_tx).await;
    }

    // Let a running export finish writing before the worker goes away
    if let Some(export) = running.take() {
        let _ = export.handle.await;
    }
}

async fn process_command(
    cmd: DeckCommand,
    session: &mut Session,
    running: &mut Option<RunningExport>,
    update_tx: &mpsc::UnboundedSender<DeckUpdate>,
) {
    match cmd {
        DeckCommand::Open { path } => match Session::open(&path).await {
            Ok(opened) => {
                *session = opened;
                let _ = update_tx.send(DeckUpdate::Opened {
                    name: session.deck().name().to_string(),
                    card_count: session.deck().len(),
                    source: session.source().clone(),
                });
            }
            Err(e) => send_error(update_tx, format!("Failed to open {}: {}", path.display(), e)),
        },
        DeckCommand::Save { path } => {
            let result = match path {
                Some(path) => session.save_as(path).await,
                None => session.save().await,
            };
            match result {
                Ok(path) => {
                    let _ = update_tx.send(DeckUpdate::Saved { path });
                }
                Err(e) => send_error(update_tx, format!("Failed to save: {}", e)),
            }
        }
        DeckCommand::Close { discard_changes } => match session.close(discard_changes).await {
            Ok(()) => {
                let _ = update_tx.send(DeckUpdate::Closed);
            }
            Err(e) => send_error(update_tx, format!("Failed to close: {}", e)),
        },
        DeckCommand::Export { job, output } => {
            if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
                send_error(update_tx, "An export is already running".to_string());
                return;
            }
            let deck = session.snapshot();
            *running = Some(start_export(deck, job, output, update_tx.clone()));
        }
        DeckCommand::Cancel => match running {
            Some(export) if !export.handle.is_finished() => {
                log::info!("Cancelling export");
                export.cancel.cancel();
            }
            _ => log::debug!("Cancel requested with no export running"),
        },
        DeckCommand::Stats { spec } => {
            let deck = session.snapshot();
            match layout_statistics(&deck, &spec) {
                Ok(stats) => {
                    let _ = update_tx.send(DeckUpdate::StatsCalculated { stats });
                }
                Err(e) => send_error(update_tx, format!("Failed to calculate statistics: {}", e)),
            }
        }
    }
}

fn start_export(
    deck: Arc<Deck>,
    job: ExportJob,
    output: ExportOutputPaths,
    update_tx: mpsc::UnboundedSender<DeckUpdate>,
) -> RunningExport {
    let cancel = CancelFlag::new();
    let progress_tx = update_tx.clone();
    let progress: ProgressFn = Arc::new(move |p: ExportProgress| {
        let _ = progress_tx.send(DeckUpdate::Progress {
            operation: p.operation,
            current: p.current,
            total: p.total,
        });
    });
    let monitor = JobMonitor::new(cancel.clone(), Some(progress));
    let name = job.name();

    let handle = tokio::spawn(async move {
        let result = match run_export(deck, job, monitor).await {
            Ok(exported) => write_output(exported, &output).await,
            Err(e) => Err(e.into()),
        };
        let update = match result {
            Ok(paths) => DeckUpdate::ExportComplete { job: name, paths },
            Err(SessionError::Export(ExportError::Cancelled)) => DeckUpdate::ExportCancelled,
            Err(e) => DeckUpdate::Error {
                message: format!("{} failed: {}", name, e),
            },
        };
        let _ = update_tx.send(update);
    });
    RunningExport { cancel, handle }
}

async fn write_output(
    exported: ExportOutput,
    output: &ExportOutputPaths,
) -> Result<Vec<PathBuf>, SessionError> {
    match exported {
        ExportOutput::Pdf(bytes) | ExportOutput::Octgn(bytes) => {
            tokio::fs::write(&output.path, bytes).await?;
            Ok(vec![output.path.clone()])
        }
        ExportOutput::Tabletop(sheets) => {
            let back = output
                .back_path
                .clone()
                .unwrap_or_else(|| back_sheet_path(&output.path));
            sheets.save(&output.path, &back).await?;
            Ok(vec![output.path.clone(), back])
        }
    }
}

/// `deck.png` -> `deck_back.png`
pub fn back_sheet_path(front: &Path) -> PathBuf {
    let stem = front
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match front.extension() {
        Some(ext) => format!("{}_back.{}", stem, ext.to_string_lossy()),
        None => format!("{}_back", stem),
    };
    front.with_file_name(name)
}

fn send_error(update_tx: &mpsc::UnboundedSender<DeckUpdate>, message: String) {
    log::warn!("{}", message);
    let _ = update_tx.send(DeckUpdate::Error { message });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_back_sheet_path() {
        assert_eq!(
            back_sheet_path(Path::new("/tmp/deck.png")),
            PathBuf::from("/tmp/deck_back.png")
        );
        assert_eq!(back_sheet_path(Path::new("sheet")), PathBuf::from("sheet_back"));
    }
}
