use std::path::PathBuf;

mod session;
mod worker;

// Re-export types from library crates
pub use deck_export::{
    CancelFlag, ExportJob, ExportSettings, LayoutStatistics, OctgnOptions, SheetSpec,
    TabletopOptions,
};
pub use deck_model::{Deck, SizeClass};

pub use session::{Session, SessionError, SessionSource};
pub use worker::{back_sheet_path, worker_task};

/// Commands sent from the UI to the worker
#[derive(Debug)]
pub enum DeckCommand {
    /// Open a project file or OCTGN container
    Open {
        path: PathBuf,
    },
    /// Save the project, to `path` when given
    Save {
        path: Option<PathBuf>,
    },
    Close {
        discard_changes: bool,
    },
    /// Export a snapshot of the open deck
    Export {
        job: ExportJob,
        output: ExportOutputPaths,
    },
    /// Cancel the running export
    Cancel,
    Stats {
        spec: SheetSpec,
    },
}

/// Where an export writes its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutputPaths {
    pub path: PathBuf,
    /// Back sheet of a Tabletop Simulator export. Derived from `path` when unset.
    pub back_path: Option<PathBuf>,
}

impl ExportOutputPaths {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            back_path: None,
        }
    }
}

/// Updates sent from the worker to the UI
#[derive(Debug, Clone)]
pub enum DeckUpdate {
    Progress {
        operation: String,
        current: usize,
        total: usize,
    },
    Opened {
        name: String,
        card_count: usize,
        source: SessionSource,
    },
    Saved {
        path: PathBuf,
    },
    Closed,
    ExportComplete {
        job: &'static str,
        paths: Vec<PathBuf>,
    },
    ExportCancelled,
    StatsCalculated {
        stats: LayoutStatistics,
    },
    Error {
        message: String,
    },
}
