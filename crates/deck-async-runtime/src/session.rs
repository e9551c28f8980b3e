//! Editing session over one open deck
//!
//! The session owns the deck behind an `Arc`. Exports hold a snapshot that
//! shares it; the next edit copies the deck first, so an export never sees
//! changes made while it runs.

use deck_export::{ExportError, read_octgn};
use deck_model::project::{self, ProjectError};
use deck_model::{Deck, SizeClass};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path} is neither a deck project nor an OCTGN deck: {reason}")]
    Unrecognized { path: PathBuf, reason: String },

    #[error("The deck has no project file yet, use save as")]
    NoProjectPath,

    #[error("The deck has unsaved changes")]
    UnsavedChanges,

    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Where the open deck came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSource {
    New,
    Project(PathBuf),
    /// Imported from an OCTGN container. Saving needs a new project path.
    Octgn(PathBuf),
}

pub struct Session {
    deck: Arc<Deck>,
    source: SessionSource,
    dirty: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SizeClass::Standard)
    }
}

impl Session {
    /// Session over a new, empty deck
    pub fn new(size_class: SizeClass) -> Self {
        Self::with_deck(Deck::new(size_class), SessionSource::New)
    }

    fn with_deck(deck: Deck, source: SessionSource) -> Self {
        Self {
            deck: Arc::new(deck),
            source,
            dirty: false,
        }
    }

    /// Open a deck project or an OCTGN container
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let bytes = tokio::fs::read(&path).await?;

        if project::is_project(&bytes) {
            let deck = tokio::task::spawn_blocking(move || project::from_bytes(&bytes)).await??;
            log::info!("Opened project {} ({} cards)", path.display(), deck.len());
            return Ok(Self::with_deck(deck, SessionSource::Project(path)));
        }

        match read_octgn(&path).await {
            Ok(deck) => {
                log::info!("Imported OCTGN deck {} ({} cards)", path.display(), deck.len());
                Ok(Self::with_deck(deck, SessionSource::Octgn(path)))
            }
            Err(e) => Err(SessionError::Unrecognized {
                path,
                reason: e.to_string(),
            }),
        }
    }

    pub fn source(&self) -> &SessionSource {
        &self.source
    }

    /// Project file that `save` writes to
    pub fn project_path(&self) -> Option<&Path> {
        match &self.source {
            SessionSource::Project(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// The deck as it is now. Later edits do not affect the snapshot.
    pub fn snapshot(&self) -> Arc<Deck> {
        Arc::clone(&self.deck)
    }

    /// Mutate the deck and mark the session dirty. A deck still shared with
    /// a snapshot is copied before the change.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut Deck) -> R) -> R {
        let result = f(Arc::make_mut(&mut self.deck));
        self.dirty = true;
        result
    }

    /// Save to the current project file
    pub async fn save(&mut self) -> Result<PathBuf> {
        let path = self
            .project_path()
            .map(Path::to_path_buf)
            .ok_or(SessionError::NoProjectPath)?;
        self.write_project(&path).await?;
        Ok(path)
    }

    /// Save to a new project file, which becomes the current one
    pub async fn save_as(&mut self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref().to_owned();
        self.write_project(&path).await?;
        self.source = SessionSource::Project(path.clone());
        Ok(path)
    }

    async fn write_project(&mut self, path: &Path) -> Result<()> {
        let deck = self.snapshot();
        project::save_project(&deck, path).await?;
        self.dirty = false;
        log::info!("Saved {} ({} cards)", path.display(), deck.len());
        Ok(())
    }

    /// Close the deck, leaving an empty one. Unsaved changes are refused
    /// unless `discard_changes` is set.
    pub async fn close(&mut self, discard_changes: bool) -> Result<()> {
        if self.dirty && !discard_changes {
            return Err(SessionError::UnsavedChanges);
        }
        *self = Self::new(self.deck.size_class());
        Ok(())
    }
}
