//! Snapshot persistence backends.

use std::convert::Infallible;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Error;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::dataset::Dataset;

/// Minimal storage abstraction required by [`PlannerService`](crate::PlannerService).
pub trait RecordStore {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Read the current snapshot. A store that was never written yields an
    /// empty dataset.
    ///
    /// # Errors
    /// Returns a store-specific error when the snapshot cannot be read.
    fn load(&self) -> Result<Dataset, Self::Error>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    /// Returns a store-specific error when persisting fails.
    fn save(&self, data: &Dataset) -> Result<(), Self::Error>;
}

/// Process-local store; clones share the same snapshot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Dataset>>,
}

impl MemoryStore {
    /// Store seeded with `data`.
    #[must_use]
    pub fn with_dataset(data: Dataset) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Dataset> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStore for MemoryStore {
    type Error = Infallible;

    fn load(&self) -> Result<Dataset, Self::Error> {
        Ok(self.guard().clone())
    }

    fn save(&self, data: &Dataset) -> Result<(), Self::Error> {
        *self.guard() = data.clone();
        Ok(())
    }
}

/// Errors raised by [`JsonFileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the file or creating the temporary file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The file is not a valid dataset, or the dataset failed to serialize.
    #[error("failed to decode {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
    /// The temporary file could not replace the data file.
    #[error("failed to replace {path}: {source}")]
    Persist {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: tempfile::PersistError,
    },
}

/// Pretty-printed JSON file replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordStore for JsonFileStore {
    type Error = StoreError;

    fn load(&self) -> Result<Dataset, Self::Error> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "data file missing, starting empty");
                return Ok(Dataset::default());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, data: &Dataset) -> Result<(), Self::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|err| self.io_error(err))?;

        let mut file = NamedTempFile::new_in(dir).map_err(|err| self.io_error(err))?;
        serde_json::to_writer_pretty(&mut file, data).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        file.write_all(b"\n").map_err(|err| self.io_error(err))?;
        file.as_file().sync_all().map_err(|err| self.io_error(err))?;
        file.persist(&self.path).map_err(|source| StoreError::Persist {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            path = %self.path.display(),
            rules = data.rules.len(),
            tasks = data.tasks.len(),
            events = data.events.len(),
            "saved dataset"
        );
        Ok(())
    }
}
