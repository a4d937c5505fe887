//! Saved search history.
//!
//! Searches run with `--save` are appended to a JSON-lines file so they can
//! be listed and re-run later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::models::{ResultKind, SearchFilters};

/// History errors
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode history entry: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A saved search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub saved_at: DateTime<Utc>,
    /// Query text, or the file name for image searches
    pub query: String,
    #[serde(default)]
    pub kind: ResultKind,
    #[serde(default, skip_serializing_if = "SearchFilters::is_empty")]
    pub filters: SearchFilters,
    #[serde(default)]
    pub image: bool,
    pub result_count: usize,
}

impl SavedSearch {
    pub fn text(query: &str, kind: ResultKind, filters: SearchFilters, result_count: usize) -> Self {
        Self {
            saved_at: Utc::now(),
            query: query.trim().to_string(),
            kind,
            filters,
            image: false,
            result_count,
        }
    }

    pub fn image(file_name: &str, result_count: usize) -> Self {
        Self {
            saved_at: Utc::now(),
            query: file_name.to_string(),
            kind: ResultKind::default(),
            filters: SearchFilters::default(),
            image: true,
            result_count,
        }
    }
}

/// JSON-lines search history
#[derive(Debug, Clone)]
pub struct SearchHistory {
    path: PathBuf,
}

impl SearchHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Append an entry
    pub fn record(&self, entry: &SavedSearch) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        writeln!(file, "{}", line).map_err(|e| self.io_error(e))?;
        tracing::debug!("Saved search {:?} to {}", entry.query, self.path.display());
        Ok(())
    }

    /// Up to `limit` entries, newest first. Unreadable lines are skipped.
    pub fn recent(&self, limit: usize) -> Result<Vec<SavedSearch>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut entries = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| self.io_error(e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SavedSearch>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping history line {}: {}", number + 1, e),
            }
        }

        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Remove all entries
    pub fn clear(&self) -> Result<(), HistoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
