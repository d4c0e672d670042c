//! Append-only JSON lines log of label corrections, kept for retraining.

use crate::error::GalleryError;
use scribe_domain::constants::REPORT_LOG_FILE;
use scribe_storage::NamespacedStorage;
use serde::{Deserialize, Serialize};

/// One line of `reports/reports.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub user: String,
    /// File name as the client sent it.
    pub file: String,
    /// Uppercased label.
    pub label: String,
    /// RFC 3339.
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct ReportLog {
    storage: NamespacedStorage,
}

impl ReportLog {
    #[must_use]
    pub const fn new(storage: NamespacedStorage) -> Self {
        Self { storage }
    }

    /// Appends `entry` as one line. Concurrent appends never interleave.
    ///
    /// # Errors
    /// Serialization or storage failures.
    pub async fn append(&self, entry: &ReportEntry) -> Result<(), GalleryError> {
        let line = serde_json::to_string(entry)?;
        self.storage.append(REPORT_LOG_FILE, &line).await?;
        Ok(())
    }

    /// Every entry, oldest first. Mostly for tests and offline tooling.
    ///
    /// # Errors
    /// Storage failures or a corrupt line.
    pub async fn entries(&self) -> Result<Vec<ReportEntry>, GalleryError> {
        if !self.storage.exists(REPORT_LOG_FILE)? {
            return Ok(Vec::new());
        }
        let bytes = self.storage.read(REPORT_LOG_FILE).await?;
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(GalleryError::from))
            .collect()
    }
}
