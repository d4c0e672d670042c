use crate::error::GalleryError;
use scribe_database::{Database, DatabaseErrorExt};
use scribe_domain::constants::{DRAWING_TABLE, REPORT_TABLE};
use surrealdb::types::SurrealValue;

/// Longest stored prediction or corrected label.
pub const LABEL_MAX_CHARS: usize = 100;
/// Longest label kept on a report record.
pub const REPORT_LABEL_MAX_CHARS: usize = 255;

/// A saved canvas owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, SurrealValue)]
pub struct DrawingRecord {
    /// Public id.
    pub key: String,
    /// Owner username.
    pub user: String,
    /// Media path, e.g. `drawings/<key>.png`.
    pub image: String,
    pub prediction: Option<String>,
    pub correct_label: Option<String>,
    /// RFC 3339, UTC.
    pub created_at: String,
}

/// A user-submitted label correction.
#[derive(Debug, Clone, PartialEq, Eq, SurrealValue)]
pub struct ReportRecord {
    pub user: String,
    pub image: String,
    pub label: String,
    pub created_at: String,
}

/// First `max` chars of `value`.
#[must_use]
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

const DRAWING_FIELDS: &str = "key, user, image, prediction, correct_label, created_at";

#[derive(Debug, Clone)]
pub struct GalleryRepository {
    db: Database,
}

impl GalleryRepository {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// # Errors
    /// Database failures, including a key collision.
    pub async fn create_drawing(&self, drawing: &DrawingRecord) -> Result<(), GalleryError> {
        self.db
            .query(format!(
                "CREATE {DRAWING_TABLE} CONTENT {{ key: $key, user: $user, image: $image, \
                 prediction: $prediction, correct_label: NONE, created_at: $created_at }}"
            ))
            .bind(("key", drawing.key.clone()))
            .bind(("user", drawing.user.clone()))
            .bind(("image", drawing.image.clone()))
            .bind(("prediction", drawing.prediction.clone()))
            .bind(("created_at", drawing.created_at.clone()))
            .await
            .context("Failed to create drawing")?
            .check()
            .context("Failed to create drawing")?;
        Ok(())
    }

    /// Drawings of `user`, newest first.
    ///
    /// # Errors
    /// Database failures.
    pub async fn drawings_of(&self, user: &str) -> Result<Vec<DrawingRecord>, GalleryError> {
        Ok(self
            .db
            .query(format!(
                "SELECT {DRAWING_FIELDS} FROM {DRAWING_TABLE} \
                 WHERE user = $user ORDER BY created_at DESC"
            ))
            .bind(("user", user.to_owned()))
            .await
            .context("Failed to list drawings")?
            .take::<Vec<DrawingRecord>>(0)
            .context("Failed to decode drawings")?)
    }

    /// Drawings of `user` whose image path contains `file`, ignoring case, newest first.
    ///
    /// At most two rows come back: enough to tell a unique match from an ambiguous one.
    ///
    /// # Errors
    /// Database failures.
    pub async fn matching_file(
        &self,
        user: &str,
        file: &str,
    ) -> Result<Vec<DrawingRecord>, GalleryError> {
        Ok(self
            .db
            .query(format!(
                "SELECT {DRAWING_FIELDS} FROM {DRAWING_TABLE} \
                 WHERE user = $user AND string::contains(string::lowercase(image), $needle) \
                 ORDER BY created_at DESC LIMIT 2"
            ))
            .bind(("user", user.to_owned()))
            .bind(("needle", file.to_lowercase()))
            .await
            .context("Failed to look up drawing")?
            .take::<Vec<DrawingRecord>>(0)
            .context("Failed to decode drawing")?)
    }

    /// # Errors
    /// Database failures.
    pub async fn set_correct_label(&self, key: &str, label: &str) -> Result<(), GalleryError> {
        self.db
            .query(format!("UPDATE {DRAWING_TABLE} SET correct_label = $label WHERE key = $key"))
            .bind(("key", key.to_owned()))
            .bind(("label", truncate_chars(label, LABEL_MAX_CHARS)))
            .await
            .context("Failed to update drawing")?
            .check()
            .context("Failed to update drawing")?;
        Ok(())
    }

    /// # Errors
    /// Database failures.
    pub async fn create_report(&self, report: &ReportRecord) -> Result<(), GalleryError> {
        self.db
            .query(format!(
                "CREATE {REPORT_TABLE} CONTENT {{ user: $user, image: $image, label: $label, \
                 created_at: $created_at }}"
            ))
            .bind(("user", report.user.clone()))
            .bind(("image", report.image.clone()))
            .bind(("label", truncate_chars(&report.label, REPORT_LABEL_MAX_CHARS)))
            .bind(("created_at", report.created_at.clone()))
            .await
            .context("Failed to create report")?
            .check()
            .context("Failed to create report")?;
        Ok(())
    }
}
