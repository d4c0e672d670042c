use crate::error::{DatabaseError, DatabaseErrorExt};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

/// Schema scripts in apply order. Versions follow `NNNN-name`.
const BUILTIN: &[(&str, &str)] = &[
    ("0001-identity", include_str!("../migrations/0001-identity.surql")),
    ("0002-gallery", include_str!("../migrations/0002-gallery.surql")),
    ("0003-username-key", include_str!("../migrations/0003-username-key.surql")),
];

#[derive(Debug)]
pub(crate) struct Migration {
    pub version: &'static str,
    pub script: &'static str,
    pub checksum: String,
}

impl Migration {
    fn new(version: &'static str, script: &'static str) -> Self {
        Self { version, script, checksum: checksum(script) }
    }
}

pub(crate) fn builtin_migrations() -> Vec<Migration> {
    BUILTIN.iter().map(|(version, script)| Migration::new(version, script)).collect()
}

fn checksum(script: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(script.as_bytes());
    hex::encode(hasher.finalize())
}

/// Versions touched by one [`MigrationRunner::run`].
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, SurrealValue)]
struct AppliedMigration {
    version: String,
    checksum: String,
}

#[derive(Debug)]
pub(crate) struct MigrationRunner {
    db: Surreal<Any>,
}

impl MigrationRunner {
    pub(crate) const fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    /// Applies every pending migration in order.
    ///
    /// Each script runs in its own transaction together with its `migration` record, so
    /// a failing script leaves no trace and is retried on the next start.
    pub(crate) async fn run(&self, migrations: &[Migration]) -> Result<MigrationReport, DatabaseError> {
        let mut report = MigrationReport::default();
        let applied = self.applied().await?;

        for migration in migrations {
            if let Some(existing) = applied.get(migration.version) {
                ensure_checksum_match(migration, existing)?;
                report.skipped.push(migration.version.to_owned());
                continue;
            }

            self.apply(migration).await?;
            report.applied.push(migration.version.to_owned());
        }

        Ok(report)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), DatabaseError> {
        let query = format!(
            "BEGIN TRANSACTION;
            {}
            CREATE migration CONTENT {{ version: $version, checksum: $checksum, applied_at: time::now() }};
            COMMIT TRANSACTION;",
            migration.script,
        );

        self.db
            .query(&query)
            .bind(("version", migration.version))
            .bind(("checksum", migration.checksum.clone()))
            .await
            .context(format!("Executing migration {}", migration.version))?
            .check()
            .map_err(surrealdb::Error::from)
            .context(format!("Migration {} failed", migration.version))?;

        Ok(())
    }

    async fn applied(&self) -> Result<BTreeMap<String, String>, DatabaseError> {
        self.db
            .query("DEFINE TABLE IF NOT EXISTS migration SCHEMALESS")
            .await
            .context("Defining migration table")?
            .check()
            .map_err(surrealdb::Error::from)?;

        let entries = self
            .db
            .query("SELECT version, checksum FROM migration")
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(0)
            .context("Parsing applied migrations")?;

        Ok(entries.into_iter().map(|m| (m.version, m.checksum)).collect())
    }
}

fn ensure_checksum_match(migration: &Migration, existing: &str) -> Result<(), DatabaseError> {
    if existing != migration.checksum {
        return Err(DatabaseError::Migration {
            message: format!(
                "Checksum mismatch for {} (recorded {existing}, embedded {})",
                migration.version, migration.checksum
            )
            .into(),
            context: Some("Applied migrations must not be edited".into()),
        });
    }
    Ok(())
}
