use crate::error::IdentityError;
use chrono::{SecondsFormat, Utc};
use scribe_database::{Database, DatabaseError, DatabaseErrorExt};
use scribe_domain::constants::USER_TABLE;
use surrealdb::types::SurrealValue;

/// Stored account.
#[derive(Debug, Clone, SurrealValue)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub created_at: String,
}

/// Accounts in the `user` table.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Exact-spelling lookup, used to log in.
    ///
    /// # Errors
    /// Database failures.
    pub async fn find(&self, username: &str) -> Result<Option<UserRecord>, IdentityError> {
        let rows: Vec<UserRecord> = self
            .db
            .query(format!(
                "SELECT username, password_hash, created_at FROM {USER_TABLE} \
                 WHERE username = $username LIMIT 1"
            ))
            .bind(("username", username.to_owned()))
            .await
            .context("Failed to query user")?
            .take::<Vec<UserRecord>>(0)
            .context("Failed to decode user")?;

        Ok(rows.into_iter().next())
    }

    /// Whether any account already uses `username`, compared without case.
    ///
    /// # Errors
    /// Database failures.
    pub async fn is_taken(&self, username: &str) -> Result<bool, IdentityError> {
        let rows: Vec<UserRecord> = self
            .db
            .query(format!(
                "SELECT username, password_hash, created_at FROM {USER_TABLE} \
                 WHERE username_key = $key LIMIT 1"
            ))
            .bind(("key", username.to_lowercase()))
            .await
            .context("Failed to query user")?
            .take::<Vec<UserRecord>>(0)
            .context("Failed to decode user")?;

        Ok(!rows.is_empty())
    }

    /// Inserts a new account.
    ///
    /// # Errors
    /// [`IdentityError::DuplicateUser`] when the username is taken, including a lost race
    /// against the unique index.
    pub async fn create(
        &self,
        username: &str,
        password_hash: String,
    ) -> Result<UserRecord, IdentityError> {
        if self.is_taken(username).await? {
            return Err(IdentityError::DuplicateUser { context: Some(username.to_owned().into()) });
        }

        let record = UserRecord {
            username: username.to_owned(),
            password_hash,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        };

        let outcome = self
            .db
            .query(format!(
                "CREATE {USER_TABLE} CONTENT {{ username: $username, username_key: $key, \
                 password_hash: $password_hash, created_at: $created_at }}"
            ))
            .bind(("username", record.username.clone()))
            .bind(("key", record.username.to_lowercase()))
            .bind(("password_hash", record.password_hash.clone()))
            .bind(("created_at", record.created_at.clone()))
            .await
            .context("Failed to create user")?
            .check();

        match outcome {
            Ok(_) => Ok(record),
            Err(e) if e.to_string().contains("user_username") => {
                Err(IdentityError::DuplicateUser { context: Some(username.to_owned().into()) })
            },
            Err(source) => Err(DatabaseError::Surreal {
                source,
                context: Some("Failed to create user".into()),
            }
            .into()),
        }
    }
}
