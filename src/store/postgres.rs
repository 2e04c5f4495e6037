//! Durable identity store backed by Postgres.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Connection, PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{IdentityRecord, IdentityStore, NewIdentity, Role, StoreError};

const SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS identities (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        dob DATE NOT NULL,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL,
        email_verified BOOLEAN NOT NULL DEFAULT FALSE,
        otp_hash BYTEA,
        otp_expires_at TIMESTAMPTZ,
        reset_otp_hash BYTEA,
        reset_otp_expires_at TIMESTAMPTZ,
        reset_verified BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the identities table if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error when the statement cannot be executed.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "CREATE TABLE"
        );
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to create identities table")?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn row_to_record(row: &PgRow) -> Result<IdentityRecord, StoreError> {
    let role: String = row.get("role");
    let role = Role::parse(&role)
        .ok_or_else(|| StoreError::Backend(anyhow!("unknown role in identities table: {role}")))?;
    Ok(IdentityRecord {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        dob: row.get("dob"),
        password_hash: row.get("password_hash"),
        role,
        email_verified: row.get("email_verified"),
        otp_hash: row.get("otp_hash"),
        otp_expires_at: row.get("otp_expires_at"),
        reset_otp_hash: row.get("reset_otp_hash"),
        reset_otp_expires_at: row.get("reset_otp_expires_at"),
        reset_verified: row.get("reset_verified"),
        created_at: row.get("created_at"),
    })
}

/// Map an affected-row count to the per-record contract: updates address one
/// record and report `NotFound` when it does not exist.
fn one_row_or_not_found(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for PgStore {
    async fn create(&self, identity: NewIdentity) -> Result<IdentityRecord, StoreError> {
        let query = r"
            INSERT INTO identities (id, name, email, dob, password_hash, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(&identity.name)
            .bind(&identity.email)
            .bind(identity.dob)
            .bind(&identity.password_hash)
            .bind(identity.role.as_str())
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => row_to_record(&row),
            Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateEmail),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("failed to insert identity"),
            )),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<IdentityRecord>, StoreError> {
        let query = "SELECT * FROM identities WHERE email = $1 LIMIT 1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup identity by email")?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn set_verification_code(
        &self,
        id: Uuid,
        otp_hash: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r"
            UPDATE identities
            SET otp_hash = $2, otp_expires_at = $3
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(otp_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to set verification code")?;
        one_row_or_not_found(result.rows_affected())
    }

    async fn mark_email_verified(&self, id: Uuid) -> Result<(), StoreError> {
        // Verification and code clearing happen in a single statement so the
        // code can never outlive a verified email.
        let query = r"
            UPDATE identities
            SET email_verified = TRUE, otp_hash = NULL, otp_expires_at = NULL
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark email verified")?;
        one_row_or_not_found(result.rows_affected())
    }

    async fn set_reset_code(
        &self,
        id: Uuid,
        otp_hash: Vec<u8>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let query = r"
            UPDATE identities
            SET reset_otp_hash = $2, reset_otp_expires_at = $3, reset_verified = FALSE
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(otp_hash)
            .bind(expires_at)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to set reset code")?;
        one_row_or_not_found(result.rows_affected())
    }

    async fn mark_reset_verified(&self, id: Uuid) -> Result<(), StoreError> {
        let query = r"
            UPDATE identities
            SET reset_verified = TRUE
            WHERE id = $1 AND reset_otp_hash IS NOT NULL
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to mark reset verified")?;
        one_row_or_not_found(result.rows_affected())
    }

    async fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), StoreError> {
        let query = r"
            UPDATE identities
            SET password_hash = $2,
                reset_otp_hash = NULL,
                reset_otp_expires_at = NULL,
                reset_verified = FALSE
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update password")?;
        one_row_or_not_found(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire database connection")?;
        conn.ping()
            .instrument(span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn zero_rows_affected_is_not_found() {
        assert!(matches!(
            one_row_or_not_found(0),
            Err(StoreError::NotFound)
        ));
        assert!(one_row_or_not_found(1).is_ok());
    }
}
