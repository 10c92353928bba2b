//! Database access for accounts.
//!
//! Single-use token redemption is expressed as one conditional `UPDATE`
//! (compare-and-clear), never as a read followed by a write: of two
//! concurrent redemptions of the same token, exactly one sees the matching
//! row and wins.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::Instrument;
use uuid::Uuid;

/// One account row. Token columns hold hashes of the raw tokens; the
/// encrypted secret is an opaque string that round-trips exactly.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub verification_token: Option<String>,
    pub verification_issued_at: Option<DateTime<Utc>>,
    pub reset_token: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub encrypted_secret: Option<String>,
    pub secret_active: bool,
    pub secret_verified_at: Option<DateTime<Utc>>,
    pub login_count: i64,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub enum SignupOutcome {
    Created(Account),
    Conflict,
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn query_span(operation: &str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Insert a new unverified account with its pending verification token.
///
/// # Errors
///
/// Returns an error on storage failure; a duplicate email maps to
/// [`SignupOutcome::Conflict`].
pub async fn insert_account(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    verification_token_hash: &str,
) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users
            (email, password_hash, verification_token, verification_issued_at)
        VALUES ($1, $2, $3, NOW())
        RETURNING *
    ";
    let row = sqlx::query_as::<_, Account>(query)
        .bind(email)
        .bind(password_hash)
        .bind(verification_token_hash)
        .fetch_one(pool)
        .instrument(query_span("INSERT", query))
        .await;

    match row {
        Ok(account) => Ok(SignupOutcome::Created(account)),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

/// # Errors
///
/// Returns an error on storage failure.
pub async fn lookup_by_email(pool: &PgPool, email: &str) -> Result<Option<Account>> {
    let query = "SELECT * FROM users WHERE email = $1";
    sqlx::query_as::<_, Account>(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(query_span("SELECT", query))
        .await
        .context("failed to lookup account by email")
}

/// # Errors
///
/// Returns an error on storage failure.
pub async fn lookup_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Account>> {
    let query = "SELECT * FROM users WHERE id = $1";
    sqlx::query_as::<_, Account>(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(query_span("SELECT", query))
        .await
        .context("failed to lookup account by id")
}

/// Record a successful login: bump the counter and stamp `last_login`.
///
/// # Errors
///
/// Returns an error on storage failure or if the account vanished.
pub async fn record_login(pool: &PgPool, id: Uuid) -> Result<Account> {
    let query = r"
        UPDATE users
        SET login_count = login_count + 1,
            last_login = NOW(),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
    ";
    sqlx::query_as::<_, Account>(query)
        .bind(id)
        .fetch_one(pool)
        .instrument(query_span("UPDATE", query))
        .await
        .context("failed to record login")
}

/// Redeem a verification token: mark the account verified and clear the
/// token in the same statement that matched it.
///
/// Returns `None` uniformly for a wrong, expired, or already-consumed token.
///
/// # Errors
///
/// Returns an error on storage failure.
pub async fn consume_verification_token(
    pool: &PgPool,
    token_hash: &str,
    ttl_seconds: i64,
) -> Result<Option<Account>> {
    let query = r"
        UPDATE users
        SET email_verified = TRUE,
            verification_token = NULL,
            verification_issued_at = NULL,
            updated_at = NOW()
        WHERE verification_token = $1
          AND email_verified = FALSE
          AND verification_issued_at > NOW() - ($2 * INTERVAL '1 second')
        RETURNING *
    ";
    sqlx::query_as::<_, Account>(query)
        .bind(token_hash)
        .bind(ttl_seconds)
        .fetch_optional(pool)
        .instrument(query_span("UPDATE", query))
        .await
        .context("failed to consume verification token")
}

/// Replace the pending verification token; at most one is live per account.
///
/// Returns `false` if the account is missing or already verified.
///
/// # Errors
///
/// Returns an error on storage failure.
pub async fn refresh_verification_token(
    pool: &PgPool,
    id: Uuid,
    token_hash: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET verification_token = $2,
            verification_issued_at = NOW(),
            updated_at = NOW()
        WHERE id = $1
          AND email_verified = FALSE
    ";
    let result = sqlx::query(query)
        .bind(id)
        .bind(token_hash)
        .execute(pool)
        .instrument(query_span("UPDATE", query))
        .await
        .context("failed to refresh verification token")?;
    Ok(result.rows_affected() == 1)
}

/// Store a fresh reset token with its expiry; both fields are set together
/// and overwrite any prior pending reset.
///
/// # Errors
///
/// Returns an error on storage failure.
pub async fn set_reset_token(
    pool: &PgPool,
    id: Uuid,
    token_hash: &str,
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET reset_token = $2,
            reset_expires_at = NOW() + ($3 * INTERVAL '1 second'),
            updated_at = NOW()
        WHERE id = $1
    ";
    sqlx::query(query)
        .bind(id)
        .bind(token_hash)
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(query_span("UPDATE", query))
        .await
        .context("failed to set reset token")?;
    Ok(())
}

/// Redeem a reset token inside its expiry window: install the new password
/// hash and clear both reset fields in the statement that matched the token.
///
/// Returns `None` uniformly for a wrong, expired, or already-consumed token.
///
/// # Errors
///
/// Returns an error on storage failure.
pub async fn consume_reset_token(
    pool: &PgPool,
    token_hash: &str,
    new_password_hash: &str,
) -> Result<Option<Account>> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            reset_token = NULL,
            reset_expires_at = NULL,
            updated_at = NOW()
        WHERE reset_token = $1
          AND reset_expires_at > NOW()
        RETURNING *
    ";
    sqlx::query_as::<_, Account>(query)
        .bind(token_hash)
        .bind(new_password_hash)
        .fetch_optional(pool)
        .instrument(query_span("UPDATE", query))
        .await
        .context("failed to consume reset token")
}

/// # Errors
///
/// Returns an error on storage failure.
pub async fn update_password(pool: &PgPool, id: Uuid, new_password_hash: &str) -> Result<()> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    sqlx::query(query)
        .bind(id)
        .bind(new_password_hash)
        .execute(pool)
        .instrument(query_span("UPDATE", query))
        .await
        .context("failed to update password")?;
    Ok(())
}

/// Persist a validated, encrypted secret and activate it.
///
/// Only called after the external validator returned Ok; a validator
/// failure never reaches this function, which is what keeps a previously
/// stored secret untouched on validation failure.
///
/// # Errors
///
/// Returns an error on storage failure or if the account vanished.
pub async fn store_secret(pool: &PgPool, id: Uuid, encrypted_secret: &str) -> Result<Account> {
    let query = r"
        UPDATE users
        SET encrypted_secret = $2,
            secret_active = TRUE,
            secret_verified_at = NOW(),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
    ";
    sqlx::query_as::<_, Account>(query)
        .bind(id)
        .bind(encrypted_secret)
        .fetch_one(pool)
        .instrument(query_span("UPDATE", query))
        .await
        .context("failed to store secret")
}

/// Unconditionally clear the stored secret and its flags.
///
/// # Errors
///
/// Returns an error on storage failure or if the account vanished.
pub async fn clear_secret(pool: &PgPool, id: Uuid) -> Result<Account> {
    let query = r"
        UPDATE users
        SET encrypted_secret = NULL,
            secret_active = FALSE,
            secret_verified_at = NULL,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
    ";
    sqlx::query_as::<_, Account>(query)
        .bind(id)
        .fetch_one(pool)
        .instrument(query_span("UPDATE", query))
        .await
        .context("failed to clear secret")
}

/// Delete the account and its owned content rows in one transaction.
///
/// # Errors
///
/// Returns an error on storage failure.
pub async fn delete_account(pool: &PgPool, id: Uuid) -> Result<()> {
    let mut tx = pool.begin().await.context("begin delete transaction")?;

    let query = "DELETE FROM contents WHERE user_id = $1";
    sqlx::query(query)
        .bind(id)
        .execute(&mut *tx)
        .instrument(query_span("DELETE", query))
        .await
        .context("failed to delete owned content")?;

    let query = "DELETE FROM users WHERE id = $1";
    sqlx::query(query)
        .bind(id)
        .execute(&mut *tx)
        .instrument(query_span("DELETE", query))
        .await
        .context("failed to delete account")?;

    tx.commit().await.context("commit delete transaction")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[test]
    fn signup_outcome_debug_names() {
        assert_eq!(format!("{:?}", SignupOutcome::Conflict), "Conflict");
    }

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
        fn message(&self) -> &str {
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
}
