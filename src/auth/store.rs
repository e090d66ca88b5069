//! Credential store adapter: users, profiles, and refresh-token rows.
//!
//! Raw bearer secrets never touch the database: refresh rows keep the
//! SHA-256 of the signed token, OTP columns keep a bcrypt hash. Rotation is
//! a single conditional UPDATE keyed on the previous hash so two concurrent
//! refreshes can never both succeed against one row.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role enum carried in access-token claims and enforced by the edge guard.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserType {
    User,
    Admin,
}

impl UserType {
    pub(crate) fn from_db(value: &str) -> Self {
        if value == "ADMIN" {
            Self::Admin
        } else {
            Self::User
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

/// Full user row, including the password hash and OTP state.
///
/// OTP columns are all-null or all-set; `clear_otp_mark_verified` resets
/// them together.
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub is_verified: bool,
    pub hashed_otp: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub otp_created_at: Option<DateTime<Utc>>,
}

/// One active session/device.
#[derive(Clone, Debug)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: Vec<u8>,
}

/// Outcome when attempting to create a new user + profile pair.
#[derive(Debug)]
pub enum CreateUserOutcome {
    Created(UserRecord),
    Conflict,
}

/// User ∪ profile minus the password hash; the shape stored in the session
/// cache and returned by the `me` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CachedProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub user_type: UserType,
    pub is_verified: bool,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

const USER_COLUMNS: &str = r"
        id, username, email, password_hash, user_type::text AS user_type,
        is_verified, hashed_otp, otp_expires_at, otp_created_at
";

pub struct CredentialStore {
    pool: PgPool,
}

impl CredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by username")?;

        Ok(row.map(|row| user_record_from_row(&row)))
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        Ok(row.map(|row| user_record_from_row(&row)))
    }

    /// Create a user with its profile atomically; the profile's display name
    /// starts as the username.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<CreateUserOutcome> {
        let mut tx = self.pool.begin().await.context("begin signup transaction")?;

        let query = format!(
            r"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING {USER_COLUMNS}
    "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&mut *tx)
            .instrument(span)
            .await;

        let user = match row {
            Ok(row) => user_record_from_row(&row),
            Err(err) => {
                if is_unique_violation(&err) {
                    let _ = tx.rollback().await;
                    return Ok(CreateUserOutcome::Conflict);
                }
                return Err(err).context("failed to insert user");
            }
        };

        let query = r"
        INSERT INTO profiles (user_id, display_name)
        VALUES ($1, $2)
    ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user.id)
            .bind(username)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to insert profile")?;

        tx.commit().await.context("commit signup transaction")?;

        Ok(CreateUserOutcome::Created(user))
    }

    /// Overwrite the OTP columns with a fresh hash, expiry, and creation
    /// timestamp.
    pub async fn store_otp(
        &self,
        user_id: Uuid,
        hashed_otp: &str,
        ttl_seconds: i64,
    ) -> Result<()> {
        let query = r"
        UPDATE users
        SET hashed_otp = $2,
            otp_expires_at = NOW() + ($3 * INTERVAL '1 second'),
            otp_created_at = NOW(),
            updated_at = NOW()
        WHERE id = $1
    ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .bind(hashed_otp)
            .bind(ttl_seconds)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to store otp")?;
        Ok(())
    }

    /// Clear all OTP columns together and mark the user verified.
    pub async fn clear_otp_mark_verified(&self, user_id: Uuid) -> Result<UserRecord> {
        let query = format!(
            r"
        UPDATE users
        SET hashed_otp = NULL,
            otp_expires_at = NULL,
            otp_created_at = NULL,
            is_verified = TRUE,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
    "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query.as_str()
        );
        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to clear otp state")?;

        Ok(user_record_from_row(&row))
    }

    /// Insert a refresh row holding a placeholder hash.
    ///
    /// The refresh token's claims embed the row id, so the row must exist
    /// before the token naming it can be signed; the caller finalizes the
    /// hash afterwards.
    pub async fn insert_refresh_token(
        &self,
        user_id: Uuid,
        placeholder_hash: &[u8],
    ) -> Result<Uuid> {
        let query = r"
        INSERT INTO refresh_tokens (user_id, token_hash)
        VALUES ($1, $2)
        RETURNING id
    ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(placeholder_hash)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert refresh token")?;

        Ok(row.get("id"))
    }

    /// Replace the placeholder hash with the hash of the signed token.
    pub async fn finalize_refresh_token(&self, token_id: Uuid, token_hash: &[u8]) -> Result<()> {
        let query = r"
        UPDATE refresh_tokens
        SET token_hash = $2
        WHERE id = $1
    ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_id)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to finalize refresh token")?;
        Ok(())
    }

    pub async fn find_refresh_token(&self, token_id: Uuid) -> Result<Option<RefreshTokenRecord>> {
        let query = r"
        SELECT id, user_id, token_hash
        FROM refresh_tokens
        WHERE id = $1
    ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup refresh token")?;

        Ok(row.map(|row| RefreshTokenRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            token_hash: row.get("token_hash"),
        }))
    }

    /// Rotate the stored hash in place.
    ///
    /// The WHERE clause pins the previous hash: of two concurrent refreshes
    /// holding the same secret, exactly one write matches. Returns whether
    /// this caller won.
    pub async fn rotate_refresh_token(
        &self,
        token_id: Uuid,
        previous_hash: &[u8],
        next_hash: &[u8],
    ) -> Result<bool> {
        let query = r"
        UPDATE refresh_tokens
        SET token_hash = $3
        WHERE id = $1
          AND token_hash = $2
    ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token_id)
            .bind(previous_hash)
            .bind(next_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to rotate refresh token")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete one session row; logout is idempotent, missing rows are fine.
    pub async fn delete_refresh_token(&self, token_id: Uuid) -> Result<bool> {
        let query = "DELETE FROM refresh_tokens WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(token_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete refresh token")?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every session/device for a user at once.
    pub async fn delete_all_refresh_tokens(&self, user_id: Uuid) -> Result<u64> {
        let query = "DELETE FROM refresh_tokens WHERE user_id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete refresh tokens")?;
        Ok(result.rows_affected())
    }

    /// Fetch user ∪ profile for the cacheable `me` read.
    pub async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<CachedProfile>> {
        let query = r#"
        SELECT
            users.id::text AS id,
            users.username,
            users.email,
            users.user_type::text AS user_type,
            users.is_verified,
            profiles.display_name,
            profiles.avatar_url,
            profiles.bio,
            to_char(users.created_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS created_at,
            to_char(users.updated_at AT TIME ZONE 'utc', 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS updated_at
        FROM users
        JOIN profiles ON profiles.user_id = users.id
        WHERE users.id = $1
        LIMIT 1
    "#;
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to fetch profile")?;

        Ok(row.map(|row| {
            let user_type: String = row.get("user_type");
            CachedProfile {
                id: row.get("id"),
                username: row.get("username"),
                email: row.get("email"),
                user_type: UserType::from_db(&user_type),
                is_verified: row.get("is_verified"),
                display_name: row.get("display_name"),
                avatar_url: row.get("avatar_url"),
                bio: row.get("bio"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            }
        }))
    }
}

fn user_record_from_row(row: &PgRow) -> UserRecord {
    let user_type: String = row.get("user_type");
    UserRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        user_type: UserType::from_db(&user_type),
        is_verified: row.get("is_verified"),
        hashed_otp: row.get("hashed_otp"),
        otp_expires_at: row.get("otp_expires_at"),
        otp_created_at: row.get("otp_created_at"),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}
