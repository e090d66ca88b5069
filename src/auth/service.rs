//! Auth core orchestration.
//!
//! Flow Overview:
//! 1) `validate_user` gates every pre-auth operation on username + password.
//! 2) `send_otp`/`register` issue a hashed, rate-limited OTP via mail.
//! 3) `login` consumes the OTP and issues an access/refresh pair bound to a
//!    fresh refresh-token row.
//! 4) `refresh` rotates the stored secret in place; `logout`/`logout_all`
//!    revoke one or all rows.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::warn;
use uuid::Uuid;

use super::cache::ProfileCache;
use super::config::AuthConfig;
use super::error::AuthError;
use super::mail::Mailer;
use super::otp::{self, OTP_MAIL_SUBJECT};
use super::password;
use super::store::{
    CachedProfile, CreateUserOutcome, CredentialStore, UserRecord, UserType,
};
use super::token::{TokenPair, TokenSigner};

/// User as returned by `validate_user`: everything but the password hash.
///
/// OTP state rides along so the login handler can check presence and expiry
/// before the core re-verifies the hash.
#[derive(Clone, Debug)]
pub struct ValidatedUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub user_type: UserType,
    pub is_verified: bool,
    pub hashed_otp: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub otp_created_at: Option<DateTime<Utc>>,
}

impl From<UserRecord> for ValidatedUser {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            user_type: user.user_type,
            is_verified: user.is_verified,
            hashed_otp: user.hashed_otp,
            otp_expires_at: user.otp_expires_at,
            otp_created_at: user.otp_created_at,
        }
    }
}

/// Result of a successful refresh: the rotated pair plus the identity the
/// session endpoint reports back.
#[derive(Clone, Debug)]
pub struct RefreshGrant {
    pub tokens: TokenPair,
    pub user_id: Uuid,
    pub user_type: UserType,
}

pub struct AuthService {
    store: CredentialStore,
    signer: TokenSigner,
    cache: Arc<dyn ProfileCache>,
    mailer: Arc<dyn Mailer>,
    config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(
        store: CredentialStore,
        signer: TokenSigner,
        cache: Arc<dyn ProfileCache>,
        mailer: Arc<dyn Mailer>,
        config: AuthConfig,
    ) -> Self {
        Self {
            store,
            signer,
            cache,
            mailer,
            config,
        }
    }

    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Check username + password, returning the user without its password
    /// hash. `None` uniformly covers unknown user and wrong password.
    pub async fn validate_user(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<ValidatedUser>, AuthError> {
        let Some(user) = self
            .store
            .find_user_by_username(username)
            .await
            .map_err(AuthError::Dependency)?
        else {
            return Ok(None);
        };

        let matches =
            password::verify(password, &user.password_hash).map_err(AuthError::Dependency)?;
        if matches {
            Ok(Some(ValidatedUser::from(user)))
        } else {
            Ok(None)
        }
    }

    /// Create the user + profile pair and mail the first OTP.
    ///
    /// A mail failure surfaces to the caller but does not roll back the
    /// created user; a resend is cheaper than re-registration.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let password_hash = password::hash(password).map_err(AuthError::Dependency)?;

        let user = match self
            .store
            .create_user(username, email, &password_hash)
            .await
            .map_err(AuthError::Dependency)?
        {
            CreateUserOutcome::Created(user) => user,
            CreateUserOutcome::Conflict => return Err(AuthError::DuplicateUser),
        };

        self.issue_otp(user.id, &user.email).await
    }

    /// Issue a fresh OTP unless the previous one is younger than the resend
    /// window; the error carries the seconds left to wait.
    pub async fn send_otp(&self, user: &ValidatedUser) -> Result<(), AuthError> {
        let existing = self
            .store
            .find_user_by_id(user.id)
            .await
            .map_err(AuthError::Dependency)?
            .ok_or(AuthError::InvalidCredentials)?;

        if let Some(created_at) = existing.otp_created_at {
            if let Some(remaining_seconds) = remaining_cooldown(
                created_at,
                self.config.otp_resend_cooldown_seconds(),
                Utc::now(),
            ) {
                return Err(AuthError::OtpCooldown { remaining_seconds });
            }
        }

        self.issue_otp(existing.id, &existing.email).await
    }

    /// Consume the OTP and mint a session.
    ///
    /// The handler has already checked OTP presence and expiry; the core
    /// re-verifies the hash so a raced `send_otp` cannot slip a stale code
    /// through. On success all OTP fields are cleared and the user becomes
    /// verified.
    pub async fn login(&self, user: &ValidatedUser, otp: &str) -> Result<TokenPair, AuthError> {
        let hashed_otp = user.hashed_otp.as_deref().ok_or(AuthError::InvalidOtp)?;
        let matches = password::verify(otp, hashed_otp).map_err(AuthError::Dependency)?;
        if !matches {
            return Err(AuthError::InvalidOtp);
        }

        let updated = self
            .store
            .clear_otp_mark_verified(user.id)
            .await
            .map_err(AuthError::Dependency)?;

        // Two-phase: the refresh claims embed the row id, so the row must
        // exist (with an unreachable placeholder hash) before signing.
        let placeholder = otp::generate_placeholder_secret().map_err(AuthError::Dependency)?;
        let token_id = self
            .store
            .insert_refresh_token(user.id, &hash_secret(&placeholder))
            .await
            .map_err(AuthError::Dependency)?;

        let tokens = self
            .signer
            .generate_pair(&ValidatedUser::from(updated), token_id)?;

        self.store
            .finalize_refresh_token(token_id, &hash_secret(&tokens.refresh_token))
            .await
            .map_err(AuthError::Dependency)?;

        Ok(tokens)
    }

    /// Exchange a refresh secret for a rotated pair bound to the same row.
    ///
    /// Every failure is the uniform access-denied class; stale secrets and
    /// lost rotation races additionally log a warning so intrusion
    /// detection can tell replay from ordinary expiry.
    pub async fn refresh(
        &self,
        user_id: Uuid,
        presented: &str,
        token_id: Uuid,
    ) -> Result<RefreshGrant, AuthError> {
        let (user, record) = tokio::join!(
            self.store.find_user_by_id(user_id),
            self.store.find_refresh_token(token_id),
        );

        let user = user
            .map_err(AuthError::Dependency)?
            .ok_or(AuthError::AccessDenied)?;
        let Some(record) = record.map_err(AuthError::Dependency)? else {
            return Err(AuthError::AccessDenied);
        };
        if record.user_id != user_id {
            return Err(AuthError::AccessDenied);
        }

        let presented_hash = hash_secret(presented);
        if !bool::from(presented_hash.ct_eq(record.token_hash.as_slice())) {
            warn!(
                user_id = %user_id,
                token_id = %token_id,
                "refresh secret mismatch, possible replay of a rotated token"
            );
            return Err(AuthError::AccessDenied);
        }

        let user = ValidatedUser::from(user);
        let tokens = self.signer.generate_pair(&user, token_id)?;

        let rotated = self
            .store
            .rotate_refresh_token(
                token_id,
                &record.token_hash,
                &hash_secret(&tokens.refresh_token),
            )
            .await
            .map_err(AuthError::Dependency)?;
        if !rotated {
            warn!(
                user_id = %user_id,
                token_id = %token_id,
                "refresh rotation lost a concurrent race"
            );
            return Err(AuthError::AccessDenied);
        }

        Ok(RefreshGrant {
            user_id: user.id,
            user_type: user.user_type,
            tokens,
        })
    }

    /// Revoke the single session named by the refresh token; idempotent.
    /// Malformed tokens are a no-op since deletion is keyed by the embedded
    /// row id.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let Ok(claims) = self.signer.decode_refresh_unverified(refresh_token) else {
            return Ok(());
        };
        let Ok(token_id) = Uuid::parse_str(&claims.token_id) else {
            return Ok(());
        };

        self.store
            .delete_refresh_token(token_id)
            .await
            .map_err(AuthError::Dependency)?;
        Ok(())
    }

    /// Revoke every session/device for the user at once.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<u64, AuthError> {
        self.store
            .delete_all_refresh_tokens(user_id)
            .await
            .map_err(AuthError::Dependency)
    }

    /// Cached-or-fresh profile read; misses populate the cache with the
    /// configured TTL.
    pub async fn get_me(&self, user_id: Uuid) -> Result<CachedProfile, AuthError> {
        if let Some(profile) = self
            .cache
            .get(user_id)
            .await
            .map_err(AuthError::Dependency)?
        {
            return Ok(profile);
        }

        let profile = self
            .store
            .fetch_profile(user_id)
            .await
            .map_err(AuthError::Dependency)?
            .ok_or(AuthError::ProfileNotFound)?;

        self.cache
            .set(
                user_id,
                &profile,
                Duration::from_secs(self.config.profile_cache_ttl_seconds()),
            )
            .await
            .map_err(AuthError::Dependency)?;

        Ok(profile)
    }

    /// Invalidation contract for profile writers: call this before
    /// reporting a user/profile mutation as successful.
    pub async fn purge_cached_profile(&self, user_id: Uuid) -> Result<(), AuthError> {
        self.cache
            .invalidate(user_id)
            .await
            .map_err(AuthError::Dependency)
    }
}

/// Seconds left in the resend window, rounded up; `None` once the window
/// has passed.
fn remaining_cooldown(
    created_at: DateTime<Utc>,
    cooldown_seconds: i64,
    now: DateTime<Utc>,
) -> Option<i64> {
    let elapsed_ms = (now - created_at).num_milliseconds();
    let window_ms = cooldown_seconds * 1000;
    if elapsed_ms >= window_ms {
        return None;
    }
    let remaining_ms = window_ms - elapsed_ms.max(0);
    Some((remaining_ms + 999) / 1000)
}

/// SHA-256 of a bearer secret; the only form the store ever sees.
pub(crate) fn hash_secret(secret: &str) -> Vec<u8> {
    Sha256::digest(secret.as_bytes()).to_vec()
}
