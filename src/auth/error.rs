//! Failure taxonomy raised by the auth core.
//!
//! Messages are user-facing and deliberately uniform: credential failures
//! never reveal whether the username existed, and session failures never
//! reveal whether a refresh secret was expired, revoked, or replayed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password.
    #[error("Invalid Credentials")]
    InvalidCredentials,

    /// OTP missing, expired, or mismatched.
    #[error("Invalid or Expired OTP")]
    InvalidOtp,

    /// A fresh OTP was requested inside the resend window.
    #[error("Wait for {remaining_seconds}s more before trying again!")]
    OtpCooldown { remaining_seconds: i64 },

    /// Username or email already registered.
    #[error("User already exists")]
    DuplicateUser,

    /// Refresh denied: unknown user, unknown or foreign token row, stale or
    /// replayed secret, or a lost rotation race.
    #[error("Access Denied!")]
    AccessDenied,

    /// Token failed local verification (signature, expiry, issuer, audience,
    /// or payload kind).
    #[error("Session Expired")]
    SessionExpired,

    /// No user/profile row behind an otherwise valid session.
    #[error("User not found")]
    ProfileNotFound,

    /// Store, cache, or mail collaborator failed; details stay server-side.
    #[error("Something went wrong")]
    Dependency(anyhow::Error),
}

impl AuthError {
    /// Dependency failures keep their cause for logs; everything else is a
    /// deliberate, terminal outcome.
    #[must_use]
    pub fn is_dependency(&self) -> bool {
        matches!(self, Self::Dependency(_))
    }
}
