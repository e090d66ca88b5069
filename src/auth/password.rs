//! One-way hashing for passwords and OTPs via bcrypt.
//!
//! bcrypt's verify performs its own constant-time digest comparison, so the
//! same provider covers both "compare password" and "compare OTP".

use anyhow::{Context, Result};

/// bcrypt cost factor.
const BCRYPT_COST: u32 = 10;

/// Hash a secret with bcrypt (cost 10).
pub fn hash(secret: &str) -> Result<String> {
    bcrypt::hash(secret, BCRYPT_COST).context("failed to hash secret")
}

/// Verify a secret against a bcrypt hash.
pub fn verify(secret: &str, hashed: &str) -> Result<bool> {
    bcrypt::verify(secret, hashed).context("failed to verify secret")
}
