//! Soglia - Authentication and session service.
//!
//! OTP-gated login, access/refresh token issuance with rotation, and a
//! dual-tier session-check protocol over Postgres and Redis.

pub mod api;
pub mod auth;
pub mod cli;
