//! Authentication core: credential validation, OTP gating, token issuance
//! and rotation, and cache-assisted profile reads.
//!
//! Collaborators (store, signer, cache, mailer) are wired explicitly through
//! [`AuthService::new`]; nothing in this tree reads process-global state.

pub mod cache;
pub mod config;
pub mod error;
pub mod mail;
pub mod otp;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

pub use cache::{MemoryCache, ProfileCache, RedisCache};
pub use config::AuthConfig;
pub use error::AuthError;
pub use mail::{HttpMailer, LogMailer, Mailer};
pub use service::{AuthService, RefreshGrant, ValidatedUser};
pub use store::{CachedProfile, CredentialStore, UserType};
pub use token::{TokenPair, TokenSigner};
