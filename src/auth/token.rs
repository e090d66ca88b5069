//! Token signer: compact signed claims for access, refresh, and email
//! verification tokens.
//!
//! Access and refresh tokens share one HMAC secret; verification tokens are
//! signed with a distinct secret so neither kind can stand in for the other.
//! Every verified token must also carry the expected `payloadType` tag.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::AuthConfig;
use super::error::AuthError;
use super::service::ValidatedUser;
use super::store::UserType;

/// Tag distinguishing token kinds; checked on every verification.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayloadKind {
    Access,
    Refresh,
    Verification,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub email: String,
    pub user_type: UserType,
    pub is_verified: bool,
    pub payload_type: PayloadKind,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshClaims {
    pub sub: String,
    pub payload_type: PayloadKind,
    /// Id of the `refresh_tokens` row this token rotates against.
    pub token_id: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationClaims {
    pub sub: String,
    pub payload_type: PayloadKind,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Freshly signed access + refresh tokens for one session.
#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenSigner {
    secret: SecretString,
    verification_secret: SecretString,
    issuer: String,
    audience: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    verification_ttl_seconds: i64,
}

impl TokenSigner {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret().clone(),
            verification_secret: config.verification_secret().clone(),
            issuer: config.issuer().to_string(),
            audience: config.audience().to_string(),
            access_ttl_seconds: config.access_ttl_seconds(),
            refresh_ttl_seconds: config.refresh_ttl_seconds(),
            verification_ttl_seconds: config.verification_ttl_seconds(),
        }
    }

    /// Sign an access + refresh pair bound to `token_id`.
    pub fn generate_pair(
        &self,
        user: &ValidatedUser,
        token_id: Uuid,
    ) -> Result<TokenPair, AuthError> {
        let now = Utc::now().timestamp();

        let access_claims = AccessClaims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            user_type: user.user_type,
            is_verified: user.is_verified,
            payload_type: PayloadKind::Access,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.access_ttl_seconds,
        };
        let access_token = self.sign(&access_claims, &self.secret)?;

        let refresh_claims = RefreshClaims {
            sub: user.id.to_string(),
            payload_type: PayloadKind::Refresh,
            token_id: token_id.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.refresh_ttl_seconds,
        };
        let refresh_token = self.sign(&refresh_claims, &self.secret)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Sign an email verification token for `user_id` with the distinct
    /// verification secret.
    pub fn sign_verification(&self, user_id: Uuid) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = VerificationClaims {
            sub: user_id.to_string(),
            payload_type: PayloadKind::Verification,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + self.verification_ttl_seconds,
        };
        self.sign(&claims, &self.verification_secret)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let claims: AccessClaims = self.verify(token, &self.secret)?;
        if claims.payload_type != PayloadKind::Access {
            return Err(AuthError::SessionExpired);
        }
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let claims: RefreshClaims = self.verify(token, &self.secret)?;
        if claims.payload_type != PayloadKind::Refresh {
            return Err(AuthError::SessionExpired);
        }
        Ok(claims)
    }

    pub fn verify_verification(&self, token: &str) -> Result<VerificationClaims, AuthError> {
        let claims: VerificationClaims = self.verify(token, &self.verification_secret)?;
        if claims.payload_type != PayloadKind::Verification {
            return Err(AuthError::SessionExpired);
        }
        Ok(claims)
    }

    /// Decode refresh claims without verifying the signature or expiry.
    ///
    /// Logout only needs the embedded row id from a token the caller already
    /// holds; deletion is keyed by that id, so a forged body deletes nothing.
    pub fn decode_refresh_unverified(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<RefreshClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::SessionExpired)
    }

    fn sign<C: Serialize>(&self, claims: &C, secret: &SecretString) -> Result<String, AuthError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .map_err(|err| AuthError::Dependency(anyhow::Error::new(err)))
    }

    fn verify<C: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        secret: &SecretString,
    ) -> Result<C, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.leeway = 0;

        decode::<C>(
            token,
            &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::SessionExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::{PayloadKind, TokenSigner};
    use crate::auth::config::AuthConfig;
    use crate::auth::error::AuthError;
    use crate::auth::service::ValidatedUser;
    use crate::auth::store::UserType;
    use anyhow::Result;
    use secrecy::SecretString;
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
            SecretString::from("fedcba9876543210fedcba9876543210".to_string()),
        )
    }

    fn user() -> ValidatedUser {
        ValidatedUser {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            user_type: UserType::User,
            is_verified: true,
            hashed_otp: None,
            otp_expires_at: None,
            otp_created_at: None,
        }
    }

    #[test]
    fn access_token_round_trips() -> Result<()> {
        let signer = TokenSigner::new(&config());
        let user = user();
        let pair = signer.generate_pair(&user, Uuid::new_v4())?;

        let claims = signer.verify_access(&pair.access_token)?;
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.user_type, UserType::User);
        assert!(claims.is_verified);
        assert_eq!(claims.payload_type, PayloadKind::Access);
        Ok(())
    }

    #[test]
    fn refresh_token_round_trips_with_token_id() -> Result<()> {
        let signer = TokenSigner::new(&config());
        let token_id = Uuid::new_v4();
        let pair = signer.generate_pair(&user(), token_id)?;

        let claims = signer.verify_refresh(&pair.refresh_token)?;
        assert_eq!(claims.token_id, token_id.to_string());
        assert_eq!(claims.payload_type, PayloadKind::Refresh);
        Ok(())
    }

    #[test]
    fn payload_kind_tags_are_enforced() -> Result<()> {
        // A refresh token must not pass the access check, and vice versa.
        let signer = TokenSigner::new(&config());
        let pair = signer.generate_pair(&user(), Uuid::new_v4())?;

        assert!(matches!(
            signer.verify_access(&pair.refresh_token),
            Err(AuthError::SessionExpired)
        ));
        assert!(matches!(
            signer.verify_refresh(&pair.access_token),
            Err(AuthError::SessionExpired)
        ));
        Ok(())
    }

    #[test]
    fn wrong_secret_is_rejected() -> Result<()> {
        let signer = TokenSigner::new(&config());
        let other = TokenSigner::new(&AuthConfig::new(
            SecretString::from("another-secret-another-secret-12".to_string()),
            SecretString::from("fedcba9876543210fedcba9876543210".to_string()),
        ));
        let pair = signer.generate_pair(&user(), Uuid::new_v4())?;

        assert!(other.verify_access(&pair.access_token).is_err());
        Ok(())
    }

    #[test]
    fn issuer_and_audience_are_enforced() -> Result<()> {
        let signer = TokenSigner::new(&config());
        let other_issuer =
            TokenSigner::new(&config().with_issuer("https://evil.example".to_string()));
        let other_audience =
            TokenSigner::new(&config().with_audience("https://evil.example".to_string()));
        let pair = signer.generate_pair(&user(), Uuid::new_v4())?;

        assert!(other_issuer.verify_access(&pair.access_token).is_err());
        assert!(other_audience.verify_access(&pair.access_token).is_err());
        Ok(())
    }

    #[test]
    fn expired_access_token_is_rejected() -> Result<()> {
        let signer = TokenSigner::new(&config().with_access_ttl_seconds(-10));
        let pair = signer.generate_pair(&user(), Uuid::new_v4())?;

        assert!(matches!(
            signer.verify_access(&pair.access_token),
            Err(AuthError::SessionExpired)
        ));
        Ok(())
    }

    #[test]
    fn verification_secret_cannot_forge_sessions() -> Result<()> {
        let signer = TokenSigner::new(&config());
        let verification = signer.sign_verification(Uuid::new_v4())?;

        // Verification tokens are neither access nor refresh tokens.
        assert!(signer.verify_access(&verification).is_err());
        assert!(signer.verify_refresh(&verification).is_err());

        let claims = signer.verify_verification(&verification)?;
        assert_eq!(claims.payload_type, PayloadKind::Verification);
        Ok(())
    }

    #[test]
    fn unverified_decode_recovers_token_id_from_expired_token() -> Result<()> {
        let signer = TokenSigner::new(&config().with_refresh_ttl_seconds(-10));
        let token_id = Uuid::new_v4();
        let pair = signer.generate_pair(&user(), token_id)?;

        assert!(signer.verify_refresh(&pair.refresh_token).is_err());
        let claims = signer.decode_refresh_unverified(&pair.refresh_token)?;
        assert_eq!(claims.token_id, token_id.to_string());
        Ok(())
    }

    #[test]
    fn garbage_is_not_decodable() {
        let signer = TokenSigner::new(&config());
        assert!(signer.decode_refresh_unverified("not-a-token").is_err());
        assert!(signer.verify_access("not-a-token").is_err());
    }
}
