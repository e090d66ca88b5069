//! Auth core configuration, constructed once at process start.

use secrecy::SecretString;

const DEFAULT_ISSUER: &str = "http://localhost:8000";
const DEFAULT_AUDIENCE: &str = "http://localhost:3000";
const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_VERIFICATION_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_OTP_RESEND_COOLDOWN_SECONDS: i64 = 60;
const DEFAULT_PROFILE_CACHE_TTL_SECONDS: u64 = 60 * 60;
const DEFAULT_MAIL_FROM: &str = "Soglia <no-reply@soglia.dev>";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    secret: SecretString,
    verification_secret: SecretString,
    issuer: String,
    audience: String,
    frontend_base_url: String,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    verification_ttl_seconds: i64,
    otp_ttl_seconds: i64,
    otp_resend_cooldown_seconds: i64,
    profile_cache_ttl_seconds: u64,
    mail_from: String,
}

impl AuthConfig {
    /// Access/refresh tokens share `secret`; email verification tokens use
    /// `verification_secret` so a leaked one cannot forge a session.
    #[must_use]
    pub fn new(secret: SecretString, verification_secret: SecretString) -> Self {
        Self {
            secret,
            verification_secret,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            frontend_base_url: DEFAULT_FRONTEND_BASE_URL.to_string(),
            access_ttl_seconds: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl_seconds: DEFAULT_REFRESH_TTL_SECONDS,
            verification_ttl_seconds: DEFAULT_VERIFICATION_TTL_SECONDS,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            otp_resend_cooldown_seconds: DEFAULT_OTP_RESEND_COOLDOWN_SECONDS,
            profile_cache_ttl_seconds: DEFAULT_PROFILE_CACHE_TTL_SECONDS,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_audience(mut self, audience: String) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, frontend_base_url: String) -> Self {
        self.frontend_base_url = frontend_base_url;
        self
    }

    #[must_use]
    pub fn with_access_ttl_seconds(mut self, seconds: i64) -> Self {
        self.access_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_ttl_seconds(mut self, seconds: i64) -> Self {
        self.refresh_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_verification_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verification_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_otp_resend_cooldown_seconds(mut self, seconds: i64) -> Self {
        self.otp_resend_cooldown_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_profile_cache_ttl_seconds(mut self, seconds: u64) -> Self {
        self.profile_cache_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_mail_from(mut self, mail_from: String) -> Self {
        self.mail_from = mail_from;
        self
    }

    #[must_use]
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    #[must_use]
    pub fn verification_secret(&self) -> &SecretString {
        &self.verification_secret
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    #[must_use]
    pub fn verification_ttl_seconds(&self) -> i64 {
        self.verification_ttl_seconds
    }

    #[must_use]
    pub fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub fn otp_resend_cooldown_seconds(&self) -> i64 {
        self.otp_resend_cooldown_seconds
    }

    #[must_use]
    pub fn profile_cache_ttl_seconds(&self) -> u64 {
        self.profile_cache_ttl_seconds
    }

    #[must_use]
    pub fn mail_from(&self) -> &str {
        &self.mail_from
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

#[cfg(test)]
mod tests {
    use super::AuthConfig;
    use secrecy::SecretString;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
            SecretString::from("fedcba9876543210fedcba9876543210".to_string()),
        )
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = config();

        assert_eq!(config.issuer(), "http://localhost:8000");
        assert_eq!(config.audience(), "http://localhost:3000");
        assert_eq!(config.access_ttl_seconds(), 15 * 60);
        assert_eq!(config.refresh_ttl_seconds(), 7 * 24 * 60 * 60);
        assert_eq!(config.otp_ttl_seconds(), 10 * 60);
        assert_eq!(config.otp_resend_cooldown_seconds(), 60);
        assert_eq!(config.profile_cache_ttl_seconds(), 60 * 60);
        assert!(!config.cookie_secure());

        let config = config
            .with_issuer("https://api.example.test".to_string())
            .with_audience("https://app.example.test".to_string())
            .with_frontend_base_url("https://app.example.test".to_string())
            .with_access_ttl_seconds(60)
            .with_otp_resend_cooldown_seconds(5);

        assert_eq!(config.issuer(), "https://api.example.test");
        assert_eq!(config.audience(), "https://app.example.test");
        assert_eq!(config.access_ttl_seconds(), 60);
        assert_eq!(config.otp_resend_cooldown_seconds(), 5);
        assert!(config.cookie_secure());
    }
}
