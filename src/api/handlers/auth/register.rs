//! Registration and OTP dispatch endpoints.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::error_response;
use super::state::AuthState;
use super::types::{MessageResponse, RegisterRequest, SendOtpRequest};
use crate::api::handlers::{normalize_email, valid_email, valid_password, valid_username};
use crate::auth::AuthError;

/// Create the user + profile pair and send the first OTP.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created and OTP mailed", body = MessageResponse),
        (status = 400, description = "Validation error or duplicate username/email", body = String),
        (status = 500, description = "Store or mail failure", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let username = request.username.trim();
    if !valid_username(username) {
        return (
            StatusCode::BAD_REQUEST,
            "Username should have between 4 and 32 characters".to_string(),
        )
            .into_response();
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Enter a valid email".to_string()).into_response();
    }

    if !valid_password(&request.password) {
        return (
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters with an uppercase letter, a number, and a special character"
                .to_string(),
        )
            .into_response();
    }

    match auth_state
        .service()
        .register(username, &email, &request.password)
        .await
    {
        Ok(()) => (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "Registration Successful".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            let (status, message) = error_response(&err);
            (status, message).into_response()
        }
    }
}

/// Re-issue the OTP for a credential-checked user, subject to the resend
/// window.
#[utoipa::path(
    post,
    path = "/auth/sendotp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "OTP mailed", body = MessageResponse),
        (status = 400, description = "Requested again inside the resend window", body = String),
        (status = 401, description = "Bad credentials", body = String)
    ),
    tag = "auth"
)]
pub async fn send_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SendOtpRequest>>,
) -> impl IntoResponse {
    let request: SendOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let user = match auth_state
        .service()
        .validate_user(request.username.trim(), &request.password)
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            let (status, message) = error_response(&AuthError::InvalidCredentials);
            return (status, message).into_response();
        }
        Err(err) => {
            let (status, message) = error_response(&err);
            return (status, message).into_response();
        }
    };

    match auth_state.service().send_otp(&user).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "OTP successfully sent!".to_string(),
            }),
        )
            .into_response(),
        Err(err) => {
            let (status, message) = error_response(&err);
            (status, message).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{register, send_otp};
    use crate::api::guard::RouteRules;
    use crate::api::handlers::auth::state::AuthState;
    use crate::api::handlers::auth::types::RegisterRequest;
    use crate::auth::{
        AuthConfig, AuthService, CredentialStore, LogMailer, MemoryCache, TokenSigner,
    };
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::Json;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn auth_state() -> Result<Arc<AuthState>> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let config = AuthConfig::new(
            SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
            SecretString::from("fedcba9876543210fedcba9876543210".to_string()),
        );
        let service = AuthService::new(
            CredentialStore::new(pool),
            TokenSigner::new(&config),
            Arc::new(MemoryCache::new()),
            Arc::new(LogMailer),
            config,
        );
        Ok(Arc::new(AuthState::new(service, RouteRules::new())))
    }

    #[tokio::test]
    async fn register_missing_payload() -> Result<()> {
        let response = register(Extension(auth_state()?), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_short_username() -> Result<()> {
        let response = register(
            Extension(auth_state()?),
            Some(Json(RegisterRequest {
                username: "abc".to_string(),
                email: "alice@example.com".to_string(),
                password: "Str0ng!pw".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() -> Result<()> {
        let response = register(
            Extension(auth_state()?),
            Some(Json(RegisterRequest {
                username: "alice".to_string(),
                email: "not-an-email".to_string(),
                password: "Str0ng!pw".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_weak_password() -> Result<()> {
        let response = register(
            Extension(auth_state()?),
            Some(Json(RegisterRequest {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "weakpassword".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn send_otp_missing_payload() -> Result<()> {
        let response = send_otp(Extension(auth_state()?), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
