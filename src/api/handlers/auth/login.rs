//! OTP-gated login endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

use super::error_response;
use super::session::set_session_cookies;
use super::state::AuthState;
use super::types::{LoginRequest, MessageResponse};
use crate::auth::AuthError;

/// Exchange username + password + OTP for the session cookie pair.
///
/// Presence and expiry of the OTP are checked here; the core re-verifies
/// the hash before issuing anything.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued; both cookies set", body = MessageResponse),
        (status = 401, description = "Bad credentials", body = String),
        (status = 403, description = "Invalid or expired OTP", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
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

    let otp = request.otp.trim();
    let expired = user.otp_expires_at.map_or(true, |expiry| expiry < Utc::now());
    if otp.is_empty() || user.hashed_otp.is_none() || expired {
        let (status, message) = error_response(&AuthError::InvalidOtp);
        return (status, message).into_response();
    }

    match auth_state.service().login(&user, otp).await {
        Ok(tokens) => {
            let mut response_headers = HeaderMap::new();
            if let Err(err) =
                set_session_cookies(&mut response_headers, auth_state.config(), &tokens)
            {
                error!("Failed to build session cookies: {err}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
                    .into_response();
            }
            (
                StatusCode::OK,
                response_headers,
                Json(MessageResponse {
                    message: "Login successful".to_string(),
                }),
            )
                .into_response()
        }
        Err(err) => {
            let (status, message) = error_response(&err);
            (status, message).into_response()
        }
    }
}
