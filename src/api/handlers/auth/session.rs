//! Session endpoints: the dual-tier session check, logout, and logout-all,
//! plus the cookie helpers shared with login and the edge guard.

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::error_response;
use super::state::AuthState;
use super::types::{MessageResponse, SessionResponse};
use crate::api::guard::Principal;
use crate::auth::{AuthConfig, AuthError, TokenPair};

pub(crate) const ACCESS_COOKIE_NAME: &str = "access_token";
pub(crate) const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Authoritative session check implementing the dual-tier protocol.
///
/// Tier one verifies the access cookie locally and answers without any
/// store round trip. Tier two falls back to the refresh cookie, rotates the
/// stored secret, and re-issues both cookies. Anything else is a dead
/// session the client must re-authenticate.
#[utoipa::path(
    post,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session is active; cookies may have been rotated", body = SessionResponse),
        (status = 401, description = "No usable session", body = String)
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let access_token = cookie_value(&headers, ACCESS_COOKIE_NAME);
    let refresh_token = cookie_value(&headers, REFRESH_COOKIE_NAME);

    if access_token.is_none() && refresh_token.is_none() {
        return (StatusCode::UNAUTHORIZED, "No Session".to_string()).into_response();
    }

    // Fast path: a locally valid access token never touches the store.
    if let Some(token) = access_token.as_deref() {
        if let Ok(claims) = auth_state.service().signer().verify_access(token) {
            let response = SessionResponse {
                id: claims.sub,
                user_type: claims.user_type,
            };
            return (StatusCode::OK, Json(response)).into_response();
        }
    }

    let Some(refresh_token) = refresh_token else {
        return (StatusCode::UNAUTHORIZED, "Session Invalid".to_string()).into_response();
    };

    match refresh_session(&auth_state, &refresh_token).await {
        Ok((response_headers, response)) => {
            (StatusCode::OK, response_headers, Json(response)).into_response()
        }
        Err(err) if err.is_dependency() => {
            let (status, message) = error_response(&err);
            (status, message).into_response()
        }
        // Expired, revoked, and replayed secrets are indistinguishable here.
        Err(_) => (StatusCode::UNAUTHORIZED, "Session Expired".to_string()).into_response(),
    }
}

async fn refresh_session(
    auth_state: &AuthState,
    refresh_token: &str,
) -> Result<(HeaderMap, SessionResponse), AuthError> {
    let claims = auth_state.service().signer().verify_refresh(refresh_token)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::SessionExpired)?;
    let token_id = Uuid::parse_str(&claims.token_id).map_err(|_| AuthError::SessionExpired)?;

    let grant = auth_state
        .service()
        .refresh(user_id, refresh_token, token_id)
        .await?;

    let mut headers = HeaderMap::new();
    set_session_cookies(&mut headers, auth_state.config(), &grant.tokens)
        .map_err(|err| AuthError::Dependency(anyhow::Error::new(err)))?;

    Ok((
        headers,
        SessionResponse {
            id: grant.user_id.to_string(),
            user_type: grant.user_type,
        },
    ))
}

/// Revoke the session named by the refresh cookie and clear both cookies.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Cookies cleared; the session row is gone", body = MessageResponse),
        (status = 401, description = "No valid session")
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    if let Some(refresh_token) = cookie_value(&headers, REFRESH_COOKIE_NAME) {
        if let Err(err) = auth_state.service().logout(&refresh_token).await {
            error!("Failed to revoke session: {err:?}");
        }
    }

    // Always clear the cookies, even if the session row was already gone.
    let mut response_headers = HeaderMap::new();
    clear_session_cookies(&mut response_headers, auth_state.config());
    (
        StatusCode::OK,
        response_headers,
        Json(MessageResponse {
            message: "Logged Out Successfully".to_string(),
        }),
    )
        .into_response()
}

/// Revoke every session/device for the authenticated user.
#[utoipa::path(
    post,
    path = "/auth/logoutall",
    responses(
        (status = 200, description = "All sessions revoked, cookies cleared", body = MessageResponse),
        (status = 401, description = "No valid session")
    ),
    tag = "auth"
)]
pub async fn logout_all(
    principal: Option<Extension<Principal>>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let Some(Extension(principal)) = principal else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match auth_state.service().logout_all(principal.user_id).await {
        Ok(_) => {
            let mut response_headers = HeaderMap::new();
            clear_session_cookies(&mut response_headers, auth_state.config());
            (
                StatusCode::OK,
                response_headers,
                Json(MessageResponse {
                    message: "Logged Out From All Devices".to_string(),
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

/// Build a secure `HttpOnly` cookie for one of the session tokens.
fn session_cookie(
    name: &str,
    value: &str,
    max_age_seconds: i64,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Append both session cookies to a response.
pub(crate) fn set_session_cookies(
    headers: &mut HeaderMap,
    config: &AuthConfig,
    tokens: &TokenPair,
) -> Result<(), InvalidHeaderValue> {
    let secure = config.cookie_secure();
    headers.append(
        SET_COOKIE,
        session_cookie(
            ACCESS_COOKIE_NAME,
            &tokens.access_token,
            config.access_ttl_seconds(),
            secure,
        )?,
    );
    headers.append(
        SET_COOKIE,
        session_cookie(
            REFRESH_COOKIE_NAME,
            &tokens.refresh_token,
            config.refresh_ttl_seconds(),
            secure,
        )?,
    );
    Ok(())
}

/// Append expired cookies so the browser drops both tokens.
pub(crate) fn clear_session_cookies(headers: &mut HeaderMap, config: &AuthConfig) {
    let secure = config.cookie_secure();
    for name in [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME] {
        if let Ok(cookie) = session_cookie(name, "", 0, secure) {
            headers.append(SET_COOKIE, cookie);
        }
    }
}

/// Extract a named cookie from the request headers.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}
