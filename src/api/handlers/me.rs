//! Authenticated self-service endpoint backed by the session cache.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use super::auth::error_response;
use super::auth::state::AuthState;
use crate::api::guard::Principal;
use crate::auth::CachedProfile;

/// Cached-or-fresh profile for the authenticated user.
///
/// The first read populates the cache; later reads inside the TTL never
/// touch the store. Profile writers purge the entry synchronously, so a hit
/// is never staler than the last write.
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Return the authenticated user profile.", body = CachedProfile),
        (status = 401, description = "Missing or invalid access token."),
        (status = 404, description = "No user behind the session."),
    ),
    tag = "auth"
)]
pub async fn get_me(
    principal: Option<Extension<Principal>>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let Some(Extension(principal)) = principal else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match auth_state.service().get_me(principal.user_id).await {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => {
            let (status, message) = error_response(&err);
            (status, message).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::get_me;
    use crate::api::guard::RouteRules;
    use crate::api::handlers::auth::state::AuthState;
    use crate::auth::{
        AuthConfig, AuthService, CredentialStore, LogMailer, MemoryCache, TokenSigner,
    };
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
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
    async fn get_me_requires_principal() -> Result<()> {
        // The edge guard inserts the principal; without it the handler
        // answers 401 instead of guessing an identity.
        let response = get_me(None, Extension(auth_state()?)).await.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
