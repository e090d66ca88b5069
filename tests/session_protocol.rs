//! Edge-guard and session-check behavior over the HTTP surface.
//!
//! Every path exercised here stays on the local-verification tier or the
//! cache, so the lazy pool proves no store round trip happens on the fast
//! path.

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::header::SET_COOKIE;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{middleware, Extension, Router};
use secrecy::SecretString;
use soglia::api::{guard, AuthState, RouteRole, RouteRules};
use soglia::auth::{
    AuthConfig, AuthService, CachedProfile, CredentialStore, LogMailer, MemoryCache, ProfileCache,
    TokenPair, TokenSigner, UserType, ValidatedUser,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

fn config() -> AuthConfig {
    AuthConfig::new(
        SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
        SecretString::from("fedcba9876543210fedcba9876543210".to_string()),
    )
}

fn validated_user(id: Uuid, user_type: UserType) -> ValidatedUser {
    ValidatedUser {
        id,
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        user_type,
        is_verified: true,
        hashed_otp: None,
        otp_expires_at: None,
        otp_created_at: None,
    }
}

fn cached_profile(id: Uuid) -> CachedProfile {
    CachedProfile {
        id: id.to_string(),
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        user_type: UserType::User,
        is_verified: true,
        display_name: "alice".to_string(),
        avatar_url: None,
        bio: None,
        created_at: "2025-01-01T00:00:00Z".to_string(),
        updated_at: "2025-01-01T00:00:00Z".to_string(),
    }
}

fn build_state(
    config: AuthConfig,
    cache: Arc<MemoryCache>,
    rules: RouteRules,
) -> Result<Arc<AuthState>> {
    let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
    let service = AuthService::new(
        CredentialStore::new(pool),
        TokenSigner::new(&config),
        cache,
        Arc::new(LogMailer),
        config,
    );
    Ok(Arc::new(AuthState::new(service, rules)))
}

fn default_rules() -> RouteRules {
    RouteRules::new()
        .require("/auth/me", RouteRole::User)
        .require("/auth/logout", RouteRole::User)
        .require("/auth/logoutall", RouteRole::User)
        .require("/admin", RouteRole::Admin)
}

fn app(auth_state: Arc<AuthState>) -> Router {
    let (router, _spec) = soglia::api::router().split_for_parts();
    router
        .route("/admin/ping", get(|| async { "pong" }))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            guard::edge_guard,
        ))
        .layer(Extension(auth_state))
}

fn pair_for(config: &AuthConfig, user: &ValidatedUser) -> Result<TokenPair> {
    Ok(TokenSigner::new(config).generate_pair(user, Uuid::new_v4())?)
}

async fn body_string(response: axum::response::Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

#[tokio::test]
async fn me_without_cookie_is_unauthorized() -> Result<()> {
    let state = build_state(config(), Arc::new(MemoryCache::new()), default_rules())?;
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/me")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn me_with_valid_cookie_returns_cached_profile() -> Result<()> {
    let config = config();
    let cache = Arc::new(MemoryCache::new());
    let user_id = Uuid::new_v4();
    cache
        .set(user_id, &cached_profile(user_id), Duration::from_secs(60))
        .await?;

    let user = validated_user(user_id, UserType::User);
    let pair = pair_for(&config, &user)?;
    let state = build_state(config, cache, default_rules())?;

    let response = app(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/me")
                .header("cookie", format!("access_token={}", pair.access_token))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await?;
    let profile: serde_json::Value = serde_json::from_str(&body)?;
    assert_eq!(profile["username"], "alice");
    assert_eq!(profile["id"], user_id.to_string());
    Ok(())
}

#[tokio::test]
async fn me_with_expired_access_token_is_unauthorized() -> Result<()> {
    let expired_config = config().with_access_ttl_seconds(-10);
    let user = validated_user(Uuid::new_v4(), UserType::User);
    let pair = pair_for(&expired_config, &user)?;

    let state = build_state(expired_config, Arc::new(MemoryCache::new()), default_rules())?;
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/me")
                .header("cookie", format!("access_token={}", pair.access_token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn admin_route_rejects_plain_users() -> Result<()> {
    let config = config();
    let user_pair = pair_for(&config, &validated_user(Uuid::new_v4(), UserType::User))?;
    let admin_pair = pair_for(&config, &validated_user(Uuid::new_v4(), UserType::Admin))?;
    let state = build_state(config, Arc::new(MemoryCache::new()), default_rules())?;
    let app = app(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/admin/ping")
                .header("cookie", format!("access_token={}", user_pair.access_token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/admin/ping")
                .header("cookie", format!("access_token={}", admin_pair.access_token))
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn session_without_cookies_reports_no_session() -> Result<()> {
    let state = build_state(config(), Arc::new(MemoryCache::new()), default_rules())?;
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/session")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await?, "No Session");
    Ok(())
}

#[tokio::test]
async fn session_fast_path_returns_identity_without_rotating() -> Result<()> {
    let config = config();
    let user = validated_user(Uuid::new_v4(), UserType::Admin);
    let pair = pair_for(&config, &user)?;
    let state = build_state(config, Arc::new(MemoryCache::new()), default_rules())?;

    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/session")
                .header("cookie", format!("access_token={}", pair.access_token))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    // Fast path: no cookies are rotated.
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body: serde_json::Value = serde_json::from_str(&body_string(response).await?)?;
    assert_eq!(body["id"], user.id.to_string());
    assert_eq!(body["userType"], "ADMIN");
    Ok(())
}

#[tokio::test]
async fn session_with_bad_access_and_no_refresh_is_invalid() -> Result<()> {
    let state = build_state(config(), Arc::new(MemoryCache::new()), default_rules())?;
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/session")
                .header("cookie", "access_token=garbage")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await?, "Session Invalid");
    Ok(())
}

#[tokio::test]
async fn session_with_expired_refresh_reports_expired() -> Result<()> {
    let expired_config = config().with_refresh_ttl_seconds(-10);
    let user = validated_user(Uuid::new_v4(), UserType::User);
    let pair = pair_for(&expired_config, &user)?;

    let state = build_state(expired_config, Arc::new(MemoryCache::new()), default_rules())?;
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/session")
                .header(
                    "cookie",
                    format!(
                        "access_token=garbage; refresh_token={}",
                        pair.refresh_token
                    ),
                )
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_string(response).await?, "Session Expired");
    Ok(())
}

#[tokio::test]
async fn logout_clears_both_cookies() -> Result<()> {
    let config = config();
    let user = validated_user(Uuid::new_v4(), UserType::User);
    let pair = pair_for(&config, &user)?;
    let state = build_state(config, Arc::new(MemoryCache::new()), default_rules())?;

    // A malformed refresh cookie: revocation decodes nothing, deletes
    // nothing, and the endpoint still clears both cookies.
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(
                    "cookie",
                    format!(
                        "access_token={}; refresh_token=garbage",
                        pair.access_token
                    ),
                )
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
    assert_eq!(cookies.len(), 2);
    for cookie in cookies {
        assert!(cookie.to_str()?.contains("Max-Age=0"));
    }
    Ok(())
}

#[tokio::test]
async fn logout_without_access_token_is_guarded() -> Result<()> {
    let state = build_state(config(), Arc::new(MemoryCache::new()), default_rules())?;
    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
