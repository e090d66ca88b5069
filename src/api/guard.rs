//! Edge session guard: local access-token verification ahead of the
//! handlers, with no store access.
//!
//! Guarded paths are declared in an explicit [`RouteRules`] table consulted
//! by an ordinary middleware function. On success the request gains a
//! [`Principal`] extension; on failure the client gets 401/403 and recovers
//! through the authoritative `POST /auth/session` endpoint.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use super::handlers::auth::session::{cookie_value, ACCESS_COOKIE_NAME};
use super::handlers::auth::state::AuthState;
use crate::auth::UserType;

/// Role a guarded route requires.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RouteRole {
    User,
    Admin,
}

/// Explicit path-prefix → required-role table.
#[derive(Clone, Debug, Default)]
pub struct RouteRules {
    rules: Vec<(String, RouteRole)>,
}

impl RouteRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn require(mut self, prefix: &str, role: RouteRole) -> Self {
        self.rules.push((prefix.to_string(), role));
        self
    }

    /// Longest matching prefix wins, so a nested admin prefix can tighten a
    /// broader user-level one.
    #[must_use]
    pub fn required_role(&self, path: &str) -> Option<RouteRole> {
        self.rules
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, role)| *role)
    }
}

/// Authenticated identity derived from a locally verified access token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub user_type: UserType,
}

pub async fn edge_guard(
    State(state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(required) = state.rules().required_role(request.uri().path()) else {
        return next.run(request).await;
    };

    let Some(token) = cookie_value(request.headers(), ACCESS_COOKIE_NAME) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let Ok(claims) = state.service().signer().verify_access(&token) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    if required == RouteRole::Admin && claims.user_type != UserType::Admin {
        return StatusCode::FORBIDDEN.into_response();
    }

    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    request.extensions_mut().insert(Principal {
        user_id,
        username: claims.username,
        email: claims.email,
        user_type: claims.user_type,
    });

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::{RouteRole, RouteRules};

    #[test]
    fn unlisted_paths_pass_unguarded() {
        let rules = RouteRules::new().require("/auth/me", RouteRole::User);
        assert_eq!(rules.required_role("/auth/login"), None);
        assert_eq!(rules.required_role("/health"), None);
    }

    #[test]
    fn prefixes_cover_nested_paths() {
        let rules = RouteRules::new().require("/auth/logout", RouteRole::User);
        assert_eq!(
            rules.required_role("/auth/logout"),
            Some(RouteRole::User)
        );
        assert_eq!(
            rules.required_role("/auth/logoutall"),
            Some(RouteRole::User)
        );
    }

    #[test]
    fn longest_prefix_wins() {
        let rules = RouteRules::new()
            .require("/", RouteRole::User)
            .require("/admin", RouteRole::Admin);
        assert_eq!(rules.required_role("/admin/users"), Some(RouteRole::Admin));
        assert_eq!(rules.required_role("/profile"), Some(RouteRole::User));
    }
}
