//! Shared state handed to auth handlers and the edge guard.

use crate::api::guard::RouteRules;
use crate::auth::{AuthConfig, AuthService};

pub struct AuthState {
    service: AuthService,
    rules: RouteRules,
}

impl AuthState {
    #[must_use]
    pub fn new(service: AuthService, rules: RouteRules) -> Self {
        Self { service, rules }
    }

    #[must_use]
    pub fn service(&self) -> &AuthService {
        &self.service
    }

    #[must_use]
    pub fn rules(&self) -> &RouteRules {
        &self.rules
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        self.service.config()
    }
}
