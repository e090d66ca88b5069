use crate::api::APP_USER_AGENT;
use axum::{http::StatusCode, response::IntoResponse};

// axum handler for the service banner
pub async fn root() -> impl IntoResponse {
    (StatusCode::OK, APP_USER_AGENT)
}
