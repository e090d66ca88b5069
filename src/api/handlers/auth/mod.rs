//! Auth endpoints: registration, OTP dispatch, login, session checking, and
//! logout.

pub mod login;
pub mod register;
pub mod session;
pub mod state;
pub mod types;

use axum::http::StatusCode;
use tracing::error;

use crate::auth::AuthError;

/// Map core failures to a boundary status + message.
///
/// Dependency causes stay in the server log; clients only ever see the
/// uniform message of each class.
pub(crate) fn error_response(err: &AuthError) -> (StatusCode, String) {
    if let AuthError::Dependency(source) = err {
        error!("auth dependency failure: {source:#}");
    }

    let status = match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::InvalidOtp => StatusCode::FORBIDDEN,
        AuthError::OtpCooldown { .. } => StatusCode::BAD_REQUEST,
        AuthError::DuplicateUser => StatusCode::BAD_REQUEST,
        AuthError::AccessDenied => StatusCode::FORBIDDEN,
        AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
        AuthError::ProfileNotFound => StatusCode::NOT_FOUND,
        AuthError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, err.to_string())
}
