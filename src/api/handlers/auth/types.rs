//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::UserType;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SendOtpRequest {
    pub username: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub id: String,
    #[serde(rename = "userType")]
    pub user_type: UserType,
}

#[cfg(test)]
mod tests {
    use super::{LoginRequest, SessionResponse};
    use crate::auth::UserType;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_round_trips() -> Result<()> {
        let request = LoginRequest {
            username: "alice".to_string(),
            password: "Str0ng!pw".to_string(),
            otp: "1234".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let otp = value
            .get("otp")
            .and_then(serde_json::Value::as_str)
            .context("missing otp")?;
        assert_eq!(otp, "1234");
        let decoded: LoginRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.username, "alice");
        Ok(())
    }

    #[test]
    fn session_response_uses_camel_case_user_type() -> Result<()> {
        let response = SessionResponse {
            id: "some-id".to_string(),
            user_type: UserType::Admin,
        };
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.get("userType").and_then(serde_json::Value::as_str),
            Some("ADMIN")
        );
        Ok(())
    }
}
