//! Authentication collaborator interface.
//!
//! The gateway never validates credentials or issues tokens itself. This
//! module describes the service it fronts so an in-process implementation
//! can be mounted behind the rate limiter in place of the upstream proxy.

pub mod handlers;

use async_trait::async_trait;
use axum::{http::StatusCode, response::Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorResponse;

pub use handlers::routes;

#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignInRequest {
    pub username_or_email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UsernameAvailability {
    pub available: bool,
    pub username: String,
}

/// Domain errors of the authentication service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("username is already taken")]
    DuplicateUsername,
    #[error("email is already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is not active")]
    InactiveAccount,
    #[error("{0}")]
    Unauthorized(String),
    #[error("user not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_ERROR",
            AuthError::DuplicateUsername => "USERNAME_TAKEN",
            AuthError::DuplicateEmail => "EMAIL_TAKEN",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InactiveAccount => "ACCOUNT_INACTIVE",
            AuthError::Unauthorized(_) => "UNAUTHORIZED",
            AuthError::NotFound => "USER_NOT_FOUND",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::DuplicateUsername | AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::InactiveAccount => StatusCode::FORBIDDEN,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render as the structured error body, tagged with the request path.
    pub fn respond(&self, path: &str) -> Response {
        // Internal details stay in the logs.
        let message = match self {
            AuthError::Internal(_) => "Something went wrong on the server. Please try again.".to_string(),
            other => other.to_string(),
        };
        ErrorResponse::new(self.code(), message, path).with_status(self.status())
    }
}

/// The authentication API the gateway sits in front of.
#[async_trait]
pub trait AuthApi: Send + Sync + 'static {
    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthResponse, AuthError>;

    async fn sign_in(&self, request: SignInRequest) -> Result<AuthResponse, AuthError>;

    async fn is_username_available(&self, username: &str) -> Result<bool, AuthError>;

    async fn current_user(&self, token: &str) -> Result<UserSummary, AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_statuses() {
        let cases = [
            (AuthError::Validation("x".into()), "VALIDATION_ERROR", StatusCode::BAD_REQUEST),
            (AuthError::DuplicateUsername, "USERNAME_TAKEN", StatusCode::CONFLICT),
            (AuthError::DuplicateEmail, "EMAIL_TAKEN", StatusCode::CONFLICT),
            (AuthError::InvalidCredentials, "INVALID_CREDENTIALS", StatusCode::UNAUTHORIZED),
            (AuthError::InactiveAccount, "ACCOUNT_INACTIVE", StatusCode::FORBIDDEN),
            (AuthError::NotFound, "USER_NOT_FOUND", StatusCode::NOT_FOUND),
            (AuthError::Internal("db".into()), "INTERNAL_ERROR", StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, code, status) in cases {
            assert_eq!(error.code(), code);
            assert_eq!(error.status(), status);
            assert_eq!(error.respond("/api/auth/signin").status(), status);
        }
    }

    #[test]
    fn test_sign_up_request_reads_camel_case() {
        let request: SignUpRequest = serde_json::from_str(
            r#"{"username":"ana","email":"ana@example.com","password":"pw","firstName":"Ana","lastName":"Ilic"}"#,
        )
        .unwrap();
        assert_eq!(request.first_name, "Ana");
        assert_eq!(request.last_name, "Ilic");

        let partial: SignInRequest = serde_json::from_str(r#"{"password":"pw"}"#).unwrap();
        assert!(partial.username_or_email.is_empty());
    }
}
