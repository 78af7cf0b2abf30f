use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{AuthApi, AuthError, SignInRequest, SignUpRequest, UsernameAvailability};

const SIGNUP_PATH: &str = "/api/auth/signup";
const SIGNIN_PATH: &str = "/api/auth/signin";
const ME_PATH: &str = "/api/auth/me";
const CHECK_USERNAME_PATH: &str = "/api/auth/check-username";

type SharedAuth = Arc<dyn AuthApi>;

/// Mount the authentication endpoints over an `AuthApi` implementation.
pub fn routes(auth: SharedAuth) -> Router {
    Router::new()
        .route(SIGNUP_PATH, post(sign_up))
        .route(SIGNIN_PATH, post(sign_in))
        .route(ME_PATH, get(current_user))
        .route(CHECK_USERNAME_PATH, get(check_username))
        .with_state(auth)
}

fn require(value: &str, message: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::Validation(message.to_string()))
    } else {
        Ok(())
    }
}

/// Turn an extractor rejection into the structured validation error.
fn malformed(rejection: impl std::fmt::Display, path: &str) -> Response {
    tracing::debug!(path = %path, error = %rejection, "Malformed request");
    AuthError::Validation(format!("malformed request: {}", rejection)).respond(path)
}

async fn sign_up(
    State(auth): State<SharedAuth>,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return malformed(rejection.body_text(), SIGNUP_PATH),
    };
    let checks = require(&request.username, "username is required")
        .and_then(|_| require(&request.email, "email is required"))
        .and_then(|_| require(&request.password, "password is required"))
        .and_then(|_| require(&request.first_name, "first name is required"))
        .and_then(|_| require(&request.last_name, "last name is required"));
    if let Err(e) = checks {
        tracing::debug!(error = %e, "Rejected sign-up request");
        return e.respond(SIGNUP_PATH);
    }

    let username = request.username.clone();
    match auth.sign_up(request).await {
        Ok(response) => {
            tracing::info!(username = %username, "User registered");
            Json(response).into_response()
        }
        Err(e) => {
            tracing::warn!(username = %username, error = %e, "Sign-up failed");
            e.respond(SIGNUP_PATH)
        }
    }
}

async fn sign_in(
    State(auth): State<SharedAuth>,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return malformed(rejection.body_text(), SIGNIN_PATH),
    };
    let checks = require(&request.username_or_email, "username or email is required")
        .and_then(|_| require(&request.password, "password is required"));
    if let Err(e) = checks {
        return e.respond(SIGNIN_PATH);
    }

    let login = request.username_or_email.clone();
    match auth.sign_in(request).await {
        Ok(response) => {
            tracing::info!(login = %login, "User signed in");
            Json(response).into_response()
        }
        Err(e) => {
            tracing::warn!(login = %login, error = %e, "Sign-in failed");
            e.respond(SIGNIN_PATH)
        }
    }
}

async fn current_user(State(auth): State<SharedAuth>, headers: HeaderMap) -> Response {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return AuthError::Unauthorized("invalid authorization header".into()).respond(ME_PATH);
    };

    match auth.current_user(token).await {
        Ok(user) => Json(user).into_response(),
        Err(e) => e.respond(ME_PATH),
    }
}

#[derive(Debug, Deserialize)]
struct UsernameQuery {
    #[serde(default)]
    username: String,
}

async fn check_username(
    State(auth): State<SharedAuth>,
    query: Result<Query<UsernameQuery>, QueryRejection>,
) -> Response {
    let username = match query {
        Ok(Query(query)) => query.username,
        Err(rejection) => return malformed(rejection.body_text(), CHECK_USERNAME_PATH),
    };
    let trimmed = username.trim();
    if trimmed.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(UsernameAvailability { available: false, username }),
        )
            .into_response();
    }

    let available = match auth.is_username_available(trimmed).await {
        Ok(available) => available,
        Err(e) => {
            tracing::error!(username = %trimmed, error = %e, "Username availability check failed");
            false
        }
    };
    Json(UsernameAvailability { available, username }).into_response()
}
