//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use auth_gateway::auth::{
    AuthApi, AuthError, AuthResponse, SignInRequest, SignUpRequest, UserSummary,
};
use auth_gateway::config::GatewayConfig;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const PEER: &str = "10.1.1.1:50000";

/// Config with metrics disabled and the given limits.
pub fn config(default_limit: u32, privileged_limit: u32) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.default_limit = default_limit;
    config.rate_limit.privileged_limit = privileged_limit;
    config.observability.metrics_enabled = false;
    config
}

/// A request carrying the peer address `into_make_service_with_connect_info` would attach.
pub fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(PEER.parse::<SocketAddr>().unwrap()))
}

pub fn get(uri: &str) -> Request<Body> {
    request("GET", uri).body(Body::empty()).unwrap()
}

pub fn get_from(uri: &str, client: &str) -> Request<Body> {
    request("GET", uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, json: serde_json::Value) -> Request<Body> {
    request("POST", uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// In-memory stand-in for the authentication service.
///
/// Knows one active user `ana` / `secret` and one inactive user `mile`.
pub struct MockAuth;

pub const TOKEN: &str = "token-ana";

fn ana() -> UserSummary {
    UserSummary {
        id: 1,
        username: "ana".into(),
        email: "ana@example.com".into(),
        first_name: "Ana".into(),
        last_name: "Ilic".into(),
        role: "USER".into(),
        is_active: true,
    }
}

#[async_trait]
impl AuthApi for MockAuth {
    async fn sign_up(&self, request: SignUpRequest) -> Result<AuthResponse, AuthError> {
        if request.username == "ana" {
            return Err(AuthError::DuplicateUsername);
        }
        if request.email == "ana@example.com" {
            return Err(AuthError::DuplicateEmail);
        }
        Ok(AuthResponse {
            token: format!("token-{}", request.username),
            user: UserSummary {
                id: 2,
                username: request.username,
                email: request.email,
                first_name: request.first_name,
                last_name: request.last_name,
                role: "USER".into(),
                is_active: true,
            },
        })
    }

    async fn sign_in(&self, request: SignInRequest) -> Result<AuthResponse, AuthError> {
        match (request.username_or_email.as_str(), request.password.as_str()) {
            ("ana" | "ana@example.com", "secret") => Ok(AuthResponse {
                token: TOKEN.into(),
                user: ana(),
            }),
            ("mile", "secret") => Err(AuthError::InactiveAccount),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn is_username_available(&self, username: &str) -> Result<bool, AuthError> {
        match username {
            "broken" => Err(AuthError::Internal("database unavailable".into())),
            other => Ok(other != "ana" && other != "mile"),
        }
    }

    async fn current_user(&self, token: &str) -> Result<UserSummary, AuthError> {
        if token == TOKEN {
            Ok(ana())
        } else {
            Err(AuthError::Unauthorized("invalid token".into()))
        }
    }
}

pub fn mock_auth() -> Arc<dyn AuthApi> {
    Arc::new(MockAuth)
}

/// Start a mock upstream that answers every request with 200 and echoes the
/// request line and selected headers in the body.
pub async fn start_echo_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = vec![0u8; 8192];
                        let n = socket.read(&mut buf).await.unwrap_or(0);
                        let head = String::from_utf8_lossy(&buf[..n]).to_string();
                        let request_line = head.lines().next().unwrap_or_default().to_string();
                        let request_id = head
                            .lines()
                            .find_map(|l| {
                                let (name, value) = l.split_once(':')?;
                                name.eq_ignore_ascii_case("x-request-id").then(|| value.trim().to_string())
                            })
                            .unwrap_or_default();
                        let body = format!("{}\n{}", request_line, request_id);
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
