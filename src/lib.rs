//! Rate-limiting gateway in front of an authentication API.

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use error::{ErrorResponse, GatewayError};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use security::{Decision, RateLimiter};
