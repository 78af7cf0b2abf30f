//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → security (rate limiter, security headers)
//!     → proxy.rs (forward to the upstream auth API)
//!     → Send to client
//! ```

pub mod proxy;
pub mod request;
pub mod server;

pub use proxy::UpstreamProxy;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{build_router, GatewayServer};
