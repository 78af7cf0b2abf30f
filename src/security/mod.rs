//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client.rs (resolve client identifier)
//!     → rate_limit.rs (fixed-window admission per client:path)
//!     → downstream pipeline
//! Outgoing response:
//!     → rate_limit.rs (X-RateLimit-* headers)
//!     → headers.rs (static security headers)
//!
//! Background:
//!     sweeper.rs evicts expired counters
//! ```
//!
//! # Design Decisions
//! - Limiter state is an owned handle injected through axum state
//! - Identifier resolution never fails; it degrades to the peer address
//! - Rejections are expected traffic, logged at warn, not treated as faults

pub mod client;
pub mod clock;
pub mod headers;
pub mod rate_limit;
pub mod sweeper;
pub mod testing;

pub use clock::{Clock, SystemClock};
pub use headers::SecurityHeaders;
pub use rate_limit::{rate_limit_middleware, Decision, RateLimiter, RequestClass, RATE_LIMIT_MESSAGE};
pub use sweeper::CounterSweeper;
