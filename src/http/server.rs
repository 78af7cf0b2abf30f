//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compose the request pipeline around a downstream router
//! - Wire up middleware (request ID, tracing, metrics, security headers,
//!   timeouts, body limit, rate limiting)
//! - Bind the server to a listener and drain on shutdown
//! - Run the counter sweeper alongside the server

use std::net::SocketAddr;
use std::time::Duration;

use axum::{middleware, response::IntoResponse, routing::get, Json, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::http::proxy::UpstreamProxy;
use crate::http::request::UuidRequestId;
use crate::observability::metrics;
use crate::security::{rate_limit_middleware, CounterSweeper, RateLimiter, SecurityHeaders};

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    limiter: RateLimiter,
}

impl GatewayServer {
    /// Create a gateway that forwards admitted requests to `config.upstream`.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let proxy = UpstreamProxy::new(
            &config.upstream.url,
            Duration::from_secs(config.timeouts.connect_secs),
        )?;
        let limiter = RateLimiter::new(&config.rate_limit);
        Self::with_downstream(config, limiter, proxy.into_router())
    }

    /// Create a gateway in front of an arbitrary downstream router.
    pub fn with_downstream(config: GatewayConfig, limiter: RateLimiter, downstream: Router) -> Result<Self> {
        let router = build_router(&config, limiter.clone(), downstream)?;
        Ok(Self {
            router,
            config,
            limiter,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            default_limit = self.config.rate_limit.default_limit,
            privileged_limit = self.config.rate_limit.privileged_limit,
            window_ms = self.config.rate_limit.window_ms,
            "HTTP server starting"
        );

        if self.limiter.is_enabled() {
            let sweeper = CounterSweeper::new(
                self.limiter.clone(),
                Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            );
            let sweeper_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                sweeper.run(sweeper_shutdown).await;
            });
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the full pipeline around `downstream`.
///
/// Layers, outermost first: request id, trace, metrics, security headers,
/// timeout, body limit, rate limiter. `/health` bypasses the rate limiter.
#[allow(deprecated)]
pub fn build_router(config: &GatewayConfig, limiter: RateLimiter, downstream: Router) -> Result<Router> {
    let mut router = downstream
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .route("/health", get(health_handler))
        .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

    if config.security.enable_headers {
        router = SecurityHeaders::from_config(&config.security)?.apply(router);
    }

    Ok(router
        .layer(middleware::from_fn(metrics::track_requests))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId)))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
