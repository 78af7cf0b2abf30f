//! Static security response headers.
//!
//! The header set is disjoint from the rate-limit headers, so where this stage
//! sits relative to the limiter does not matter. It is installed outside the
//! limiter so 429 responses carry it too.

use axum::http::{header, header::InvalidHeaderValue, HeaderName, HeaderValue};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::SecurityConfig;

pub const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// The configured security headers, parsed once at startup.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn from_config(config: &SecurityConfig) -> Result<Self, InvalidHeaderValue> {
        let pairs = [
            (header::X_CONTENT_TYPE_OPTIONS, &config.content_type_options),
            (header::X_FRAME_OPTIONS, &config.frame_options),
            (header::X_XSS_PROTECTION, &config.xss_protection),
            (header::STRICT_TRANSPORT_SECURITY, &config.strict_transport_security),
            (header::CONTENT_SECURITY_POLICY, &config.content_security_policy),
            (header::REFERRER_POLICY, &config.referrer_policy),
            (PERMISSIONS_POLICY, &config.permissions_policy),
        ];

        let mut headers = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            headers.push((name, HeaderValue::from_str(value)?));
        }
        Ok(Self { headers })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(name, value)| (name, value))
    }

    /// Wrap every route of `router` so its responses carry the headers.
    pub fn apply(&self, router: Router) -> Router {
        self.headers.iter().fold(router, |router, (name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(name.clone(), value.clone()))
        })
    }
}
