//! Reverse proxy to the upstream authentication API.
//!
//! Forwards method, path, query, headers and body unchanged apart from the
//! target authority. A base path on the upstream URL is prefixed to every
//! forwarded path. Connection failures become a structured 502.

use std::str::FromStr;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, Scheme},
        HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::error::{ErrorResponse, GatewayError};

#[derive(Clone)]
pub struct UpstreamProxy {
    client: Client<HttpConnector, Body>,
    authority: Authority,
    base_path: String,
}

impl UpstreamProxy {
    pub fn new(url: &str, connect_timeout: Duration) -> Result<Self, GatewayError> {
        let url = Url::parse(url).map_err(|e| GatewayError::Upstream(format!("{}: {}", url, e)))?;
        if url.scheme() != "http" {
            return Err(GatewayError::Upstream(format!("unsupported scheme '{}'", url.scheme())));
        }
        let host = url
            .host()
            .ok_or_else(|| GatewayError::Upstream(format!("{} has no host", url)))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let authority = Authority::from_str(&format!("{}:{}", host, port))
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;

        let base_path = url.path().trim_end_matches('/').to_string();

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            authority,
            base_path,
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Path and query sent upstream for an inbound request target.
    pub fn upstream_target(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_path, path_and_query)
    }

    /// A router that forwards every request it receives.
    pub fn into_router(self) -> Router {
        Router::new().fallback(proxy_handler).with_state(self)
    }

    pub async fn forward(&self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();
        let path = parts.uri.path().to_string();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = self.upstream_target(path_and_query);
        let uri = match Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(target)
            .build()
        {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Could not build upstream URI");
                return ErrorResponse::new("BAD_REQUEST", "Malformed request target", path)
                    .with_status(StatusCode::BAD_REQUEST);
            }
        };
        parts.uri = uri;
        if let Ok(host) = HeaderValue::from_str(self.authority.as_str()) {
            parts.headers.insert(header::HOST, host);
        }

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => response.map(Body::new).into_response(),
            Err(e) => {
                tracing::error!(upstream = %self.authority, path = %path, error = %e, "Upstream error");
                ErrorResponse::new(
                    "UPSTREAM_UNAVAILABLE",
                    "Authentication service is unavailable",
                    path,
                )
                .with_status(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

async fn proxy_handler(State(proxy): State<UpstreamProxy>, request: Request<Body>) -> Response {
    proxy.forward(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_authority_from_url() {
        let proxy = UpstreamProxy::new("http://127.0.0.1:9000/base", Duration::from_secs(1)).unwrap();
        assert_eq!(proxy.authority().as_str(), "127.0.0.1:9000");

        let proxy = UpstreamProxy::new("http://auth.internal", Duration::from_secs(1)).unwrap();
        assert_eq!(proxy.authority().as_str(), "auth.internal:80");
    }

    #[tokio::test]
    async fn test_base_path_prefixes_forwarded_target() {
        let proxy = UpstreamProxy::new("http://127.0.0.1:9000/base/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            proxy.upstream_target("/api/auth/signin?x=1"),
            "/base/api/auth/signin?x=1"
        );

        let proxy = UpstreamProxy::new("http://127.0.0.1:9000", Duration::from_secs(1)).unwrap();
        assert_eq!(proxy.upstream_target("/api/auth/me"), "/api/auth/me");
    }

    #[tokio::test]
    async fn test_rejects_unsupported_upstream() {
        assert!(UpstreamProxy::new("https://auth.internal", Duration::from_secs(1)).is_err());
        assert!(UpstreamProxy::new("not a url", Duration::from_secs(1)).is_err());
    }
}
