//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Track liveness (written by health probes and failed forwards)
//! - Forward a request to the upstream and stream the response back
//! - Probe the upstream with a bare TCP connect

use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, uri::Scheme, HeaderMap, Request, Response, Uri, Version};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpStream;
use url::Url;

use crate::load_balancer::PoolError;

/// Shared upstream client. Cloning is cheap and shares the connection pool.
pub type HttpClient = Client<HttpConnector, Body>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Headers that only make sense for a single hop.
const HOP_BY_HOP: [header::HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HeaderName::from_static("keep-alive"),
];

/// Build the client used for upstream forwarding.
pub fn http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Kind of upstream protocol a pool speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Http,
}

impl FromStr for BackendKind {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(BackendKind::Http)
        } else {
            Err(PoolError::UnsupportedType(s.to_string()))
        }
    }
}

/// Why a backend address was rejected.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error(transparent)]
    Parse(#[from] url::ParseError),

    #[error("unsupported scheme {0:?}, expected http")]
    Scheme(String),

    #[error("address has no host")]
    MissingHost,
}

/// Failure to get a response out of an upstream.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("upstream transport error: {0}")]
    Transport(#[source] BoxError),
}

impl ForwardError {
    /// Transport failures say something about the backend and trigger failover.
    pub fn is_transport(&self) -> bool {
        matches!(self, ForwardError::Transport(_))
    }
}

/// Failed TCP probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connect to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Capabilities the pool needs from an upstream.
pub trait Backend: Send + Sync + 'static {
    fn is_alive(&self) -> bool;

    fn set_alive(&self, alive: bool);

    /// Stable identifier for logs and metrics.
    fn label(&self) -> &str;

    /// Send the request upstream. The request URI only carries path and query.
    fn forward(
        &self,
        request: Request<Body>,
    ) -> impl Future<Output = Result<Response<Body>, ForwardError>> + Send;

    /// `Ok` means the upstream accepted a connection within `timeout`.
    fn check_health(&self, timeout: Duration) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// An upstream reached over plain HTTP.
#[derive(Debug)]
pub struct HttpBackend {
    /// Path prefix from the configured URL, without trailing slash.
    base_path: String,
    /// `host:port`, used both as label and as dial target.
    authority: String,
    alive: AtomicBool,
    client: HttpClient,
}

impl HttpBackend {
    /// Parse `raw` and build a backend that starts out alive.
    pub fn new(raw: &str, client: HttpClient) -> Result<Self, AddressError> {
        let url = Url::parse(raw)?;
        if url.scheme() != "http" {
            return Err(AddressError::Scheme(url.scheme().to_string()));
        }
        let host = url.host_str().ok_or(AddressError::MissingHost)?;
        // host_str keeps the brackets around IPv6 literals.
        let authority = format!("{}:{}", host, url.port_or_known_default().unwrap_or(80));

        Ok(Self {
            base_path: url.path().trim_end_matches('/').to_string(),
            authority,
            alive: AtomicBool::new(true),
            client,
        })
    }

    /// Point the request at this upstream and drop per-hop headers.
    fn rewrite(&self, request: Request<Body>) -> Result<Request<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        parts.uri = Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.as_str())
            .path_and_query(format!("{}{}", self.base_path, path_and_query))
            .build()?;
        parts.version = Version::HTTP_11;

        strip_hop_headers(&mut parts.headers);
        // The client derives Host from the URI.
        parts.headers.remove(header::HOST);

        Ok(Request::from_parts(parts, body))
    }
}

fn strip_hop_headers(headers: &mut HeaderMap) {
    // Headers listed in Connection are hop-by-hop too.
    let listed: Vec<header::HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| header::HeaderName::from_str(name.trim()).ok())
        .collect();
    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("proxy-connection");
}

impl Backend for HttpBackend {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    fn label(&self) -> &str {
        &self.authority
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let request = self.rewrite(request)?;
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ForwardError::Transport(Box::new(e)))?;

        let (parts, body) = response.into_parts();
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    async fn check_health(&self, timeout: Duration) -> Result<(), ProbeError> {
        match tokio::time::timeout(timeout, TcpStream::connect(self.authority.as_str())).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(source)) => Err(ProbeError::Connect {
                addr: self.authority.clone(),
                source,
            }),
            Err(_) => Err(ProbeError::Timeout {
                addr: self.authority.clone(),
                timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_address() {
        let b = HttpBackend::new("http://127.0.0.1:3000", http_client()).unwrap();
        assert_eq!(b.label(), "127.0.0.1:3000");
        assert!(b.is_alive());

        let b = HttpBackend::new("http://backend.local", http_client()).unwrap();
        assert_eq!(b.label(), "backend.local:80");
    }

    #[test]
    fn test_reject_bad_addresses() {
        assert!(matches!(
            HttpBackend::new("not a url", http_client()),
            Err(AddressError::Parse(_))
        ));
        assert!(matches!(
            HttpBackend::new("https://127.0.0.1:3000", http_client()),
            Err(AddressError::Scheme(_))
        ));
    }

    #[test]
    fn test_backend_kind() {
        assert_eq!("HTTP".parse::<BackendKind>().unwrap(), BackendKind::Http);
        assert!(matches!(
            "grpc".parse::<BackendKind>(),
            Err(PoolError::UnsupportedType(kind)) if kind == "grpc"
        ));
    }

    #[test]
    fn test_liveness_toggle() {
        let b = HttpBackend::new("http://127.0.0.1:3000", http_client()).unwrap();
        b.set_alive(false);
        assert!(!b.is_alive());
        b.set_alive(true);
        assert!(b.is_alive());
    }

    #[test]
    fn test_rewrite_targets_upstream() {
        let b = HttpBackend::new("http://127.0.0.1:3000/api/", http_client()).unwrap();
        let request = Request::builder()
            .uri("/users?page=2")
            .header(header::HOST, "lb.example")
            .header(header::CONNECTION, "keep-alive, x-hop")
            .header("x-hop", "1")
            .header("x-kept", "1")
            .body(Body::empty())
            .unwrap();

        let rewritten = b.rewrite(request).unwrap();
        assert_eq!(
            rewritten.uri().to_string(),
            "http://127.0.0.1:3000/api/users?page=2"
        );
        assert!(rewritten.headers().get(header::HOST).is_none());
        assert!(rewritten.headers().get(header::CONNECTION).is_none());
        assert!(rewritten.headers().get("x-hop").is_none());
        assert!(rewritten.headers().get("x-kept").is_some());
    }

    #[tokio::test]
    async fn test_check_health() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let b = HttpBackend::new(&format!("http://{}", addr), http_client()).unwrap();
        assert!(b.check_health(Duration::from_secs(1)).await.is_ok());

        drop(listener);
        assert!(b.check_health(Duration::from_secs(1)).await.is_err());
    }
}
