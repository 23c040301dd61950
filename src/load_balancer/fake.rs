//! In-memory backend for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::load_balancer::backend::{Backend, ForwardError, ProbeError};

#[derive(Debug)]
pub(crate) struct FakeBackend {
    name: String,
    alive: AtomicBool,
    /// Forwards fail with a transport error while set.
    pub failing: AtomicBool,
    /// Forwards never complete while set.
    pub stalled: AtomicBool,
    /// Probes succeed while set.
    pub reachable: AtomicBool,
    pub hits: AtomicUsize,
}

impl FakeBackend {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            alive: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            stalled: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn set(names: &[&str]) -> Vec<Arc<FakeBackend>> {
        names.iter().map(|n| Arc::new(FakeBackend::new(n))).collect()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Backend for FakeBackend {
    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    fn label(&self) -> &str {
        &self.name
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ForwardError::Transport("connection refused".into()));
        }
        let body = axum::body::to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|e| ForwardError::Transport(Box::new(e)))?;
        let mut echoed = self.name.clone().into_bytes();
        echoed.extend_from_slice(&body);
        Ok(Response::new(Body::from(echoed)))
    }

    async fn check_health(&self, _timeout: Duration) -> Result<(), ProbeError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProbeError::Connect {
                addr: self.name.clone(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            })
        }
    }
}
