//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
/// Stores a shared cursor to rotate through backends in pool order.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: Backend> LoadBalancer<B> for RoundRobin {
    fn next_server(&self, backends: &[Arc<B>]) -> Option<Arc<B>> {
        let len = backends.len();
        if len == 0 {
            return None;
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);

        for i in 0..len {
            let index = start.wrapping_add(i) % len;
            let backend = &backends[index];
            if backend.is_alive() {
                if i > 0 {
                    // Dead backends were skipped: resume right after the chosen one.
                    // Concurrent callers may overwrite each other here; that only costs a rescan.
                    self.counter.store(index + 1, Ordering::Relaxed);
                }
                return Some(Arc::clone(backend));
            }
        }
        None
    }
}
