//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends
//! - Stop when the shutdown coordinator fires

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::load_balancer::{Backend, BackendPool};

pub struct HealthMonitor<B> {
    pool: Arc<BackendPool<B>>,
    interval: Duration,
    timeout: Duration,
}

impl<B: Backend> HealthMonitor<B> {
    pub fn new(pool: Arc<BackendPool<B>>, interval: Duration, timeout: Duration) -> Self {
        Self {
            pool,
            interval,
            timeout,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            timeout = ?self.timeout,
            "Health monitor starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.pool.health_check(self.timeout) => {}
                        _ = shutdown.recv() => {
                            tracing::info!("Health monitor received shutdown signal mid-check, exiting loop");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
