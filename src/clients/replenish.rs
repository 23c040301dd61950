//! Token replenishment timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::clients::repository::ClientRepository;

/// Background task refilling every client's bucket on a fixed interval.
pub struct Replenisher {
    repo: Arc<dyn ClientRepository>,
    interval: Duration,
}

impl Replenisher {
    pub fn new(repo: Arc<dyn ClientRepository>, interval: Duration) -> Self {
        Self { repo, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Token replenisher starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.repo.replenish();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Token replenisher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MemoryRepository;

    #[tokio::test(start_paused = true)]
    async fn test_refills_on_tick_and_stops() {
        let repo = Arc::new(MemoryRepository::new(5, 1));
        assert!(repo.consume("ip", 5));

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(Replenisher::new(repo.clone(), Duration::from_secs(1)).run(rx));

        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(repo.get_client("ip").unwrap().bucket.current(), 2);

        tx.send(()).unwrap();
        task.await.unwrap();
    }
}
