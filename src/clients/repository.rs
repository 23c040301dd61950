//! Client repository.
//!
//! # Responsibilities
//! - Map client IDs to token buckets
//! - Serve the management API (add, update, delete, lookup)
//! - Admit requests with get-or-create semantics
//! - Refill every bucket on each replenish tick

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::clients::bucket::Client;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("client {0:?} not found")]
    NotFound(String),

    #[error("client {0:?} already exists")]
    AlreadyExists(String),
}

/// Storage contract for rate-limited clients.
///
/// Lookups return snapshots; mutation happens only through these methods.
pub trait ClientRepository: Send + Sync {
    fn get_client(&self, id: &str) -> Option<Client>;

    /// Create or overwrite `id` with a full bucket.
    fn add_client(&self, id: &str, capacity: u32, rate: u32) -> Client;

    /// Create `id`, failing if it already exists.
    fn create_client(&self, id: &str, capacity: u32, rate: u32) -> Result<Client, RepoError>;

    /// Change capacity and rate. The bucket is refilled to the new capacity.
    fn update_client(&self, id: &str, capacity: u32, rate: u32) -> Result<Client, RepoError>;

    fn delete_client(&self, id: &str) -> Result<(), RepoError>;

    /// Take `n` tokens from `id`, provisioning it with defaults if unknown.
    fn consume(&self, id: &str, n: u32) -> bool;

    /// Refill every known client by its rate.
    fn replenish(&self);

    fn default_capacity(&self) -> u32;

    fn default_rate(&self) -> u32;
}

/// In-memory repository guarded by one map-wide lock.
#[derive(Debug)]
pub struct MemoryRepository {
    clients: RwLock<HashMap<String, Client>>,
    default_capacity: u32,
    default_rate: u32,
}

impl MemoryRepository {
    pub fn new(default_capacity: u32, default_rate: u32) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            default_capacity,
            default_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }
}

impl ClientRepository for MemoryRepository {
    fn get_client(&self, id: &str) -> Option<Client> {
        self.clients.read().get(id).cloned()
    }

    fn add_client(&self, id: &str, capacity: u32, rate: u32) -> Client {
        let client = Client::new(id, capacity, rate);
        self.clients.write().insert(id.to_string(), client.clone());
        tracing::debug!(client = %id, capacity, rate, "Client added");
        client
    }

    fn create_client(&self, id: &str, capacity: u32, rate: u32) -> Result<Client, RepoError> {
        let mut clients = self.clients.write();
        if clients.contains_key(id) {
            return Err(RepoError::AlreadyExists(id.to_string()));
        }
        let client = Client::new(id, capacity, rate);
        clients.insert(id.to_string(), client.clone());
        tracing::debug!(client = %id, capacity, rate, "Client created");
        Ok(client)
    }

    fn update_client(&self, id: &str, capacity: u32, rate: u32) -> Result<Client, RepoError> {
        let mut clients = self.clients.write();
        let client = clients
            .get_mut(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        *client = Client::new(id, capacity, rate);
        tracing::debug!(client = %id, capacity, rate, "Client updated");
        Ok(client.clone())
    }

    fn delete_client(&self, id: &str) -> Result<(), RepoError> {
        match self.clients.write().remove(id) {
            Some(_) => {
                tracing::debug!(client = %id, "Client deleted");
                Ok(())
            }
            None => Err(RepoError::NotFound(id.to_string())),
        }
    }

    fn consume(&self, id: &str, n: u32) -> bool {
        // Held across lookup, insert and allow so two first touches cannot race.
        let mut clients = self.clients.write();
        let client = clients.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(client = %id, "Provisioning client with defaults");
            Client::new(id, self.default_capacity, self.default_rate)
        });
        client.bucket.allow(n)
    }

    fn replenish(&self) {
        let mut clients = self.clients.write();
        for client in clients.values_mut() {
            client.bucket.refill();
        }
        tracing::trace!(clients = clients.len(), "Replenished all clients");
    }

    fn default_capacity(&self) -> u32 {
        self.default_capacity
    }

    fn default_rate(&self) -> u32 {
        self.default_rate
    }
}
