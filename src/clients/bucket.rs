//! Token bucket.

/// Capped token balance, drained per admitted request and refilled per tick.
///
/// `0 <= current <= capacity` holds after every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBucket {
    capacity: u32,
    current: u32,
    rate: u32,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(capacity: u32, rate: u32) -> Self {
        Self {
            capacity,
            current: capacity,
            rate,
        }
    }

    /// A bucket holding `current` tokens, clamped to `capacity`.
    pub fn with_tokens(capacity: u32, current: u32, rate: u32) -> Self {
        Self {
            capacity,
            current: current.min(capacity),
            rate,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    /// Tokens added per replenish tick.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Add one tick's worth of tokens, saturating at capacity.
    pub fn refill(&mut self) {
        self.current = self.current.saturating_add(self.rate).min(self.capacity);
    }

    /// Take `n` tokens if they are all available. Leaves the bucket untouched otherwise.
    pub fn allow(&mut self, n: u32) -> bool {
        if self.current < n {
            return false;
        }
        self.current -= n;
        true
    }
}

/// A rate-limited caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub id: String,
    pub bucket: TokenBucket,
}

impl Client {
    pub fn new(id: impl Into<String>, capacity: u32, rate: u32) -> Self {
        Self {
            id: id.into(),
            bucket: TokenBucket::new(capacity, rate),
        }
    }
}
