//! Token bucket rate limiter
//!
//! The single gate on outbound call rate. One shared instance is created at
//! startup and handed to the [`Gateway`](crate::gateway::Gateway); every
//! remote call debits tokens here before it is sent. The bucket refills
//! continuously at `refill_per_sec`, holds at most `capacity` tokens, and
//! tolerates bursts up to `capacity` while enforcing the steady-state rate.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// The requested cost can never be satisfied by this bucket.
///
/// Raised immediately (without blocking) when a caller asks for more tokens
/// than the bucket can ever hold. This is a configuration error, not a
/// transient condition, and is never retried.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("requested cost {cost} exceeds bucket capacity {capacity}")]
pub struct CapacityError {
    /// Tokens the caller asked for
    pub cost: f64,
    /// Maximum tokens the bucket can hold
    pub capacity: f64,
}

/// Mutable bucket state, only ever touched under the limiter's mutex.
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, capacity: f64, refill_per_sec: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_sec).min(capacity);
        self.last_refill = now;
    }
}

/// Shared token bucket, safe for unbounded concurrent callers.
///
/// Waiters queue on the internal `tokio::sync::Mutex`, which hands the lock
/// out in arrival order; a waiter keeps the lock while it sleeps for its
/// refill, so a later low-cost request can never be granted ahead of an
/// earlier high-cost one.
pub struct TokenBucketLimiter {
    capacity: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl TokenBucketLimiter {
    /// Create a bucket that starts full.
    ///
    /// # Panics
    /// Panics if `capacity` or `refill_per_sec` is not strictly positive;
    /// both come from validated configuration.
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        assert!(capacity > 0.0, "bucket capacity must be positive");
        assert!(refill_per_sec > 0.0, "refill rate must be positive");
        Self {
            capacity,
            refill_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Suspend the caller until `cost` tokens are available, then debit them.
    ///
    /// # Arguments
    /// * `cost` - Tokens this call consumes (1.0 for a normal API request)
    ///
    /// # Errors
    /// Returns [`CapacityError`] immediately if `cost` exceeds the bucket
    /// capacity; such a request would block forever.
    pub async fn acquire(&self, cost: f64) -> Result<(), CapacityError> {
        if cost > self.capacity {
            return Err(CapacityError {
                cost,
                capacity: self.capacity,
            });
        }

        let mut bucket = self.bucket.lock().await;
        loop {
            bucket.refill(self.capacity, self.refill_per_sec);
            if bucket.tokens >= cost {
                bucket.tokens -= cost;
                return Ok(());
            }

            // The sleep may under- or overshoot under scheduler jitter, so
            // re-check instead of assuming one sleep is enough.
            let wait = (cost - bucket.tokens) / self.refill_per_sec;
            tracing::trace!(
                cost,
                tokens = bucket.tokens,
                wait_secs = wait,
                "rate limited, waiting for refill"
            );
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
        }
    }

    /// Tokens currently available, after applying any pending refill.
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(self.capacity, self.refill_per_sec);
        bucket.tokens
    }

    /// Maximum tokens the bucket can hold.
    pub fn capacity(&self) -> f64 {
        self.capacity
    }
}
