//! Rate Limiter (Token Bucket Algorithm)
//!
//! Caps how fast clients can mutate queues.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every RPC connection
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
    max_tokens: f64,
    refill_per_sec: f64,
}

impl RateLimiter {
    /// `max_tokens` is the burst size, `refill_per_sec` the sustained rate
    pub fn new(max_tokens: u32, refill_per_sec: u32) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                tokens: f64::from(max_tokens),
                last_refill: Instant::now(),
            }),
            max_tokens: f64::from(max_tokens),
            refill_per_sec: f64::from(refill_per_sec),
        }
    }

    /// Consume one token, false if the caller is over the limit
    pub fn check(&self) -> bool {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available
    pub fn remaining(&self) -> u32 {
        let bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.tokens.floor() as u32
    }
}
