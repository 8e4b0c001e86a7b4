//! Bounded retry with a linear backoff schedule
//!
//! Wraps one child. On failure the node sleeps for
//! `timeout_base * timeout_multiplier * attempt` (the attempt index is
//! 0-based, so the first retry is immediate), then tries again, up to
//! `max_retries` retries; the last failure is then re-raised unmodified.
//!
//! The attempt counter is a per-invocation local: independent top-level calls
//! to the same node instance each get the full retry budget.
//!
//! # Examples
//!
//! ```rust
//! use fai_core::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(5)
//!     .with_timeout_base(0.5)
//!     .with_timeout_multiplier(2.0);
//!
//! assert_eq!(policy.delay_for(0), Duration::ZERO);
//! assert_eq!(policy.delay_for(3), Duration::from_secs(3));
//! assert!(policy.should_retry(4));
//! assert!(!policy.should_retry(5));
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::args::Args;
use crate::error::Result;
use crate::node::{resolve_key, Node, NodeRef};

/// Configuration for retrying a failed child invocation.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,

    /// Base of the backoff schedule, in seconds.
    pub timeout_base: f64,

    /// Multiplier applied per attempt index.
    pub timeout_multiplier: f64,
}

impl RetryPolicy {
    /// Policy with the given retry budget and the default schedule.
    pub fn new(max_retries: usize) -> Self {
        Self { max_retries, timeout_base: 1.0, timeout_multiplier: 1.0 }
    }

    /// Sets the backoff base in seconds.
    pub fn with_timeout_base(mut self, seconds: f64) -> Self {
        self.timeout_base = seconds;
        self
    }

    /// Sets the per-attempt multiplier.
    pub fn with_timeout_multiplier(mut self, multiplier: f64) -> Self {
        self.timeout_multiplier = multiplier;
        self
    }

    /// Backoff before the retry with the given 0-based attempt index.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        Duration::from_secs_f64(self.timeout_base * self.timeout_multiplier * attempt as f64)
    }

    /// Whether a retry with the given attempt index is still in budget.
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Retry wrapper. See [`retry`] and [`retry_with`].
pub struct RetryNode {
    key: Option<String>,
    child: NodeRef,
    policy: RetryPolicy,
}

impl RetryNode {
    /// Sets the output key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[async_trait]
impl Node for RetryNode {
    async fn invoke(&self, args: &Args) -> Result<Value> {
        let mut attempt = 0usize;
        loop {
            match self.child.invoke(args).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !self.policy.should_retry(attempt) {
                        return Err(err);
                    }
                    let delay = self.policy.delay_for(attempt);
                    debug!(
                        key = self.key(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "child failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn key(&self) -> &str {
        resolve_key(&self.key)
    }
}

/// Builds a retry node with the default policy (3 retries).
pub fn retry(child: NodeRef) -> RetryNode {
    retry_with(child, RetryPolicy::default())
}

/// Builds a retry node with an explicit policy.
pub fn retry_with(child: NodeRef, policy: RetryPolicy) -> RetryNode {
    RetryNode { key: None, child, policy }
}
