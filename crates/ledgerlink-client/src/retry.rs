//! Bounded-backoff, unbounded-attempt recovery from sequencing
//! conflicts.
//!
//! A conflict means this account's pending-sequence lookup raced with
//! another in-flight submission; re-reading the sequence after a short
//! wait converges once the ledger accepts one of the competing
//! submissions. Any other error propagates immediately. Callers that
//! need a ceiling impose an external timeout.

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

/// Backoff configuration for sequencing-conflict retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_millis(500),
        }
    }
}

/// Re-issue `op` until it succeeds or fails with a non-conflict error.
pub async fn with_sequence_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt: u64 = 1;
    loop {
        match op().await {
            Err(ClientError::SequenceConflict(reason)) => {
                tracing::debug!(attempt, %reason, "sequence conflict, backing off");
                tokio::time::sleep(policy.backoff).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
