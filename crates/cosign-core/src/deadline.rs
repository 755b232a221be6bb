//! Bounded waits on upstream calls.
//!
//! Every Storage and Proof Oracle call runs under [`within`]. A timeout is
//! reported as [`DeadlineExceeded`], which component errors classify as
//! [`ErrorKind::UpstreamFailure`](crate::ErrorKind::UpstreamFailure).
//! The future is dropped on expiry, so any transaction it owned rolls back.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// An upstream call did not complete within its limit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} did not complete within {}ms", .limit.as_millis())]
pub struct DeadlineExceeded {
    /// Name of the operation that timed out.
    pub operation: &'static str,
    /// The limit that was exceeded.
    pub limit: Duration,
}

/// Await `fut`, failing with [`DeadlineExceeded`] after `limit`.
pub async fn within<F, T>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, DeadlineExceeded>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded { operation, limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_limit() {
        let out = within(Duration::from_secs(1), "noop", async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn reports_expiry() {
        let err = within(Duration::from_millis(50), "storage.commit", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .await
        .unwrap_err();
        assert_eq!(err.operation, "storage.commit");
        assert!(err.to_string().contains("50ms"));
    }
}
