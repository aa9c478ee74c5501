use std::{future::Future, time::Duration};

use tokio::time::{self, Instant};

use crate::TrackingResult;

/// Time limit for one engine operation. An operation running past its
/// deadline is abandoned and fails with `TrackingError::Timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Measured from the moment the operation starts.
    Within(Duration),
    At(Instant),
    Never,
}

impl Deadline {
    pub async fn run<F, O>(self, operation: F) -> TrackingResult<O>
    where
        F: Future<Output = TrackingResult<O>>,
    {
        match self {
            Self::Within(limit) => time::timeout(limit, operation).await?,
            Self::At(instant) => time::timeout_at(instant, operation).await?,
            Self::Never => operation.await,
        }
    }
}
