use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Cancels every request issued under it as a unit.
///
/// Clones share the same token, so an adapter holding a clone observes an
/// abort issued through the facade's copy.
#[derive(Debug, Clone, Default)]
pub struct QueryAborter {
    token: CancellationToken,
}

impl QueryAborter {
    pub fn new() -> Self { Self::default() }

    pub fn abort(&self) { self.token.cancel(); }

    pub fn is_aborted(&self) -> bool { self.token.is_cancelled() }

    /// Run `request` unless this batch is aborted first.
    pub async fn guard<F, T>(&self, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Error::Aborted),
            out = request => out,
        }
    }
}
