use async_trait::async_trait;

use crate::error::Result;
use crate::wire::{BookCount, BooksRequest, PrimaryRequest, PrimaryResponse, SecondaryRequest, SecondaryResponse};

/// Transport to the primary search service.
#[async_trait]
pub trait PrimaryBackend: Send + Sync {
    async fn search(&self, request: &PrimaryRequest) -> Result<PrimaryResponse>;
}

/// Transport to the secondary (Hebrew) search service.
#[async_trait]
pub trait SecondaryBackend: Send + Sync {
    async fn search(&self, request: &SecondaryRequest) -> Result<SecondaryResponse>;
    async fn books(&self, request: &BooksRequest) -> Result<Vec<BookCount>>;
}
