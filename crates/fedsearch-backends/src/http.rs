use async_trait::async_trait;
use std::time::Duration;

use fedsearch_core::config::SearchSettings;
use fedsearch_core::error::{Error, Result};
use fedsearch_core::traits::{PrimaryBackend, SecondaryBackend};
use fedsearch_core::types::Origin;
use fedsearch_core::wire::{BookCount, BooksRequest, PrimaryRequest, PrimaryResponse, SecondaryRequest, SecondaryResponse};

fn transport_error(origin: Origin, e: &reqwest::Error) -> Error {
    if e.is_decode() {
        Error::Malformed(format!("{origin}: {e}"))
    } else {
        Error::backend(origin, e.to_string())
    }
}

async fn post_json<Req, Resp>(
    client: &reqwest::Client,
    origin: Origin,
    url: &str,
    body: &Req,
    timeout: Option<Duration>,
) -> Result<Resp>
where
    Req: serde::Serialize + ?Sized,
    Resp: serde::de::DeserializeOwned,
{
    let mut request = client.post(url).json(body);
    if let Some(t) = timeout {
        request = request.timeout(t);
    }
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout { origin, after_ms: timeout.map_or(0, |t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)) }
        } else {
            transport_error(origin, &e)
        }
    })?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::backend(origin, format!("{url} answered {status}")));
    }
    response.json::<Resp>().await.map_err(|e| transport_error(origin, &e))
}

/// POSTs to the primary search-wrapper endpoint. No timeout is applied.
pub struct HttpPrimary {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPrimary {
    pub fn new(settings: &SearchSettings) -> Self {
        Self { client: reqwest::Client::new(), endpoint: settings.primary_url.clone() }
    }
}

#[async_trait]
impl PrimaryBackend for HttpPrimary {
    async fn search(&self, request: &PrimaryRequest) -> Result<PrimaryResponse> {
        post_json(&self.client, Origin::Primary, &self.endpoint, request, None).await
    }
}

/// POSTs to the secondary service's `/search` and `/books` routes.
pub struct HttpSecondary {
    client: reqwest::Client,
    base_url: String,
    books_timeout: Duration,
}

impl HttpSecondary {
    pub fn new(settings: &SearchSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.secondary_url.trim_end_matches('/').to_string(),
            books_timeout: Duration::from_millis(settings.books_timeout_ms),
        }
    }
}

#[async_trait]
impl SecondaryBackend for HttpSecondary {
    async fn search(&self, request: &SecondaryRequest) -> Result<SecondaryResponse> {
        let url = format!("{}/search", self.base_url);
        post_json(&self.client, Origin::Secondary, &url, request, None).await
    }

    async fn books(&self, request: &BooksRequest) -> Result<Vec<BookCount>> {
        let url = format!("{}/books", self.base_url);
        post_json(&self.client, Origin::Secondary, &url, request, Some(self.books_timeout)).await
    }
}
