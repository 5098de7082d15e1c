use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use fedsearch_core::abort::QueryAborter;
use fedsearch_core::config::SearchSettings;
use fedsearch_core::error::{Error, Result};
use fedsearch_core::queue::QueueCursor;
use fedsearch_core::traits::SecondaryBackend;
use fedsearch_core::types::{BackendPage, FacetBucket, Hit, HitSource, Origin, QueryDescriptor, SortType};
use fedsearch_core::wire::{BookCount, BooksRequest, SecondaryHit, SecondaryRequest, SecondaryResponse, SecondarySort};

/// The secondary service only indexes Hebrew; any Latin letter disqualifies a query.
pub fn is_secondary_query(query: &str) -> bool {
    !query.chars().any(|c| c.is_ascii_alphabetic())
}

/// `Tanakh/Torah/Song of Songs` -> `Tanakh.Torah.Song_of_Songs`
pub fn to_book_filter(path: &str) -> String {
    path.replace('/', ".").replace(' ', "_")
}

/// `["Tanakh", "Torah", "Song_of_Songs"]` -> `Tanakh/Torah/Song of Songs`
pub fn book_bucket(count: BookCount) -> FacetBucket {
    let key = count.english_book_name.iter().map(|part| part.replace('_', " ")).collect::<Vec<_>>().join("/");
    FacetBucket { key, doc_count: count.count }
}

pub struct SecondaryAdapter<B> where B: SecondaryBackend {
    backend: B,
    version: String,
    date_base: f64,
    books_timeout: Duration,
}

impl<B> SecondaryAdapter<B> where B: SecondaryBackend {
    pub fn new(backend: B, settings: &SearchSettings) -> Self {
        Self {
            backend,
            version: settings.secondary_version.clone(),
            date_base: settings.synthetic_date_base,
            books_timeout: Duration::from_millis(settings.books_timeout_ms),
        }
    }

    pub fn backend(&self) -> &B { &self.backend }

    pub fn build_request(&self, query: &QueryDescriptor, from: usize) -> SecondaryRequest {
        let books: Vec<String> = query.applied_filters.iter().map(|f| to_book_filter(f)).collect();
        SecondaryRequest {
            query: query.query.clone(),
            from,
            size: query.size,
            limited_to_books: if books.is_empty() { None } else { Some(books) },
            sort: match query.sort_type {
                SortType::Relevance => SecondarySort::Pagerank,
                _ => SecondarySort::CorpusOrderPath,
            },
            small_units_only: true,
        }
    }

    /// One round of results after the queue's cursor. A continuation against an
    /// exhausted queue answers locally without touching the network.
    pub async fn query(&self, query: &QueryDescriptor, cursor: QueueCursor, aborter: &QueryAborter) -> Result<BackendPage> {
        if query.is_continuation() && cursor.is_exhausted() {
            debug!(total = cursor.total, "secondary results exhausted, skipping request");
            return Ok(BackendPage::empty(cursor.total));
        }
        let request = self.build_request(query, cursor.next_offset());
        let response = aborter.guard(self.backend.search(&request)).await?;
        let page = self.reshape(response, request.from);
        debug!(total = page.total, fetched = page.fetched, from = request.from, "secondary round");
        Ok(page)
    }

    /// Per-book document counts for the facet tree, bounded by the books timeout.
    pub async fn book_counts(&self, query: &QueryDescriptor, aborter: &QueryAborter) -> Result<Vec<FacetBucket>> {
        let request = BooksRequest { query: query.query.clone(), small_units_only: true };
        let counts = tokio::time::timeout(self.books_timeout, aborter.guard(self.backend.books(&request)))
            .await
            .map_err(|_| Error::Timeout { origin: Origin::Secondary, after_ms: millis(self.books_timeout) })??;
        Ok(counts.into_iter().map(book_bucket).collect())
    }

    pub fn reshape(&self, response: SecondaryResponse, from: usize) -> BackendPage {
        let fetched = response.hits.len();
        let mut hits = Vec::with_capacity(fetched);
        for (offset, raw) in response.hits.into_iter().enumerate() {
            match self.into_hit(raw, from + offset) {
                Ok(hit) => hits.push(hit),
                Err(e) => warn!(error = %e, "dropping secondary hit"),
            }
        }
        BackendPage { total: response.total, fetched, hits, aggregations: None }
    }

    fn into_hit(&self, raw: SecondaryHit, position: usize) -> Result<Hit> {
        let parts: Vec<&str> = raw.xml_id.split('.').collect();
        if parts.len() < 3 {
            return Err(Error::Malformed(format!("xmlId '{}' has no book component", raw.xml_id)));
        }
        let categories: Vec<String> = parts[..2].iter().map(|c| (*c).to_string()).collect();
        let title = parts[2].replace('_', " ");
        let location = parts[3..parts.len().min(5)].join(":");
        let reference = if location.is_empty() { title.clone() } else { format!("{title} {location}") };
        let pagerank = raw.pagerank.unwrap_or(0.0);

        let mut extra = serde_json::Map::new();
        extra.insert("type".into(), Value::from("text"));
        extra.insert("pagesheetrank".into(), json!(pagerank));

        let mut path = categories.clone();
        path.push(title);
        let source = HitSource {
            reference: reference.clone(),
            he_ref: Some(raw.hebrew_path),
            path: Some(path.join("/")),
            categories,
            version: Some(self.version.clone()),
            lang: Some("he".into()),
            comp_date: None,
            version_priority: None,
            extra,
        };
        Ok(Hit {
            id: format!("{} ({} [he])", reference, self.version),
            source,
            highlight: raw.highlight.first().map(|h| json!({ "naive_lemmatizer": [h.text] })),
            score: -pagerank,
            comp_date: self.date_base + position as f64,
            came_from: Origin::Secondary,
            duplicates: Vec::new(),
        })
    }
}

fn millis(d: Duration) -> u64 { u64::try_from(d.as_millis()).unwrap_or(u64::MAX) }
