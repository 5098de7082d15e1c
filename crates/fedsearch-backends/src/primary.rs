use tracing::debug;

use fedsearch_core::abort::QueryAborter;
use fedsearch_core::config::SearchSettings;
use fedsearch_core::error::{Error, Result};
use fedsearch_core::queue::QueueCursor;
use fedsearch_core::traits::PrimaryBackend;
use fedsearch_core::types::{BackendPage, Hit, HitsPage, Origin, QueryDescriptor, ResultType, SearchResponse, SortType};
use fedsearch_core::wire::{PrimaryRequest, PrimaryResponse, RawPrimaryHit};

/// How the primary service should order one result type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortMetadata {
    pub sort_method: &'static str,
    pub fields: &'static [&'static str],
    pub score_missing: Option<f64>,
    pub descending: bool,
}

/// Sort options the primary service accepts for each result type.
pub fn sort_metadata(result_type: ResultType, sort_type: SortType) -> Result<SortMetadata> {
    let meta = match (result_type, sort_type) {
        (ResultType::Text, SortType::Relevance) => SortMetadata { sort_method: "score", fields: &["pagesheetrank"], score_missing: Some(0.04), descending: true },
        (ResultType::Text, SortType::Chronological) => SortMetadata { sort_method: "sort", fields: &["comp_date", "order"], score_missing: None, descending: false },
        (ResultType::Sheet, SortType::Relevance) => SortMetadata { sort_method: "score", fields: &[], score_missing: None, descending: true },
        (ResultType::Sheet, SortType::DateCreated) => SortMetadata { sort_method: "sort", fields: &["dateCreated"], score_missing: None, descending: true },
        (ResultType::Sheet, SortType::NumViews) => SortMetadata { sort_method: "sort", fields: &["views"], score_missing: None, descending: true },
        (rt, st) => return Err(Error::InvalidQuery(format!("sort {st:?} is not available for {rt:?} results"))),
    };
    Ok(meta)
}

pub struct PrimaryAdapter<B> where B: PrimaryBackend {
    backend: B,
    fuzzy_slop: u32,
}

impl<B> PrimaryAdapter<B> where B: PrimaryBackend {
    pub fn new(backend: B, settings: &SearchSettings) -> Self { Self { backend, fuzzy_slop: settings.fuzzy_slop } }

    pub fn backend(&self) -> &B { &self.backend }

    pub fn build_request(&self, query: &QueryDescriptor, start: usize) -> Result<PrimaryRequest> {
        let sort = sort_metadata(query.result_type, query.sort_type)?;
        Ok(PrimaryRequest {
            result_type: query.result_type,
            query: query.query.clone(),
            field: query.field.clone(),
            source_proj: true,
            slop: if query.exact { 0 } else { self.fuzzy_slop },
            start,
            size: query.size,
            filters: query.applied_filters.clone(),
            filter_fields: query.applied_filter_agg_types.clone(),
            aggs: query.aggregations_to_update.clone(),
            sort_method: sort.sort_method.to_string(),
            sort_fields: sort.fields.iter().map(|f| (*f).to_string()).collect(),
            sort_reverse: sort.descending,
            sort_score_missing: sort.score_missing,
        })
    }

    /// One round of text results starting after the queue's cursor.
    pub async fn query(&self, query: &QueryDescriptor, cursor: QueueCursor, aborter: &QueryAborter) -> Result<BackendPage> {
        if query.is_continuation() && cursor.is_exhausted() {
            debug!(total = cursor.total, "primary results exhausted, skipping request");
            return Ok(BackendPage::empty(cursor.total));
        }
        let request = self.build_request(query, cursor.next_offset())?;
        let response = aborter.guard(self.backend.search(&request)).await?;
        let page = decorate_text_hits(response);
        debug!(total = page.total, fetched = page.fetched, start = request.start, "primary round");
        Ok(page)
    }

    /// Sheet results are never merged; the response goes back as-is.
    pub async fn query_sheets(&self, query: &QueryDescriptor, aborter: &QueryAborter) -> Result<SearchResponse> {
        let request = self.build_request(query, query.start)?;
        let response = aborter.guard(self.backend.search(&request)).await?;
        Ok(sheet_response(response))
    }
}

/// Tag text hits and copy their sort keys to the top level, negating the
/// native score so lower is better.
pub fn decorate_text_hits(response: PrimaryResponse) -> BackendPage {
    let fetched = response.hits.hits.len();
    let hits = response.hits.hits.into_iter().map(|raw| into_hit(raw, true)).collect();
    BackendPage { total: response.hits.total.value(), fetched, hits, aggregations: response.aggregations }
}

fn sheet_response(response: PrimaryResponse) -> SearchResponse {
    let total = response.hits.total.value();
    let hits = response.hits.hits.into_iter().map(|raw| into_hit(raw, false)).collect();
    SearchResponse { hits: HitsPage { total, hits }, aggregations: response.aggregations }
}

fn into_hit(raw: RawPrimaryHit, negate: bool) -> Hit {
    let native = raw.score.unwrap_or(0.0);
    // hits without a composition date sort after every dated hit
    let comp_date = raw.source.comp_date.unwrap_or(f64::MAX);
    Hit {
        id: raw.id,
        source: raw.source,
        highlight: raw.highlight,
        score: if negate { -native } else { native },
        comp_date,
        came_from: Origin::Primary,
        duplicates: Vec::new(),
    }
}
