use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use fedsearch_backends::primary::sort_metadata;
use fedsearch_backends::{is_secondary_query, HttpPrimary, HttpSecondary, PrimaryAdapter, SecondaryAdapter};
use fedsearch_core::abort::QueryAborter;
use fedsearch_core::config::{Config, SearchSettings};
use fedsearch_core::error::{Error, Result};
use fedsearch_core::queue::{QueueCursor, ResultQueue};
use fedsearch_core::traits::{PrimaryBackend, SecondaryBackend};
use fedsearch_core::types::{
    AggregationBuckets, BackendPage, FacetBucket, HitsPage, QueryDescriptor, ResultType, SearchResponse, PATH_AGGREGATION,
};
use fedsearch_facets::{build_and_apply_text_filters, load_toc, TextFilters, TocEntry};

use crate::merge::{filtered_total, merge_buckets, merge_queues};

/// Everything a text query accumulates between its fresh round and its
/// continuations.
#[derive(Debug, Clone, Default)]
struct SlotState {
    primary: ResultQueue,
    secondary: ResultQueue,
    secondary_eligible: bool,
    book_counts: Option<Vec<FacetBucket>>,
    // survives fresh queries so toggling a filter can still count from the
    // unfiltered facets
    buckets: Vec<FacetBucket>,
}

impl SlotState {
    fn restart(&mut self, secondary_eligible: bool) {
        self.primary.reset();
        self.secondary.reset();
        self.book_counts = None;
        self.secondary_eligible = secondary_eligible;
    }
}

#[derive(Debug, Clone)]
struct CachedRound {
    response: SearchResponse,
    slot: Option<SlotState>,
}

/// Descriptor-keyed rounds, oldest evicted first once `capacity` is reached.
#[derive(Debug)]
struct ResultCache {
    entries: HashMap<String, CachedRound>,
    order: VecDeque<String>,
    capacity: usize,
}

impl ResultCache {
    fn new(capacity: usize) -> Self { Self { entries: HashMap::new(), order: VecDeque::new(), capacity: capacity.max(1) } }

    fn get(&self, key: &str) -> Option<&CachedRound> { self.entries.get(key) }

    fn insert(&mut self, key: String, round: CachedRound) {
        if self.entries.insert(key.clone(), round).is_some() {
            self.order.retain(|k| *k != key);
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize { self.entries.len() }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[derive(Debug)]
struct SessionState {
    slot: SlotState,
    secondary_disabled: bool,
    text_aborter: QueryAborter,
    sheet_aborter: QueryAborter,
    cache: ResultCache,
}

impl SessionState {
    fn new(cache_capacity: usize) -> Self {
        Self {
            slot: SlotState::default(),
            secondary_disabled: false,
            text_aborter: QueryAborter::new(),
            sheet_aborter: QueryAborter::new(),
            cache: ResultCache::new(cache_capacity),
        }
    }

    fn disable_secondary(&mut self) {
        self.secondary_disabled = true;
        self.slot.secondary_eligible = false;
    }

    fn aborter_mut(&mut self, result_type: ResultType) -> &mut QueryAborter {
        match result_type {
            ResultType::Text => &mut self.text_aborter,
            ResultType::Sheet => &mut self.sheet_aborter,
        }
    }
}

enum Dispatch {
    Cached(SearchResponse),
    Fetch(Round),
}

/// What a round needs from the session, captured before any await.
struct Round {
    key: String,
    aborter: QueryAborter,
    primary: QueueCursor,
    secondary: QueueCursor,
    secondary_eligible: bool,
    need_books: bool,
}

/// Answers reader queries from the primary service, folding in the
/// Hebrew-only secondary service when a query qualifies.
///
/// One instance is one reader session: it owns the per-backend queues of the
/// current text query, the result cache and the session-wide secondary switch.
pub struct FederatedSearch<P, S> where P: PrimaryBackend, S: SecondaryBackend {
    primary: PrimaryAdapter<P>,
    secondary: SecondaryAdapter<S>,
    settings: SearchSettings,
    toc: Vec<TocEntry>,
    state: Mutex<SessionState>,
}

pub type HttpFederatedSearch = FederatedSearch<HttpPrimary, HttpSecondary>;

impl HttpFederatedSearch {
    /// Wire both HTTP transports and the table of contents from config.
    pub fn from_config(config: &Config, base: &Path) -> anyhow::Result<Self> {
        let settings = config.search()?;
        let toc_path = config.data()?.toc_path(base);
        let toc = load_toc(&toc_path)?;
        info!(primary = %settings.primary_url, secondary = %settings.secondary_url, toc = %toc_path.display(), "federated search ready");
        Ok(Self::new(HttpPrimary::new(&settings), HttpSecondary::new(&settings), settings, toc))
    }
}

impl<P, S> FederatedSearch<P, S> where P: PrimaryBackend, S: SecondaryBackend {
    pub fn new(primary: P, secondary: S, settings: SearchSettings, toc: Vec<TocEntry>) -> Self {
        let state = Mutex::new(SessionState::new(settings.cache_capacity));
        Self {
            primary: PrimaryAdapter::new(primary, &settings),
            secondary: SecondaryAdapter::new(secondary, &settings),
            settings,
            toc,
            state,
        }
    }

    pub fn settings(&self) -> &SearchSettings { &self.settings }

    pub fn primary_backend(&self) -> &P { self.primary.backend() }

    pub fn secondary_backend(&self) -> &S { self.secondary.backend() }

    /// False once the secondary service has failed its books call this session.
    pub fn secondary_enabled(&self) -> bool { !self.lock().secondary_disabled }

    pub fn clear_cache(&self) {
        let mut state = self.lock();
        debug!(entries = state.cache.len(), "clearing result cache");
        state.cache.clear();
    }

    /// Text filter tree for `buckets`, with `applied` selected.
    pub fn text_filters(&self, buckets: &[FacetBucket], applied: &[String]) -> TextFilters {
        build_and_apply_text_filters(buckets, applied, &self.toc)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    /// Run one page of `query`.
    ///
    /// A blank query is a no-op and yields `Ok(None)`. A fresh text query
    /// (`start == 0`) supersedes whatever text query was in flight; the older
    /// call then resolves to [`Error::Superseded`] without touching the queues.
    pub async fn execute_query(&self, query: &QueryDescriptor) -> Result<Option<SearchResponse>> {
        if query.is_blank() {
            debug!("blank query ignored");
            return Ok(None);
        }
        query.validate()?;
        sort_metadata(query.result_type, query.sort_type)?;

        let round = match self.begin_round(query) {
            Dispatch::Cached(response) => return Ok(Some(response)),
            Dispatch::Fetch(round) => round,
        };
        match query.result_type {
            ResultType::Sheet => self.run_sheets(query, round).await.map(Some),
            ResultType::Text => self.run_text(query, round).await.map(Some),
        }
    }

    /// Serve from cache, or set the slot up for a new round.
    fn begin_round(&self, query: &QueryDescriptor) -> Dispatch {
        let key = query.cache_key();
        let fresh = !query.is_continuation();
        let mut guard = self.lock();
        let state = &mut *guard;

        if let Some(cached) = state.cache.get(&key) {
            debug!(query = %query.query, start = query.start, "serving cached result");
            if let Some(slot) = cached.slot.clone() {
                if fresh {
                    std::mem::take(&mut state.text_aborter).abort();
                }
                state.slot = slot;
                // the snapshot may predate a books failure
                state.slot.secondary_eligible &= !state.secondary_disabled;
            }
            return Dispatch::Cached(cached.response.clone());
        }

        // continuations share the token of the query they continue
        let current = state.aborter_mut(query.result_type);
        if fresh {
            std::mem::replace(current, QueryAborter::new()).abort();
        }
        let aborter = current.clone();
        if query.result_type == ResultType::Text && fresh {
            let eligible = !state.secondary_disabled && is_secondary_query(&query.query);
            state.slot.restart(eligible);
            debug!(query = %query.query, secondary = eligible, "fresh text query");
        }

        let slot = &state.slot;
        let secondary_eligible = slot.secondary_eligible && !state.secondary_disabled;
        Dispatch::Fetch(Round {
            key,
            aborter,
            primary: slot.primary.cursor(),
            secondary: slot.secondary.cursor(),
            secondary_eligible,
            need_books: secondary_eligible && slot.book_counts.is_none(),
        })
    }

    async fn run_sheets(&self, query: &QueryDescriptor, round: Round) -> Result<SearchResponse> {
        let result = self.primary.query_sheets(query, &round.aborter).await;
        if round.aborter.is_aborted() {
            return Err(Error::Superseded);
        }
        let response = result?;
        self.lock().cache.insert(round.key, CachedRound { response: response.clone(), slot: None });
        Ok(response)
    }

    async fn run_text(&self, query: &QueryDescriptor, round: Round) -> Result<SearchResponse> {
        let primary = self.primary.query(query, round.primary, &round.aborter);
        let secondary = async {
            if round.secondary_eligible {
                Some(self.secondary.query(query, round.secondary, &round.aborter).await)
            } else {
                None
            }
        };
        let books = async {
            if round.need_books {
                Some(self.secondary.book_counts(query, &round.aborter).await)
            } else {
                None
            }
        };
        let (primary, secondary, books) = futures::join!(primary, secondary, books);

        if round.aborter.is_aborted() {
            debug!(query = %query.query, "round superseded, discarding results");
            return Err(Error::Superseded);
        }

        let mut guard = self.lock();
        let state = &mut *guard;

        // a books failure sticks even when the primary failed too
        match books {
            Some(Ok(counts)) => state.slot.book_counts = Some(counts),
            Some(Err(e)) => {
                info!(error = %e, "secondary books unavailable, disabling secondary for this session");
                state.disable_secondary();
            }
            None => {}
        }
        let mut primary = primary?;

        let secondary = match secondary {
            Some(Ok(page)) => page,
            Some(Err(e)) => {
                warn!(error = %e, "secondary search failed, continuing with primary results");
                BackendPage::empty(round.secondary.total)
            }
            None => BackendPage::empty(round.secondary.total),
        };

        if round.secondary_eligible {
            let owned = &self.settings.secondary_owned_category;
            primary.hits.retain(|h| !h.source.categories.iter().any(|c| c == owned));
        }
        let primary_aggregations = primary.aggregations.take();

        let slot = &mut state.slot;
        slot.primary.absorb(primary);
        slot.secondary.absorb(secondary);

        let aggregations = if query.wants_aggregations() {
            let mut aggregations = primary_aggregations.unwrap_or_default();
            let primary_buckets = aggregations.remove(PATH_AGGREGATION).map(|a| a.buckets).unwrap_or_default();
            slot.buckets = if round.secondary_eligible {
                let book_counts = slot.book_counts.as_deref().unwrap_or_default();
                merge_buckets(&primary_buckets, book_counts, &self.settings.secondary_owned_category)
            } else {
                primary_buckets
            };
            aggregations.insert(PATH_AGGREGATION.to_string(), AggregationBuckets { buckets: slot.buckets.clone() });
            Some(aggregations)
        } else {
            None
        };

        let hits = merge_queues(&mut slot.primary, &mut slot.secondary, query.sort_type.sort_key(), self.settings.pivot_tolerance);
        let total = if round.secondary_eligible && !query.applied_filters.is_empty() {
            filtered_total(&slot.buckets, &query.applied_filters)
        } else {
            slot.primary.total() + slot.secondary.total()
        };
        debug!(
            query = %query.query,
            start = query.start,
            emitted = hits.len(),
            total,
            buffered_primary = slot.primary.len(),
            buffered_secondary = slot.secondary.len(),
            "merged round"
        );

        let response = SearchResponse { hits: HitsPage { total, hits }, aggregations };
        let snapshot = slot.clone();
        state.cache.insert(round.key, CachedRound { response: response.clone(), slot: Some(snapshot) });
        Ok(response)
    }
}
