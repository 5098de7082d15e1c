use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use fedsearch_backends::primary::{decorate_text_hits, sort_metadata};
use fedsearch_backends::secondary::{book_bucket, to_book_filter};
use fedsearch_backends::{is_secondary_query, PrimaryAdapter, SecondaryAdapter};
use fedsearch_core::abort::QueryAborter;
use fedsearch_core::config::SearchSettings;
use fedsearch_core::error::{Error, Result};
use fedsearch_core::queue::QueueCursor;
use fedsearch_core::traits::{PrimaryBackend, SecondaryBackend};
use fedsearch_core::types::{Origin, QueryDescriptor, ResultType, SortType};
use fedsearch_core::wire::{BookCount, BooksRequest, PrimaryRequest, PrimaryResponse, SecondaryRequest, SecondaryResponse};

struct CannedPrimary {
    response: serde_json::Value,
    calls: AtomicUsize,
    last: Mutex<Option<PrimaryRequest>>,
}

impl CannedPrimary {
    fn new(response: serde_json::Value) -> Self { Self { response, calls: AtomicUsize::new(0), last: Mutex::new(None) } }
}

#[async_trait]
impl PrimaryBackend for CannedPrimary {
    async fn search(&self, request: &PrimaryRequest) -> Result<PrimaryResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        serde_json::from_value(self.response.clone()).map_err(|e| Error::Malformed(e.to_string()))
    }
}

struct CannedSecondary {
    response: serde_json::Value,
    books_delay: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl SecondaryBackend for CannedSecondary {
    async fn search(&self, _request: &SecondaryRequest) -> Result<SecondaryResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        serde_json::from_value(self.response.clone()).map_err(|e| Error::Malformed(e.to_string()))
    }

    async fn books(&self, _request: &BooksRequest) -> Result<Vec<BookCount>> {
        tokio::time::sleep(self.books_delay).await;
        Ok(vec![BookCount { english_book_name: vec!["Tanakh".into(), "Torah".into(), "Genesis".into()], count: 3 }])
    }
}

fn primary_hits(scores: &[f64]) -> serde_json::Value {
    let hits: Vec<_> = scores
        .iter()
        .enumerate()
        .map(|(i, s)| serde_json::json!({
            "_id": format!("Genesis {} (Tanakh: The Holy Scriptures [en])", i + 1),
            "_score": s,
            "_source": {"ref": format!("Genesis {}", i + 1), "categories": ["Tanakh", "Torah"], "comp_date": -1400 + i as i64}
        }))
        .collect();
    serde_json::json!({"hits": {"total": scores.len(), "hits": hits}})
}

fn text_query(q: &str) -> QueryDescriptor { QueryDescriptor::new(q, ResultType::Text) }

fn fresh_cursor() -> QueueCursor { QueueCursor { last_seen: -1, total: 0 } }

#[test]
fn eligibility_rejects_any_latin_letter() {
    assert!(is_secondary_query("שלום"));
    assert!(is_secondary_query("שלום 123"));
    assert!(!is_secondary_query("שלום abc"));
    assert!(!is_secondary_query("love"));
}

#[test]
fn primary_request_follows_descriptor() {
    let settings = SearchSettings::default();
    let adapter = PrimaryAdapter::new(CannedPrimary::new(primary_hits(&[])), &settings);
    let mut q = text_query("love");
    q.applied_filters = vec!["Tanakh/Torah".into()];
    q.applied_filter_agg_types = vec!["path".into()];
    q.aggregations_to_update = vec!["path".into()];

    let fuzzy = adapter.build_request(&q, 0).unwrap();
    assert_eq!(fuzzy.slop, 10);
    assert_eq!(fuzzy.sort_method, "score");
    assert_eq!(fuzzy.sort_fields, vec!["pagesheetrank".to_string()]);
    assert!(fuzzy.sort_reverse);
    assert_eq!(fuzzy.sort_score_missing, Some(0.04));
    assert_eq!(fuzzy.filters, vec!["Tanakh/Torah".to_string()]);
    assert_eq!(fuzzy.filter_fields, vec!["path".to_string()]);

    q.exact = true;
    q.sort_type = SortType::Chronological;
    let exact = adapter.build_request(&q, 30).unwrap();
    assert_eq!(exact.slop, 0);
    assert_eq!(exact.start, 30);
    assert_eq!(exact.sort_fields, vec!["comp_date".to_string(), "order".to_string()]);
    assert!(!exact.sort_reverse);
}

#[test]
fn sheet_only_sorts_are_rejected_for_text() {
    assert!(sort_metadata(ResultType::Text, SortType::NumViews).is_err());
    assert!(sort_metadata(ResultType::Sheet, SortType::Chronological).is_err());
    assert_eq!(sort_metadata(ResultType::Sheet, SortType::NumViews).unwrap().fields, &["views"]);
}

#[test]
fn primary_hits_are_tagged_and_negated() {
    let response: PrimaryResponse = serde_json::from_value(primary_hits(&[0.9, 0.5])).unwrap();
    let page = decorate_text_hits(response);
    assert_eq!(page.total, 2);
    assert_eq!(page.fetched, 2);
    assert!(page.hits.iter().all(|h| h.came_from == Origin::Primary));
    assert!((page.hits[0].score + 0.9).abs() < 1e-12);
    assert!((page.hits[1].comp_date - -1399.0).abs() < 1e-12);
}

#[tokio::test]
async fn primary_continuation_skips_exhausted_backend() {
    let settings = SearchSettings::default();
    let adapter = PrimaryAdapter::new(CannedPrimary::new(primary_hits(&[1.0])), &settings);
    let mut q = text_query("love");
    q.start = 10;
    let page = adapter.query(&q, QueueCursor { last_seen: 7, total: 8 }, &QueryAborter::new()).await.unwrap();
    assert_eq!(page.total, 8);
    assert!(page.hits.is_empty());
    assert_eq!(adapter.backend().calls.load(Ordering::SeqCst), 0);

    let page = adapter.query(&q, QueueCursor { last_seen: 4, total: 8 }, &QueryAborter::new()).await.unwrap();
    assert_eq!(page.fetched, 1);
    let sent = adapter.backend().last.lock().unwrap().clone().unwrap();
    assert_eq!(sent.start, 5, "continuations resume after the last fetched hit");
}

#[tokio::test]
async fn sheet_results_keep_native_scores() {
    let settings = SearchSettings::default();
    let body = serde_json::json!({
        "hits": {"total": {"value": 1}, "hits": [{"_id": "sheet-1", "_score": 2.5, "_source": {"title": "Shabbat"}}]},
        "aggregations": {"group": {"buckets": [{"key": "Educators", "doc_count": 1}]}}
    });
    let adapter = PrimaryAdapter::new(CannedPrimary::new(body), &settings);
    let mut q = QueryDescriptor::new("shabbat", ResultType::Sheet);
    q.start = 20;
    let out = adapter.query_sheets(&q, &QueryAborter::new()).await.unwrap();
    assert_eq!(out.hits.total, 1);
    assert!((out.hits.hits[0].score - 2.5).abs() < 1e-12);
    assert_eq!(out.hits.hits[0].source.extra["title"], "Shabbat");
    assert!(out.aggregations.unwrap().contains_key("group"));
    assert_eq!(adapter.backend().last.lock().unwrap().as_ref().unwrap().start, 20);
}

#[test]
fn secondary_request_translation() {
    let settings = SearchSettings::default();
    let adapter = SecondaryAdapter::new(
        CannedSecondary { response: serde_json::json!({}), books_delay: Duration::ZERO, calls: AtomicUsize::new(0) },
        &settings,
    );
    let mut q = text_query("בראשית");
    q.applied_filters = vec!["Tanakh/Writings/Song of Songs".into()];
    q.applied_filter_agg_types = vec!["path".into()];
    let req = adapter.build_request(&q, 12);
    assert_eq!(req.from, 12);
    assert_eq!(req.limited_to_books, Some(vec!["Tanakh.Writings.Song_of_Songs".to_string()]));
    assert_eq!(req.sort, fedsearch_core::wire::SecondarySort::Pagerank);
    assert!(req.small_units_only);

    q.sort_type = SortType::Chronological;
    assert_eq!(adapter.build_request(&q, 0).sort, fedsearch_core::wire::SecondarySort::CorpusOrderPath);
    assert_eq!(to_book_filter("Tanakh/Torah"), "Tanakh.Torah");
}

#[tokio::test]
async fn secondary_hits_are_reshaped() {
    let settings = SearchSettings::default();
    let body = serde_json::json!({"total": 40, "hits": [
        {"xmlId": "Tanakh.Torah.Genesis.1.1", "hebrewPath": "בראשית א:א", "pagerank": 0.7, "highlight": [{"text": "<b>בראשית</b> ברא"}]},
        {"xmlId": "Tanakh.Writings.Song_of_Songs.2.4", "hebrewPath": "שיר השירים ב:ד", "highlight": []},
        {"xmlId": "broken", "hebrewPath": ""}
    ]});
    let adapter = SecondaryAdapter::new(
        CannedSecondary { response: body, books_delay: Duration::ZERO, calls: AtomicUsize::new(0) },
        &settings,
    );
    let page = adapter.query(&text_query("בראשית"), fresh_cursor(), &QueryAborter::new()).await.unwrap();
    assert_eq!(page.total, 40);
    assert_eq!(page.fetched, 3, "malformed hits still advance the cursor");
    assert_eq!(page.hits.len(), 2);

    let first = &page.hits[0];
    assert_eq!(first.reference(), "Genesis 1:1");
    assert_eq!(first.source.he_ref.as_deref(), Some("בראשית א:א"));
    assert_eq!(first.source.categories, vec!["Tanakh".to_string(), "Torah".to_string()]);
    assert_eq!(first.id, "Genesis 1:1 (Tanach with Ta'amei Hamikra [he])");
    assert_eq!(first.came_from, Origin::Secondary);
    assert!((first.score + 0.7).abs() < 1e-12);
    assert!((first.comp_date - -10000.0).abs() < 1e-12);
    assert_eq!(first.highlight.as_ref().unwrap()["naive_lemmatizer"][0], "<b>בראשית</b> ברא");

    let second = &page.hits[1];
    assert_eq!(second.reference(), "Song of Songs 2:4");
    assert!(second.score.abs() < 1e-12, "missing pagerank scores zero");
    assert!((second.comp_date - -9999.0).abs() < 1e-12);
    assert!(second.highlight.is_none());
}

#[tokio::test]
async fn exhausted_secondary_continuation_makes_no_request() {
    let settings = SearchSettings::default();
    let adapter = SecondaryAdapter::new(
        CannedSecondary { response: serde_json::json!({"total": 20, "hits": []}), books_delay: Duration::ZERO, calls: AtomicUsize::new(0) },
        &settings,
    );
    let mut q = text_query("שלום");
    q.start = 5;
    let page = adapter.query(&q, QueueCursor { last_seen: 19, total: 20 }, &QueryAborter::new()).await.unwrap();
    assert_eq!(page.total, 20);
    assert!(page.hits.is_empty());
    assert_eq!(adapter.backend().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_book_counts_time_out() {
    let settings = SearchSettings::default();
    let slow = SecondaryAdapter::new(
        CannedSecondary { response: serde_json::json!({}), books_delay: Duration::from_secs(10), calls: AtomicUsize::new(0) },
        &settings,
    );
    let err = slow.book_counts(&text_query("שלום"), &QueryAborter::new()).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { origin: Origin::Secondary, after_ms: 3000 }));

    let quick = SecondaryAdapter::new(
        CannedSecondary { response: serde_json::json!({}), books_delay: Duration::from_millis(10), calls: AtomicUsize::new(0) },
        &settings,
    );
    let buckets = quick.book_counts(&text_query("שלום"), &QueryAborter::new()).await.unwrap();
    assert_eq!(buckets[0].key, "Tanakh/Torah/Genesis");
    assert_eq!(buckets[0].doc_count, 3);
}

#[test]
fn book_names_become_bucket_paths() {
    let bucket = book_bucket(BookCount { english_book_name: vec!["Tanakh".into(), "Writings".into(), "Song_of_Songs".into()], count: 9 });
    assert_eq!(bucket.key, "Tanakh/Writings/Song of Songs");
    assert_eq!(bucket.doc_count, 9);
}
