//! Merging two independently paginated, independently scored result queues
//! into one globally ordered page.
//!
//! Each round only emits hits that are at or below the lower of the two
//! queues' frontiers, so a hit can never be emitted ahead of an unseen hit
//! from the other backend. Whatever lies past the frontier stays buffered for
//! the next round.

use fedsearch_core::path::FacetPath;
use fedsearch_core::queue::ResultQueue;
use fedsearch_core::types::{FacetBucket, Hit, SortKey};

pub fn sort_hits(hits: &mut [Hit], key: SortKey) {
    hits.sort_by(|a, b| a.sort_value(key).total_cmp(&b.sort_value(key)));
}

/// Population mean and standard deviation of the hits' scores.
fn score_stats(hits: &[Hit]) -> (f64, f64) {
    if hits.is_empty() {
        return (0.0, 0.0);
    }
    let n = hits.len() as f64;
    let mean = hits.iter().map(|h| h.score).sum::<f64>() / n;
    let variance = hits.iter().map(|h| (h.score - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Rescale and shift secondary scores so their spread and centre match the
/// primary's. Statistics cover only the currently buffered hits.
pub fn reconcile_scores(primary: &[Hit], secondary: &mut [Hit]) {
    let (primary_mean, primary_std) = score_stats(primary);
    let (_, secondary_std) = score_stats(secondary);
    let factor = if secondary_std == 0.0 { 1.0 } else { primary_std / secondary_std };
    for hit in secondary.iter_mut() {
        hit.score *= factor;
    }
    let (secondary_mean, _) = score_stats(secondary);
    let delta = primary_mean - secondary_mean;
    for hit in secondary.iter_mut() {
        hit.score += delta;
    }
}

/// Index of the first hit strictly past `boundary` in an ascending queue.
/// Values within `tolerance` of the boundary count as reached.
pub fn pivot(queue: &[Hit], boundary: f64, key: SortKey, tolerance: f64) -> usize {
    queue
        .iter()
        .position(|h| h.sort_value(key) > boundary + tolerance)
        .unwrap_or(queue.len())
}

/// Sort value of the last buffered hit; the queue must already be sorted.
fn frontier(queue: &ResultQueue, key: SortKey) -> f64 {
    queue.hits().last().map_or(f64::NEG_INFINITY, |h| h.sort_value(key))
}

/// Emit the next globally ordered page and leave the surplus buffered.
pub fn merge_queues(primary: &mut ResultQueue, secondary: &mut ResultQueue, key: SortKey, tolerance: f64) -> Vec<Hit> {
    if primary.is_empty() || secondary.is_empty() {
        let mut page = secondary.drain_all();
        page.extend(primary.drain_all());
        sort_hits(&mut page, key);
        return page;
    }

    if key == SortKey::Score {
        let (p, s) = (primary.hits().to_vec(), secondary.hits_mut());
        reconcile_scores(&p, s);
    }
    // leftovers and freshly absorbed hits are not in order with each other
    sort_hits(primary.hits_mut(), key);
    sort_hits(secondary.hits_mut(), key);

    let (primary_pivot, secondary_pivot) = if primary.is_exhausted() && secondary.is_exhausted() {
        // last chance to emit anything
        (primary.len(), secondary.len())
    } else {
        let boundary = frontier(primary, key).min(frontier(secondary, key));
        (pivot(primary.hits(), boundary, key, tolerance), pivot(secondary.hits(), boundary, key, tolerance))
    };

    let mut page = secondary.take_prefix(secondary_pivot);
    page.extend(primary.take_prefix(primary_pivot));
    sort_hits(&mut page, key);
    page
}

/// Documents under any of `filters`, counted from facet buckets.
pub fn filtered_total(buckets: &[FacetBucket], filters: &[String]) -> u64 {
    let filters: Vec<FacetPath> = filters.iter().map(|f| FacetPath::parse(f)).collect();
    buckets
        .iter()
        .filter(|b| {
            let path = FacetPath::parse(&b.key);
            filters.iter().any(|f| path.starts_with(f))
        })
        .map(|b| b.doc_count)
        .sum()
}

/// Primary buckets minus the category the secondary backend owns, followed by
/// the secondary's per-book counts.
pub fn merge_buckets(primary: &[FacetBucket], secondary: &[FacetBucket], owned_category: &str) -> Vec<FacetBucket> {
    primary
        .iter()
        .filter(|b| FacetPath::parse(&b.key).first() != Some(owned_category))
        .chain(secondary)
        .cloned()
        .collect()
}
