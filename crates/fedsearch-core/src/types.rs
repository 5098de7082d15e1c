//! Domain types shared by the adapters, the merge engine and the facade.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Which backend produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Primary,
    Secondary,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    #[default]
    Text,
    Sheet,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortType {
    #[default]
    Relevance,
    Chronological,
    DateCreated,
    NumViews,
}

/// The hit field a merged page is ordered by. Ascending is always "better first".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Score,
    CompDate,
}

impl SortType {
    pub fn sort_key(self) -> SortKey {
        match self {
            Self::Relevance => SortKey::Score,
            _ => SortKey::CompDate,
        }
    }
}

fn default_size() -> usize { 10 }
fn default_field() -> String { "naive_lemmatizer".to_string() }

/// One search request as issued by the reader UI.
///
/// `start == 0` marks a fresh query; anything greater is a continuation of the
/// query currently occupying the slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QueryDescriptor {
    #[serde(default)]
    pub query: String,
    #[serde(rename = "type", default)]
    pub result_type: ResultType,
    #[serde(default)]
    pub start: usize,
    #[serde(default = "default_size")]
    pub size: usize,
    #[serde(default = "default_field")]
    pub field: String,
    #[serde(default)]
    pub sort_type: SortType,
    #[serde(default)]
    pub applied_filters: Vec<String>,
    #[serde(rename = "appliedFilterAggTypes", default)]
    pub applied_filter_agg_types: Vec<String>,
    #[serde(rename = "aggregationsToUpdate", default)]
    pub aggregations_to_update: Vec<String>,
    #[serde(default)]
    pub exact: bool,
}

impl QueryDescriptor {
    pub fn new(query: impl Into<String>, result_type: ResultType) -> Self {
        Self { query: query.into(), result_type, size: default_size(), field: default_field(), ..Self::default() }
    }

    pub fn is_blank(&self) -> bool { self.query.trim().is_empty() }

    pub fn is_continuation(&self) -> bool { self.start > 0 }

    pub fn wants_aggregations(&self) -> bool { !self.aggregations_to_update.is_empty() }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidQuery("size must be greater than zero".into()));
        }
        if self.applied_filters.len() != self.applied_filter_agg_types.len() {
            return Err(Error::InvalidQuery(format!(
                "{} applied filters but {} filter aggregation types",
                self.applied_filters.len(),
                self.applied_filter_agg_types.len()
            )));
        }
        Ok(())
    }

    /// Stable serialization used as the result-cache key.
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// The document payload of a hit. Unknown backend fields survive in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HitSource {
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(rename = "heRef", default, skip_serializing_if = "Option::is_none")]
    pub he_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp_date: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_priority: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical hit shape produced by both adapters.
///
/// `score` is negated relevance so that both sort keys order ascending.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: HitSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,
    pub score: f64,
    pub comp_date: f64,
    #[serde(rename = "cameFrom")]
    pub came_from: Origin,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<Hit>,
}

impl Hit {
    pub fn sort_value(&self, key: SortKey) -> f64 {
        match key {
            SortKey::Score => self.score,
            SortKey::CompDate => self.comp_date,
        }
    }

    pub fn reference(&self) -> &str { &self.source.reference }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FacetBucket {
    pub key: String,
    pub doc_count: u64,
}

impl FacetBucket {
    pub fn new(key: impl Into<String>, doc_count: u64) -> Self { Self { key: key.into(), doc_count } }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AggregationBuckets {
    #[serde(default)]
    pub buckets: Vec<FacetBucket>,
}

/// Aggregation name (`path`, `group`, `topics_en`, ...) to its buckets.
pub type Aggregations = BTreeMap<String, AggregationBuckets>;

pub const PATH_AGGREGATION: &str = "path";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct HitsPage {
    pub total: u64,
    pub hits: Vec<Hit>,
}

/// What the facade hands back to the caller for one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchResponse {
    pub hits: HitsPage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Aggregations>,
}

impl SearchResponse {
    pub fn path_buckets(&self) -> &[FacetBucket] {
        self.aggregations
            .as_ref()
            .and_then(|aggs| aggs.get(PATH_AGGREGATION))
            .map_or(&[], |agg| agg.buckets.as_slice())
    }
}

/// One round of results from a single backend, already normalized.
///
/// `fetched` counts the raw hits the backend returned this round, which may
/// differ from `hits.len()` when malformed or excluded hits were dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BackendPage {
    pub total: u64,
    pub fetched: usize,
    pub hits: Vec<Hit>,
    pub aggregations: Option<Aggregations>,
}

impl BackendPage {
    pub fn empty(total: u64) -> Self { Self { total, ..Self::default() } }
}
