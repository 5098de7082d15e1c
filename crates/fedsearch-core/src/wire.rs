//! JSON bodies exchanged with the two backend services.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::types::{Aggregations, HitSource, ResultType};

/// Body POSTed to the primary search-wrapper endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrimaryRequest {
    #[serde(rename = "type")]
    pub result_type: ResultType,
    pub query: String,
    pub field: String,
    pub source_proj: bool,
    pub slop: u32,
    pub start: usize,
    pub size: usize,
    pub filters: Vec<String>,
    pub filter_fields: Vec<String>,
    pub aggs: Vec<String>,
    pub sort_method: String,
    pub sort_fields: Vec<String>,
    pub sort_reverse: bool,
    pub sort_score_missing: Option<f64>,
}

/// `hits.total` is either a bare count or `{value, relation}` depending on
/// the engine version behind the wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WireTotal {
    Count(u64),
    Object { value: u64 },
}

impl WireTotal {
    pub fn value(&self) -> u64 {
        match self {
            Self::Count(n) | Self::Object { value: n } => *n,
        }
    }
}

impl Default for WireTotal {
    fn default() -> Self { Self::Count(0) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawPrimaryHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: HitSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PrimaryHits {
    #[serde(default)]
    pub total: WireTotal,
    #[serde(default)]
    pub hits: Vec<RawPrimaryHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PrimaryResponse {
    pub hits: PrimaryHits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Aggregations>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SecondarySort {
    Pagerank,
    CorpusOrderPath,
}

/// Body POSTed to the secondary service's `/search`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryRequest {
    pub query: String,
    pub from: usize,
    pub size: usize,
    #[serde(serialize_with = "books_or_false")]
    pub limited_to_books: Option<Vec<String>>,
    pub sort: SecondarySort,
    pub small_units_only: bool,
}

// The service expects `false`, not `null`, when no book restriction applies.
fn books_or_false<S: Serializer>(books: &Option<Vec<String>>, s: S) -> Result<S::Ok, S::Error> {
    match books {
        Some(list) => list.serialize(s),
        None => s.serialize_bool(false),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HighlightFragment {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryHit {
    pub xml_id: String,
    #[serde(default)]
    pub hebrew_path: String,
    #[serde(default)]
    pub pagerank: Option<f64>,
    #[serde(default)]
    pub highlight: Vec<HighlightFragment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SecondaryResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub hits: Vec<SecondaryHit>,
}

/// Body POSTed to the secondary service's `/books`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BooksRequest {
    pub query: String,
    pub small_units_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookCount {
    pub english_book_name: Vec<String>,
    pub count: u64,
}
