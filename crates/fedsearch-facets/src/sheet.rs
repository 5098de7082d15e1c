use std::collections::HashMap;

use fedsearch_core::types::FacetBucket;

use crate::node::FilterNode;

const GROUP_AGGREGATION: &str = "group";

pub fn is_hebrew(text: &str) -> bool {
    text.chars().any(|c| ('\u{0590}'..='\u{05FF}').contains(&c))
}

/// Flat sheet filters for one aggregation dimension (`group`, `topics_en`, ...).
///
/// Hebrew bucket keys become the Hebrew title; other keys are English titles
/// whose Hebrew comes from `terms`, except for groups which have none. A node
/// is selected only when both its key and its dimension were applied together.
pub fn build_sheet_filters(
    buckets: &[FacetBucket],
    applied: &[String],
    applied_types: &[String],
    agg_type: &str,
    terms: &HashMap<String, String>,
) -> Vec<FilterNode> {
    buckets
        .iter()
        .map(|b| {
            let hebrew = is_hebrew(&b.key);
            let title = if hebrew { String::new() } else { b.key.clone() };
            let he_title = if hebrew {
                b.key.clone()
            } else if agg_type == GROUP_AGGREGATION {
                String::new()
            } else {
                terms.get(&b.key).cloned().unwrap_or_default()
            };
            let agg_key = if title.is_empty() { he_title.clone() } else { title.clone() };
            let selected = applied
                .iter()
                .zip(applied_types)
                .any(|(key, kind)| *key == agg_key && kind == agg_type);
            FilterNode {
                title,
                he_title,
                agg_key,
                agg_type: Some(agg_type.to_string()),
                doc_count: b.doc_count,
                selected,
                children: Vec::new(),
            }
        })
        .collect()
}
