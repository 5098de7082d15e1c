use std::collections::HashMap;

use fedsearch_core::types::Hit;

/// Fold hits that share a ref into one entry per ref.
///
/// Groups keep the position of their first hit. Within a group the hit with
/// the lowest `version_priority` leads and the others become its
/// `duplicates`; hits without a priority rank last.
pub fn collapse_versions(hits: Vec<Hit>) -> Vec<Hit> {
    let mut groups: Vec<Vec<Hit>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for hit in hits {
        match index.get(hit.reference()) {
            Some(&i) => groups[i].push(hit),
            None => {
                index.insert(hit.reference().to_string(), groups.len());
                groups.push(vec![hit]);
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|mut group| {
            group.sort_by_key(|h| h.source.version_priority.unwrap_or(i64::MAX));
            let mut rest = group.into_iter();
            let mut lead = rest.next()?;
            lead.duplicates.extend(rest);
            Some(lead)
        })
        .collect()
}
