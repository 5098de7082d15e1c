use serde::Serialize;

/// One selectable facet in the search sidebar.
///
/// `agg_key` is the `/`-joined category path for text filters, or the bucket
/// key for sheet filters. `agg_type` names the aggregation the key filters on.
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilterNode {
    pub title: String,
    pub he_title: String,
    pub agg_key: String,
    pub agg_type: Option<String>,
    pub doc_count: u64,
    pub selected: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FilterNode>,
}

impl FilterNode {
    pub fn has_children(&self) -> bool { !self.children.is_empty() }

    /// Select or clear this node and everything under it.
    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
        for child in &mut self.children {
            child.set_selected(selected);
        }
    }

    /// Some, but not necessarily all, descendants are selected.
    pub fn is_partially_selected(&self) -> bool {
        !self.selected && self.children.iter().any(|c| c.selected || c.is_partially_selected())
    }

    /// The smallest set of keys that reproduces the current selection.
    pub fn applied_filters(&self) -> Vec<String> {
        if self.selected {
            return vec![self.agg_key.clone()];
        }
        self.children.iter().flat_map(FilterNode::applied_filters).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppliedFilters {
    pub filters: Vec<String>,
    pub agg_types: Vec<String>,
}

/// Collect applied keys from the available filters, paired with their
/// top-level node's aggregation type.
pub fn applied_search_filters(available: &[FilterNode]) -> AppliedFilters {
    let mut out = AppliedFilters::default();
    for top in available {
        let applied = top.applied_filters();
        let agg_type = top.agg_type.clone().unwrap_or_default();
        out.agg_types.extend(std::iter::repeat(agg_type).take(applied.len()));
        out.filters.extend(applied);
    }
    out
}
