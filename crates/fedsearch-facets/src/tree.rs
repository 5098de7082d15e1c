use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use fedsearch_core::path::FacetPath;
use fedsearch_core::types::{FacetBucket, PATH_AGGREGATION};

use crate::node::FilterNode;
use crate::toc::TocEntry;

const COMMENTARY: &str = "Commentary";
const LEGACY_COMMENTARY: &str = "Commentary2";
const HE_COMMENTARY: &str = "מפרשי";

/// Bucket counts nested by path segment. A zero count means "not supplied".
#[derive(Debug, Default)]
struct RawNode {
    doc_count: u64,
    children: BTreeMap<String, RawNode>,
}

impl RawNode {
    fn insert(&mut self, path: &FacetPath, doc_count: u64) {
        let mut node = self;
        for segment in path.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.doc_count = doc_count;
    }

    /// Interior nodes without their own count take the sum of their children.
    fn aggregate(&mut self) -> u64 {
        let summed: u64 = self.children.values_mut().map(RawNode::aggregate).sum();
        if self.doc_count == 0 {
            self.doc_count = summed;
        }
        self.doc_count
    }

    fn lookup(&self, path: &FacetPath) -> Option<&RawNode> {
        path.segments().iter().try_fold(self, |node, segment| node.children.get(segment))
    }
}

/// Text filters in table-of-contents order plus a key index into them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTree {
    pub available: Vec<FilterNode>,
    registry: HashMap<String, Vec<usize>>,
}

impl FilterTree {
    fn new(available: Vec<FilterNode>) -> Self {
        let mut registry = HashMap::new();
        let mut trail = Vec::new();
        for (i, node) in available.iter().enumerate() {
            trail.push(i);
            index_node(node, &mut trail, &mut registry);
            trail.pop();
        }
        Self { available, registry }
    }

    pub fn contains(&self, agg_key: &str) -> bool { self.registry.contains_key(agg_key) }

    pub fn keys(&self) -> impl Iterator<Item = &str> { self.registry.keys().map(String::as_str) }

    pub fn get(&self, agg_key: &str) -> Option<&FilterNode> {
        let trail = self.registry.get(agg_key)?;
        let (first, rest) = trail.split_first()?;
        rest.iter().try_fold(self.available.get(*first)?, |node, i| node.children.get(*i))
    }

    pub fn get_mut(&mut self, agg_key: &str) -> Option<&mut FilterNode> {
        let trail = self.registry.get(agg_key)?;
        let (first, rest) = trail.split_first()?;
        rest.iter().try_fold(self.available.get_mut(*first)?, |node, i| node.children.get_mut(*i))
    }

    /// Mark applied keys selected. Keys with no node (filters on content the
    /// current results do not contain) come back as orphans.
    pub fn apply(&mut self, applied: &[String]) -> Vec<String> {
        let mut orphans = Vec::new();
        for key in applied {
            match self.get_mut(key) {
                Some(node) => node.set_selected(true),
                None => orphans.push(key.clone()),
            }
        }
        if !orphans.is_empty() {
            debug!(?orphans, "applied filters without matching results");
        }
        orphans
    }
}

fn index_node(node: &FilterNode, trail: &mut Vec<usize>, registry: &mut HashMap<String, Vec<usize>>) {
    registry.insert(node.agg_key.clone(), trail.clone());
    for (i, child) in node.children.iter().enumerate() {
        trail.push(i);
        index_node(child, trail, registry);
        trail.pop();
    }
}

/// Build the text filter tree for `buckets`, walking `toc` for order and
/// Hebrew titles. Applied filters always get a node path, even at zero count.
pub fn build_filter_tree(buckets: &[FacetBucket], applied: &[String], toc: &[TocEntry]) -> FilterTree {
    let mut raw = RawNode::default();
    for key in applied {
        raw.insert(&FacetPath::parse(key), 0);
    }
    for bucket in buckets {
        raw.insert(&FacetPath::parse(&bucket.key), bucket.doc_count);
    }
    raw.aggregate();

    let mut available = Vec::new();
    let mut path = FacetPath::root();
    for entry in toc {
        if let Some(node) = walk(entry, &mut path, &raw) {
            available.push(node);
        }
        if let Some(commentary) = commentary_node(entry, &raw) {
            available.push(commentary);
        }
    }
    FilterTree::new(available)
}

fn walk(entry: &TocEntry, path: &mut FacetPath, raw: &RawNode) -> Option<FilterNode> {
    let (title, he_title) = entry.names();
    path.push(title);
    let node = raw.lookup(path).map(|found| {
        let mut node = FilterNode {
            title: title.to_string(),
            he_title: he_title.to_string(),
            agg_key: path.to_key(),
            agg_type: Some(PATH_AGGREGATION.to_string()),
            doc_count: found.doc_count,
            selected: false,
            children: Vec::new(),
        };
        for child in entry.contents() {
            if let Some(c) = walk(child, path, raw) {
                node.children.push(c);
            }
        }
        node
    });
    path.pop();
    node
}

// Commentary on a top-level category is indexed under `Commentary/<Cat>` (and a
// legacy `Commentary2/<Cat>`) rather than inside the category itself.
fn commentary_node(entry: &TocEntry, raw: &RawNode) -> Option<FilterNode> {
    let TocEntry::Category { category, he_category, .. } = entry else { return None };
    let counts: Vec<u64> = [COMMENTARY, LEGACY_COMMENTARY]
        .iter()
        .filter_map(|root| raw.lookup(&FacetPath::parse(&format!("{root}/{category}"))))
        .map(|n| n.doc_count)
        .collect();
    if counts.is_empty() {
        return None;
    }
    Some(FilterNode {
        title: format!("{category} Commentary"),
        he_title: format!("{HE_COMMENTARY} {he_category}"),
        agg_key: format!("{COMMENTARY}/{category}"),
        agg_type: Some(PATH_AGGREGATION.to_string()),
        doc_count: counts.iter().sum(),
        selected: false,
        children: Vec::new(),
    })
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextFilters {
    pub tree: FilterTree,
    pub orphans: Vec<String>,
}

pub fn build_and_apply_text_filters(buckets: &[FacetBucket], applied: &[String], toc: &[TocEntry]) -> TextFilters {
    let mut tree = build_filter_tree(buckets, applied, toc);
    let orphans = tree.apply(applied);
    TextFilters { tree, orphans }
}
