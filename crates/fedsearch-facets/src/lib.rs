//! fedsearch-facets
//!
//! Turns flat aggregation buckets into the filter trees the reader shows next
//! to search results: a hierarchical tree ordered like the library's table of
//! contents for text results, and flat lists for sheet results.

pub mod node;
pub mod sheet;
pub mod toc;
pub mod tree;

pub use node::{applied_search_filters, AppliedFilters, FilterNode};
pub use sheet::build_sheet_filters;
pub use toc::{load_toc, TocEntry};
pub use tree::{build_and_apply_text_filters, build_filter_tree, FilterTree, TextFilters};
