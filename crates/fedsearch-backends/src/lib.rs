//! fedsearch-backends
//!
//! Adapters that translate a [`QueryDescriptor`](fedsearch_core::types::QueryDescriptor)
//! into each backend's wire format and normalize the answers into canonical
//! hits, plus `reqwest` transports for both services.

pub mod http;
pub mod primary;
pub mod secondary;

pub use http::{HttpPrimary, HttpSecondary};
pub use primary::PrimaryAdapter;
pub use secondary::{is_secondary_query, SecondaryAdapter};
