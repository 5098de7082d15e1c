#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod facade;
pub mod merge;
pub mod versions;

pub use facade::{FederatedSearch, HttpFederatedSearch};
pub use versions::collapse_versions;
