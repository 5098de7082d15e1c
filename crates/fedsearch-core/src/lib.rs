#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod abort;
pub mod config;
pub mod error;
pub mod path;
pub mod queue;
pub mod traits;
pub mod types;
pub mod wire;
