//! Test support for MovieCore store implementations.
//!
//! - [`contract`]: scenario functions every `MovieStore` must pass, and the
//!   [`movie_store_contract_tests!`] macro that turns them into `#[tokio::test]`s
//! - [`chaos`]: wrappers that inject infrastructure failures into stores and
//!   sources

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use, unused_results)]

pub mod chaos;
pub mod contract;

pub use chaos::{ChaosConfig, ChaosStore, ChaosStoreExt, Probability};
pub use contract::{ContractTestFailure, ContractTestResult};
