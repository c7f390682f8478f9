//! Deterministic test doubles
//!
//! Shared by unit tests and the integration suite, so they live in the
//! library rather than behind `cfg(test)`.

pub mod mocks;

pub use mocks::{MockLlmProvider, StaticMarketDataSource};
