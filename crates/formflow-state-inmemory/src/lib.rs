//! In-memory selection store for the Formflow engine
//!
//! Caches the customer's selected account and branch between form sessions.
//! Useful for development, tests and single-process kiosks where persistence
//! is not required.

pub mod selection_store;
pub use selection_store::InMemorySelectionStore;
