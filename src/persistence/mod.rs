//! Persistence Layer
//!
//! The only state that survives between invocations is the last observed
//! gateway classification.

pub mod state_store;

pub use state_store::StateStore;
