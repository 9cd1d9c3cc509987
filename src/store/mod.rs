//! Durable storage for campaign state
//!
//! Everything here is synchronous local file I/O behind coarse per-store
//! locks; failures are logged and degrade to "treat as absent" rather than
//! propagating into game logic.

mod action_store;
mod data_store;
mod execution_counts;

pub use action_store::{ActionStore, ACTIONS_SALT_KEY};
pub use data_store::SimpleDataStore;
pub use execution_counts::ExecutionCountManager;
