//! Shared pool storage and per-node active sets.

mod active;
mod store;

pub use active::ActiveSet;
pub use store::{Pool, PoolSlot, PoolStats};
