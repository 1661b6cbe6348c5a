//! Persistence boundary: an in-memory repository-style store with
//! explicit unit-of-work transactions, plus whole-state JSON snapshots
//! for durability between runs of the host application.

pub mod memory;
pub mod snapshot;

pub use memory::{MemoryStore, StoreState, UnitOfWork};
