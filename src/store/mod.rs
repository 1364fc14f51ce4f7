//! Transactional key-value persistence with named partitions.
//!
//! The store knows nothing about releases: it maps string keys to opaque
//! byte values inside three partitions and guarantees that every write made
//! in one transaction commits or rolls back as a unit.

mod storage;
mod traits;

pub use storage::SqliteStore;
pub use traits::{Partition, Store, Transaction};
