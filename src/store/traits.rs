//! Core traits and types for the key-value store.

use crate::error::{StoreError, StoreResult};

/// Named partitions of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
  /// Tracked projects: name -> display url
  Projects,
  /// Freshness tokens: "{name}-{kind}" -> opaque token
  Tokens,
  /// Resolved releases: "{name}-{kind}" -> release record
  Releases,
}

impl Partition {
  pub const ALL: [Partition; 3] = [Partition::Projects, Partition::Tokens, Partition::Releases];

  /// Partition name, also used as the backing table name.
  pub fn name(self) -> &'static str {
    match self {
      Partition::Projects => "projects",
      Partition::Tokens => "tokens",
      Partition::Releases => "releases",
    }
  }
}

/// Mutations and reads available inside a transaction.
///
/// Everything written through a `Transaction` commits together when the
/// transaction closure returns `Ok`, and is discarded when it returns `Err`.
pub trait Transaction {
  fn get(&self, partition: Partition, key: &str) -> StoreResult<Option<Vec<u8>>>;

  fn put(&mut self, partition: Partition, key: &str, value: &[u8]) -> StoreResult<()>;
}

/// Trait for store backends.
///
/// Writers are exclusive: a transaction holds the store for its whole
/// duration, so writes from concurrent resolutions serialize.
pub trait Store: Send + Sync {
  /// Read a single key.
  fn get(&self, partition: Partition, key: &str) -> StoreResult<Option<Vec<u8>>>;

  /// Write a single key in its own transaction.
  fn put(&self, partition: Partition, key: &str, value: &[u8]) -> StoreResult<()> {
    self.with_transaction(|tx| tx.put(partition, key, value))
  }

  /// All entries of a partition in natural (bytewise) key order.
  fn iterate(&self, partition: Partition) -> StoreResult<Vec<(String, Vec<u8>)>>;

  /// Run `f` with exclusive write access; commit on `Ok`, roll back on `Err`.
  fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
  where
    E: From<StoreError>,
    F: FnOnce(&mut dyn Transaction) -> Result<T, E>;

  /// Release the backing handle. Safe to call more than once.
  fn close(&self) -> StoreResult<()>;
}
