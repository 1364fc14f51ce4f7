//! SQLite-backed store implementation.

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

use super::traits::{Partition, Store, Transaction};
use crate::error::{StoreError, StoreResult};

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-based store. Each partition is a `key -> value` table.
pub struct SqliteStore {
  conn: Mutex<Option<Connection>>,
  path: PathBuf,
}

impl SqliteStore {
  /// Open (or create) the store at `path`, creating parent directories and
  /// every partition that does not exist yet.
  pub fn open(path: &Path) -> StoreResult<Self> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }

    let open_err = |source| StoreError::Open {
      path: path.to_path_buf(),
      source,
    };

    let conn = Connection::open(path).map_err(open_err)?;
    conn.busy_timeout(BUSY_TIMEOUT).map_err(open_err)?;
    conn.execute_batch(&schema()).map_err(open_err)?;

    debug!(path = %path.display(), "opened store");

    Ok(Self {
      conn: Mutex::new(Some(conn)),
      path: path.to_path_buf(),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Option<PathBuf> {
    let data_dir = dirs::data_dir().or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))?;

    Some(data_dir.join("relwatch").join("relwatch.db"))
  }

  fn lock(&self) -> StoreResult<MutexGuard<'_, Option<Connection>>> {
    self
      .conn
      .lock()
      .map_err(|e| StoreError::Poisoned(e.to_string()))
  }
}

/// One table per partition, keyed by text so iteration follows byte order.
fn schema() -> String {
  Partition::ALL
    .iter()
    .map(|p| {
      format!(
        "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY NOT NULL, value BLOB NOT NULL) WITHOUT ROWID;",
        p.name()
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

fn get_value(conn: &Connection, partition: Partition, key: &str) -> StoreResult<Option<Vec<u8>>> {
  let mut stmt = conn.prepare_cached(&format!("SELECT value FROM {} WHERE key = ?1", partition.name()))?;
  let value = stmt.query_row(params![key], |row| row.get(0)).optional()?;
  Ok(value)
}

fn put_value(conn: &Connection, partition: Partition, key: &str, value: &[u8]) -> StoreResult<()> {
  let mut stmt = conn.prepare_cached(&format!(
    "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
    partition.name()
  ))?;
  stmt.execute(params![key, value])?;
  Ok(())
}

/// Transaction handle passed to `with_transaction` closures.
struct SqliteTransaction<'a> {
  conn: &'a Connection,
}

impl Transaction for SqliteTransaction<'_> {
  fn get(&self, partition: Partition, key: &str) -> StoreResult<Option<Vec<u8>>> {
    get_value(self.conn, partition, key)
  }

  fn put(&mut self, partition: Partition, key: &str, value: &[u8]) -> StoreResult<()> {
    put_value(self.conn, partition, key, value)
  }
}

impl Store for SqliteStore {
  fn get(&self, partition: Partition, key: &str) -> StoreResult<Option<Vec<u8>>> {
    let guard = self.lock()?;
    let conn = guard.as_ref().ok_or(StoreError::Closed)?;
    get_value(conn, partition, key)
  }

  fn iterate(&self, partition: Partition) -> StoreResult<Vec<(String, Vec<u8>)>> {
    let guard = self.lock()?;
    let conn = guard.as_ref().ok_or(StoreError::Closed)?;

    let mut stmt = conn.prepare(&format!("SELECT key, value FROM {} ORDER BY key", partition.name()))?;
    let entries = stmt
      .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
      .collect::<Result<Vec<(String, Vec<u8>)>, _>>()?;

    Ok(entries)
  }

  fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
  where
    E: From<StoreError>,
    F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
  {
    let mut guard = self.lock()?;
    let conn = guard.as_mut().ok_or(StoreError::Closed)?;

    // Immediate: take the write lock up front so concurrent writers queue
    // instead of failing at commit time.
    let tx = conn
      .transaction_with_behavior(TransactionBehavior::Immediate)
      .map_err(StoreError::from)?;

    let value = f(&mut SqliteTransaction { conn: &tx })?;

    tx.commit().map_err(StoreError::from)?;
    Ok(value)
  }

  fn close(&self) -> StoreResult<()> {
    let mut guard = self.lock()?;
    if let Some(conn) = guard.take() {
      conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
      debug!(path = %self.path.display(), "closed store");
    }
    Ok(())
  }
}
