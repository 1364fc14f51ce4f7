//! Test doubles for the store and the upstream source.

use reqwest::StatusCode;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::db::{Project, Release, ReleaseKind};
use crate::error::{StoreError, StoreResult, UpstreamError};
use crate::github::{ApiRelease, Fetch, ReleaseSource};
use crate::store::{Partition, SqliteStore, Store, Transaction};

pub fn release(tag: &str, prerelease: bool) -> Release {
  Release {
    tag: tag.to_string(),
    url: format!("https://github.com/docker/cli/releases/tag/{}", tag),
    prerelease,
    published_at: None,
  }
}

pub fn api_release(tag: &str, prerelease: bool, draft: bool) -> ApiRelease {
  ApiRelease {
    tag_name: tag.to_string(),
    html_url: format!("https://github.com/docker/cli/releases/tag/{}", tag),
    draft,
    prerelease,
    published_at: None,
  }
}

// ============================================================================
// Store wrapper
// ============================================================================

/// SQLite store that counts writes and can fail writes to one partition.
pub struct TestStore {
  inner: SqliteStore,
  writes: AtomicUsize,
  failing: Mutex<Option<Partition>>,
}

impl TestStore {
  pub fn open(dir: &Path) -> Self {
    Self {
      inner: SqliteStore::open(&dir.join("relwatch.db")).unwrap(),
      writes: AtomicUsize::new(0),
      failing: Mutex::new(None),
    }
  }

  pub fn writes(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  pub fn reset_writes(&self) {
    self.writes.store(0, Ordering::SeqCst);
  }

  /// Make every later put to `partition` fail, aborting its transaction.
  pub fn fail_puts_to(&self, partition: Partition) {
    *self.failing.lock().unwrap() = Some(partition);
  }
}

struct TestTransaction<'a> {
  inner: &'a mut dyn Transaction,
  store: &'a TestStore,
}

impl Transaction for TestTransaction<'_> {
  fn get(&self, partition: Partition, key: &str) -> StoreResult<Option<Vec<u8>>> {
    self.inner.get(partition, key)
  }

  fn put(&mut self, partition: Partition, key: &str, value: &[u8]) -> StoreResult<()> {
    if *self.store.failing.lock().unwrap() == Some(partition) {
      return Err(StoreError::Poisoned("simulated crash".to_string()));
    }
    self.store.writes.fetch_add(1, Ordering::SeqCst);
    self.inner.put(partition, key, value)
  }
}

impl Store for TestStore {
  fn get(&self, partition: Partition, key: &str) -> StoreResult<Option<Vec<u8>>> {
    self.inner.get(partition, key)
  }

  fn iterate(&self, partition: Partition) -> StoreResult<Vec<(String, Vec<u8>)>> {
    self.inner.iterate(partition)
  }

  fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
  where
    E: From<StoreError>,
    F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
  {
    self
      .inner
      .with_transaction(|tx| f(&mut TestTransaction { inner: tx, store: self }))
  }

  fn close(&self) -> StoreResult<()> {
    self.inner.close()
  }
}

// ============================================================================
// Upstream double
// ============================================================================

/// Canned outcome for one kind of fetch.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
  Fresh(T, &'static str),
  NotModified,
  Failed,
}

impl<T: Clone> Scripted<T> {
  fn to_fetch(&self) -> Fetch<T> {
    match self {
      Scripted::Fresh(data, token) => Fetch::Fresh {
        data: data.clone(),
        token: token.to_string(),
      },
      Scripted::NotModified => Fetch::NotModified,
      Scripted::Failed => Fetch::Failed(UpstreamError::Status {
        status: StatusCode::BAD_GATEWAY,
        body: "scripted failure".to_string(),
      }),
    }
  }
}

/// Release source answering from scripts and recording presented tokens.
#[derive(Default)]
pub struct TestSource {
  latest: HashMap<String, Scripted<Release>>,
  lists: HashMap<String, Scripted<Vec<ApiRelease>>>,
  delays: HashMap<String, Duration>,
  repositories: HashMap<String, Project>,
  calls: Mutex<Vec<(String, ReleaseKind, String)>>,
}

impl TestSource {
  pub fn script(
    mut self,
    name: &str,
    latest: Scripted<Release>,
    list: Scripted<Vec<ApiRelease>>,
  ) -> Self {
    self.latest.insert(name.to_string(), latest);
    self.lists.insert(name.to_string(), list);
    self
  }

  pub fn delay(mut self, name: &str, delay: Duration) -> Self {
    self.delays.insert(name.to_string(), delay);
    self
  }

  /// Register a repository under its canonical name; lookups ignore case.
  pub fn repository(mut self, full_name: &str) -> Self {
    self.repositories.insert(
      full_name.to_lowercase(),
      Project {
        name: full_name.to_string(),
        url: format!("https://github.com/{}", full_name),
      },
    );
    self
  }

  /// (project, kind, presented token) for every fetch so far.
  pub fn calls(&self) -> Vec<(String, ReleaseKind, String)> {
    self.calls.lock().unwrap().clone()
  }

  fn record(&self, owner: &str, repo: &str, kind: ReleaseKind, token: &str) -> String {
    let name = format!("{}/{}", owner, repo);
    self
      .calls
      .lock()
      .unwrap()
      .push((name.clone(), kind, token.to_string()));
    name
  }

  async fn pause(&self, name: &str) {
    if let Some(delay) = self.delays.get(name) {
      tokio::time::sleep(*delay).await;
    }
  }
}

fn unscripted(name: &str) -> UpstreamError {
  UpstreamError::NotFound(name.to_string())
}

impl ReleaseSource for TestSource {
  async fn fetch_latest_stable(&self, owner: &str, repo: &str, token: &str) -> Fetch<Release> {
    let name = self.record(owner, repo, ReleaseKind::Latest, token);
    self.pause(&name).await;
    self
      .latest
      .get(&name)
      .map_or_else(|| Fetch::Failed(unscripted(&name)), Scripted::to_fetch)
  }

  async fn fetch_release_list(
    &self,
    owner: &str,
    repo: &str,
    token: &str,
  ) -> Fetch<Vec<ApiRelease>> {
    let name = self.record(owner, repo, ReleaseKind::NextPreRelease, token);
    self.pause(&name).await;
    self
      .lists
      .get(&name)
      .map_or_else(|| Fetch::Failed(unscripted(&name)), Scripted::to_fetch)
  }

  async fn fetch_repository(&self, owner: &str, repo: &str) -> Result<Project, UpstreamError> {
    let name = format!("{}/{}", owner, repo);
    self
      .repositories
      .get(&name.to_lowercase())
      .cloned()
      .ok_or_else(|| unscripted(&name))
  }
}
