//! Typed catalog of projects, freshness tokens and resolved releases.

mod record;
pub mod types;

use std::sync::Arc;
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::store::{Partition, Store};

pub use types::{Project, ProjectReleases, Release, ReleaseKind, TrackedProject};

/// Release database layered over a [`Store`].
pub struct ReleaseDb<S: Store> {
  store: Arc<S>,
}

impl<S: Store> ReleaseDb<S> {
  pub fn new(store: Arc<S>) -> Self {
    Self { store }
  }

  /// Get a reference to the underlying store
  #[allow(dead_code)]
  pub fn store(&self) -> &S {
    &self.store
  }

  /// Insert a project unless one with the same name exists.
  ///
  /// Returns `false` without writing anything when the name is taken. The
  /// check and the insert share one transaction.
  pub fn insert_project(&self, name: &str, url: &str) -> StoreResult<bool> {
    self.store.with_transaction(|tx| -> StoreResult<bool> {
      if tx.get(Partition::Projects, name)?.is_some() {
        return Ok(false);
      }
      tx.put(Partition::Projects, name, url.as_bytes())?;
      Ok(true)
    })
  }

  /// All projects in key order, joined with their stored tokens and releases.
  ///
  /// Missing releases read as the sentinel. A record that can't be decoded is
  /// logged and also reads as the sentinel so one bad entry can't hide the
  /// rest of the directory.
  pub fn list_projects(&self) -> StoreResult<Vec<TrackedProject>> {
    self
      .store
      .iterate(Partition::Projects)?
      .into_iter()
      .map(|(name, url)| {
        let project = Project {
          url: String::from_utf8_lossy(&url).into_owned(),
          name,
        };
        self.tracked(project)
      })
      .collect()
  }

  fn tracked(&self, project: Project) -> StoreResult<TrackedProject> {
    let (latest_token, latest) = self.state(&project.name, ReleaseKind::Latest)?;
    let (releases_token, next_prerelease) = self.state(&project.name, ReleaseKind::NextPreRelease)?;

    Ok(TrackedProject {
      project,
      latest_token,
      releases_token,
      latest,
      next_prerelease,
    })
  }

  /// Token and release of one kind.
  ///
  /// A token is only handed out together with a readable release. When the
  /// record is missing or unreadable the token is dropped as well, so the
  /// next fetch is unconditional and repopulates the record.
  fn state(&self, name: &str, kind: ReleaseKind) -> StoreResult<(String, Release)> {
    match self.stored_release(name, kind) {
      Ok(Some(release)) => Ok((self.token(name, kind)?, release)),
      Ok(None) => Ok((String::new(), Release::wip())),
      Err(e @ (StoreError::Record { .. } | StoreError::UnsupportedVersion { .. })) => {
        warn!(project = %name, kind = kind.as_str(), error = %e, "ignoring unreadable release record");
        Ok((String::new(), Release::wip()))
      }
      Err(e) => Err(e),
    }
  }

  /// Stored freshness token; empty when nothing was fetched yet.
  pub fn token(&self, name: &str, kind: ReleaseKind) -> StoreResult<String> {
    let token = self.store.get(Partition::Tokens, &kind.key(name))?;
    Ok(token.map(|t| String::from_utf8_lossy(&t).into_owned()).unwrap_or_default())
  }

  /// Stored release, if one was ever persisted.
  pub fn stored_release(&self, name: &str, kind: ReleaseKind) -> StoreResult<Option<Release>> {
    let key = kind.key(name);
    self
      .store
      .get(Partition::Releases, &key)?
      .map(|bytes| record::decode(&key, &bytes))
      .transpose()
  }

  /// Persist a release and the token of the response it came from, together.
  pub fn save_release(
    &self,
    name: &str,
    kind: ReleaseKind,
    release: &Release,
    token: &str,
  ) -> StoreResult<()> {
    let key = kind.key(name);
    let record = record::encode(&key, release)?;

    self.store.with_transaction(|tx| -> StoreResult<()> {
      tx.put(Partition::Tokens, &key, token.as_bytes())?;
      tx.put(Partition::Releases, &key, &record)?;
      Ok(())
    })
  }
}

impl<S: Store> Clone for ReleaseDb<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}
