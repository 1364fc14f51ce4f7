//! Release resolution: decides between cached and upstream data.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::db::{Project, ProjectReleases, Release, ReleaseDb, ReleaseKind, TrackedProject};
use crate::error::StoreResult;
use crate::github::{ApiRelease, Fetch, ReleaseSource};
use crate::store::Store;

/// Projects resolved at the same time while listing.
const DEFAULT_CONCURRENCY: usize = 8;

/// Resolves the latest stable and next pre-release of tracked projects.
///
/// Fresh upstream data is persisted together with its freshness token.
/// "Not modified" and failed fetches return what the store already has, so a
/// broken upstream never costs more than staleness.
pub struct Resolver<S: Store, C: ReleaseSource> {
  db: ReleaseDb<S>,
  source: Arc<C>,
  concurrency: usize,
}

impl<S: Store, C: ReleaseSource> Resolver<S, C> {
  pub fn new(db: ReleaseDb<S>, source: Arc<C>) -> Self {
    Self {
      db,
      source,
      concurrency: DEFAULT_CONCURRENCY,
    }
  }

  /// Set how many projects are resolved at once while listing.
  pub fn with_concurrency(mut self, concurrency: usize) -> Self {
    self.concurrency = concurrency.max(1);
    self
  }

  /// Resolve the latest stable release.
  pub async fn resolve_latest(&self, tracked: &TrackedProject) -> Release {
    let project = &tracked.project;
    let fetch = self
      .source
      .fetch_latest_stable(project.owner(), project.repo(), tracked.token(ReleaseKind::Latest))
      .await;

    match fetch {
      Fetch::Fresh { data, token } => {
        self.persist(project, ReleaseKind::Latest, &data, &token);
        data
      }
      Fetch::NotModified => tracked.release(ReleaseKind::Latest).clone(),
      Fetch::Failed(e) => {
        warn!(project = %project.name, kind = "latest", error = %e, "using cached release");
        tracked.release(ReleaseKind::Latest).clone()
      }
    }
  }

  /// Resolve the pre-release ahead of the current stable line, if any.
  ///
  /// Returns the sentinel (without storing it) when upstream lists no
  /// qualifying pre-release.
  pub async fn resolve_next_prerelease(&self, tracked: &TrackedProject) -> Release {
    let project = &tracked.project;
    let fetch = self
      .source
      .fetch_release_list(project.owner(), project.repo(), tracked.token(ReleaseKind::NextPreRelease))
      .await;

    match fetch {
      Fetch::Fresh { data, token } => match select_next_prerelease(&data) {
        Some(selected) => {
          let release = selected.clone().into_release();
          self.persist(project, ReleaseKind::NextPreRelease, &release, &token);
          release
        }
        None => {
          debug!(project = %project.name, releases = data.len(), "no pre-release ahead of stable");
          Release::wip()
        }
      },
      // A 304 carries no list to scan; the stored pick is still the answer
      Fetch::NotModified => tracked.release(ReleaseKind::NextPreRelease).clone(),
      Fetch::Failed(e) => {
        warn!(project = %project.name, kind = "releases-list", error = %e, "using cached release");
        tracked.release(ReleaseKind::NextPreRelease).clone()
      }
    }
  }

  /// Every tracked project with both releases resolved, in directory order.
  ///
  /// Projects are resolved concurrently; one project's upstream failure only
  /// makes that project's entry stale.
  pub async fn list_projects_with_state(&self) -> StoreResult<Vec<ProjectReleases>> {
    let projects = self.db.list_projects()?;

    let resolved: Vec<ProjectReleases> = stream::iter(projects)
      .map(|tracked| async move {
        let latest = self.resolve_latest(&tracked).await;
        let next_prerelease = self.resolve_next_prerelease(&tracked).await;
        ProjectReleases {
          project: tracked.project,
          latest,
          next_prerelease,
        }
      })
      .buffered(self.concurrency)
      .collect()
      .await;

    Ok(resolved)
  }

  fn persist(&self, project: &Project, kind: ReleaseKind, release: &Release, token: &str) {
    match self.db.save_release(&project.name, kind, release, token) {
      Ok(()) => debug!(project = %project.name, kind = kind.as_str(), tag = %release.tag, "saved release"),
      Err(e) => error!(project = %project.name, kind = kind.as_str(), error = %e, "failed to save release"),
    }
  }
}

/// Pick the pre-release from a most-recent-first release list.
///
/// Drafts are skipped. The first pre-release wins, but only if it comes
/// before the first regular release: anything older has been superseded by
/// a stable cut.
pub fn select_next_prerelease(releases: &[ApiRelease]) -> Option<&ApiRelease> {
  for release in releases {
    if release.draft {
      continue;
    }
    if release.prerelease {
      return Some(release);
    }
    break;
  }
  None
}
