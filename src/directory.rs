//! Catalog of tracked projects.

use std::sync::Arc;
use tracing::info;

use crate::db::{Project, ReleaseDb, TrackedProject};
use crate::error::{DirectoryError, StoreResult};
use crate::github::ReleaseSource;
use crate::store::Store;

pub struct Directory<S: Store, C: ReleaseSource> {
  db: ReleaseDb<S>,
  source: Arc<C>,
  default_owner: String,
}

impl<S: Store, C: ReleaseSource> Directory<S, C> {
  pub fn new(db: ReleaseDb<S>, source: Arc<C>, default_owner: impl Into<String>) -> Self {
    Self {
      db,
      source,
      default_owner: default_owner.into(),
    }
  }

  /// Track a repository given as `owner/repo` or bare `repo`.
  ///
  /// The name is normalized through the hosting API before it is stored, so
  /// `ACME/Widgets` and `acme/widgets` land on the same canonical entry.
  pub async fn add_project(&self, spec: &str) -> Result<Project, DirectoryError> {
    let (owner, repo) = parse_spec(spec, &self.default_owner)?;
    let project = self.source.fetch_repository(owner, repo).await?;

    if !self.db.insert_project(&project.name, &project.url)? {
      return Err(DirectoryError::Duplicate(project.name));
    }

    info!(project = %project.name, url = %project.url, "added project");
    Ok(project)
  }

  /// Tracked projects with their stored state, in key order.
  pub fn list_projects(&self) -> StoreResult<Vec<TrackedProject>> {
    self.db.list_projects()
  }
}

/// Split a project spec into owner and repo, applying `default_owner` to a
/// bare repo name.
pub fn parse_spec<'a>(spec: &'a str, default_owner: &'a str) -> Result<(&'a str, &'a str), DirectoryError> {
  let spec = spec.trim();
  let invalid = || DirectoryError::InvalidSpec(spec.to_string());

  let (owner, repo) = match spec.split_once('/') {
    Some((owner, repo)) => (owner, repo),
    None => (default_owner, spec),
  };

  let valid_segment = |s: &str| !s.is_empty() && !s.contains('/') && !s.contains(char::is_whitespace);
  if !valid_segment(owner) || !valid_segment(repo) {
    return Err(invalid());
  }

  Ok((owner, repo))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{TestSource, TestStore};
  use tempfile::TempDir;

  fn directory(source: TestSource) -> (TempDir, Directory<TestStore, TestSource>) {
    let dir = TempDir::new().unwrap();
    let db = ReleaseDb::new(Arc::new(TestStore::open(dir.path())));
    (dir, Directory::new(db, Arc::new(source), "acme"))
  }

  #[test]
  fn test_parse_spec() {
    assert_eq!(parse_spec("myrepo", "acme").unwrap(), ("acme", "myrepo"));
    assert_eq!(parse_spec("moby/moby", "acme").unwrap(), ("moby", "moby"));
    assert_eq!(parse_spec("  docker/cli \n", "acme").unwrap(), ("docker", "cli"));
  }

  #[test]
  fn test_parse_spec_rejects_malformed() {
    for spec in ["", "   ", "a/b/c", "/repo", "owner/", "my repo", "owner/my repo"] {
      assert!(
        matches!(parse_spec(spec, "acme"), Err(DirectoryError::InvalidSpec(_))),
        "accepted {:?}",
        spec
      );
    }
  }

  #[tokio::test]
  async fn test_bare_repo_uses_default_owner() {
    let (_dir, directory) = directory(TestSource::default().repository("acme/myrepo"));

    let project = directory.add_project("myrepo").await.unwrap();
    assert_eq!(project.name, "acme/myrepo");
    assert_eq!(project.url, "https://github.com/acme/myrepo");
  }

  #[tokio::test]
  async fn test_name_is_canonicalized() {
    let (_dir, directory) = directory(TestSource::default().repository("Acme/MyRepo"));

    let project = directory.add_project("acme/myrepo").await.unwrap();
    assert_eq!(project.name, "Acme/MyRepo");

    let listed = directory.list_projects().unwrap();
    assert_eq!(listed[0].project.name, "Acme/MyRepo");
  }

  #[tokio::test]
  async fn test_duplicate_add_fails() {
    let (_dir, directory) = directory(TestSource::default().repository("acme/myrepo"));

    directory.add_project("acme/myrepo").await.unwrap();
    let err = directory.add_project("acme/myrepo").await.unwrap_err();

    assert!(matches!(err, DirectoryError::Duplicate(name) if name == "acme/myrepo"));
    assert_eq!(directory.list_projects().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn test_unknown_repository_is_not_added() {
    let (_dir, directory) = directory(TestSource::default());

    let err = directory.add_project("acme/ghost").await.unwrap_err();

    assert!(matches!(err, DirectoryError::NotFound(_)));
    assert!(directory.list_projects().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_invalid_spec_skips_upstream() {
    let (_dir, directory) = directory(TestSource::default().repository("acme/myrepo"));

    let err = directory.add_project("acme/my/repo").await.unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidSpec(_)));
  }
}
