//! Conditional-fetch contract between the resolver and the hosting API.

use std::future::Future;

use super::api_types::ApiRelease;
use crate::db::{Project, Release};
use crate::error::UpstreamError;

/// Outcome of a conditional fetch.
///
/// The caller passes the token from its last `Fresh` outcome; an empty token
/// makes the request unconditional.
#[derive(Debug)]
pub enum Fetch<T> {
  /// New data, with the token to present on the next request
  Fresh { data: T, token: String },
  /// The caller's cached data is still current
  NotModified,
  /// Transport, authentication, timeout or payload failure
  Failed(UpstreamError),
}

impl<T> Fetch<T> {
  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetch<U> {
    match self {
      Fetch::Fresh { data, token } => Fetch::Fresh {
        data: f(data),
        token,
      },
      Fetch::NotModified => Fetch::NotModified,
      Fetch::Failed(e) => Fetch::Failed(e),
    }
  }
}

/// Source of release information for tracked repositories.
///
/// Fetch methods never return errors directly: failures are reported as
/// [`Fetch::Failed`] so callers can always fall back to cached data.
pub trait ReleaseSource: Send + Sync {
  /// The single "latest stable release" of a repository.
  fn fetch_latest_stable(
    &self,
    owner: &str,
    repo: &str,
    token: &str,
  ) -> impl Future<Output = Fetch<Release>> + Send;

  /// All releases of a repository, most recent first.
  fn fetch_release_list(
    &self,
    owner: &str,
    repo: &str,
    token: &str,
  ) -> impl Future<Output = Fetch<Vec<ApiRelease>>> + Send;

  /// Canonical name and link of a repository.
  fn fetch_repository(
    &self,
    owner: &str,
    repo: &str,
  ) -> impl Future<Output = Result<Project, UpstreamError>> + Send;
}
