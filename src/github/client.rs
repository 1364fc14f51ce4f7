//! GitHub REST client with conditional requests.

use reqwest::header::{
  HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, ETAG, IF_NONE_MATCH, USER_AGENT,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::api_types::{ApiRelease, ApiRepository, RateLimit};
use super::source::{Fetch, ReleaseSource};
use crate::config::GitHubConfig;
use crate::db::{Project, Release};
use crate::error::UpstreamError;

const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub API client wrapper
#[derive(Clone)]
pub struct GitHubClient {
  client: Client,
  api_url: String,
}

impl GitHubClient {
  /// Create a client. Without a token requests are unauthenticated.
  pub fn new(config: &GitHubConfig, token: Option<&str>) -> Result<Self, UpstreamError> {
    let mut headers = HeaderMap::new();

    if let Some(token) = token {
      let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))?;
      auth.set_sensitive(true);
      headers.insert(AUTHORIZATION, auth);
    }
    headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
    headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(GITHUB_API_VERSION));
    headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);

    let client = Client::builder()
      .default_headers(headers)
      .timeout(config.timeout())
      .build()?;

    Ok(Self {
      client,
      api_url: config.api_url.trim_end_matches('/').to_string(),
    })
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.api_url, path)
  }

  /// GET `path`, presenting `token` as `If-None-Match` when there is one.
  fn conditional_get(&self, path: &str, token: &str) -> RequestBuilder {
    let request = self.client.get(self.endpoint(path));
    if token.is_empty() {
      request
    } else {
      request.header(IF_NONE_MATCH, token)
    }
  }

  async fn fetch<T: DeserializeOwned>(&self, path: &str, token: &str) -> Fetch<T> {
    match self.try_fetch(path, token).await {
      Ok(fetch) => fetch,
      Err(e) => Fetch::Failed(e),
    }
  }

  async fn try_fetch<T: DeserializeOwned>(
    &self,
    path: &str,
    token: &str,
  ) -> Result<Fetch<T>, UpstreamError> {
    let response = self.conditional_get(path, token).send().await?;

    if response.status() == StatusCode::NOT_MODIFIED {
      debug!(path, "not modified");
      return Ok(Fetch::NotModified);
    }

    let response = check_response(response).await?;
    let token = response
      .headers()
      .get(ETAG)
      .and_then(|v| v.to_str().ok())
      .unwrap_or_default()
      .to_string();

    let body = response.bytes().await?;
    let data = serde_json::from_slice(&body)?;

    debug!(path, %token, "fetched");
    Ok(Fetch::Fresh { data, token })
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, UpstreamError> {
    let response = check_response(self.client.get(self.endpoint(path)).send().await?).await?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
  }
}

impl ReleaseSource for GitHubClient {
  async fn fetch_latest_stable(&self, owner: &str, repo: &str, token: &str) -> Fetch<Release> {
    self
      .fetch::<ApiRelease>(&format!("/repos/{}/{}/releases/latest", owner, repo), token)
      .await
      .map(ApiRelease::into_release)
  }

  async fn fetch_release_list(
    &self,
    owner: &str,
    repo: &str,
    token: &str,
  ) -> Fetch<Vec<ApiRelease>> {
    self
      .fetch(&format!("/repos/{}/{}/releases", owner, repo), token)
      .await
  }

  async fn fetch_repository(&self, owner: &str, repo: &str) -> Result<Project, UpstreamError> {
    let repository: ApiRepository = self.get_json(&format!("/repos/{}/{}", owner, repo)).await?;
    Ok(repository.into_project())
  }
}

/// Pass successful responses through; turn everything else into an error.
async fn check_response(response: Response) -> Result<Response, UpstreamError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let url = response.url().to_string();
  let rate_limit = RateLimit::from_headers(response.headers());
  let body = response.text().await.unwrap_or_default();

  Err(status_error(status, url, &rate_limit, body))
}

fn status_error(status: StatusCode, url: String, rate_limit: &RateLimit, body: String) -> UpstreamError {
  match status {
    StatusCode::UNAUTHORIZED => UpstreamError::Unauthorized,
    StatusCode::NOT_FOUND => UpstreamError::NotFound(url),
    StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited {
      reset_at: rate_limit.reset_at(),
    },
    StatusCode::FORBIDDEN if rate_limit.is_exhausted() => UpstreamError::RateLimited {
      reset_at: rate_limit.reset_at(),
    },
    status => UpstreamError::Status { status, body },
  }
}
