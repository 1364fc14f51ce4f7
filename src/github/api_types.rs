//! Serde-deserializable types matching GitHub API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;

use crate::db::{Project, Release};

/// Entry of `/repos/{owner}/{repo}/releases` and body of `/releases/latest`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRelease {
  pub tag_name: String,
  pub html_url: String,
  #[serde(default)]
  pub draft: bool,
  #[serde(default)]
  pub prerelease: bool,
  pub published_at: Option<DateTime<Utc>>,
}

impl ApiRelease {
  pub fn into_release(self) -> Release {
    Release {
      tag: self.tag_name,
      url: self.html_url,
      prerelease: self.prerelease,
      published_at: self.published_at,
    }
  }
}

/// Body of `/repos/{owner}/{repo}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepository {
  pub full_name: String,
  pub html_url: String,
}

impl ApiRepository {
  pub fn into_project(self) -> Project {
    Project {
      name: self.full_name,
      url: self.html_url,
    }
  }
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
  pub remaining: Option<u64>,
  pub reset: Option<u64>,
}

impl RateLimit {
  pub fn from_headers(headers: &HeaderMap) -> Self {
    let number = |name: &str| {
      headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
    };

    Self {
      remaining: number("x-ratelimit-remaining"),
      reset: number("x-ratelimit-reset"),
    }
  }

  pub fn is_exhausted(&self) -> bool {
    self.remaining == Some(0)
  }

  /// Reset time as HH:MM:SS UTC, for error messages.
  pub fn reset_at(&self) -> String {
    self
      .reset
      .and_then(|reset| DateTime::from_timestamp(reset as i64, 0))
      .map(|dt| dt.format("%H:%M:%S").to_string())
      .unwrap_or_else(|| "unknown".to_string())
  }
}
