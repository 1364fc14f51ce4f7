//! On-disk encoding of release records.
//!
//! Records are JSON objects with a fixed field order:
//! `{"v":1,"tag":"..","url":"..","prerelease":false,"published_at":".."}`.
//! Records written before the schema carried a version use the field names
//! `Tag`, `HTMLURL` and `Prerelease` and are read as version 1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::Release;
use crate::error::{StoreError, StoreResult};

pub const RECORD_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ReleaseRecord {
  #[serde(default = "unversioned")]
  v: u32,
  #[serde(alias = "Tag")]
  tag: String,
  #[serde(alias = "HTMLURL", default)]
  url: String,
  #[serde(alias = "Prerelease", default)]
  prerelease: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  published_at: Option<DateTime<Utc>>,
}

fn unversioned() -> u32 {
  1
}

pub fn encode(key: &str, release: &Release) -> StoreResult<Vec<u8>> {
  let record = ReleaseRecord {
    v: RECORD_VERSION,
    tag: release.tag.clone(),
    url: release.url.clone(),
    prerelease: release.prerelease,
    published_at: release.published_at,
  };

  serde_json::to_vec(&record).map_err(|source| StoreError::Record {
    key: key.to_string(),
    source,
  })
}

pub fn decode(key: &str, bytes: &[u8]) -> StoreResult<Release> {
  let record: ReleaseRecord = serde_json::from_slice(bytes).map_err(|source| StoreError::Record {
    key: key.to_string(),
    source,
  })?;

  if record.v > RECORD_VERSION {
    return Err(StoreError::UnsupportedVersion {
      key: key.to_string(),
      version: record.v,
    });
  }

  Ok(Release {
    tag: record.tag,
    url: record.url,
    prerelease: record.prerelease,
    published_at: record.published_at,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_encoding_is_stable() {
    let release = Release {
      tag: "v25.0.0".to_string(),
      url: "https://github.com/moby/moby/releases/tag/v25.0.0".to_string(),
      prerelease: false,
      published_at: Some(Utc.with_ymd_and_hms(2024, 1, 19, 17, 0, 0).unwrap()),
    };

    let bytes = encode("moby/moby-latest", &release).unwrap();
    assert_eq!(
      String::from_utf8(bytes.clone()).unwrap(),
      r#"{"v":1,"tag":"v25.0.0","url":"https://github.com/moby/moby/releases/tag/v25.0.0","prerelease":false,"published_at":"2024-01-19T17:00:00Z"}"#
    );
    assert_eq!(decode("moby/moby-latest", &bytes).unwrap(), release);
  }

  #[test]
  fn test_omits_missing_publish_date() {
    let bytes = encode("k", &Release::wip()).unwrap();
    assert_eq!(
      String::from_utf8(bytes).unwrap(),
      r#"{"v":1,"tag":"WIP","url":"","prerelease":false}"#
    );
  }

  #[test]
  fn test_decodes_legacy_record() {
    let legacy = br#"{"Tag":"v1.13.0-rc4","HTMLURL":"https://github.com/docker/docker/releases/tag/v1.13.0-rc4","Prerelease":true}"#;

    let release = decode("docker/docker-rc", legacy).unwrap();
    assert_eq!(release.tag, "v1.13.0-rc4");
    assert!(release.prerelease);
    assert!(release.published_at.is_none());
  }

  #[test]
  fn test_rejects_newer_schema() {
    let future = br#"{"v":2,"tag":"v1","url":"","prerelease":false}"#;

    assert!(matches!(
      decode("k", future),
      Err(StoreError::UnsupportedVersion { version: 2, .. })
    ));
  }

  #[test]
  fn test_rejects_garbage() {
    assert!(matches!(decode("k", b"not json"), Err(StoreError::Record { .. })));
  }
}
