use chrono::{DateTime, Utc};

/// Tag of the placeholder release meaning "nothing qualifying found yet".
pub const WIP: &str = "WIP";

/// A tracked repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
  /// "owner/repo", unique across the directory
  pub name: String,
  /// Link shown to users
  pub url: String,
}

impl Project {
  pub fn owner(&self) -> &str {
    self.name.split_once('/').map_or(self.name.as_str(), |(owner, _)| owner)
  }

  pub fn repo(&self) -> &str {
    self.name.split_once('/').map_or("", |(_, repo)| repo)
  }
}

/// The two release pointers kept per project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseKind {
  /// The "latest stable release" resource
  Latest,
  /// A pre-release selected from the releases list
  NextPreRelease,
}

impl ReleaseKind {
  pub fn as_str(self) -> &'static str {
    match self {
      ReleaseKind::Latest => "latest",
      ReleaseKind::NextPreRelease => "releases-list",
    }
  }

  /// Key under which this kind's token and release are stored for `project`.
  pub fn key(self, project: &str) -> String {
    format!("{}-{}", project, self.as_str())
  }
}

/// A resolved version pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
  pub tag: String,
  pub url: String,
  pub prerelease: bool,
  pub published_at: Option<DateTime<Utc>>,
}

impl Release {
  /// The "work-in-progress" placeholder.
  pub fn wip() -> Self {
    Self {
      tag: WIP.to_string(),
      url: String::new(),
      prerelease: false,
      published_at: None,
    }
  }

  pub fn is_wip(&self) -> bool {
    self.tag == WIP
  }

  /// Display classification. Tags containing "rc" count as pre-releases even
  /// when the record isn't flagged; older records predate the flag.
  pub fn label(&self) -> ReleaseLabel {
    if self.is_wip() {
      ReleaseLabel::Wip
    } else if self.prerelease || self.tag.to_lowercase().contains("rc") {
      ReleaseLabel::Prerelease
    } else {
      ReleaseLabel::Latest
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseLabel {
  Wip,
  Prerelease,
  Latest,
}

impl ReleaseLabel {
  pub fn as_str(self) -> &'static str {
    match self {
      ReleaseLabel::Wip => "wip",
      ReleaseLabel::Prerelease => "prerelease",
      ReleaseLabel::Latest => "latest",
    }
  }
}

/// A project joined with its stored tokens and releases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedProject {
  pub project: Project,
  pub latest_token: String,
  pub releases_token: String,
  pub latest: Release,
  pub next_prerelease: Release,
}

impl TrackedProject {
  pub fn token(&self, kind: ReleaseKind) -> &str {
    match kind {
      ReleaseKind::Latest => &self.latest_token,
      ReleaseKind::NextPreRelease => &self.releases_token,
    }
  }

  pub fn release(&self, kind: ReleaseKind) -> &Release {
    match kind {
      ReleaseKind::Latest => &self.latest,
      ReleaseKind::NextPreRelease => &self.next_prerelease,
    }
  }
}

/// Resolution result for one project, in directory order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectReleases {
  pub project: Project,
  pub latest: Release,
  pub next_prerelease: Release,
}

impl From<TrackedProject> for ProjectReleases {
  fn from(tracked: TrackedProject) -> Self {
    Self {
      project: tracked.project,
      latest: tracked.latest,
      next_prerelease: tracked.next_prerelease,
    }
  }
}
