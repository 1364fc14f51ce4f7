//! Release information from the GitHub REST API.

pub mod api_types;
pub mod client;
pub mod source;

pub use api_types::ApiRelease;
pub use client::GitHubClient;
pub use source::{Fetch, ReleaseSource};
