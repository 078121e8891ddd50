//! Pull-request hosting platforms
//!
//! A platform hands us the PR diff and takes review comments back. Per-comment
//! post failures are logged and skipped so one bad anchor never aborts the
//! rest of the review.

pub mod github;

use crate::analysis::Finding;
use anyhow::Result;

/// Supported hosting platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformName {
    Github,
}

impl PlatformName {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "github" => Some(PlatformName::Github),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformName::Github => "github",
        }
    }
}

/// A configured hosting platform, dispatched by name
pub enum AnyPlatform {
    Github(github::GithubPlatform),
}

impl AnyPlatform {
    /// Fetch the unified diff for a pull request
    pub async fn get_diff(&self, pr_id: &str) -> Result<String> {
        match self {
            AnyPlatform::Github(p) => p.get_diff(pr_id).await,
        }
    }

    /// Post each finding as a review comment anchored at (file, line)
    pub async fn post_comments(&self, pr_id: &str, findings: &[Finding]) -> Result<()> {
        match self {
            AnyPlatform::Github(p) => p.post_comments(pr_id, findings).await,
        }
    }
}

/// Create a platform adapter from environment credentials
pub fn create_platform(name: PlatformName) -> Result<AnyPlatform> {
    Ok(match name {
        PlatformName::Github => AnyPlatform::Github(github::GithubPlatform::from_env()?),
    })
}
