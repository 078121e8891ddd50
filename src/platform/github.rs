//! GitHub pull-request integration
//!
//! Fetches PR diffs through the REST API's diff media type and posts findings
//! as review comments on the PR head commit.

use crate::analysis::Finding;
use crate::util::truncate;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("prism-review/", env!("CARGO_PKG_VERSION"));

pub struct GithubPlatform {
    client: reqwest::Client,
    token: String,
    owner: String,
    repo: String,
}

#[derive(Deserialize)]
struct PullResponse {
    head: PullHead,
}

#[derive(Deserialize)]
struct PullHead {
    sha: String,
}

#[derive(Serialize)]
struct ReviewCommentRequest<'a> {
    body: String,
    commit_id: &'a str,
    path: &'a str,
    line: u32,
    side: &'a str,
}

impl GithubPlatform {
    /// Build from `GITHUB_TOKEN` and `GITHUB_REPOSITORY` (owner/repo), the
    /// variables GitHub Actions provides out of the box.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .context("GITHUB_TOKEN environment variable is required")?;

        let repository = std::env::var("GITHUB_REPOSITORY")
            .context("GITHUB_REPOSITORY environment variable is required (owner/repo)")?;
        let (owner, repo) = split_repository(&repository)?;

        Ok(GithubPlatform {
            client: reqwest::Client::new(),
            token,
            owner,
            repo,
        })
    }

    fn pr_number(pr_id: &str) -> Result<u64> {
        pr_id
            .parse()
            .with_context(|| format!("Invalid pull request id: {}", pr_id))
    }

    pub async fn get_diff(&self, pr_id: &str) -> Result<String> {
        let number = Self::pr_number(pr_id)?;
        let url = format!("{}/repos/{}/{}/pulls/{}", API_BASE, self.owner, self.repo, number);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.diff")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("Failed to reach the GitHub API")?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            bail!("GitHub API error {}: {}", status, truncate(&text, 200));
        }
        Ok(text)
    }

    pub async fn post_comments(&self, pr_id: &str, findings: &[Finding]) -> Result<()> {
        let number = Self::pr_number(pr_id)?;
        let commit_id = self.head_sha(number).await?;

        let url = format!(
            "{}/repos/{}/{}/pulls/{}/comments",
            API_BASE, self.owner, self.repo, number
        );

        for finding in findings {
            let request = ReviewCommentRequest {
                body: format_comment(finding),
                commit_id: &commit_id,
                path: &finding.file,
                line: finding.line,
                side: "RIGHT",
            };

            let result = self
                .client
                .post(&url)
                .header("Accept", "application/vnd.github+json")
                .header("Authorization", format!("Bearer {}", self.token))
                .header("User-Agent", USER_AGENT)
                .json(&request)
                .send()
                .await;

            // A single bad anchor must not abort the remaining comments
            match result {
                Ok(response) if response.status().is_success() => {}
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    eprintln!(
                        "  Warning: failed to post comment for {}:{} ({}): {}",
                        finding.file,
                        finding.line,
                        status,
                        truncate(&body, 200)
                    );
                }
                Err(err) => {
                    eprintln!(
                        "  Warning: failed to post comment for {}:{}: {}",
                        finding.file, finding.line, err
                    );
                }
            }
        }

        Ok(())
    }

    async fn head_sha(&self, number: u64) -> Result<String> {
        let url = format!("{}/repos/{}/{}/pulls/{}", API_BASE, self.owner, self.repo, number);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("Failed to reach the GitHub API")?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            bail!("GitHub API error {}: {}", status, truncate(&text, 200));
        }

        let pull: PullResponse =
            serde_json::from_str(&text).context("Failed to parse pull request response")?;
        Ok(pull.head.sha)
    }
}

fn split_repository(repository: &str) -> Result<(String, String)> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => bail!("GITHUB_REPOSITORY must look like owner/repo, got: {}", repository),
    }
}

/// Render a finding as a review comment body
fn format_comment(finding: &Finding) -> String {
    let mut comment = format!(
        "{} **{}** - {}\n\n{}",
        finding.severity.icon(),
        finding.severity.as_str().to_uppercase(),
        finding.rule,
        finding.message
    );

    if let Some(suggestion) = &finding.suggestion {
        comment.push_str(&format!("\n\n**Suggestion:** {}", suggestion));
    }

    comment.push_str("\n\n---\n*Posted by prism-review*");
    comment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Severity;

    #[test]
    fn test_split_repository() {
        let (owner, repo) = split_repository("prism-tools/prism-review").unwrap();
        assert_eq!(owner, "prism-tools");
        assert_eq!(repo, "prism-review");

        assert!(split_repository("no-slash").is_err());
        assert!(split_repository("/repo").is_err());
    }

    #[test]
    fn test_format_comment_with_suggestion() {
        let finding = Finding {
            file: "src/a.rs".to_string(),
            line: 7,
            severity: Severity::Critical,
            message: "SQL built by string concatenation".to_string(),
            rule: "security".to_string(),
            suggestion: Some("Use a parameterized query".to_string()),
        };

        let comment = format_comment(&finding);
        assert!(comment.contains("**CRITICAL** - security"));
        assert!(comment.contains("SQL built by string concatenation"));
        assert!(comment.contains("**Suggestion:** Use a parameterized query"));
        assert!(comment.ends_with("*Posted by prism-review*"));
    }

    #[test]
    fn test_format_comment_without_suggestion() {
        let finding = Finding {
            file: "src/a.rs".to_string(),
            line: 1,
            severity: Severity::Info,
            message: "Consider a doc comment".to_string(),
            rule: "readability".to_string(),
            suggestion: None,
        };

        let comment = format_comment(&finding);
        assert!(comment.contains("**INFO** - readability"));
        assert!(!comment.contains("Suggestion"));
    }
}
