//! Local git diff source
//!
//! Produces unified diff text for the working tree against HEAD, used when the
//! CLI is run without an explicit diff file or platform PR.

use anyhow::{Context, Result};
use git2::{DiffFormat, DiffOptions, Repository};
use std::path::Path;

/// Unified diff of the working tree (plus index) against HEAD.
///
/// An unborn HEAD (fresh repository with no commits) diffs against an empty
/// tree, so newly added files still show up.
pub fn working_tree_diff(repo_path: &Path) -> Result<String> {
    let repo = Repository::discover(repo_path)
        .with_context(|| format!("Not a git repository: {}", repo_path.display()))?;

    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree().context("Failed to resolve HEAD tree")?),
        Err(_) => None,
    };

    let mut options = DiffOptions::new();
    options.include_untracked(true).recurse_untracked_dirs(true);

    let diff = repo
        .diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut options))
        .context("Failed to diff working tree against HEAD")?;

    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        // Content lines need their +/-/space origin restored; headers come
        // through with the marker already embedded.
        match line.origin() {
            '+' | '-' | ' ' => text.push(line.origin()),
            _ => {}
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })
    .context("Failed to render diff")?;

    Ok(text)
}
