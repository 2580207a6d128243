//! Git operations for release sequencing.
//!
//! Shells out to `git` for all operations. This ensures we inherit the user's
//! SSH keys, GPG signing, hooks, and other configuration.

use std::process::Command;

use thiserror::Error;
use tracing::{debug, instrument};

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "status").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Check whether the working tree is clean (no uncommitted changes).
///
/// Returns `true` if both staged and unstaged changes are empty.
#[instrument]
pub fn is_clean() -> GitResult<bool> {
    let output = git(&["status", "--porcelain"])?;
    let clean = output.trim().is_empty();
    debug!(clean, "working tree status");
    Ok(clean)
}

/// Check if we're inside a git repository.
#[instrument]
pub fn is_inside_repo() -> GitResult<bool> {
    let result = git(&["rev-parse", "--is-inside-work-tree"]);
    match result {
        Ok(output) => Ok(output.trim() == "true"),
        Err(GitError::Command { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Check whether a tag with this exact name exists.
#[instrument]
pub fn tag_exists(tag: &str) -> GitResult<bool> {
    let output = git(&["tag", "--list", tag])?;
    let exists = output.lines().any(|line| line.trim() == tag);
    debug!(%tag, exists, "tag lookup");
    Ok(exists)
}

/// Create an annotated tag at HEAD.
#[instrument]
pub fn create_tag(tag: &str, message: &str) -> GitResult<()> {
    git(&["tag", "-a", tag, "-m", message])?;
    debug!(%tag, "created tag");
    Ok(())
}

/// Get the remote URL for a named remote (default: `"origin"`).
#[instrument]
pub fn remote_url(remote: &str) -> GitResult<Option<String>> {
    let result = git(&["remote", "get-url", remote]);
    match result {
        Ok(url) => {
            let url = url.trim().to_string();
            debug!(%remote, %url, "remote URL");
            Ok(Some(url))
        }
        Err(GitError::Command { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Parse owner and repo from a git remote URL.
///
/// Handles both HTTPS and SSH formats:
/// - `https://github.com/owner/repo.git`
/// - `git@github.com:owner/repo.git`
///
/// Returns `None` if the URL cannot be parsed.
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let path = url.strip_prefix("git@").map_or_else(
        || {
            // HTTPS format: https://github.com/owner/repo.git
            url.split("//")
                .nth(1)
                .and_then(|after_scheme| after_scheme.split_once('/').map(|(_, path)| path))
        },
        |rest| {
            // SSH format: git@github.com:owner/repo.git
            rest.split_once(':').map(|(_, path)| path)
        },
    )?;

    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }

    Some((owner.to_string(), repo.to_string()))
}

/// Run a git command and return its stdout.
fn git(args: &[&str]) -> GitResult<String> {
    let output = Command::new("git").args(args).output()?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // Detect "not a git repo" specifically
        if stderr.contains("not a git repository") {
            return Err(GitError::NotARepo);
        }

        Err(GitError::Command {
            command: args.first().unwrap_or(&"").to_string(),
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests are designed to work both inside and outside a git repo.
    // In CI or isolated environments, they gracefully handle the non-repo
    // case.

    #[test]
    fn is_inside_repo_returns_bool() {
        // Should not error regardless of whether we're in a repo
        let result = is_inside_repo();
        assert!(result.is_ok());
    }

    #[test]
    fn is_clean_works_in_repo() {
        if is_inside_repo().unwrap_or(false) {
            // Just verify it doesn't error — the actual clean/dirty
            // state depends on the working tree
            let result = is_clean();
            assert!(result.is_ok());
        }
    }

    #[test]
    fn missing_tag_is_absent() {
        if is_inside_repo().unwrap_or(false) {
            let result = tag_exists("cutover-test-tag-that-should-never-exist");
            assert!(!result.unwrap());
        }
    }

    #[test]
    fn git_error_on_bad_command() {
        // This should fail with a GitError::Command
        let result = git(&["not-a-real-subcommand"]);
        assert!(result.is_err());
    }

    #[test]
    fn remote_url_works_in_repo() {
        if is_inside_repo().unwrap_or(false) {
            let result = remote_url("origin");
            assert!(result.is_ok());
        }
    }

    #[test]
    fn parse_owner_repo_https() {
        let result = parse_owner_repo("https://github.com/claylo/cutover.git");
        assert_eq!(result, Some(("claylo".into(), "cutover".into())));
    }

    #[test]
    fn parse_owner_repo_https_no_suffix() {
        let result = parse_owner_repo("https://github.com/claylo/cutover");
        assert_eq!(result, Some(("claylo".into(), "cutover".into())));
    }

    #[test]
    fn parse_owner_repo_ssh() {
        let result = parse_owner_repo("git@github.com:claylo/cutover.git");
        assert_eq!(result, Some(("claylo".into(), "cutover".into())));
    }

    #[test]
    fn parse_owner_repo_invalid() {
        assert!(parse_owner_repo("not-a-url").is_none());
        assert!(parse_owner_repo("").is_none());
    }
}
