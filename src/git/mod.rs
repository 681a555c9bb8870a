pub mod branches;
pub mod refs;

use std::path::PathBuf;
use std::process::Output;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git for-each-ref failed: {0}")]
    ListFailed(String),

    #[error("git fetch failed: {0}")]
    FetchFailed(String),

    #[error("git diff failed: {0}")]
    DiffFailed(String),

    #[error("Unsupported ref name (expected refs/heads/...): {0}")]
    UnsupportedRef(String),
}

/// The version-control operations the review flow needs.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Short names of local and remote-tracking branches, newest commit first,
    /// one per line, exactly as the tool prints them.
    async fn list_branches_raw(&self) -> Result<String, GitError>;

    /// Fetch from `remote`. With no refspecs the whole remote is fetched and pruned.
    async fn fetch(&self, remote: &str, refspecs: &[String]) -> Result<(), GitError>;

    /// Unified diff of `target...source` (changes on source since the merge base).
    async fn diff(&self, target: &str, source: &str) -> Result<Vec<u8>, GitError>;

    /// URL configured for `remote`, or None when it cannot be determined.
    async fn remote_url(&self, remote: &str) -> Option<String>;
}

/// `Vcs` backed by the `git` executable, run inside a working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo: PathBuf,
}

impl GitCli {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Self { repo: repo.into() }
    }

    async fn run(&self, args: &[&str]) -> Result<Output, GitError> {
        debug!(?args, repo = %self.repo.display(), "running git");
        let output = tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.repo)
            .output()
            .await?;
        Ok(output)
    }
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

#[async_trait]
impl Vcs for GitCli {
    #[instrument(skip(self))]
    async fn list_branches_raw(&self) -> Result<String, GitError> {
        let output = self
            .run(&[
                "for-each-ref",
                "--sort=-committerdate",
                "--format=%(refname:short)",
                "refs/heads/",
                "refs/remotes/",
            ])
            .await?;
        if !output.status.success() {
            return Err(GitError::ListFailed(stderr_of(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    #[instrument(skip(self))]
    async fn fetch(&self, remote: &str, refspecs: &[String]) -> Result<(), GitError> {
        let mut args = vec!["fetch"];
        if refspecs.is_empty() {
            args.push("--prune");
        }
        args.push(remote);
        args.extend(refspecs.iter().map(String::as_str));

        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(GitError::FetchFailed(stderr_of(&output)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn diff(&self, target: &str, source: &str) -> Result<Vec<u8>, GitError> {
        let range = format!("{target}...{source}");
        // User config must not leak colour codes or external drivers into the file.
        let output = self
            .run(&["diff", "--no-color", "--no-ext-diff", &range, "--"])
            .await?;
        if !output.status.success() {
            return Err(GitError::DiffFailed(stderr_of(&output)));
        }
        debug!(diff_bytes = output.stdout.len(), "computed diff");
        Ok(output.stdout)
    }

    #[instrument(skip(self))]
    async fn remote_url(&self, remote: &str) -> Option<String> {
        let output = self.run(&["remote", "get-url", remote]).await.ok()?;
        if !output.status.success() {
            return None;
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!url.is_empty()).then_some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_list_branches_outside_repo_fails() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli::new(dir.path());
        let err = git.list_branches_raw().await.unwrap_err();
        assert!(matches!(err, GitError::ListFailed(_)));
    }

    #[tokio::test]
    async fn test_diff_failure_carries_stderr() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let git = GitCli::new(dir.path());
        match git.diff("origin/b", "origin/a").await {
            Err(GitError::DiffFailed(stderr)) => assert!(!stderr.is_empty()),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remote_url_unknown_is_none() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        assert!(GitCli::new(dir.path()).remote_url("origin").await.is_none());
    }

    fn git(dir: &std::path::Path, args: &[&str]) {
        let status = std::process::Command::new("git")
            .args(["-c", "user.name=Test", "-c", "user.email=test@example.com", "-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    #[tokio::test]
    async fn test_diff_is_plain_unified_text_despite_color_config() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path();
        git(repo, &["init", "-q"]);
        git(repo, &["checkout", "-q", "-b", "base"]);
        std::fs::write(repo.join("file.txt"), "old\n").unwrap();
        git(repo, &["add", "file.txt"]);
        git(repo, &["commit", "-q", "-m", "base"]);
        git(repo, &["checkout", "-q", "-b", "feature"]);
        std::fs::write(repo.join("file.txt"), "new\n").unwrap();
        git(repo, &["commit", "-q", "-am", "feature"]);
        git(repo, &["config", "color.diff", "always"]);
        git(repo, &["config", "color.ui", "always"]);
        git(repo, &["config", "diff.external", "/definitely/not/a/diff/tool"]);

        let diff = GitCli::new(repo).diff("base", "feature").await.unwrap();
        let text = String::from_utf8(diff).unwrap();
        assert!(!text.contains('\u{1b}'), "diff contains ANSI escapes: {text:?}");
        assert!(text.starts_with("diff --git a/file.txt b/file.txt"));
        assert!(text.contains("\n-old\n+new\n"));
    }

    #[tokio::test]
    async fn test_missing_repo_dir_is_spawn_error() {
        let git = GitCli::new("/definitely/not/a/real/dir");
        let err = git.list_branches_raw().await.unwrap_err();
        assert!(matches!(err, GitError::Spawn(_)));
    }
}
