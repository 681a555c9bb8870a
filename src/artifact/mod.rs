use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::azure::{PullRequestMetadata, PullRequestReference};
use crate::git::refs::{forced_refspec, ref_to_remote_branch};
use crate::git::{GitError, Vcs};

/// Line that ends the PR header and precedes the raw diff.
pub const HEADER_SEPARATOR: &str =
    "================================================================================";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("Failed to write diff file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What was written to the diff file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSummary {
    pub path: PathBuf,
    /// Comparison in `target...source` form
    pub range: String,
    pub diff_bytes: usize,
}

/// Plain-text block written at the top of a PR-driven diff file.
pub fn format_header(reference: &PullRequestReference, metadata: &PullRequestMetadata) -> String {
    format!(
        "PR: {}\nID: {}\nTitle: {}\nSource: {}\nTarget: {}\n\nDescription:\n{}\n\n{}\n\n",
        reference.canonical_url,
        reference.pull_request_id,
        metadata.title.as_deref().unwrap_or(""),
        metadata.source_ref_name,
        metadata.target_ref_name,
        metadata.description.as_deref().unwrap_or(""),
        HEADER_SEPARATOR,
    )
}

/// Diff two already-known branches into `path`, overwriting it.
///
/// Prune-fetches the whole remote first. On error the file may be missing
/// or stale.
#[instrument(skip(vcs, path), fields(path = %path.display()))]
pub async fn write_branch_diff(
    vcs: &dyn Vcs,
    remote: &str,
    source: &str,
    target: &str,
    path: &Path,
) -> Result<DiffSummary, ArtifactError> {
    info!("fetching remote");
    vcs.fetch(remote, &[]).await?;

    info!("generating diff");
    let diff = vcs.diff(target, source).await?;
    tokio::fs::write(path, &diff).await.map_err(|e| ArtifactError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(diff_bytes = diff.len(), "wrote diff file");

    Ok(DiffSummary {
        path: path.to_path_buf(),
        range: format!("{target}...{source}"),
        diff_bytes: diff.len(),
    })
}

/// Fetch both PR branches, write the header, then append the PR diff.
///
/// Both ref names must live under `refs/heads/`; otherwise nothing is fetched
/// or written. Later failures may leave a header-only file behind.
#[instrument(skip(vcs, reference, metadata, path), fields(pr = reference.pull_request_id, path = %path.display()))]
pub async fn write_pull_request_diff(
    vcs: &dyn Vcs,
    remote: &str,
    reference: &PullRequestReference,
    metadata: &PullRequestMetadata,
    path: &Path,
) -> Result<DiffSummary, ArtifactError> {
    let refspecs = vec![
        forced_refspec(&metadata.source_ref_name, remote)?,
        forced_refspec(&metadata.target_ref_name, remote)?,
    ];
    let source = ref_to_remote_branch(&metadata.source_ref_name, remote);
    let target = ref_to_remote_branch(&metadata.target_ref_name, remote);

    info!(?refspecs, "fetching PR branches");
    vcs.fetch(remote, &refspecs).await?;

    let write_err = |e: std::io::Error| ArtifactError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    tokio::fs::write(path, format_header(reference, metadata))
        .await
        .map_err(write_err)?;

    info!(%source, %target, "generating diff");
    let diff = vcs.diff(&target, &source).await?;

    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(write_err)?;
    file.write_all(&diff).await.map_err(write_err)?;
    file.flush().await.map_err(write_err)?;
    debug!(diff_bytes = diff.len(), "appended diff");

    Ok(DiffSummary {
        path: path.to_path_buf(),
        range: format!("{target}...{source}"),
        diff_bytes: diff.len(),
    })
}
