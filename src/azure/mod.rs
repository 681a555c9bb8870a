pub mod client;
pub mod credential;
pub mod types;

pub use client::{fetch_pull_request, HttpClient, ReqwestClient};
pub use types::{PullRequestMetadata, PullRequestReference};

use thiserror::Error;

/// The only host whose PR URLs are recognised.
pub const AZURE_DEVOPS_HOST: &str = "dev.azure.com";

#[derive(Debug, Error)]
pub enum AzureError {
    #[error("Invalid pull request URL: {0}")]
    InvalidReference(String),

    #[error("Azure DevOps PAT not found in environment. Set env var {hint}.")]
    CredentialNotFound { hint: String },

    #[error("Azure DevOps API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Azure DevOps API returned an unusable response: {0}")]
    MalformedResponse(String),

    #[error("Azure DevOps API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Parse an Azure DevOps PR URL into its component parts.
///
/// Expected format: https://dev.azure.com/{org}/{project}/_git/{repo}/pullrequest/{id}
/// Segments are kept exactly as they appear in the URL path, so names with
/// special characters stay percent-encoded.
pub fn parse_pr_url(raw: &str) -> Result<PullRequestReference, AzureError> {
    let parsed = reqwest::Url::parse(raw.trim())
        .map_err(|e| AzureError::InvalidReference(format!("{raw} ({e})")))?;

    if parsed.host_str() != Some(AZURE_DEVOPS_HOST) {
        return Err(AzureError::InvalidReference(format!(
            "only \"{AZURE_DEVOPS_HOST}\" PR URLs are supported: {raw}"
        )));
    }

    let unrecognized = || AzureError::InvalidReference(format!("unrecognized Azure DevOps PR URL path: {raw}"));

    let segments: Vec<&str> = parsed
        .path_segments()
        .ok_or_else(unrecognized)?
        .filter(|segment| !segment.is_empty())
        .collect();

    // [org, project, "_git", repo, "pullrequest", id]
    if segments.len() < 6 {
        return Err(unrecognized());
    }

    let (organization, project, git_marker, repository, pr_marker, id_raw) = (
        segments[0].trim(),
        segments[1].trim(),
        segments[2],
        segments[3].trim(),
        segments[4],
        segments[5],
    );

    if organization.is_empty() || project.is_empty() || repository.is_empty() {
        return Err(unrecognized());
    }
    if git_marker != "_git" || pr_marker != "pullrequest" {
        return Err(unrecognized());
    }

    let pull_request_id = id_raw
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AzureError::InvalidReference(format!("invalid pull request id in URL: {id_raw}")))?;

    Ok(PullRequestReference {
        organization: organization.to_string(),
        project: project.to_string(),
        repository: repository.to_string(),
        pull_request_id,
        api_base_url: format!("https://{AZURE_DEVOPS_HOST}/{organization}"),
        canonical_url: parsed.to_string(),
    })
}
