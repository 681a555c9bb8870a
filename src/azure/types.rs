use serde::Deserialize;

/// Represents the parsed components of an Azure DevOps PR URL.
/// Only constructed by parse_pr_url() in azure/mod.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestReference {
    pub organization: String,
    pub project: String,
    pub repository: String,
    /// Numeric PR id (always > 0)
    pub pull_request_id: u64,
    /// `https://dev.azure.com/{organization}`
    pub api_base_url: String,
    /// The input URL after normalisation
    pub canonical_url: String,
}

/// Metadata about a pull request fetched from the Azure DevOps REST API.
/// Note: sourceRefName/targetRefName are checked for emptiness after
/// deserialisation; a missing or blank value is a fetch failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestMetadata {
    pub pull_request_id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// e.g. `refs/heads/feature-x`
    #[serde(default)]
    pub source_ref_name: String,
    /// e.g. `refs/heads/master`
    #[serde(default)]
    pub target_ref_name: String,
}
