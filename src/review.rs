use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::artifact::{self, ArtifactError, DiffSummary};
use crate::azure::{self, credential, AzureError, HttpClient, PullRequestReference, ReqwestClient};
use crate::config::Config;
use crate::git::{GitCli, Vcs};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error(transparent)]
    Azure(#[from] AzureError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("{0} branch required")]
    MissingBranch(&'static str),

    #[error("Cancelled: remote {remote} ({url}) does not look like repository {repository}")]
    Cancelled {
        remote: String,
        url: String,
        repository: String,
    },
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Runs the two user-facing operations against one workspace.
pub struct Reviewer {
    workspace: PathBuf,
    config: Config,
    vcs: Box<dyn Vcs>,
    http: Box<dyn HttpClient>,
    env: EnvLookup,
}

impl Reviewer {
    /// Reviewer using the `git` executable, reqwest and the process environment.
    pub fn new(workspace: impl Into<PathBuf>, config: Config) -> Self {
        let workspace = workspace.into();
        Self {
            vcs: Box::new(GitCli::new(workspace.clone())),
            http: Box::new(ReqwestClient::new()),
            env: Box::new(|name: &str| std::env::var(name).ok()),
            workspace,
            config,
        }
    }

    pub fn with_vcs(mut self, vcs: impl Vcs + 'static) -> Self {
        self.vcs = Box::new(vcs);
        self
    }

    pub fn with_http(mut self, http: impl HttpClient + 'static) -> Self {
        self.http = Box::new(http);
        self
    }

    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vcs(&self) -> &dyn Vcs {
        self.vcs.as_ref()
    }

    pub fn diff_path(&self) -> PathBuf {
        self.config.diff_path(&self.workspace)
    }

    /// Diff `target...source` for two locally selected branches.
    #[instrument(skip(self))]
    pub async fn diff_branches(&self, source: &str, target: &str) -> Result<DiffSummary, ReviewError> {
        let source = source.trim();
        let target = target.trim();
        if source.is_empty() {
            return Err(ReviewError::MissingBranch("Source"));
        }
        if target.is_empty() {
            return Err(ReviewError::MissingBranch("Target"));
        }

        info!("generating diff: {target}...{source}");
        let summary = artifact::write_branch_diff(
            self.vcs.as_ref(),
            self.config.remote(),
            source,
            target,
            &self.diff_path(),
        )
        .await?;
        Ok(summary)
    }

    /// Resolve a remote PR URL and write its header and diff.
    ///
    /// `confirm` is asked only when the configured remote does not appear to
    /// point at the PR's repository.
    #[instrument(skip(self, confirm))]
    pub async fn review_pull_request(
        &self,
        url: &str,
        confirm: &mut dyn FnMut(&str) -> bool,
    ) -> Result<DiffSummary, ReviewError> {
        info!("parsing PR URL");
        let reference = azure::parse_pr_url(url)?;
        debug!(
            org = %reference.organization,
            project = %reference.project,
            repo = %reference.repository,
            pr = reference.pull_request_id,
            "parsed PR URL"
        );

        self.check_remote(&reference, confirm).await?;

        let credential = credential::locate(
            self.config.pat_env_var(),
            credential::FALLBACK_ENV_VARS,
            &self.env,
        )?;
        info!(env_var = %credential.origin_variable_name, "using Azure DevOps PAT");

        info!("fetching pull request from Azure DevOps");
        let metadata = azure::fetch_pull_request(self.http.as_ref(), &reference, &credential).await?;
        info!(
            title = metadata.title.as_deref().unwrap_or(""),
            source = %metadata.source_ref_name,
            target = %metadata.target_ref_name,
            "fetched PR metadata"
        );

        let summary = artifact::write_pull_request_diff(
            self.vcs.as_ref(),
            self.config.remote(),
            &reference,
            &metadata,
            &self.diff_path(),
        )
        .await?;
        Ok(summary)
    }

    /// Advisory check that the remote points at the PR's repository.
    async fn check_remote(
        &self,
        reference: &PullRequestReference,
        confirm: &mut dyn FnMut(&str) -> bool,
    ) -> Result<(), ReviewError> {
        let remote = self.config.remote();
        let Some(remote_url) = self.vcs.remote_url(remote).await else {
            debug!(remote, "could not determine remote URL, skipping repository check");
            return Ok(());
        };

        if remote_matches_repository(&remote_url, &reference.repository) {
            return Ok(());
        }

        warn!(remote, %remote_url, repo = %reference.repository, "remote does not match PR repository");
        let question = format!(
            "Remote '{remote}' ({remote_url}) does not look like repository '{}'. Continue anyway?",
            reference.repository
        );
        if confirm(&question) {
            Ok(())
        } else {
            Err(ReviewError::Cancelled {
                remote: remote.to_string(),
                url: remote_url,
                repository: reference.repository.clone(),
            })
        }
    }
}

/// Whether a remote URL ends in the given repository name.
///
/// Handles `https://.../_git/<repo>`, `git@ssh.dev.azure.com:v3/<org>/<project>/<repo>`
/// and trailing `/` or `.git`. Both sides are percent-decoded and compared
/// case-insensitively.
pub fn remote_matches_repository(remote_url: &str, repository: &str) -> bool {
    let trimmed = remote_url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or_default();

    let normalize = |name: &str| {
        urlencoding::decode(name)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| name.to_string())
            .to_lowercase()
    };
    !last.is_empty() && normalize(last) == normalize(repository)
}
