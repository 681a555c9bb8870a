use super::GitError;

/// Namespace of branch refs on the provider side.
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Map a provider ref name to a remote-tracking branch name.
///
/// `refs/heads/feature-x` + `origin` gives `origin/feature-x`. Names that are
/// already short are prefixed with the remote unchanged.
pub fn ref_to_remote_branch(ref_name: &str, remote: &str) -> String {
    match ref_name.strip_prefix(HEADS_PREFIX) {
        Some(branch) => format!("{remote}/{branch}"),
        None => format!("{remote}/{ref_name}"),
    }
}

/// Forced refspec that updates the remote-tracking ref for a provider branch:
/// `+refs/heads/<name>:refs/remotes/<remote>/<name>`.
pub fn forced_refspec(ref_name: &str, remote: &str) -> Result<String, GitError> {
    let branch = ref_name
        .strip_prefix(HEADS_PREFIX)
        .filter(|branch| !branch.is_empty())
        .ok_or_else(|| GitError::UnsupportedRef(ref_name.to_string()))?;
    Ok(format!("+{HEADS_PREFIX}{branch}:refs/remotes/{remote}/{branch}"))
}
