use tracing::{debug, instrument};

use super::{GitError, Vcs};

/// Branch basenames pinned to the top of the target picker, in priority order.
pub const PINNED_TARGET_BRANCHES: &[&str] = &["master", "production"];

/// Normalise `for-each-ref` output: one trimmed name per line, blanks dropped.
pub fn parse_branch_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Local and remote-tracking branches, most recent commit first.
#[instrument(skip(vcs))]
pub async fn list_branches(vcs: &dyn Vcs) -> Result<Vec<String>, GitError> {
    let raw = vcs.list_branches_raw().await?;
    let branches = parse_branch_list(&raw);
    debug!(count = branches.len(), "listed branches");
    Ok(branches)
}

/// Move pinned branches to the front for target selection.
///
/// For each name in `pinned`, `<name>` then `<remote>/<name>` are taken if
/// present (each at most once); every other branch follows in its original order.
pub fn prioritize_branches(branches: &[String], remote: &str, pinned: &[&str]) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::with_capacity(branches.len());

    for name in pinned {
        for candidate in [name.to_string(), format!("{remote}/{name}")] {
            if branches.contains(&candidate) && !ordered.contains(&candidate) {
                ordered.push(candidate);
            }
        }
    }

    let remaining: Vec<String> = branches
        .iter()
        .filter(|branch| !ordered.contains(branch))
        .cloned()
        .collect();
    ordered.extend(remaining);
    ordered
}
