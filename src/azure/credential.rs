use std::fmt;

use tracing::debug;

use super::AzureError;

/// Well-known PAT variables, checked in this order after the preferred one.
pub const FALLBACK_ENV_VARS: &[&str] = &[
    "AZURE_DEVOPS_EXT_PAT",
    "AZURE_DEVOPS_PAT",
    "AZDO_PAT",
    "ADO_PAT",
];

/// An access token together with the environment variable it came from.
/// Held only for the duration of a single review; never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub origin_variable_name: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("origin_variable_name", &self.origin_variable_name)
            .finish()
    }
}

/// Return the first candidate variable that holds a non-blank value.
///
/// Candidates are the trimmed `preferred` name (when non-blank) followed by
/// `fallbacks` in order. `lookup` resolves a variable name to its value.
pub fn locate<F>(preferred: Option<&str>, fallbacks: &[&str], lookup: F) -> Result<Credential, AzureError>
where
    F: Fn(&str) -> Option<String>,
{
    let preferred = preferred.map(str::trim).filter(|name| !name.is_empty());

    let candidates = preferred
        .into_iter()
        .chain(fallbacks.iter().copied())
        .filter(|name| !name.trim().is_empty());

    for name in candidates {
        if let Some(value) = lookup(name) {
            let token = value.trim();
            if !token.is_empty() {
                debug!(env_var = name, "found Azure DevOps PAT");
                return Ok(Credential {
                    token: token.to_string(),
                    origin_variable_name: name.to_string(),
                });
            }
        }
    }

    let hint = preferred
        .or_else(|| fallbacks.first().copied())
        .unwrap_or("AZURE_DEVOPS_EXT_PAT")
        .to_string();
    Err(AzureError::CredentialNotFound { hint })
}
