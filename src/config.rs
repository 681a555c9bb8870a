use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = ".pr-review.toml";
pub const DEFAULT_DIFF_FILE_NAME: &str = "pr-review.diff";
pub const DEFAULT_REMOTE: &str = "origin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-review.toml.
/// All fields are optional; the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub azure: AzureConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Diff file name, relative to the workspace root
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitConfig {
    /// Remote to fetch from
    pub remote: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AzureConfig {
    /// Environment variable checked before the built-in PAT variables
    pub pat_env_var: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptConfig {
    /// Review prompt; `${FILE_NAME}` is replaced with the diff file name
    pub template: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Config {
    /// Load .pr-review.toml from `workspace`, or defaults if it doesn't exist.
    pub fn load(workspace: &Path) -> Result<Config, ConfigError> {
        let path = workspace.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn file_name(&self) -> &str {
        non_blank(&self.output.file_name).unwrap_or(DEFAULT_DIFF_FILE_NAME)
    }

    pub fn remote(&self) -> &str {
        non_blank(&self.git.remote).unwrap_or(DEFAULT_REMOTE)
    }

    pub fn pat_env_var(&self) -> Option<&str> {
        non_blank(&self.azure.pat_env_var)
    }

    /// Custom template, kept verbatim; a blank one counts as unset.
    pub fn prompt_template(&self) -> Option<&str> {
        self.prompt
            .template
            .as_deref()
            .filter(|template| !template.trim().is_empty())
    }

    /// Absolute location of the diff file for `workspace`.
    pub fn diff_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(self.file_name())
    }
}
