use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MANAGER: &str = "winget";

/// Deployment profile: which application to manage and how to find the package manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppProfile {
    pub app_id: String,
    #[serde(default = "default_manager")]
    pub manager: String,
    /// Overrides the built-in candidate list when non-empty.
    #[serde(default)]
    pub candidate_paths: Vec<String>,
}

fn default_manager() -> String {
    DEFAULT_MANAGER.to_string()
}

impl AppProfile {
    pub fn new(app_id: impl Into<String>) -> anyhow::Result<Self> {
        let profile = Self {
            app_id: app_id.into(),
            manager: default_manager(),
            candidate_paths: Vec::new(),
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let profile: Self = toml::from_str(input).context("failed to parse appdeploy profile")?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_app_id(&self.app_id)?;
        if self.manager.trim().is_empty() {
            return Err(anyhow!("package manager name must not be empty"));
        }
        for pattern in &self.candidate_paths {
            validate_candidate_pattern(pattern)
                .with_context(|| format!("invalid candidate path '{pattern}'"))?;
        }
        Ok(())
    }
}

/// Application ids are passed to the package manager verbatim and must stay one token.
pub fn validate_app_id(app_id: &str) -> anyhow::Result<()> {
    if app_id.trim().is_empty() {
        return Err(anyhow!("application id must not be empty"));
    }
    if app_id
        .chars()
        .any(|ch| ch.is_whitespace() || ch == '"' || ch.is_control())
    {
        return Err(anyhow!(
            "application id must not contain whitespace or quotes: {app_id}"
        ));
    }
    Ok(())
}

fn validate_candidate_pattern(pattern: &str) -> anyhow::Result<()> {
    if pattern.trim().is_empty() {
        return Err(anyhow!("candidate path must not be empty"));
    }
    let wildcard_segments = pattern
        .split(['/', '\\'])
        .filter(|segment| segment.contains('*'))
        .count();
    if wildcard_segments > 1 {
        return Err(anyhow!(
            "at most one wildcard segment is supported, found {wildcard_segments}"
        ));
    }
    Ok(())
}
