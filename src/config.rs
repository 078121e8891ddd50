//! Review configuration
//!
//! Loaded from a `prism-review.toml` file in the repository (or any ancestor
//! directory). The schema mirrors what reviewers actually tune: target
//! languages, rule toggles, the AI backend, and optional documentation context.

use crate::provider::ProviderName;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Candidate config file names, checked in order
const CONFIG_NAMES: &[&str] = &["prism-review.toml", ".prism-review.toml"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewConfig {
    /// Programming languages used in the project
    pub languages: Vec<String>,
    #[serde(default)]
    pub rules: RuleConfig,
    /// Optional documentation files loaded into the prompt for context
    #[serde(default)]
    pub documentation: Option<DocumentationConfig>,
    pub ai: AiConfig,
    /// Extra instructions appended to the prompt
    #[serde(default)]
    pub custom_prompt: Option<String>,
}

/// Analysis rule toggles; everything is on by default
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default = "default_true")]
    pub clean_code: bool,
    #[serde(default = "default_true")]
    pub solid: bool,
    #[serde(default = "default_true")]
    pub performance: bool,
    #[serde(default = "default_true")]
    pub security: bool,
    #[serde(default = "default_true")]
    pub readability: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            clean_code: true,
            solid: true,
            performance: true,
            security: true,
            readability: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentationConfig {
    /// Path to project documentation markdown, relative to the repo root
    #[serde(default)]
    pub project: Option<String>,
    /// Path to architecture/code standards markdown
    #[serde(default)]
    pub architecture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub provider: ProviderName,
    pub model: String,
}

impl ReviewConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ReviewConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.languages.is_empty() {
            bail!("Config must list at least one language");
        }
        if self.ai.model.trim().is_empty() {
            bail!("Config must set ai.model");
        }
        Ok(())
    }
}

/// Search for a config file from `start_dir` up through its ancestors
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    for dir in start_dir.ancestors() {
        for name in CONFIG_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}
