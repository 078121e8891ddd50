//! AI provider backends
//!
//! Each backend takes a prompt, calls its vendor API, and returns parsed
//! findings plus the raw response text. Which vendor to use is a config
//! choice; everything downstream only sees `ProviderResponse`.

pub mod claude;
pub mod gemini;
pub mod openai;
pub mod parse;

use crate::analysis::Finding;
use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use parse::{parse_response, ParsedResponse};

/// System instruction shared by all backends
pub(crate) const SYSTEM_PROMPT: &str = "You are an expert code reviewer. Analyze the provided \
     code diff and return your findings in the specified JSON format. Be concise, actionable, \
     and focus on the most important issues.";

/// Supported AI providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Claude,
    OpenAi,
    Gemini,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::Claude => "claude",
            ProviderName::OpenAi => "openai",
            ProviderName::Gemini => "gemini",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            ProviderName::Claude => "ANTHROPIC_API_KEY",
            ProviderName::OpenAi => "OPENAI_API_KEY",
            ProviderName::Gemini => "GOOGLE_API_KEY",
        }
    }
}

/// Token usage reported by a backend, when available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Result of one backend analysis call
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub findings: Vec<Finding>,
    pub summary: String,
    /// Raw response content, kept for debugging
    pub raw_response: String,
    pub usage: Option<TokenUsage>,
}

/// Options common to every provider
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Explicit API key; falls back to the provider's environment variable
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
}

impl ProviderOptions {
    pub fn new(model: &str) -> Self {
        ProviderOptions {
            api_key: None,
            model: model.to_string(),
            max_tokens: 4096,
        }
    }

    /// Resolve the key for `name`, erroring out when none is configured
    pub(crate) fn resolve_api_key(&self, name: ProviderName) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        match std::env::var(name.api_key_env_var()) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(anyhow::anyhow!(
                "{} environment variable is required for the {} provider",
                name.api_key_env_var(),
                name.as_str()
            )),
        }
    }
}

/// A configured provider backend, dispatched by name
pub enum AnyProvider {
    Claude(claude::ClaudeProvider),
    OpenAi(openai::OpenAiProvider),
    Gemini(gemini::GeminiProvider),
}

impl AnyProvider {
    pub fn name(&self) -> ProviderName {
        match self {
            AnyProvider::Claude(_) => ProviderName::Claude,
            AnyProvider::OpenAi(_) => ProviderName::OpenAi,
            AnyProvider::Gemini(_) => ProviderName::Gemini,
        }
    }

    /// Send the prompt to the backend and parse its response
    pub async fn analyze(&self, prompt: &str) -> Result<ProviderResponse> {
        match self {
            AnyProvider::Claude(p) => p.analyze(prompt).await,
            AnyProvider::OpenAi(p) => p.analyze(prompt).await,
            AnyProvider::Gemini(p) => p.analyze(prompt).await,
        }
    }
}

/// Create a provider instance for the configured backend
pub fn create_provider(name: ProviderName, options: ProviderOptions) -> Result<AnyProvider> {
    Ok(match name {
        ProviderName::Claude => AnyProvider::Claude(claude::ClaudeProvider::new(options)?),
        ProviderName::OpenAi => AnyProvider::OpenAi(openai::OpenAiProvider::new(options)?),
        ProviderName::Gemini => AnyProvider::Gemini(gemini::GeminiProvider::new(options)?),
    })
}

/// Build the error for a non-success API status, with a truncated body
pub(crate) fn api_error(provider: ProviderName, status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "{} API error {}: {}",
        provider.as_str(),
        status,
        crate::util::truncate(body, 200)
    )
}
