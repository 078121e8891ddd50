//! Anthropic (Claude) backend

use super::parse::parse_response;
use super::{api_error, ProviderName, ProviderOptions, ProviderResponse, TokenUsage, SYSTEM_PROMPT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Option<ClaudeUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl ClaudeProvider {
    pub fn new(options: ProviderOptions) -> Result<Self> {
        let api_key = options.resolve_api_key(ProviderName::Claude)?;
        Ok(ClaudeProvider {
            client: reqwest::Client::new(),
            api_key,
            model: options.model,
            max_tokens: options.max_tokens,
        })
    }

    pub async fn analyze(&self, prompt: &str) -> Result<ProviderResponse> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to reach the Anthropic API")?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(ProviderName::Claude, status, &text));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse Anthropic response: {}", crate::util::truncate(&text, 200)))?;

        let raw_response = parsed
            .content
            .iter()
            .find(|block| block.block_type == "text")
            .map(|block| block.text.clone())
            .unwrap_or_default();

        let result = parse_response(&raw_response);

        Ok(ProviderResponse {
            findings: result.findings,
            summary: result.summary,
            raw_response,
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        })
    }
}
