//! OpenAI backend

use super::parse::parse_response;
use super::{api_error, ProviderName, ProviderOptions, ProviderResponse, TokenUsage, SYSTEM_PROMPT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(options: ProviderOptions) -> Result<Self> {
        let api_key = options.resolve_api_key(ProviderName::OpenAi)?;
        Ok(OpenAiProvider {
            client: reqwest::Client::new(),
            api_key,
            model: options.model,
            max_tokens: options.max_tokens,
        })
    }

    pub async fn analyze(&self, prompt: &str) -> Result<ProviderResponse> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to reach the OpenAI API")?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(ProviderName::OpenAi, status, &text));
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse OpenAI response: {}", crate::util::truncate(&text, 200)))?;

        let raw_response = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let result = parse_response(&raw_response);

        Ok(ProviderResponse {
            findings: result.findings,
            summary: result.summary,
            raw_response,
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        })
    }
}
