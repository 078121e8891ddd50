//! Google (Gemini) backend

use super::parse::parse_response;
use super::{api_error, ProviderName, ProviderOptions, ProviderResponse, TokenUsage, SYSTEM_PROMPT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const GENERATE_URL_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    #[serde(rename = "systemInstruction")]
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

impl GeminiProvider {
    pub fn new(options: ProviderOptions) -> Result<Self> {
        let api_key = options.resolve_api_key(ProviderName::Gemini)?;
        Ok(GeminiProvider {
            client: reqwest::Client::new(),
            api_key,
            model: options.model,
            max_tokens: options.max_tokens,
        })
    }

    pub async fn analyze(&self, prompt: &str) -> Result<ProviderResponse> {
        let url = format!("{}/{}:generateContent", GENERATE_URL_BASE, self.model);

        let request = GenerateRequest {
            system_instruction: Content {
                parts: vec![Part { text: SYSTEM_PROMPT }],
            },
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to reach the Gemini API")?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(api_error(ProviderName::Gemini, status, &text));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse Gemini response: {}", crate::util::truncate(&text, 200)))?;

        let raw_response = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let result = parse_response(&raw_response);

        Ok(ProviderResponse {
            findings: result.findings,
            summary: result.summary,
            raw_response,
            usage: parsed.usage_metadata.map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            }),
        })
    }
}
