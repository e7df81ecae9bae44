//! Google Gemini `generateContent` client.

use crate::config::toml_config::LlmConfig;
use crate::domain::ports::TextGenerator;
use crate::utils::error::{InsightError, LlmErrorKind, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROVIDER: &str = "Gemini";
const MAX_BACKOFF_MS: u64 = 10_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: Option<u32>,
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: LlmConfig,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: LlmConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(2)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// One-shot request confirming the key and model are usable.
    pub async fn verify(&self) -> Result<String> {
        tracing::info!("Testing {} client with model {}", PROVIDER, self.config.model);
        let reply = self.generate("Test", "", self.config.temperature).await?;
        tracing::info!("{} client test successful", PROVIDER);
        Ok(reply)
    }

    async fn send_once(&self, body: &GenerateContentRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    "connection failed".to_string()
                } else {
                    e.to_string()
                };
                InsightError::llm(PROVIDER, LlmErrorKind::NetworkError, message)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &body));
        }

        let data: GenerateContentResponse = response.json().await.map_err(|e| {
            InsightError::llm(PROVIDER, LlmErrorKind::Other, format!("JSON parse error: {}", e))
        })?;

        if let Some(tokens) = data.usage_metadata.and_then(|u| u.total_token_count) {
            tracing::debug!("{} used {} tokens", PROVIDER, tokens);
        }

        let text: String = data
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .map(|parts| parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(InsightError::llm(
                PROVIDER,
                LlmErrorKind::EmptyResponse,
                "response contained no text",
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn generate(
        &self,
        prompt: &str,
        system_instruction: &str,
        temperature: f32,
    ) -> Result<String> {
        let full_prompt = if system_instruction.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", system_instruction, prompt)
        };

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: full_prompt }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.retry_base_delay_ms, attempt);
                    tracing::warn!(
                        "{} request failed (attempt {}): {}; retrying in {:?}",
                        PROVIDER,
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!("Error generating content with {}: {}", PROVIDER, e);
                    return Err(e);
                }
            }
        }
    }
}

/// Exponential backoff, capped at ten seconds.
pub fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}

fn parse_error(status: u16, body: &str) -> InsightError {
    let snippet: String = body.chars().take(200).collect();

    match status {
        429 => {
            let lower = body.to_lowercase();
            if lower.contains("quota") || lower.contains("resource_exhausted") {
                InsightError::llm(PROVIDER, LlmErrorKind::QuotaExceeded, snippet)
            } else {
                InsightError::llm(PROVIDER, LlmErrorKind::RateLimit, snippet)
            }
        }
        401 | 403 => InsightError::llm(PROVIDER, LlmErrorKind::InvalidApiKey, snippet),
        404 => InsightError::llm(PROVIDER, LlmErrorKind::ModelNotFound, snippet),
        500..=599 => {
            InsightError::llm(PROVIDER, LlmErrorKind::ServerError, format!("HTTP {}", status))
        }
        _ => InsightError::llm(
            PROVIDER,
            LlmErrorKind::Other,
            format!("HTTP {}: {}", status, snippet),
        ),
    }
}
