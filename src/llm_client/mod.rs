/// LLM Client — the single point of entry for all provider calls in prepcoach.
///
/// ARCHITECTURAL RULE: No other module may call a provider API directly.
/// All LLM interactions MUST go through this module.
///
/// Three backends are supported (OpenAI, Anthropic, Ollama), selected at
/// startup from configuration. Every call carries a per-call temperature and
/// runs under the configured deadline; transient failures get one retry with
/// jittered backoff. Cancellation propagates by dropping the returned future,
/// which aborts the in-flight HTTP request.
use rand::Rng;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Config, LlmProvider};

pub mod prompts;

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
/// Transient failures (429 / 5xx / network) get exactly one retry.
const MAX_ATTEMPTS: u32 = 2;
const BACKOFF_BASE_MS: u64 = 750;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Deadline of {0:?} exceeded")]
    Deadline(std::time::Duration),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Whether the failure is worth a retry with backoff.
    fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ── Provider request / response envelopes ──────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

// ── Client ─────────────────────────────────────────────────────────────────

/// The single LLM client shared by all services. Cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    provider: LlmProvider,
    model: String,
    api_key: String,
    ollama_base_url: String,
    deadline: std::time::Duration,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.llm_timeout())
                .build()
                .expect("Failed to build HTTP client"),
            provider: config.llm_provider,
            model: config.llm_model.clone(),
            api_key: config.llm_api_key.clone(),
            ollama_base_url: config.ollama_base_url.clone(),
            deadline: config.llm_timeout(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Makes one chat call and returns the raw text completion.
    /// Retries once with jittered backoff on 429 / 5xx / network errors.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let jitter = rand::thread_rng().gen_range(0..BACKOFF_BASE_MS);
                let delay = std::time::Duration::from_millis(BACKOFF_BASE_MS + jitter);
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            match self.dispatch(prompt, system, temperature).await {
                Ok(text) => {
                    debug!("LLM call succeeded ({} chars)", text.len());
                    return Ok(text);
                }
                Err(e) if e.is_transient() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(LlmError::EmptyContent))
    }

    async fn dispatch(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let fut = async {
            match self.provider {
                LlmProvider::OpenAi => self.call_openai(prompt, system, temperature).await,
                LlmProvider::Anthropic => self.call_anthropic(prompt, system, temperature).await,
                LlmProvider::Ollama => self.call_ollama(prompt, system, temperature).await,
            }
        };

        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Deadline(self.deadline)),
        }
    }

    async fn call_openai(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let body = OpenAiRequest {
            model: &self.model,
            temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OpenAiResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    async fn call_anthropic(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature,
            system,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnthropicResponse = response.json().await?;
        parsed
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    async fn call_ollama(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let body = OllamaRequest {
            model: &self.model,
            stream: false,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            options: OllamaOptions { temperature },
        };

        let url = format!("{}/api/chat", self.ollama_base_url.trim_end_matches('/'));
        let response = self.client.post(url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: OllamaResponse = response.json().await?;
        if parsed.message.content.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(parsed.message.content)
    }

    /// Calls the LLM and deserializes the text response as JSON.
    ///
    /// Parse strategy per the tolerant-extraction contract: strict parse
    /// first, then fence-stripped, then one repeat call with a stricter
    /// system instruction. The prompt must instruct the model to return JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
    ) -> Result<T, LlmError> {
        let text = self.call(prompt, system, temperature).await?;

        match parse_lenient::<T>(&text) {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("Structured output parse failed, retrying with strict instructions: {e}");
            }
        }

        let strict_system = format!("{system}\n\n{}", prompts::STRICT_JSON_RETRY);
        let text = self.call(prompt, &strict_system, temperature).await?;
        parse_lenient::<T>(&text).map_err(LlmError::Parse)
    }
}

/// Strict parse, then a single fenced-block strip and re-parse.
fn parse_lenient<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str::<T>(text.trim()) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            let stripped = strip_json_fences(text);
            if stripped == text.trim() {
                Err(first_err)
            } else {
                serde_json::from_str::<T>(stripped)
            }
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n[1, 2, 3]\n```";
        assert_eq!(strip_json_fences(input), "[1, 2, 3]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parse_lenient_accepts_fenced_payload() {
        let input = "```json\n{\"score\": 0.8}\n```";
        let value: serde_json::Value = parse_lenient(input).unwrap();
        assert_eq!(value["score"], 0.8);
    }

    #[test]
    fn test_parse_lenient_rejects_prose() {
        let input = "Here is your answer: definitely yes.";
        assert!(parse_lenient::<serde_json::Value>(input).is_err());
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Api {
            status: 429,
            message: String::new()
        }
        .is_transient());
        assert!(LlmError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!LlmError::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!LlmError::EmptyContent.is_transient());
    }
}
