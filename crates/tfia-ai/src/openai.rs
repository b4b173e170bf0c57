use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;

use crate::retry::{
    is_retryable_status, is_retryable_transport_error, next_request_id, retry_after_ms,
    RetryPolicy,
};
use crate::{ChatRequest, ChatResponse, ChatUsage, LlmClient, Message, TfiaAiError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Enumerates supported `OpenAiAuthScheme` values.
pub enum OpenAiAuthScheme {
    #[default]
    Bearer,
    ApiKeyHeader,
}

#[derive(Debug, Clone)]
/// Connection settings for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiConfig {
    pub api_base: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
    pub max_retries: usize,
    pub retry_budget_ms: u64,
    pub retry_jitter: bool,
    pub auth_scheme: OpenAiAuthScheme,
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, TfiaAiError> {
        if config.api_key.trim().is_empty() {
            return Err(TfiaAiError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match config.auth_scheme {
            OpenAiAuthScheme::Bearer => {
                let bearer = format!("Bearer {}", config.api_key.trim());
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&bearer).map_err(|e| {
                        TfiaAiError::InvalidResponse(format!("invalid API key header: {e}"))
                    })?,
                );
            }
            OpenAiAuthScheme::ApiKeyHeader => {
                headers.insert(
                    "api-key",
                    HeaderValue::from_str(config.api_key.trim()).map_err(|e| {
                        TfiaAiError::InvalidResponse(format!("invalid API key header: {e}"))
                    })?,
                );
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn chat_completions_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            return base.to_string();
        }

        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, TfiaAiError> {
        let body = build_chat_request_body(&request);
        let url = self.chat_completions_url();
        let policy = RetryPolicy {
            max_retries: self.config.max_retries,
            budget_ms: self.config.retry_budget_ms,
            jitter: self.config.retry_jitter,
        };
        let started = Instant::now();
        let mut attempt = 0;

        loop {
            let sent = self
                .client
                .post(&url)
                .header("x-tfia-request-id", next_request_id())
                .header("x-tfia-retry-attempt", attempt.to_string())
                .json(&body)
                .send()
                .await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let (error, delay_ms) = match sent {
                Ok(response) if response.status().is_success() => {
                    return parse_chat_response(&response.text().await?);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retry_after = retry_after_ms(response.headers());
                    let body = response.text().await?;
                    let delay_ms = is_retryable_status(status)
                        .then(|| policy.next_delay_ms(attempt, elapsed_ms, retry_after))
                        .flatten();
                    (TfiaAiError::HttpStatus { status, body }, delay_ms)
                }
                Err(error) => {
                    let delay_ms = is_retryable_transport_error(&error)
                        .then(|| policy.next_delay_ms(attempt, elapsed_ms, None))
                        .flatten();
                    (TfiaAiError::Http(error), delay_ms)
                }
            };

            match delay_ms {
                Some(delay_ms) => {
                    sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                None => return Err(error),
            }
        }
    }
}

fn build_chat_request_body(request: &ChatRequest) -> Value {
    let messages = request
        .messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_str(),
                "content": message.content,
            })
        })
        .collect::<Vec<_>>();
    let mut body = json!({
        "model": request.model,
        "messages": messages,
    });

    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }

    body
}

fn parse_chat_response(raw: &str) -> Result<ChatResponse, TfiaAiError> {
    let parsed: OpenAiChatResponse = serde_json::from_str(raw)?;
    let choice =
        parsed.choices.into_iter().next().ok_or_else(|| {
            TfiaAiError::InvalidResponse("response contained no choices".to_string())
        })?;

    let usage = parsed
        .usage
        .map(|usage| ChatUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        message: Message::assistant_text(render_openai_content(choice.message.content)),
        finish_reason: choice.finish_reason,
        usage,
    })
}

fn render_openai_content(content: Option<Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoiceMessage {
    content: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}
