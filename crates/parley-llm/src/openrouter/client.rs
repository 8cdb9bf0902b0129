// OpenRouter speaks the OpenAI chat-completions dialect; any compatible
// endpoint works through `with_base_url`.

use crate::streaming::parse_chat_sse_stream;
use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, EventStream, TokenUsage};
use crate::types::{Message, ToolCall};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

/// OpenRouter client (plain HTTP, no SDK)
pub struct OpenRouterClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::build(api_key.into(), None, None)
    }

    /// Attribution headers shown in the OpenRouter dashboard
    pub fn with_app_info(
        api_key: impl Into<String>,
        referer: Option<String>,
        title: Option<String>,
    ) -> Result<Self> {
        Self::build(api_key.into(), referer, title)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build(api_key: String, referer: Option<String>, title: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );
        if let Some(referer) = referer {
            headers.insert(
                HeaderName::from_static("http-referer"),
                HeaderValue::from_str(&referer).context("Invalid referer header")?,
            );
        }
        if let Some(title) = title {
            headers.insert(
                HeaderName::from_static("x-title"),
                HeaderValue::from_str(&title).context("Invalid title header")?,
            );
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: OPENROUTER_API_BASE.to_string(),
        })
    }

    /// Build chat completion request payload
    pub(crate) fn build_chat_request(
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
        stream: bool,
    ) -> Result<Value> {
        let mut request = serde_json::json!({
            "model": model,
            "messages": serde_json::to_value(messages)?,
            "stream": stream,
        });

        let Some(obj) = request.as_object_mut() else {
            anyhow::bail!("chat request payload is not an object");
        };

        if stream {
            obj.insert("stream_options".to_string(), serde_json::json!({ "include_usage": true }));
        }
        if let Some(temp) = options.temperature {
            obj.insert("temperature".to_string(), serde_json::json!(temp));
        }
        if let Some(max_tokens) = options.max_tokens {
            obj.insert("max_tokens".to_string(), serde_json::json!(max_tokens));
        }
        if let Some(tools) = options.tools.as_ref().filter(|t| !t.is_empty()) {
            obj.insert("tools".to_string(), serde_json::to_value(tools)?);
            if let Some(tool_choice) = &options.tool_choice {
                obj.insert("tool_choice".to_string(), serde_json::to_value(tool_choice)?);
            }
        }
        if options.include_reasoning {
            obj.insert("include_reasoning".to_string(), serde_json::json!(true));
        }
        if options.json_mode {
            obj.insert("response_format".to_string(), serde_json::json!({ "type": "json_object" }));
        }

        Ok(request)
    }

    async fn post_completion(&self, payload: &Value) -> Result<reqwest::Response> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenRouter API error ({}): {}", status, error_text);
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload =
            Self::build_chat_request(&request.model, &request.messages, &request.options, false)?;

        tracing::debug!(model = %request.model, messages = request.messages.len(), "chat completion");

        let raw: OpenRouterChatResponse = self
            .post_completion(&payload)
            .await?
            .json()
            .await
            .context("Failed to parse response")?;

        let choice = raw.choices.first();
        Ok(ChatResponse {
            content: choice.and_then(|c| c.message.content.clone()),
            tool_calls: choice.and_then(|c| c.message.tool_calls.clone()),
            usage: raw.usage.as_ref().map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
                reasoning_tokens: None,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason.clone()),
            raw: serde_json::to_value(&raw)?,
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<EventStream> {
        let payload =
            Self::build_chat_request(&request.model, &request.messages, &request.options, true)?;

        tracing::debug!(model = %request.model, messages = request.messages.len(), "streaming chat completion");

        let response = self.post_completion(&payload).await?;
        Ok(parse_chat_sse_stream(response))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenRouterChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResponseMessage {
    pub role: String,
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
