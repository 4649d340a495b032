//! Language-model client abstraction and the Gemini REST implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use scholarsync_core::config::ModelConfig;

use crate::error::ModelError;
use crate::tools::{RawToolCall, ToolDeclaration};

/// Author of a message as the model service sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModelContent {
    pub role: ModelRole,
    pub text: String,
}

/// Everything sent to the model for one turn.
#[derive(Clone, Debug, Serialize)]
pub struct ModelRequest {
    pub contents: Vec<ModelContent>,
    pub system_instruction: String,
    pub tools: Vec<ToolDeclaration>,
    pub search_grounding: bool,
}

/// The model's answer: text, tool calls, or both.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<RawToolCall>,
}

/// A single request/response round trip to a language model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

// =============================================================================
// Gemini
// =============================================================================

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );
        tracing::info!(model = %config.model, "Creating Gemini client");

        Ok(Self {
            client,
            endpoint,
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let body = build_gemini_body(request);
        debug!(
            model = %self.model,
            contents = request.contents.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let preview: String = text.chars().take(300).collect();
            warn!(status = status.as_u16(), "Model service returned an error");
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: preview,
            });
        }

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        parse_gemini_response(&value)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Build the JSON body of a `generateContent` request.
pub fn build_gemini_body(request: &ModelRequest) -> Value {
    let contents: Vec<Value> = request
        .contents
        .iter()
        .map(|c| json!({ "role": c.role, "parts": [{ "text": c.text }] }))
        .collect();

    let mut tools = Vec::new();
    if request.search_grounding {
        tools.push(json!({ "googleSearch": {} }));
    }
    if !request.tools.is_empty() {
        tools.push(json!({ "functionDeclarations": request.tools }));
    }

    let mut body = json!({ "contents": contents });
    if !request.system_instruction.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": request.system_instruction }] });
    }
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools);
    }
    body
}

/// Extract text and function calls from the first candidate.
///
/// A response without candidates (e.g. a blocked prompt) is an empty answer,
/// not an error.
pub fn parse_gemini_response(body: &Value) -> Result<ModelResponse, ModelError> {
    if let Some(err) = body.get("error") {
        return Err(ModelError::InvalidResponse(err.to_string()));
    }

    let mut text_parts = Vec::new();
    let mut tool_calls = Vec::new();

    if let Some(parts) = body["candidates"][0]["content"]["parts"].as_array() {
        for part in parts {
            if let Some(text) = part["text"].as_str() {
                text_parts.push(text);
            }
            if let Some(fc) = part.get("functionCall") {
                match fc["name"].as_str() {
                    Some(name) => tool_calls.push(RawToolCall::new(name, fc["args"].clone())),
                    None => warn!("Skipping functionCall part without a name"),
                }
            }
        }
    }

    let text = text_parts.concat();
    Ok(ModelResponse {
        text: if text.trim().is_empty() { None } else { Some(text) },
        tool_calls,
    })
}

// =============================================================================
// Disabled
// =============================================================================

/// Stand-in used when no API key is configured. Every call fails.
#[derive(Debug, Default)]
pub struct DisabledModelClient;

#[async_trait]
impl ModelClient for DisabledModelClient {
    async fn generate(&self, _request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        Err(ModelError::NotConfigured("no API key configured".to_string()))
    }

    fn name(&self) -> &str {
        "disabled"
    }
}
