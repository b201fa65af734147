//! OpenAI-compatible provider implementation for Tabletalk
//!
//! This module implements the Provider trait against the `chat/completions`
//! endpoint of OpenAI and API-compatible gateways, with tool calling support.

use crate::config::OpenAiConfig;
use crate::credential::Credential;
use crate::error::{Result, TabletalkError};
use crate::providers::{
    CompletionResponse, FunctionCall, Message, Provider, TokenUsage, ToolCall,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default chat completions endpoint
const OPENAI_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat completion provider
///
/// # Examples
///
/// ```no_run
/// use tabletalk::config::OpenAiConfig;
/// use tabletalk::credential::Credential;
/// use tabletalk::providers::{Message, OpenAiProvider, Provider};
///
/// # async fn example() -> tabletalk::error::Result<()> {
/// let credential = Credential::new("sk-...").unwrap();
/// let provider = OpenAiProvider::new(OpenAiConfig::default(), credential)?;
/// let completion = provider.complete(&[Message::user("Hello!")], &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiProvider {
    client: Client,
    config: OpenAiConfig,
    credential: Credential,
}

/// Request structure for the chat completions API
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OpenAiTool>,
    stream: bool,
}

/// Message structure for the chat completions API
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default, deserialize_with = "deserialize_null_content")]
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool definition for the chat completions API
#[derive(Debug, Serialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiFunction,
}

/// Function definition for tools
#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// Tool call in OpenAI format
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(default = "default_tool_type")]
    r#type: String,
    function: OpenAiFunctionCall,
}

/// Function call details in OpenAI format
#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Response structure from the chat completions API
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

/// Choice in a completion response
#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

/// Token usage reported by the API
#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Assistant messages carrying tool calls send `"content": null`
fn deserialize_null_content<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn format_openai_api_error(status: reqwest::StatusCode, body: &str) -> TabletalkError {
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            TabletalkError::Authentication(format!(
                "Provider returned error {}: {}. Check the API key",
                status, body
            ))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => {
            TabletalkError::RateLimited(format!("Provider returned error {}: {}", status, body))
        }
        _ => TabletalkError::Provider(format!("Provider returned error {}: {}", status, body)),
    }
}

impl OpenAiProvider {
    /// Create a new provider instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: OpenAiConfig, credential: Credential) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("tabletalk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TabletalkError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!("Initialized OpenAI provider: model={}", config.model);

        Ok(Self {
            client,
            config,
            credential,
        })
    }

    /// Chat completions URL, honoring `api_base` when configured
    fn completions_url(&self) -> String {
        match &self.config.api_base {
            Some(base) => format!("{}/chat/completions", base.trim_end_matches('/')),
            None => OPENAI_COMPLETIONS_URL.to_string(),
        }
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        crate::providers::validate_message_sequence(messages)
            .into_iter()
            .filter_map(|m| {
                if m.content.is_none() && m.tool_calls.is_none() {
                    return None;
                }

                let tool_calls = m.tool_calls.map(|calls| {
                    calls
                        .into_iter()
                        .map(|tc| OpenAiToolCall {
                            id: tc.id,
                            r#type: default_tool_type(),
                            function: OpenAiFunctionCall {
                                name: tc.function.name,
                                arguments: tc.function.arguments,
                            },
                        })
                        .collect()
                });

                Some(OpenAiMessage {
                    role: m.role,
                    content: m.content.unwrap_or_default(),
                    tool_calls,
                    tool_call_id: m.tool_call_id,
                })
            })
            .collect()
    }

    fn convert_tools(&self, tools: &[serde_json::Value]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .filter_map(|t| {
                let obj = t.as_object()?;
                Some(OpenAiTool {
                    r#type: default_tool_type(),
                    function: OpenAiFunction {
                        name: obj.get("name")?.as_str()?.to_string(),
                        description: obj.get("description")?.as_str()?.to_string(),
                        parameters: obj.get("parameters")?.clone(),
                    },
                })
            })
            .collect()
    }

    fn convert_response_message(&self, message: OpenAiMessage) -> Message {
        match message.tool_calls {
            Some(tool_calls) if !tool_calls.is_empty() => Message::assistant_with_tools(
                tool_calls
                    .into_iter()
                    .map(|tc| ToolCall {
                        id: tc.id,
                        function: FunctionCall {
                            name: tc.function.name,
                            arguments: tc.function.arguments,
                        },
                    })
                    .collect(),
            ),
            _ => Message::assistant(message.content),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse> {
        let request = OpenAiRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(messages),
            tools: self.convert_tools(tools),
            stream: false,
        };

        tracing::debug!(
            "Sending completion request: {} messages, {} tools",
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(self.credential.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Completion request failed: {}", e);
                TabletalkError::Provider(format!("Completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Provider returned error {}: {}", status, error_text);
            return Err(format_openai_api_error(status, &error_text).into());
        }

        let body: OpenAiResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse completion response: {}", e);
            TabletalkError::Provider(format!("Failed to parse completion response: {}", e))
        })?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TabletalkError::Provider("No choices in completion response".to_string()))?;

        let message = self.convert_response_message(choice.message);
        let response = match body.usage {
            Some(u) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(u.prompt_tokens, u.completion_tokens),
            ),
            None => CompletionResponse::new(message),
        };
        Ok(response)
    }

    fn get_current_model(&self) -> Result<String> {
        Ok(self.config.model.clone())
    }
}
