//! Base provider trait and common types for Tabletalk
//!
//! This module defines the Provider trait that language model backends
//! implement, along with the message and response types exchanged with them.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for conversation
///
/// Represents a message in the conversation with the AI provider.
/// Messages can be from the user, assistant, system, or tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system, tool)
    pub role: String,
    /// Content of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Optional tool calls in the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Optional tool call ID (for tool result messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletalk::providers::Message;
    ///
    /// let msg = Message::user("How many rows are there?");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Creates a new tool result message
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletalk::providers::Message;
    ///
    /// let msg = Message::tool_result("call_123", "uploaded_data");
    /// assert_eq!(msg.role, "tool");
    /// assert_eq!(msg.tool_call_id, Some("call_123".to_string()));
    /// ```
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Creates an assistant message with tool calls
    pub fn assistant_with_tools(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }
}

/// Function call information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name of the function/tool to call
    pub name: String,
    /// Arguments for the function (as JSON string)
    pub arguments: String,
}

/// Tool call structure
///
/// Represents a request from the model to execute a tool with specific arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    pub id: String,
    /// Function call details
    pub function: FunctionCall,
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use tabletalk::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Response from a completion call
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The assistant message produced by the model
    pub message: Message,
    /// Token usage, when the provider reports it
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// Create a response without usage information
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    /// Create a response with usage information
    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }
}

/// Language model provider
///
/// Implementations turn a message sequence plus tool definitions into the
/// next assistant message.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Request a completion
    ///
    /// # Arguments
    ///
    /// * `messages` - Conversation so far, oldest first
    /// * `tools` - Tool definitions in OpenAI function format
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Authentication` on rejected credentials,
    /// `TabletalkError::RateLimited` when throttled, and
    /// `TabletalkError::Provider` for any other failure
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[serde_json::Value],
    ) -> Result<CompletionResponse>;

    /// Name of the model completions are requested from
    fn get_current_model(&self) -> Result<String> {
        Err(crate::error::TabletalkError::Provider(
            "Current model information is not available from this provider".to_string(),
        )
        .into())
    }
}

/// Drop tool result messages that have no matching assistant tool call
///
/// OpenAI-compatible APIs reject a `tool` message whose `tool_call_id` does
/// not refer to a preceding assistant tool call.
///
/// # Examples
///
/// ```
/// use tabletalk::providers::{Message, validate_message_sequence};
///
/// let messages = vec![
///     Message::user("Do something"),
///     Message::tool_result("call_123", "Result"),
/// ];
/// let validated = validate_message_sequence(&messages);
/// assert_eq!(validated.len(), 1);
/// ```
pub fn validate_message_sequence(messages: &[Message]) -> Vec<Message> {
    use std::collections::HashSet;

    let mut valid_tool_ids: HashSet<&str> = HashSet::new();
    for message in messages {
        if message.role == "assistant" {
            if let Some(tool_calls) = &message.tool_calls {
                for tool_call in tool_calls {
                    valid_tool_ids.insert(tool_call.id.as_str());
                }
            }
        }
    }

    messages
        .iter()
        .filter(|message| {
            if message.role != "tool" {
                return true;
            }
            match &message.tool_call_id {
                Some(id) if valid_tool_ids.contains(id.as_str()) => true,
                Some(id) => {
                    tracing::warn!("Dropping orphan tool message with tool_call_id: {}", id);
                    false
                }
                None => {
                    tracing::warn!("Dropping tool message without tool_call_id");
                    false
                }
            }
        })
        .cloned()
        .collect()
}
