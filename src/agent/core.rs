//! Agent core implementation with tool-calling loop
//!
//! This module implements the loop that:
//! - Sends the question and recent history to the provider
//! - Executes SQL tool calls requested by the provider
//! - Enforces iteration limits and timeouts

use crate::config::AgentConfig;
use crate::conversation::ChatTurn;
use crate::error::{Result, TabletalkError};
use crate::providers::{Message, Provider, ToolCall};
use crate::tools::{ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tool-calling agent bound to one provider and one toolkit
///
/// # Examples
///
/// ```ignore
/// use tabletalk::agent::Agent;
/// use tabletalk::config::AgentConfig;
/// use tabletalk::tools::ToolRegistry;
///
/// # async fn example() -> tabletalk::error::Result<()> {
/// # let provider = unimplemented!();
/// let agent = Agent::new_boxed(provider, ToolRegistry::new(), AgentConfig::default())?
///     .with_system_prompt("You answer questions about a SQLite database.");
/// let answer = agent.answer("How many rows are there?", &[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct Agent {
    provider: Arc<dyn Provider>,
    tools: ToolRegistry,
    config: AgentConfig,
    system_prompt: Option<String>,
}

impl Agent {
    /// Creates a new agent instance
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Config` if `max_turns` is zero
    pub fn new(
        provider: impl Provider + 'static,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::from_arc(Arc::new(provider), tools, config)
    }

    /// Creates a new agent instance with a boxed provider
    ///
    /// # Errors
    ///
    /// Returns `TabletalkError::Config` if `max_turns` is zero
    pub fn new_boxed(
        provider: Box<dyn Provider>,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        Self::from_arc(Arc::from(provider), tools, config)
    }

    fn from_arc(
        provider: Arc<dyn Provider>,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Result<Self> {
        if config.max_turns == 0 {
            return Err(
                TabletalkError::Config("max_turns must be greater than 0".to_string()).into(),
            );
        }

        Ok(Self {
            provider,
            tools,
            config,
            system_prompt: None,
        })
    }

    /// Sets the system prompt sent ahead of every request
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Answers `question` given the recent `history`
    ///
    /// `history` is sent as-is; callers bound it to the configured window.
    ///
    /// # Errors
    ///
    /// - `TabletalkError::MaxIterationsExceeded` if iteration limit is reached
    /// - `TabletalkError::Timeout` if the time budget is exhausted
    /// - provider errors (`Authentication`, `RateLimited`, `Provider`) as returned
    /// - `TabletalkError::Tool` if a tool fails in a way the model cannot recover from
    pub async fn answer(&self, question: &str, history: &[ChatTurn]) -> Result<String> {
        let start_time = Instant::now();
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        info!(history = history.len(), "Starting agent execution");

        let mut messages: Vec<Message> = Vec::with_capacity(history.len() + 2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.clone()));
        }
        messages.extend(history.iter().map(ChatTurn::to_message));
        messages.push(Message::user(question));

        let tool_definitions = self.tools.all_definitions();
        let mut iteration = 0;

        loop {
            iteration += 1;

            if iteration > self.config.max_turns {
                warn!("Maximum iterations ({}) exceeded", self.config.max_turns);
                return Err(TabletalkError::MaxIterationsExceeded {
                    limit: self.config.max_turns,
                    message: format!(
                        "Agent exceeded maximum iteration limit of {}",
                        self.config.max_turns
                    ),
                }
                .into());
            }

            let Some(remaining) = timeout.checked_sub(start_time.elapsed()) else {
                warn!("Agent execution timeout after {:?}", start_time.elapsed());
                return Err(TabletalkError::Timeout(self.config.timeout_seconds).into());
            };

            debug!("Iteration {}/{}", iteration, self.config.max_turns);

            let completion = tokio::time::timeout(
                remaining,
                self.provider.complete(&messages, &tool_definitions),
            )
            .await
            .map_err(|_| {
                warn!("Provider call exceeded the remaining time budget");
                TabletalkError::Timeout(self.config.timeout_seconds)
            })??;

            if let Some(usage) = completion.usage {
                debug!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Provider usage"
                );
            }

            let message = completion.message;

            match message.tool_calls.clone() {
                Some(tool_calls) if !tool_calls.is_empty() => {
                    debug!("Executing {} tool calls", tool_calls.len());
                    // The assistant turn carrying the calls must precede their results.
                    messages.push(message);
                    for tool_call in &tool_calls {
                        let result = self.execute_tool_call(tool_call).await?;
                        messages.push(Message::tool_result(&tool_call.id, result.to_message()));
                    }
                }
                _ => match message.content {
                    Some(content) if !content.trim().is_empty() => {
                        info!(
                            "Agent execution completed in {} iterations, {} ms",
                            iteration,
                            start_time.elapsed().as_millis()
                        );
                        return Ok(content);
                    }
                    _ => {
                        warn!("Provider returned neither content nor tool calls");
                        return Err(TabletalkError::Provider(
                            "Provider returned invalid response (no content or tool calls)"
                                .to_string(),
                        )
                        .into());
                    }
                },
            }
        }
    }

    /// Executes a single tool call
    ///
    /// Unknown tools and malformed arguments are reported back to the model as
    /// failed results so it can correct the call.
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> Result<ToolResult> {
        let tool_name = &tool_call.function.name;
        debug!("Executing tool: {}", tool_name);

        let Some(tool_executor) = self.tools.get(tool_name) else {
            warn!("Model requested unknown tool: {}", tool_name);
            return Ok(ToolResult::error(format!("Tool not found: {}", tool_name)));
        };

        let raw_args = if tool_call.function.arguments.trim().is_empty() {
            "{}"
        } else {
            tool_call.function.arguments.as_str()
        };
        let args: serde_json::Value = match serde_json::from_str(raw_args) {
            Ok(args) => args,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Failed to parse tool arguments for '{}': {}",
                    tool_name, e
                )))
            }
        };

        let result = match tool_executor.execute(args).await {
            Ok(result) => result,
            Err(e) => match e.downcast_ref::<TabletalkError>() {
                Some(TabletalkError::Tool(message)) => ToolResult::error(message.clone()),
                _ => {
                    return Err(TabletalkError::Tool(format!(
                        "Tool '{}' execution failed: {}",
                        tool_name, e
                    ))
                    .into())
                }
            },
        };

        let max_output_size = self.config.tools.max_output_size;
        let original_len = result.output.len();
        let truncated_result = result.truncate_if_needed(max_output_size);
        if truncated_result.truncated {
            debug!(
                "Tool output truncated from {} to {} bytes",
                original_len, max_output_size
            );
        }

        Ok(truncated_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolsConfig;
    use crate::providers::{CompletionResponse, FunctionCall};
    use crate::store::SqlDatabase;
    use crate::tools::build_sql_toolkit;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock provider replaying scripted responses and recording requests
    #[derive(Clone)]
    struct MockProvider {
        responses: Vec<Message>,
        call_count: Arc<Mutex<usize>>,
        requests: Arc<Mutex<Vec<Vec<Message>>>>,
    }

    impl MockProvider {
        fn new(responses: Vec<Message>) -> Self {
            Self {
                responses,
                call_count: Arc::new(Mutex::new(0)),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }

        fn request(&self, index: usize) -> Vec<Message> {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[serde_json::Value],
        ) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(messages.to_vec());
            let mut count = self.call_count.lock().unwrap();
            let index = *count;
            *count += 1;

            if index < self.responses.len() {
                Ok(CompletionResponse::new(self.responses[index].clone()))
            } else {
                Ok(CompletionResponse::new(Message::assistant("Done")))
            }
        }
    }

    fn tool_call(id: &str, name: &str, arguments: &str) -> Message {
        Message::assistant_with_tools(vec![ToolCall {
            id: id.to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }])
    }

    fn people_toolkit() -> ToolRegistry {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE uploaded_data (name TEXT, age INTEGER);
             INSERT INTO uploaded_data VALUES ('ada', 36), ('alan', 41), ('grace', 85);",
        )
        .unwrap();
        build_sql_toolkit(&SqlDatabase::new(conn), &ToolsConfig::default())
    }

    #[test]
    fn test_agent_creation_with_zero_max_turns_fails() {
        let config = AgentConfig {
            max_turns: 0,
            ..Default::default()
        };
        assert!(Agent::new(MockProvider::new(vec![]), ToolRegistry::new(), config).is_err());
    }

    #[tokio::test]
    async fn test_simple_answer() {
        let provider = MockProvider::new(vec![Message::assistant("Hello, world!")]);
        let agent = Agent::new(provider, ToolRegistry::new(), AgentConfig::default()).unwrap();
        assert_eq!(agent.answer("Say hello", &[]).await.unwrap(), "Hello, world!");
    }

    #[tokio::test]
    async fn test_request_layout_with_history_and_system_prompt() {
        let provider = MockProvider::new(vec![Message::assistant("3")]);
        let agent = Agent::new(provider.clone(), ToolRegistry::new(), AgentConfig::default())
            .unwrap()
            .with_system_prompt("system");
        let history = vec![ChatTurn::user("hi"), ChatTurn::assistant("hello")];

        agent.answer("how many?", &history).await.unwrap();

        let request = provider.request(0);
        let roles: Vec<&str> = request.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(request[3].content.as_deref(), Some("how many?"));
    }

    #[tokio::test]
    async fn test_run_query_result_fed_back_before_answer() {
        let provider = MockProvider::new(vec![
            tool_call(
                "call_1",
                "run_query",
                r#"{"query": "SELECT COUNT(*) AS n FROM uploaded_data"}"#,
            ),
            Message::assistant("There are 3 people."),
        ]);
        let agent = Agent::new(provider.clone(), people_toolkit(), AgentConfig::default()).unwrap();

        let answer = agent.answer("How many people?", &[]).await.unwrap();
        assert_eq!(answer, "There are 3 people.");
        assert_eq!(provider.call_count(), 2);

        let second = provider.request(1);
        let assistant = &second[second.len() - 2];
        assert_eq!(assistant.role, "assistant");
        assert!(assistant.tool_calls.is_some());
        let tool = second.last().unwrap();
        assert_eq!(tool.role, "tool");
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
        assert!(tool.content.as_deref().unwrap().contains('3'));
    }

    #[tokio::test]
    async fn test_sql_error_fed_back_to_model() {
        let provider = MockProvider::new(vec![
            tool_call("call_1", "run_query", r#"{"query": "SELECT salary FROM uploaded_data"}"#),
            Message::assistant("That column does not exist."),
        ]);
        let agent = Agent::new(provider.clone(), people_toolkit(), AgentConfig::default()).unwrap();

        agent.answer("What is the salary?", &[]).await.unwrap();
        let tool = provider.request(1).last().cloned().unwrap();
        assert!(tool.content.unwrap().starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_model() {
        let provider = MockProvider::new(vec![
            tool_call("call_1", "drop_everything", "{}"),
            Message::assistant("Sorry."),
        ]);
        let agent = Agent::new(provider.clone(), people_toolkit(), AgentConfig::default()).unwrap();

        assert_eq!(agent.answer("Do it", &[]).await.unwrap(), "Sorry.");
        let tool = provider.request(1).last().cloned().unwrap();
        assert!(tool.content.unwrap().contains("Tool not found"));
    }

    #[tokio::test]
    async fn test_respects_max_iterations() {
        let responses = (0..10)
            .map(|i| tool_call(&format!("call_{}", i), "list_tables", "{}"))
            .collect();
        let provider = MockProvider::new(responses);
        let config = AgentConfig {
            max_turns: 3,
            ..Default::default()
        };
        let agent = Agent::new(provider.clone(), people_toolkit(), config).unwrap();

        let err = agent.answer("Loop", &[]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TabletalkError>(),
            Some(TabletalkError::MaxIterationsExceeded { limit: 3, .. })
        ));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_response_is_error() {
        let provider = MockProvider::new(vec![Message {
            role: "assistant".to_string(),
            content: None,
            tool_calls: None,
            tool_call_id: None,
        }]);
        let agent = Agent::new(provider, ToolRegistry::new(), AgentConfig::default()).unwrap();
        assert!(agent.answer("Test", &[]).await.is_err());
    }

    struct SlowProvider;

    #[async_trait]
    impl Provider for SlowProvider {
        async fn complete(
            &self,
            _messages: &[Message],
            _tools: &[serde_json::Value],
        ) -> Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(CompletionResponse::new(Message::assistant("late")))
        }
    }

    #[tokio::test]
    async fn test_timeout_enforcement() {
        let config = AgentConfig {
            timeout_seconds: 1,
            ..Default::default()
        };
        let agent = Agent::new(SlowProvider, ToolRegistry::new(), config).unwrap();
        let err = agent.answer("Timeout test", &[]).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TabletalkError>(),
            Some(TabletalkError::Timeout(1))
        ));
    }
}
