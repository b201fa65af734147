//! The answering agent boundary
//!
//! Sessions talk to an [`AnsweringAgent`]; [`SqlAgent`] is the production
//! implementation that runs the tool-calling loop against the active store.

use crate::agent::{Agent, AgentFault};
use crate::config::Config;
use crate::conversation::ChatTurn;
use crate::credential::Credential;
use crate::error::TabletalkError;
use crate::prompts;
use crate::providers::{create_provider, Provider};
use crate::store::DataStoreHandle;
use crate::tools::build_sql_toolkit;
use async_trait::async_trait;

/// Everything an agent needs to answer one question
#[derive(Debug, Clone, Copy)]
pub struct AgentRequest<'a> {
    /// The user's question
    pub question: &'a str,
    /// Recent turns preceding the question, oldest first
    pub history: &'a [ChatTurn],
    /// Store to answer from
    pub store: &'a DataStoreHandle,
    /// Provider credential, if configured
    pub credential: Option<&'a Credential>,
}

/// Produces natural-language answers to questions about a store
#[async_trait]
pub trait AnsweringAgent: Send + Sync {
    /// Answer a single question
    ///
    /// # Errors
    ///
    /// Returns an [`AgentFault`] describing why no answer was produced
    async fn answer(&self, request: AgentRequest<'_>) -> Result<String, AgentFault>;
}

/// LLM-backed SQL agent
pub struct SqlAgent {
    config: Config,
}

impl SqlAgent {
    /// Create an agent using the provider and limits in `config`
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn build(&self, provider: Box<dyn Provider>, store: &DataStoreHandle) -> crate::error::Result<Agent> {
        let tools = build_sql_toolkit(store.database(), &self.config.agent.tools);
        let prompt = prompts::build_system_prompt(
            store.source(),
            store.database().dialect(),
            self.config.agent.tools.max_query_rows,
        );
        Ok(Agent::new_boxed(provider, tools, self.config.agent.clone())?.with_system_prompt(prompt))
    }
}

#[async_trait]
impl AnsweringAgent for SqlAgent {
    async fn answer(&self, request: AgentRequest<'_>) -> Result<String, AgentFault> {
        let Some(credential) = request.credential else {
            let err = TabletalkError::MissingCredentials(
                "Please provide an OpenAI API key first".to_string(),
            );
            return Err(AgentFault::from_error(&err.into()));
        };

        let provider = create_provider(&self.config.provider, credential.clone())
            .map_err(|e| AgentFault::from_error(&e))?;
        if let Ok(model) = provider.get_current_model() {
            tracing::debug!(model = %model, "Answering question");
        }
        let agent = self
            .build(provider, request.store)
            .map_err(|e| AgentFault::from_error(&e))?;

        agent
            .answer(request.question, request.history)
            .await
            .map_err(|e| {
                let fault = AgentFault::from_error(&e);
                tracing::warn!(kind = ?fault.kind, "Agent failed: {}", fault.message);
                fault
            })
    }
}
