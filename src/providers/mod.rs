//! Provider module for Tabletalk
//!
//! This module contains the language model provider abstraction and the
//! OpenAI-compatible implementation.

pub mod base;
pub mod openai;

pub use base::{
    validate_message_sequence, CompletionResponse, FunctionCall, Message, Provider, TokenUsage,
    ToolCall,
};
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::credential::Credential;
use crate::error::{Result, TabletalkError};

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration
/// * `credential` - API key used to authenticate requests
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
pub fn create_provider(config: &ProviderConfig, credential: Credential) -> Result<Box<dyn Provider>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Box::new(OpenAiProvider::new(
            config.openai.clone(),
            credential,
        )?)),
        other => Err(TabletalkError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAiConfig;

    #[test]
    fn test_create_provider_openai() {
        let config = ProviderConfig {
            provider_type: "openai".to_string(),
            openai: OpenAiConfig::default(),
        };
        let provider = create_provider(&config, Credential::new("sk-test").unwrap()).unwrap();
        assert_eq!(provider.get_current_model().unwrap(), "gpt-4o-mini");
    }

    #[test]
    fn test_create_provider_unknown() {
        let config = ProviderConfig {
            provider_type: "ollama".to_string(),
            openai: OpenAiConfig::default(),
        };
        let result = create_provider(&config, Credential::new("sk-test").unwrap());
        assert!(result.is_err());
    }
}
