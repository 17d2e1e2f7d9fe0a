pub mod anthropic;
pub mod azure_openai;
pub mod provider;
pub mod types;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use azure_openai::{AzureOpenAiConfig, AzureOpenAiProvider};
pub use provider::LLMProvider;
pub use types::{ChatMessage, ChatOptions, ChatResponse, Role, TokenUsage, ToolCall, ToolDef};

use std::env;

use crate::config::LlmConfig;
use crate::errors::{BctbError, Result};

/// Build the configured `LLMProvider` from workspace config + env-var
/// secrets, read at the moment of use per §5 ("never cached").
pub fn build_provider(config: &LlmConfig) -> Result<Box<dyn LLMProvider>> {
    match config.provider.as_str() {
        "azure-openai" => {
            let endpoint = env::var("AZURE_OPENAI_ENDPOINT")
                .ok()
                .or_else(|| config.endpoint.clone())
                .ok_or_else(|| BctbError::config("AZURE_OPENAI_ENDPOINT is not set"))?;
            let api_key = env::var("AZURE_OPENAI_KEY")
                .map_err(|_| BctbError::auth("AZURE_OPENAI_KEY is not set"))?;
            let deployment = env::var("AZURE_OPENAI_DEPLOYMENT")
                .ok()
                .or_else(|| config.deployment.clone())
                .ok_or_else(|| BctbError::config("AZURE_OPENAI_DEPLOYMENT is not set"))?;
            let api_version = config
                .api_version
                .clone()
                .unwrap_or_else(|| "2024-06-01".to_string());
            Ok(Box::new(AzureOpenAiProvider::new(AzureOpenAiConfig {
                endpoint,
                deployment,
                api_version,
                api_key,
                max_retries: 3,
                timeout_secs: 60,
            })))
        }
        "anthropic" => {
            let api_key = env::var("ANTHROPIC_API_KEY")
                .map_err(|_| BctbError::auth("ANTHROPIC_API_KEY is not set"))?;
            let model = env::var("ANTHROPIC_MODEL")
                .ok()
                .or_else(|| config.model.clone())
                .unwrap_or_else(|| "claude-3-5-sonnet-latest".to_string());
            Ok(Box::new(AnthropicProvider::new(AnthropicConfig {
                api_key,
                model,
                max_retries: 3,
                timeout_secs: 60,
            })))
        }
        other => Err(BctbError::config(format!(
            "unknown LLM provider '{other}'; expected 'azure-openai' or 'anthropic'"
        ))),
    }
}
