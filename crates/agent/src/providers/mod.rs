use std::sync::Arc;
use std::time::Duration;

use copo_core::config::{LlmConfig, LlmProvider};

use crate::llm::{LlmClient, LlmError, RetryPolicy};

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

/// Builds the client for the configured provider. Ollama is served through its
/// OpenAI-compatible endpoint.
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let client: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => Arc::new(GeminiClient::from_config(config)?),
        LlmProvider::OpenAi | LlmProvider::Ollama => Arc::new(OpenAiClient::from_config(config)?),
    };
    Ok(client)
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|error| LlmError::Configuration(format!("http client: {error}")))
}

pub(crate) fn retry_policy(config: &LlmConfig) -> RetryPolicy {
    RetryPolicy::with_max_retries(config.max_retries)
}

/// Reads the body of a non-success response into an error, keeping the body short.
pub(crate) async fn status_error(response: reqwest::Response) -> LlmError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > 512 {
        let mut cut = 512;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    LlmError::Status { status, body }
}

#[cfg(test)]
mod tests {
    use copo_core::config::{AppConfig, LlmProvider};

    use super::build_client;
    use crate::llm::LlmError;

    #[test]
    fn provider_selects_client_implementation() {
        let mut config = AppConfig::default().llm;
        config.api_key = Some("test-key".to_string().into());

        let gemini = build_client(&config).expect("gemini client");
        config.provider = LlmProvider::Ollama;
        config.api_key = None;
        config.base_url = Some("http://localhost:11434/v1".to_string());
        let ollama = build_client(&config).expect("ollama client");

        assert_eq!(gemini.provider_name(), "gemini");
        assert_eq!(ollama.provider_name(), "openai-compatible");
    }

    #[test]
    fn gemini_without_api_key_is_a_configuration_error() {
        let config = AppConfig::default().llm;

        assert!(matches!(build_client(&config).err(), Some(LlmError::Configuration(_))));
    }
}
