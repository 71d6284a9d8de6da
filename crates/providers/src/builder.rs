//! Provider construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use nugget_config::AppConfig;
use nugget_core::error::ProviderError;
use nugget_core::event::EventBus;
use nugget_core::provider::Provider;
use nugget_telemetry::RateLimitCounter;
use tracing::info;

use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::{RetryPolicy, RetryingProvider};

/// Build the configured chat provider, wrapped in the retry policy.
///
/// Hosted providers need an API key; local servers (ollama, vllm,
/// llama.cpp) do not.
pub fn build_from_config(
    config: &AppConfig,
    counter: RateLimitCounter,
    events: Option<Arc<EventBus>>,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let name = config.default_provider.as_str();
    let api_key = match (&config.api_key, is_local(name)) {
        (Some(key), _) => key.clone(),
        (None, true) => String::new(),
        (None, false) => {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for '{name}'; set NUGGET_API_KEY or GROQ_API_KEY, or add api_key to config.toml"
            )));
        }
    };

    let base_url = config
        .provider
        .api_url
        .clone()
        .unwrap_or_else(|| default_base_url(name));

    info!(provider = name, base_url = %base_url, model = %config.default_model, "Building provider");

    let inner: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::with_timeout(
        name,
        base_url,
        api_key,
        Duration::from_secs(config.provider.timeout_secs),
    ));

    let mut provider = RetryingProvider::new(inner, RetryPolicy::from(&config.retry), counter);
    if let Some(events) = events {
        provider = provider.with_events(events);
    }
    Ok(Arc::new(provider))
}

fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "groq" => "https://api.groq.com/openai/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
