//! LLM interaction: send one composed prompt and read back JSON.
//!
//! This module is thin: all prompt wording lives in
//! [`crate::prompts`] and all reply cleanup in
//! [`crate::pipeline::postprocess`], so either can change without touching
//! the transport here.
//!
//! ## One attempt, no retry
//!
//! Each call issues exactly one provider request. A transport error, an
//! auth failure, or a reply that is not JSON is returned to the caller as a
//! [`PraxisError`]; there is no backoff loop and no fallback content.
//!
//! ## Backend seam
//!
//! [`AiClient`] talks to a [`CompletionBackend`]. The production backend is
//! [`ProviderBackend`], a wrapper around any `edgequake-llm` provider; tests
//! plug in a scripted backend instead.

use crate::config::ServiceConfig;
use crate::error::PraxisError;
use crate::pipeline::postprocess::extract_json;
use crate::prompts::{build_prompt, Prompt, Task};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default model when a provider is picked from an API key alone.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano";

/// Raw text reply plus token accounting.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Something that can answer a [`Prompt`] with text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Provider name, for logs and `/status`.
    fn provider(&self) -> &str;

    /// Model identifier, for logs and `/status`.
    fn model(&self) -> &str;

    /// Issue one request. Must not retry.
    async fn complete(&self, prompt: &Prompt, temperature: f32)
        -> Result<Completion, PraxisError>;
}

/// [`CompletionBackend`] over an `edgequake-llm` provider.
pub struct ProviderBackend {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CompletionBackend for ProviderBackend {
    fn provider(&self) -> &str {
        self.provider.name()
    }

    fn model(&self) -> &str {
        self.provider.model()
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        temperature: f32,
    ) -> Result<Completion, PraxisError> {
        let messages = vec![
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];
        let options = build_options(prompt, temperature);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| PraxisError::Upstream {
                provider: self.provider.name().to_string(),
                message: e.to_string(),
            })?;

        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// Build `CompletionOptions` for one prompt: JSON output, task token budget.
fn build_options(prompt: &Prompt, temperature: f32) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(prompt.max_tokens),
        response_format: Some("json_object".to_string()),
        ..Default::default()
    }
}

/// The process-wide handle to the content generator.
///
/// Built once at startup and shared through [`crate::server::AppState`];
/// it holds no mutable state.
#[derive(Clone)]
pub struct AiClient {
    backend: Arc<dyn CompletionBackend>,
    temperature: f32,
    excerpt_chars: Option<usize>,
}

impl std::fmt::Debug for AiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiClient")
            .field("provider", &self.backend.provider())
            .field("model", &self.backend.model())
            .field("temperature", &self.temperature)
            .field("excerpt_chars", &self.excerpt_chars)
            .finish()
    }
}

impl AiClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &ServiceConfig) -> Self {
        Self {
            backend,
            temperature: config.temperature,
            excerpt_chars: config.excerpt_chars,
        }
    }

    pub fn provider(&self) -> &str {
        self.backend.provider()
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Run `task` over `text` and return the reply as untyped JSON.
    pub async fn generate_json(&self, task: Task, text: &str) -> Result<Value, PraxisError> {
        let prompt = build_prompt(task, text, self.excerpt_chars);
        let start = Instant::now();
        debug!(
            "{}: sending {} + {} prompt chars to {}/{}",
            task.as_str(),
            prompt.system.len(),
            prompt.user.len(),
            self.provider(),
            self.model()
        );

        let completion = self.backend.complete(&prompt, self.temperature).await?;
        debug!("{}: raw AI output: {}", task.as_str(), completion.content);

        let value = extract_json(&completion.content).map_err(|e| {
            warn!("{}: unusable AI reply: {}", task.as_str(), e);
            e
        })?;

        info!(
            "{}: {} input tokens, {} output tokens, {}ms",
            task.as_str(),
            completion.input_tokens,
            completion.output_tokens,
            start.elapsed().as_millis()
        );
        Ok(value)
    }

    /// Run `task` and decode the reply into its schema.
    ///
    /// The content schemas default every field, so decoding only fails when
    /// the reply is not a JSON object at all.
    pub async fn generate<T: DeserializeOwned>(
        &self,
        task: Task,
        text: &str,
    ) -> Result<T, PraxisError> {
        let value = self.generate_json(task, text).await?;
        if !value.is_object() {
            return Err(PraxisError::InvalidAiResponse {
                detail: format!("expected a JSON object, got: {}", truncate_for_log(&value)),
            });
        }
        serde_json::from_value(value).map_err(|e| PraxisError::InvalidAiResponse {
            detail: e.to_string(),
        })
    }
}

fn truncate_for_log(value: &Value) -> String {
    let s = value.to_string();
    match s.char_indices().nth(120) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s,
    }
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, PraxisError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        PraxisError::Unconfigured {
            reason: format!("provider '{provider_name}': {e}"),
        }
    })
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`, optional `config.model`).
/// 3. **Environment pair** `PRAXIS_LLM_PROVIDER` + `PRAXIS_MODEL`.
/// 4. **Gemini key** (`GEMINI_API_KEY`), then **OpenAI key** (`OPENAI_API_KEY`).
/// 5. **Auto-detection** via `ProviderFactory::from_env`. The factory's mock
///    provider does not count: it would answer every request with filler.
pub fn resolve_provider(config: &ServiceConfig) -> Result<Arc<dyn LLMProvider>, PraxisError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(match name.as_str() {
            "gemini" => DEFAULT_GEMINI_MODEL,
            _ => DEFAULT_OPENAI_MODEL,
        });
        return create_provider(name, model);
    }

    if let (Some(prov), Some(model)) = (
        env_non_empty("PRAXIS_LLM_PROVIDER"),
        env_non_empty("PRAXIS_MODEL"),
    ) {
        return create_provider(&prov, &model);
    }

    if env_non_empty("GEMINI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        return create_provider("gemini", model);
    }

    if env_non_empty("OPENAI_API_KEY").is_some() {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| PraxisError::Unconfigured {
            reason: format!(
                "No LLM provider could be auto-detected from environment. \
                 Set GEMINI_API_KEY or OPENAI_API_KEY, or pass --provider. ({e})"
            ),
        })?;

    if llm_provider.name() == "mock" {
        return Err(PraxisError::Unconfigured {
            reason: "No LLM API key found. Set GEMINI_API_KEY or OPENAI_API_KEY, or pass --provider."
                .to_string(),
        });
    }

    Ok(llm_provider)
}

/// Build the shared [`AiClient`], or explain why the service is unconfigured.
///
/// Never fails the process: the caller keeps serving and answers 503.
pub fn connect(config: &ServiceConfig) -> Result<AiClient, PraxisError> {
    let provider = resolve_provider(config)?;
    info!(
        "AI provider ready: {} / {}",
        provider.name(),
        provider.model()
    );
    Ok(AiClient::new(Arc::new(ProviderBackend::new(provider)), config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted {
        reply: String,
        seen: Mutex<Vec<Prompt>>,
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        fn provider(&self) -> &str {
            "scripted"
        }
        fn model(&self) -> &str {
            "test-model"
        }
        async fn complete(
            &self,
            prompt: &Prompt,
            _temperature: f32,
        ) -> Result<Completion, PraxisError> {
            self.seen.lock().unwrap().push(prompt.clone());
            Ok(Completion {
                content: self.reply.clone(),
                ..Default::default()
            })
        }
    }

    fn client(reply: &str) -> (AiClient, Arc<Scripted>) {
        let backend = Arc::new(Scripted {
            reply: reply.to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let config = ServiceConfig::default();
        (AiClient::new(backend.clone(), &config), backend)
    }

    #[test]
    fn build_options_requests_json() {
        let prompt = build_prompt(Task::Quiz, "text", None);
        let opts = build_options(&prompt, 0.4);
        assert_eq!(opts.temperature, Some(0.4));
        assert_eq!(opts.max_tokens, Some(Task::Quiz.max_tokens()));
        assert_eq!(opts.response_format.as_deref(), Some("json_object"));
    }

    #[tokio::test]
    async fn generate_decodes_schema() {
        let (client, backend) = client(r#"{"slide_topics": ["Intro", "Cells"]}"#);
        let outline: crate::content::TopicOutline =
            client.generate(Task::Topics, "biology").await.unwrap();
        assert_eq!(outline.slide_topics, vec!["Intro", "Cells"]);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1, "exactly one upstream request");
        assert_eq!(seen[0].task, Task::Topics);
    }

    #[tokio::test]
    async fn non_json_reply_is_a_hard_failure() {
        let (client, backend) = client("The quiz is below: Q1 ...");
        let err = client
            .generate::<crate::content::Quiz>(Task::Quiz, "text")
            .await
            .unwrap_err();
        assert!(matches!(err, PraxisError::InvalidAiResponse { .. }));
        assert_eq!(backend.seen.lock().unwrap().len(), 1, "no retry");
    }

    #[tokio::test]
    async fn top_level_array_is_rejected_for_schemas() {
        let (client, _) = client(r#"["a", "b"]"#);
        let err = client
            .generate::<crate::content::TopicOutline>(Task::Topics, "text")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }
}
