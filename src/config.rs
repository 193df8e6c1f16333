//! Configuration for the praxis service.
//!
//! Every knob lives in [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. The binary maps CLI flags (and their `PRAXIS_*`
//! env fallbacks) onto the builder; library users and tests set only what
//! they care about and keep the documented defaults for the rest.

use crate::error::PraxisError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Origins allowed by default: the local dev servers the web client runs on,
/// plus `null` for pages opened straight from disk.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost",
    "http://127.0.0.1",
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "null",
];

pub const DEFAULT_WATERMARK: &str = "Generated by Praxis AI";

/// Configuration for the praxis service.
///
/// Built via [`ServiceConfig::builder()`] or using [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use praxis::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .model("gemini-2.0-flash")
///     .excerpt_chars(6000)
///     .build()
///     .unwrap();
/// assert_eq!(config.excerpt_chars, Some(6000));
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Socket address the HTTP server binds to. Default: `127.0.0.1:8000`.
    pub bind: SocketAddr,

    /// LLM model identifier, e.g. "gemini-2.0-flash". If None, the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for every generation task. Default: 0.4.
    pub temperature: f32,

    /// Excerpt cutoff (characters) applied to every task. If None, each task
    /// uses its own default (4000 or 8000).
    pub excerpt_chars: Option<usize>,

    /// Scalable font for slide images. Tried before the platform candidates.
    pub font_path: Option<PathBuf>,

    /// Watermark drawn in the bottom-right corner of every slide image.
    pub watermark: String,

    /// CORS allow-list.
    pub allowed_origins: Vec<String>,

    /// Maximum request body size in bytes. Default: 25 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.4,
            excerpt_chars: None,
            font_path: None,
            watermark: DEFAULT_WATERMARK.to_string(),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind", &self.bind)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("excerpt_chars", &self.excerpt_chars)
            .field("font_path", &self.font_path)
            .field("watermark", &self.watermark)
            .field("allowed_origins", &self.allowed_origins)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind = addr;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn excerpt_chars(mut self, n: usize) -> Self {
        self.config.excerpt_chars = Some(n);
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn watermark(mut self, text: impl Into<String>) -> Self {
        self.config.watermark = text.into();
        self
    }

    /// Replace the CORS allow-list.
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, PraxisError> {
        let c = &self.config;
        if c.excerpt_chars == Some(0) {
            return Err(PraxisError::InvalidConfig(
                "Excerpt cutoff must be ≥ 1 character".into(),
            ));
        }
        if c.max_upload_bytes < 1024 {
            return Err(PraxisError::InvalidConfig(format!(
                "Upload limit must be at least 1 KiB, got {} bytes",
                c.max_upload_bytes
            )));
        }
        if let Some(bad) = c
            .allowed_origins
            .iter()
            .find(|o| o.trim().is_empty() || axum::http::HeaderValue::from_str(o).is_err())
        {
            return Err(PraxisError::InvalidConfig(format!(
                "CORS origin {bad:?} is not a valid header value"
            )));
        }
        Ok(self.config)
    }
}
