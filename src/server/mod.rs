//! HTTP surface: shared state, router and serve loop.
//!
//! All per-process resources live in [`AppState`], built once before the
//! listener opens and cloned cheaply into every handler. Nothing in it is
//! mutated after start-up.
//!
//! The AI client is optional. When no provider can be resolved the server
//! still starts; the generation endpoints answer 503 with the resolution
//! error while liveness, status and rendering keep working.

pub mod form;
pub mod handlers;

use crate::config::ServiceConfig;
use crate::error::PraxisError;
use crate::pipeline::llm::{self, AiClient};
use crate::pipeline::render::SlideRenderer;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

/// Shared, read-only state handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub ai: Option<Arc<AiClient>>,
    /// Why `ai` is `None`.
    pub ai_error: Option<String>,
    pub renderer: Arc<SlideRenderer>,
}

impl AppState {
    /// Assemble state from an already-attempted AI connection.
    pub fn new(
        config: ServiceConfig,
        ai: Result<AiClient, PraxisError>,
        renderer: SlideRenderer,
    ) -> Self {
        let (ai, ai_error) = match ai {
            Ok(client) => (Some(Arc::new(client)), None),
            Err(e) => {
                warn!("AI service unavailable, generation endpoints will answer 503: {}", e);
                let reason = match e {
                    PraxisError::Unconfigured { reason } => reason,
                    other => other.to_string(),
                };
                (None, Some(reason))
            }
        };

        Self {
            config: Arc::new(config),
            ai,
            ai_error,
            renderer: Arc::new(renderer),
        }
    }

    /// Resolve the provider and fonts from `config`.
    pub fn from_config(config: ServiceConfig) -> Self {
        let ai = llm::connect(&config);
        let renderer = SlideRenderer::from_config(&config);
        Self::new(config, ai, renderer)
    }

    /// The AI client, or the 503 explaining its absence.
    pub fn ai(&self) -> Result<&AiClient, PraxisError> {
        self.ai.as_deref().ok_or_else(|| PraxisError::Unconfigured {
            reason: self
                .ai_error
                .clone()
                .unwrap_or_else(|| "no provider resolved".to_string()),
        })
    }
}

/// Build the CORS layer from the configured allow-list.
fn cors_layer(config: &ServiceConfig) -> Result<CorsLayer, PraxisError> {
    let origins = config
        .allowed_origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| PraxisError::InvalidConfig(format!("CORS origin {o:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::AUTHORIZATION,
            header::CONTENT_LANGUAGE,
            header::CONTENT_TYPE,
            header::ORIGIN,
        ])
        .expose_headers([header::CONTENT_DISPOSITION]))
}

/// Build the application router.
pub fn router(state: AppState) -> Result<Router, PraxisError> {
    let cors = cors_layer(&state.config)?;
    let body_limit = state.config.max_upload_bytes;

    let router = Router::new()
        .route("/", get(handlers::root))
        .route("/status", get(handlers::status))
        .route("/features-status/", get(handlers::features_status))
        .route("/process-content/", post(handlers::process_content))
        .route(
            "/generate-detailed-slides/",
            post(handlers::generate_detailed_slides),
        )
        .route("/render-slide-image/", post(handlers::render_slide_image))
        .route("/download-slides-pdf/", post(handlers::download_slides_pdf))
        .route("/generate-quiz/", post(handlers::generate_quiz))
        .route("/generate-exam/", post(handlers::generate_exam))
        .route(
            "/generate-announcement/",
            post(handlers::generate_announcement),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state);

    Ok(router)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, listener: TcpListener, shutdown: F) -> Result<(), PraxisError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state)?;
    let addr = listener.local_addr().map_err(|source| PraxisError::Io {
        operation: "read listener address",
        source,
    })?;
    info!("Praxis backend listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|source| PraxisError::Io {
            operation: "serve HTTP",
            source,
        })?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fonts::FontSet;

    fn unconfigured() -> AppState {
        AppState::new(
            ServiceConfig::default(),
            Err(PraxisError::Unconfigured {
                reason: "no key".into(),
            }),
            SlideRenderer::new(FontSet::builtin(), "wm"),
        )
    }

    #[test]
    fn missing_ai_yields_503_error() {
        let state = unconfigured();
        let err = state.ai().unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.to_string().contains("no key"));
        assert_eq!(state.ai_error.as_deref(), Some("no key"));
    }

    #[test]
    fn router_builds_with_default_origins() {
        assert!(router(unconfigured()).is_ok());
    }

    #[test]
    fn bad_origin_fails_router_build() {
        let mut state = unconfigured();
        let mut config = ServiceConfig::default();
        config.allowed_origins = vec!["bad\norigin".into()];
        state.config = Arc::new(config);
        assert!(router(state).is_err());
    }
}
