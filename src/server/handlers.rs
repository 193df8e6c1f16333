//! Route handlers. Each one decodes its form, checks that the AI service is
//! configured where it needs it, and delegates to [`crate::generate`].

use super::form::FormFields;
use super::AppState;
use crate::content::{
    Announcement, DetailedSlides, ExamPaper, PresentationDeck, ProcessedContent, Quiz, SlideSpec,
};
use crate::error::PraxisError;
use crate::generate;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

/// File name offered to the browser for the PDF deck.
pub const PDF_ATTACHMENT_NAME: &str = "presentation_slides.pdf";

// ── Liveness and status ──────────────────────────────────────────────────

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Praxis AI Backend is running!" }))
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub is_ready: bool,
    pub error_message: String,
    pub provider: Option<String>,
    pub model: Option<String>,
}

pub async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    let ai = state.ai.as_deref();
    Json(ServiceStatus {
        is_ready: ai.is_some(),
        error_message: state.ai_error.clone().unwrap_or_default(),
        provider: ai.map(|c| c.provider().to_string()),
        model: ai.map(|c| c.model().to_string()),
    })
}

/// What this build can do. Independent of provider configuration.
pub async fn features_status() -> Json<Value> {
    Json(json!({
        "file_upload": { "pdf": true, "txt": true },
        "slide_topics": true,
        "detailed_slides": true,
        "slide_images": true,
        "pdf_export": true,
        "quiz": true,
        "exam": true,
        "announcement": true,
    }))
}

// ── Generation ───────────────────────────────────────────────────────────

pub async fn process_content(
    State(state): State<AppState>,
    mut form: FormFields,
) -> Result<Json<ProcessedContent>, PraxisError> {
    let ai = state.ai()?;
    let upload = form.take_file("file")?;
    generate::process_content(ai, &upload.filename, upload.bytes)
        .await
        .map(Json)
}

pub async fn generate_detailed_slides(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<DetailedSlides>, PraxisError> {
    let content = form.text("content")?;
    let ai = state.ai()?;
    generate::detailed_slides(ai, &state.renderer, content)
        .await
        .map(Json)
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<Quiz>, PraxisError> {
    let content = form.text("content")?;
    generate::quiz(state.ai()?, content).await.map(Json)
}

pub async fn generate_exam(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<ExamPaper>, PraxisError> {
    let content = form.text("content")?;
    generate::exam(state.ai()?, content).await.map(Json)
}

pub async fn generate_announcement(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<Announcement>, PraxisError> {
    let content = form.text("content")?;
    generate::announcement(state.ai()?, content).await.map(Json)
}

// ── Rendering (no AI required) ───────────────────────────────────────────

pub async fn render_slide_image(
    State(state): State<AppState>,
    form: FormFields,
) -> Result<Json<Value>, PraxisError> {
    let raw = form.text("slide_json")?;
    let spec: SlideSpec = serde_json::from_str(raw).map_err(|e| PraxisError::InvalidDeck {
        detail: e.to_string(),
    })?;
    let image = generate::render_slide_image(&state.renderer, &spec).await;
    Ok(Json(json!({ "image_base64": image })))
}

pub async fn download_slides_pdf(form: FormFields) -> Result<impl IntoResponse, PraxisError> {
    let raw = form.text("slides_json")?;
    let deck: PresentationDeck =
        serde_json::from_str(raw).map_err(|e| PraxisError::InvalidDeck {
            detail: e.to_string(),
        })?;

    let bytes = generate::export_pdf(deck).await?;
    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{PDF_ATTACHMENT_NAME}\""),
            ),
        ],
        bytes,
    ))
}
