//! Error types for the praxis backend.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PraxisError`]: **Fatal for the request**: the operation cannot
//!   produce a result at all (unsupported upload, upstream reply that is not
//!   JSON, service not configured). Handlers turn it into an HTTP error.
//!
//! * [`RenderError`]: **Non-fatal**: one slide image failed to draw or
//!   encode. It is carried inside [`crate::content::SlideImage`] so the rest
//!   of the deck is still returned, with `image_base64: null` for that slide.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// All request-fatal errors returned by the praxis library and service.
///
/// Per-slide rendering failures use [`RenderError`] and never surface here.
#[derive(Debug, Error)]
pub enum PraxisError {
    // ── Configuration ─────────────────────────────────────────────────────
    /// No usable LLM provider was resolved at startup.
    #[error("AI service is not configured. Error: {reason}")]
    Unconfigured { reason: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input rejection ───────────────────────────────────────────────────
    /// Uploaded file has an extension other than `.pdf` or `.txt`.
    #[error("Unsupported file type '{filename}'. Upload a .pdf or .txt file.")]
    UnsupportedFileType { filename: String },

    /// Extraction produced nothing but whitespace.
    #[error("No readable text found in '{source_name}'.")]
    EmptyContent { source_name: String },

    /// A `.txt` upload is not valid UTF-8.
    #[error("File '{filename}' is not valid UTF-8 text: {detail}")]
    InvalidEncoding { filename: String, detail: String },

    /// The PDF parser rejected the upload.
    #[error("Error reading PDF file: {detail}")]
    PdfRead { detail: String },

    /// A required form or multipart field is absent.
    #[error("Missing required field '{field}'.")]
    MissingField { field: &'static str },

    /// The request body could not be parsed as multipart/form data.
    #[error("Failed to parse form data: {detail}")]
    Multipart { detail: String },

    /// `slides_json` / `slide_json` is not a deck or slide.
    #[error("Invalid slide data: {detail}")]
    InvalidDeck { detail: String },

    // ── Upstream ──────────────────────────────────────────────────────────
    /// The LLM provider call itself failed (network, auth, quota, …).
    #[error("AI provider '{provider}' request failed: {message}")]
    Upstream { provider: String, message: String },

    /// The LLM replied, but not with a JSON object.
    #[error("Failed to process AI response: {detail}")]
    InvalidAiResponse { detail: String },

    // ── Artifacts ─────────────────────────────────────────────────────────
    /// The PDF deck could not be produced.
    #[error("Failed to build PDF deck: {detail}")]
    PdfBuild { detail: String },

    /// Temporary-file I/O around the PDF deck failed.
    #[error("I/O error during {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PraxisError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PraxisError::Unconfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
            PraxisError::UnsupportedFileType { .. }
            | PraxisError::EmptyContent { .. }
            | PraxisError::InvalidEncoding { .. }
            | PraxisError::PdfRead { .. }
            | PraxisError::MissingField { .. }
            | PraxisError::Multipart { .. }
            | PraxisError::InvalidDeck { .. } => StatusCode::BAD_REQUEST,
            PraxisError::InvalidConfig(_)
            | PraxisError::Upstream { .. }
            | PraxisError::InvalidAiResponse { .. }
            | PraxisError::PdfBuild { .. }
            | PraxisError::Io { .. }
            | PraxisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PraxisError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        } else {
            tracing::info!(status = status.as_u16(), "Request rejected: {}", self);
        }

        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}

/// A non-fatal error for a single slide image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// PNG encoding failed.
    #[error("Slide {slide}: image encoding failed: {detail}")]
    EncodeFailed { slide: usize, detail: String },

    /// The drawing task panicked or was cancelled.
    #[error("Slide {slide}: drawing aborted: {detail}")]
    DrawFailed { slide: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_maps_to_503() {
        let e = PraxisError::Unconfigured {
            reason: "no key".into(),
        };
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(e.to_string().contains("no key"));
    }

    #[test]
    fn input_errors_are_client_errors() {
        let e = PraxisError::UnsupportedFileType {
            filename: "notes.docx".into(),
        };
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert!(e.to_string().contains("notes.docx"));

        let e = PraxisError::EmptyContent {
            source_name: "blank.txt".into(),
        };
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_ai_response_keeps_detail() {
        let e = PraxisError::InvalidAiResponse {
            detail: "expected value at line 1 column 1".into(),
        };
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(e.to_string().contains("expected value at line 1"));
    }

    #[test]
    fn render_error_display() {
        let e = RenderError::DrawFailed {
            slide: 3,
            detail: "panicked".into(),
        };
        assert!(e.to_string().contains("Slide 3"));
    }
}
