//! Request-level operations: what each endpoint does, minus HTTP.
//!
//! Every function here takes already-decoded inputs and the shared
//! [`AiClient`] / [`SlideRenderer`], runs the pipeline stages in order and
//! returns the response body type. The router in [`crate::server`] is a thin
//! layer over these; library users can call them directly.
//!
//! ```text
//! upload ──▶ extract ──▶ prompt ──▶ LLM ──▶ JSON ──▶ schema
//!                                                     │
//!                                   slides ──▶ render (per slide, sequential)
//!                                   deck   ──▶ plan ──▶ lopdf ──▶ temp file
//! ```

use crate::content::{
    Announcement, DetailedSlides, ExamPaper, PresentationDeck, ProcessedContent, Quiz,
    RenderedSlide, SlideOutline, SlideSpec, TopicOutline,
};
use crate::error::PraxisError;
use crate::pipeline::deck;
use crate::pipeline::extract::extract_text;
use crate::pipeline::llm::AiClient;
use crate::pipeline::render::SlideRenderer;
use crate::prompts::Task;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Theme reported when the model leaves `presentation_theme` empty.
pub const DEFAULT_PRESENTATION_THEME: &str = "professional";

/// Extract an upload and ask for a slide-topic outline.
///
/// The full extracted text is echoed back so the client can reuse it for
/// the other generators without uploading again.
pub async fn process_content(
    ai: &AiClient,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<ProcessedContent, PraxisError> {
    let start = Instant::now();
    info!("Processing upload '{}' ({} bytes)", filename, bytes.len());

    // ── Step 1: Extract text ─────────────────────────────────────────────
    let text = extract_text(filename, bytes).await?;

    // ── Step 2: Topic outline ────────────────────────────────────────────
    let outline: TopicOutline = ai.generate(Task::Topics, &text).await?;
    info!(
        "Processed '{}': {} topics in {}ms",
        filename,
        outline.slide_topics.len(),
        start.elapsed().as_millis()
    );

    Ok(ProcessedContent {
        status: "success".to_string(),
        summary: format!("Processed '{filename}'"),
        slide_topics: outline.slide_topics,
        full_content: text,
    })
}

/// Generate a detailed deck and render an image for every slide.
///
/// Slides are rendered one after another; a slide whose image fails keeps
/// its text and gets `image_base64: null`.
pub async fn detailed_slides(
    ai: &AiClient,
    renderer: &Arc<SlideRenderer>,
    content: &str,
) -> Result<DetailedSlides, PraxisError> {
    require_text(content)?;
    let outline: SlideOutline = ai.generate(Task::DetailedSlides, content).await?;

    let start = Instant::now();
    let slides: Vec<RenderedSlide> = stream::iter(outline.slides.into_iter().enumerate())
        .then(|(i, spec)| async move {
            let image = renderer.render_slide(i, &spec).await;
            RenderedSlide {
                spec,
                image_base64: image.into_base64(),
            }
        })
        .collect()
        .await;

    let rendered = slides.iter().filter(|s| s.image_base64.is_some()).count();
    info!(
        "Rendered {}/{} slide images in {}ms",
        rendered,
        slides.len(),
        start.elapsed().as_millis()
    );

    let presentation_theme = match outline.presentation_theme.trim() {
        "" => DEFAULT_PRESENTATION_THEME.to_string(),
        theme => theme.to_string(),
    };

    Ok(DetailedSlides {
        total_slides: slides.len(),
        slides,
        presentation_theme,
    })
}

/// Render one slide. `None` when the image could not be produced.
pub async fn render_slide_image(renderer: &Arc<SlideRenderer>, spec: &SlideSpec) -> Option<String> {
    renderer.render_slide(0, spec).await.into_base64()
}

/// Build the PDF deck through a temporary file and return its bytes.
pub async fn export_pdf(deck: PresentationDeck) -> Result<Vec<u8>, PraxisError> {
    let slides = deck.slides.len();
    let (guard, path) = tokio::task::spawn_blocking(move || deck::write_pdf_tempfile(&deck))
        .await
        .map_err(|e| PraxisError::Internal(format!("PDF build task panicked: {e}")))??;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| PraxisError::Io {
            operation: "read temporary PDF",
            source,
        })?;
    debug!("Read back {} ({} slides)", path.display(), slides);
    drop(guard);
    Ok(bytes)
}

pub async fn quiz(ai: &AiClient, content: &str) -> Result<Quiz, PraxisError> {
    require_text(content)?;
    let quiz: Quiz = ai.generate(Task::Quiz, content).await?;
    info!("Generated quiz with {} questions", quiz.quiz.len());
    Ok(quiz)
}

pub async fn exam(ai: &AiClient, content: &str) -> Result<ExamPaper, PraxisError> {
    require_text(content)?;
    let paper: ExamPaper = ai.generate(Task::Exam, content).await?;
    info!(
        "Generated exam: {} multiple-choice, {} short-answer",
        paper.exam.multiple_choice.len(),
        paper.exam.short_answer.len()
    );
    Ok(paper)
}

pub async fn announcement(ai: &AiClient, content: &str) -> Result<Announcement, PraxisError> {
    require_text(content)?;
    ai.generate(Task::Announcement, content).await
}

/// Blank text is rejected before any upstream call.
fn require_text(content: &str) -> Result<(), PraxisError> {
    if content.trim().is_empty() {
        return Err(PraxisError::EmptyContent {
            source_name: "content".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::pipeline::fonts::FontSet;
    use crate::pipeline::llm::{Completion, CompletionBackend};
    use crate::prompts::Prompt;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        reply: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for Canned {
        fn provider(&self) -> &str {
            "canned"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        async fn complete(&self, _prompt: &Prompt, _t: f32) -> Result<Completion, PraxisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Completion {
                content: self.reply.clone(),
                input_tokens: 0,
                output_tokens: 0,
            })
        }
    }

    fn client(reply: &str) -> (AiClient, Arc<Canned>) {
        let backend = Arc::new(Canned {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        });
        let ai = AiClient::new(backend.clone(), &ServiceConfig::default());
        (ai, backend)
    }

    fn renderer() -> Arc<SlideRenderer> {
        Arc::new(SlideRenderer::new(FontSet::builtin(), "test"))
    }

    #[tokio::test]
    async fn process_content_echoes_text_and_topics() {
        let (ai, _) = client(r#"{"slide_topics": ["Intro", "Cells"]}"#);
        let out = process_content(&ai, "bio.txt", b"Cells are small.".to_vec())
            .await
            .unwrap();
        assert_eq!(out.status, "success");
        assert_eq!(out.summary, "Processed 'bio.txt'");
        assert_eq!(out.slide_topics, vec!["Intro", "Cells"]);
        assert_eq!(out.full_content, "Cells are small.");
    }

    #[tokio::test]
    async fn rejected_upload_never_reaches_the_model() {
        let (ai, backend) = client("{}");
        let err = process_content(&ai, "notes.docx", b"text".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, PraxisError::UnsupportedFileType { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slides_get_images_and_default_theme() {
        let (ai, _) = client(
            r#"{"slides": [
                {"title": "One", "bullet_points": ["a", "b"], "color_scheme": "green"},
                {"title": "Two", "bullet_points": "single", "color_scheme": "teal"}
            ]}"#,
        );
        let out = detailed_slides(&ai, &renderer(), "text").await.unwrap();
        assert_eq!(out.total_slides, 2);
        assert_eq!(out.presentation_theme, DEFAULT_PRESENTATION_THEME);
        assert!(out.slides.iter().all(|s| s.image_base64.is_some()));
        assert_eq!(out.slides[1].spec.bullet_points, vec!["single"]);
    }

    #[tokio::test]
    async fn one_failed_slide_leaves_its_siblings_rendered() {
        let (ai, _) = client(
            r#"{"slides": [
                {"title": "Intro", "bullet_points": ["a"]},
                {"title": "Broken", "bullet_points": ["b"]},
                {"title": "Outro", "bullet_points": ["c"]}
            ]}"#,
        );
        let renderer = Arc::new(SlideRenderer::new(FontSet::builtin(), "test").failing_on("Broken"));
        let out = detailed_slides(&ai, &renderer, "text").await.unwrap();

        assert_eq!(out.total_slides, 3);
        let images: Vec<bool> = out.slides.iter().map(|s| s.image_base64.is_some()).collect();
        assert_eq!(images, [true, false, true]);
        assert_eq!(out.slides[1].spec.title, "Broken");

        let json = serde_json::to_value(&out).unwrap();
        assert!(json["slides"][1]["image_base64"].is_null());
    }

    #[tokio::test]
    async fn blank_content_is_rejected_without_upstream_call() {
        let (ai, backend) = client("{}");
        assert!(quiz(&ai, "   ").await.is_err());
        assert!(exam(&ai, "").await.is_err());
        assert!(announcement(&ai, "\n").await.is_err());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exam_and_announcement_decode() {
        let (ai, _) = client(
            r#"{"exam": {"multiple_choice": [{"question": "Q", "options": ["a","b"], "answer": "a"}],
                         "short_answer": [{"question": "Why?", "answer": 42}]}}"#,
        );
        let paper = exam(&ai, "text").await.unwrap();
        assert_eq!(paper.exam.multiple_choice.len(), 1);
        assert_eq!(paper.exam.short_answer[0].answer, "42");

        let (ai, _) = client(r#"{"announcement_text": "Quiz Friday!", "emoji": "📚"}"#);
        let a = announcement(&ai, "text").await.unwrap();
        assert_eq!(a.announcement_text, "Quiz Friday!");
        assert_eq!(a.call_to_action, "");
    }

    #[tokio::test]
    async fn export_pdf_returns_document_bytes() {
        let deck = PresentationDeck {
            slides: vec![SlideSpec {
                title: "Only".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let bytes = export_pdf(deck).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
