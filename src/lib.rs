//! # praxis
//!
//! Turn lecture notes into teaching material with a Large Language Model.
//!
//! Upload a PDF or text file and get back a slide outline, a detailed deck
//! with speaker notes and rendered slide images, a quiz, an exam or a class
//! announcement. The deck can also be exported as a paginated PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (.pdf / .txt)
//!  │
//!  ├─ 1. Extract  text from the upload (pdf-extract, spawn_blocking)
//!  ├─ 2. Prompt   task instructions + excerpt of the text
//!  ├─ 3. LLM      one JSON-mode call to gemini / openai / …
//!  ├─ 4. Parse    fence stripping, JSON extraction, lenient schemas
//!  ├─ 5. Render   1920×1080 slide PNGs (image + imageproc)
//!  └─ 6. Export   paginated PDF deck (lopdf)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use praxis::{generate, pipeline::llm, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY
//!     let config = ServiceConfig::default();
//!     let ai = llm::connect(&config)?;
//!     let quiz = generate::quiz(&ai, "Photosynthesis converts light into chemical energy.").await?;
//!     for q in quiz.quiz {
//!         println!("{} ({})", q.question, q.answer);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `praxis` server binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the router or the generators in another
//! service:
//! ```toml
//! praxis-backend = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod content;
pub mod error;
pub mod generate;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use content::{
    Announcement, ColorScheme, DetailedSlides, Exam, ExamPaper, PresentationDeck,
    ProcessedContent, Quiz, QuizQuestion, RenderedSlide, ShortAnswerQuestion, SlideImage,
    SlideSpec, TopicOutline,
};
pub use error::{PraxisError, RenderError};
pub use pipeline::llm::{connect, AiClient, CompletionBackend};
pub use pipeline::render::SlideRenderer;
pub use server::{router, AppState};
