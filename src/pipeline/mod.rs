//! Pipeline stages behind the Praxis endpoints.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets one change
//! (say, a different PDF text extractor) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ llm ──▶ postprocess ──▶ (schema)
//! (pdf/txt)   (LLM)   (JSON cleanup)      │
//!                                          ├──▶ render ──▶ encode   (slide PNGs)
//!                                          └──▶ deck                 (PDF)
//! ```
//!
//! 1. [`extract`]: upload bytes to plain text; PDF parsing runs in
//!    `spawn_blocking`
//! 2. [`llm`]: one provider call per task, JSON output requested; the only
//!    stage with network I/O
//! 3. [`postprocess`]: strip fences and prose, parse the reply as JSON
//! 4. [`render`]: draw a 1920×1080 slide with [`fonts`] and [`layout`]
//! 5. [`encode`]: PNG-encode and base64-wrap a rendered slide
//! 6. [`deck`]: lay out and write the paginated PDF deck

pub mod deck;
pub mod encode;
pub mod extract;
pub mod fonts;
pub mod layout;
pub mod llm;
pub mod postprocess;
pub mod render;
