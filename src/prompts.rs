//! Prompts for every content-generation task.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing what a task asks for (say, one
//!    more quiz question) means editing exactly one place.
//!
//! 2. **Testability**: unit tests can build and inspect prompts directly
//!    without a live provider, so prompt regressions are easy to catch.
//!
//! Each task embeds only an *excerpt* of the source text: the first
//! [`Task::default_excerpt_chars`] characters (or the configured override).
//! Longer documents lose their tail silently; the cut counts characters, not
//! bytes, and may land mid-word.

use serde::Serialize;
use tracing::debug;

/// The content-generation tasks the service knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Topics,
    DetailedSlides,
    Quiz,
    Exam,
    Announcement,
}

impl Task {
    pub const ALL: [Task; 5] = [
        Task::Topics,
        Task::DetailedSlides,
        Task::Quiz,
        Task::Exam,
        Task::Announcement,
    ];

    /// Excerpt cutoff used when the config has no override.
    pub fn default_excerpt_chars(&self) -> usize {
        match self {
            Task::Topics | Task::Announcement => 4000,
            Task::DetailedSlides | Task::Quiz | Task::Exam => 8000,
        }
    }

    /// Output token ceiling requested from the provider.
    pub fn max_tokens(&self) -> usize {
        match self {
            Task::Topics | Task::Announcement => 1024,
            Task::Quiz => 2048,
            Task::Exam => 4096,
            Task::DetailedSlides => 8192,
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Task::Topics => TOPICS_SYSTEM_PROMPT,
            Task::DetailedSlides => SLIDES_SYSTEM_PROMPT,
            Task::Quiz => QUIZ_SYSTEM_PROMPT,
            Task::Exam => EXAM_SYSTEM_PROMPT,
            Task::Announcement => ANNOUNCEMENT_SYSTEM_PROMPT,
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            Task::Topics => TOPICS_INSTRUCTIONS,
            Task::DetailedSlides => SLIDES_INSTRUCTIONS,
            Task::Quiz => QUIZ_INSTRUCTIONS,
            Task::Exam => EXAM_INSTRUCTIONS,
            Task::Announcement => ANNOUNCEMENT_INSTRUCTIONS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Topics => "topics",
            Task::DetailedSlides => "detailed_slides",
            Task::Quiz => "quiz",
            Task::Exam => "exam",
            Task::Announcement => "announcement",
        }
    }
}

/// A fully composed request for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub task: Task,
    pub system: String,
    pub user: String,
    pub max_tokens: usize,
}

/// Build the prompt for `task` from the full source `text`.
///
/// `excerpt_chars` overrides the task's default cutoff when set.
pub fn build_prompt(task: Task, text: &str, excerpt_chars: Option<usize>) -> Prompt {
    let limit = excerpt_chars.unwrap_or_else(|| task.default_excerpt_chars());
    let excerpt = excerpt(text, limit);
    if excerpt.len() < text.len() {
        debug!(
            "{}: source truncated to {} of {} chars",
            task.as_str(),
            limit,
            text.chars().count()
        );
    }

    Prompt {
        task,
        system: task.system_prompt().to_string(),
        user: format!(
            "{}\n\nText:\n---\n{}\n---",
            task.instructions(),
            excerpt
        ),
        max_tokens: task.max_tokens(),
    }
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

// ── System prompts ───────────────────────────────────────────────────────

pub const TOPICS_SYSTEM_PROMPT: &str = "You are an expert instructional designer. \
Analyze the provided text and create a structured lesson plan. \
Respond with a single JSON object and nothing else.";

pub const SLIDES_SYSTEM_PROMPT: &str = "You are an expert instructional designer and \
presentation author. You turn source material into clear, engaging lecture slides \
with helpful speaker notes. Respond with a single JSON object and nothing else.";

pub const QUIZ_SYSTEM_PROMPT: &str = "You are a helpful teaching assistant who creates quizzes. \
Respond with a single JSON object and nothing else.";

pub const EXAM_SYSTEM_PROMPT: &str = "You are an experienced examiner who writes fair, \
well-balanced exams that test understanding rather than recall. \
Respond with a single JSON object and nothing else.";

pub const ANNOUNCEMENT_SYSTEM_PROMPT: &str = "You are a teacher creating a concise and \
engaging announcement for students. Respond with a single JSON object and nothing else.";

// ── Output-shape instructions ────────────────────────────────────────────

const TOPICS_INSTRUCTIONS: &str = r#"Based on the text below, generate a JSON object with a single key "slide_topics", which is a list of 6-8 logical slide titles in teaching order."#;

const SLIDES_INSTRUCTIONS: &str = r#"Based on the text below, create a detailed slide deck of 6-8 slides.
Return a JSON object with two keys:
- "presentation_theme": a short name for the overall visual theme
- "slides": a list of slide objects, each with exactly these keys:
  - "title": at most 8 words
  - "subtitle": one short line
  - "bullet_points": a list of 3-4 concise bullet strings
  - "speaker_notes": 2-4 sentences the presenter can say
  - "visual_theme": a short description of a suitable visual
  - "key_takeaway": one sentence
  - "slide_type": one of "title", "content", "summary"
  - "color_scheme": one of "blue", "orange", "green", "purple", "gray""#;

const QUIZ_INSTRUCTIONS: &str = r#"Based on the text below, generate a 5-question multiple-choice quiz.
Provide the output as a JSON object with a key "quiz", a list of objects with keys:
"question", "options" (a list of exactly 4 strings), "answer" (the correct option text) and "explanation"."#;

const EXAM_INSTRUCTIONS: &str = r#"Based on the text below, write an exam.
Provide the output as a JSON object with a key "exam" whose value is an object with two keys:
- "multiple_choice": a list of 5 objects with keys "question", "options" (exactly 4 strings), "answer", "explanation"
- "short_answer": a list of 3 objects with keys "question" and "answer" (a model answer)"#;

const ANNOUNCEMENT_INSTRUCTIONS: &str = r#"Based on the key topics in the text below, write a short, exciting announcement for students about the upcoming lesson.
The output should be a JSON object with keys "announcement_text", "emoji" (one or two fitting emoji) and "call_to_action" (one short sentence)."#;
