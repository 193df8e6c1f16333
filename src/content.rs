//! Request-scoped content types: what the LLM is asked to produce and what
//! the endpoints return.
//!
//! Every upstream reply is untrusted. Each shape below is an explicit serde
//! schema whose fields all default, and whose string/list fields go through
//! the lenient deserialisers in [`lenient`], so a model that forgets a key,
//! answers `null`, or emits a number where a string was asked for still
//! yields a deterministic value instead of a 500.

use crate::error::RenderError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ── Color schemes ────────────────────────────────────────────────────────

/// Named slide palette. Anything unrecognised deserialises to [`ColorScheme::Blue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum ColorScheme {
    #[default]
    Blue,
    Orange,
    Green,
    Purple,
    Gray,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 5] = [
        ColorScheme::Blue,
        ColorScheme::Orange,
        ColorScheme::Green,
        ColorScheme::Purple,
        ColorScheme::Gray,
    ];

    /// Resolve a scheme key, case-insensitively. Unknown keys fall back to blue.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_ascii_lowercase().as_str() {
            "orange" => ColorScheme::Orange,
            "green" => ColorScheme::Green,
            "purple" => ColorScheme::Purple,
            "gray" | "grey" => ColorScheme::Gray,
            _ => ColorScheme::Blue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Blue => "blue",
            ColorScheme::Orange => "orange",
            ColorScheme::Green => "green",
            ColorScheme::Purple => "purple",
            ColorScheme::Gray => "gray",
        }
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ColorScheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColorScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = lenient::string(deserializer)?;
        Ok(ColorScheme::from_key(&key))
    }
}

// ── Slides ───────────────────────────────────────────────────────────────

/// One slide as described by the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideSpec {
    #[serde(deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(deserialize_with = "lenient::string")]
    pub subtitle: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub bullet_points: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub speaker_notes: String,
    #[serde(deserialize_with = "lenient::string")]
    pub visual_theme: String,
    #[serde(deserialize_with = "lenient::string")]
    pub key_takeaway: String,
    #[serde(deserialize_with = "lenient::string")]
    pub slide_type: String,
    pub color_scheme: ColorScheme,
}

/// Outcome of drawing one slide.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideImage {
    /// Base64-encoded PNG.
    Rendered(String),
    Failed(RenderError),
}

impl SlideImage {
    pub fn into_base64(self) -> Option<String> {
        match self {
            SlideImage::Rendered(b64) => Some(b64),
            SlideImage::Failed(_) => None,
        }
    }

    pub fn is_rendered(&self) -> bool {
        matches!(self, SlideImage::Rendered(_))
    }
}

/// A slide plus its picture, as returned by `generate-detailed-slides`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedSlide {
    #[serde(flatten)]
    pub spec: SlideSpec,
    #[serde(default)]
    pub image_base64: Option<String>,
}

/// Reply shape for the detailed-slides task.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SlideOutline {
    #[serde(deserialize_with = "lenient::list")]
    pub slides: Vec<SlideSpec>,
    #[serde(deserialize_with = "lenient::string")]
    pub presentation_theme: String,
}

/// Response body of `generate-detailed-slides`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedSlides {
    pub slides: Vec<RenderedSlide>,
    pub total_slides: usize,
    pub presentation_theme: String,
}

/// Ordered slides handed to the PDF builder.
///
/// Accepts either the object produced by `generate-detailed-slides` or a bare
/// JSON array of slides; image blobs are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationDeck {
    pub title: Option<String>,
    pub presentation_theme: Option<String>,
    pub slides: Vec<SlideSpec>,
}

impl<'de> Deserialize<'de> for PresentationDeck {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Bare(Vec<SlideSpec>),
            Wrapped {
                #[serde(default, deserialize_with = "lenient::string")]
                title: String,
                #[serde(default, deserialize_with = "lenient::string")]
                presentation_theme: String,
                slides: Vec<SlideSpec>,
            },
        }

        let non_empty = |s: String| Some(s).filter(|s| !s.trim().is_empty());
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Bare(slides) => PresentationDeck {
                slides,
                ..Default::default()
            },
            Wire::Wrapped {
                title,
                presentation_theme,
                slides,
            } => PresentationDeck {
                title: non_empty(title),
                presentation_theme: non_empty(presentation_theme),
                slides,
            },
        })
    }
}

// ── Topics, quizzes, exams, announcements ────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicOutline {
    #[serde(deserialize_with = "lenient::string_list")]
    pub slide_topics: Vec<String>,
}

/// Response body of `process-content`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedContent {
    pub status: String,
    pub summary: String,
    pub slide_topics: Vec<String>,
    pub full_content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizQuestion {
    #[serde(deserialize_with = "lenient::string")]
    pub question: String,
    #[serde(deserialize_with = "lenient::string_list")]
    pub options: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub answer: String,
    #[serde(deserialize_with = "lenient::string")]
    pub explanation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quiz {
    #[serde(deserialize_with = "lenient::list")]
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortAnswerQuestion {
    #[serde(deserialize_with = "lenient::string")]
    pub question: String,
    #[serde(deserialize_with = "lenient::string")]
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Exam {
    #[serde(deserialize_with = "lenient::list")]
    pub multiple_choice: Vec<QuizQuestion>,
    #[serde(deserialize_with = "lenient::list")]
    pub short_answer: Vec<ShortAnswerQuestion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamPaper {
    #[serde(deserialize_with = "lenient::record")]
    pub exam: Exam,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Announcement {
    #[serde(deserialize_with = "lenient::string")]
    pub announcement_text: String,
    #[serde(deserialize_with = "lenient::string")]
    pub emoji: String,
    #[serde(deserialize_with = "lenient::string")]
    pub call_to_action: String,
}

// ── Lenient field decoding ───────────────────────────────────────────────

/// Deserialisers that never fail on a wrong JSON type.
pub mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Render a scalar the way a reader would expect; null and containers become "".
    pub fn value_to_string(value: Value) -> String {
        match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(value_to_string(Value::deserialize(deserializer)?))
    }

    /// A list of strings; a lone scalar becomes a one-element list.
    pub fn string_list<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(value_to_string)
                .collect(),
            Value::Null | Value::Object(_) => Vec::new(),
            scalar => vec![value_to_string(scalar)],
        })
    }

    /// A list of records; entries that are not objects are skipped.
    pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            _ => Vec::new(),
        })
    }

    /// A nested record; anything but an object yields the default.
    pub fn record<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        match Value::deserialize(deserializer)? {
            v @ Value::Object(_) => serde_json::from_value(v).map_err(serde::de::Error::custom),
            _ => Ok(T::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_color_scheme_falls_back_to_blue() {
        assert_eq!(ColorScheme::from_key("teal"), ColorScheme::Blue);
        assert_eq!(ColorScheme::from_key(" Purple "), ColorScheme::Purple);
        assert_eq!(ColorScheme::from_key("grey"), ColorScheme::Gray);

        let slide: SlideSpec = serde_json::from_value(json!({ "color_scheme": "neon" })).unwrap();
        assert_eq!(slide.color_scheme, ColorScheme::Blue);
    }

    #[test]
    fn slide_spec_tolerates_missing_and_mistyped_fields() {
        let slide: SlideSpec = serde_json::from_value(json!({
            "title": 42,
            "bullet_points": "only one",
            "speaker_notes": null,
            "key_takeaway": ["not", "a", "string"],
        }))
        .unwrap();

        assert_eq!(slide.title, "42");
        assert_eq!(slide.bullet_points, vec!["only one"]);
        assert_eq!(slide.speaker_notes, "");
        assert_eq!(slide.key_takeaway, "");
        assert_eq!(slide.subtitle, "");
        assert_eq!(slide.color_scheme, ColorScheme::Blue);
    }

    #[test]
    fn slide_outline_skips_non_object_slides() {
        let outline: SlideOutline = serde_json::from_value(json!({
            "slides": [{ "title": "A" }, "junk", 7, { "title": "B" }]
        }))
        .unwrap();
        let titles: Vec<_> = outline.slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(outline.presentation_theme, "");
    }

    #[test]
    fn rendered_slide_flattens_spec() {
        let slide = RenderedSlide {
            spec: SlideSpec {
                title: "Cells".into(),
                color_scheme: ColorScheme::Green,
                ..Default::default()
            },
            image_base64: None,
        };
        let v = serde_json::to_value(&slide).unwrap();
        assert_eq!(v["title"], "Cells");
        assert_eq!(v["color_scheme"], "green");
        assert!(v["image_base64"].is_null());
    }

    #[test]
    fn deck_accepts_wrapped_and_bare_forms() {
        let wrapped: PresentationDeck = serde_json::from_value(json!({
            "slides": [{ "title": "One", "image_base64": "abc" }],
            "total_slides": 1,
            "presentation_theme": "modern"
        }))
        .unwrap();
        assert_eq!(wrapped.slides.len(), 1);
        assert_eq!(wrapped.presentation_theme.as_deref(), Some("modern"));

        let bare: PresentationDeck =
            serde_json::from_value(json!([{ "title": "One" }, { "title": "Two" }])).unwrap();
        assert_eq!(bare.slides.len(), 2);
        assert_eq!(bare.title, None);
    }

    #[test]
    fn deck_rejects_non_deck_json() {
        assert!(serde_json::from_value::<PresentationDeck>(json!({ "foo": 1 })).is_err());
        assert!(serde_json::from_value::<PresentationDeck>(json!("text")).is_err());
    }

    #[test]
    fn exam_defaults_when_sections_missing() {
        let paper: ExamPaper =
            serde_json::from_value(json!({ "exam": { "multiple_choice": [{ "question": "Q" }] } }))
                .unwrap();
        assert_eq!(paper.exam.multiple_choice.len(), 1);
        assert!(paper.exam.short_answer.is_empty());
    }

    #[test]
    fn exam_that_is_not_an_object_is_empty() {
        for reply in [json!({ "exam": null }), json!({ "exam": "n/a" }), json!({ "exam": [1, 2] })] {
            let paper: ExamPaper = serde_json::from_value(reply).unwrap();
            assert_eq!(paper, ExamPaper::default());
        }
    }

    #[test]
    fn deck_tolerates_mistyped_title_and_theme() {
        let deck: PresentationDeck = serde_json::from_value(json!({
            "title": 2024,
            "presentation_theme": null,
            "slides": [{ "title": "One" }]
        }))
        .unwrap();
        assert_eq!(deck.title.as_deref(), Some("2024"));
        assert_eq!(deck.presentation_theme, None);
        assert_eq!(deck.slides.len(), 1);
    }

    #[test]
    fn slide_image_into_base64() {
        assert_eq!(
            SlideImage::Rendered("xyz".into()).into_base64().as_deref(),
            Some("xyz")
        );
        let failed = SlideImage::Failed(RenderError::EncodeFailed {
            slide: 1,
            detail: "boom".into(),
        });
        assert!(!failed.is_rendered());
        assert_eq!(failed.into_base64(), None);
    }
}
