//! PDF deck: [`PresentationDeck`] → paginated A4 PDF.
//!
//! Building a deck is split in two:
//!
//! 1. [`DeckPlan::build`] lays the deck out as plain data: pages, each holding
//!    positioned text runs and filled panels. No PDF types are involved, so
//!    pagination and block omission are tested directly on the plan.
//! 2. [`DeckPlan::encode`] turns the plan into PDF bytes with `lopdf`, using
//!    the standard Helvetica / Helvetica-Bold Type 1 fonts in WinAnsi
//!    encoding. Nothing is embedded, which keeps a deck of twenty slides in
//!    the tens of kilobytes.
//!
//! ## Page structure
//!
//! ```text
//! title page ─▶ contents (1+ pages) ─▶ slide 1 (1+ pages) ─▶ slide 2 ─▶ …
//! ```
//!
//! Every slide starts on a fresh page. Content that does not fit continues
//! on extra pages tagged with the same [`Section`].

use crate::content::{PresentationDeck, SlideSpec};
use crate::error::PraxisError;
use crate::pipeline::layout::wrap_words;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, info};

// ── Geometry (PDF points, origin bottom-left) ────────────────────────────

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
pub const MARGIN: f32 = 56.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const BULLET_INDENT: f32 = 18.0;
const CALLOUT_PADDING: f32 = 10.0;

/// Title used on the cover when the deck carries none.
pub const DEFAULT_DECK_TITLE: &str = "Presentation Slides";

/// Longest cover title, in lines; the rest is cut.
const MAX_COVER_TITLE_LINES: usize = 6;

// ── Plan ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    /// Advance width in points of `text` at `size`.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .map(|c| {
                let idx = c as u32;
                if (32..=126).contains(&idx) {
                    let table = match self {
                        Font::Regular => &HELVETICA_WIDTHS,
                        Font::Bold => &HELVETICA_BOLD_WIDTHS,
                    };
                    table[(idx - 32) as usize] as u32
                } else {
                    556
                }
            })
            .sum();
        units as f32 * size / 1000.0
    }
}

/// Which part of the deck a page belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    TitlePage,
    Contents,
    /// Zero-based slide index.
    Slide(usize),
}

/// Role of a text run, kept on the plan for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    DeckTitle,
    DeckTheme,
    SlideCount,
    ContentsHeading,
    ContentsEntry,
    SlideTitle,
    Subtitle,
    BulletMarker,
    Bullet,
    TakeawayHeading,
    Takeaway,
    NotesHeading,
    Notes,
    Metadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub kind: ElementKind,
    pub text: String,
    pub font: Font,
    pub size: f32,
    /// Left edge.
    pub x: f32,
    /// Baseline.
    pub y: f32,
    pub gray: f32,
}

/// A filled rectangle drawn beneath the text of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rgb: (f32, f32, f32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPage {
    pub section: Section,
    pub panels: Vec<Panel>,
    pub runs: Vec<TextRun>,
}

impl PlannedPage {
    fn new(section: Section) -> Self {
        Self {
            section,
            panels: Vec::new(),
            runs: Vec::new(),
        }
    }

    pub fn has(&self, kind: ElementKind) -> bool {
        self.runs.iter().any(|r| r.kind == kind)
    }
}

/// The laid-out deck, ready to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckPlan {
    pub pages: Vec<PlannedPage>,
}

/// Text style for one block.
#[derive(Debug, Clone, Copy)]
struct Style {
    kind: ElementKind,
    font: Font,
    size: f32,
    gray: f32,
}

impl Style {
    const fn new(kind: ElementKind, font: Font, size: f32, gray: f32) -> Self {
        Self {
            kind,
            font,
            size,
            gray,
        }
    }

    fn leading(&self) -> f32 {
        self.size * 1.35
    }
}

const SLIDE_TITLE: Style = Style::new(ElementKind::SlideTitle, Font::Bold, 22.0, 0.1);
const SUBTITLE: Style = Style::new(ElementKind::Subtitle, Font::Regular, 14.0, 0.35);
const BULLET: Style = Style::new(ElementKind::Bullet, Font::Regular, 12.0, 0.0);
const TAKEAWAY_HEADING: Style = Style::new(ElementKind::TakeawayHeading, Font::Bold, 11.0, 0.1);
const TAKEAWAY: Style = Style::new(ElementKind::Takeaway, Font::Regular, 12.0, 0.1);
const NOTES_HEADING: Style = Style::new(ElementKind::NotesHeading, Font::Bold, 12.0, 0.2);
const NOTES: Style = Style::new(ElementKind::Notes, Font::Regular, 11.0, 0.25);
const METADATA: Style = Style::new(ElementKind::Metadata, Font::Regular, 9.0, 0.45);
const CONTENTS_HEADING: Style = Style::new(ElementKind::ContentsHeading, Font::Bold, 20.0, 0.1);
const CONTENTS_ENTRY: Style = Style::new(ElementKind::ContentsEntry, Font::Regular, 12.0, 0.0);

/// Appends runs top-down, opening a continuation page when one is full.
struct Cursor {
    pages: Vec<PlannedPage>,
    y: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            y: 0.0,
        }
    }

    fn start_page(&mut self, section: Section) {
        self.pages.push(PlannedPage::new(section));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn page(&mut self) -> &mut PlannedPage {
        // `start_page` is always called before anything is placed.
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Make room for `height` points, continuing the section on a new page.
    fn reserve(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.page().runs.is_empty() {
            let section = self.page().section;
            self.start_page(section);
        }
    }

    fn gap(&mut self, points: f32) {
        self.y -= points;
    }

    fn place(&mut self, style: Style, x: f32, text: String) {
        self.reserve(style.leading());
        self.y -= style.size;
        let y = self.y;
        self.page().runs.push(TextRun {
            kind: style.kind,
            text,
            font: style.font,
            size: style.size,
            x,
            y,
            gray: style.gray,
        });
        self.y -= style.leading() - style.size;
    }

    /// Wrap `text` to `width` and place every line at `x`.
    fn paragraph(&mut self, style: Style, x: f32, width: f32, text: &str) {
        for line in wrap_lines(style, width, text) {
            self.place(style, x, line);
        }
    }
}

fn wrap_lines(style: Style, width: f32, text: &str) -> Vec<String> {
    wrap_words(text, width, usize::MAX, |s| style.font.text_width(s, style.size))
}

fn present(s: &str) -> Option<&str> {
    let t = s.trim();
    (!t.is_empty()).then_some(t)
}

impl DeckPlan {
    /// Lay out a deck. Pure; never fails.
    pub fn build(deck: &PresentationDeck) -> Self {
        let mut cursor = Cursor::new();

        Self::title_page(&mut cursor, deck);
        Self::contents(&mut cursor, &deck.slides);
        for (i, slide) in deck.slides.iter().enumerate() {
            Self::slide(&mut cursor, i, slide);
        }

        debug!(
            "Deck plan: {} slides → {} pages",
            deck.slides.len(),
            cursor.pages.len()
        );
        Self {
            pages: cursor.pages,
        }
    }

    fn title_page(cursor: &mut Cursor, deck: &PresentationDeck) {
        cursor.start_page(Section::TitlePage);
        let title = deck
            .title
            .as_deref()
            .and_then(present)
            .unwrap_or(DEFAULT_DECK_TITLE);

        let title_style = Style::new(ElementKind::DeckTitle, Font::Bold, 30.0, 0.1);
        let lines = wrap_words(title, CONTENT_WIDTH, MAX_COVER_TITLE_LINES, |s| {
            title_style.font.text_width(s, title_style.size)
        });
        let centered_top = PAGE_HEIGHT * 0.62 + lines.len() as f32 * title_style.leading() / 2.0;
        cursor.y = centered_top.min(PAGE_HEIGHT - MARGIN);
        for line in lines {
            let x = centered(title_style, &line);
            cursor.place(title_style, x, line);
        }

        cursor.gap(18.0);
        if let Some(theme) = deck.presentation_theme.as_deref().and_then(present) {
            let style = Style::new(ElementKind::DeckTheme, Font::Regular, 14.0, 0.35);
            for line in wrap_lines(style, CONTENT_WIDTH, &format!("Theme: {theme}")) {
                let x = centered(style, &line);
                cursor.place(style, x, line);
            }
        }

        let count = deck.slides.len();
        let style = Style::new(ElementKind::SlideCount, Font::Regular, 12.0, 0.45);
        let text = format!("{count} slide{}", if count == 1 { "" } else { "s" });
        let x = centered(style, &text);
        cursor.place(style, x, text);
    }

    fn contents(cursor: &mut Cursor, slides: &[SlideSpec]) {
        cursor.start_page(Section::Contents);
        cursor.place(CONTENTS_HEADING, MARGIN, "Contents".to_string());
        cursor.gap(12.0);

        for (i, slide) in slides.iter().enumerate() {
            let label = format!("{}.", i + 1);
            let indent = 28.0;
            let lines = wrap_lines(CONTENTS_ENTRY, CONTENT_WIDTH - indent, slide.title.trim());
            if lines.is_empty() {
                cursor.place(CONTENTS_ENTRY, MARGIN, label);
                continue;
            }
            for (n, line) in lines.into_iter().enumerate() {
                let text = if n == 0 {
                    format!("{label} {line}")
                } else {
                    line
                };
                let x = if n == 0 { MARGIN } else { MARGIN + indent };
                cursor.place(CONTENTS_ENTRY, x, text);
            }
            cursor.gap(4.0);
        }
    }

    fn slide(cursor: &mut Cursor, index: usize, slide: &SlideSpec) {
        cursor.start_page(Section::Slide(index));

        if let Some(title) = present(&slide.title) {
            cursor.paragraph(SLIDE_TITLE, MARGIN, CONTENT_WIDTH, title);
        }
        if let Some(subtitle) = present(&slide.subtitle) {
            cursor.gap(2.0);
            cursor.paragraph(SUBTITLE, MARGIN, CONTENT_WIDTH, subtitle);
        }
        cursor.gap(14.0);

        for bullet in slide.bullet_points.iter().filter_map(|b| present(b)) {
            let lines = wrap_lines(BULLET, CONTENT_WIDTH - BULLET_INDENT, bullet);
            for (n, line) in lines.into_iter().enumerate() {
                if n == 0 {
                    cursor.reserve(BULLET.leading());
                    let marker_y = cursor.y - BULLET.size;
                    cursor.page().runs.push(TextRun {
                        kind: ElementKind::BulletMarker,
                        text: "\u{2022}".to_string(),
                        font: Font::Regular,
                        size: BULLET.size,
                        x: MARGIN + 4.0,
                        y: marker_y,
                        gray: 0.0,
                    });
                }
                cursor.place(BULLET, MARGIN + BULLET_INDENT, line);
            }
            cursor.gap(6.0);
        }

        if let Some(takeaway) = present(&slide.key_takeaway) {
            Self::callout(cursor, takeaway);
        }

        if let Some(notes) = present(&slide.speaker_notes) {
            cursor.gap(16.0);
            cursor.reserve(NOTES_HEADING.leading() + NOTES.leading());
            cursor.place(NOTES_HEADING, MARGIN, "Speaker notes".to_string());
            cursor.gap(2.0);
            for para in notes.lines().filter_map(present) {
                cursor.paragraph(NOTES, MARGIN, CONTENT_WIDTH, para);
            }
        }

        let meta: Vec<String> = [
            present(&slide.slide_type).map(|t| format!("Type: {t}")),
            present(&slide.visual_theme).map(|t| format!("Theme: {t}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !meta.is_empty() {
            cursor.gap(16.0);
            cursor.paragraph(METADATA, MARGIN, CONTENT_WIDTH, &meta.join(" | "));
        }
    }

    /// Key takeaway: heading and text on a tinted panel. The panel is kept
    /// on one page; a takeaway too long for a page is split without one.
    fn callout(cursor: &mut Cursor, text: &str) {
        let inner = CONTENT_WIDTH - 2.0 * CALLOUT_PADDING;
        let lines = wrap_lines(TAKEAWAY, inner, text);
        let height = 2.0 * CALLOUT_PADDING
            + TAKEAWAY_HEADING.leading()
            + lines.len() as f32 * TAKEAWAY.leading();

        cursor.gap(10.0);
        cursor.reserve(height);
        let fits = cursor.y - height >= MARGIN;
        if fits {
            let top = cursor.y;
            cursor.page().panels.push(Panel {
                x: MARGIN,
                y: top - height,
                width: CONTENT_WIDTH,
                height,
                rgb: (1.0, 0.96, 0.8),
            });
            cursor.gap(CALLOUT_PADDING);
        }

        let x = MARGIN + CALLOUT_PADDING;
        cursor.place(TAKEAWAY_HEADING, x, "Key takeaway".to_string());
        for line in lines {
            cursor.place(TAKEAWAY, x, line);
        }
        if fits {
            cursor.gap(CALLOUT_PADDING);
        }
    }

    // ── Encoding ─────────────────────────────────────────────────────────

    /// Serialize the plan as PDF bytes.
    pub fn encode(&self) -> Result<Vec<u8>, PraxisError> {
        let pdf_err = |e: lopdf::Error| PraxisError::PdfBuild {
            detail: e.to_string(),
        };

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                Font::Regular.resource_name() => regular_id,
                Font::Bold.resource_name() => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content = Content {
                operations: page_operations(page),
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().map_err(pdf_err)?,
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(|e| PraxisError::PdfBuild {
            detail: e.to_string(),
        })?;
        Ok(bytes)
    }
}

fn centered(style: Style, text: &str) -> f32 {
    ((PAGE_WIDTH - style.font.text_width(text, style.size)) / 2.0).max(MARGIN)
}

fn page_operations(page: &PlannedPage) -> Vec<Operation> {
    let mut ops = Vec::new();

    for panel in &page.panels {
        let (r, g, b) = panel.rgb;
        ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        ops.push(Operation::new(
            "re",
            vec![
                panel.x.into(),
                panel.y.into(),
                panel.width.into(),
                panel.height.into(),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
    }

    for run in &page.runs {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![run.font.resource_name().into(), run.size.into()],
        ));
        ops.push(Operation::new("g", vec![run.gray.into()]));
        ops.push(Operation::new("Td", vec![run.x.into(), run.y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(&run.text))],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Encode text as WinAnsi bytes. Characters with no WinAnsi code become `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\t' | '\n' | '\r' => b' ',
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Lay out and encode a deck.
pub fn build_pdf(deck: &PresentationDeck) -> Result<Vec<u8>, PraxisError> {
    if deck.slides.is_empty() {
        return Err(PraxisError::InvalidDeck {
            detail: "the deck contains no slides".to_string(),
        });
    }
    let plan = DeckPlan::build(deck);
    let bytes = plan.encode()?;
    info!(
        "Built PDF deck: {} slides, {} pages, {} bytes",
        deck.slides.len(),
        plan.pages.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Build the deck into a temporary file. The file is removed when the
/// returned guard is dropped.
pub fn write_pdf_tempfile(deck: &PresentationDeck) -> Result<(NamedTempFile, PathBuf), PraxisError> {
    let bytes = build_pdf(deck)?;
    let mut tmp = tempfile::Builder::new()
        .prefix("praxis-deck-")
        .suffix(".pdf")
        .tempfile()
        .map_err(|source| PraxisError::Io {
            operation: "create temporary PDF",
            source,
        })?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.flush())
        .map_err(|source| PraxisError::Io {
            operation: "write temporary PDF",
            source,
        })?;
    let path = tmp.path().to_path_buf();
    Ok((tmp, path))
}

// ── Font metrics ─────────────────────────────────────────────────────────

/// Helvetica advance widths for U+0020..=U+007E, per 1000 em.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for U+0020..=U+007E, per 1000 em.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
