//! Slide rasterisation: title + bullets + colour scheme → 1920×1080 PNG.
//!
//! ## Why spawn_blocking?
//!
//! Drawing a full-HD gradient and PNG-encoding it is pure CPU work of a few
//! tens of milliseconds. `tokio::task::spawn_blocking` keeps it off the
//! async worker threads so one large deck cannot stall unrelated requests.
//!
//! ## Failure isolation
//!
//! A slide that cannot be drawn never fails the request. Encode errors,
//! panics inside the drawing code and cancelled blocking tasks all become a
//! [`SlideImage::Failed`] for that slide alone; siblings are unaffected.

use crate::config::ServiceConfig;
use crate::content::{ColorScheme, SlideImage, SlideSpec};
use crate::error::RenderError;
use crate::pipeline::encode::encode_png_base64;
use crate::pipeline::fonts::{FontSet, TextSize};
use crate::pipeline::layout::wrap_words;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

pub const WIDTH: u32 = 1920;
pub const HEIGHT: u32 = 1080;

pub const MAX_TITLE_LINES: usize = 2;
pub const MAX_BULLETS: usize = 4;
pub const MAX_BULLET_LINES: usize = 2;

const TITLE_WRAP_WIDTH: u32 = WIDTH - 100;
const BULLET_WRAP_WIDTH: u32 = WIDTH - 200;

const RULE_Y: i32 = 60;
const TITLE_TOP: i32 = 120;
const BULLETS_TOP: i32 = 420;
const BULLET_ADVANCE: i32 = 150;
const BULLET_MARKER_X: i32 = 130;
const BULLET_MARKER_RADIUS: i32 = 12;
const BULLET_TEXT_X: i32 = 170;
const LINE_GAP: i32 = 12;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

// ── Colour schemes ───────────────────────────────────────────────────────

/// Gradient endpoints plus the accent used for the rule and bullet markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: Rgb<u8>,
    pub secondary: Rgb<u8>,
    pub accent: Rgb<u8>,
}

impl Palette {
    pub fn for_scheme(scheme: ColorScheme) -> Self {
        let (primary, secondary, accent) = match scheme {
            ColorScheme::Blue => ([25, 55, 109], [66, 133, 244], [255, 213, 79]),
            ColorScheme::Orange => ([230, 81, 0], [255, 152, 0], [255, 241, 118]),
            ColorScheme::Green => ([27, 94, 32], [76, 175, 80], [200, 230, 201]),
            ColorScheme::Purple => ([74, 20, 140], [156, 39, 176], [225, 190, 231]),
            ColorScheme::Gray => ([38, 50, 56], [96, 125, 139], [207, 216, 220]),
        };
        Self {
            primary: Rgb(primary),
            secondary: Rgb(secondary),
            accent: Rgb(accent),
        }
    }

    /// Linear blend for row `y` of an image `height` rows tall.
    fn row_color(&self, y: u32, height: u32) -> Rgb<u8> {
        let ratio = y as f32 / height as f32;
        let mix = |a: u8, b: u8| (a as f32 * (1.0 - ratio) + b as f32 * ratio).round() as u8;
        Rgb([
            mix(self.primary[0], self.secondary[0]),
            mix(self.primary[1], self.secondary[1]),
            mix(self.primary[2], self.secondary[2]),
        ])
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Wrapped text for one slide, after the line and bullet caps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideLayout {
    pub title_lines: Vec<String>,
    /// One entry per drawn bullet, each holding its wrapped lines.
    pub bullets: Vec<Vec<String>>,
}

impl SlideLayout {
    /// Wrap the title and bullets against the pixel budgets of a slide.
    /// Only the first [`MAX_BULLETS`] points are considered; blank ones among
    /// them are skipped.
    pub fn plan(title: &str, bullets: &[String], fonts: &FontSet) -> Self {
        let title_lines = wrap_words(title, TITLE_WRAP_WIDTH as f32, MAX_TITLE_LINES, |s| {
            fonts.text_width(s, TextSize::Title) as f32
        });

        let bullets = bullets
            .iter()
            .take(MAX_BULLETS)
            .filter(|b| !b.trim().is_empty())
            .map(|b| {
                wrap_words(b, BULLET_WRAP_WIDTH as f32, MAX_BULLET_LINES, |s| {
                    fonts.text_width(s, TextSize::Bullet) as f32
                })
            })
            .collect();

        Self {
            title_lines,
            bullets,
        }
    }
}

// ── Renderer ─────────────────────────────────────────────────────────────

/// Draws slide images. Built once at startup and shared via `Arc`.
#[derive(Debug)]
pub struct SlideRenderer {
    fonts: FontSet,
    watermark: String,
    /// Titles whose drawing panics.
    #[cfg(test)]
    fail_titles: Vec<String>,
}

impl SlideRenderer {
    pub fn new(fonts: FontSet, watermark: impl Into<String>) -> Self {
        Self {
            fonts,
            watermark: watermark.into(),
            #[cfg(test)]
            fail_titles: Vec::new(),
        }
    }

    /// Make drawing panic for slides with this title.
    #[cfg(test)]
    pub(crate) fn failing_on(mut self, title: &str) -> Self {
        self.fail_titles.push(title.to_string());
        self
    }

    /// Resolve fonts from the configured path and platform candidates.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            FontSet::resolve(config.font_path.as_deref()),
            config.watermark.clone(),
        )
    }

    /// Draw a slide onto a fresh canvas.
    pub fn draw(&self, title: &str, bullets: &[String], scheme: ColorScheme) -> RgbImage {
        let palette = Palette::for_scheme(scheme);
        let layout = SlideLayout::plan(title, bullets, &self.fonts);
        let mut canvas = RgbImage::new(WIDTH, HEIGHT);

        for y in 0..HEIGHT {
            let row = y as f32;
            draw_line_segment_mut(
                &mut canvas,
                (0.0, row),
                ((WIDTH - 1) as f32, row),
                palette.row_color(y, HEIGHT),
            );
        }

        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(100, RULE_Y).of_size(WIDTH - 200, 4),
            palette.accent,
        );

        let title_lh = self.fonts.line_height(TextSize::Title) as i32;
        let mut y = TITLE_TOP;
        for line in &layout.title_lines {
            let w = self.fonts.text_width(line, TextSize::Title) as i32;
            let x = ((WIDTH as i32 - w) / 2).max(0);
            self.fonts.draw(&mut canvas, line, x, y, TextSize::Title, WHITE);
            y += title_lh + LINE_GAP;
        }

        let bullet_lh = self.fonts.line_height(TextSize::Bullet) as i32;
        for (i, lines) in layout.bullets.iter().enumerate() {
            let top = BULLETS_TOP + i as i32 * BULLET_ADVANCE;
            draw_filled_circle_mut(
                &mut canvas,
                (BULLET_MARKER_X, top + bullet_lh / 2),
                BULLET_MARKER_RADIUS,
                palette.accent,
            );
            for (n, line) in lines.iter().enumerate() {
                let ly = top + n as i32 * (bullet_lh + LINE_GAP);
                self.fonts
                    .draw(&mut canvas, line, BULLET_TEXT_X, ly, TextSize::Bullet, WHITE);
            }
        }

        if !self.watermark.is_empty() {
            let w = self.fonts.text_width(&self.watermark, TextSize::Small) as i32;
            let lh = self.fonts.line_height(TextSize::Small) as i32;
            self.fonts.draw(
                &mut canvas,
                &self.watermark,
                WIDTH as i32 - w - 40,
                HEIGHT as i32 - lh - 30,
                TextSize::Small,
                WHITE,
            );
        }

        canvas
    }

    /// Draw and encode one slide. Never panics; failures are returned as
    /// [`SlideImage::Failed`].
    pub fn render(
        &self,
        index: usize,
        title: &str,
        bullets: &[String],
        scheme: ColorScheme,
    ) -> SlideImage {
        let drawn = catch_unwind(AssertUnwindSafe(|| {
            #[cfg(test)]
            if self.fail_titles.iter().any(|t| t == title) {
                panic!("cannot draw '{title}'");
            }
            self.draw(title, bullets, scheme)
        }));

        let result = match drawn {
            Ok(canvas) => encode_png_base64(&DynamicImage::ImageRgb8(canvas)).map_err(|e| {
                RenderError::EncodeFailed {
                    slide: index,
                    detail: e.to_string(),
                }
            }),
            Err(panic) => Err(RenderError::DrawFailed {
                slide: index,
                detail: panic_message(panic.as_ref()),
            }),
        };

        match result {
            Ok(b64) => {
                debug!("Slide {} rendered ({} scheme)", index, scheme);
                SlideImage::Rendered(b64)
            }
            Err(e) => {
                warn!("{}", e);
                SlideImage::Failed(e)
            }
        }
    }

    /// Render a slide on the blocking pool.
    pub async fn render_slide(self: &Arc<Self>, index: usize, spec: &SlideSpec) -> SlideImage {
        let renderer = Arc::clone(self);
        let title = spec.title.clone();
        let bullets = spec.bullet_points.clone();
        let scheme = spec.color_scheme;

        match tokio::task::spawn_blocking(move || renderer.render(index, &title, &bullets, scheme))
            .await
        {
            Ok(image) => image,
            Err(e) => {
                let err = RenderError::DrawFailed {
                    slide: index,
                    detail: e.to_string(),
                };
                warn!("{}", err);
                SlideImage::Failed(err)
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn renderer() -> SlideRenderer {
        SlideRenderer::new(FontSet::builtin(), "Generated by Praxis AI")
    }

    fn bullets(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn every_scheme_renders_full_hd_png() {
        let r = renderer();
        let points = bullets(&["Light reactions", "Calvin cycle", "Chlorophyll"]);
        for scheme in ColorScheme::ALL {
            let image = r.render(0, "Photosynthesis", &points, scheme);
            let b64 = match image {
                SlideImage::Rendered(b64) => b64,
                SlideImage::Failed(e) => panic!("{scheme} failed: {e}"),
            };
            let png = STANDARD.decode(b64).unwrap();
            let decoded = image::load_from_memory(&png).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (WIDTH, HEIGHT));
        }
    }

    #[test]
    fn unknown_scheme_draws_like_blue() {
        let r = renderer();
        let points = bullets(&["One", "Two"]);
        let unknown = r.draw("Title", &points, ColorScheme::from_key("magenta"));
        let blue = r.draw("Title", &points, ColorScheme::Blue);
        assert!(unknown == blue);
    }

    #[test]
    fn gradient_runs_primary_to_secondary() {
        let r = SlideRenderer::new(FontSet::builtin(), "");
        let img = r.draw("", &[], ColorScheme::Green);
        let palette = Palette::for_scheme(ColorScheme::Green);
        assert_eq!(*img.get_pixel(0, 0), palette.primary);
        assert_eq!(*img.get_pixel(WIDTH / 2, 0), palette.primary);

        let bottom = img.get_pixel(WIDTH / 2, HEIGHT - 1);
        for c in 0..3 {
            assert!((bottom[c] as i32 - palette.secondary[c] as i32).abs() <= 1);
        }
    }

    #[test]
    fn bullets_are_capped_at_four() {
        let fonts = FontSet::builtin();
        let many = bullets(&["a", "b", "c", "d", "e", "f"]);
        let layout = SlideLayout::plan("T", &many, &fonts);
        assert_eq!(layout.bullets.len(), MAX_BULLETS);
        assert_eq!(layout.bullets[3], vec!["d".to_string()]);
    }

    #[test]
    fn blank_bullets_are_skipped() {
        let fonts = FontSet::builtin();
        let points = bullets(&["", "  ", "real"]);
        let layout = SlideLayout::plan("T", &points, &fonts);
        assert_eq!(layout.bullets, vec![vec!["real".to_string()]]);
    }

    #[test]
    fn draw_panic_becomes_a_failed_image() {
        let r = renderer().failing_on("Broken");
        match r.render(3, "Broken", &[], ColorScheme::Blue) {
            SlideImage::Failed(RenderError::DrawFailed { slide, detail }) => {
                assert_eq!(slide, 3);
                assert_eq!(detail, "cannot draw 'Broken'");
            }
            other => panic!("expected a draw failure, got {other:?}"),
        }
        assert!(r.render(4, "Fine", &[], ColorScheme::Blue).is_rendered());
    }

    #[test]
    fn points_past_the_fourth_are_never_drawn() {
        let fonts = FontSet::builtin();
        let points = bullets(&["", "b", "c", "d", "e"]);
        let layout = SlideLayout::plan("T", &points, &fonts);
        let drawn: Vec<&str> = layout.bullets.iter().map(|l| l[0].as_str()).collect();
        assert_eq!(drawn, ["b", "c", "d"]);
    }

    #[test]
    fn long_title_is_capped_at_two_lines() {
        let fonts = FontSet::builtin();
        let title = "word ".repeat(200);
        let layout = SlideLayout::plan(&title, &[], &fonts);
        assert_eq!(layout.title_lines.len(), MAX_TITLE_LINES);
        for line in &layout.title_lines {
            assert!(fonts.text_width(line, TextSize::Title) <= TITLE_WRAP_WIDTH);
        }
    }

    #[test]
    fn short_title_is_a_single_unchanged_line() {
        let fonts = FontSet::builtin();
        let layout = SlideLayout::plan("Cell Division", &[], &fonts);
        assert_eq!(layout.title_lines, vec!["Cell Division".to_string()]);
    }

    #[test]
    fn long_bullet_wraps_to_two_lines() {
        let fonts = FontSet::builtin();
        let text = "mitochondria ".repeat(40);
        let layout = SlideLayout::plan("T", &[text], &fonts);
        assert_eq!(layout.bullets[0].len(), MAX_BULLET_LINES);
    }

    #[tokio::test]
    async fn render_slide_runs_on_blocking_pool() {
        let r = Arc::new(renderer());
        let spec = SlideSpec {
            title: "Async".into(),
            bullet_points: bullets(&["one"]),
            color_scheme: ColorScheme::Purple,
            ..Default::default()
        };
        assert!(r.render_slide(2, &spec).await.is_rendered());
    }

    #[test]
    fn panic_payloads_are_described() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
