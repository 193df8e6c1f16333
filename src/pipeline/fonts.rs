//! Font resolution and text metrics for slide images.
//!
//! One scalable font is used at three sizes. It is looked up once, when the
//! renderer is built: the configured path first, then a list of well-known
//! platform locations. If none can be read and parsed, the renderer falls
//! back to the built-in 8×8 bitmap font from `font8x8`, scaled up. That
//! changes the proportions of the slide but never fails.

use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Bold sans-serif fonts commonly present on Linux, macOS and Windows.
pub const PLATFORM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// The three text roles on a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Title,
    Bullet,
    Small,
}

impl TextSize {
    /// Pixel size for the scalable font.
    fn px(self) -> f32 {
        match self {
            TextSize::Title => 64.0,
            TextSize::Bullet => 40.0,
            TextSize::Small => 24.0,
        }
    }

    /// Integer upscale of the 8×8 bitmap font.
    fn bitmap_scale(self) -> u32 {
        match self {
            TextSize::Title => 6,
            TextSize::Bullet => 4,
            TextSize::Small => 2,
        }
    }
}

enum Face {
    Scalable { font: FontVec, source: PathBuf },
    Bitmap,
}

/// The typeface used to draw every slide.
pub struct FontSet {
    face: Face,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.face {
            Face::Scalable { source, .. } => write!(f, "FontSet(scalable: {})", source.display()),
            Face::Bitmap => write!(f, "FontSet(builtin bitmap)"),
        }
    }
}

impl FontSet {
    /// Resolve a font: `preferred` first, then the platform candidates,
    /// then the built-in bitmap font.
    pub fn resolve(preferred: Option<&Path>) -> Self {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(PLATFORM_FONT_CANDIDATES.iter().map(PathBuf::from));

        for path in candidates {
            match load_font(&path) {
                Ok(font) => {
                    info!("Slide font: {}", path.display());
                    return Self {
                        face: Face::Scalable { font, source: path },
                    };
                }
                Err(reason) => debug!("Font candidate {} unusable: {}", path.display(), reason),
            }
        }

        warn!("No scalable font found; slide images use the built-in bitmap font");
        Self::builtin()
    }

    /// The built-in bitmap font. Always available.
    pub fn builtin() -> Self {
        Self { face: Face::Bitmap }
    }

    /// Parse a scalable font from raw TTF/OTF bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        FontVec::try_from_vec(bytes).ok().map(|font| Self {
            face: Face::Scalable {
                font,
                source: PathBuf::from("<memory>"),
            },
        })
    }

    pub fn is_scalable(&self) -> bool {
        matches!(self.face, Face::Scalable { .. })
    }

    /// Rendered width of `text` in pixels.
    pub fn text_width(&self, text: &str, size: TextSize) -> u32 {
        match &self.face {
            Face::Scalable { font, .. } => text_size(PxScale::from(size.px()), font, text).0,
            Face::Bitmap => text.chars().count() as u32 * 8 * size.bitmap_scale(),
        }
    }

    /// Nominal line height in pixels.
    pub fn line_height(&self, size: TextSize) -> u32 {
        match &self.face {
            Face::Scalable { .. } => size.px().ceil() as u32,
            Face::Bitmap => 8 * size.bitmap_scale(),
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`).
    pub fn draw(&self, canvas: &mut RgbImage, text: &str, x: i32, y: i32, size: TextSize, color: Rgb<u8>) {
        match &self.face {
            Face::Scalable { font, .. } => {
                draw_text_mut(canvas, color, x, y, PxScale::from(size.px()), font, text)
            }
            Face::Bitmap => draw_bitmap_text(canvas, text, x, y, size.bitmap_scale(), color),
        }
    }
}

fn load_font(path: &Path) -> Result<FontVec, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    FontVec::try_from_vec(bytes).map_err(|e| e.to_string())
}

fn draw_bitmap_text(canvas: &mut RgbImage, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let advance = (8 * scale) as i32;
    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = x + i as i32 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8u32 {
                if (bits >> col) & 1 == 1 {
                    let rect = Rect::at(
                        origin_x + (col * scale) as i32,
                        y + (row as u32 * scale) as i32,
                    )
                    .of_size(scale, scale);
                    draw_filled_rect_mut(canvas, rect, color);
                }
            }
        }
    }
}
