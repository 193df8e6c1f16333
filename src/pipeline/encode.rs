//! Image encoding: `DynamicImage` → base64 PNG text.
//!
//! The web client shows slide images as `data:image/png;base64,…` URIs, so
//! the transport form is plain base64 of the PNG bytes. PNG is lossless; the
//! large flat gradients of a slide compress well and text edges stay crisp.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as base64 PNG.
pub fn encode_png_base64(img: &DynamicImage) -> Result<String, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );
    Ok(b64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn encode_small_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 0, 0])));
        let b64 = encode_png_base64(&img).expect("encode should succeed");
        let decoded = STANDARD.decode(&b64).expect("valid base64");
        assert!(decoded.starts_with(b"\x89PNG"));

        let back = image::load_from_memory(&decoded).expect("valid png");
        assert_eq!((back.width(), back.height()), (10, 10));
    }
}
