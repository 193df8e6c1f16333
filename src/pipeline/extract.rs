//! Text extraction: uploaded bytes → plain text.
//!
//! Dispatch is on the declared file name only. `.txt` is decoded as strict
//! UTF-8; `.pdf` goes through `pdf-extract`, which is CPU-bound and runs
//! inside `spawn_blocking` so a large upload does not stall the Tokio
//! workers. Anything else is rejected before a single byte is parsed.
//!
//! `pdf-extract` panics on some malformed documents (missing font entries,
//! broken object references). Those panics are caught on the blocking thread
//! and reported as [`PraxisError::PdfRead`], like any other unreadable PDF.

use crate::error::PraxisError;
use crate::pipeline::render::panic_message;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, info};

/// Supported upload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// Classify by extension, case-insensitively.
    pub fn from_filename(filename: &str) -> Result<Self, PraxisError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Ok(FileKind::Pdf),
            Some("txt") => Ok(FileKind::Text),
            _ => Err(PraxisError::UnsupportedFileType {
                filename: filename.to_string(),
            }),
        }
    }
}

/// Extract the text of an upload, rejecting empty results.
pub async fn extract_text(filename: &str, bytes: Vec<u8>) -> Result<String, PraxisError> {
    let kind = FileKind::from_filename(filename)?;

    let text = match kind {
        FileKind::Text => decode_text(filename, bytes)?,
        FileKind::Pdf => {
            let len = bytes.len();
            let text = tokio::task::spawn_blocking(move || {
                catch_unwind(AssertUnwindSafe(|| extract_pdf_text(&bytes))).unwrap_or_else(
                    |panic| {
                        Err(PraxisError::PdfRead {
                            detail: panic_message(panic.as_ref()),
                        })
                    },
                )
            })
            .await
            .map_err(|e| PraxisError::Internal(format!("PDF extraction task failed: {e}")))??;
            debug!("Extracted {} chars from {} PDF bytes", text.len(), len);
            text
        }
    };

    if text.trim().is_empty() {
        return Err(PraxisError::EmptyContent {
            source_name: filename.to_string(),
        });
    }

    info!(
        "Extracted {} chars of text from '{}'",
        text.chars().count(),
        filename
    );
    Ok(text)
}

fn decode_text(filename: &str, bytes: Vec<u8>) -> Result<String, PraxisError> {
    let mut text = String::from_utf8(bytes).map_err(|e| PraxisError::InvalidEncoding {
        filename: filename.to_string(),
        detail: e.utf8_error().to_string(),
    })?;
    if text.starts_with('\u{FEFF}') {
        text.drain(..'\u{FEFF}'.len_utf8());
    }
    Ok(text)
}

/// Blocking PDF text extraction.
fn extract_pdf_text(bytes: &[u8]) -> Result<String, PraxisError> {
    if !bytes.starts_with(b"%PDF") {
        return Err(PraxisError::PdfRead {
            detail: "file does not start with a %PDF header".to_string(),
        });
    }
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| PraxisError::PdfRead {
        detail: format!("{:?}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_extension() {
        assert_eq!(FileKind::from_filename("notes.pdf").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_filename("NOTES.PDF").unwrap(), FileKind::Pdf);
        assert_eq!(FileKind::from_filename("a.b.txt").unwrap(), FileKind::Text);
        assert!(FileKind::from_filename("essay.docx").is_err());
        assert!(FileKind::from_filename("README").is_err());
        assert!(FileKind::from_filename("").is_err());
    }

    #[tokio::test]
    async fn text_upload_is_decoded() {
        let text = extract_text("lesson.txt", "Photosynthesis basics".into())
            .await
            .unwrap();
        assert_eq!(text, "Photosynthesis basics");
    }

    #[tokio::test]
    async fn bom_is_stripped() {
        let bytes = "\u{FEFF}hello".as_bytes().to_vec();
        assert_eq!(extract_text("a.txt", bytes).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn whitespace_only_text_is_rejected() {
        let err = extract_text("blank.txt", " \n\t \n".into()).await.unwrap_err();
        assert!(matches!(err, PraxisError::EmptyContent { .. }));
    }

    #[tokio::test]
    async fn invalid_utf8_is_rejected() {
        let err = extract_text("bin.txt", vec![0xff, 0xfe, 0x00])
            .await
            .unwrap_err();
        assert!(matches!(err, PraxisError::InvalidEncoding { .. }));
    }

    #[tokio::test]
    async fn non_pdf_bytes_with_pdf_name_are_rejected() {
        let err = extract_text("fake.pdf", b"hello world".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, PraxisError::PdfRead { .. }));
    }

    /// One page that shows text in the given font dictionary.
    fn pdf_with_font(font: lopdf::Dictionary) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(font);
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[tokio::test]
    async fn extractor_panic_is_a_read_error() {
        use lopdf::dictionary;

        let no_base_font = pdf_with_font(dictionary! { "Type" => "Font", "Subtype" => "Type1" });
        let err = extract_text("broken.pdf", no_base_font).await.unwrap_err();
        assert!(matches!(err, PraxisError::PdfRead { .. }), "{err:?}");
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);

        let no_descendants = pdf_with_font(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "Missing",
            "Encoding" => "Identity-H",
        });
        let err = extract_text("broken.pdf", no_descendants).await.unwrap_err();
        assert!(matches!(err, PraxisError::PdfRead { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn unsupported_extension_short_circuits() {
        let err = extract_text("slides.pptx", b"%PDF-1.4".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, PraxisError::UnsupportedFileType { .. }));
    }
}
