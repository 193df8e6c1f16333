//! Form extraction for the POST endpoints.
//!
//! The browser client posts `FormData`, i.e. `multipart/form-data`; scripts
//! and `curl -d` send `application/x-www-form-urlencoded`. [`FormFields`]
//! accepts either, collecting text fields by name and file parts separately.

use crate::error::PraxisError;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;
use std::collections::HashMap;
use tracing::debug;

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Decoded text fields and file parts of a form body.
#[derive(Debug, Default)]
pub struct FormFields {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl FormFields {
    /// A text field that must be present. Empty values count as present.
    pub fn text(&self, name: &'static str) -> Result<&str, PraxisError> {
        self.fields
            .get(name)
            .map(String::as_str)
            .ok_or(PraxisError::MissingField { field: name })
    }

    /// Take the file part named `name`.
    pub fn take_file(&mut self, name: &'static str) -> Result<UploadedFile, PraxisError> {
        let idx = self
            .files
            .iter()
            .position(|f| f.field == name)
            .ok_or(PraxisError::MissingField { field: name })?;
        Ok(self.files.swap_remove(idx))
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, PraxisError> {
        let mut form = Self::default();
        let bad = |e: axum::extract::multipart::MultipartError| PraxisError::Multipart {
            detail: e.body_text(),
        };

        while let Some(field) = multipart.next_field().await.map_err(bad)? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field.bytes().await.map_err(bad)?;
                    debug!("Form file '{}': '{}' ({} bytes)", name, filename, bytes.len());
                    form.files.push(UploadedFile {
                        field: name,
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let value = field.text().await.map_err(bad)?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = PraxisError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| PraxisError::Multipart {
                    detail: e.body_text(),
                })?;
            Self::from_multipart(multipart).await
        } else {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| PraxisError::Multipart {
                    detail: e.body_text(),
                })?;
            Ok(Self {
                fields,
                files: Vec::new(),
            })
        }
    }
}
