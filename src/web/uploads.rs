use axum::{extract::Multipart, http::StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::workflow::RawFile;

/// Multipart field carrying the candidate files.
pub const FILES_FIELD: &str = "files";

/// Error returned when the selection form cannot be read.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct UploadError {
    status: StatusCode,
    message: String,
}

impl UploadError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Collects every file sent under [`FILES_FIELD`], in order, in memory.
///
/// Content types are taken as the browser declared them; a part without one
/// is treated as opaque bytes and will be filtered out by the workflow.
pub async fn read_candidates(multipart: &mut Multipart) -> Result<Vec<RawFile>, UploadError> {
    let mut candidates = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        UploadError::new(err.status(), format!("failed to read upload form: {}", err.body_text()))
    })? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string());
        let bytes = field.bytes().await.map_err(|err| {
            UploadError::new(
                err.status(),
                format!("failed to read `{name}`: {}", err.body_text()),
            )
        })?;

        debug!(file = %name, %content_type, size = bytes.len(), "received candidate");
        candidates.push(RawFile::new(name, content_type, bytes.to_vec()));
    }

    Ok(candidates)
}
