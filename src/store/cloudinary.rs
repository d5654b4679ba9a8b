use futures::{FutureExt, future::BoxFuture};
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;

use super::{ImageStore, TransferError};
use crate::{config::StoreSettings, workflow::PendingFile};

const BODY_PREVIEW_CHARS: usize = 500;

/// Unsigned uploads to a Cloudinary-style `image/upload` endpoint.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: Client,
    endpoint: String,
    upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
}

impl CloudinaryClient {
    pub fn with_client(http: Client, settings: &StoreSettings) -> Self {
        Self {
            http,
            endpoint: upload_endpoint(&settings.api_base, &settings.cloud_account_id),
            upload_preset: settings.upload_preset.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn upload(&self, file: &PendingFile) -> Result<String, TransferError> {
        let part = Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.mime_type())?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransferError::Status {
                status,
                body: preview(&body),
            });
        }

        parse_secure_url(&body)
    }
}

impl ImageStore for CloudinaryClient {
    fn store<'a>(&'a self, file: &'a PendingFile) -> BoxFuture<'a, Result<String, TransferError>> {
        self.upload(file).boxed()
    }
}

pub fn upload_endpoint(api_base: &str, cloud_account_id: &str) -> String {
    format!(
        "{}/v1_1/{}/image/upload",
        api_base.trim_end_matches('/'),
        cloud_account_id
    )
}

fn parse_secure_url(body: &str) -> Result<String, TransferError> {
    let parsed: UploadResponse = serde_json::from_str(body).map_err(|err| {
        TransferError::MalformedResponse(format!("{err}; body: {}", preview(body)))
    })?;

    match parsed.secure_url {
        Some(url) if !url.trim().is_empty() => Ok(url),
        _ => Err(TransferError::MalformedResponse(format!(
            "missing secure_url; body: {}",
            preview(body)
        ))),
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_CHARS {
        let head: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
