//! Upload workflow: selection, validation, sequential upload, results.
//!
//! All transitions happen on discrete events (a selection, a drop, an upload
//! trigger, a transfer completing). The only suspension point is the batch
//! transfer, which is why [`UploadWorkflow::begin_upload`] and
//! [`UploadWorkflow::finish_upload`] are exposed separately: a caller that
//! shares the workflow behind a lock releases it while the transfers run
//! (see `session::spawn_batch`), and the `Uploading` status keeps a second
//! trigger from starting another batch in the meantime.

mod batch;
mod selection;

pub use batch::{TransferFailure, UploadBatch, run_batch};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    clipboard::{Clipboard, ClipboardError},
    config::WorkflowSettings,
};

pub const COPY_SUCCESS_MESSAGE: &str = "Copied!";
pub const COPY_FAILURE_MESSAGE: &str = "Failed to copy";

/// A file as handed over by the picker or a drop, before validation.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// A validated image waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct PendingFile {
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
}

impl PendingFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub source_index: usize,
    pub source_name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Idle,
    Selecting,
    Uploading,
    Done,
    Failed,
}

/// Where a selection came from; only affects the wording of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionSource {
    #[default]
    Picker,
    Drop,
}

impl SelectionSource {
    fn no_images_message(&self) -> &'static str {
        match self {
            SelectionSource::Picker => "Please select an image file",
            SelectionSource::Drop => "Please drop an image file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("{}", .origin.no_images_message())]
    NoValidImages { origin: SelectionSource },
    #[error("You can upload up to {max} images at a time ({requested} selected)")]
    TooManyImages { max: usize, requested: usize },
    #[error("Please select an image first")]
    NothingSelected,
    #[error("Error uploading image. Please try again.")]
    TransferFailed,
    #[error("An upload is already in progress")]
    UploadInProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Copied,
    Failed,
}

impl CopyStatus {
    pub fn message(&self) -> &'static str {
        match self {
            CopyStatus::Copied => COPY_SUCCESS_MESSAGE,
            CopyStatus::Failed => COPY_FAILURE_MESSAGE,
        }
    }
}

/// What happened to a batch handed back through [`UploadWorkflow::finish_upload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Published(usize),
    Failed,
    /// The batch no longer belongs to this workflow (logout happened meanwhile).
    Discarded,
}

#[derive(Debug, Clone, Copy)]
struct CopyNotice {
    status: CopyStatus,
    at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagedFileView {
    pub name: String,
    pub content_type: String,
    pub size: usize,
}

/// Serializable view handed to the UI after every operation.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub status: WorkflowStatus,
    pub staged: Vec<StagedFileView>,
    pub in_flight: Vec<String>,
    pub results: Vec<UploadResult>,
    pub error: Option<String>,
    pub copy_status: Option<CopyStatus>,
    pub copy_message: Option<&'static str>,
    pub drag_active: bool,
    pub can_upload: bool,
    pub max_images: usize,
}

#[derive(Debug)]
pub struct UploadWorkflow {
    settings: WorkflowSettings,
    status: WorkflowStatus,
    staged: Vec<PendingFile>,
    in_flight: Vec<String>,
    results: Vec<UploadResult>,
    error: Option<WorkflowError>,
    copy_notice: Option<CopyNotice>,
    drag_active: bool,
    last_batch_id: u64,
}

impl UploadWorkflow {
    pub fn new(settings: WorkflowSettings) -> Self {
        Self {
            settings,
            status: WorkflowStatus::Idle,
            staged: Vec::new(),
            in_flight: Vec::new(),
            results: Vec::new(),
            error: None,
            copy_notice: None,
            drag_active: false,
            last_batch_id: 0,
        }
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn staged(&self) -> &[PendingFile] {
        &self.staged
    }

    pub fn results(&self) -> &[UploadResult] {
        &self.results
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.error.as_ref()
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn can_upload(&self) -> bool {
        self.status != WorkflowStatus::Uploading && !self.staged.is_empty()
    }

    /// Replaces the staged selection with the image files among `candidates`.
    ///
    /// A rejected selection leaves whatever was staged before untouched.
    pub fn select_files(
        &mut self,
        candidates: Vec<RawFile>,
    ) -> Result<&[PendingFile], WorkflowError> {
        self.stage(candidates, SelectionSource::Picker)
    }

    pub fn drop_files(&mut self, candidates: Vec<RawFile>) -> Result<&[PendingFile], WorkflowError> {
        self.drag_active = false;
        self.stage(candidates, SelectionSource::Drop)
    }

    pub fn drag_enter(&mut self) {
        self.drag_active = true;
    }

    pub fn drag_over(&mut self) {
        self.drag_active = true;
    }

    pub fn drag_leave(&mut self) {
        self.drag_active = false;
    }

    fn stage(
        &mut self,
        candidates: Vec<RawFile>,
        origin: SelectionSource,
    ) -> Result<&[PendingFile], WorkflowError> {
        if self.status == WorkflowStatus::Uploading {
            return Err(self.record(WorkflowError::UploadInProgress));
        }

        match selection::validate(candidates, origin, self.settings.max_images) {
            Ok(files) => {
                debug!(count = files.len(), ?origin, "staged images");
                self.staged = files;
                self.status = WorkflowStatus::Selecting;
                self.error = None;
                self.copy_notice = None;
                Ok(&self.staged)
            }
            Err(err) => Err(self.record(err)),
        }
    }

    /// Takes the staged files out as a batch and enters `Uploading`.
    ///
    /// Returns `Ok(None)` when a batch is already in flight.
    pub fn begin_upload(&mut self) -> Result<Option<UploadBatch>, WorkflowError> {
        if self.status == WorkflowStatus::Uploading {
            return Ok(None);
        }
        if self.staged.is_empty() {
            return Err(self.record(WorkflowError::NothingSelected));
        }

        self.last_batch_id += 1;
        let files = std::mem::take(&mut self.staged);
        self.in_flight = files.iter().map(|file| file.name().to_string()).collect();
        self.status = WorkflowStatus::Uploading;
        self.error = None;
        self.copy_notice = None;

        Ok(Some(UploadBatch::new(self.last_batch_id, files)))
    }

    /// Publishes the outcome of the batch started by [`Self::begin_upload`].
    ///
    /// A failed batch publishes nothing: earlier results stay as they were.
    pub fn finish_upload(
        &mut self,
        batch_id: u64,
        outcome: Result<Vec<UploadResult>, TransferFailure>,
    ) -> Completion {
        if self.status != WorkflowStatus::Uploading || batch_id != self.last_batch_id {
            debug!(batch_id, "discarding completion of a stale batch");
            return Completion::Discarded;
        }

        self.in_flight.clear();
        match outcome {
            Ok(results) => {
                let published = results.len();
                self.results = results;
                self.status = WorkflowStatus::Done;
                Completion::Published(published)
            }
            Err(failure) => {
                warn!(
                    index = failure.index,
                    file = %failure.file_name,
                    cause = %failure.cause,
                    "batch aborted"
                );
                self.error = Some(WorkflowError::TransferFailed);
                self.status = WorkflowStatus::Failed;
                Completion::Failed
            }
        }
    }

    pub fn copy_result_url(
        &mut self,
        url: &str,
        clipboard: &dyn Clipboard,
    ) -> Result<(), ClipboardError> {
        self.copy_result_url_at(url, clipboard, Utc::now())
    }

    pub fn copy_result_url_at(
        &mut self,
        url: &str,
        clipboard: &dyn Clipboard,
        now: DateTime<Utc>,
    ) -> Result<(), ClipboardError> {
        let result = clipboard.write_text(url);
        let status = match &result {
            Ok(()) => CopyStatus::Copied,
            Err(err) => {
                warn!(%err, "failed to copy url to clipboard");
                CopyStatus::Failed
            }
        };
        self.copy_notice = Some(CopyNotice { status, at: now });
        result
    }

    /// `Copied` fades after the configured TTL; `Failed` stays until the next event.
    pub fn copy_status_at(&self, now: DateTime<Utc>) -> Option<CopyStatus> {
        let notice = self.copy_notice?;
        match notice.status {
            CopyStatus::Copied if now - notice.at >= self.settings.copy_status_ttl => None,
            status => Some(status),
        }
    }

    /// Drops the staged selection. Published results are kept.
    pub fn reset(&mut self) {
        self.staged = Vec::new();
        self.drag_active = false;
        if self.status == WorkflowStatus::Selecting {
            self.status = WorkflowStatus::Idle;
        }
    }

    /// Back to a pristine workflow; used on logout.
    pub fn clear(&mut self) {
        let last_batch_id = self.last_batch_id;
        *self = Self::new(self.settings.clone());
        self.last_batch_id = last_batch_id;
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.snapshot_at(Utc::now())
    }

    pub fn snapshot_at(&self, now: DateTime<Utc>) -> WorkflowSnapshot {
        let copy_status = self.copy_status_at(now);
        WorkflowSnapshot {
            status: self.status,
            staged: self
                .staged()
                .iter()
                .map(|file| StagedFileView {
                    name: file.name().to_string(),
                    content_type: file.mime_type().to_string(),
                    size: file.size(),
                })
                .collect(),
            in_flight: self.in_flight.clone(),
            results: self.results.clone(),
            error: self.error().map(ToString::to_string),
            copy_status,
            copy_message: copy_status.map(|status| status.message()),
            drag_active: self.drag_active(),
            can_upload: self.can_upload(),
            max_images: self.settings.max_images,
        }
    }

    fn record(&mut self, err: WorkflowError) -> WorkflowError {
        self.error = Some(err.clone());
        err
    }
}
