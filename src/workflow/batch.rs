use thiserror::Error;
use tracing::debug;

use super::{PendingFile, UploadResult};
use crate::store::{ImageStore, TransferError};

/// Files taken out of the staged selection for one upload run.
#[derive(Debug)]
pub struct UploadBatch {
    id: u64,
    files: Vec<PendingFile>,
}

impl UploadBatch {
    pub(super) fn new(id: u64, files: Vec<PendingFile>) -> Self {
        Self { id, files }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

#[derive(Debug, Error)]
#[error("transfer of `{file_name}` (#{index}) failed")]
pub struct TransferFailure {
    pub index: usize,
    pub file_name: String,
    #[source]
    pub cause: TransferError,
}

/// Sends the batch one file at a time, in selection order.
///
/// The first failure ends the run; nothing collected before it is returned.
pub async fn run_batch(
    store: &dyn ImageStore,
    batch: &UploadBatch,
) -> Result<Vec<UploadResult>, TransferFailure> {
    let mut results = Vec::with_capacity(batch.file_count());

    for (index, file) in batch.files().iter().enumerate() {
        debug!(batch = batch.id(), index, file = file.name(), "uploading image");
        let url = store
            .store(file)
            .await
            .map_err(|cause| TransferFailure {
                index,
                file_name: file.name().to_string(),
                cause,
            })?;

        results.push(UploadResult {
            source_index: index,
            source_name: file.name().to_string(),
            url,
        });
    }

    Ok(results)
}
