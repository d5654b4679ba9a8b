mod cloudinary;

pub use cloudinary::CloudinaryClient;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use thiserror::Error;

use crate::workflow::PendingFile;

/// Remote image storage that hands back a public URL per stored file.
pub trait ImageStore: Send + Sync {
    fn store<'a>(&'a self, file: &'a PendingFile) -> BoxFuture<'a, Result<String, TransferError>>;
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request to upload endpoint failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("upload endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected upload response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
pub mod testing {
    use std::{collections::VecDeque, sync::Mutex, time::Duration};

    use futures::FutureExt;

    use super::*;

    #[derive(Debug, Clone)]
    pub enum ScriptStep {
        Url(String),
        Status(StatusCode),
    }

    /// Replays a fixed list of outcomes and remembers which files it saw.
    #[derive(Debug, Default)]
    pub struct ScriptedStore {
        steps: Mutex<VecDeque<ScriptStep>>,
        calls: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl ScriptedStore {
        pub fn new(steps: Vec<ScriptStep>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        /// Every transfer takes `delay` before its scripted outcome.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn succeeding(urls: &[&str]) -> Self {
            Self::new(
                urls.iter()
                    .map(|url| ScriptStep::Url(url.to_string()))
                    .collect(),
            )
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ImageStore for ScriptedStore {
        fn store<'a>(
            &'a self,
            file: &'a PendingFile,
        ) -> BoxFuture<'a, Result<String, TransferError>> {
            self.calls.lock().unwrap().push(file.name().to_string());
            let step = self.steps.lock().unwrap().pop_front();
            let delay = self.delay;
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                match step {
                    Some(ScriptStep::Url(url)) => Ok(url),
                    Some(ScriptStep::Status(status)) => Err(TransferError::Status {
                        status,
                        body: "scripted failure".to_string(),
                    }),
                    None => Err(TransferError::MalformedResponse(
                        "script exhausted".to_string(),
                    )),
                }
            }
            .boxed()
        }
    }
}
