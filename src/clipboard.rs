use thiserror::Error;

/// Failure to place text on the clipboard. Always recoverable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("clipboard unavailable: {reason}")]
pub struct ClipboardError {
    reason: String,
}

impl ClipboardError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard of the machine running the server.
///
/// A fresh handle is opened per call; headless hosts simply report an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|err| ClipboardError::new(err.to_string()))?;
        clipboard
            .set_text(text.to_owned())
            .map_err(|err| ClipboardError::new(err.to_string()))
    }
}
