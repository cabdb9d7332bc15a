// ============================================================================
// ERRORS - every failure the editor can report to the user
// ============================================================================

use thiserror::Error;

/// Failures surfaced by editor operations. The `Display` text is what the
/// user sees in the error dialog (or on stderr in CLI mode).
#[derive(Debug, Error)]
pub enum StackerError {
    #[error("No image has been loaded yet")]
    NoImageLoaded,
    #[error("No region has been selected yet")]
    NoSelection,
    #[error("The selected region is empty")]
    EmptySelection,
    #[error("The clipboard does not contain an image")]
    ClipboardEmpty,
    #[error("Choose a save folder first")]
    SaveDirUnset,
    #[error("Clipboard error: {0}")]
    Clipboard(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StackerError {
    /// True when the user can fix the failure by doing something first
    /// (load an image, draw a selection, copy an image, pick a folder).
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            StackerError::NoImageLoaded
                | StackerError::NoSelection
                | StackerError::EmptySelection
                | StackerError::ClipboardEmpty
                | StackerError::SaveDirUnset
        )
    }
}

impl From<arboard::Error> for StackerError {
    fn from(e: arboard::Error) -> Self {
        StackerError::Clipboard(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StackerError>;
