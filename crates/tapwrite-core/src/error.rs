//! Error types for document steps and image uploads.

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while building or applying a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    /// Position lies outside the document.
    #[error("position {pos} is outside the document (size {size})")]
    OutOfRange { pos: usize, size: usize },

    /// The step would produce a malformed document.
    #[error("invalid document at position {pos}: {reason}")]
    Invalid { pos: usize, reason: &'static str },

    /// Expected an image node at this position.
    #[error("no image at position {0}")]
    NotAnImage(usize),

    /// Expected a position inside a textblock.
    #[error("position {0} is not inside a textblock")]
    NotInTextblock(usize),

    /// The transaction was built against an older editor state.
    #[error("transaction was built against a stale editor state")]
    Stale,
}

/// Errors that end an image upload without inserting anything.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UploadError {
    /// No upload function was configured for this editor.
    #[error("no upload function is configured")]
    NoUploader,

    /// The upload function resolved without a URL.
    #[error("upload finished without a URL")]
    NoUrl,

    /// The upload function rejected.
    #[error("upload rejected: {0}")]
    Rejected(SmolStr),

    /// The uploaded image could not be loaded before insertion.
    #[error("uploaded image failed to load: {0}")]
    Preload(SmolStr),

    /// Building the placeholder or commit transaction failed.
    #[error(transparent)]
    Step(#[from] StepError),
}
