//! tapwrite-core: framework-free editor logic for Tapwrite.
//!
//! This crate provides:
//! - `Document` - flat token document with position arithmetic
//! - `Transaction` / `EditorState` - steps, mapping, selection and history
//! - The `uploadImage` node, its input rule and delete command
//! - The image upload pipeline, tracked by placeholder decorations
//! - HTML serialization, lenient parsing and view rendering
//! - `Editor` - configuration and host callbacks on top of all of the above

pub mod capability;
pub mod decoration;
pub mod editor;
pub mod error;
pub mod history;
pub mod html;
pub mod image;
pub mod model;
pub mod platform;
pub mod render;
pub mod resize;
pub mod session;
pub mod state;
pub mod transfer;
pub mod transform;
pub mod types;
pub mod upload;

#[cfg(test)]
mod testing;

pub use capability::{ImageDeleter, ImageUploader, UploadFuture};
pub use decoration::{Placeholder, PlaceholderAction, PlaceholderId, PlaceholderSet, find_placeholder};
pub use editor::{DEFAULT_PLACEHOLDER, Editor, EditorConfig, EditorKey, KeydownResult};
pub use error::{StepError, UploadError};
pub use history::{History, HistoryOp};
pub use html::{contains_image, parse_html, to_html};
pub use image::{
    Dimension, IMAGE_NODE_NAME, ImageAttrs, ImageOptions, delete_current_node, image_input_rule,
    match_image_rule,
};
pub use model::{BlockKind, BlockSpan, Document, Mark, Schema, Token};
pub use platform::{ImageFile, ImagePlatform, PlatformError, PlatformFuture};
pub use render::{RenderContext, render_view};
pub use resize::{
    MIN_IMAGE_SIZE, Point, ResizeController, ResizeSide, ResizeState, Size, compute_size,
    resize_transaction,
};
pub use session::EditorSession;
pub use smol_str::SmolStr;
pub use state::{EditorState, Transaction};
pub use transfer::{DataTransfer, TransferItem, TransferOutcome, classify_drop, classify_paste};
pub use transform::{MapResult, Mapping, Step, StepMap};
pub use types::{Affinity, Selection, SelectionKind};
pub use upload::{
    EditorView, PendingUpload, UploadMode, UploadOutcome, add_image, abort_upload, begin_upload,
    commit_upload, upload_image,
};
