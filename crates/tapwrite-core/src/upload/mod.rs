//! Image upload orchestration.
//!
//! An upload runs in three synchronous phases around one suspension point:
//!
//! 1. [`begin_upload`] reserves space (for picker and drop uploads) and
//!    registers a placeholder, in a single transaction.
//! 2. The host uploader runs; the user keeps editing meanwhile and every
//!    transaction remaps the placeholder.
//! 3. [`commit_upload`] looks the placeholder up again and swaps in the
//!    image, or [`abort_upload`] just removes the placeholder.
//!
//! There is no explicit cancellation. If the placeholder's anchor was
//! deleted while the upload ran, the commit finds nothing and the result is
//! discarded.

use std::cell::RefCell;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::decoration::{PlaceholderAction, PlaceholderId};
use crate::error::{StepError, UploadError};
use crate::image::ImageAttrs;
use crate::model::{BlockKind, Token, empty_paragraph};
use crate::platform::{ImageFile, ImagePlatform};
use crate::session::EditorSession;
use crate::state::{EditorState, Transaction};
use crate::types::{Affinity, Selection};


/// How the upload was started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadMode {
    /// File picker command.
    Picker,
    /// Files dropped onto the editor.
    Drop,
    /// Image pasted from the clipboard.
    Paste,
}

impl UploadMode {
    /// Whether the upload reserves an empty paragraph up front.
    pub fn reserves_block(self) -> bool {
        !matches!(self, UploadMode::Paste)
    }
}

/// Bookkeeping for an upload between begin and commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingUpload {
    pub id: PlaceholderId,
    pub preview: SmolStr,
    pub mode: UploadMode,
}

/// How an upload ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The image was inserted at `pos`.
    Committed { pos: usize },
    /// The upload finished but its placeholder was gone.
    Discarded,
    Failed(UploadError),
    /// Nothing was uploaded (picker cancelled, editor readonly, bad selection).
    Skipped,
}

/// The editor surface an upload dispatches into.
pub trait EditorView {
    type Platform: ImagePlatform;

    fn state(&self) -> &EditorState;

    /// Apply a transaction to the live state.
    fn dispatch(&mut self, tr: Transaction);

    fn session(&self) -> &EditorSession<Self::Platform>;

    fn is_editable(&self) -> bool {
        true
    }
}

/// Build the transaction that starts an upload.
///
/// Deletes a non-empty selection, reserves an empty paragraph for picker and
/// drop uploads, and registers the placeholder. Paste uploads anchor the
/// placeholder at the cursor instead.
pub fn begin_upload(
    state: &EditorState,
    preview: SmolStr,
    mode: UploadMode,
) -> Result<(Transaction, PendingUpload), StepError> {
    let id = PlaceholderId::next();
    let mut tr = state.tr();
    tr.delete_selection()?;
    let from = tr.selection().from();

    let anchor = if mode.reserves_block() {
        let at = tr.insert_block(from, empty_paragraph())?;
        let after = Selection::near(tr.doc(), at + 2, Affinity::After);
        tr.set_selection(after);
        at
    } else {
        from
    };

    tr.set_placeholder(PlaceholderAction::Add {
        id,
        pos: anchor,
        preview: preview.clone(),
    });
    Ok((tr, PendingUpload { id, preview, mode }))
}

/// Build the transaction that inserts the uploaded image.
///
/// Returns `None` when the placeholder no longer exists. Otherwise returns
/// the transaction and the image position. A reserved paragraph that is
/// still empty becomes the image plus a fresh empty paragraph; anything else
/// gets the image inserted at the placeholder.
pub fn commit_upload(
    state: &EditorState,
    pending: &PendingUpload,
    url: &str,
) -> Result<Option<(Transaction, usize)>, StepError> {
    let Some(pos) = state.placeholders().find(pending.id) else {
        return Ok(None);
    };
    let attrs = ImageAttrs::new(url);
    let mut tr = state.tr();

    let reserved_empty = pending.mode.reserves_block()
        && state
            .doc()
            .block_at(pos)
            .is_some_and(|b| b.kind == BlockKind::Paragraph && b.is_empty());

    let image_pos = if reserved_empty {
        let (tokens, image_pos) = if state.doc().schema().inline_images {
            (
                vec![
                    Token::Open(BlockKind::Paragraph),
                    Token::Image(attrs),
                    Token::Close,
                    Token::Open(BlockKind::Paragraph),
                    Token::Close,
                ],
                pos + 1,
            )
        } else {
            let mut tokens = vec![Token::Image(attrs)];
            tokens.extend(empty_paragraph());
            (tokens, pos)
        };
        tr.replace_with(pos, pos + 2, tokens)?;
        image_pos
    } else {
        tr.insert_image(pos, attrs)?
    };

    tr.set_placeholder(PlaceholderAction::Remove { id: pending.id });
    Ok(Some((tr, image_pos)))
}

/// Transaction that only removes the placeholder.
pub fn abort_upload(state: &EditorState, pending: &PendingUpload) -> Transaction {
    let mut tr = state.tr();
    tr.set_placeholder(PlaceholderAction::Remove { id: pending.id });
    tr
}

/// Run one upload end to end against a live view.
///
/// Never holds a borrow of `view` across an await, so the user can keep
/// editing while the upload runs.
pub async fn upload_image<V>(
    view: Rc<RefCell<V>>,
    file: <V::Platform as ImagePlatform>::File,
    mode: UploadMode,
) -> UploadOutcome
where
    V: EditorView + 'static,
{
    let (uploader, platform) = {
        let view = view.borrow();
        let session = view.session();
        match session.uploader() {
            Some(uploader) => (uploader, session.platform()),
            None => {
                tracing::warn!(target: "tapwrite::upload", "no upload function configured, ignoring image");
                return UploadOutcome::Failed(UploadError::NoUploader);
            }
        }
    };

    let preview = platform.create_preview(&file).unwrap_or_else(|e| {
        tracing::warn!(target: "tapwrite::upload", error = %e, file = file.name(), "could not create preview");
        SmolStr::default()
    });

    let pending = {
        let mut view = view.borrow_mut();
        match begin_upload(view.state(), preview.clone(), mode) {
            Ok((tr, pending)) => {
                view.dispatch(tr);
                pending
            }
            Err(e) => {
                tracing::warn!(target: "tapwrite::upload", error = %e, "could not reserve upload placeholder");
                platform.release_preview(&preview);
                return UploadOutcome::Failed(e.into());
            }
        }
    };
    tracing::debug!(target: "tapwrite::upload", id = %pending.id, ?mode, file = file.name(), "upload started");

    let result = match uploader.upload(&file).await {
        Ok(Some(url)) => match platform.preload(&url).await {
            Ok(()) => Ok(url),
            Err(e) => Err(UploadError::Preload(e.0.into())),
        },
        Ok(None) => Err(UploadError::NoUrl),
        Err(e) => Err(e),
    };

    let outcome = {
        let mut view = view.borrow_mut();
        let committed = result
            .and_then(|url| commit_upload(view.state(), &pending, &url).map_err(UploadError::from));
        match committed {
            Ok(Some((tr, pos))) => {
                view.dispatch(tr);
                tracing::debug!(target: "tapwrite::upload", id = %pending.id, pos, "upload committed");
                UploadOutcome::Committed { pos }
            }
            Ok(None) => {
                tracing::debug!(target: "tapwrite::upload", id = %pending.id, "placeholder gone, discarding upload");
                UploadOutcome::Discarded
            }
            Err(e) => {
                tracing::warn!(target: "tapwrite::upload", id = %pending.id, error = %e, "image upload failed");
                let tr = abort_upload(view.state(), &pending);
                view.dispatch(tr);
                UploadOutcome::Failed(e)
            }
        }
    };

    platform.release_preview(&pending.preview);
    outcome
}

/// The file picker command: ask for an image and upload it at the selection.
pub async fn add_image<V>(view: Rc<RefCell<V>>) -> UploadOutcome
where
    V: EditorView + 'static,
{
    let platform = {
        let view = view.borrow();
        if !view.is_editable() {
            return UploadOutcome::Skipped;
        }
        view.session().platform()
    };

    let Some(file) = platform.pick_image().await else {
        tracing::debug!(target: "tapwrite::upload", "file picker closed without a file");
        return UploadOutcome::Skipped;
    };

    let in_text = {
        let view = view.borrow();
        let state = view.state();
        state.doc().is_text_position(state.selection().from())
    };
    if !in_text {
        tracing::debug!(target: "tapwrite::upload", "selection is not inside inline content");
        return UploadOutcome::Skipped;
    }

    upload_image(view, file, UploadMode::Picker).await
}
