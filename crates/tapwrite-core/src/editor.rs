//! Editor composition: configuration, host callbacks and the user-facing
//! commands that tie the state, image node and upload pipeline together.
//!
//! An [`Editor`] owns one [`EditorState`] and one [`EditorSession`]. Hosts
//! drive it with commands and read back HTML; uploads run against it through
//! its [`EditorView`] impl.

use serde::Deserialize;

use crate::decoration::PlaceholderSet;
use crate::html::{parse_html, to_html};
use crate::image::{ImageOptions, delete_current_node, image_input_rule};
use crate::model::{BlockKind, BlockRef, Token};
use crate::platform::ImagePlatform;
use crate::render::{RenderContext, render_view};
use crate::resize::{Point, ResizeController, ResizeSide, Size, resize_transaction};
use crate::session::EditorSession;
use crate::state::{EditorState, TYPING_GROUP, Transaction};
use crate::transfer::{DataTransfer, TransferOutcome, classify_drop, classify_paste};
use crate::types::Selection;
use crate::upload::EditorView;

/// Placeholder text for empty blocks when none is configured.
pub const DEFAULT_PLACEHOLDER: &str = r#"Type "/" for commands"#;

/// Class added to the editing surface for single-line text inputs.
pub const TEXT_INPUT_CLASS: &str = "tapwrite-text-input";

/// Host-facing editor options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Initial HTML content.
    pub content: String,
    pub readonly: bool,
    pub placeholder: Option<String>,
    /// Style the surface as a compact text input.
    pub is_text_input: bool,
    /// Block pasting and dropping images.
    pub disable_paste_and_dnd: bool,
    /// Classes for the editing surface.
    pub editor_class: Option<String>,
    /// Classes for the wrapping element.
    pub class_name: Option<String>,
}

/// Keys the editor handles itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorKey {
    Enter,
    ShiftEnter,
    Backspace,
    Undo,
    Redo,
}

/// Result of handling a keydown event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeydownResult {
    /// The editor handled it; the host event should be prevented.
    Handled,
    /// Let the host do its default thing.
    PassThrough,
}

pub struct Editor<P: ImagePlatform> {
    state: EditorState,
    session: EditorSession<P>,
    config: EditorConfig,
    image_options: ImageOptions,
    resize: ResizeController,
    on_content: Option<Box<dyn FnMut(&str)>>,
    on_focus: Option<Box<dyn FnMut()>>,
}

impl<P: ImagePlatform> Editor<P> {
    pub fn new(config: EditorConfig, image_options: ImageOptions, session: EditorSession<P>) -> Self {
        let doc = parse_html(&config.content, image_options.schema());
        Self {
            state: EditorState::new(doc),
            session,
            config,
            image_options,
            resize: ResizeController::new(),
            on_content: None,
            on_focus: None,
        }
    }

    /// Called with the document HTML after every doc-changing transaction.
    pub fn on_content(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_content = Some(Box::new(callback));
    }

    pub fn on_focus(&mut self, callback: impl FnMut() + 'static) {
        self.on_focus = Some(Box::new(callback));
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn image_options(&self) -> &ImageOptions {
        &self.image_options
    }

    pub fn session(&self) -> &EditorSession<P> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession<P> {
        &mut self.session
    }

    pub fn placeholders(&self) -> &PlaceholderSet {
        self.state.placeholders()
    }

    pub fn get_html(&self) -> String {
        to_html(self.state.doc(), &self.image_options)
    }

    /// Replace the content without notifying the host. Clears undo history
    /// and drops pending upload placeholders.
    pub fn set_content(&mut self, html: &str) {
        let doc = parse_html(html, self.image_options.schema());
        self.state = self.state.reset(doc);
        self.resize.pointer_up();
        tracing::debug!(target: "tapwrite::editor", version = self.state.version(), "content replaced");
    }

    /// Load host content if it differs from what the editor holds.
    /// Returns whether anything was loaded.
    pub fn sync_content(&mut self, html: &str) -> bool {
        let incoming = parse_html(html, self.image_options.schema());
        if to_html(&incoming, &self.image_options) == self.get_html() {
            return false;
        }
        self.state = self.state.reset(incoming);
        self.resize.pointer_up();
        tracing::debug!(target: "tapwrite::editor", version = self.state.version(), "content synced from host");
        true
    }

    /// Apply a transaction. Returns whether it was applied.
    pub fn dispatch(&mut self, tr: Transaction) -> bool {
        let changed = tr.doc_changed();
        let mapping = (changed && self.resize.is_dragging()).then(|| tr.mapping().clone());
        match self.state.apply(tr) {
            Ok(next) => self.state = next,
            Err(e) => {
                tracing::warn!(target: "tapwrite::editor", error = %e, "transaction rejected");
                return false;
            }
        }
        if let Some(mapping) = mapping {
            self.resize.map_through(&mapping);
        }
        if changed {
            let html = self.get_html();
            if let Some(callback) = self.on_content.as_mut() {
                callback(&html);
            }
        }
        true
    }

    pub fn is_editable(&self) -> bool {
        !self.config.readonly
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.config.readonly = readonly;
        if readonly {
            self.resize.pointer_up();
        }
    }

    pub fn focus(&mut self) {
        if let Some(callback) = self.on_focus.as_mut() {
            callback();
        }
    }

    /// Move the selection, snapping it to a valid position.
    pub fn set_selection(&mut self, selection: Selection) {
        self.state = self.state.clone().with_selection(selection);
    }

    /// Type text at the selection, then run the image input rule.
    pub fn insert_text(&mut self, text: &str) -> bool {
        if !self.is_editable() {
            return false;
        }
        let mut tr = self.state.tr();
        let typed = tr.delete_selection().and_then(|tr| {
            let pos = tr.selection().from();
            tr.insert_text(pos, text)
        });
        if let Err(e) = typed {
            tracing::warn!(target: "tapwrite::editor", error = %e, "could not insert text");
            return false;
        }
        tr.set_history_group(TYPING_GROUP);
        if !self.dispatch(tr) {
            return false;
        }
        if let Some(rule) = image_input_rule(&self.state) {
            self.dispatch(rule);
        }
        true
    }

    /// Insert pasted HTML at the selection. A single paragraph is inserted
    /// inline; anything else goes in as blocks.
    pub fn insert_html(&mut self, html: &str) -> bool {
        if !self.is_editable() {
            return false;
        }
        let fragment = parse_html(html, self.image_options.schema());
        let mut blocks = fragment.blocks();
        let inline = match (blocks.next(), blocks.next()) {
            (Some(BlockRef::Text { span, content }), None) if span.kind == BlockKind::Paragraph => {
                Some(content.to_vec())
            }
            _ => None,
        };

        let mut tr = self.state.tr();
        let inserted = tr.delete_selection().and_then(|tr| {
            let pos = tr.selection().from();
            match inline {
                Some(content) => tr.insert(pos, content).map(|_| ()),
                None => tr.insert_block(pos, fragment.tokens().to_vec()).map(|_| ()),
            }
        });
        if let Err(e) = inserted {
            tracing::warn!(target: "tapwrite::editor", error = %e, "could not insert pasted content");
            return false;
        }
        self.dispatch(tr)
    }

    /// Backspace: delete the selection or the character before the cursor.
    /// At the start of a textblock, join it with the previous textblock or
    /// select the image before it.
    pub fn delete_backward(&mut self) -> bool {
        if !self.is_editable() {
            return false;
        }
        let sel = self.state.selection();
        let mut tr = self.state.tr();
        if !sel.is_empty() {
            if let Err(e) = tr.delete_selection() {
                tracing::warn!(target: "tapwrite::editor", error = %e, "could not delete selection");
                return false;
            }
            return self.dispatch(tr);
        }

        let pos = sel.head;
        let Some(span) = self.state.doc().block_around(pos) else {
            return false;
        };
        let result = if pos > span.content_start {
            tr.delete(pos - 1, pos)
        } else if span.start == 0 {
            return false;
        } else {
            match self.state.doc().token_at(span.start - 1) {
                Some(Token::Close) => tr.delete(span.start - 1, span.start + 1),
                Some(Token::Image(_)) => {
                    self.set_selection(Selection::node(span.start - 1));
                    return true;
                }
                _ => return false,
            }
        };
        if let Err(e) = result {
            tracing::warn!(target: "tapwrite::editor", error = %e, pos, "could not delete backward");
            return false;
        }
        tr.set_history_group(TYPING_GROUP);
        self.dispatch(tr)
    }

    pub fn handle_key(&mut self, key: EditorKey) -> KeydownResult {
        if !self.is_editable() {
            return KeydownResult::PassThrough;
        }
        let handled = match key {
            // Block splitting is left to the command menu.
            EditorKey::Enter => true,
            EditorKey::ShiftEnter => self.insert_text("\n"),
            EditorKey::Backspace => self.delete_backward(),
            EditorKey::Undo => self.undo(),
            EditorKey::Redo => self.redo(),
        };
        if handled || key == EditorKey::Enter {
            KeydownResult::Handled
        } else {
            KeydownResult::PassThrough
        }
    }

    pub fn undo(&mut self) -> bool {
        if !self.is_editable() {
            return false;
        }
        match self.state.undo() {
            Some(tr) => self.dispatch(tr),
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if !self.is_editable() {
            return false;
        }
        match self.state.redo() {
            Some(tr) => self.dispatch(tr),
            None => false,
        }
    }

    /// Delete the image at the selection and tell the host to delete its
    /// file. Returns whether an image was deleted.
    pub fn delete_current_node(&mut self) -> bool {
        if !self.is_editable() {
            return false;
        }
        let Some((tr, src)) = delete_current_node(&self.state) else {
            return false;
        };
        if !self.dispatch(tr) {
            return false;
        }
        match (src, self.session.deleter()) {
            (Some(src), Some(deleter)) => {
                tracing::debug!(target: "tapwrite::editor", %src, "deleting image attachment");
                deleter.delete_image(&src);
            }
            (Some(_), None) => {
                tracing::debug!(target: "tapwrite::editor", "no delete function configured");
            }
            (None, _) => {}
        }
        true
    }

    fn uploads_disabled(&self) -> bool {
        self.config.disable_paste_and_dnd || self.image_options.disable_paste
    }

    /// Decide what a paste does. An `Upload` outcome is for the caller to
    /// run with [`crate::upload::upload_image`].
    pub fn handle_paste(&self, transfer: &DataTransfer<P::File>) -> TransferOutcome<P::File> {
        if !self.is_editable() {
            return TransferOutcome::Swallow;
        }
        classify_paste(transfer, self.uploads_disabled())
    }

    /// Decide what a drop does. Image drops upload at the cursor, so a
    /// range selection is collapsed first instead of being replaced.
    pub fn handle_drop(&mut self, transfer: &DataTransfer<P::File>) -> TransferOutcome<P::File> {
        if !self.is_editable() {
            return TransferOutcome::Swallow;
        }
        let outcome = classify_drop(transfer, self.uploads_disabled());
        if matches!(outcome, TransferOutcome::Upload { .. }) {
            let head = self.state.selection().head;
            self.set_selection(Selection::collapsed(head));
        }
        outcome
    }

    /// Placeholder text shown in an empty block of `kind`.
    pub fn placeholder_text(&self, kind: &BlockKind) -> Option<String> {
        match kind {
            BlockKind::Heading { level } if *level <= 3 => Some(format!("Heading {level}")),
            BlockKind::Heading { .. } => None,
            _ => Some(
                self.config
                    .placeholder
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string()),
            ),
        }
    }

    /// Whether the formatting bubble menu should show.
    pub fn bubble_menu_open(&self) -> bool {
        let sel = self.state.selection();
        self.is_editable()
            && !sel.is_node()
            && !sel.is_empty()
            && !self.state.doc().text_between(sel.from(), sel.to()).trim().is_empty()
    }

    /// Classes for the editing surface.
    pub fn editor_class(&self) -> String {
        let mut classes: Vec<&str> = self.config.editor_class.as_deref().into_iter().collect();
        if self.config.is_text_input {
            classes.push(TEXT_INPUT_CLASS);
        }
        classes.join(" ")
    }

    /// Classes for the wrapping element.
    pub fn wrapper_class(&self) -> &str {
        self.config.class_name.as_deref().unwrap_or_default()
    }

    /// HTML for the editing surface.
    pub fn render_view(&self) -> String {
        let placeholder = |kind: &BlockKind| self.placeholder_text(kind);
        render_view(
            &self.state,
            &RenderContext {
                image_options: &self.image_options,
                placeholder: &placeholder,
                editable: self.is_editable(),
            },
        )
    }

    /// Start dragging a resize handle of the image at `pos`.
    pub fn begin_resize(&mut self, side: ResizeSide, pos: usize, pointer: Point, rendered: Size) -> bool {
        if !self.is_editable() || self.state.doc().image_at(pos).is_none() {
            return false;
        }
        self.resize.pointer_down(side, pos, pointer, rendered)
    }

    /// Resize to follow the pointer. Ends the drag if the image is gone.
    pub fn resize_to(&mut self, pointer: Point) -> bool {
        let Some((pos, size)) = self.resize.pointer_move(pointer) else {
            return false;
        };
        match resize_transaction(&self.state, pos, size) {
            Ok(tr) => self.dispatch(tr),
            Err(e) => {
                tracing::debug!(target: "tapwrite::editor", error = %e, pos, "resize target gone, ending drag");
                self.resize.pointer_up();
                false
            }
        }
    }

    pub fn end_resize(&mut self) -> bool {
        self.resize.pointer_up()
    }

    pub fn is_resizing(&self) -> bool {
        self.resize.is_dragging()
    }
}

impl<P: ImagePlatform> EditorView for Editor<P> {
    type Platform = P;

    fn state(&self) -> &EditorState {
        &self.state
    }

    fn dispatch(&mut self, tr: Transaction) {
        Editor::dispatch(self, tr);
    }

    fn session(&self) -> &EditorSession<P> {
        &self.session
    }

    fn is_editable(&self) -> bool {
        Editor::is_editable(self)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use futures_util::future::join;

    use super::*;
    use crate::image::Dimension;
    use crate::testing::{ManualUploads, MemFile, MemPlatform, image_srcs};
    use crate::upload::{UploadMode, UploadOutcome, begin_upload, commit_upload, upload_image};

    type Seen = Rc<RefCell<Vec<String>>>;

    fn editor_with(content: &str) -> (Editor<MemPlatform>, Seen) {
        let config = EditorConfig {
            content: content.to_string(),
            ..Default::default()
        };
        editor_from(config)
    }

    fn editor_from(config: EditorConfig) -> (Editor<MemPlatform>, Seen) {
        let mut editor = Editor::new(config, ImageOptions::default(), EditorSession::new(MemPlatform::default()));
        let seen = Seen::default();
        let sink = seen.clone();
        editor.on_content(move |html| sink.borrow_mut().push(html.to_string()));
        (editor, seen)
    }

    #[test]
    fn loads_configured_content() {
        let (editor, _) = editor_with("<p>hello</p><p>world</p>");
        assert_eq!(editor.get_html(), "<p>hello</p><p>world</p>");

        let (empty, _) = editor_with("");
        assert_eq!(empty.get_html(), "<p></p>");
    }

    #[test]
    fn content_callback_fires_on_doc_changes_only() {
        let (mut editor, seen) = editor_with("<p>ab</p>");
        editor.set_selection(Selection::collapsed(3));
        assert!(editor.insert_text("c"));
        assert_eq!(seen.borrow().as_slice(), ["<p>abc</p>"]);

        editor.set_selection(Selection::collapsed(1));
        editor.set_content("<p>new</p>");
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(editor.get_html(), "<p>new</p>");
        assert!(!editor.state().history().can_undo());
    }

    #[test]
    fn sync_content_only_loads_differences() {
        let (mut editor, _) = editor_with("<p>ab</p>");
        editor.set_selection(Selection::collapsed(3));
        editor.insert_text("c");

        assert!(!editor.sync_content("<p>abc</p>"));
        assert!(editor.state().history().can_undo());

        assert!(editor.sync_content("<p>other</p>"));
        assert_eq!(editor.get_html(), "<p>other</p>");
        assert!(!editor.state().history().can_undo());
    }

    #[test]
    fn typing_groups_into_one_undo() {
        let (mut editor, _) = editor_with("<p>ab</p>");
        editor.set_selection(Selection::collapsed(3));
        editor.insert_text("c");
        editor.insert_text("d");
        assert_eq!(editor.get_html(), "<p>abcd</p>");

        assert!(editor.undo());
        assert_eq!(editor.get_html(), "<p>ab</p>");
        assert!(editor.redo());
        assert_eq!(editor.get_html(), "<p>abcd</p>");
    }

    #[test]
    fn typed_markdown_image_becomes_node() {
        let (mut editor, _) = editor_with("<p></p>");
        assert!(editor.insert_text("![cat](https://x/cat.png)"));
        assert_eq!(image_srcs(editor.state().doc()), ["https://x/cat.png"]);
        assert_eq!(editor.state().doc().text_between(0, editor.state().doc().size()), "");
    }

    #[test]
    fn enter_is_swallowed_and_shift_enter_breaks() {
        let (mut editor, seen) = editor_with("<p>ab</p>");
        editor.set_selection(Selection::collapsed(2));

        assert_eq!(editor.handle_key(EditorKey::Enter), KeydownResult::Handled);
        assert!(seen.borrow().is_empty());

        assert_eq!(editor.handle_key(EditorKey::ShiftEnter), KeydownResult::Handled);
        assert_eq!(editor.get_html(), "<p>a<br>b</p>");
    }

    #[test]
    fn backspace_joins_blocks() {
        let (mut editor, _) = editor_with("<p>ab</p><p>cd</p>");
        editor.set_selection(Selection::collapsed(5));
        assert_eq!(editor.handle_key(EditorKey::Backspace), KeydownResult::Handled);
        assert_eq!(editor.get_html(), "<p>abcd</p>");
        assert_eq!(editor.state().selection(), Selection::collapsed(3));

        // Nothing before the first block.
        editor.set_selection(Selection::collapsed(1));
        assert_eq!(editor.handle_key(EditorKey::Backspace), KeydownResult::PassThrough);
    }

    #[test]
    fn backspace_selects_then_delete_removes_image() {
        let deleted: Seen = Seen::default();
        let sink = deleted.clone();
        let (mut editor, _) = editor_with(r#"<img src="x.png"><p>cd</p>"#);
        editor
            .session_mut()
            .set_deleter(Some(Rc::new(move |src: &str| sink.borrow_mut().push(src.to_string()))));

        assert_eq!(editor.state().selection(), Selection::collapsed(2));
        assert!(editor.delete_backward());
        assert_eq!(editor.state().selection(), Selection::node(0));

        assert!(editor.delete_current_node());
        assert_eq!(editor.get_html(), "<p></p><p>cd</p>");
        assert_eq!(deleted.borrow().as_slice(), ["x.png"]);
        // No image under the cursor any more.
        assert!(!editor.delete_current_node());
    }

    #[test]
    fn readonly_blocks_user_entry_points() {
        let (mut editor, seen) = editor_with("<p>ab</p>");
        editor.set_readonly(true);

        assert!(!editor.insert_text("x"));
        assert!(!editor.delete_backward());
        assert!(!editor.insert_html("<p>x</p>"));
        assert_eq!(editor.handle_key(EditorKey::Enter), KeydownResult::PassThrough);
        assert!(!editor.undo());
        let paste = DataTransfer::new().with_item("image/png", Some(MemFile::png("a.png")));
        assert_eq!(editor.handle_paste(&paste), TransferOutcome::Swallow);
        assert!(seen.borrow().is_empty());

        editor.set_readonly(false);
        assert!(editor.insert_text("x"));
    }

    #[test]
    fn pasted_html_goes_inline_or_as_blocks() {
        let (mut editor, _) = editor_with("<p>ab</p>");
        editor.set_selection(Selection::collapsed(2));
        assert!(editor.insert_html("<p><strong>x</strong></p>"));
        assert_eq!(editor.get_html(), "<p>a<strong>x</strong>b</p>");

        let (mut editor, _) = editor_with("<p>ab</p>");
        editor.set_selection(Selection::collapsed(2));
        assert!(editor.insert_html("<p>x</p><p>y</p>"));
        assert_eq!(editor.get_html(), "<p>a</p><p>x</p><p>y</p><p>b</p>");
    }

    #[test]
    fn paste_and_drop_respect_config() {
        let images = DataTransfer::new()
            .with_html(r#"<img src="https://x/y.png">"#)
            .with_item("image/png", Some(MemFile::png("a.png")));

        let (mut editor, _) = editor_with("<p>abcd</p>");
        assert_eq!(
            editor.handle_paste(&images),
            TransferOutcome::Upload {
                file: MemFile::png("a.png"),
                mode: UploadMode::Paste
            }
        );
        editor.set_selection(Selection::new(1, 3));
        assert!(editor.handle_drop(&images).is_handled());
        assert_eq!(editor.state().selection(), Selection::collapsed(3));

        let (mut disabled, _) = editor_from(EditorConfig {
            content: "<p>ab</p>".into(),
            disable_paste_and_dnd: true,
            ..Default::default()
        });
        assert_eq!(disabled.handle_paste(&images), TransferOutcome::Swallow);
        assert_eq!(disabled.handle_drop(&images), TransferOutcome::Swallow);
    }

    #[test]
    fn placeholder_text_by_block() {
        let (editor, _) = editor_with("");
        assert_eq!(
            editor.placeholder_text(&BlockKind::Heading { level: 2 }).as_deref(),
            Some("Heading 2")
        );
        assert_eq!(editor.placeholder_text(&BlockKind::Heading { level: 4 }), None);
        assert_eq!(
            editor.placeholder_text(&BlockKind::Paragraph).as_deref(),
            Some(DEFAULT_PLACEHOLDER)
        );

        let (custom, _) = editor_from(EditorConfig {
            placeholder: Some("Write a reply".into()),
            ..Default::default()
        });
        assert_eq!(
            custom.placeholder_text(&BlockKind::CodeBlock).as_deref(),
            Some("Write a reply")
        );
        assert!(custom.render_view().contains(r#"data-placeholder="Write a reply""#));
    }

    #[test]
    fn bubble_menu_needs_selected_text() {
        let (mut editor, _) = editor_with("<p>ab</p>");
        assert!(!editor.bubble_menu_open());
        editor.set_selection(Selection::new(1, 3));
        assert!(editor.bubble_menu_open());
        editor.set_readonly(true);
        assert!(!editor.bubble_menu_open());
    }

    #[test]
    fn surface_classes() {
        let (editor, _) = editor_from(EditorConfig {
            editor_class: Some("prose".into()),
            class_name: Some("comment-box".into()),
            is_text_input: true,
            ..Default::default()
        });
        assert_eq!(editor.editor_class(), "prose tapwrite-text-input");
        assert_eq!(editor.wrapper_class(), "comment-box");

        let (plain, _) = editor_with("");
        assert_eq!(plain.editor_class(), "");
        assert_eq!(plain.wrapper_class(), "");
    }

    #[test]
    fn resize_drag_updates_image() {
        let (mut editor, seen) = editor_with(r#"<p>a</p><img src="x.png">"#);
        let start = Point::new(100.0, 100.0);
        let rendered = Size::new(400.0, 300.0);

        assert!(!editor.begin_resize(ResizeSide::Right, 1, start, rendered));
        assert!(editor.begin_resize(ResizeSide::Right, 3, start, rendered));
        assert!(editor.is_resizing());
        assert!(editor.resize_to(Point::new(150.0, 100.0)));
        assert!(editor.resize_to(Point::new(160.0, 110.0)));

        let attrs = editor.state().doc().image_at(3).unwrap();
        assert_eq!(attrs.width, Dimension::Px(460.0));
        assert_eq!(attrs.height, Dimension::Px(310.0));
        assert_eq!(seen.borrow().len(), 2);

        assert!(editor.end_resize());
        assert!(!editor.resize_to(Point::new(0.0, 0.0)));

        // Both moves undo together.
        assert!(editor.undo());
        assert_eq!(editor.state().doc().image_at(3).unwrap().width, Dimension::Percent(100.0));
    }

    #[test]
    fn drag_ends_when_image_is_removed() {
        let (mut editor, _) = editor_with(r#"<p>a</p><img src="x.png">"#);
        let start = Point::new(0.0, 0.0);
        assert!(editor.begin_resize(ResizeSide::Left, 3, start, Size::new(300.0, 300.0)));
        editor.set_content("<p>gone</p>");
        assert!(!editor.resize_to(Point::new(-20.0, 0.0)));
        assert!(!editor.is_resizing());
    }

    fn image_pos(editor: &Editor<MemPlatform>, src: &str) -> usize {
        let doc = editor.state().doc();
        (0..doc.size())
            .find(|&pos| doc.image_at(pos).is_some_and(|a| a.src.as_deref() == Some(src)))
            .unwrap()
    }

    fn width_of(editor: &Editor<MemPlatform>, src: &str) -> Dimension {
        editor.state().doc().image_at(image_pos(editor, src)).unwrap().width
    }

    #[test]
    fn drag_follows_image_when_upload_commits() {
        let (mut editor, _) = editor_with(r#"<p>a</p><img src="a.png"><img src="b.png">"#);
        editor.set_selection(Selection::collapsed(2));
        let (tr, pending) = begin_upload(editor.state(), "blob:p".into(), UploadMode::Drop).unwrap();
        assert!(editor.dispatch(tr));

        let before = image_pos(&editor, "b.png");
        assert!(editor.begin_resize(ResizeSide::Right, before, Point::new(0.0, 0.0), Size::new(400.0, 300.0)));

        let (tr, _) = commit_upload(editor.state(), &pending, "https://cdn/new.png")
            .unwrap()
            .unwrap();
        assert!(editor.dispatch(tr));
        assert_ne!(image_pos(&editor, "b.png"), before);

        assert!(editor.resize_to(Point::new(50.0, 50.0)));
        assert_eq!(width_of(&editor, "b.png"), Dimension::Px(450.0));
        assert_eq!(width_of(&editor, "a.png"), Dimension::Percent(100.0));
        assert_eq!(width_of(&editor, "https://cdn/new.png"), Dimension::Percent(100.0));
    }

    #[test]
    fn drag_follows_image_through_typing() {
        let (mut editor, _) = editor_with(r#"<p>a</p><img src="x.png">"#);
        assert!(editor.begin_resize(ResizeSide::Right, 3, Point::new(0.0, 0.0), Size::new(400.0, 300.0)));
        editor.set_selection(Selection::collapsed(2));
        assert!(editor.insert_text("bc"));

        assert!(editor.resize_to(Point::new(10.0, 0.0)));
        assert_eq!(image_pos(&editor, "x.png"), 5);
        assert_eq!(width_of(&editor, "x.png"), Dimension::Px(410.0));
    }

    #[test]
    fn drag_ends_when_image_is_deleted() {
        let (mut editor, _) = editor_with(r#"<p>a</p><img src="x.png"><p>b</p>"#);
        assert!(editor.begin_resize(ResizeSide::Right, 3, Point::new(0.0, 0.0), Size::new(400.0, 300.0)));
        editor.set_selection(Selection::node(3));
        assert!(editor.delete_current_node());
        assert!(!editor.is_resizing());
        assert!(!editor.resize_to(Point::new(10.0, 0.0)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn uploads_run_against_the_editor() {
        let uploads = ManualUploads::default();
        let (mut editor, seen) = editor_with("<p>ab</p>");
        editor.session_mut().set_uploader(Some(Rc::new(uploads.uploader())));
        editor.set_selection(Selection::collapsed(3));
        let editor = Rc::new(RefCell::new(editor));

        let (outcome, ()) = join(
            upload_image(editor.clone(), MemFile::png("x.png"), UploadMode::Picker),
            async {
                assert!(editor.borrow().render_view().contains("image-uploading"));
                uploads.resolve(Ok(Some("https://cdn/x.png".to_string())));
            },
        )
        .await;

        assert_eq!(outcome, UploadOutcome::Committed { pos: 4 });
        let html = editor.borrow().get_html();
        assert_eq!(
            html,
            r#"<p>ab</p><img src="https://cdn/x.png" width="100%" height="auto"><p></p>"#
        );
        // Reservation and commit each reported content.
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow().last(), Some(&html));
    }
}
