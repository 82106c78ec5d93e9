//! Browser event handling for the editor.
//!
//! The document model is the source of truth: editing events are turned
//! into editor commands and their default DOM mutation is prevented. Paste
//! and drop payloads are reduced to a core [`DataTransfer`] and classified
//! there.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, CompositionEvent, DragEvent, InputEvent, KeyboardEvent};

use tapwrite_core::{DataTransfer, EditorKey, KeydownResult, TransferOutcome, UploadMode, upload_image};

use crate::mount::MountedEditor;
use crate::platform::BrowserFile;
use crate::resize::{DragSlot, handle_mousedown};

/// Shared handle the listeners and uploads work through.
pub type SharedEditor = Rc<RefCell<MountedEditor>>;

/// Extract the parts of a browser `DataTransfer` the classifier needs.
pub fn transfer_from(dt: &web_sys::DataTransfer) -> DataTransfer<BrowserFile> {
    let mut transfer = DataTransfer::new();
    if let Ok(html) = dt.get_data("text/html") {
        if !html.is_empty() {
            transfer = transfer.with_html(html);
        }
    }
    let items = dt.items();
    for i in 0..items.length() {
        let Some(item) = items.get(i) else {
            continue;
        };
        let file = if item.kind() == "file" {
            item.get_as_file().ok().flatten().map(BrowserFile::new)
        } else {
            None
        };
        transfer = transfer.with_item(item.type_(), file);
    }
    transfer
}

/// Map a keydown to an editor key.
pub fn editor_key(key: &str, shift: bool, modifier: bool) -> Option<EditorKey> {
    match key {
        "Enter" if shift => Some(EditorKey::ShiftEnter),
        "Enter" if !modifier => Some(EditorKey::Enter),
        "Backspace" if !modifier => Some(EditorKey::Backspace),
        "z" | "Z" if modifier && shift => Some(EditorKey::Redo),
        "z" | "Z" if modifier => Some(EditorKey::Undo),
        "y" | "Y" if modifier => Some(EditorKey::Redo),
        _ => None,
    }
}

fn key_from_event(evt: &KeyboardEvent) -> Option<EditorKey> {
    editor_key(&evt.key(), evt.shift_key(), evt.ctrl_key() || evt.meta_key())
}

/// Run an upload in the background against a mounted editor.
pub fn spawn_upload(view: SharedEditor, file: BrowserFile, mode: UploadMode) {
    wasm_bindgen_futures::spawn_local(async move {
        let outcome = upload_image(view, file, mode).await;
        tracing::debug!(target: "tapwrite::browser", ?outcome, "upload finished");
    });
}

/// Run the file picker command in the background.
pub fn spawn_add_image(view: SharedEditor) {
    wasm_bindgen_futures::spawn_local(async move {
        let outcome = tapwrite_core::add_image(view).await;
        tracing::debug!(target: "tapwrite::browser", ?outcome, "add image finished");
    });
}

/// Insert a passed-through paste or drop payload as content.
fn insert_payload(view: &SharedEditor, transfer: &DataTransfer<BrowserFile>, dt: &web_sys::DataTransfer) {
    let Ok(mut view) = view.try_borrow_mut() else {
        return;
    };
    if let Some(html) = &transfer.html {
        view.update(|editor| editor.insert_html(html));
        return;
    }
    match dt.get_data("text/plain") {
        Ok(text) if !text.is_empty() => {
            view.update(|editor| editor.insert_text(&text));
        }
        _ => {}
    }
}

fn on_keydown(view: &SharedEditor, evt: &KeyboardEvent) {
    if evt.is_composing() {
        return;
    }
    let Some(key) = key_from_event(evt) else {
        return;
    };
    let Ok(mut view) = view.try_borrow_mut() else {
        return;
    };
    view.sync_selection_from_dom();
    if view.update(|editor| editor.handle_key(key)) == KeydownResult::Handled {
        evt.prevent_default();
    }
}

fn on_beforeinput(view: &SharedEditor, evt: &InputEvent) {
    if evt.is_composing() {
        return;
    }
    let input_type = evt.input_type();
    // Paste and drop have their own listeners.
    if matches!(input_type.as_str(), "insertFromPaste" | "insertFromDrop") {
        return;
    }
    evt.prevent_default();

    let Ok(mut view) = view.try_borrow_mut() else {
        return;
    };
    view.sync_selection_from_dom();
    match input_type.as_str() {
        "insertText" | "insertReplacementText" => {
            if let Some(data) = evt.data() {
                view.update(|editor| editor.insert_text(&data));
            }
        }
        "insertLineBreak" => {
            view.update(|editor| editor.handle_key(EditorKey::ShiftEnter));
        }
        "deleteContentBackward" | "deleteByCut" => {
            view.update(|editor| editor.delete_backward());
        }
        "historyUndo" => {
            view.update(|editor| editor.undo());
        }
        "historyRedo" => {
            view.update(|editor| editor.redo());
        }
        other => {
            tracing::trace!(target: "tapwrite::browser", input_type = other, "ignored input");
        }
    }
}

fn on_compositionend(view: &SharedEditor, evt: &CompositionEvent) {
    let Ok(mut view) = view.try_borrow_mut() else {
        return;
    };
    view.sync_selection_from_dom();
    match evt.data() {
        Some(data) if !data.is_empty() => {
            view.update(|editor| editor.insert_text(&data));
        }
        // Throw away whatever the composition left in the DOM.
        _ => view.render(),
    }
}

fn on_paste(view: &SharedEditor, evt: &ClipboardEvent) {
    let Some(dt) = evt.clipboard_data() else {
        return;
    };
    evt.prevent_default();
    let transfer = transfer_from(&dt);
    let outcome = match view.try_borrow_mut() {
        Ok(mut v) => {
            v.sync_selection_from_dom();
            v.editor().handle_paste(&transfer)
        }
        Err(_) => return,
    };
    match outcome {
        TransferOutcome::Upload { file, mode } => spawn_upload(view.clone(), file, mode),
        TransferOutcome::Swallow => {}
        TransferOutcome::PassThrough => insert_payload(view, &transfer, &dt),
    }
}

fn on_drop(view: &SharedEditor, evt: &DragEvent) {
    let Some(dt) = evt.data_transfer() else {
        return;
    };
    evt.prevent_default();
    let transfer = transfer_from(&dt);
    let outcome = match view.try_borrow_mut() {
        Ok(mut v) => {
            v.sync_selection_from_dom();
            v.editor_mut().handle_drop(&transfer)
        }
        Err(_) => return,
    };
    match outcome {
        TransferOutcome::Upload { file, mode } => spawn_upload(view.clone(), file, mode),
        TransferOutcome::Swallow => {}
        TransferOutcome::PassThrough => insert_payload(view, &transfer, &dt),
    }
}

/// Listeners attached to a mounted editor. Dropping this detaches them.
pub struct Listeners {
    _listeners: Vec<EventListener>,
    drag: DragSlot,
}

impl Drop for Listeners {
    fn drop(&mut self) {
        self.drag.borrow_mut().take();
    }
}

fn listen<E: JsCast + 'static>(
    target: &web_sys::EventTarget,
    event: &'static str,
    view: &SharedEditor,
    handler: fn(&SharedEditor, &E),
) -> EventListener {
    let view = view.clone();
    EventListener::new_with_options(
        target,
        event,
        EventListenerOptions::enable_prevent_default(),
        move |evt| handler(&view, evt.unchecked_ref::<E>()),
    )
}

/// Attach every editing listener to the mounted editor's root.
pub fn attach(view: &SharedEditor) -> Listeners {
    let root: web_sys::EventTarget = view.borrow().root().clone().into();
    let drag = DragSlot::default();

    let mut listeners = vec![
        listen::<KeyboardEvent>(&root, "keydown", view, on_keydown),
        listen::<InputEvent>(&root, "beforeinput", view, on_beforeinput),
        listen::<CompositionEvent>(&root, "compositionend", view, on_compositionend),
        listen::<ClipboardEvent>(&root, "paste", view, on_paste),
        listen::<DragEvent>(&root, "drop", view, on_drop),
        EventListener::new_with_options(
            &root,
            "dragover",
            EventListenerOptions::enable_prevent_default(),
            |evt| evt.prevent_default(),
        ),
    ];

    listeners.push({
        let view = view.clone();
        EventListener::new(&root, "focus", move |_| {
            if let Ok(mut view) = view.try_borrow_mut() {
                view.editor_mut().focus();
            }
        })
    });

    listeners.push({
        let view = view.clone();
        EventListener::new(&gloo_utils::document(), "selectionchange", move |_| {
            if let Ok(mut view) = view.try_borrow_mut() {
                view.sync_selection_from_dom();
            }
        })
    });

    listeners.push({
        let view = view.clone();
        let drag = drag.clone();
        EventListener::new_with_options(
            &root,
            "mousedown",
            EventListenerOptions::enable_prevent_default(),
            move |evt| handle_mousedown(&view, &drag, evt.unchecked_ref()),
        )
    });

    Listeners {
        _listeners: listeners,
        drag,
    }
}
