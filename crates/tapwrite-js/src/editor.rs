//! Tapwrite - the editor wrapper for JavaScript.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Function;
use wasm_bindgen::prelude::*;
use web_sys::Element;

use tapwrite_browser::platform::js_error;
use tapwrite_browser::{
    BrowserPlatform, Editor, EditorSession, Listeners, MountedEditor, SharedEditor, attach,
    spawn_add_image,
};

use crate::capability::{JsDeleter, JsUploader};
use crate::types::TapwriteOptions;

/// Call a host callback after the current event has been handled, so it
/// can call back into the editor.
fn call_deferred(callback: &Function, arg: Option<JsValue>) {
    let callback = callback.clone();
    wasm_bindgen_futures::spawn_local(async move {
        let result = match arg {
            Some(arg) => callback.call1(&JsValue::NULL, &arg),
            None => callback.call0(&JsValue::NULL),
        };
        if let Err(e) = result {
            tracing::warn!(target: "tapwrite::js", error = %js_error(&e), "host callback threw");
        }
    });
}

/// A mounted editor instance.
#[wasm_bindgen]
pub struct Tapwrite {
    view: SharedEditor,
    listeners: Option<Listeners>,
}

#[wasm_bindgen]
impl Tapwrite {
    /// Mount a new editor into `container`.
    ///
    /// `uploadFn` receives a `File` and resolves to its URL (or undefined).
    /// `getContent` is called with the HTML after every document change.
    /// `deleteEditorAttachments` receives the `src` of deleted images.
    #[wasm_bindgen(constructor)]
    pub fn new(
        container: &Element,
        options: TapwriteOptions,
        upload_fn: Option<Function>,
        get_content: Option<Function>,
        on_focus: Option<Function>,
        delete_editor_attachments: Option<Function>,
    ) -> Result<Tapwrite, JsError> {
        let (config, image_options) = options.into_parts();

        let mut session = EditorSession::new(BrowserPlatform);
        if let Some(upload_fn) = upload_fn {
            session = session.with_uploader(JsUploader(upload_fn));
        }
        if let Some(delete_fn) = delete_editor_attachments {
            session = session.with_deleter(JsDeleter(delete_fn));
        }

        let mut editor = Editor::new(config, image_options, session);
        if let Some(callback) = get_content {
            editor.on_content(move |html| call_deferred(&callback, Some(JsValue::from_str(html))));
        }
        if let Some(callback) = on_focus {
            editor.on_focus(move || call_deferred(&callback, None));
        }

        let mounted = MountedEditor::mount(container, editor)
            .map_err(|e| JsError::new(&format!("Failed to mount editor: {}", e)))?;
        let view = Rc::new(RefCell::new(mounted));
        let listeners = attach(&view);

        Ok(Self {
            view,
            listeners: Some(listeners),
        })
    }

    // === Content ===

    /// Get the document as HTML.
    #[wasm_bindgen(js_name = getHTML)]
    pub fn get_html(&self) -> Result<String, JsError> {
        self.with_editor(|view| view.editor().get_html())
    }

    /// Replace the content without notifying `getContent`.
    #[wasm_bindgen(js_name = setContent)]
    pub fn set_content(&self, html: &str) -> Result<(), JsError> {
        self.with_editor(|view| view.update(|editor| editor.set_content(html)))
    }

    /// Load host content if it differs from the editor's. Returns whether
    /// anything was loaded.
    #[wasm_bindgen(js_name = syncContent)]
    pub fn sync_content(&self, html: &str) -> Result<bool, JsError> {
        self.with_editor(|view| view.update(|editor| editor.sync_content(html)))
    }

    // === Commands ===

    #[wasm_bindgen(js_name = insertText)]
    pub fn insert_text(&self, text: &str) -> Result<bool, JsError> {
        self.with_editor(|view| view.update(|editor| editor.insert_text(text)))
    }

    /// Open the file picker and upload the chosen image.
    #[wasm_bindgen(js_name = addImage)]
    pub fn add_image(&self) {
        spawn_add_image(self.view.clone());
    }

    /// Delete the selected image and its upload.
    #[wasm_bindgen(js_name = deleteCurrentNode)]
    pub fn delete_current_node(&self) -> Result<bool, JsError> {
        self.with_editor(|view| view.update(|editor| editor.delete_current_node()))
    }

    pub fn undo(&self) -> Result<bool, JsError> {
        self.with_editor(|view| view.update(|editor| editor.undo()))
    }

    pub fn redo(&self) -> Result<bool, JsError> {
        self.with_editor(|view| view.update(|editor| editor.redo()))
    }

    // === State ===

    #[wasm_bindgen(js_name = setReadonly)]
    pub fn set_readonly(&self, readonly: bool) -> Result<(), JsError> {
        self.with_editor(|view| view.update(|editor| editor.set_readonly(readonly)))
    }

    #[wasm_bindgen(js_name = isBubbleMenuOpen)]
    pub fn is_bubble_menu_open(&self) -> Result<bool, JsError> {
        self.with_editor(|view| view.editor().bubble_menu_open())
    }

    /// Focus the editing surface.
    pub fn focus(&self) -> Result<(), JsError> {
        let root = self.with_editor(|view| view.root().clone())?;
        root.focus()
            .map_err(|e| JsError::new(&format!("Failed to focus: {}", js_error(&e))))
    }

    /// Detach listeners and remove the editor from the page.
    pub fn destroy(&mut self) -> Result<(), JsError> {
        self.listeners.take();
        self.with_editor(|view| view.unmount())
    }
}

impl Tapwrite {
    fn with_editor<R>(
        &self,
        command: impl FnOnce(&mut MountedEditor) -> R,
    ) -> Result<R, JsError> {
        let mut view = self
            .view
            .try_borrow_mut()
            .map_err(|_| JsError::new("Editor is busy"))?;
        Ok(command(&mut view))
    }
}
