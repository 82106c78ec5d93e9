//! Mounting an editor into the page.

use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

use tapwrite_core::{Editor, EditorSession, EditorState, EditorView, Transaction};

use crate::dom_sync::{read_dom_selection, write_dom_selection};
use crate::platform::{BrowserPlatform, js_error};

/// Class on the contenteditable surface.
pub const SURFACE_CLASS: &str = "tapwrite-editor";

/// An editor rendered into a DOM subtree.
///
/// Every change made through [`MountedEditor::update`] or
/// [`EditorView::dispatch`] re-renders the surface and restores the DOM
/// selection from the document selection.
pub struct MountedEditor {
    editor: Editor<BrowserPlatform>,
    wrapper: HtmlElement,
    root: HtmlElement,
}

fn create_div() -> Result<HtmlElement, String> {
    gloo_utils::document()
        .create_element("div")
        .map_err(|e| js_error(&e))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| "created element is not an HtmlElement".to_string())
}

impl MountedEditor {
    pub fn mount(container: &Element, editor: Editor<BrowserPlatform>) -> Result<Self, String> {
        let wrapper = create_div()?;
        let root = create_div()?;
        wrapper.append_child(&root).map_err(|e| js_error(&e))?;
        container.append_child(&wrapper).map_err(|e| js_error(&e))?;

        let mounted = Self {
            editor,
            wrapper,
            root,
        };
        mounted.render();
        tracing::debug!(target: "tapwrite::browser", "editor mounted");
        Ok(mounted)
    }

    pub fn editor(&self) -> &Editor<BrowserPlatform> {
        &self.editor
    }

    /// Mutable access without re-rendering. Prefer [`MountedEditor::update`].
    pub fn editor_mut(&mut self) -> &mut Editor<BrowserPlatform> {
        &mut self.editor
    }

    /// The contenteditable surface. Focus it through a clone: the focus
    /// listener needs to borrow the editor.
    pub fn root(&self) -> &HtmlElement {
        &self.root
    }

    /// Run a command against the editor, then re-render.
    pub fn update<R>(&mut self, command: impl FnOnce(&mut Editor<BrowserPlatform>) -> R) -> R {
        let result = command(&mut self.editor);
        self.render();
        result
    }

    /// Pick up the DOM selection before running a command.
    pub fn sync_selection_from_dom(&mut self) {
        if let Some(selection) = read_dom_selection(&self.root) {
            self.editor.set_selection(selection);
        }
    }

    fn has_focus(&self) -> bool {
        gloo_utils::document()
            .active_element()
            .is_some_and(|active| self.root.contains(Some(&active)))
    }

    pub fn render(&self) {
        let editor = &self.editor;
        self.root.set_inner_html(&editor.render_view());
        let _ = self
            .root
            .set_attribute("contenteditable", if editor.is_editable() { "true" } else { "false" });

        let mut class = SURFACE_CLASS.to_string();
        let extra = editor.editor_class();
        if !extra.is_empty() {
            class.push(' ');
            class.push_str(&extra);
        }
        self.root.set_class_name(&class);
        self.wrapper.set_class_name(editor.wrapper_class());

        if self.has_focus() {
            let state = editor.state();
            write_dom_selection(&self.root, state.doc(), state.selection());
        }
    }

    /// Remove the editor's elements from the page.
    pub fn unmount(&self) {
        self.wrapper.remove();
        tracing::debug!(target: "tapwrite::browser", "editor unmounted");
    }
}

impl EditorView for MountedEditor {
    type Platform = BrowserPlatform;

    fn state(&self) -> &EditorState {
        self.editor.state()
    }

    fn dispatch(&mut self, tr: Transaction) {
        self.update(|editor| editor.dispatch(tr));
    }

    fn session(&self) -> &EditorSession<BrowserPlatform> {
        self.editor.session()
    }

    fn is_editable(&self) -> bool {
        self.editor.is_editable()
    }
}
