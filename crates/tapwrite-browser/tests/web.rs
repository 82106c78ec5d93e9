//! WASM browser tests for tapwrite-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use tapwrite_browser::dom_sync::dom_point_to_pos;
use tapwrite_browser::{
    BrowserFile, BrowserPlatform, Editor, EditorConfig, EditorKey, EditorSession, ImageFile,
    ImageOptions, ImagePlatform, MountedEditor, editor_key, transfer_from,
};

fn png_file(name: &str) -> web_sys::File {
    let parts = js_sys::Array::of1(&JsValue::from_str("not really a png"));
    let options = web_sys::FilePropertyBag::new();
    options.set_type("image/png");
    web_sys::File::new_with_str_sequence_and_options(&parts, name, &options).unwrap()
}

fn container() -> web_sys::Element {
    let div = gloo_utils::document().create_element("div").unwrap();
    gloo_utils::body().append_child(&div).unwrap();
    div
}

fn mount(content: &str) -> MountedEditor {
    let config = EditorConfig {
        content: content.to_string(),
        ..Default::default()
    };
    let editor = Editor::new(
        config,
        ImageOptions::default(),
        EditorSession::new(BrowserPlatform),
    );
    MountedEditor::mount(&container(), editor).unwrap()
}

// === Key mapping ===

#[wasm_bindgen_test]
fn test_editor_key_mapping() {
    assert_eq!(editor_key("Enter", false, false), Some(EditorKey::Enter));
    assert_eq!(editor_key("Enter", true, false), Some(EditorKey::ShiftEnter));
    assert_eq!(editor_key("Backspace", false, false), Some(EditorKey::Backspace));
    assert_eq!(editor_key("z", false, true), Some(EditorKey::Undo));
    assert_eq!(editor_key("Z", true, true), Some(EditorKey::Redo));
    assert_eq!(editor_key("y", false, true), Some(EditorKey::Redo));
    assert_eq!(editor_key("a", false, false), None);
    assert_eq!(editor_key("z", false, false), None);
}

// === Mounting and rendering ===

#[wasm_bindgen_test]
fn test_mount_renders_content() {
    let mounted = mount("<p>hello</p>");
    let root = mounted.root();
    assert_eq!(root.get_attribute("contenteditable").as_deref(), Some("true"));
    assert!(root.class_list().contains("tapwrite-editor"));
    assert_eq!(root.inner_html(), r#"<p data-pos="0">hello</p>"#);
    mounted.unmount();
}

#[wasm_bindgen_test]
fn test_readonly_mount_is_not_editable() {
    let mut mounted = mount("<p>x</p>");
    mounted.update(|editor| editor.set_readonly(true));
    assert_eq!(
        mounted.root().get_attribute("contenteditable").as_deref(),
        Some("false")
    );
    mounted.unmount();
}

#[wasm_bindgen_test]
fn test_dom_point_maps_to_position() {
    let mounted = mount("<p>ab</p><p>cd</p>");
    let root: &web_sys::Element = mounted.root().as_ref();
    let second = root.query_selector(r#"[data-pos="4"]"#).unwrap().unwrap();
    let text = second.first_child().unwrap();

    // Second paragraph opens at 4, so its content starts at 5.
    assert_eq!(dom_point_to_pos(root, &text, 0), Some(5));
    assert_eq!(dom_point_to_pos(root, &text, 2), Some(7));
    mounted.unmount();
}

#[wasm_bindgen_test]
fn test_dom_point_after_line_break() {
    let mounted = mount("<p>a<br>b</p>");
    let root: &web_sys::Element = mounted.root().as_ref();
    let para = root.first_child().unwrap();
    let last_text = para.last_child().unwrap();
    // "a" at 1, the break at 2, "b" at 3.
    assert_eq!(dom_point_to_pos(root, &last_text, 0), Some(3));
    mounted.unmount();
}

// === Data transfer ===

#[wasm_bindgen_test]
fn test_transfer_from_reads_html() {
    let dt = web_sys::DataTransfer::new().unwrap();
    dt.set_data("text/html", "<p>x</p>").unwrap();
    let transfer = transfer_from(&dt);
    assert_eq!(transfer.html.as_deref(), Some("<p>x</p>"));
    assert!(transfer.items.iter().all(|item| item.file.is_none()));
}

#[wasm_bindgen_test]
fn test_transfer_from_reads_files() {
    let dt = web_sys::DataTransfer::new().unwrap();
    dt.items().add_with_file(&png_file("a.png")).unwrap();
    let transfer = transfer_from(&dt);
    assert!(transfer.html.is_none());
    let file = transfer.items[0].file.as_ref().unwrap();
    assert_eq!(transfer.items[0].mime_type, "image/png");
    assert_eq!(file.name(), "a.png");
}

// === Platform ===

#[wasm_bindgen_test]
fn test_preview_is_object_url() {
    let file = BrowserFile::new(png_file("b.png"));
    assert_eq!(file.mime_type(), "image/png");
    let preview = BrowserPlatform.create_preview(&file).unwrap();
    assert!(preview.starts_with("blob:"));
    BrowserPlatform.release_preview(&preview);
}
