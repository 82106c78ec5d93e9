//! Browser implementation of the image platform.
//!
//! Previews are object URLs, preloading goes through
//! `HTMLImageElement.decode()`, and the picker is a detached
//! `<input type="file">`.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use smol_str::SmolStr;
use tokio::sync::oneshot;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{File, HtmlImageElement, HtmlInputElement, Url};

use tapwrite_core::{ImageFile, ImagePlatform, PlatformError, PlatformFuture};

/// Format a JS error value for logging.
pub fn js_error(value: &wasm_bindgen::JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}

/// A `File` from a picker, clipboard or drop.
#[derive(Clone, Debug, PartialEq)]
pub struct BrowserFile {
    file: File,
    name: String,
    mime_type: String,
}

impl BrowserFile {
    pub fn new(file: File) -> Self {
        let name = file.name();
        let mime_type = file.type_();
        Self {
            file,
            name,
            mime_type,
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }
}

impl From<File> for BrowserFile {
    fn from(file: File) -> Self {
        Self::new(file)
    }
}

impl ImageFile for BrowserFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Image platform backed by the DOM.
#[derive(Debug, Default)]
pub struct BrowserPlatform;

impl ImagePlatform for BrowserPlatform {
    type File = BrowserFile;

    fn create_preview(&self, file: &BrowserFile) -> Result<SmolStr, PlatformError> {
        Url::create_object_url_with_blob(file.file())
            .map(SmolStr::from)
            .map_err(|e| PlatformError(format!("could not create object URL: {}", js_error(&e))))
    }

    fn release_preview(&self, preview: &str) {
        if preview.is_empty() {
            return;
        }
        if let Err(e) = Url::revoke_object_url(preview) {
            tracing::debug!(target: "tapwrite::browser", error = %js_error(&e), "could not revoke preview URL");
        }
    }

    fn preload(&self, url: &str) -> PlatformFuture<Result<(), PlatformError>> {
        let url = url.to_string();
        Box::pin(async move {
            let img = HtmlImageElement::new()
                .map_err(|e| PlatformError(format!("could not create image: {}", js_error(&e))))?;
            img.set_src(&url);
            JsFuture::from(img.decode())
                .await
                .map(|_| ())
                .map_err(|e| PlatformError(format!("failed to load {url}: {}", js_error(&e))))
        })
    }

    fn pick_image(&self) -> PlatformFuture<Option<BrowserFile>> {
        Box::pin(async move {
            let input = match create_file_input() {
                Ok(input) => input,
                Err(e) => {
                    tracing::warn!(target: "tapwrite::browser", error = %e, "could not open file picker");
                    return None;
                }
            };

            let (tx, rx) = oneshot::channel::<Option<BrowserFile>>();
            let tx = Rc::new(RefCell::new(Some(tx)));

            let on_change = {
                let target = input.clone();
                let tx = tx.clone();
                EventListener::once(&input, "change", move |_| {
                    let file = target.files().and_then(|files| files.get(0)).map(BrowserFile::new);
                    if let Some(tx) = tx.borrow_mut().take() {
                        let _ = tx.send(file);
                    }
                })
            };
            let on_cancel = {
                let tx = tx.clone();
                EventListener::once(&input, "cancel", move |_| {
                    if let Some(tx) = tx.borrow_mut().take() {
                        let _ = tx.send(None);
                    }
                })
            };

            input.click();
            let picked = rx.await.ok().flatten();
            drop((on_change, on_cancel));
            picked
        })
    }
}

fn create_file_input() -> Result<HtmlInputElement, PlatformError> {
    let input = gloo_utils::document()
        .create_element("input")
        .map_err(|e| PlatformError(js_error(&e)))?
        .dyn_into::<HtmlInputElement>()
        .map_err(|_| PlatformError::from("created element is not an input"))?;
    input.set_type("file");
    input.set_accept("image/*");
    Ok(input)
}
