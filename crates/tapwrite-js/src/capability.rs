//! Upload and delete capabilities backed by host JS functions.

use js_sys::{Function, Promise};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use tapwrite_browser::platform::js_error;
use tapwrite_browser::{BrowserFile, ImageDeleter, ImageUploader, UploadError, UploadFuture};

/// Await `value` if it is a promise.
async fn settle(value: JsValue) -> Result<JsValue, JsValue> {
    match value.dyn_into::<Promise>() {
        Ok(promise) => JsFuture::from(promise).await,
        Err(value) => Ok(value),
    }
}

/// `(file: File) => Promise<string | undefined>`
pub(crate) struct JsUploader(pub Function);

impl ImageUploader<BrowserFile> for JsUploader {
    fn upload(&self, file: &BrowserFile) -> UploadFuture {
        let func = self.0.clone();
        let file = file.file().clone();
        Box::pin(async move {
            let rejected = |e: JsValue| UploadError::Rejected(js_error(&e).into());
            let returned = func.call1(&JsValue::NULL, &file).map_err(rejected)?;
            let url = settle(returned).await.map_err(rejected)?;
            Ok(url.as_string())
        })
    }
}

/// `(url: string) => Promise<void>`, called fire-and-forget.
pub(crate) struct JsDeleter(pub Function);

impl ImageDeleter for JsDeleter {
    fn delete_image(&self, src: &str) {
        let returned = match self.0.call1(&JsValue::NULL, &JsValue::from_str(src)) {
            Ok(returned) => returned,
            Err(e) => {
                tracing::warn!(target: "tapwrite::js", src, error = %js_error(&e), "delete failed");
                return;
            }
        };
        let src = src.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = settle(returned).await {
                tracing::warn!(target: "tapwrite::js", %src, error = %js_error(&e), "delete failed");
            }
        });
    }
}
