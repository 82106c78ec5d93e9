//! Types exposed to JavaScript via wasm-bindgen.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

use tapwrite_browser::{EditorConfig, ImageOptions};

/// Options for the image node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct TapwriteImageOptions {
    pub inline: bool,
    /// Extra attributes for every rendered `<img>`.
    #[tsify(type = "Record<string, string>")]
    pub html_attributes: BTreeMap<String, String>,
    pub disable_paste: bool,
}

/// Options passed to the `Tapwrite` constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct TapwriteOptions {
    /// Initial HTML content.
    pub content: String,
    pub readonly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub is_text_input: bool,
    pub disable_paste_and_dnd: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub image: TapwriteImageOptions,
}

impl TapwriteOptions {
    pub(crate) fn into_parts(self) -> (EditorConfig, ImageOptions) {
        let config = EditorConfig {
            content: self.content,
            readonly: self.readonly,
            placeholder: self.placeholder,
            is_text_input: self.is_text_input,
            disable_paste_and_dnd: self.disable_paste_and_dnd,
            editor_class: self.editor_class,
            class_name: self.class_name,
        };
        let image = ImageOptions {
            inline: self.image.inline,
            html_attributes: self.image.html_attributes,
            disable_paste: self.image.disable_paste,
        };
        (config, image)
    }
}
