//! The `uploadImage` node: attributes, options, the markdown input rule and
//! the delete command.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

use crate::model::{BlockKind, Schema, empty_paragraph};
use crate::state::{EditorState, Transaction};
use crate::types::{Affinity, Selection};

/// Node name the image registers under.
pub const IMAGE_NODE_NAME: &str = "uploadImage";

/// How far back from the cursor the input rule looks.
const MAX_RULE_MATCH: usize = 500;

/// `![alt](src "title")` at the end of the typed text.
static IMAGE_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)(!\[(.+|:?)\]\((\S+)(?:(?:\s+)["'](\S+)["'])?\))$"#).unwrap()
});

/// Width or height of an image.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Percent(f32),
    Px(f32),
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Auto => write!(f, "auto"),
            Dimension::Percent(p) => write!(f, "{p}%"),
            Dimension::Px(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid image dimension: {0:?}")]
pub struct InvalidDimension(pub String);

impl FromStr for Dimension {
    type Err = InvalidDimension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || InvalidDimension(s.to_string());
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            Ok(Dimension::Auto)
        } else if let Some(p) = s.strip_suffix('%') {
            p.trim().parse().map(Dimension::Percent).map_err(|_| invalid())
        } else {
            s.strip_suffix("px")
                .unwrap_or(s)
                .trim()
                .parse()
                .map(Dimension::Px)
                .map_err(|_| invalid())
        }
    }
}

/// Attributes of an image node.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageAttrs {
    pub src: Option<SmolStr>,
    pub alt: Option<SmolStr>,
    pub title: Option<SmolStr>,
    pub width: Dimension,
    pub height: Dimension,
    /// Editor-only drag flag, never written to HTML.
    pub draggable: bool,
}

impl Default for ImageAttrs {
    fn default() -> Self {
        Self {
            src: None,
            alt: None,
            title: None,
            width: Dimension::Percent(100.0),
            height: Dimension::Auto,
            draggable: true,
        }
    }
}

impl ImageAttrs {
    pub fn new(src: impl Into<SmolStr>) -> Self {
        Self {
            src: Some(src.into()),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: Dimension, height: Dimension) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    /// HTML attributes in render order. Unset optional attributes are skipped.
    pub fn html_attributes(&self) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::with_capacity(5);
        if let Some(src) = &self.src {
            attrs.push(("src", src.to_string()));
        }
        if let Some(alt) = &self.alt {
            attrs.push(("alt", alt.to_string()));
        }
        if let Some(title) = &self.title {
            attrs.push(("title", title.to_string()));
        }
        attrs.push(("width", self.width.to_string()));
        attrs.push(("height", self.height.to_string()));
        attrs
    }
}

/// Node-level options for the image extension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageOptions {
    /// Images are inline nodes inside textblocks.
    pub inline: bool,
    /// Extra attributes merged into every rendered `<img>`.
    pub html_attributes: BTreeMap<String, String>,
    /// Block pasting and dropping of images.
    pub disable_paste: bool,
}

impl ImageOptions {
    pub fn schema(&self) -> Schema {
        Schema {
            inline_images: self.inline,
        }
    }
}

/// A match of the markdown image syntax in typed text.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRuleMatch {
    /// Char offset where the `![` starts.
    pub start: usize,
    /// Char offset just past the closing `)`.
    pub end: usize,
    pub attrs: ImageAttrs,
}

/// Match `![alt](src "title")` at the end of `text`.
pub fn match_image_rule(text: &str) -> Option<ImageRuleMatch> {
    let caps = IMAGE_INPUT_RE.captures(text)?;
    let syntax = caps.get(1)?;
    let start = text[..syntax.start()].chars().count();
    let end = start + syntax.as_str().chars().count();
    let non_empty = |i: usize| {
        caps.get(i)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(SmolStr::from)
    };
    Some(ImageRuleMatch {
        start,
        end,
        attrs: ImageAttrs {
            src: non_empty(3),
            alt: non_empty(2),
            title: non_empty(4),
            ..Default::default()
        },
    })
}

/// Build the transaction that turns markdown image syntax before the cursor
/// into an image node, if the text before the cursor matches.
pub fn image_input_rule(state: &EditorState) -> Option<Transaction> {
    let sel = state.selection();
    if !sel.is_collapsed() {
        return None;
    }
    let span = state.doc().block_around(sel.head)?;
    if span.kind == BlockKind::CodeBlock {
        return None;
    }

    let from = span.content_start.max(sel.head.saturating_sub(MAX_RULE_MATCH));
    let text = state.doc().inline_text(from, sel.head);
    let found = match_image_rule(&text)?;

    let mut tr = state.tr();
    let result = tr
        .delete(from + found.start, from + found.end)
        .and_then(|tr| tr.insert_image(from + found.start, found.attrs));
    match result {
        Ok(_) => {
            tracing::debug!(target: "tapwrite::image", pos = from + found.start, "image input rule matched");
            Some(tr)
        }
        Err(e) => {
            tracing::warn!(target: "tapwrite::image", error = %e, "image input rule failed");
            None
        }
    }
}

/// Build the transaction that replaces the image at `selection.from` with an
/// empty paragraph. Returns the transaction and the removed image's `src`.
pub fn delete_current_node(state: &EditorState) -> Option<(Transaction, Option<SmolStr>)> {
    let pos = state.selection().from();
    let src = state.doc().image_at(pos)?.src.clone();

    let mut tr = state.tr();
    let cursor = if state.doc().is_text_position(pos) {
        // Inline image: drop it and open a paragraph at the same spot.
        tr.delete(pos, pos + 1)
            .and_then(|tr| tr.insert_block(pos, empty_paragraph()))
    } else {
        tr.replace_with(pos, pos + 1, empty_paragraph()).map(|_| pos)
    };
    match cursor {
        Ok(at) => {
            let sel = Selection::near(tr.doc(), at + 1, Affinity::After);
            tr.set_selection(sel);
            Some((tr, src))
        }
        Err(e) => {
            tracing::warn!(target: "tapwrite::image", error = %e, pos, "failed to delete image");
            None
        }
    }
}
