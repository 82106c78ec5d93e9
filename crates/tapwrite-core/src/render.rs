//! Editable-view rendering.
//!
//! Unlike [`crate::html::to_html`], which produces the stored content, this
//! renders what the editing surface shows: upload placeholder widgets, the
//! resizable image node view, and empty-block placeholder text. Every
//! textblock carries its `data-pos` so DOM points map back to positions.

use std::fmt::Write as _;

use markdown_weaver_escape::escape_html;

use crate::decoration::PlaceholderSet;
use crate::html::{write_image, write_inline};
use crate::image::{ImageAttrs, ImageOptions};
use crate::model::{BlockKind, BlockSpan, Token};
use crate::state::EditorState;

/// Inputs that shape the rendered view beyond the state itself.
pub struct RenderContext<'a> {
    pub image_options: &'a ImageOptions,
    /// Placeholder text for an empty block, if it gets one.
    pub placeholder: &'a dyn Fn(&BlockKind) -> Option<String>,
    pub editable: bool,
}

/// Render the editing surface for `state`.
pub fn render_view(state: &EditorState, ctx: &RenderContext<'_>) -> String {
    let doc = state.doc();
    let placeholders = state.placeholders();
    let tokens = doc.tokens();
    let mut out = String::new();
    let mut pos = 0;

    while pos < tokens.len() {
        write_widgets(&mut out, placeholders, pos);
        match &tokens[pos] {
            Token::Open(_) => {
                let Some(span) = doc.block_at(pos) else {
                    break;
                };
                write_text_block(&mut out, state, ctx, &span);
                pos = span.end();
            }
            Token::Image(attrs) => {
                write_node_view(&mut out, pos, attrs, ctx);
                pos += 1;
            }
            _ => pos += 1,
        }
    }
    write_widgets(&mut out, placeholders, tokens.len());
    out
}

fn write_widgets(out: &mut String, placeholders: &PlaceholderSet, pos: usize) {
    for placeholder in placeholders.at(pos) {
        out.push_str(&placeholder.widget_html());
    }
}

fn write_text_block(out: &mut String, state: &EditorState, ctx: &RenderContext<'_>, span: &BlockSpan) {
    let tokens = state.doc().tokens();
    let BlockSpan {
        start,
        ref kind,
        content_start,
        content_end,
    } = *span;
    let tag = kind.tag();
    let _ = write!(out, "<{tag} data-pos=\"{start}\"");
    if content_start == content_end {
        out.push_str(" class=\"is-empty\"");
        if let Some(text) = (ctx.placeholder)(kind) {
            out.push_str(" data-placeholder=\"");
            let _ = escape_html(&mut *out, &text);
            out.push('"');
        }
    }
    out.push('>');
    if kind.is_code() {
        out.push_str("<code>");
    }

    // Split inline content wherever a widget is anchored.
    let mut segment_start = content_start;
    for pos in content_start..=content_end {
        if state.placeholders().at(pos).next().is_some() {
            write_inline_with_views(out, &tokens[segment_start..pos], segment_start, ctx);
            write_widgets(out, state.placeholders(), pos);
            segment_start = pos;
        }
    }
    write_inline_with_views(out, &tokens[segment_start..content_end], segment_start, ctx);

    if kind.is_code() {
        out.push_str("</code>");
    }
    let _ = write!(out, "</{tag}>");
}

/// Like `write_inline`, but inline images get the resizable node view.
fn write_inline_with_views(out: &mut String, content: &[Token], offset: usize, ctx: &RenderContext<'_>) {
    let mut run_start = 0;
    for (i, token) in content.iter().enumerate() {
        if let Token::Image(attrs) = token {
            write_inline(out, &content[run_start..i], ctx.image_options);
            write_node_view(out, offset + i, attrs, ctx);
            run_start = i + 1;
        }
    }
    write_inline(out, &content[run_start..], ctx.image_options);
}

/// The resizable image node view.
fn write_node_view(out: &mut String, pos: usize, attrs: &ImageAttrs, ctx: &RenderContext<'_>) {
    let _ = write!(out, "<div class=\"image-resizer\" data-pos=\"{pos}\" contenteditable=\"false\"");
    if attrs.draggable && ctx.editable {
        out.push_str(" draggable=\"true\" data-drag-handle");
    }
    out.push('>');
    write_image(out, attrs, ctx.image_options, Some("postimage"));
    if ctx.editable {
        out.push_str(r#"<div class="resize-trigger left" data-side="left"></div>"#);
        out.push_str(r#"<div class="resize-trigger right" data-side="right"></div>"#);
    }
    out.push_str("</div>");
}
