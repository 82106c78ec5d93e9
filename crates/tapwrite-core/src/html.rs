//! HTML serialization and parsing.
//!
//! The serializer writes the same markup the host stores (`<p>`, headings,
//! `<pre><code>`, inline marks, `<br>`, `<img>`). The parser is lenient: it
//! accepts whatever the host hands back, keeps the structure it understands
//! and flattens the rest into paragraphs.

use std::borrow::Cow;
use std::fmt::Write as _;

use markdown_weaver_escape::{escape_html, escape_html_body_text};
use smol_str::SmolStr;

use crate::image::{Dimension, ImageAttrs, ImageOptions};
use crate::model::{BlockKind, BlockRef, Document, Mark, Schema, Token, empty_paragraph};

/// Serialize a document to HTML.
pub fn to_html(doc: &Document, options: &ImageOptions) -> String {
    let mut out = String::new();
    for node in doc.blocks() {
        match node {
            BlockRef::Text { span, content } => {
                write_block_open(&mut out, &span.kind);
                write_inline(&mut out, content, options);
                write_block_close(&mut out, &span.kind);
            }
            BlockRef::Image { attrs, .. } => write_image(&mut out, attrs, options, None),
        }
    }
    out
}

fn write_block_open(out: &mut String, kind: &BlockKind) {
    match kind {
        BlockKind::CodeBlock => out.push_str("<pre><code>"),
        kind => {
            let _ = write!(out, "<{}>", kind.tag());
        }
    }
}

fn write_block_close(out: &mut String, kind: &BlockKind) {
    match kind {
        BlockKind::CodeBlock => out.push_str("</code></pre>"),
        kind => {
            let _ = write!(out, "</{}>", kind.tag());
        }
    }
}

/// Write inline content, nesting marks in [`Mark`] order.
pub(crate) fn write_inline(out: &mut String, content: &[Token], options: &ImageOptions) {
    let mut open: Vec<&Mark> = Vec::new();
    let mut text = String::new();
    let no_marks: &[Mark] = &[];

    for token in content {
        let marks = match token {
            Token::Char { marks, .. } => marks.as_slice(),
            _ => no_marks,
        };

        let keep = open
            .iter()
            .zip(marks.iter())
            .take_while(|(a, b)| **a == *b)
            .count();
        if keep < open.len() || keep < marks.len() {
            flush_text(out, &mut text);
            for mark in open.drain(keep..).rev() {
                write_mark_close(out, mark);
            }
            for mark in &marks[keep..] {
                write_mark_open(out, mark);
                open.push(mark);
            }
        }

        match token {
            Token::Char { ch, .. } => text.push(*ch),
            Token::HardBreak => {
                flush_text(out, &mut text);
                out.push_str("<br>");
            }
            Token::Image(attrs) => {
                flush_text(out, &mut text);
                write_image(out, attrs, options, None);
            }
            Token::Open(_) | Token::Close => {}
        }
    }

    flush_text(out, &mut text);
    for mark in open.into_iter().rev() {
        write_mark_close(out, mark);
    }
}

fn flush_text(out: &mut String, text: &mut String) {
    if !text.is_empty() {
        let _ = escape_html_body_text(&mut *out, text);
        text.clear();
    }
}

fn write_mark_open(out: &mut String, mark: &Mark) {
    match mark {
        Mark::Link { href } => {
            out.push_str("<a href=\"");
            let _ = escape_html(&mut *out, href);
            out.push_str("\" target=\"_blank\" rel=\"noopener noreferrer nofollow\">");
        }
        Mark::Bold => out.push_str("<strong>"),
        Mark::Italic => out.push_str("<em>"),
        Mark::Underline => out.push_str("<u>"),
        Mark::Strike => out.push_str("<s>"),
        Mark::Code => out.push_str("<code>"),
    }
}

fn write_mark_close(out: &mut String, mark: &Mark) {
    out.push_str(match mark {
        Mark::Link { .. } => "</a>",
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Underline => "</u>",
        Mark::Strike => "</s>",
        Mark::Code => "</code>",
    });
}

/// Write an `<img>` tag. Option attributes come first, node attributes
/// override them, and `class` values are concatenated.
pub(crate) fn write_image(out: &mut String, attrs: &ImageAttrs, options: &ImageOptions, class: Option<&str>) {
    let node_attrs = attrs.html_attributes();
    let mut classes: Vec<&str> = Vec::new();
    out.push_str("<img");
    for (name, value) in &options.html_attributes {
        if name == "class" {
            classes.push(value);
        } else if !node_attrs.iter().any(|(n, _)| *n == name.as_str()) {
            write_attr(out, name, value);
        }
    }
    classes.extend(class);
    if !classes.is_empty() {
        write_attr(out, "class", &classes.join(" "));
    }
    for (name, value) in &node_attrs {
        write_attr(out, name, value);
    }
    out.push('>');
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {name}=\"");
    let _ = escape_html(&mut *out, value);
    out.push('"');
}

/// Whether an HTML fragment contains an `<img>` element.
pub fn contains_image(html: &str) -> bool {
    Tokenizer::new(html).any(|t| matches!(t, HtmlToken::Start { ref name, .. } if name == "img"))
}

/// Parse an HTML fragment into a document. Never fails: unknown markup is
/// flattened and an empty fragment yields one empty paragraph.
pub fn parse_html(html: &str, schema: Schema) -> Document {
    let mut parser = Parser::new(schema);
    for token in Tokenizer::new(html) {
        parser.feed(token);
    }
    let tokens = parser.finish();
    Document::from_tokens(tokens, schema).unwrap_or_else(|e| {
        tracing::warn!(target: "tapwrite::html", error = %e, "parsed content was malformed, starting empty");
        Document::new(schema)
    })
}

#[derive(Debug, Clone, PartialEq)]
enum HtmlToken<'a> {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Text(Cow<'a, str>),
}

/// Minimal tag/text tokenizer. Comments, doctypes and processing
/// instructions are skipped; `<script>` and `<style>` bodies are dropped.
struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn skip_past(&mut self, pat: &str) {
        self.pos = match self.src[self.pos..].find(pat) {
            Some(i) => self.pos + i + pat.len(),
            None => self.src.len(),
        };
    }

    fn read_name(&mut self) -> String {
        let rest = &self.src[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':' || c == '_'))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_ascii_lowercase()
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn read_attr_value(&mut self) -> String {
        let rest = &self.src[self.pos..];
        let (raw, consumed) = match rest.chars().next() {
            Some(q @ ('"' | '\'')) => match rest[1..].find(q) {
                Some(end) => (&rest[1..1 + end], end + 2),
                None => (&rest[1..], rest.len()),
            },
            _ => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                (&rest[..end], end)
            }
        };
        self.pos += consumed;
        decode_entities(raw).into_owned()
    }

    fn read_start_tag(&mut self) -> HtmlToken<'a> {
        let name = self.read_name();
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                break;
            }
            if rest.starts_with('>') {
                self.pos += 1;
                break;
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                break;
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }
            let attr = self.read_name();
            if attr.is_empty() {
                // Junk we can't read as a name; skip one char.
                self.pos += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            }
            self.skip_whitespace();
            let value = if self.src[self.pos..].starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.read_attr_value()
            } else {
                String::new()
            };
            attrs.push((attr, value));
        }

        if name == "script" || name == "style" {
            self.skip_past(&format!("</{name}"));
            self.skip_past(">");
        }
        HtmlToken::Start { name, attrs }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = HtmlToken<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                return None;
            }
            if rest.starts_with("<!--") {
                self.skip_past("-->");
                continue;
            }
            if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past(">");
                continue;
            }
            if let Some(after) = rest.strip_prefix("</") {
                if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    self.pos += 2;
                    let name = self.read_name();
                    self.skip_past(">");
                    return Some(HtmlToken::End { name });
                }
            }
            if let Some(after) = rest.strip_prefix('<') {
                if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    self.pos += 1;
                    return Some(self.read_start_tag());
                }
            }

            // Text runs to the next '<' that could start markup.
            let first = rest.chars().next().map_or(1, char::len_utf8);
            let end = rest[first..].find('<').map_or(rest.len(), |i| i + first);
            self.pos += end;
            return Some(HtmlToken::Text(decode_entities(&rest[..end])));
        }
    }
}

fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&rest[1..1 + end]).map(|c| (c, end + 2)));
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Builds tokens from the HTML token stream.
struct Parser {
    schema: Schema,
    tokens: Vec<Token>,
    block: Option<BlockKind>,
    marks: Vec<Mark>,
    /// Nothing but whitespace has been written to the current block yet.
    at_block_start: bool,
}

impl Parser {
    fn new(schema: Schema) -> Self {
        Self {
            schema,
            tokens: Vec::new(),
            block: None,
            marks: Vec::new(),
            at_block_start: true,
        }
    }

    fn feed(&mut self, token: HtmlToken<'_>) {
        match token {
            HtmlToken::Text(text) => self.push_text(&text),
            HtmlToken::Start { name, attrs } => self.start(&name, &attrs),
            HtmlToken::End { name } => self.end(&name),
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.close_block();
        if self.tokens.is_empty() {
            return empty_paragraph();
        }
        self.tokens
    }

    fn start(&mut self, name: &str, attrs: &[(String, String)]) {
        match name {
            "p" => self.open_block(BlockKind::Paragraph),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name.as_bytes()[1] - b'0';
                self.open_block(BlockKind::Heading { level });
            }
            "pre" => self.open_block(BlockKind::CodeBlock),
            "div" | "li" | "ul" | "ol" | "blockquote" | "table" | "tr" | "td" | "th" | "hr" => {
                self.close_block()
            }
            "br" => match &self.block {
                Some(BlockKind::CodeBlock) => self.push_char('\n'),
                Some(_) => {
                    self.tokens.push(Token::HardBreak);
                    self.at_block_start = false;
                }
                None => {}
            },
            "img" => {
                if let Some(image) = image_from_attrs(attrs) {
                    self.push_image(image);
                }
            }
            "strong" | "b" => self.marks.push(Mark::Bold),
            "em" | "i" => self.marks.push(Mark::Italic),
            "u" => self.marks.push(Mark::Underline),
            "s" | "strike" | "del" => self.marks.push(Mark::Strike),
            "code" if !matches!(self.block, Some(BlockKind::CodeBlock)) => self.marks.push(Mark::Code),
            "a" => {
                if let Some((_, href)) = attrs.iter().find(|(n, _)| n == "href") {
                    self.marks.push(Mark::Link {
                        href: SmolStr::from(href.as_str()),
                    });
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &str) {
        let mark = match name {
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "div" | "li" | "blockquote" | "td"
            | "th" => {
                self.close_block();
                return;
            }
            "strong" | "b" => Mark::Bold,
            "em" | "i" => Mark::Italic,
            "u" => Mark::Underline,
            "s" | "strike" | "del" => Mark::Strike,
            "code" => Mark::Code,
            "a" => {
                if let Some(i) = self.marks.iter().rposition(|m| matches!(m, Mark::Link { .. })) {
                    self.marks.remove(i);
                }
                return;
            }
            _ => return,
        };
        if let Some(i) = self.marks.iter().rposition(|m| *m == mark) {
            self.marks.remove(i);
        }
    }

    fn open_block(&mut self, kind: BlockKind) {
        self.close_block();
        self.tokens.push(Token::Open(kind.clone()));
        self.block = Some(kind);
        self.at_block_start = true;
    }

    fn ensure_block(&mut self) {
        if self.block.is_none() {
            self.open_block(BlockKind::Paragraph);
        }
    }

    fn close_block(&mut self) {
        let Some(kind) = self.block.take() else {
            return;
        };
        if !kind.is_code() {
            while matches!(self.tokens.last(), Some(Token::Char { ch: ' ', .. })) {
                self.tokens.pop();
            }
        }
        self.tokens.push(Token::Close);
    }

    fn push_char(&mut self, ch: char) {
        let marks = if matches!(self.block, Some(BlockKind::CodeBlock)) {
            Vec::new()
        } else {
            let mut marks = self.marks.clone();
            marks.sort();
            marks.dedup();
            marks
        };
        self.tokens.push(Token::Char { ch, marks });
        self.at_block_start = false;
    }

    fn push_text(&mut self, text: &str) {
        if matches!(self.block, Some(BlockKind::CodeBlock)) {
            for ch in text.chars().filter(|c| *c != '\r') {
                self.push_char(ch);
            }
            return;
        }

        let mut pending_space = false;
        for ch in text.chars() {
            if matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{c}') {
                pending_space = true;
                continue;
            }
            if pending_space {
                self.space();
                pending_space = false;
            }
            self.ensure_block();
            self.push_char(ch);
        }
        if pending_space {
            self.space();
        }
    }

    /// Collapsed whitespace: at most one space, never at a block start.
    fn space(&mut self) {
        if self.block.is_none() || self.at_block_start {
            return;
        }
        let after_space = matches!(
            self.tokens.last(),
            Some(Token::Char { ch: ' ', .. } | Token::HardBreak)
        );
        if !after_space {
            self.push_char(' ');
        }
    }

    fn push_image(&mut self, attrs: ImageAttrs) {
        if self.schema.inline_images {
            self.ensure_block();
            self.tokens.push(Token::Image(attrs));
            self.at_block_start = false;
            return;
        }

        if self.block.is_some() {
            if self.at_block_start {
                // Drop the empty block the image was wrapped in.
                self.block = None;
                self.tokens.pop();
            } else {
                self.close_block();
            }
        }
        self.tokens.push(Token::Image(attrs));
    }
}

fn image_from_attrs(attrs: &[(String, String)]) -> Option<ImageAttrs> {
    let get = |name: &str| {
        attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    };
    let src = get("src")?;
    let optional = |name: &str| get(name).filter(|v| !v.is_empty()).map(SmolStr::from);
    let dimension = |name: &str, default: Dimension| {
        get(name)
            .and_then(|v| v.parse::<Dimension>().ok())
            .unwrap_or(default)
    };
    let defaults = ImageAttrs::default();
    Some(ImageAttrs {
        src: Some(SmolStr::from(src)),
        alt: optional("alt"),
        title: optional("title"),
        width: dimension("width", defaults.width),
        height: dimension("height", defaults.height),
        draggable: defaults.draggable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{block, paragraph};

    fn parse(html: &str) -> Document {
        parse_html(html, Schema::default())
    }

    fn roundtrip(html: &str) -> String {
        to_html(&parse(html), &ImageOptions::default())
    }

    #[test]
    fn empty_input_is_one_paragraph() {
        assert!(parse("").is_blank());
        assert!(parse("   ").is_blank());
        assert_eq!(to_html(&Document::default(), &ImageOptions::default()), "<p></p>");
    }

    #[test]
    fn plain_text_is_wrapped_in_paragraph() {
        assert_eq!(parse("hello").tokens(), paragraph("hello").as_slice());
    }

    #[test]
    fn headings_and_paragraphs() {
        let doc = parse("<h2>Title</h2>\n<p>  some   text </p>");
        let mut expected = block(BlockKind::Heading { level: 2 }, "Title");
        expected.extend(paragraph("some text"));
        assert_eq!(doc.tokens(), expected.as_slice());
    }

    #[test]
    fn marks_roundtrip() {
        insta::assert_snapshot!(
            roundtrip("<p>a <b>bold <i>both</i></b> and <a href=\"https://x.test/?a=1&amp;b=2\">link</a></p>"),
            @r#"<p>a <strong>bold <em>both</em></strong> and <a href="https://x.test/?a=1&amp;b=2" target="_blank" rel="noopener noreferrer nofollow">link</a></p>"#
        );
    }

    #[test]
    fn image_attributes_survive_roundtrip() {
        let html = r#"<p>before</p><img src="https://cdn/x.png" alt="A &quot;cat&quot;" title="t" width="350" height="200"><p></p>"#;
        let doc = parse(html);
        let image = doc.image_at(8).unwrap();
        assert_eq!(image.src(), Some("https://cdn/x.png"));
        assert_eq!(image.alt.as_deref(), Some("A \"cat\""));
        assert_eq!(image.width, Dimension::Px(350.0));
        assert_eq!(image.height, Dimension::Px(200.0));

        insta::assert_snapshot!(
            to_html(&doc, &ImageOptions::default()),
            @r#"<p>before</p><img src="https://cdn/x.png" alt="A &quot;cat&quot;" title="t" width="350" height="200"><p></p>"#
        );
    }

    #[test]
    fn image_inside_paragraph_is_lifted_out() {
        let doc = parse(r#"<p>a<img src="x.png">b</p>"#);
        insta::assert_snapshot!(
            to_html(&doc, &ImageOptions::default()),
            @r#"<p>a</p><img src="x.png" width="100%" height="auto"><p>b</p>"#
        );
        let alone = parse(r#"<p><img src="x.png"></p>"#);
        assert_eq!(alone.size(), 1);
    }

    #[test]
    fn images_without_src_are_dropped() {
        assert!(parse(r#"<img alt="nothing">"#).is_blank());
    }

    #[test]
    fn inline_schema_keeps_images_in_paragraphs() {
        let doc = parse_html(r#"<p>a<img src="x.png">b</p>"#, Schema { inline_images: true });
        assert_eq!(doc.size(), 5);
        assert!(doc.image_at(2).is_some());
    }

    #[test]
    fn code_blocks_keep_whitespace() {
        let doc = parse("<pre><code>fn main() {\n    x < 1\n}</code></pre>");
        assert_eq!(doc.text_between(0, doc.size()), "fn main() {\n    x < 1\n}");
        assert_eq!(
            to_html(&doc, &ImageOptions::default()),
            "<pre><code>fn main() {\n    x &lt; 1\n}</code></pre>"
        );
    }

    #[test]
    fn line_breaks_and_entities() {
        let doc = parse("<p>a<br>b &amp; c&nbsp;d &bogus;</p>");
        assert_eq!(doc.text_between(0, doc.size()), "a\nb & c\u{a0}d &bogus;");
    }

    #[test]
    fn html_attribute_options_are_merged() {
        let mut options = ImageOptions::default();
        options.html_attributes.insert("class".into(), "rounded".into());
        options.html_attributes.insert("loading".into(), "lazy".into());
        options.html_attributes.insert("width".into(), "10".into());
        let doc = parse(r#"<img src="x.png">"#);
        insta::assert_snapshot!(
            to_html(&doc, &options),
            @r#"<img loading="lazy" class="rounded" src="x.png" width="100%" height="auto">"#
        );
    }

    #[test]
    fn detects_image_tags() {
        assert!(contains_image(r#"<div><IMG SRC="a.png"></div>"#));
        assert!(contains_image("<p>x</p><img>"));
        assert!(!contains_image("<p>image</p><!-- <img src=x> -->"));
        assert!(!contains_image("a < img"));
    }

    #[test]
    fn text_may_start_with_multibyte_chars() {
        assert_eq!(parse("<p>été</p>").tokens(), paragraph("été").as_slice());
        assert_eq!(parse("été").tokens(), paragraph("été").as_slice());
        assert_eq!(roundtrip("<p>a</p><p>🦀 <b>ñ</b></p>"), "<p>a</p><p>🦀 <strong>ñ</strong></p>");
    }

    #[test]
    fn scripts_and_comments_are_ignored() {
        let doc = parse("<p>a<script>alert('<p>')</script>b<!-- c --></p>");
        assert_eq!(doc.text_between(0, doc.size()), "ab");
    }
}
