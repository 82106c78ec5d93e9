//! Document model.
//!
//! A document is a flat sequence of [`Token`]s. Every token occupies exactly
//! one position, and position `p` is the boundary before token `p`, so
//! `<p>hi</p>` is `Open(Paragraph) 'h' 'i' Close` with size 4 and a block
//! image is a single position.
//!
//! Documents are immutable values. Edits go through [`crate::transform::Step`]s,
//! which validate the result before producing a new document.

use smol_str::SmolStr;

use crate::error::StepError;
use crate::image::ImageAttrs;

/// Kind of a textblock.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    CodeBlock,
}

impl BlockKind {
    /// HTML tag this block serializes to.
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "p",
            BlockKind::Heading { level: 1 } => "h1",
            BlockKind::Heading { level: 2 } => "h2",
            BlockKind::Heading { level: 3 } => "h3",
            BlockKind::Heading { level: 4 } => "h4",
            BlockKind::Heading { level: 5 } => "h5",
            BlockKind::Heading { .. } => "h6",
            BlockKind::CodeBlock => "pre",
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, BlockKind::CodeBlock)
    }
}

/// Inline formatting marks.
///
/// Variant order is the nesting order used when serializing: a link wraps
/// bold text, bold wraps italic, and so on.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mark {
    Link { href: SmolStr },
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
}

/// One position in the document.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// Start of a textblock.
    Open(BlockKind),
    /// End of the innermost open textblock.
    Close,
    Char { ch: char, marks: Vec<Mark> },
    HardBreak,
    Image(ImageAttrs),
}

impl Token {
    /// An unformatted character.
    pub fn text(ch: char) -> Token {
        Token::Char {
            ch,
            marks: Vec::new(),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Token::Char { .. } | Token::HardBreak)
    }
}

/// Tokens for a plain paragraph containing `text`.
pub fn paragraph(text: &str) -> Vec<Token> {
    block(BlockKind::Paragraph, text)
}

/// Tokens for an empty paragraph.
pub fn empty_paragraph() -> Vec<Token> {
    vec![Token::Open(BlockKind::Paragraph), Token::Close]
}

/// Tokens for a textblock of `kind` containing unformatted `text`.
pub fn block(kind: BlockKind, text: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len() + 2);
    tokens.push(Token::Open(kind));
    tokens.extend(text.chars().map(Token::text));
    tokens.push(Token::Close);
    tokens
}

/// Structural rules the document is validated against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    /// Images live inside textblocks instead of between them.
    pub inline_images: bool,
}

/// Location of a textblock in the document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSpan {
    /// Position of the `Open` token.
    pub start: usize,
    pub kind: BlockKind,
    /// First position inside the block.
    pub content_start: usize,
    /// Position of the `Close` token.
    pub content_end: usize,
}

impl BlockSpan {
    /// Position just after the `Close` token.
    pub fn end(&self) -> usize {
        self.content_end + 1
    }

    pub fn is_empty(&self) -> bool {
        self.content_start == self.content_end
    }

    pub fn content_len(&self) -> usize {
        self.content_end - self.content_start
    }

    /// Whether `pos` is a cursor position inside this block.
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.content_start && pos <= self.content_end
    }
}

/// A top-level node yielded by [`Document::blocks`].
#[derive(Clone, Debug, PartialEq)]
pub enum BlockRef<'a> {
    Text {
        span: BlockSpan,
        content: &'a [Token],
    },
    Image {
        pos: usize,
        attrs: &'a ImageAttrs,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    tokens: Vec<Token>,
    schema: Schema,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Schema::default())
    }
}

impl Document {
    /// A document holding a single empty paragraph.
    pub fn new(schema: Schema) -> Self {
        Self {
            tokens: empty_paragraph(),
            schema,
        }
    }

    /// Build a document from tokens, validating them against `schema`.
    pub fn from_tokens(tokens: Vec<Token>, schema: Schema) -> Result<Self, StepError> {
        validate(&tokens, schema)?;
        Ok(Self { tokens, schema })
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of positions; valid positions are `0..=size`.
    pub fn size(&self) -> usize {
        self.tokens.len()
    }

    pub fn token_at(&self, pos: usize) -> Option<&Token> {
        self.tokens.get(pos)
    }

    /// Image attributes of the node starting at `pos`, if it is an image.
    pub fn image_at(&self, pos: usize) -> Option<&ImageAttrs> {
        match self.tokens.get(pos) {
            Some(Token::Image(attrs)) => Some(attrs),
            _ => None,
        }
    }

    /// Whether the document is a single empty paragraph.
    pub fn is_blank(&self) -> bool {
        self.tokens == empty_paragraph()
    }

    /// The textblock containing cursor position `pos`, if any.
    pub fn block_around(&self, pos: usize) -> Option<BlockSpan> {
        if pos > self.tokens.len() {
            return None;
        }
        let mut start = None;
        for i in (0..pos).rev() {
            match &self.tokens[i] {
                Token::Open(kind) => {
                    start = Some((i, kind.clone()));
                    break;
                }
                Token::Close => return None,
                _ => {}
            }
        }
        let (start, kind) = start?;
        let content_end = self.close_after(pos)?;
        Some(BlockSpan {
            start,
            kind,
            content_start: start + 1,
            content_end,
        })
    }

    /// The textblock whose `Open` token is at `pos`.
    pub fn block_at(&self, pos: usize) -> Option<BlockSpan> {
        match self.tokens.get(pos) {
            Some(Token::Open(kind)) => Some(BlockSpan {
                start: pos,
                kind: kind.clone(),
                content_start: pos + 1,
                content_end: self.close_after(pos + 1)?,
            }),
            _ => None,
        }
    }

    fn close_after(&self, pos: usize) -> Option<usize> {
        self.tokens[pos.min(self.tokens.len())..]
            .iter()
            .position(|t| matches!(t, Token::Close))
            .map(|i| pos + i)
    }

    /// Whether a cursor can sit at `pos`.
    pub fn is_text_position(&self, pos: usize) -> bool {
        self.block_around(pos).is_some()
    }

    /// Iterate top-level nodes in document order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockRef<'_>> + '_ {
        let mut pos = 0;
        std::iter::from_fn(move || {
            while pos < self.tokens.len() {
                match &self.tokens[pos] {
                    Token::Open(_) => {
                        let span = self.block_at(pos)?;
                        pos = span.end();
                        let content = &self.tokens[span.content_start..span.content_end];
                        return Some(BlockRef::Text { span, content });
                    }
                    Token::Image(attrs) => {
                        let at = pos;
                        pos += 1;
                        return Some(BlockRef::Image { pos: at, attrs });
                    }
                    _ => pos += 1,
                }
            }
            None
        })
    }

    /// Plain text between two positions. Hard breaks become `\n`,
    /// block boundaries and images contribute nothing.
    pub fn text_between(&self, from: usize, to: usize) -> String {
        let to = to.min(self.tokens.len());
        let from = from.min(to);
        self.tokens[from..to]
            .iter()
            .filter_map(|t| match t {
                Token::Char { ch, .. } => Some(*ch),
                Token::HardBreak => Some('\n'),
                _ => None,
            })
            .collect()
    }

    /// Inline text used for input-rule matching: one char per position,
    /// with non-text leaves as U+FFFC so offsets map back to positions.
    pub fn inline_text(&self, from: usize, to: usize) -> String {
        let to = to.min(self.tokens.len());
        let from = from.min(to);
        self.tokens[from..to]
            .iter()
            .filter_map(|t| match t {
                Token::Char { ch, .. } => Some(*ch),
                Token::HardBreak | Token::Image(_) => Some('\u{FFFC}'),
                _ => None,
            })
            .collect()
    }

    /// Marks that text typed at `pos` inherits. Links are not inherited.
    pub fn marks_at(&self, pos: usize) -> Vec<Mark> {
        let Some(span) = self.block_around(pos) else {
            return Vec::new();
        };
        if span.kind.is_code() {
            return Vec::new();
        }
        let neighbour = if pos > span.content_start {
            self.tokens.get(pos - 1)
        } else if pos < span.content_end {
            self.tokens.get(pos)
        } else {
            None
        };
        match neighbour {
            Some(Token::Char { marks, .. }) => marks
                .iter()
                .filter(|m| !matches!(m, Mark::Link { .. }))
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Replace `[from, to)` with `tokens`, validating the result.
    pub(crate) fn replace(&self, from: usize, to: usize, tokens: &[Token]) -> Result<Self, StepError> {
        let size = self.size();
        if from > to || to > size {
            return Err(StepError::OutOfRange {
                pos: if to > size { to } else { from },
                size,
            });
        }
        let mut next = Vec::with_capacity(size - (to - from) + tokens.len());
        next.extend_from_slice(&self.tokens[..from]);
        next.extend_from_slice(tokens);
        next.extend_from_slice(&self.tokens[to..]);
        Self::from_tokens(next, self.schema)
    }

    pub(crate) fn with_image_attrs(&self, pos: usize, attrs: ImageAttrs) -> Result<Self, StepError> {
        if self.image_at(pos).is_none() {
            return Err(StepError::NotAnImage(pos));
        }
        let mut tokens = self.tokens.clone();
        tokens[pos] = Token::Image(attrs);
        Ok(Self {
            tokens,
            schema: self.schema,
        })
    }
}

fn validate(tokens: &[Token], schema: Schema) -> Result<(), StepError> {
    if tokens.is_empty() {
        return Err(StepError::Invalid {
            pos: 0,
            reason: "document must contain at least one block",
        });
    }

    let mut open = false;
    for (pos, token) in tokens.iter().enumerate() {
        let reason = match (token, open) {
            (Token::Open(_), false) => {
                open = true;
                continue;
            }
            (Token::Close, true) => {
                open = false;
                continue;
            }
            (Token::Char { .. } | Token::HardBreak, true) => continue,
            (Token::Image(_), true) if schema.inline_images => continue,
            (Token::Image(_), false) if !schema.inline_images => continue,
            (Token::Open(_), true) => "blocks cannot nest",
            (Token::Close, false) => "close without matching open",
            (Token::Char { .. } | Token::HardBreak, false) => "inline content outside a block",
            (Token::Image(_), true) => "block image inside a textblock",
            (Token::Image(_), false) => "inline image outside a textblock",
        };
        return Err(StepError::Invalid { pos, reason });
    }

    if open {
        return Err(StepError::Invalid {
            pos: tokens.len(),
            reason: "unclosed block",
        });
    }
    Ok(())
}
