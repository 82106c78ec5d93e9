//! Editor state and transactions.
//!
//! [`EditorState`] is an immutable snapshot: document, selection, upload
//! placeholders, and undo history. Every change is described by a
//! [`Transaction`] built from [`EditorState::tr`] and applied atomically with
//! [`EditorState::apply`].

use web_time::Instant;

use crate::decoration::{PlaceholderAction, PlaceholderSet};
use crate::error::StepError;
use crate::history::{History, HistoryOp};
use crate::image::ImageAttrs;
use crate::model::{BlockKind, Document, Token};
use crate::transform::{Mapping, Step};
use crate::types::{Affinity, Selection};

/// History group for consecutive typing.
pub const TYPING_GROUP: &str = "typing";

/// A batch of steps plus metadata, applied to an [`EditorState`] as one unit.
#[derive(Clone, Debug)]
pub struct Transaction {
    base_version: u64,
    doc: Document,
    steps: Vec<Step>,
    inverted: Vec<Step>,
    mapping: Mapping,
    selection: Selection,
    placeholder: Option<PlaceholderAction>,
    add_to_history: bool,
    history_op: Option<HistoryOp>,
    group: Option<&'static str>,
    time: Instant,
}

impl Transaction {
    fn new(state: &EditorState) -> Self {
        Self {
            base_version: state.version,
            doc: state.doc.clone(),
            steps: Vec::new(),
            inverted: Vec::new(),
            mapping: Mapping::new(),
            selection: state.selection,
            placeholder: None,
            add_to_history: true,
            history_op: None,
            group: None,
            time: Instant::now(),
        }
    }

    /// The document after all steps so far.
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    pub(crate) fn inverted(&self) -> &[Step] {
        &self.inverted
    }

    /// Apply a step. On error the transaction is left unchanged.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, StepError> {
        let (doc, map) = step.apply(&self.doc)?;
        let inverse = step.invert(&self.doc)?;
        self.selection = self.selection.map(&doc, &map);
        self.doc = doc;
        self.mapping.push(map);
        self.steps.push(step);
        self.inverted.push(inverse);
        Ok(self)
    }

    /// Replace `[from, to)` with `tokens` as a single step.
    pub fn replace_with(&mut self, from: usize, to: usize, tokens: Vec<Token>) -> Result<&mut Self, StepError> {
        self.step(Step::Replace { from, to, tokens })
    }

    pub fn insert(&mut self, pos: usize, tokens: Vec<Token>) -> Result<&mut Self, StepError> {
        self.replace_with(pos, pos, tokens)
    }

    /// Delete `[from, to)`, repairing block boundaries.
    ///
    /// A range that starts inside one textblock and ends inside another joins
    /// the two. A range cut off at a block edge closes or reopens the block.
    /// Deleting everything leaves one empty paragraph.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, StepError> {
        let (from, to) = (from.min(to), from.max(to));
        if from == to {
            return Ok(self);
        }
        let size = self.doc.size();
        if to > size {
            return Err(StepError::OutOfRange { pos: to, size });
        }

        let patch = match (self.doc.block_around(from), self.doc.block_around(to)) {
            (Some(_), None) => vec![Token::Close],
            (None, Some(end)) => vec![Token::Open(end.kind)],
            _ if from == 0 && to == size => vec![Token::Open(BlockKind::Paragraph), Token::Close],
            _ => Vec::new(),
        };
        self.replace_with(from, to, patch)
    }

    /// Delete the current selection, if it is not empty.
    pub fn delete_selection(&mut self) -> Result<&mut Self, StepError> {
        let sel = self.selection;
        if sel.is_empty() {
            return Ok(self);
        }
        self.delete(sel.from(), sel.to())?;
        self.selection = Selection::near(&self.doc, sel.from(), Affinity::After);
        Ok(self)
    }

    /// Insert text at `pos`, inheriting the marks of the preceding character.
    ///
    /// Newlines become hard breaks outside code blocks.
    pub fn insert_text(&mut self, pos: usize, text: &str) -> Result<&mut Self, StepError> {
        let span = self
            .doc
            .block_around(pos)
            .ok_or(StepError::NotInTextblock(pos))?;
        let marks = self.doc.marks_at(pos);
        let in_code = span.kind.is_code();
        let tokens = text
            .chars()
            .filter(|c| *c != '\r')
            .map(|ch| match ch {
                '\n' if !in_code => Token::HardBreak,
                ch => Token::Char {
                    ch,
                    marks: marks.clone(),
                },
            })
            .collect();
        self.insert(pos, tokens)
    }

    /// Insert a block-level token run at `pos`, returning where it landed.
    ///
    /// At a top-level position the block goes in as is. Inside a textblock it
    /// goes before an empty block or one whose start is `pos`, after the block
    /// when `pos` is its end, and otherwise splits the textblock in two.
    pub fn insert_block(&mut self, pos: usize, tokens: Vec<Token>) -> Result<usize, StepError> {
        let at = match self.doc.block_around(pos) {
            None => {
                self.insert(pos, tokens)?;
                pos
            }
            Some(span) if span.is_empty() || pos == span.content_start => {
                self.insert(span.start, tokens)?;
                span.start
            }
            Some(span) if pos == span.content_end => {
                self.insert(span.end(), tokens)?;
                span.end()
            }
            Some(span) => {
                let mut split = Vec::with_capacity(tokens.len() + 2);
                split.push(Token::Close);
                split.extend(tokens);
                split.push(Token::Open(span.kind));
                self.insert(pos, split)?;
                pos + 1
            }
        };
        Ok(at)
    }

    /// Insert an image at `pos` as an inline or block node, depending on the
    /// document schema. Returns the image position.
    pub fn insert_image(&mut self, pos: usize, attrs: ImageAttrs) -> Result<usize, StepError> {
        if !self.doc.schema().inline_images {
            return self.insert_block(pos, vec![Token::Image(attrs)]);
        }
        if self.doc.is_text_position(pos) {
            self.insert(pos, vec![Token::Image(attrs)])?;
            Ok(pos)
        } else {
            self.insert(
                pos,
                vec![Token::Open(BlockKind::Paragraph), Token::Image(attrs), Token::Close],
            )?;
            Ok(pos + 1)
        }
    }

    pub fn set_image_attrs(&mut self, pos: usize, attrs: ImageAttrs) -> Result<&mut Self, StepError> {
        self.step(Step::SetImageAttrs { pos, attrs })
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self
    }

    /// Attach a placeholder directive, replacing any earlier one.
    pub fn set_placeholder(&mut self, action: PlaceholderAction) -> &mut Self {
        self.placeholder = Some(action);
        self
    }

    pub fn placeholder(&self) -> Option<&PlaceholderAction> {
        self.placeholder.as_ref()
    }

    /// Exclude this transaction from undo history. A doc-changing transaction
    /// excluded from history clears it.
    pub fn set_add_to_history(&mut self, add: bool) -> &mut Self {
        self.add_to_history = add;
        self
    }

    pub fn add_to_history(&self) -> bool {
        self.add_to_history
    }

    /// Merge this transaction into the previous history entry when both carry
    /// the same group and arrive close together.
    pub fn set_history_group(&mut self, group: &'static str) -> &mut Self {
        self.group = Some(group);
        self
    }

    pub fn history_group(&self) -> Option<&'static str> {
        self.group
    }

    pub(crate) fn set_history_op(&mut self, op: HistoryOp) -> &mut Self {
        self.history_op = Some(op);
        self
    }

    pub(crate) fn history_op(&self) -> Option<HistoryOp> {
        self.history_op
    }

    pub fn time(&self) -> Instant {
        self.time
    }
}

/// Immutable editor snapshot.
#[derive(Clone, Debug)]
pub struct EditorState {
    doc: Document,
    selection: Selection,
    placeholders: PlaceholderSet,
    history: History,
    version: u64,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Document::default())
    }
}

impl EditorState {
    pub fn new(doc: Document) -> Self {
        let selection = Selection::near(&doc, 0, Affinity::After);
        Self {
            doc,
            selection,
            placeholders: PlaceholderSet::new(),
            history: History::default(),
            version: 0,
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn placeholders(&self) -> &PlaceholderSet {
        &self.placeholders
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Incremented by every doc-changing transaction.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Start a transaction against this state.
    pub fn tr(&self) -> Transaction {
        Transaction::new(self)
    }

    /// Same state with a different selection, snapped to a valid position.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        let doc = &self.doc;
        self.selection = if selection.is_node() && doc.image_at(selection.anchor).is_some() {
            Selection::node(selection.anchor)
        } else if doc.is_text_position(selection.anchor) && doc.is_text_position(selection.head) {
            Selection::new(selection.anchor, selection.head)
        } else {
            Selection::near(doc, selection.head, Affinity::After)
        };
        self
    }

    /// Replace the whole document, dropping history and placeholders.
    ///
    /// The version still advances so transactions built against the old
    /// document are rejected.
    pub fn reset(&self, doc: Document) -> Self {
        let mut next = Self::new(doc);
        next.version = self.version + 1;
        next
    }

    /// Apply a transaction, producing the next state.
    pub fn apply(&self, tr: Transaction) -> Result<EditorState, StepError> {
        if tr.doc_changed() && tr.base_version != self.version {
            return Err(StepError::Stale);
        }
        let placeholders = self.placeholders.apply(&tr);
        let history = self.history.apply(&tr, self.selection);
        let version = if tr.doc_changed() {
            self.version + 1
        } else {
            self.version
        };
        Ok(EditorState {
            doc: tr.doc,
            selection: tr.selection,
            placeholders,
            history,
            version,
        })
    }

    /// Transaction that undoes the last history entry.
    pub fn undo(&self) -> Option<Transaction> {
        self.history.undo_transaction(self)
    }

    /// Transaction that redoes the last undone entry.
    pub fn redo(&self) -> Option<Transaction> {
        self.history.redo_transaction(self)
    }
}
