//! Core editor types: selection and mapping affinity.
//!
//! Positions are document positions as defined in [`crate::model`]: every
//! token occupies one position, and a selection endpoint is the boundary
//! before a token.

use crate::model::{Document, Token};
use crate::transform::StepMap;

/// Which side of an insertion a position sticks to when mapped.
///
/// `Before` keeps a position in front of content inserted exactly at it,
/// `After` moves it past the inserted content.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum Affinity {
    Before,
    #[default]
    After,
}

/// Whether a selection covers text or a single node.
#[derive(Clone, Debug, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    #[default]
    Text,
    /// A node selection: `anchor` is the node position, `head` is one past it.
    Node,
}

/// Selection with anchor and head positions.
///
/// The anchor is where the selection started, the head is where the cursor is now.
/// They may be in any order - use `start()` and `end()` for ordered bounds.
#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Where selection started
    pub anchor: usize,
    /// Where cursor is now
    pub head: usize,
    pub kind: SelectionKind,
}

impl Selection {
    /// Create a new text selection.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self {
            anchor,
            head,
            kind: SelectionKind::Text,
        }
    }

    /// Create a collapsed selection (cursor position).
    pub fn collapsed(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// Select the leaf node starting at `pos`.
    pub fn node(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos + 1,
            kind: SelectionKind::Node,
        }
    }

    /// Get the start (lower bound) of the selection.
    pub fn start(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Get the end (upper bound) of the selection.
    pub fn end(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Alias for `start()`, matching the document-position vocabulary.
    pub fn from(&self) -> usize {
        self.start()
    }

    /// Alias for `end()`.
    pub fn to(&self) -> usize {
        self.end()
    }

    /// Check if the selection is collapsed (empty, cursor only).
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Check if empty (same as is_collapsed).
    pub fn is_empty(&self) -> bool {
        self.is_collapsed()
    }

    pub fn is_node(&self) -> bool {
        self.kind == SelectionKind::Node
    }

    /// Map this selection through a step, snapping to a valid position when
    /// the mapped endpoints no longer sit inside a textblock.
    pub fn map(&self, doc: &Document, map: &StepMap) -> Selection {
        match self.kind {
            SelectionKind::Text => {
                let anchor = map.map(self.anchor, Affinity::After);
                let head = map.map(self.head, Affinity::After);
                if doc.is_text_position(anchor) && doc.is_text_position(head) {
                    Selection::new(anchor, head)
                } else {
                    Selection::near(doc, head, Affinity::After)
                }
            }
            SelectionKind::Node => {
                let mapped = map.map_result(self.anchor, Affinity::After);
                if !mapped.deleted && doc.image_at(mapped.pos).is_some() {
                    Selection::node(mapped.pos)
                } else {
                    Selection::near(doc, mapped.pos, Affinity::After)
                }
            }
        }
    }

    /// Find the closest valid cursor position to `pos`.
    ///
    /// Searches in the direction of `bias` first, then the other way. A
    /// document without any textblock falls back to selecting its first image.
    pub fn near(doc: &Document, pos: usize, bias: Affinity) -> Selection {
        let pos = pos.min(doc.size());
        if doc.is_text_position(pos) {
            return Selection::collapsed(pos);
        }

        let tokens = doc.tokens();
        // `pos` sits between top-level nodes here, so the nearest text positions
        // are the start of the next textblock and the end of the previous one.
        let forward = tokens[pos..]
            .iter()
            .position(|t| matches!(t, Token::Open(_)))
            .map(|i| pos + i + 1);
        let backward = tokens[..pos]
            .iter()
            .rposition(|t| matches!(t, Token::Close));

        let found = match bias {
            Affinity::After => forward.or(backward),
            Affinity::Before => backward.or(forward),
        };

        match found {
            Some(p) => Selection::collapsed(p),
            None => tokens
                .iter()
                .position(|t| matches!(t, Token::Image(_)))
                .map(Selection::node)
                .unwrap_or_else(|| Selection::collapsed(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageAttrs;
    use crate::model::{Schema, paragraph};

    fn doc(tokens: Vec<Token>) -> Document {
        Document::from_tokens(tokens, Schema::default()).unwrap()
    }

    #[test]
    fn test_selection_bounds() {
        // Forward selection
        let sel = Selection::new(5, 10);
        assert_eq!(sel.start(), 5);
        assert_eq!(sel.end(), 10);

        // Backward selection
        let sel = Selection::new(10, 5);
        assert_eq!(sel.start(), 5);
        assert_eq!(sel.end(), 10);
        assert_eq!(sel.head, 5);
    }

    #[test]
    fn test_selection_collapsed() {
        let sel = Selection::collapsed(7);
        assert!(sel.is_collapsed());
        assert!(sel.is_empty());
        assert_eq!(sel.from(), 7);
        assert_eq!(sel.to(), 7);
    }

    #[test]
    fn test_node_selection_spans_one_position() {
        let sel = Selection::node(4);
        assert!(sel.is_node());
        assert_eq!((sel.from(), sel.to()), (4, 5));
    }

    #[test]
    fn test_near_prefers_bias_direction() {
        // <p>ab</p><img><p>c</p>
        let mut tokens = paragraph("ab");
        tokens.push(Token::Image(ImageAttrs::new("x.png")));
        tokens.extend(paragraph("c"));
        let doc = doc(tokens);

        // Position 4 is between the first paragraph and the image.
        assert_eq!(Selection::near(&doc, 4, Affinity::After), Selection::collapsed(6));
        assert_eq!(Selection::near(&doc, 4, Affinity::Before), Selection::collapsed(3));
        // Already valid positions are kept.
        assert_eq!(Selection::near(&doc, 2, Affinity::After), Selection::collapsed(2));
    }

    #[test]
    fn test_near_without_textblocks_selects_image() {
        let doc = doc(vec![Token::Image(ImageAttrs::new("x.png"))]);
        assert_eq!(Selection::near(&doc, 1, Affinity::After), Selection::node(0));
    }

    #[test]
    fn test_map_through_insertion_before_cursor() {
        let doc_after = doc(paragraph("xxab"));
        let sel = Selection::collapsed(3);
        // Two characters inserted at position 1.
        let mapped = sel.map(&doc_after, &StepMap::new(1, 0, 2));
        assert_eq!(mapped, Selection::collapsed(5));
    }
}
