//! Steps and position mapping.
//!
//! A [`Step`] is one atomic document change. Applying it yields the new
//! document and a [`StepMap`] describing how positions moved, which is what
//! keeps selections and upload placeholders pointing at the right place
//! while the document changes underneath them.

use crate::error::StepError;
use crate::image::ImageAttrs;
use crate::model::{Document, Token};
use crate::types::Affinity;

/// A mapped position plus whether the content around it was deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    pub deleted: bool,
}

/// Position map for a single replaced range.
///
/// `old_size` positions starting at `start` were replaced by `new_size`
/// positions. A map with both sizes zero is the identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StepMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

impl StepMap {
    pub const IDENTITY: StepMap = StepMap {
        start: 0,
        old_size: 0,
        new_size: 0,
    };

    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        Self {
            start,
            old_size,
            new_size,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.old_size == 0 && self.new_size == 0
    }

    pub fn map(&self, pos: usize, assoc: Affinity) -> usize {
        self.map_result(pos, assoc).pos
    }

    /// Map `pos` through this change.
    ///
    /// Positions strictly inside a replaced range, or on the edge that
    /// `assoc` points into, are reported as deleted.
    pub fn map_result(&self, pos: usize, assoc: Affinity) -> MapResult {
        let end = self.start + self.old_size;
        if self.is_identity() || pos < self.start {
            return MapResult { pos, deleted: false };
        }
        if pos > end {
            return MapResult {
                pos: pos - self.old_size + self.new_size,
                deleted: false,
            };
        }

        let side = if self.old_size == 0 {
            assoc
        } else if pos == self.start {
            Affinity::Before
        } else if pos == end {
            Affinity::After
        } else {
            assoc
        };
        let mapped = match side {
            Affinity::Before => self.start,
            Affinity::After => self.start + self.new_size,
        };
        let deleted = self.old_size > 0
            && match assoc {
                Affinity::Before => pos != self.start,
                Affinity::After => pos != end,
            };
        MapResult {
            pos: mapped,
            deleted,
        }
    }

    pub fn invert(&self) -> StepMap {
        StepMap::new(self.start, self.new_size, self.old_size)
    }
}

/// A sequence of step maps applied in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn map(&self, pos: usize, assoc: Affinity) -> usize {
        self.map_result(pos, assoc).pos
    }

    /// Map through every step; `deleted` is set if any step deleted the position.
    pub fn map_result(&self, pos: usize, assoc: Affinity) -> MapResult {
        self.maps.iter().fold(
            MapResult {
                pos,
                deleted: false,
            },
            |acc, map| {
                let next = map.map_result(acc.pos, assoc);
                MapResult {
                    pos: next.pos,
                    deleted: acc.deleted || next.deleted,
                }
            },
        )
    }
}

/// One atomic document change.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Replace `[from, to)` with `tokens`.
    Replace {
        from: usize,
        to: usize,
        tokens: Vec<Token>,
    },
    /// Overwrite the attributes of the image at `pos`.
    SetImageAttrs { pos: usize, attrs: ImageAttrs },
}

impl Step {
    pub fn apply(&self, doc: &Document) -> Result<(Document, StepMap), StepError> {
        match self {
            Step::Replace { from, to, tokens } => {
                let next = doc.replace(*from, *to, tokens)?;
                Ok((next, StepMap::new(*from, to - from, tokens.len())))
            }
            Step::SetImageAttrs { pos, attrs } => {
                let next = doc.with_image_attrs(*pos, attrs.clone())?;
                Ok((next, StepMap::IDENTITY))
            }
        }
    }

    /// The step that undoes this one. `doc` is the document this step was
    /// applied to.
    pub fn invert(&self, doc: &Document) -> Result<Step, StepError> {
        match self {
            Step::Replace { from, to, tokens } => {
                let removed = doc
                    .tokens()
                    .get(*from..*to)
                    .ok_or(StepError::OutOfRange {
                        pos: *to,
                        size: doc.size(),
                    })?;
                Ok(Step::Replace {
                    from: *from,
                    to: from + tokens.len(),
                    tokens: removed.to_vec(),
                })
            }
            Step::SetImageAttrs { pos, .. } => {
                let attrs = doc.image_at(*pos).ok_or(StepError::NotAnImage(*pos))?;
                Ok(Step::SetImageAttrs {
                    pos: *pos,
                    attrs: attrs.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Schema, paragraph};

    #[test]
    fn insertion_respects_assoc() {
        let map = StepMap::new(3, 0, 2);
        assert_eq!(map.map(2, Affinity::After), 2);
        assert_eq!(map.map(3, Affinity::Before), 3);
        assert_eq!(map.map(3, Affinity::After), 5);
        assert_eq!(map.map(4, Affinity::Before), 6);
        assert!(!map.map_result(3, Affinity::After).deleted);
    }

    #[test]
    fn deletion_marks_interior_positions() {
        // Positions 2..5 replaced by nothing.
        let map = StepMap::new(2, 3, 0);

        let inside = map.map_result(3, Affinity::After);
        assert_eq!(inside, MapResult { pos: 2, deleted: true });

        // Edges survive when assoc points away from the deleted range.
        assert!(!map.map_result(2, Affinity::Before).deleted);
        assert!(map.map_result(2, Affinity::After).deleted);
        assert!(!map.map_result(5, Affinity::After).deleted);
        assert!(map.map_result(5, Affinity::Before).deleted);

        assert_eq!(map.map(7, Affinity::After), 4);
    }

    #[test]
    fn mapping_accumulates_deleted_flag() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(1, 2, 0));
        mapping.push(StepMap::new(0, 0, 5));
        let result = mapping.map_result(2, Affinity::After);
        assert!(result.deleted);
        assert_eq!(result.pos, 6);
    }

    #[test]
    fn replace_step_inverts_to_original() {
        let doc = Document::from_tokens(paragraph("abc"), Schema::default()).unwrap();
        let step = Step::Replace {
            from: 2,
            to: 3,
            tokens: vec![Token::text('x'), Token::text('y')],
        };
        let (changed, map) = step.apply(&doc).unwrap();
        assert_eq!(changed.text_between(0, changed.size()), "axyc");
        assert_eq!(map, StepMap::new(2, 1, 2));

        let (restored, _) = step.invert(&doc).unwrap().apply(&changed).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn invalid_replace_leaves_document_untouched() {
        let doc = Document::from_tokens(paragraph("abc"), Schema::default()).unwrap();
        let step = Step::Replace {
            from: 0,
            to: 1,
            tokens: Vec::new(),
        };
        assert!(matches!(step.apply(&doc), Err(StepError::Invalid { .. })));
        assert_eq!(doc.text_between(0, doc.size()), "abc");
    }
}
