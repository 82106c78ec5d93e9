//! Upload placeholders.
//!
//! A placeholder is a widget shown where an in-flight upload will land. The
//! [`PlaceholderSet`] lives in the editor state and is remapped through every
//! transaction, so the upload can ask where its placeholder is *now* when it
//! finishes. A placeholder whose anchor gets deleted disappears, which is how
//! an upload learns it should discard its result.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use markdown_weaver_escape::escape_html;
use smol_str::SmolStr;

use crate::state::{EditorState, Transaction};
use crate::transform::Mapping;
use crate::types::Affinity;

static NEXT_PLACEHOLDER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one pending upload. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderId(u64);

impl PlaceholderId {
    pub fn next() -> Self {
        Self(NEXT_PLACEHOLDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    pub id: PlaceholderId,
    pub pos: usize,
    /// Local preview URL shown while uploading.
    pub preview: SmolStr,
}

impl Placeholder {
    /// Non-editable widget markup for this placeholder.
    pub fn widget_html(&self) -> String {
        let mut out = String::with_capacity(96 + self.preview.len());
        let _ = write!(
            out,
            r#"<div class="image-uploading" contenteditable="false" data-upload-id="{}"><img src=""#,
            self.id
        );
        let _ = escape_html(&mut out, &self.preview);
        out.push_str(r#""></div>"#);
        out
    }
}

/// Directive carried by a transaction. Add and remove are mutually exclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaceholderAction {
    Add {
        id: PlaceholderId,
        pos: usize,
        preview: SmolStr,
    },
    Remove {
        id: PlaceholderId,
    },
}

/// Active placeholders keyed by identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaceholderSet {
    entries: BTreeMap<PlaceholderId, Placeholder>,
}

impl PlaceholderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remap through the transaction, then apply its directive.
    pub fn apply(&self, tr: &Transaction) -> Self {
        let mut set = if tr.mapping().is_empty() {
            self.clone()
        } else {
            self.map(tr.mapping())
        };
        match tr.placeholder() {
            Some(PlaceholderAction::Add { id, pos, preview }) => {
                if *pos > tr.doc().size() {
                    tracing::warn!(target: "tapwrite::upload", %id, pos, "placeholder position outside document");
                } else {
                    set.entries.insert(
                        *id,
                        Placeholder {
                            id: *id,
                            pos: *pos,
                            preview: preview.clone(),
                        },
                    );
                }
            }
            Some(PlaceholderAction::Remove { id }) => {
                set.entries.remove(id);
            }
            None => {}
        }
        set
    }

    /// Remap every placeholder, dropping those whose anchor was deleted.
    pub fn map(&self, mapping: &Mapping) -> Self {
        let entries = self
            .entries
            .values()
            .filter_map(|p| {
                let mapped = mapping.map_result(p.pos, Affinity::After);
                if mapped.deleted {
                    tracing::debug!(target: "tapwrite::upload", id = %p.id, "placeholder anchor deleted");
                    return None;
                }
                Some((
                    p.id,
                    Placeholder {
                        pos: mapped.pos,
                        ..p.clone()
                    },
                ))
            })
            .collect();
        Self { entries }
    }

    /// Current position of a placeholder.
    pub fn find(&self, id: PlaceholderId) -> Option<usize> {
        self.entries.get(&id).map(|p| p.pos)
    }

    pub fn get(&self, id: PlaceholderId) -> Option<&Placeholder> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.values()
    }

    /// Placeholders anchored at `pos`, oldest first.
    pub fn at(&self, pos: usize) -> impl Iterator<Item = &Placeholder> {
        self.entries.values().filter(move |p| p.pos == pos)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where the placeholder `id` currently sits in `state`, if it still exists.
pub fn find_placeholder(state: &EditorState, id: PlaceholderId) -> Option<usize> {
    state.placeholders().find(id)
}
