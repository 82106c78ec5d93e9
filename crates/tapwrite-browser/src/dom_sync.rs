//! DOM point ↔ document position mapping.
//!
//! The rendered view puts every top-level node directly under the editor
//! root with its `data-pos`. Inside a textblock, text counts one position
//! per char, `<br>` and image node views count one, and upload widgets
//! count nothing.

use wasm_bindgen::JsCast;
use web_sys::{Element, Node};

use tapwrite_core::{Document, Selection};

const IMAGE_VIEW_CLASS: &str = "image-resizer";
const WIDGET_CLASS: &str = "image-uploading";

fn children(node: &Node) -> impl Iterator<Item = Node> + use<> {
    let list = node.child_nodes();
    (0..list.length()).filter_map(move |i| list.item(i))
}

fn has_class(node: &Node, class: &str) -> bool {
    node.dyn_ref::<Element>()
        .is_some_and(|el| el.class_list().contains(class))
}

fn is_text(node: &Node) -> bool {
    node.node_type() == Node::TEXT_NODE
}

/// Nodes that occupy a fixed number of positions and are never descended.
fn atomic_size(node: &Node) -> Option<usize> {
    if has_class(node, WIDGET_CLASS) {
        Some(0)
    } else if has_class(node, IMAGE_VIEW_CLASS) || node.node_name().eq_ignore_ascii_case("br") {
        Some(1)
    } else {
        None
    }
}

fn node_size(node: &Node) -> usize {
    if is_text(node) {
        return node.text_content().map(|t| t.chars().count()).unwrap_or(0);
    }
    if let Some(size) = atomic_size(node) {
        return size;
    }
    if node.node_type() == Node::ELEMENT_NODE {
        children(node).map(|c| node_size(&c)).sum()
    } else {
        0
    }
}

/// Chars covered by the first `units` UTF-16 code units of `text`.
fn utf16_to_chars(text: &str, units: u32) -> usize {
    let mut seen = 0;
    text.chars()
        .take_while(|ch| {
            let fits = seen < units as usize;
            seen += ch.len_utf16();
            fits
        })
        .count()
}

/// UTF-16 code units covered by the first `chars` chars of `text`.
fn chars_to_utf16(text: &str, chars: usize) -> u32 {
    text.chars().take(chars).map(|ch| ch.len_utf16() as u32).sum()
}

/// Positions inside `container` before the DOM point `(target, offset)`.
fn count_before(container: &Node, target: &Node, offset: u32) -> Option<usize> {
    if container.is_same_node(Some(target)) {
        return Some(if is_text(container) {
            utf16_to_chars(&container.text_content().unwrap_or_default(), offset)
        } else {
            children(container)
                .take(offset as usize)
                .map(|c| node_size(&c))
                .sum()
        });
    }

    let mut count = 0;
    for child in children(container) {
        if child.contains(Some(target)) {
            if atomic_size(&child).is_some() {
                return Some(count);
            }
            return count_before(&child, target, offset).map(|inner| count + inner);
        }
        count += node_size(&child);
    }
    None
}

fn data_pos(node: &Node) -> Option<usize> {
    node.dyn_ref::<Element>()?
        .get_attribute("data-pos")?
        .parse()
        .ok()
}

/// Document position of a DOM point inside `root`.
pub fn dom_point_to_pos(root: &Element, node: &Node, offset: u32) -> Option<usize> {
    let root_node: &Node = root.as_ref();
    if root_node.is_same_node(Some(node)) {
        return root.child_nodes().item(offset).as_ref().and_then(data_pos);
    }

    let mut block = node.clone();
    loop {
        let parent = block.parent_node()?;
        if parent.is_same_node(Some(root_node)) {
            break;
        }
        block = parent;
    }

    let start = data_pos(&block)?;
    if atomic_size(&block).is_some() {
        return Some(start);
    }
    count_before(&block, node, offset).map(|count| start + 1 + count)
}

/// DOM point for a position `remaining` positions into `container`.
fn locate(container: &Node, mut remaining: usize) -> (Node, u32) {
    let mut index = 0;
    for child in children(container) {
        if is_text(&child) {
            let text = child.text_content().unwrap_or_default();
            let size = text.chars().count();
            if remaining <= size {
                let offset = chars_to_utf16(&text, remaining);
                return (child, offset);
            }
            remaining -= size;
        } else if remaining == 0 {
            return (container.clone(), index);
        } else if let Some(size) = atomic_size(&child) {
            remaining -= size.min(remaining);
        } else {
            let size = node_size(&child);
            if remaining <= size {
                return locate(&child, remaining);
            }
            remaining -= size;
        }
        index += 1;
    }
    (container.clone(), index)
}

/// DOM point for a document position, if its textblock is rendered.
pub fn pos_to_dom_point(root: &Element, doc: &Document, pos: usize) -> Option<(Node, u32)> {
    let span = doc.block_around(pos)?;
    let block = root
        .query_selector(&format!(":scope > [data-pos=\"{}\"]", span.start))
        .ok()??;
    let container: Node = if span.kind.is_code() {
        block.first_child()?
    } else {
        block.into()
    };
    Some(locate(&container, pos - span.content_start))
}

/// Read the window selection as a document selection, if it lies in `root`.
pub fn read_dom_selection(root: &Element) -> Option<Selection> {
    let selection = gloo_utils::window().get_selection().ok()??;
    let anchor = selection.anchor_node()?;
    let focus = selection.focus_node()?;
    if !root.contains(Some(&anchor)) || !root.contains(Some(&focus)) {
        return None;
    }
    let anchor = dom_point_to_pos(root, &anchor, selection.anchor_offset())?;
    let head = dom_point_to_pos(root, &focus, selection.focus_offset())?;
    Some(Selection::new(anchor, head))
}

/// Put the window selection where the document selection is.
pub fn write_dom_selection(root: &Element, doc: &Document, selection: Selection) -> Option<()> {
    let dom_selection = gloo_utils::window().get_selection().ok()??;
    if selection.is_node() {
        let node_view = root
            .query_selector(&format!("[data-pos=\"{}\"].{IMAGE_VIEW_CLASS}", selection.anchor))
            .ok()??;
        let range = gloo_utils::document().create_range().ok()?;
        range.select_node(&node_view).ok()?;
        dom_selection.remove_all_ranges().ok()?;
        return dom_selection.add_range(&range).ok();
    }

    let (anchor_node, anchor_offset) = pos_to_dom_point(root, doc, selection.anchor)?;
    let (focus_node, focus_offset) = pos_to_dom_point(root, doc, selection.head)?;
    dom_selection
        .set_base_and_extent(&anchor_node, anchor_offset, &focus_node, focus_offset)
        .ok()
}
