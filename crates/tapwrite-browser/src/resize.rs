//! Pointer wiring for image resize handles.
//!
//! A mousedown on a `.resize-trigger` starts a drag in the editor's resize
//! controller and attaches `mousemove`/`mouseup` listeners to
//! `document.body`. Mouseup ends the drag and detaches them. A mousedown
//! elsewhere on an image node view selects the node.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use web_sys::{Element, MouseEvent};

use tapwrite_core::{Point, ResizeSide, Selection, Size};

use crate::events::SharedEditor;

/// Body listeners of the drag in progress, if any.
pub type DragSlot = Rc<RefCell<Option<Vec<EventListener>>>>;

fn pointer(evt: &MouseEvent) -> Point {
    Point::new(f64::from(evt.client_x()), f64::from(evt.client_y()))
}

fn node_pos(node_view: &Element) -> Option<usize> {
    node_view.get_attribute("data-pos")?.parse().ok()
}

/// Drop the drag listeners once the current event has been handled.
fn detach(drag: &DragSlot) {
    if let Some(listeners) = drag.borrow_mut().take() {
        // One of them is running right now.
        wasm_bindgen_futures::spawn_local(async move { drop(listeners) });
    }
}

fn attach_drag(view: &SharedEditor, drag: &DragSlot) -> Vec<EventListener> {
    let body = gloo_utils::body();

    let on_move = {
        let view = view.clone();
        let drag = drag.clone();
        EventListener::new(&body, "mousemove", move |evt| {
            let evt = evt.unchecked_ref::<MouseEvent>();
            let Ok(mut view) = view.try_borrow_mut() else {
                return;
            };
            view.update(|editor| editor.resize_to(pointer(evt)));
            if !view.editor().is_resizing() {
                detach(&drag);
            }
        })
    };

    let on_up = {
        let view = view.clone();
        let drag = drag.clone();
        EventListener::new(&body, "mouseup", move |_| {
            if let Ok(mut view) = view.try_borrow_mut() {
                view.editor_mut().end_resize();
            }
            tracing::trace!(target: "tapwrite::browser", "resize ended");
            detach(&drag);
        })
    };

    vec![on_move, on_up]
}

pub(crate) fn handle_mousedown(view: &SharedEditor, drag: &DragSlot, evt: &MouseEvent) {
    let Some(target) = evt.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
        return;
    };

    if let Ok(Some(trigger)) = target.closest(".resize-trigger") {
        let side = trigger
            .get_attribute("data-side")
            .and_then(|s| s.parse::<ResizeSide>().ok());
        let node_view = trigger.closest(".image-resizer").ok().flatten();
        let (Some(side), Some(node_view)) = (side, node_view) else {
            return;
        };
        let Some(pos) = node_pos(&node_view) else {
            return;
        };
        let measured = node_view
            .query_selector("img")
            .ok()
            .flatten()
            .unwrap_or_else(|| node_view.clone());
        let rect = measured.get_bounding_client_rect();
        let rendered = Size::new(rect.width(), rect.height());

        let started = view
            .try_borrow_mut()
            .map(|mut v| v.editor_mut().begin_resize(side, pos, pointer(evt), rendered))
            .unwrap_or(false);
        if started {
            evt.prevent_default();
            let listeners = attach_drag(view, drag);
            *drag.borrow_mut() = Some(listeners);
        }
        return;
    }

    if let Ok(Some(node_view)) = target.closest(".image-resizer") {
        let Some(pos) = node_pos(&node_view) else {
            return;
        };
        if let Ok(mut view) = view.try_borrow_mut() {
            if view.editor().is_editable() {
                evt.prevent_default();
                view.update(|editor| editor.set_selection(Selection::node(pos)));
            }
        }
    }
}
