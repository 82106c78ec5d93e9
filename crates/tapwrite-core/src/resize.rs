//! Drag-to-resize for image nodes.
//!
//! The controller is a two-state machine, `Idle` and `Dragging`. The browser
//! layer feeds it pointer coordinates and applies the sizes it returns as
//! live attribute updates on the image node.

use std::str::FromStr;

use crate::error::StepError;
use crate::image::Dimension;
use crate::state::{EditorState, Transaction};
use crate::transform::Mapping;
use crate::types::Affinity;

/// Smallest width or height a drag can produce, in pixels.
pub const MIN_IMAGE_SIZE: f64 = 200.0;

/// History group for live resize updates.
pub const RESIZE_GROUP: &str = "resize";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeSide {
    Left,
    Right,
}

impl FromStr for ResizeSide {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(ResizeSide::Left),
            "right" => Ok(ResizeSide::Right),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ResizeState {
    #[default]
    Idle,
    Dragging {
        side: ResizeSide,
        /// Position of the image node being resized.
        node_pos: usize,
        start_pointer: Point,
        start_size: Size,
    },
}

/// Size for a drag from `start_pointer` to `pointer`.
///
/// The right handle grows with the pointer on both axes. The left handle
/// grows as the pointer moves left; height follows the pointer like the
/// right handle. Both axes are floored at [`MIN_IMAGE_SIZE`].
pub fn compute_size(side: ResizeSide, start_pointer: Point, start_size: Size, pointer: Point) -> Size {
    let width = match side {
        ResizeSide::Right => start_size.width + (pointer.x - start_pointer.x),
        ResizeSide::Left => start_size.width + (start_pointer.x - pointer.x),
    };
    let height = start_size.height + (pointer.y - start_pointer.y);
    Size {
        width: width.max(MIN_IMAGE_SIZE),
        height: height.max(MIN_IMAGE_SIZE),
    }
}

#[derive(Debug, Default)]
pub struct ResizeController {
    state: ResizeState,
}

impl ResizeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ResizeState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ResizeState::Dragging { .. })
    }

    /// Start a drag. Returns false if a drag is already running.
    pub fn pointer_down(&mut self, side: ResizeSide, node_pos: usize, pointer: Point, rendered: Size) -> bool {
        if self.is_dragging() {
            return false;
        }
        tracing::trace!(target: "tapwrite::resize", ?side, node_pos, "resize started");
        self.state = ResizeState::Dragging {
            side,
            node_pos,
            start_pointer: pointer,
            start_size: rendered,
        };
        true
    }

    /// Node position and new size for a pointer move, if dragging.
    pub fn pointer_move(&self, pointer: Point) -> Option<(usize, Size)> {
        match self.state {
            ResizeState::Idle => None,
            ResizeState::Dragging {
                side,
                node_pos,
                start_pointer,
                start_size,
            } => Some((node_pos, compute_size(side, start_pointer, start_size, pointer))),
        }
    }

    /// Follow the dragged node through a document change. Ends the drag
    /// if the node was deleted.
    pub fn map_through(&mut self, mapping: &Mapping) {
        let ResizeState::Dragging { node_pos, .. } = &mut self.state else {
            return;
        };
        let mapped = mapping.map_result(*node_pos, Affinity::After);
        if mapped.deleted {
            tracing::trace!(target: "tapwrite::resize", "resized node deleted, ending drag");
            self.state = ResizeState::Idle;
        } else {
            *node_pos = mapped.pos;
        }
    }

    /// End the drag. Returns whether one was running.
    pub fn pointer_up(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.state = ResizeState::Idle;
        was_dragging
    }
}

/// Transaction writing `size` to the image at `pos`.
pub fn resize_transaction(state: &EditorState, pos: usize, size: Size) -> Result<Transaction, StepError> {
    let attrs = state
        .doc()
        .image_at(pos)
        .ok_or(StepError::NotAnImage(pos))?
        .clone()
        .with_size(Dimension::Px(size.width as f32), Dimension::Px(size.height as f32));
    let mut tr = state.tr();
    tr.set_image_attrs(pos, attrs)?;
    tr.set_history_group(RESIZE_GROUP);
    Ok(tr)
}
