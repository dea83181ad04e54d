//! Pointer-gesture translation.
//!
//! Tools turn raw pointer begin/move/end events from the host (already in
//! canvas coordinates) into controller actions. They hold only per-gesture
//! state; all graph knowledge stays in the controller.

use crate::controller::CanvasController;
use crate::pool::ConnectionRequest;
use slate_core::{Anchor, ElementId, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
    };
}

/// A raw pointer event in canvas space.
#[derive(Debug, Clone, Copy)]
pub enum PointerEvent {
    Down { position: Point, modifiers: Modifiers },
    Move { position: Point, modifiers: Modifiers },
    Up { position: Point, modifiers: Modifiers },
}

/// What the pointer is over, as reported by the host's hit-testing.
#[derive(Debug, Clone, Copy)]
pub struct Hit {
    pub element: ElementId,
    /// Set when the pointer is over a connection handle rather than the
    /// element body.
    pub anchor: Option<Anchor>,
}

/// An action for the controller, produced by a tool from one input event.
#[derive(Debug, Clone)]
pub enum ToolAction {
    Select(Vec<ElementId>),
    BeginDrag(ElementId),
    DragBy { id: ElementId, dx: f32, dy: f32 },
    EndDrag(ElementId),
    Duplicate(ElementId),
    Connect(ConnectionRequest),
}

/// Apply a batch of tool actions to the controller. Rejections (locked
/// layers, duplicate connections) surface as no-ops here, matching the
/// engine's failure semantics.
pub fn apply_actions(controller: &mut CanvasController, actions: Vec<ToolAction>) {
    for action in actions {
        match action {
            ToolAction::Select(ids) => controller.select(&ids),
            ToolAction::BeginDrag(id) => {
                let _ = controller.begin_drag(id);
            }
            ToolAction::DragBy { id, dx, dy } => {
                let _ = controller.drag_by(id, dx, dy);
            }
            ToolAction::EndDrag(id) => controller.end_drag(id),
            ToolAction::Duplicate(id) => {
                controller.duplicate_elements(&[id]);
            }
            ToolAction::Connect(request) => {
                let _ = controller.connect(request);
            }
        }
    }
}

/// Trait for tools that interpret input events.
pub trait Tool {
    fn handle(&mut self, event: &PointerEvent, hit: Option<Hit>) -> Vec<ToolAction>;
}

// ─── Select tool ─────────────────────────────────────────────────────────

/// Click to select, shift-click to toggle, drag to move the selection.
/// Alt+press duplicates before dragging.
#[derive(Default)]
pub struct SelectTool {
    selected: Vec<ElementId>,
    dragging: Option<ElementId>,
    last: Point,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &[ElementId] {
        &self.selected
    }
}

impl Tool for SelectTool {
    fn handle(&mut self, event: &PointerEvent, hit: Option<Hit>) -> Vec<ToolAction> {
        match event {
            PointerEvent::Down {
                position,
                modifiers,
            } => {
                let Some(hit) = hit else {
                    // Empty space: clear selection, no drag.
                    self.selected.clear();
                    self.dragging = None;
                    return vec![ToolAction::Select(Vec::new())];
                };

                if modifiers.shift {
                    if let Some(pos) = self.selected.iter().position(|id| *id == hit.element) {
                        self.selected.remove(pos);
                    } else {
                        self.selected.push(hit.element);
                    }
                } else if !self.selected.contains(&hit.element) {
                    self.selected = vec![hit.element];
                }
                // Press on an already-selected element keeps the selection.

                self.last = *position;
                self.dragging = Some(hit.element);

                let mut actions = vec![ToolAction::Select(self.selected.clone())];
                if modifiers.alt {
                    actions.push(ToolAction::Duplicate(hit.element));
                } else {
                    actions.push(ToolAction::BeginDrag(hit.element));
                }
                actions
            }
            PointerEvent::Move {
                position,
                modifiers,
            } => {
                let Some(_primary) = self.dragging else {
                    return vec![];
                };
                let mut dx = position.x - self.last.x;
                let mut dy = position.y - self.last.y;
                self.last = *position;

                // Shift: constrain to the dominant axis.
                if modifiers.shift {
                    if dx.abs() > dy.abs() {
                        dy = 0.0;
                    } else {
                        dx = 0.0;
                    }
                }

                self.selected
                    .iter()
                    .map(|&id| ToolAction::DragBy { id, dx, dy })
                    .collect()
            }
            PointerEvent::Up { .. } => match self.dragging.take() {
                Some(primary) => vec![ToolAction::EndDrag(primary)],
                None => vec![],
            },
        }
    }
}

// ─── Connect tool ────────────────────────────────────────────────────────

/// Drag from one element's handle to another element. The request is
/// emitted on release; rapid duplicate events between the same pair are
/// absorbed by the connection pool.
#[derive(Default)]
pub struct ConnectTool {
    source: Option<(ElementId, Option<Anchor>)>,
}

impl ConnectTool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tool for ConnectTool {
    fn handle(&mut self, event: &PointerEvent, hit: Option<Hit>) -> Vec<ToolAction> {
        match event {
            PointerEvent::Down { .. } => {
                self.source = hit.map(|h| (h.element, h.anchor));
                vec![]
            }
            PointerEvent::Move { .. } => vec![], // live preview is a render concern
            PointerEvent::Up { .. } => {
                let Some((source, source_anchor)) = self.source.take() else {
                    return vec![];
                };
                let Some(hit) = hit else {
                    return vec![]; // released over empty space
                };
                if hit.element == source {
                    return vec![]; // self-loop, not a connection
                }
                let mut request = ConnectionRequest::new(source, hit.element);
                request.source_anchor = source_anchor;
                request.target_anchor = hit.anchor;
                vec![ToolAction::Connect(request)]
            }
        }
    }
}
