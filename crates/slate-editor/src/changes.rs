//! Graph change sets and their significance classification.
//!
//! A change is *significant* (worth propagating to the external source of
//! truth) or *transient* (an in-progress gesture frame that stays local).
//! The single transient case is a position update flagged as still
//! dragging; everything structural is significant.

use slate_core::{Connection, ConnectionId, Element, ElementId, Point, Size, Style};

/// A structural or positional change to the node set.
#[derive(Debug, Clone)]
pub enum NodeChange {
    Add(Box<Element>),
    Remove(ElementId),
    Position {
        id: ElementId,
        to: Point,
        /// True for intermediate frames of an active drag. Transient:
        /// updates interactive render state only.
        dragging: bool,
    },
    Resize {
        id: ElementId,
        to: Size,
    },
    SetLabel {
        id: ElementId,
        label: Option<String>,
    },
    SetStyle {
        id: ElementId,
        style: Style,
    },
}

impl NodeChange {
    /// Whether this change must be propagated to the external graph.
    pub fn is_significant(&self) -> bool {
        !matches!(self, NodeChange::Position { dragging: true, .. })
    }

    /// The element this change targets, if it targets an existing one.
    pub fn target(&self) -> Option<ElementId> {
        match self {
            NodeChange::Add(_) => None,
            NodeChange::Remove(id)
            | NodeChange::Position { id, .. }
            | NodeChange::Resize { id, .. }
            | NodeChange::SetLabel { id, .. }
            | NodeChange::SetStyle { id, .. } => Some(*id),
        }
    }
}

/// A structural change to the edge set. Always significant.
#[derive(Debug, Clone)]
pub enum EdgeChange {
    Add(Box<Connection>),
    Remove(ConnectionId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dragging_position_is_transient() {
        let id = ElementId::intern("moving");
        let transient = NodeChange::Position {
            id,
            to: Point::new(10.0, 10.0),
            dragging: true,
        };
        let settled = NodeChange::Position {
            id,
            to: Point::new(10.0, 10.0),
            dragging: false,
        };
        assert!(!transient.is_significant());
        assert!(settled.is_significant());
    }

    #[test]
    fn structural_changes_are_significant() {
        let remove = NodeChange::Remove(ElementId::intern("gone"));
        assert!(remove.is_significant());
        let resize = NodeChange::Resize {
            id: ElementId::intern("grown"),
            to: Size::new(50.0, 50.0),
        };
        assert!(resize.is_significant());
    }
}
