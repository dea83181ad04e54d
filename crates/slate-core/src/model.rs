//! Core diagram data model.
//!
//! The diagram is a flat graph: elements (shapes) are nodes, connections are
//! directed edge weights between them. `petgraph::StableDiGraph` keeps
//! indices stable across removals, and removing a node removes its incident
//! edges in the same operation — which is exactly the cascade-delete
//! invariant the editor relies on.
//!
//! Style payloads are opaque to this crate: they are carried verbatim
//! through every mutation and never interpreted. A revision counter
//! (`style_rev`) lets the reconciliation equality check stay O(n) without
//! deep-comparing style records.

use crate::error::Rejection;
use crate::id::{ConnectionId, ElementId, LayerId, ShapeTag};
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Elements may not be resized below this edge length (diagram units).
pub const MIN_ELEMENT_SIZE: f32 = 10.0;

// ─── Geometry ────────────────────────────────────────────────────────────

/// A point in diagram (not screen) coordinates. Screen↔diagram conversion
/// is owned by the host's viewport service.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions meet [`MIN_ELEMENT_SIZE`].
    pub fn meets_minimum(&self) -> bool {
        self.width >= MIN_ELEMENT_SIZE && self.height >= MIN_ELEMENT_SIZE
    }
}

// ─── Style ───────────────────────────────────────────────────────────────

/// Open record of visual attributes. Consumed by rendering, not by the
/// engine — preserved verbatim through every mutation. Attributes the
/// known fields don't cover ride along in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f32>,
    pub opacity: Option<f32>,
    pub corner_radius: Option<f32>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub font_weight: Option<u16>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, String>,
}

// ─── Elements ────────────────────────────────────────────────────────────

/// Anchor-point identifier on an element's bounding box, disambiguating
/// which side a connection attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Anchor {
    Top,
    Right,
    Bottom,
    Left,
}

/// A positioned, sized, styled diagram object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub shape: ShapeTag,
    pub position: Point,
    pub size: Size,
    pub style: Style,
    /// Bumped on every style write. The reconciliation equality check
    /// compares this marker instead of the style payload itself.
    pub style_rev: u64,
    /// Z-order key. Not necessarily integer — single-step reorder moves
    /// assign fractional values to touch O(1) elements.
    pub z: f32,
    /// Owning layer. Lock/visibility are authoritative from the layer.
    pub layer: LayerId,
    pub label: Option<String>,
    /// Transient selection flag. Not part of the persisted observation set.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
}

impl Element {
    pub fn new(id: ElementId, shape: ShapeTag, position: Point, size: Size) -> Self {
        Self {
            id,
            shape,
            position,
            size,
            style: Style::default(),
            style_rev: 0,
            z: 0.0,
            layer: crate::layers::default_layer(),
            label: None,
            selected: false,
        }
    }

    /// Replace the style payload and bump the revision marker.
    pub fn set_style(&mut self, style: Style) {
        self.style = style;
        self.style_rev += 1;
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// A directed link between two elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: ElementId,
    pub target: ElementId,
    pub source_anchor: Option<Anchor>,
    pub target_anchor: Option<Anchor>,
    pub label: Option<String>,
    pub style: Style,
}

impl Connection {
    pub fn new(id: ConnectionId, source: ElementId, target: ElementId) -> Self {
        Self {
            id,
            source,
            target,
            source_anchor: None,
            target_anchor: None,
            label: None,
            style: Style::default(),
        }
    }
}

// ─── Snapshots ───────────────────────────────────────────────────────────

/// The value exchanged with the external source-of-truth graph: a full
/// coalesced node and edge list. Self-contained apart from layer ids and
/// connection endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Element>,
    pub edges: Vec<Connection>,
}

// ─── Diagram graph ───────────────────────────────────────────────────────

/// The interactive diagram graph: elements as nodes, connections as edges.
#[derive(Debug, Clone, Default)]
pub struct DiagramGraph {
    graph: StableDiGraph<Element, Connection>,
    id_index: HashMap<ElementId, NodeIndex>,
    edge_index: HashMap<ConnectionId, EdgeIndex>,
}

impl DiagramGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from an external snapshot. Connections whose endpoints
    /// are missing from the node list are dropped silently (logged) — a
    /// corrupt or truncated external graph must not poison the session.
    #[must_use]
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut graph = Self::new();
        for element in &snapshot.nodes {
            graph.add_element(element.clone());
        }
        for connection in &snapshot.edges {
            if let Err(why) = graph.connect(connection.clone()) {
                log::warn!(
                    "dropping connection {} from external snapshot: {why}",
                    connection.id
                );
            }
        }
        graph
    }

    /// Full copy of the current graph, nodes in paint order, edges sorted
    /// by id. Deterministic for a given graph content.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .paint_order()
            .into_iter()
            .filter_map(|id| self.get(id).cloned())
            .collect();
        let mut edges: Vec<Connection> = self.connections().cloned().collect();
        edges.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        GraphSnapshot { nodes, edges }
    }

    /// Insert an element. Ids are unique for the lifetime of the diagram;
    /// inserting an id that is already present replaces the element.
    pub fn add_element(&mut self, element: Element) -> ElementId {
        let id = element.id;
        if let Some(&idx) = self.id_index.get(&id) {
            self.graph[idx] = element;
        } else {
            let idx = self.graph.add_node(element);
            self.id_index.insert(id, idx);
        }
        id
    }

    /// Remove an element, cascading to its incident connections in the same
    /// transaction. Returns the element and the ids of the removed
    /// connections, or `None` if the id is unknown.
    pub fn remove_element(&mut self, id: ElementId) -> Option<(Element, SmallVec<[ConnectionId; 4]>)> {
        let idx = *self.id_index.get(&id)?;
        let mut cascaded: SmallVec<[ConnectionId; 4]> = SmallVec::new();
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(idx, direction) {
                cascaded.push(edge.weight().id);
            }
        }
        for connection_id in &cascaded {
            self.edge_index.remove(connection_id);
        }
        let element = self.graph.remove_node(idx)?;
        self.id_index.remove(&id);
        Some((element, cascaded))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.id_index.get(&id).copied().map(|idx| &mut self.graph[idx])
    }

    /// Insert a connection after validating referential integrity.
    pub fn connect(&mut self, connection: Connection) -> Result<ConnectionId, Rejection> {
        if connection.source == connection.target {
            return Err(Rejection::SelfLoop);
        }
        let source = *self
            .id_index
            .get(&connection.source)
            .ok_or(Rejection::UnknownElement)?;
        let target = *self
            .id_index
            .get(&connection.target)
            .ok_or(Rejection::UnknownElement)?;
        let id = connection.id;
        let edge = self.graph.add_edge(source, target, connection);
        self.edge_index.insert(id, edge);
        Ok(id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> Option<Connection> {
        let edge = self.edge_index.remove(&id)?;
        self.graph.remove_edge(edge)
    }

    /// The directed connection from `source` to `target`, if one exists.
    /// Direction-sensitive: `(a, b)` and `(b, a)` are distinct.
    pub fn connection_between(&self, source: ElementId, target: ElementId) -> Option<&Connection> {
        let (s, t) = (
            *self.id_index.get(&source)?,
            *self.id_index.get(&target)?,
        );
        self.graph
            .find_edge(s, t)
            .and_then(|edge| self.graph.edge_weight(edge))
    }

    /// Ids of all connections incident to an element, either direction.
    pub fn connections_of(&self, id: ElementId) -> SmallVec<[ConnectionId; 4]> {
        let Some(&idx) = self.id_index.get(&id) else {
            return SmallVec::new();
        };
        let mut incident = SmallVec::new();
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(idx, direction) {
                incident.push(edge.weight().id);
            }
        }
        incident
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.graph.node_weights()
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.graph.node_weights_mut()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.graph.edge_weights()
    }

    pub fn element_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Replace the selection with the given ids. Unknown ids are ignored.
    pub fn set_selection(&mut self, ids: &[ElementId]) {
        for element in self.elements_mut() {
            element.selected = ids.contains(&element.id);
        }
    }

    pub fn clear_selection(&mut self) {
        for element in self.elements_mut() {
            element.selected = false;
        }
    }

    pub fn selected_elements(&self) -> Vec<&Element> {
        self.elements().filter(|e| e.selected).collect()
    }

    // ─── Reconciliation equality ─────────────────────────────────────────

    /// Shallow structural equality against an external snapshot, evaluated
    /// over the observed fields only: id sets, position, size, label, z,
    /// layer, style revision, and connection endpoints. O(n); arbitrary
    /// style payloads are not deep-compared. `selected` is transient and
    /// excluded.
    #[must_use]
    pub fn observes_same(&self, snapshot: &GraphSnapshot) -> bool {
        if self.element_count() != snapshot.nodes.len()
            || self.connection_count() != snapshot.edges.len()
        {
            return false;
        }
        for node in &snapshot.nodes {
            let Some(ours) = self.get(node.id) else {
                return false;
            };
            if ours.position != node.position
                || ours.size != node.size
                || ours.label != node.label
                || ours.z != node.z
                || ours.layer != node.layer
                || ours.style_rev != node.style_rev
                || ours.shape != node.shape
            {
                return false;
            }
        }
        for edge in &snapshot.edges {
            let Some(&idx) = self.edge_index.get(&edge.id) else {
                return false;
            };
            let Some(ours) = self.graph.edge_weight(idx) else {
                return false;
            };
            if ours.source != edge.source || ours.target != edge.target {
                return false;
            }
        }
        true
    }
}
