//! Canvas controller: reconciliation between the externally-owned diagram
//! graph and the interactive render graph.
//!
//! The external graph (undo stack, persistence, property panel) is the
//! source of truth; the interactive graph is the low-latency copy mutated
//! by gestures. The two may differ only while a gesture is in progress.
//! Reconciliation is total and explicit:
//!
//! - **Inbound** (`apply_external_graph`): adopt the snapshot, unless a
//!   drag is active (stash it, latest wins, adopt at `end_drag`) or the
//!   interactive graph already observes the same content (no-op).
//! - **Outbound** (`on_graph_changed`): the sole write path to external
//!   state. Significant changes schedule a flush on the next frame tick;
//!   each flush publishes one full coalesced snapshot.

use crate::changes::{EdgeChange, NodeChange};
use crate::pool::{ConnectionPool, ConnectionRequest};
use crate::scheduler::FrameScheduler;
use slate_core::{
    Connection, ConnectionId, DiagramGraph, Element, ElementId, GraphSnapshot, LayerBridge,
    LayerId, LayerSet, NewElement, Point, Rejection, ShapeRegistry, ShapeTag, default_layer,
    move_to_layer,
};
use std::collections::HashMap;

/// Visual offset applied to duplicated elements.
pub const DUPLICATE_OFFSET: f32 = 20.0;

/// Callback into the external source of truth, invoked on every flushed
/// significant change.
pub type GraphChanged = Box<dyn FnMut(&GraphSnapshot)>;

/// Observable reconciliation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Interactive and external graphs agree; nothing scheduled.
    Idle,
    /// A drag gesture is in progress; inbound snapshots are stashed.
    Dragging,
    /// A significant change awaits the next frame tick.
    FlushPending,
}

pub struct CanvasController {
    graph: DiagramGraph,
    layers: LayerSet,
    pool: ConnectionPool,
    scheduler: FrameScheduler,
    /// Element currently being dragged, if any.
    drag: Option<ElementId>,
    /// Latest external snapshot received mid-drag. Only the most recent
    /// survives; adopted when the gesture ends.
    deferred_external: Option<GraphSnapshot>,
    on_graph_changed: GraphChanged,
}

impl CanvasController {
    pub fn new(on_graph_changed: impl FnMut(&GraphSnapshot) + 'static) -> Self {
        Self {
            graph: DiagramGraph::new(),
            layers: LayerSet::new(),
            pool: ConnectionPool::default(),
            scheduler: FrameScheduler::new(),
            drag: None,
            deferred_external: None,
            on_graph_changed: Box::new(on_graph_changed),
        }
    }

    pub fn state(&self) -> SyncState {
        if self.drag.is_some() {
            SyncState::Dragging
        } else if self.scheduler.is_pending() {
            SyncState::FlushPending
        } else {
            SyncState::Idle
        }
    }

    /// The interactive graph, read on demand by the renderer and the
    /// property panel.
    pub fn graph(&self) -> &DiagramGraph {
        &self.graph
    }

    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    /// Currently selected elements (property-panel read surface).
    pub fn selection(&self) -> Vec<&Element> {
        self.graph.selected_elements()
    }

    pub fn select(&mut self, ids: &[ElementId]) {
        self.graph.set_selection(ids);
    }

    fn is_locked(&self, id: ElementId) -> bool {
        LayerBridge::new(&self.layers, &self.graph).is_locked(id)
    }

    // ─── Inbound: external graph → interactive graph ─────────────────────

    /// Replace interactive state with an external snapshot.
    ///
    /// Suppressed while a drag is in progress (the snapshot is stashed,
    /// latest wins) so pointer feedback is never overwritten mid-gesture.
    /// A snapshot the interactive graph already observes is a no-op,
    /// avoiding redundant downstream renders.
    pub fn apply_external_graph(&mut self, snapshot: GraphSnapshot) {
        if self.drag.is_some() {
            log::debug!("external snapshot deferred: drag in progress");
            self.deferred_external = Some(snapshot);
            return;
        }
        if self.graph.observes_same(&snapshot) {
            log::trace!("external snapshot observes same content, skipping");
            return;
        }
        self.adopt(snapshot);
    }

    fn adopt(&mut self, snapshot: GraphSnapshot) {
        log::debug!(
            "adopting external graph: {} nodes, {} edges",
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        self.graph = DiagramGraph::from_snapshot(&snapshot);
        self.pool.rebuild(self.graph.connections());
        // External replacement supersedes any unflushed local changes.
        self.scheduler.cancel();
    }

    // ─── Gestures ────────────────────────────────────────────────────────

    /// Mark a drag gesture as started. While active, inbound snapshots are
    /// deferred and position frames stay local.
    pub fn begin_drag(&mut self, id: ElementId) -> Result<(), Rejection> {
        if !self.graph.contains(id) {
            return Err(Rejection::UnknownElement);
        }
        if self.is_locked(id) {
            return Err(Rejection::LockedLayer);
        }
        self.drag = Some(id);
        Ok(())
    }

    /// Apply one transient drag frame. Interactive state only; nothing is
    /// scheduled for propagation.
    pub fn drag_by(&mut self, id: ElementId, dx: f32, dy: f32) -> Result<(), Rejection> {
        if self.is_locked(id) {
            return Err(Rejection::LockedLayer);
        }
        match self.graph.get_mut(id) {
            Some(element) => {
                element.position = element.position.offset(dx, dy);
                Ok(())
            }
            None => Err(Rejection::UnknownElement),
        }
    }

    /// End the gesture: adopt the latest deferred external snapshot (if
    /// any), re-apply the final interactive positions of the dragged
    /// selection on top, and publish immediately — exactly once.
    pub fn end_drag(&mut self, id: ElementId) {
        if self.drag != Some(id) {
            return;
        }
        self.drag = None;

        // Final interactive positions of everything the gesture moved:
        // the dragged element plus the rest of the selection.
        let mut final_positions: HashMap<ElementId, Point> = self
            .graph
            .selected_elements()
            .iter()
            .map(|e| (e.id, e.position))
            .collect();
        if let Some(element) = self.graph.get(id) {
            final_positions.insert(id, element.position);
        }

        if let Some(snapshot) = self.deferred_external.take() {
            self.adopt(snapshot);
            for (element_id, position) in final_positions {
                if let Some(element) = self.graph.get_mut(element_id) {
                    element.position = position;
                }
            }
        }

        // The immediate publish covers any flush still scheduled.
        self.scheduler.cancel();
        self.publish();
    }

    // ─── Local mutations ─────────────────────────────────────────────────

    /// Apply a batch of node changes in arrival order. Rejected changes
    /// (locked layer, unknown id, below-minimum resize) are per-change
    /// no-ops. Significant changes schedule a flush; transient drag frames
    /// update interactive state only.
    pub fn mutate_nodes(&mut self, changes: Vec<NodeChange>) {
        let mut significant = false;
        for change in changes {
            match self.apply_node_change(&change) {
                Ok(()) => significant |= change.is_significant(),
                Err(why) => log::debug!("node change rejected: {why}"),
            }
        }
        if significant {
            self.scheduler.schedule();
        }
    }

    fn apply_node_change(&mut self, change: &NodeChange) -> Result<(), Rejection> {
        match change {
            NodeChange::Add(element) => {
                self.graph.add_element((**element).clone());
                Ok(())
            }
            NodeChange::Remove(id) => {
                if !self.graph.contains(*id) {
                    return Ok(()); // delete of a missing id is a no-op
                }
                if self.is_locked(*id) {
                    return Err(Rejection::LockedLayer);
                }
                self.remove_with_cascade(*id);
                Ok(())
            }
            NodeChange::Position { id, to, .. } => {
                if self.is_locked(*id) {
                    return Err(Rejection::LockedLayer);
                }
                let element = self.graph.get_mut(*id).ok_or(Rejection::UnknownElement)?;
                element.position = *to;
                Ok(())
            }
            NodeChange::Resize { id, to } => {
                if !to.meets_minimum() {
                    return Err(Rejection::BelowMinSize);
                }
                if self.is_locked(*id) {
                    return Err(Rejection::LockedLayer);
                }
                let element = self.graph.get_mut(*id).ok_or(Rejection::UnknownElement)?;
                element.size = *to;
                Ok(())
            }
            NodeChange::SetLabel { id, label } => {
                let element = self.graph.get_mut(*id).ok_or(Rejection::UnknownElement)?;
                element.label = label.clone();
                Ok(())
            }
            NodeChange::SetStyle { id, style } => {
                let element = self.graph.get_mut(*id).ok_or(Rejection::UnknownElement)?;
                element.set_style(style.clone());
                Ok(())
            }
        }
    }

    /// Apply a batch of edge changes. Always significant. Adds go through
    /// the pool's existence index like gesture connects, so a programmatic
    /// duplicate for an already-connected pair is refused instead of
    /// desyncing the index from the graph.
    pub fn mutate_edges(&mut self, changes: Vec<EdgeChange>) {
        let mut applied = false;
        for change in changes {
            match change {
                EdgeChange::Add(connection) => match self.add_edge(&connection) {
                    Ok(()) => {
                        self.pool.track(&connection);
                        applied = true;
                    }
                    Err(why) => log::debug!("edge add rejected: {why}"),
                },
                EdgeChange::Remove(id) => {
                    if self.graph.remove_connection(id).is_some() {
                        self.pool.remove(id);
                        applied = true;
                    }
                }
            }
        }
        if applied {
            self.scheduler.schedule();
        }
    }

    fn add_edge(&mut self, connection: &Connection) -> Result<(), Rejection> {
        if self.pool.has(connection.source, connection.target) {
            return Err(Rejection::DuplicateConnection);
        }
        self.graph.connect(connection.clone())?;
        Ok(())
    }

    // ─── Connections ─────────────────────────────────────────────────────

    /// Route a connect gesture through the pool. Duplicates and self-loops
    /// are rejected without corrupting state; accepted requests are
    /// materialized at the next tick, or immediately once the pool buffer
    /// is full.
    pub fn connect(&mut self, request: ConnectionRequest) -> Result<(), Rejection> {
        if !self.graph.contains(request.source) || !self.graph.contains(request.target) {
            return Err(Rejection::UnknownElement);
        }
        self.pool.add(request)?;
        if self.pool.needs_immediate_flush() {
            self.materialize_connections();
        }
        self.scheduler.schedule();
        Ok(())
    }

    /// Turn buffered requests into graph edges. Requests whose endpoints
    /// vanished since acceptance are dropped.
    fn materialize_connections(&mut self) {
        for request in self.pool.drain_pending() {
            let mut connection = Connection::new(
                ConnectionId::fresh("conn"),
                request.source,
                request.target,
            );
            connection.source_anchor = request.source_anchor;
            connection.target_anchor = request.target_anchor;
            connection.label = request.label;
            match self.graph.connect(connection.clone()) {
                Ok(_) => self.pool.track(&connection),
                Err(why) => log::warn!(
                    "dropping buffered connection {} -> {}: {why}",
                    connection.source,
                    connection.target
                ),
            }
        }
    }

    // ─── Structural commands ─────────────────────────────────────────────

    /// Delete elements, cascading to incident connections in the same
    /// transaction. Locked elements are refused; unknown ids are no-ops.
    pub fn delete_elements(&mut self, ids: &[ElementId]) {
        let mut removed = false;
        for &id in ids {
            if !self.graph.contains(id) {
                continue;
            }
            if self.is_locked(id) {
                log::debug!("delete refused, layer locked: {id}");
                continue;
            }
            self.remove_with_cascade(id);
            removed = true;
        }
        if removed {
            self.scheduler.schedule();
        }
    }

    fn remove_with_cascade(&mut self, id: ElementId) {
        if let Some((_, cascaded)) = self.graph.remove_element(id) {
            for connection_id in cascaded {
                self.pool.remove(connection_id);
            }
        }
    }

    /// Duplicate elements with a fixed visual offset. The duplicates get
    /// fresh ids, stack above everything else, and become the sole
    /// selection. Locked elements are refused.
    pub fn duplicate_elements(&mut self, ids: &[ElementId]) -> Vec<ElementId> {
        let mut clones: Vec<Element> = Vec::new();
        for &id in ids {
            if self.is_locked(id) {
                log::debug!("duplicate refused, layer locked: {id}");
                continue;
            }
            if let Some(original) = self.graph.get(id) {
                let mut clone = original.clone();
                clone.id = ElementId::fresh(clone.shape.as_str());
                clone.position = clone.position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET);
                clones.push(clone);
            }
        }
        if clones.is_empty() {
            return Vec::new();
        }

        let mut z = self.graph.max_z().map_or(0.0, |m| m.floor() + 1.0);
        let mut new_ids = Vec::with_capacity(clones.len());
        for mut clone in clones {
            clone.z = z;
            z += 1.0;
            new_ids.push(self.graph.add_element(clone));
        }
        self.graph.set_selection(&new_ids);
        self.scheduler.schedule();
        new_ids
    }

    /// Palette drop: construct an element from registry defaults at a
    /// canvas-space position (already converted by the host's viewport
    /// service) and insert it as a significant change.
    pub fn drop_shape(&mut self, tag: ShapeTag, position: Point) -> ElementId {
        let mut element = ShapeRegistry::global().create_element(
            tag,
            NewElement {
                position,
                ..NewElement::default()
            },
        );
        element.z = self.graph.max_z().map_or(0.0, |m| m.floor() + 1.0);
        let id = self.graph.add_element(element);
        self.graph.set_selection(&[id]);
        self.scheduler.schedule();
        id
    }

    // ─── Z-order commands ────────────────────────────────────────────────

    pub fn bring_to_front(&mut self, ids: &[ElementId]) {
        if self.graph.bring_to_front(ids) {
            self.scheduler.schedule();
        }
    }

    pub fn send_to_back(&mut self, ids: &[ElementId]) {
        if self.graph.send_to_back(ids) {
            self.scheduler.schedule();
        }
    }

    pub fn bring_forward(&mut self, id: ElementId) {
        if self.graph.bring_forward(id) {
            self.scheduler.schedule();
        }
    }

    pub fn send_backward(&mut self, id: ElementId) {
        if self.graph.send_backward(id) {
            self.scheduler.schedule();
        }
    }

    // ─── Layer surface ───────────────────────────────────────────────────

    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        self.layers.add(name)
    }

    /// Remove a layer; its members fall back to the default layer.
    pub fn remove_layer(&mut self, id: LayerId) {
        if !self.layers.remove(id) {
            return;
        }
        let mut reassigned = false;
        for element in self.graph.elements_mut() {
            if element.layer == id {
                element.layer = default_layer();
                reassigned = true;
            }
        }
        if reassigned {
            self.scheduler.schedule();
        }
    }

    pub fn set_layer_locked(&mut self, id: LayerId, locked: bool) {
        self.layers.set_locked(id, locked);
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) {
        self.layers.set_visible(id, visible);
    }

    pub fn move_to_layer(&mut self, ids: &[ElementId], target: LayerId) -> Result<(), Rejection> {
        move_to_layer(&self.layers, &mut self.graph, ids, target)?;
        self.scheduler.schedule();
        Ok(())
    }

    // ─── Frame tick & teardown ───────────────────────────────────────────

    /// Host animation-frame tick: materialize buffered connections, then
    /// fire the due flush (at most one per tick, always the newest).
    pub fn on_frame(&mut self) {
        if self.pool.has_pending() {
            self.materialize_connections();
        }
        if self.scheduler.take_due().is_some() {
            self.publish();
        }
    }

    fn publish(&mut self) {
        let snapshot = self.graph.snapshot();
        log::trace!(
            "publishing {} nodes, {} edges",
            snapshot.nodes.len(),
            snapshot.edges.len()
        );
        (self.on_graph_changed)(&snapshot);
    }

    /// Teardown: cancel the pending flush and the pool's buffer. Must be
    /// called when the hosting view goes away; safe to call twice.
    pub fn cleanup(&mut self) {
        self.scheduler.cancel();
        self.pool.cleanup();
        self.drag = None;
        self.deferred_external = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use slate_core::Size;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn controller() -> (CanvasController, Rc<RefCell<Vec<GraphSnapshot>>>) {
        let published: Rc<RefCell<Vec<GraphSnapshot>>> = Rc::default();
        let sink = published.clone();
        let controller = CanvasController::new(move |snapshot: &GraphSnapshot| {
            sink.borrow_mut().push(snapshot.clone());
        });
        (controller, published)
    }

    fn drop_rect(controller: &mut CanvasController, x: f32, y: f32) -> ElementId {
        controller.drop_shape(ShapeTag::intern("rectangle"), Point::new(x, y))
    }

    #[test]
    fn drop_shape_schedules_one_flush() {
        let (mut controller, published) = controller();
        drop_rect(&mut controller, 10.0, 10.0);
        drop_rect(&mut controller, 30.0, 30.0);
        assert_eq!(controller.state(), SyncState::FlushPending);
        assert!(published.borrow().is_empty());

        controller.on_frame();
        assert_eq!(published.borrow().len(), 1);
        assert_eq!(published.borrow()[0].nodes.len(), 2);
        assert_eq!(controller.state(), SyncState::Idle);
    }

    #[test]
    fn transient_position_frames_do_not_schedule() {
        let (mut controller, published) = controller();
        let id = drop_rect(&mut controller, 0.0, 0.0);
        controller.on_frame();
        published.borrow_mut().clear();

        controller.mutate_nodes(vec![NodeChange::Position {
            id,
            to: Point::new(5.0, 5.0),
            dragging: true,
        }]);
        assert_eq!(controller.state(), SyncState::Idle);
        controller.on_frame();
        assert!(published.borrow().is_empty());
        // Interactive state did move.
        assert_eq!(controller.graph().get(id).unwrap().position, Point::new(5.0, 5.0));
    }

    #[test]
    fn resize_below_minimum_is_rejected() {
        let (mut controller, _) = controller();
        let id = drop_rect(&mut controller, 0.0, 0.0);
        let before = controller.graph().get(id).unwrap().size;

        controller.mutate_nodes(vec![NodeChange::Resize {
            id,
            to: Size::new(4.0, 4.0),
        }]);
        assert_eq!(controller.graph().get(id).unwrap().size, before);
    }

    #[test]
    fn connect_materializes_on_tick() {
        let (mut controller, published) = controller();
        let a = drop_rect(&mut controller, 0.0, 0.0);
        let b = drop_rect(&mut controller, 200.0, 0.0);
        controller.on_frame();
        published.borrow_mut().clear();

        controller.connect(ConnectionRequest::new(a, b)).unwrap();
        assert_eq!(controller.graph().connection_count(), 0); // buffered
        controller.on_frame();
        assert_eq!(controller.graph().connection_count(), 1);
        assert_eq!(published.borrow().len(), 1);
        assert_eq!(published.borrow()[0].edges.len(), 1);
    }

    #[test]
    fn pool_capacity_materializes_immediately() {
        let (mut controller, _) = controller();
        let hub = drop_rect(&mut controller, 0.0, 0.0);
        let mut spokes = Vec::new();
        for i in 0..crate::pool::DEFAULT_CAPACITY {
            spokes.push(drop_rect(&mut controller, 100.0 * (i + 1) as f32, 0.0));
        }
        for &spoke in &spokes {
            controller.connect(ConnectionRequest::new(hub, spoke)).unwrap();
        }
        // Capacity reached: edges exist without waiting for a tick.
        assert_eq!(
            controller.graph().connection_count(),
            crate::pool::DEFAULT_CAPACITY
        );
    }

    #[test]
    fn cleanup_cancels_pending_flush() {
        let (mut controller, published) = controller();
        drop_rect(&mut controller, 0.0, 0.0);
        controller.cleanup();
        controller.on_frame();
        assert!(published.borrow().is_empty());
    }
}
