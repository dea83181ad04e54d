//! Integration tests: structural editing commands end to end — deletion
//! cascades, connection dedup, duplication, z-order, and layer locking.

use pretty_assertions::assert_eq;
use slate_core::{
    Connection, ConnectionId, ElementId, GraphSnapshot, LayerId, Point, Rejection, ShapeTag, Size,
};
use slate_editor::changes::{EdgeChange, NodeChange};
use slate_editor::controller::CanvasController;
use slate_editor::pool::ConnectionRequest;
use std::cell::RefCell;
use std::rc::Rc;

fn harness() -> (CanvasController, Rc<RefCell<Vec<GraphSnapshot>>>) {
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

// ─── Cascade deletion ────────────────────────────────────────────────────

#[test]
fn deleting_an_element_deletes_its_incident_connections() {
    let (mut controller, published) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let b = drop_rect(&mut controller, 200.0, 0.0);
    let c = drop_rect(&mut controller, 400.0, 0.0);
    controller.connect(ConnectionRequest::new(a, b)).unwrap();
    controller.connect(ConnectionRequest::new(c, b)).unwrap();
    controller.on_frame();
    assert_eq!(controller.graph().connection_count(), 2);

    controller.delete_elements(&[b]);
    controller.on_frame();

    assert!(!controller.graph().contains(b));
    assert_eq!(controller.graph().connection_count(), 0);
    let last = published.borrow().last().unwrap().clone();
    assert_eq!(last.nodes.len(), 2);
    assert!(last.edges.is_empty());
}

#[test]
fn delete_of_unknown_id_is_a_noop() {
    let (mut controller, published) = harness();
    drop_rect(&mut controller, 0.0, 0.0);
    controller.on_frame();
    published.borrow_mut().clear();

    controller.delete_elements(&[ElementId::intern("never_existed")]);
    controller.on_frame();
    assert!(published.borrow().is_empty());
    assert_eq!(controller.graph().element_count(), 1);
}

// ─── Connection idempotence ──────────────────────────────────────────────

#[test]
fn connect_twice_yields_exactly_one_edge() {
    let (mut controller, _) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let b = drop_rect(&mut controller, 200.0, 0.0);

    controller.connect(ConnectionRequest::new(a, b)).unwrap();
    let err = controller.connect(ConnectionRequest::new(a, b)).unwrap_err();
    assert_eq!(err, Rejection::DuplicateConnection);

    controller.on_frame();
    assert_eq!(controller.graph().connection_count(), 1);

    // Still deduplicated after materialization.
    let err = controller.connect(ConnectionRequest::new(a, b)).unwrap_err();
    assert_eq!(err, Rejection::DuplicateConnection);
}

#[test]
fn removing_a_connection_clears_the_dedup_index() {
    let (mut controller, _) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let b = drop_rect(&mut controller, 200.0, 0.0);
    controller.connect(ConnectionRequest::new(a, b)).unwrap();
    controller.on_frame();

    let conn = controller.graph().connections().next().unwrap().id;
    controller.mutate_edges(vec![EdgeChange::Remove(conn)]);
    assert_eq!(controller.graph().connection_count(), 0);

    // The pair is accepted again after the eviction, not rejected as a
    // stale duplicate.
    controller.connect(ConnectionRequest::new(a, b)).unwrap();
    controller.on_frame();
    assert_eq!(controller.graph().connection_count(), 1);
}

#[test]
fn reverse_direction_is_a_distinct_connection() {
    let (mut controller, _) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let b = drop_rect(&mut controller, 200.0, 0.0);

    controller.connect(ConnectionRequest::new(a, b)).unwrap();
    controller.connect(ConnectionRequest::new(b, a)).unwrap();
    controller.on_frame();
    assert_eq!(controller.graph().connection_count(), 2);
}

#[test]
fn programmatic_edge_add_respects_the_dedup_index() {
    let (mut controller, _) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let b = drop_rect(&mut controller, 200.0, 0.0);

    controller.mutate_edges(vec![EdgeChange::Add(Box::new(Connection::new(
        ConnectionId::fresh("conn"),
        a,
        b,
    )))]);
    assert_eq!(controller.graph().connection_count(), 1);

    // A second programmatic add for the same pair is refused, and the
    // gesture path sees the pair as taken.
    controller.mutate_edges(vec![EdgeChange::Add(Box::new(Connection::new(
        ConnectionId::fresh("conn"),
        a,
        b,
    )))]);
    assert_eq!(controller.graph().connection_count(), 1);
    assert_eq!(
        controller.connect(ConnectionRequest::new(a, b)).unwrap_err(),
        Rejection::DuplicateConnection
    );

    // Removing the one real edge frees the pair for both paths.
    let conn = controller.graph().connections().next().unwrap().id;
    controller.mutate_edges(vec![EdgeChange::Remove(conn)]);
    controller.connect(ConnectionRequest::new(a, b)).unwrap();
    controller.on_frame();
    assert_eq!(controller.graph().connection_count(), 1);
}

#[test]
fn connect_to_missing_element_is_rejected() {
    let (mut controller, _) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let err = controller
        .connect(ConnectionRequest::new(a, ElementId::intern("ghost_target")))
        .unwrap_err();
    assert_eq!(err, Rejection::UnknownElement);
}

// ─── Duplication ─────────────────────────────────────────────────────────

#[test]
fn duplicate_offsets_by_twenty_and_takes_over_selection() {
    let (mut controller, _) = harness();
    let original = drop_rect(&mut controller, 100.0, 50.0);
    controller.on_frame();

    let new_ids = controller.duplicate_elements(&[original]);
    assert_eq!(new_ids.len(), 1);
    let duplicate = controller.graph().get(new_ids[0]).unwrap();

    assert_ne!(duplicate.id, original);
    assert_eq!(duplicate.position, Point::new(120.0, 70.0));
    assert!(duplicate.selected);
    assert!(!controller.graph().get(original).unwrap().selected);
    assert_eq!(controller.selection().len(), 1);
}

#[test]
fn duplicate_stacks_above_everything() {
    let (mut controller, _) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let b = drop_rect(&mut controller, 50.0, 0.0);

    let new_ids = controller.duplicate_elements(&[a]);
    let order = controller.graph().paint_order();
    assert_eq!(order.last(), Some(&new_ids[0]));
    assert!(controller.graph().get(new_ids[0]).unwrap().z > controller.graph().get(b).unwrap().z);
}

// ─── Z-order through the controller ──────────────────────────────────────

#[test]
fn forward_then_backward_restores_paint_order() {
    let (mut controller, _) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let b = drop_rect(&mut controller, 10.0, 0.0);
    let c = drop_rect(&mut controller, 20.0, 0.0);
    assert_eq!(controller.graph().paint_order(), vec![a, b, c]);

    controller.bring_forward(a);
    assert_eq!(controller.graph().paint_order(), vec![b, a, c]);
    controller.send_backward(a);
    assert_eq!(controller.graph().paint_order(), vec![a, b, c]);
}

#[test]
fn z_order_changes_are_published() {
    let (mut controller, published) = harness();
    let a = drop_rect(&mut controller, 0.0, 0.0);
    let _b = drop_rect(&mut controller, 10.0, 0.0);
    controller.on_frame();
    published.borrow_mut().clear();

    controller.bring_to_front(&[a]);
    controller.on_frame();
    assert_eq!(published.borrow().len(), 1);
    let last = published.borrow().last().unwrap().clone();
    assert_eq!(last.nodes.last().unwrap().id, a);
}

// ─── Layer locking ───────────────────────────────────────────────────────

fn locked_setup() -> (CanvasController, ElementId, LayerId) {
    let (mut controller, _) = harness();
    let id = drop_rect(&mut controller, 100.0, 100.0);
    let layer = controller.add_layer("Frozen");
    controller.move_to_layer(&[id], layer).unwrap();
    controller.on_frame();
    controller.set_layer_locked(layer, true);
    (controller, id, layer)
}

#[test]
fn locked_layer_refuses_delete() {
    let (mut controller, id, _) = locked_setup();
    controller.delete_elements(&[id]);
    assert!(controller.graph().contains(id));
}

#[test]
fn locked_layer_refuses_drag() {
    let (mut controller, id, _) = locked_setup();
    assert_eq!(controller.begin_drag(id), Err(Rejection::LockedLayer));
    assert_eq!(controller.drag_by(id, 5.0, 5.0), Err(Rejection::LockedLayer));
    assert_eq!(
        controller.graph().get(id).unwrap().position,
        Point::new(100.0, 100.0)
    );
}

#[test]
fn locked_layer_refuses_resize_and_duplicate() {
    let (mut controller, id, _) = locked_setup();
    let before = controller.graph().get(id).unwrap().size;
    controller.mutate_nodes(vec![NodeChange::Resize {
        id,
        to: Size::new(300.0, 300.0),
    }]);
    assert_eq!(controller.graph().get(id).unwrap().size, before);

    let duplicated = controller.duplicate_elements(&[id]);
    assert!(duplicated.is_empty());
}

#[test]
fn unlocking_restores_mutability() {
    let (mut controller, id, layer) = locked_setup();
    controller.set_layer_locked(layer, false);
    controller.delete_elements(&[id]);
    assert!(!controller.graph().contains(id));
}

// ─── Layers & registry edges ─────────────────────────────────────────────

#[test]
fn move_to_missing_layer_is_rejected() {
    let (mut controller, _) = harness();
    let id = drop_rect(&mut controller, 0.0, 0.0);
    let err = controller
        .move_to_layer(&[id], LayerId::intern("does_not_exist"))
        .unwrap_err();
    assert_eq!(err, Rejection::NoSuchLayer);
}

#[test]
fn unknown_shape_tag_drops_as_rectangle() {
    let (mut controller, _) = harness();
    let id = controller.drop_shape(ShapeTag::intern("quantum_widget"), Point::new(0.0, 0.0));
    let element = controller.graph().get(id).unwrap();
    assert_eq!(element.shape, ShapeTag::intern("rectangle"));
    assert!(element.size.meets_minimum());
}
