//! Z-order: total, stable stacking order for paint and selection.
//!
//! Ordering keys are floats, not positions in a list: a single-step move
//! assigns a fractional value between two neighbors and touches O(1)
//! elements instead of renumbering the collection. Ties (fresh imports,
//! duplicates) are broken by element id, so paint order is deterministic.

use crate::id::ElementId;
use crate::model::DiagramGraph;
use std::cmp::Ordering;

/// Sort key: z ascending, ties broken by id string ordering.
fn stacking(a: &(f32, ElementId), b: &(f32, ElementId)) -> Ordering {
    a.0.partial_cmp(&b.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.as_str().cmp(b.1.as_str()))
}

impl DiagramGraph {
    /// Highest z in the graph, `None` when empty.
    pub fn max_z(&self) -> Option<f32> {
        self.elements().map(|e| e.z).reduce(f32::max)
    }

    /// Lowest z in the graph, `None` when empty.
    pub fn min_z(&self) -> Option<f32> {
        self.elements().map(|e| e.z).reduce(f32::min)
    }

    /// Element ids in stacking order, back to front.
    #[must_use]
    pub fn paint_order(&self) -> Vec<ElementId> {
        let mut keyed: Vec<(f32, ElementId)> = self.elements().map(|e| (e.z, e.id)).collect();
        keyed.sort_by(stacking);
        keyed.into_iter().map(|(_, id)| id).collect()
    }

    /// Raise the given elements above everything else. Their relative order
    /// is preserved: consecutive integers above the current maximum.
    /// Returns true if any z changed.
    pub fn bring_to_front(&mut self, ids: &[ElementId]) -> bool {
        let Some(max) = self.max_z() else {
            return false;
        };
        let mut next = max.floor() + 1.0;
        let mut changed = false;
        for &id in ids {
            if let Some(element) = self.get_mut(id) {
                element.z = next;
                next += 1.0;
                changed = true;
            }
        }
        changed
    }

    /// Symmetric to [`bring_to_front`](Self::bring_to_front): consecutive
    /// integers below the current minimum, relative order preserved.
    pub fn send_to_back(&mut self, ids: &[ElementId]) -> bool {
        let Some(min) = self.min_z() else {
            return false;
        };
        let known = ids.iter().filter(|id| self.contains(**id)).count();
        if known == 0 {
            return false;
        }
        let mut next = min.ceil() - known as f32;
        for &id in ids {
            if let Some(element) = self.get_mut(id) {
                element.z = next;
                next += 1.0;
            }
        }
        true
    }

    /// Move one element a single step up: the element takes a value
    /// strictly between its own and the next-higher neighbor's, and the
    /// leapfrogged neighbor takes the element's old value. Exactly one step
    /// of movement, two elements touched. No-op when already frontmost.
    pub fn bring_forward(&mut self, id: ElementId) -> bool {
        let Some(current) = self.get(id).map(|e| e.z) else {
            return false;
        };
        let Some(neighbor) = self.step_neighbor(id, current, true) else {
            return false;
        };
        let (neighbor_id, neighbor_z) = neighbor;
        let new_z = (current + neighbor_z) / 2.0;
        if let Some(e) = self.get_mut(neighbor_id) {
            e.z = current;
        }
        if let Some(e) = self.get_mut(id) {
            e.z = new_z;
        }
        true
    }

    /// Mirror of [`bring_forward`](Self::bring_forward), stepping down.
    /// No-op when already backmost.
    pub fn send_backward(&mut self, id: ElementId) -> bool {
        let Some(current) = self.get(id).map(|e| e.z) else {
            return false;
        };
        let Some(neighbor) = self.step_neighbor(id, current, false) else {
            return false;
        };
        let (neighbor_id, neighbor_z) = neighbor;
        let new_z = (current + neighbor_z) / 2.0;
        if let Some(e) = self.get_mut(neighbor_id) {
            e.z = current;
        }
        if let Some(e) = self.get_mut(id) {
            e.z = new_z;
        }
        true
    }

    /// The element to swap with for a one-step move: among other elements,
    /// the nearest strictly higher (or lower) distinct z. Several elements
    /// may share that z; the id tie-break picks one deterministically.
    fn step_neighbor(
        &self,
        id: ElementId,
        current: f32,
        upward: bool,
    ) -> Option<(ElementId, f32)> {
        let mut best: Option<(f32, ElementId)> = None;
        for element in self.elements() {
            if element.id == id {
                continue;
            }
            let candidate = (element.z, element.id);
            let eligible = if upward {
                element.z > current
            } else {
                element.z < current
            };
            if !eligible {
                continue;
            }
            let closer = match &best {
                None => true,
                Some(b) => {
                    if upward {
                        stacking(&candidate, b) == Ordering::Less
                    } else {
                        stacking(&candidate, b) == Ordering::Greater
                    }
                }
            };
            if closer {
                best = Some(candidate);
            }
        }
        best.map(|(z, id)| (id, z))
    }

    /// Housekeeping: renumber to whole integers without changing stacking
    /// order. Invisible to callers beyond the numeric values.
    pub fn normalize_z(&mut self) {
        let order = self.paint_order();
        for (i, id) in order.into_iter().enumerate() {
            if let Some(element) = self.get_mut(id) {
                element.z = i as f32;
            }
        }
    }
}
