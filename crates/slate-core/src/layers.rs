//! Layers: an externally-owned partition of the diagram.
//!
//! The layer set belongs to the surrounding application (layer panel,
//! persistence); the engine only reads it to enforce lock/visibility and
//! writes element membership through one validated entry point. Elements
//! whose layer has been deleted read as members of the default layer.

use crate::error::Rejection;
use crate::id::{ElementId, LayerId};
use crate::model::DiagramGraph;
use serde::{Deserialize, Serialize};

/// Sentinel layer every element belongs to unless assigned elsewhere.
/// Always present, never locked or hidden by default, cannot be removed.
pub fn default_layer() -> LayerId {
    LayerId::intern("default")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub locked: bool,
    pub visible: bool,
}

impl Layer {
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            locked: false,
            visible: true,
        }
    }
}

/// The externally-owned layer store. Insertion order is panel order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSet {
    layers: Vec<Layer>,
}

impl Default for LayerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerSet {
    /// A layer set containing only the default layer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::new(default_layer(), "Default")],
        }
    }

    /// Create a new layer with a fresh id, returning the id.
    pub fn add(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId::fresh("layer");
        self.layers.push(Layer::new(id, name));
        id
    }

    /// Remove a layer. The default layer cannot be removed. Elements on the
    /// removed layer are reassigned by the caller (see
    /// [`DiagramGraph`] usage in the controller).
    pub fn remove(&mut self, id: LayerId) -> bool {
        if id == default_layer() {
            return false;
        }
        let before = self.layers.len();
        self.layers.retain(|l| l.id != id);
        self.layers.len() != before
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn set_locked(&mut self, id: LayerId, locked: bool) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.locked = locked;
                true
            }
            None => false,
        }
    }

    pub fn set_visible(&mut self, id: LayerId, visible: bool) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }
}

/// Read-mostly adapter answering layer questions about elements.
/// Lock/visibility are authoritative from the owning layer; the engine
/// consults these before honoring drag/resize/delete/duplicate.
pub struct LayerBridge<'a> {
    layers: &'a LayerSet,
    graph: &'a DiagramGraph,
}

impl<'a> LayerBridge<'a> {
    pub fn new(layers: &'a LayerSet, graph: &'a DiagramGraph) -> Self {
        Self { layers, graph }
    }

    /// The layer an element belongs to. Unknown elements and memberships
    /// pointing at deleted layers read as the default layer.
    pub fn layer_of(&self, id: ElementId) -> LayerId {
        let membership = self
            .graph
            .get(id)
            .map(|e| e.layer)
            .unwrap_or_else(default_layer);
        if self.layers.contains(membership) {
            membership
        } else {
            default_layer()
        }
    }

    pub fn is_locked(&self, id: ElementId) -> bool {
        self.layers
            .get(self.layer_of(id))
            .is_some_and(|l| l.locked)
    }

    pub fn is_visible(&self, id: ElementId) -> bool {
        self.layers
            .get(self.layer_of(id))
            .is_none_or(|l| l.visible)
    }
}

/// Move elements to a target layer. Rejected without touching state when
/// the target does not exist; unknown element ids are skipped.
pub fn move_to_layer(
    layers: &LayerSet,
    graph: &mut DiagramGraph,
    ids: &[ElementId],
    target: LayerId,
) -> Result<(), Rejection> {
    if !layers.contains(target) {
        return Err(Rejection::NoSuchLayer);
    }
    for &id in ids {
        if let Some(element) = graph.get_mut(id) {
            element.layer = target;
        }
    }
    Ok(())
}
