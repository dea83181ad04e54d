pub mod error;
pub mod id;
pub mod layers;
pub mod model;
pub mod registry;
pub mod zorder;

pub use error::Rejection;
pub use id::{ConnectionId, ElementId, LayerId, ShapeTag};
pub use layers::{Layer, LayerBridge, LayerSet, default_layer, move_to_layer};
pub use model::*;
pub use registry::{NewElement, RendererKind, ShapeEntry, ShapeRegistry};
