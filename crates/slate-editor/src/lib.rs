pub mod changes;
pub mod controller;
pub mod pool;
pub mod scheduler;
pub mod tools;

pub use changes::{EdgeChange, NodeChange};
pub use controller::{CanvasController, DUPLICATE_OFFSET, SyncState};
pub use pool::{ConnectionPool, ConnectionRequest};
pub use scheduler::FrameScheduler;
pub use tools::{ConnectTool, Hit, Modifiers, PointerEvent, SelectTool, Tool, ToolAction, apply_actions};
