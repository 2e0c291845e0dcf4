//! Order propagation engine

pub mod dispatch;
pub mod movement;
pub mod order;

pub use dispatch::{resolve_target, stop, OrderDispatcher};
pub use movement::{advance_movement, MovementResult};
pub use order::{MovementDiscipline, Order, OrderKind, OrderTarget, TrackAnchor, TrackingHandle};
