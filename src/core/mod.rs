pub mod config;
pub mod constants;
pub mod error;
pub mod timers;
pub mod types;

pub use config::CommandConfig;
pub use error::{CommandError, Result};
pub use timers::{Callback, DeferredQueue, TimerKey};
pub use types::{EntityId, ObjectiveId, SequenceId, SimTime, TeamColor, Tick};
