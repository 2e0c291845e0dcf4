//! Objectives and the capture protocol

pub mod capture;
pub mod objective;

pub use capture::{
    advance_sequence, capture, drop_flag, enter, exit, reset_flag, update_control_points,
    ContactReaction, EnterOutcome,
};
pub use objective::{ContestSide, Objective, ObjectiveBoard, ObjectiveKind};
