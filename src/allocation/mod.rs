//! Squad allocation scheduler
//!
//! Decides how many units each objective gets, promotes and demotes the
//! leaders that run them, and moves individual units between squads.

pub mod allocator;
pub mod planner;
pub mod selection;

pub use allocator::{allocate_to_single_objective, leader_for, roster_size, target_count};
pub use planner::{
    classify_risk, discover_objectives, AllocationBranch, AllocationReport, Planner, Posture,
    RiskClassification,
};
pub use selection::{by_distance, closest, furthest};
