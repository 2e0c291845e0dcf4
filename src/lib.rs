//! Squad Command - command hierarchy simulation for team objective play
//!
//! Commanders promote units to squad leaders, hand them objectives and let
//! orders fan out down the chain of command. Objectives change hands through
//! a contact-based capture protocol.

pub mod allocation;
pub mod core;
pub mod hierarchy;
pub mod navigation;
pub mod objectives;
pub mod orders;
pub mod simulation;
