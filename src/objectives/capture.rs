//! Objective contact and capture protocol
//!
//! Units enter and exit objectives; kind-specific rules decide when an
//! objective flips. A capture moves ownership to the capturing unit's
//! commander, swaps the contestant lists and scores one point.

use crate::core::error::{CommandError, Result};
use crate::core::types::{EntityId, ObjectiveId, SequenceId};
use crate::hierarchy::Registry;
use crate::objectives::objective::{ContestSide, ObjectiveBoard, ObjectiveKind};
use crate::simulation::events::{SimEventLog, SimEventType};

/// What a kind-specific rule did when a unit made contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactReaction {
    None,
    FlagTaken(ObjectiveId),
    FlagReturned(ObjectiveId),
    Captured(ObjectiveId),
}

/// Outcome of `enter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterOutcome {
    pub side: ContestSide,
    pub reaction: ContactReaction,
}

/// A unit reached an objective
///
/// It defends if its commander owns the objective and attacks otherwise.
/// Contact is recorded only in the contestant lists; the unit's
/// `current_objective` stays whatever the allocator assigned.
/// Locked objectives (nonzero capture index) refuse contact unless their
/// kind is always contestable.
pub fn enter(
    board: &mut ObjectiveBoard,
    registry: &mut Registry,
    events: &mut SimEventLog,
    objective_id: ObjectiveId,
    unit: EntityId,
) -> Result<EnterOutcome> {
    let entity = registry.get(unit).ok_or(CommandError::NotRegistered(unit))?;
    if !entity.is_alive() {
        return Err(CommandError::EntityDead(unit));
    }
    let commander = registry.commander_of(unit);

    let objective = board
        .get_mut(objective_id)
        .ok_or(CommandError::UnknownObjective(objective_id))?;
    if !objective.is_contestable() {
        return Err(CommandError::ObjectiveLocked(objective_id));
    }
    if objective.side_of(unit).is_some() {
        return Err(CommandError::AlreadyAssigned(unit));
    }

    let side = if commander.is_some() && commander == objective.owner {
        objective.defenders.push(unit);
        ContestSide::Defending
    } else {
        objective.attackers.push(unit);
        ContestSide::Attacking
    };

    events.push(
        SimEventType::ContestStarted {
            unit,
            objective: objective_id,
            defending: side == ContestSide::Defending,
        },
        format!("{} is now contesting {}", unit, objective_id),
    );

    let reaction = react_to_contact(board, registry, events, objective_id, unit, side)?;
    Ok(EnterOutcome { side, reaction })
}

/// A unit left an objective. Returns whether it was contesting it.
pub fn exit(
    board: &mut ObjectiveBoard,
    events: &mut SimEventLog,
    objective_id: ObjectiveId,
    unit: EntityId,
) -> bool {
    let Some(objective) = board.get_mut(objective_id) else {
        return false;
    };

    let before = objective.attackers.len() + objective.defenders.len();
    objective.attackers.retain(|u| *u != unit);
    objective.defenders.retain(|u| *u != unit);
    let removed = objective.attackers.len() + objective.defenders.len() < before;

    if removed {
        events.push(
            SimEventType::ContestEnded {
                unit,
                objective: objective_id,
            },
            format!("{} stopped contesting {}", unit, objective_id),
        );
    }
    removed
}

/// Flip ownership of `objective_id` to the capturing unit's commander
pub fn capture(
    board: &mut ObjectiveBoard,
    registry: &mut Registry,
    events: &mut SimEventLog,
    objective_id: ObjectiveId,
    capturing_unit: EntityId,
) -> Result<()> {
    let commander = registry
        .commander_of(capturing_unit)
        .ok_or(CommandError::NotRegistered(capturing_unit))?;

    let objective = board
        .get_mut(objective_id)
        .ok_or(CommandError::UnknownObjective(objective_id))?;

    objective.owner = Some(commander);
    std::mem::swap(&mut objective.attackers, &mut objective.defenders);
    objective.capture_progress = 0.0;
    let sequence = objective.sequence;
    let name = objective.name.clone();

    if objective.kind == ObjectiveKind::Flag {
        if let Some(carrier) = objective.carrier.take() {
            if let Ok(core) = registry.core_mut(carrier) {
                core.carrying = None;
            }
        }
    }

    let command = registry.command_mut(commander)?;
    command.score += 1;
    command.attack_objective = None;
    let score = command.score;

    let core = registry.core_mut(capturing_unit)?;
    core.current_objective = None;
    core.attack_objective = None;
    core.captures += 1;

    tracing::info!(
        "{} captured by {} for commander {} (score {})",
        name,
        capturing_unit,
        commander,
        score
    );
    events.push(
        SimEventType::ObjectiveCaptured {
            objective: objective_id,
            unit: capturing_unit,
            commander,
        },
        format!("{} captured {}", capturing_unit, name),
    );

    if let Some(sequence) = sequence {
        advance_sequence(board, events, sequence, commander);
    }

    Ok(())
}

/// Move the capturable frontier of a sequence one step toward the loser
///
/// The neighbour of the captured objective that the capturer does not own
/// becomes the new index-0 objective.
pub fn advance_sequence(
    board: &mut ObjectiveBoard,
    events: &mut SimEventLog,
    sequence: SequenceId,
    capturer: EntityId,
) {
    let members = board.sequence_members(sequence);
    let unowned_at = |index: i32| {
        members.iter().any(|id| {
            board
                .get(*id)
                .map(|o| o.capture_index == index && o.owner != Some(capturer))
                .unwrap_or(false)
        })
    };

    let shift = if unowned_at(1) {
        -1
    } else if unowned_at(-1) {
        1
    } else {
        return;
    };

    for id in &members {
        if let Some(objective) = board.get_mut(*id) {
            objective.capture_index += shift;
        }
    }

    tracing::debug!("Sequence {:?} advanced by {}", sequence, shift);
    events.push(
        SimEventType::SequenceAdvanced { sequence },
        format!("capture sequence shifted by {}", shift),
    );
}

/// Kind-specific rule run after a unit joins an objective
fn react_to_contact(
    board: &mut ObjectiveBoard,
    registry: &mut Registry,
    events: &mut SimEventLog,
    objective_id: ObjectiveId,
    unit: EntityId,
    side: ContestSide,
) -> Result<ContactReaction> {
    let Some(objective) = board.get(objective_id) else {
        return Ok(ContactReaction::None);
    };
    let (kind, owner, carried) = (objective.kind, objective.owner, objective.carrier.is_some());
    let displaced = objective.is_displaced();
    let carrying = registry.core(unit)?.carrying;

    match (kind, side) {
        (ObjectiveKind::Flag, ContestSide::Attacking) if !carried && carrying.is_none() => {
            if let Some(flag) = board.get_mut(objective_id) {
                flag.carrier = Some(unit);
            }
            let core = registry.core_mut(unit)?;
            core.carrying = Some(objective_id);
            core.attack_objective = Some(objective_id);

            events.push(
                SimEventType::FlagTaken {
                    flag: objective_id,
                    carrier: unit,
                },
                format!("{} took flag {}", unit, objective_id),
            );
            Ok(ContactReaction::FlagTaken(objective_id))
        }
        (ObjectiveKind::Flag, ContestSide::Defending) if !carried && displaced => {
            if let Some(flag) = board.get_mut(objective_id) {
                flag.position = flag.initial_position;
            }
            events.push(
                SimEventType::FlagReturned {
                    flag: objective_id,
                    unit,
                },
                format!("{} returned flag {}", unit, objective_id),
            );
            Ok(ContactReaction::FlagReturned(objective_id))
        }
        (ObjectiveKind::HomeBase, ContestSide::Defending) => {
            let enemy_flag = carrying.filter(|flag| {
                board
                    .get(*flag)
                    .map(|f| f.owner != owner)
                    .unwrap_or(false)
            });
            match enemy_flag {
                Some(flag) => {
                    capture(board, registry, events, flag, unit)?;
                    Ok(ContactReaction::Captured(flag))
                }
                None => Ok(ContactReaction::None),
            }
        }
        _ => Ok(ContactReaction::None),
    }
}

/// A carrier lost its flag where it stood. Returns the dropped flag.
pub fn drop_flag(
    board: &mut ObjectiveBoard,
    registry: &mut Registry,
    events: &mut SimEventLog,
    carrier: EntityId,
) -> Option<ObjectiveId> {
    let flag_id = registry.core_mut(carrier).ok()?.carrying.take()?;
    let flag = board.get_mut(flag_id)?;
    if flag.carrier == Some(carrier) {
        flag.carrier = None;
    }

    events.push(
        SimEventType::FlagDropped {
            flag: flag_id,
            carrier,
        },
        format!("{} dropped flag {}", carrier, flag_id),
    );
    Some(flag_id)
}

/// Return a flag home to its original owner and clear its contestants
pub fn reset_flag(
    board: &mut ObjectiveBoard,
    registry: &mut Registry,
    events: &mut SimEventLog,
    flag_id: ObjectiveId,
) {
    let Some(flag) = board.get_mut(flag_id) else {
        return;
    };
    if flag.kind != ObjectiveKind::Flag {
        return;
    }

    if let Some(carrier) = flag.carrier.take() {
        if let Ok(core) = registry.core_mut(carrier) {
            core.carrying = None;
        }
    }
    flag.position = flag.initial_position;
    flag.owner = flag.initial_owner;
    flag.attackers.clear();
    flag.defenders.clear();

    tracing::debug!("Flag {} reset", flag_id);
    events.push(
        SimEventType::FlagReset { flag: flag_id },
        format!("flag {} returned to base", flag_id),
    );
}

/// Advance control point capture timers by `dt` seconds
///
/// A point progresses while every contestant attacks for the same team and
/// nobody defends; any defender or a second attacking team resets it.
/// Returns the points captured this step.
pub fn update_control_points(
    board: &mut ObjectiveBoard,
    registry: &mut Registry,
    events: &mut SimEventLog,
    dt: f64,
    capture_seconds: f64,
) -> Vec<ObjectiveId> {
    let mut ready = Vec::new();

    for objective in board.iter_mut() {
        if objective.kind != ObjectiveKind::ControlPoint || !objective.is_contestable() {
            continue;
        }

        objective
            .attackers
            .retain(|u| registry.get(*u).map(|e| e.is_alive()).unwrap_or(false));
        objective
            .defenders
            .retain(|u| registry.get(*u).map(|e| e.is_alive()).unwrap_or(false));

        let first_team = objective
            .attackers
            .first()
            .and_then(|u| registry.commander_of(*u));
        let single_team = objective
            .attackers
            .iter()
            .all(|u| registry.commander_of(*u) == first_team);

        if objective.attackers.is_empty() || !objective.defenders.is_empty() || !single_team {
            objective.capture_progress = 0.0;
            continue;
        }

        objective.capture_progress += dt;
        if objective.capture_progress >= capture_seconds {
            ready.push((objective.id, objective.attackers[0]));
        }
    }

    let mut captured = Vec::new();
    for (objective, unit) in ready {
        match capture(board, registry, events, objective, unit) {
            Ok(()) => captured.push(objective),
            Err(e) => tracing::warn!("Capture of {} by {} failed: {}", objective, unit, e),
        }
    }
    captured
}
