//! Read-only snapshots for UI and tooling

use glam::Vec3;
use serde::Serialize;

use crate::core::types::{EntityId, ObjectiveId, SimTime, TeamColor, Tick};
use crate::hierarchy::{RankKind, Registry};
use crate::objectives::{ObjectiveBoard, ObjectiveKind};
use crate::orders::OrderKind;

#[derive(Debug, Clone, Serialize)]
pub struct UnitSnapshot {
    pub id: EntityId,
    pub name: String,
    pub team: TeamColor,
    pub rank: RankKind,
    pub alive: bool,
    pub health: f32,
    pub position: Vec3,
    pub superior: Option<EntityId>,
    pub current_order: Option<OrderKind>,
    pub current_objective: Option<ObjectiveId>,
    pub carrying: Option<ObjectiveId>,
    pub captures: u32,
    pub deaths: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommanderSnapshot {
    pub id: EntityId,
    pub team: TeamColor,
    pub score: u32,
    pub leaders: Vec<EntityId>,
    pub roster_size: usize,
    pub attack_objective: Option<ObjectiveId>,
    pub defend_objective: Option<ObjectiveId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveSnapshot {
    pub id: ObjectiveId,
    pub name: String,
    pub kind: ObjectiveKind,
    pub owner: Option<EntityId>,
    pub owner_team: Option<TeamColor>,
    pub capture_index: i32,
    pub position: Vec3,
    pub attackers: usize,
    pub defenders: usize,
    pub carrier: Option<EntityId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationSnapshot {
    pub tick: Tick,
    pub time: SimTime,
    pub commanders: Vec<CommanderSnapshot>,
    pub units: Vec<UnitSnapshot>,
    pub objectives: Vec<ObjectiveSnapshot>,
}

impl SimulationSnapshot {
    pub fn capture(tick: Tick, time: SimTime, registry: &Registry, board: &ObjectiveBoard) -> Self {
        let units = registry
            .iter()
            .map(|e| UnitSnapshot {
                id: e.id(),
                name: e.core.name.clone(),
                team: e.core.team,
                rank: e.kind(),
                alive: e.is_alive(),
                health: e.core.health,
                position: e.core.position,
                superior: registry.superior_of(e.id()),
                current_order: e.core.current_order.map(|o| o.kind),
                current_objective: e.core.current_objective,
                carrying: e.core.carrying,
                captures: e.core.captures,
                deaths: e.core.deaths,
            })
            .collect();

        let commanders = registry
            .iter()
            .filter_map(|e| {
                let command = e.as_command()?;
                Some(CommanderSnapshot {
                    id: e.id(),
                    team: e.core.team,
                    score: command.score,
                    leaders: command.leaders.clone(),
                    roster_size: command.all_units.len(),
                    attack_objective: command.attack_objective,
                    defend_objective: command.defend_objective,
                })
            })
            .collect();

        let objectives = board
            .iter()
            .map(|o| ObjectiveSnapshot {
                id: o.id,
                name: o.name.clone(),
                kind: o.kind,
                owner: o.owner,
                owner_team: o.owner.and_then(|c| registry.get(c)).map(|c| c.core.team),
                capture_index: o.capture_index,
                position: o.position,
                attackers: o.attackers.len(),
                defenders: o.defenders.len(),
                carrier: o.carrier,
            })
            .collect();

        Self {
            tick,
            time,
            commanders,
            units,
            objectives,
        }
    }

    pub fn to_json(&self) -> crate::core::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
