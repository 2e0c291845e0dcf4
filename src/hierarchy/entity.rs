//! Entities and ranks: Unit → Leader → Commander
//!
//! Every participant shares an `EntityCore`. The rank carries the extra
//! state a Leader (its squad) or a Commander (squad, roster, leaders,
//! objectives, score) owns. Promotion and demotion are data transforms that
//! keep the core, so identity continuity is by id.

use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, ObjectiveId, TeamColor};
use crate::orders::order::{Order, TrackingHandle};

/// Rank tag without the rank-specific data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankKind {
    Unit,
    Leader,
    Commander,
}

/// Direct subordinates of a Leader or Commander
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squad {
    members: BTreeSet<EntityId>,
}

impl Squad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().copied()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.members.iter().copied().collect()
    }

    pub(crate) fn insert(&mut self, id: EntityId) -> bool {
        self.members.insert(id)
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> bool {
        self.members.remove(&id)
    }
}

/// State owned by a team's Commander
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Command {
    pub squad: Squad,
    /// Every unit of the team regardless of squad
    pub all_units: Vec<EntityId>,
    /// Promoted leaders, bounded by the leader cap
    pub leaders: Vec<EntityId>,
    pub attack_objective: Option<ObjectiveId>,
    pub defend_objective: Option<ObjectiveId>,
    pub score: u32,
    pub spawn_point: Vec3,
}

impl Command {
    pub fn new(spawn_point: Vec3) -> Self {
        Self {
            spawn_point,
            ..Default::default()
        }
    }

    pub fn leader_count(&self) -> usize {
        self.leaders.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Rank {
    Unit,
    Leader(Squad),
    Commander(Command),
}

impl Rank {
    pub fn kind(&self) -> RankKind {
        match self {
            Rank::Unit => RankKind::Unit,
            Rank::Leader(_) => RankKind::Leader,
            Rank::Commander(_) => RankKind::Commander,
        }
    }
}

/// State every rank shares; survives promotion and demotion unchanged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCore {
    pub id: EntityId,
    pub name: String,
    pub team: TeamColor,
    pub alive: bool,
    pub health: f32,
    pub position: Vec3,

    // Orders
    pub current_order: Option<Order>,
    pub last_orderer: Option<EntityId>,
    pub move_target: Option<TrackingHandle>,

    // Objectives
    pub current_objective: Option<ObjectiveId>,
    pub attack_objective: Option<ObjectiveId>,
    pub carrying: Option<ObjectiveId>,

    // Accumulated stats
    pub captures: u32,
    pub deaths: u32,
}

impl EntityCore {
    pub fn new(id: EntityId, name: String, team: TeamColor, position: Vec3, health: f32) -> Self {
        Self {
            id,
            name,
            team,
            alive: true,
            health,
            position,
            current_order: None,
            last_orderer: None,
            move_target: None,
            current_objective: None,
            attack_objective: None,
            carrying: None,
            captures: 0,
            deaths: 0,
        }
    }

    /// Replace the current order with Stop and drop the movement target
    pub fn halt(&mut self) {
        self.current_order = Some(Order::stop());
        self.move_target = None;
    }

    pub fn is_moving(&self) -> bool {
        self.move_target.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub core: EntityCore,
    pub rank: Rank,
}

impl Entity {
    pub fn unit(core: EntityCore) -> Self {
        Self {
            core,
            rank: Rank::Unit,
        }
    }

    pub fn commander(core: EntityCore, spawn_point: Vec3) -> Self {
        Self {
            core,
            rank: Rank::Commander(Command::new(spawn_point)),
        }
    }

    pub fn id(&self) -> EntityId {
        self.core.id
    }

    pub fn kind(&self) -> RankKind {
        self.rank.kind()
    }

    pub fn is_alive(&self) -> bool {
        self.core.alive
    }

    /// Squad of a Leader or Commander
    pub fn squad(&self) -> Option<&Squad> {
        match &self.rank {
            Rank::Unit => None,
            Rank::Leader(squad) => Some(squad),
            Rank::Commander(command) => Some(&command.squad),
        }
    }

    pub fn squad_mut(&mut self) -> Option<&mut Squad> {
        match &mut self.rank {
            Rank::Unit => None,
            Rank::Leader(squad) => Some(squad),
            Rank::Commander(command) => Some(&mut command.squad),
        }
    }

    pub fn as_command(&self) -> Option<&Command> {
        match &self.rank {
            Rank::Commander(command) => Some(command),
            _ => None,
        }
    }

    pub fn as_command_mut(&mut self) -> Option<&mut Command> {
        match &mut self.rank {
            Rank::Commander(command) => Some(command),
            _ => None,
        }
    }

    /// Unit → Leader with an empty squad. Other ranks are returned unchanged.
    pub fn into_leader(self) -> Entity {
        match self.rank {
            Rank::Unit => Entity {
                core: self.core,
                rank: Rank::Leader(Squad::new()),
            },
            rank => Entity {
                core: self.core,
                rank,
            },
        }
    }

    /// Leader → Unit, handing back the former squad members.
    /// Other ranks are returned unchanged with no members.
    pub fn into_unit(self) -> (Entity, Vec<EntityId>) {
        match self.rank {
            Rank::Leader(squad) => (
                Entity {
                    core: self.core,
                    rank: Rank::Unit,
                },
                squad.ids(),
            ),
            rank => (
                Entity {
                    core: self.core,
                    rank,
                },
                Vec::new(),
            ),
        }
    }
}
