//! Entity registry: ids, storage, and the unit → superior mapping
//!
//! Owned by the simulation root and passed by reference; there is no global
//! registry, so several simulations can coexist in one process.

use std::collections::BTreeMap;

use ahash::AHashMap;
use glam::Vec3;

use crate::core::error::{CommandError, Result};
use crate::core::types::{EntityId, TeamColor};
use crate::hierarchy::entity::{Command, Entity, EntityCore, RankKind};

pub struct Registry {
    next_id: u64,
    entities: BTreeMap<EntityId, Entity>,
    /// Reverse lookup: subordinate → its direct superior
    superiors: AHashMap<EntityId, EntityId>,
    commanders: BTreeMap<TeamColor, EntityId>,
    leader_cap: usize,
}

impl Registry {
    pub fn new(leader_cap: usize) -> Self {
        Self {
            next_id: 1,
            entities: BTreeMap::new(),
            superiors: AHashMap::new(),
            commanders: BTreeMap::new(),
            leader_cap,
        }
    }

    /// Strictly increasing; never reused
    pub fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn leader_cap(&self) -> usize {
        self.leader_cap
    }

    // === SPAWNING ===

    /// Create the root of a team's hierarchy. One per team.
    pub fn spawn_commander(
        &mut self,
        name: impl Into<String>,
        team: TeamColor,
        spawn_point: Vec3,
        health: f32,
    ) -> Result<EntityId> {
        if let Some(existing) = self.commanders.get(&team) {
            return Err(CommandError::AlreadyAssigned(*existing));
        }

        let id = self.allocate_id();
        let core = EntityCore::new(id, name.into(), team, spawn_point, health);
        self.entities.insert(id, Entity::commander(core, spawn_point));
        self.commanders.insert(team, id);

        tracing::debug!("Commander {} created for team {}", id, team);
        Ok(id)
    }

    /// Create a unit, add it to the commander's roster and register it
    /// directly under the commander
    pub fn enlist(
        &mut self,
        commander: EntityId,
        name: impl Into<String>,
        position: Vec3,
        health: f32,
    ) -> Result<EntityId> {
        let team = self.command(commander)?.0;

        let id = self.allocate_id();
        let core = EntityCore::new(id, name.into(), team, position, health);
        self.entities.insert(id, Entity::unit(core));

        if let Some(command) = self.get_mut(commander).and_then(|e| e.as_command_mut()) {
            command.all_units.push(id);
        }
        self.register(id, commander)?;
        Ok(id)
    }

    // === LOOKUP ===

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn core(&self, id: EntityId) -> Result<&EntityCore> {
        self.get(id)
            .map(|e| &e.core)
            .ok_or(CommandError::NotRegistered(id))
    }

    pub fn core_mut(&mut self, id: EntityId) -> Result<&mut EntityCore> {
        self.get_mut(id)
            .map(|e| &mut e.core)
            .ok_or(CommandError::NotRegistered(id))
    }

    pub fn position(&self, id: EntityId) -> Option<Vec3> {
        self.get(id).map(|e| e.core.position)
    }

    /// All entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub(crate) fn take(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub(crate) fn put(&mut self, entity: Entity) {
        self.entities.insert(entity.id(), entity);
    }

    pub fn superior_of(&self, id: EntityId) -> Option<EntityId> {
        self.superiors.get(&id).copied()
    }

    pub fn commander_for_team(&self, team: TeamColor) -> Option<EntityId> {
        self.commanders.get(&team).copied()
    }

    /// The commander of the entity's team (a commander is its own)
    pub fn commander_of(&self, id: EntityId) -> Option<EntityId> {
        let team = self.get(id)?.core.team;
        self.commander_for_team(team)
    }

    pub fn commanders(&self) -> Vec<EntityId> {
        self.commanders.values().copied().collect()
    }

    /// The commander's team and command data
    pub fn command(&self, commander: EntityId) -> Result<(TeamColor, &Command)> {
        let entity = self
            .get(commander)
            .ok_or(CommandError::NotRegistered(commander))?;
        match entity.as_command() {
            Some(command) => Ok((entity.core.team, command)),
            None => Err(CommandError::RankMismatch {
                id: commander,
                expected: RankKind::Commander,
                actual: entity.kind(),
            }),
        }
    }

    pub fn command_mut(&mut self, commander: EntityId) -> Result<&mut Command> {
        let entity = self
            .get_mut(commander)
            .ok_or(CommandError::NotRegistered(commander))?;
        let actual = entity.kind();
        entity.as_command_mut().ok_or(CommandError::RankMismatch {
            id: commander,
            expected: RankKind::Commander,
            actual,
        })
    }

    /// Direct subordinates of a leader or commander (empty for units)
    pub fn members(&self, leader: EntityId) -> Vec<EntityId> {
        self.get(leader)
            .and_then(|e| e.squad())
            .map(|s| s.ids())
            .unwrap_or_default()
    }

    pub fn leader_count(&self, commander: EntityId) -> usize {
        self.command(commander)
            .map(|(_, c)| c.leader_count())
            .unwrap_or(0)
    }

    // === REGISTRATION ===

    /// Place `subordinate` under `new_leader`, first removing it from any
    /// previous leader's squad. The subordinate takes the leader's team color
    /// and loses its standing order.
    ///
    /// Returns `AlreadyAssigned` (a no-op) when it already reports to `new_leader`.
    pub fn register(&mut self, subordinate: EntityId, new_leader: EntityId) -> Result<()> {
        if subordinate == new_leader {
            return Err(CommandError::InvalidTarget(subordinate));
        }

        let leader = self
            .get(new_leader)
            .ok_or(CommandError::NotRegistered(new_leader))?;
        if leader.squad().is_none() {
            return Err(CommandError::NotALeader(new_leader));
        }
        let leader_kind = leader.kind();
        let team = leader.core.team;

        let sub = self
            .get(subordinate)
            .ok_or(CommandError::NotRegistered(subordinate))?;
        if sub.kind() == RankKind::Commander {
            return Err(CommandError::RankMismatch {
                id: subordinate,
                expected: RankKind::Unit,
                actual: RankKind::Commander,
            });
        }
        // Leaders only ever report to a commander
        if sub.kind() == RankKind::Leader && leader_kind != RankKind::Commander {
            return Err(CommandError::RankMismatch {
                id: new_leader,
                expected: RankKind::Commander,
                actual: leader_kind,
            });
        }

        if self.superior_of(subordinate) == Some(new_leader) {
            return Err(CommandError::AlreadyAssigned(subordinate));
        }

        // Single &mut pass: no caller can observe the unit in two squads or none
        if let Some(previous) = self.superiors.remove(&subordinate) {
            if let Some(squad) = self.get_mut(previous).and_then(|e| e.squad_mut()) {
                squad.remove(subordinate);
            }
        }
        if let Some(squad) = self.get_mut(new_leader).and_then(|e| e.squad_mut()) {
            squad.insert(subordinate);
        }
        self.superiors.insert(subordinate, new_leader);

        if let Some(entity) = self.get_mut(subordinate) {
            entity.core.team = team;
            entity.core.last_orderer = None;
            entity.core.halt();
        }

        Ok(())
    }

    /// Detach `id` from its superior. Idempotent; returns whether it was attached.
    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.superiors.remove(&id) {
            Some(previous) => {
                if let Some(squad) = self.get_mut(previous).and_then(|e| e.squad_mut()) {
                    squad.remove(id);
                }
                true
            }
            None => false,
        }
    }

    /// Remove the entity for good. Any squad it still had is handed to its
    /// commander so nobody is orphaned.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        let commander = self.commander_of(id).filter(|c| *c != id);

        if let Some(commander) = commander {
            for member in self.members(id) {
                let _ = self.register(member, commander);
            }
            if let Ok(command) = self.command_mut(commander) {
                command.all_units.retain(|u| *u != id);
                command.leaders.retain(|l| *l != id);
            }
        }

        self.remove(id);
        let entity = self.entities.remove(&id)?;
        if entity.kind() == RankKind::Commander {
            self.commanders.retain(|_, c| *c != id);
        }
        Some(entity)
    }

    // === INVARIANTS ===

    /// Describe every violation of the hierarchy invariants (empty when sound):
    /// each subordinate sits in exactly the squad the reverse lookup names,
    /// and no commander exceeds the leader cap.
    pub fn hierarchy_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut seen: AHashMap<EntityId, EntityId> = AHashMap::new();

        for entity in self.entities.values() {
            let Some(squad) = entity.squad() else {
                continue;
            };
            for member in squad.iter() {
                if let Some(other) = seen.insert(member, entity.id()) {
                    violations.push(format!(
                        "{} is in the squads of both {} and {}",
                        member,
                        other,
                        entity.id()
                    ));
                }
                if self.superior_of(member) != Some(entity.id()) {
                    violations.push(format!(
                        "{} is in {}'s squad but the lookup says {:?}",
                        member,
                        entity.id(),
                        self.superior_of(member)
                    ));
                }
            }
        }

        for (member, superior) in &self.superiors {
            if seen.get(member) != Some(superior) {
                violations.push(format!(
                    "lookup maps {} to {} but it is not in that squad",
                    member, superior
                ));
            }
        }

        for commander in self.commanders.values() {
            let count = self.leader_count(*commander);
            if count > self.leader_cap {
                violations.push(format!(
                    "commander {} has {} leaders (cap {})",
                    commander, count, self.leader_cap
                ));
            }
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_team(units: usize) -> (Registry, EntityId, Vec<EntityId>) {
        let mut registry = Registry::new(2);
        let commander = registry
            .spawn_commander("Red Commander", TeamColor::Red, Vec3::ZERO, 100.0)
            .unwrap();
        let ids = (0..units)
            .map(|i| {
                registry
                    .enlist(commander, format!("red-{}", i), Vec3::ZERO, 100.0)
                    .unwrap()
            })
            .collect();
        (registry, commander, ids)
    }

    #[test]
    fn test_allocate_id_is_monotonic() {
        let mut registry = Registry::new(1);
        let a = registry.allocate_id();
        let b = registry.allocate_id();
        assert!(b > a);
    }

    #[test]
    fn test_ids_not_reused_after_despawn() {
        let (mut registry, _, ids) = registry_with_team(1);
        registry.despawn(ids[0]);
        let next = registry.allocate_id();
        assert!(next > ids[0]);
    }

    #[test]
    fn test_enlist_registers_under_commander() {
        let (registry, commander, ids) = registry_with_team(3);
        for id in &ids {
            assert_eq!(registry.superior_of(*id), Some(commander));
        }
        assert_eq!(registry.members(commander), ids);
        assert_eq!(registry.command(commander).unwrap().1.all_units, ids);
    }

    #[test]
    fn test_one_commander_per_team() {
        let (mut registry, commander, _) = registry_with_team(0);
        let result = registry.spawn_commander("Second", TeamColor::Red, Vec3::ZERO, 100.0);
        assert!(matches!(result, Err(CommandError::AlreadyAssigned(id)) if id == commander));
    }

    #[test]
    fn test_register_same_leader_is_noop() {
        let (mut registry, commander, ids) = registry_with_team(1);
        let result = registry.register(ids[0], commander);
        assert!(matches!(result, Err(CommandError::AlreadyAssigned(_))));
        assert_eq!(registry.members(commander), ids);
    }

    #[test]
    fn test_register_under_unit_fails() {
        let (mut registry, _, ids) = registry_with_team(2);
        let result = registry.register(ids[0], ids[1]);
        assert!(matches!(result, Err(CommandError::NotALeader(_))));
    }

    #[test]
    fn test_leader_cannot_join_another_squad() {
        let (mut registry, commander, ids) = registry_with_team(2);
        registry.promote(ids[0], commander).unwrap();
        registry.promote(ids[1], commander).unwrap();
        let result = registry.register(ids[0], ids[1]);
        assert!(matches!(result, Err(CommandError::RankMismatch { .. })));
        assert_eq!(registry.superior_of(ids[0]), Some(commander));
    }

    #[test]
    fn test_register_unknown_fails() {
        let (mut registry, commander, _) = registry_with_team(0);
        let result = registry.register(EntityId(999), commander);
        assert!(matches!(result, Err(CommandError::NotRegistered(_))));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (mut registry, commander, ids) = registry_with_team(1);
        assert!(registry.remove(ids[0]));
        assert!(!registry.remove(ids[0]));
        assert!(registry.members(commander).is_empty());
        assert!(registry.superior_of(ids[0]).is_none());
        assert!(registry.hierarchy_violations().is_empty());
    }

    #[test]
    fn test_despawn_removes_from_roster() {
        let (mut registry, commander, ids) = registry_with_team(2);
        let removed = registry.despawn(ids[0]);
        assert!(removed.is_some());
        assert!(!registry.contains(ids[0]));
        assert_eq!(registry.command(commander).unwrap().1.all_units, vec![ids[1]]);
        assert!(registry.hierarchy_violations().is_empty());
    }
}
