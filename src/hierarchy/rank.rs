//! Promotion and demotion between Unit and Leader
//!
//! Both run inside a single `&mut Registry` call, so no other operation can
//! see an entity that is half Unit and half Leader, or a squad member with
//! no superior.

use crate::core::error::{CommandError, Result};
use crate::core::types::EntityId;
use crate::hierarchy::entity::{Entity, RankKind};
use crate::hierarchy::registry::Registry;

impl Registry {
    /// Promote `unit` to Leader under `commander`
    ///
    /// Fails with `CapacityExceeded` once the commander has `leader_cap`
    /// leaders. The entity keeps its id, health and stats, gains an empty
    /// squad, reports directly to the commander and is halted.
    pub fn promote(&mut self, unit: EntityId, commander: EntityId) -> Result<()> {
        let (team, command) = self.command(commander)?;
        let leader_count = command.leader_count();

        let entity = self.get(unit).ok_or(CommandError::NotRegistered(unit))?;
        if entity.kind() != RankKind::Unit {
            return Err(CommandError::RankMismatch {
                id: unit,
                expected: RankKind::Unit,
                actual: entity.kind(),
            });
        }
        if !entity.is_alive() {
            return Err(CommandError::EntityDead(unit));
        }
        if entity.core.team != team {
            return Err(CommandError::InvalidTarget(unit));
        }
        if leader_count >= self.leader_cap() {
            return Err(CommandError::CapacityExceeded {
                max: self.leader_cap(),
            });
        }

        self.transform(unit, |entity| entity.into_leader());

        match self.register(unit, commander) {
            Ok(()) | Err(CommandError::AlreadyAssigned(_)) => {}
            Err(e) => return Err(e),
        }

        let command = self.command_mut(commander)?;
        command.leaders.push(unit);
        let count = command.leader_count();

        if let Ok(core) = self.core_mut(unit) {
            core.halt();
        }

        tracing::debug!(
            "Promoted {} to leader under {} ({}/{})",
            unit,
            commander,
            count,
            self.leader_cap()
        );
        Ok(())
    }

    /// Demote a Leader back to Unit
    ///
    /// Every squad member is re-registered directly under the commander
    /// before the rank changes and drops the objective it held for the
    /// squad, so the allocator can hand it out again. The former leader
    /// loses its objective and is halted.
    pub fn demote(&mut self, leader: EntityId) -> Result<()> {
        let entity = self.get(leader).ok_or(CommandError::NotRegistered(leader))?;
        if entity.kind() != RankKind::Leader {
            return Err(CommandError::RankMismatch {
                id: leader,
                expected: RankKind::Leader,
                actual: entity.kind(),
            });
        }
        let commander = self
            .commander_of(leader)
            .ok_or(CommandError::NotRegistered(leader))?;

        for member in self.members(leader) {
            self.register(member, commander)?;
            if let Ok(core) = self.core_mut(member) {
                core.current_objective = None;
            }
        }

        self.transform(leader, |entity| entity.into_unit().0);

        if let Ok(command) = self.command_mut(commander) {
            command.leaders.retain(|l| *l != leader);
        }

        if let Ok(core) = self.core_mut(leader) {
            core.current_objective = None;
            core.halt();
        }

        tracing::debug!("Demoted {} under {}", leader, commander);
        Ok(())
    }

    /// Swap the entity stored under `id` for `f(entity)`; the id stays the key
    fn transform(&mut self, id: EntityId, f: impl FnOnce(Entity) -> Entity) {
        if let Some(entity) = self.take(id) {
            self.put(f(entity));
        }
    }
}
