//! Simulation root
//!
//! Owns the registry, the objective board, the order dispatcher, the timer
//! queue and one allocation planner per team. Nothing here is global: build
//! as many `Simulation`s as you like.
//!
//! Each `run_tick` runs, in order: due timers, movement, carried flags,
//! objective contact, control point capture, allocation planners.

pub mod events;
pub mod snapshot;

use std::collections::BTreeMap;

use glam::Vec3;

use crate::allocation::{AllocationReport, Planner};
use crate::core::config::CommandConfig;
use crate::core::error::{CommandError, Result};
use crate::core::timers::{DeferredQueue, TimerKey};
use crate::core::types::{EntityId, ObjectiveId, SequenceId, SimTime, TeamColor, Tick};
use crate::hierarchy::{Entity, RankKind, Registry};
use crate::navigation::{Navigation, StraightLineNavigator};
use crate::objectives::{self, ContactReaction, ObjectiveBoard, ObjectiveKind};
use crate::orders::{self, Order, OrderDispatcher, OrderTarget};

pub use events::{SimEvent, SimEventLog, SimEventType};
pub use snapshot::{CommanderSnapshot, ObjectiveSnapshot, SimulationSnapshot, UnitSnapshot};

/// Spacing between units in a freshly spawned team
const SPAWN_SPACING: f32 = 2.0;
const SPAWN_COLUMNS: usize = 5;

pub struct Simulation {
    config: CommandConfig,
    registry: Registry,
    board: ObjectiveBoard,
    dispatcher: OrderDispatcher,
    timers: DeferredQueue<Simulation>,
    planners: BTreeMap<TeamColor, Planner>,
    navigation: Box<dyn Navigation>,

    // === TIME ===
    tick: Tick,
    clock: SimTime,

    /// Events raised since the last tick was returned
    events: SimEventLog,
    last_reports: Vec<AllocationReport>,
}

impl Simulation {
    pub fn new(config: CommandConfig) -> Self {
        let navigation = StraightLineNavigator::new(config.unit_speed, config.tick_seconds);
        Self::with_navigation(config, Box::new(navigation))
    }

    pub fn with_navigation(config: CommandConfig, navigation: Box<dyn Navigation>) -> Self {
        Self {
            registry: Registry::new(config.max_leader_count),
            board: ObjectiveBoard::new(),
            dispatcher: OrderDispatcher::new(config.seed, config.random_target_variation),
            timers: DeferredQueue::new(),
            planners: BTreeMap::new(),
            navigation,
            tick: 0,
            clock: 0.0,
            events: SimEventLog::new(0),
            last_reports: Vec::new(),
            config,
        }
    }

    // === ACCESSORS ===

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn board(&self) -> &ObjectiveBoard {
        &self.board
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn clock(&self) -> SimTime {
        self.clock
    }

    pub fn planner_mut(&mut self, team: TeamColor) -> Option<&mut Planner> {
        self.planners.get_mut(&team)
    }

    /// Reports from planners that evaluated during the last tick
    pub fn last_reports(&self) -> &[AllocationReport] {
        &self.last_reports
    }

    pub fn is_timer_scheduled(&self, key: TimerKey) -> bool {
        self.timers.is_scheduled(key)
    }

    pub fn commander(&self, team: TeamColor) -> Option<EntityId> {
        self.registry.commander_for_team(team)
    }

    pub fn score(&self, team: TeamColor) -> u32 {
        self.commander(team)
            .and_then(|c| self.registry.command(c).ok())
            .map(|(_, command)| command.score)
            .unwrap_or(0)
    }

    // === SETUP ===

    /// Create a team: its commander and `unit_count` units in a grid around
    /// `spawn_point`, all registered directly under the commander
    pub fn spawn_team(
        &mut self,
        team: TeamColor,
        commander_name: &str,
        spawn_point: Vec3,
        unit_count: usize,
    ) -> Result<EntityId> {
        let commander = self.registry.spawn_commander(
            commander_name,
            team,
            spawn_point,
            self.config.max_health,
        )?;

        for i in 0..unit_count {
            let row = (i / SPAWN_COLUMNS) as f32;
            let column = (i % SPAWN_COLUMNS) as f32 - (SPAWN_COLUMNS as f32 - 1.0) / 2.0;
            let position = spawn_point + Vec3::new(column * SPAWN_SPACING, 0.0, (row + 1.0) * SPAWN_SPACING);
            self.registry.enlist(
                commander,
                format!("{}-{}", team, i + 1),
                position,
                self.config.max_health,
            )?;
        }

        self.planners.insert(team, Planner::new(commander));
        tracing::info!(
            "Team {} spawned: commander {} with {} units",
            team,
            commander,
            unit_count
        );
        Ok(commander)
    }

    /// Place an objective, optionally owned by a team's commander
    pub fn add_objective(
        &mut self,
        name: &str,
        kind: ObjectiveKind,
        position: Vec3,
        owner: Option<TeamColor>,
    ) -> ObjectiveId {
        let owner = owner.and_then(|team| self.registry.commander_for_team(team));
        self.board.add(name, kind, position, owner)
    }

    pub fn set_sequence(&mut self, objective: ObjectiveId, sequence: SequenceId, capture_index: i32) {
        self.board.set_sequence(objective, sequence, capture_index);
    }

    // === ORDERS ===

    /// Give one unit an order
    pub fn issue(&mut self, issuer: Option<EntityId>, unit: EntityId, order: Order) -> Result<()> {
        self.dispatcher.issue(
            &mut self.registry,
            &self.board,
            &mut self.events,
            issuer,
            unit,
            order,
        )
    }

    /// Give a leader an order and fan it out through its squad
    pub fn order_squad(&mut self, issuer: Option<EntityId>, leader: EntityId, order: Order) -> Vec<EntityId> {
        self.dispatcher.propagate(
            &mut self.registry,
            &self.board,
            &mut self.events,
            issuer,
            leader,
            order,
        )
    }

    // === HIERARCHY ===

    pub fn promote(&mut self, unit: EntityId) -> Result<()> {
        let commander = self
            .registry
            .commander_of(unit)
            .ok_or(CommandError::NotRegistered(unit))?;
        self.registry.promote(unit, commander)?;
        self.events.push(
            SimEventType::Promoted { unit, commander },
            format!("{} promoted to leader", unit),
        );
        Ok(())
    }

    pub fn demote(&mut self, leader: EntityId) -> Result<()> {
        self.registry.demote(leader)?;
        if let Some(commander) = self.registry.commander_of(leader) {
            self.events.push(
                SimEventType::Demoted {
                    unit: leader,
                    commander,
                },
                format!("{} demoted to unit", leader),
            );
        }
        Ok(())
    }

    pub fn register(&mut self, subordinate: EntityId, leader: EntityId) -> Result<()> {
        let from = self.registry.superior_of(subordinate);
        self.registry.register(subordinate, leader)?;
        self.events.push(
            SimEventType::Reassigned {
                unit: subordinate,
                from,
                to: leader,
            },
            format!("{} now reports to {}", subordinate, leader),
        );
        Ok(())
    }

    /// Run a team's allocation pass now, regardless of its recheck timer
    pub fn request_allocation(&mut self, team: TeamColor) -> Option<AllocationReport> {
        let planner = self.planners.get_mut(&team)?;
        let report = planner.evaluate(
            self.clock,
            &self.config,
            &mut self.registry,
            &self.board,
            &mut self.dispatcher,
            &mut self.events,
        );
        Some(report)
    }

    // === LIFECYCLE ===

    /// Combat entry point. Returns true if the hit killed the unit.
    pub fn apply_damage(&mut self, unit: EntityId, amount: f32) -> Result<bool> {
        let core = self.registry.core_mut(unit)?;
        if !core.alive {
            return Err(CommandError::EntityDead(unit));
        }
        core.health = (core.health - amount).max(0.0);
        if core.health > 0.0 {
            return Ok(false);
        }
        self.die(unit)?;
        Ok(true)
    }

    /// A unit was killed
    ///
    /// Leaders are demoted first so their squad falls back to the commander.
    /// The unit drops any flag, leaves every objective and its squad, stays
    /// in the roster and respawns after `respawn_seconds`.
    pub fn die(&mut self, unit: EntityId) -> Result<()> {
        let entity = self
            .registry
            .get(unit)
            .ok_or(CommandError::NotRegistered(unit))?;
        if !entity.is_alive() {
            return Err(CommandError::EntityDead(unit));
        }
        let rank = entity.kind();

        if rank == RankKind::Leader {
            self.demote(unit)?;
        }

        self.leave_objectives(unit);

        let core = self.registry.core_mut(unit)?;
        core.alive = false;
        core.health = 0.0;
        core.deaths += 1;
        core.current_objective = None;
        core.attack_objective = None;
        core.halt();

        if rank != RankKind::Commander {
            self.registry.remove(unit);
        }

        let at = self.clock + self.config.respawn_seconds;
        self.timers.schedule_keyed(
            TimerKey::Respawn(unit),
            at,
            Box::new(move |sim: &mut Simulation| {
                if let Err(e) = sim.respawn(unit) {
                    tracing::debug!("Respawn of {} skipped: {}", unit, e);
                }
            }),
        );

        tracing::debug!("{} died, respawn at {:.1}s", unit, at);
        self.events.push(
            SimEventType::UnitDied { unit },
            format!("{} was killed", unit),
        );
        Ok(())
    }

    /// Bring a dead unit back at its team's spawn point, under its commander
    pub fn respawn(&mut self, unit: EntityId) -> Result<()> {
        let entity = self
            .registry
            .get(unit)
            .ok_or(CommandError::NotRegistered(unit))?;
        if entity.is_alive() {
            return Err(CommandError::AlreadyAssigned(unit));
        }
        let commander = self
            .registry
            .commander_of(unit)
            .ok_or(CommandError::NotRegistered(unit))?;
        let spawn_point = self.registry.command(commander)?.1.spawn_point;

        self.timers.cancel(TimerKey::Respawn(unit));

        let core = self.registry.core_mut(unit)?;
        core.alive = true;
        core.health = self.config.max_health;
        core.position = spawn_point;
        core.halt();

        if unit != commander {
            match self.registry.register(unit, commander) {
                Ok(()) | Err(CommandError::AlreadyAssigned(_)) => {}
                Err(e) => return Err(e),
            }
        }

        tracing::debug!("{} respawned", unit);
        self.events.push(
            SimEventType::UnitRespawned { unit },
            format!("{} respawned", unit),
        );
        Ok(())
    }

    /// The game object behind `unit` is gone for good
    pub fn despawn(&mut self, unit: EntityId) -> Option<Entity> {
        if !self.registry.contains(unit) {
            return None;
        }

        self.leave_objectives(unit);
        self.timers.cancel(TimerKey::Respawn(unit));

        let entity = self.registry.despawn(unit)?;
        if entity.kind() == RankKind::Commander {
            self.planners.remove(&entity.core.team);
        }

        self.events.push(
            SimEventType::UnitDespawned { unit },
            format!("{} despawned", unit),
        );
        Some(entity)
    }

    /// Drop any carried flag and exit every contest
    fn leave_objectives(&mut self, unit: EntityId) {
        if let Some(flag) =
            objectives::drop_flag(&mut self.board, &mut self.registry, &mut self.events, unit)
        {
            self.schedule_flag_reset(flag);
        }
        for objective in self.board.contested_by(unit) {
            objectives::exit(&mut self.board, &mut self.events, objective, unit);
        }
    }

    // === OBJECTIVE TIMERS ===

    /// Reset `flag` after `flag_reset_seconds`, replacing any pending reset
    pub fn schedule_flag_reset(&mut self, flag: ObjectiveId) {
        let at = self.clock + self.config.flag_reset_seconds;
        self.timers.schedule_keyed(
            TimerKey::FlagReset(flag),
            at,
            Box::new(move |sim: &mut Simulation| sim.reset_flag(flag)),
        );
    }

    pub fn reset_flag(&mut self, flag: ObjectiveId) {
        self.timers.cancel(TimerKey::FlagReset(flag));
        objectives::reset_flag(&mut self.board, &mut self.registry, &mut self.events, flag);
    }

    // === TICK ===

    /// Advance one fixed step and return everything that happened
    pub fn run_tick(&mut self) -> SimEventLog {
        self.tick += 1;
        self.clock += self.config.tick_seconds;
        self.events.tick = self.tick;
        self.last_reports.clear();

        for callback in self.timers.take_due(self.clock) {
            callback(self);
        }

        orders::advance_movement(
            &mut self.registry,
            &self.board,
            self.navigation.as_mut(),
            &mut self.events,
        );

        let registry = &self.registry;
        self.board.follow_carriers(|id| registry.position(id));

        self.update_contacts();

        objectives::update_control_points(
            &mut self.board,
            &mut self.registry,
            &mut self.events,
            self.config.tick_seconds,
            self.config.control_point_capture_seconds,
        );

        if self.config.auto_allocate {
            for planner in self.planners.values_mut() {
                if let Some(report) = planner.update(
                    self.clock,
                    &self.config,
                    &mut self.registry,
                    &self.board,
                    &mut self.dispatcher,
                    &mut self.events,
                ) {
                    self.last_reports.push(report);
                }
            }
        }

        self.send_carriers_home();

        std::mem::replace(&mut self.events, SimEventLog::new(self.tick))
    }

    /// Enter objectives units have reached and exit ones they have left
    fn update_contacts(&mut self) {
        let radius = self.config.contact_radius;
        let units: Vec<(EntityId, Vec3)> = self
            .registry
            .iter()
            .filter(|e| e.is_alive())
            .map(|e| (e.id(), e.core.position))
            .collect();
        let objective_ids = self.board.ids();

        for (unit, position) in units {
            for objective in &objective_ids {
                let Some(target) = self.board.get(*objective) else {
                    continue;
                };
                let inside = self.navigation.distance(position, target.position) <= radius;
                let contesting = target.side_of(unit).is_some();

                if inside && !contesting {
                    match objectives::enter(
                        &mut self.board,
                        &mut self.registry,
                        &mut self.events,
                        *objective,
                        unit,
                    ) {
                        Ok(outcome) => self.handle_reaction(unit, outcome.reaction),
                        Err(e) => tracing::trace!("{} cannot contest {}: {}", unit, objective, e),
                    }
                } else if !inside && contesting {
                    objectives::exit(&mut self.board, &mut self.events, *objective, unit);
                }
            }
        }
    }

    fn handle_reaction(&mut self, unit: EntityId, reaction: ContactReaction) {
        match reaction {
            ContactReaction::None => {}
            ContactReaction::FlagTaken(flag) => {
                self.timers.cancel(TimerKey::FlagReset(flag));
                tracing::info!("{} picked up flag {}", unit, flag);
            }
            ContactReaction::FlagReturned(flag) => {
                self.timers.cancel(TimerKey::FlagReset(flag));
            }
            ContactReaction::Captured(flag) => {
                self.schedule_flag_reset(flag);
                if let Some(planner) = self
                    .registry
                    .get(unit)
                    .and_then(|e| self.planners.get_mut(&e.core.team))
                {
                    planner.request_allocation();
                }
            }
        }
    }

    /// Flag carriers head for their own home base
    fn send_carriers_home(&mut self) {
        let carriers: Vec<(EntityId, Option<EntityId>)> = self
            .board
            .iter()
            .filter_map(|o| o.carrier)
            .map(|c| (c, self.registry.commander_of(c)))
            .collect();

        for (carrier, commander) in carriers {
            let Some(base) = self.board.iter().find(|o| {
                o.kind == ObjectiveKind::HomeBase && commander.is_some() && o.owner == commander
            }) else {
                continue;
            };
            let order = Order::defend(OrderTarget::Objective(base.id));
            if let Err(e) = self.issue(commander, carrier, order) {
                tracing::trace!("Carrier {} keeps its order: {}", carrier, e);
            }
        }
    }

    // === SNAPSHOTS ===

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot::capture(self.tick, self.clock, &self.registry, &self.board)
    }
}
