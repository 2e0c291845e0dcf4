//! Per-commander allocation planner
//!
//! Runs on a recheck interval rather than every tick. Each evaluation picks
//! the commander's attack and defend objectives, decides how many units each
//! deserves and hands the resulting leaders their orders.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::allocation::allocator::{allocate_to_single_objective, leader_for};
use crate::core::config::CommandConfig;
use crate::core::types::{planar_distance_squared, EntityId, ObjectiveId, SimTime};
use crate::hierarchy::{RankKind, Registry};
use crate::objectives::{ObjectiveBoard, ObjectiveKind};
use crate::orders::{Order, OrderDispatcher, OrderTarget};
use crate::simulation::events::{SimEventLog, SimEventType};

/// Which way a set of objectives is being worked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posture {
    Attack,
    Defend,
}

/// Objectives split by how urgently they can change hands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskClassification {
    /// Capture index 0
    pub capturable: Vec<ObjectiveId>,
    /// One capture away from opening up, and not already covered by a
    /// nearby candidate
    pub at_risk: Vec<ObjectiveId>,
}

/// Which allocation rule a posture fell into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationBranch {
    /// One objective, full share
    Single,
    /// One capturable, no separate at-risk objective
    CapturableOnly,
    /// One capturable plus one at-risk; only the capturable one is staffed
    CapturableWithAtRisk,
    /// One capturable plus several at-risk; reduced share
    CapturableWithManyAtRisk,
    /// Several capturable; nothing allocated
    MultipleCapturable,
    /// Nothing capturable; nothing allocated
    NothingCapturable,
}

/// What one evaluation did
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationReport {
    pub commander: Option<EntityId>,
    pub time: SimTime,
    pub attack: Vec<ObjectiveId>,
    pub defend: Vec<ObjectiveId>,
    /// Objective and the leader now responsible for it
    pub allocations: Vec<(ObjectiveId, EntityId)>,
    /// Objectives left without forces this cycle
    pub uncovered: Vec<ObjectiveId>,
    /// Leaders released because their objective is no longer a candidate
    pub released: Vec<EntityId>,
    pub branches: Vec<(Posture, AllocationBranch)>,
}

pub struct Planner {
    commander: EntityId,
    last_evaluation: Option<SimTime>,
    /// Explicitly requested objectives; discovered from the board when empty
    attack_objectives: Vec<ObjectiveId>,
    defend_objectives: Vec<ObjectiveId>,
}

impl Planner {
    pub fn new(commander: EntityId) -> Self {
        Self {
            commander,
            last_evaluation: None,
            attack_objectives: Vec::new(),
            defend_objectives: Vec::new(),
        }
    }

    pub fn commander(&self) -> EntityId {
        self.commander
    }

    /// Pin the objectives this commander works instead of discovering them
    pub fn set_objectives(&mut self, attack: Vec<ObjectiveId>, defend: Vec<ObjectiveId>) {
        self.attack_objectives = attack;
        self.defend_objectives = defend;
        self.last_evaluation = None;
    }

    pub fn clear_objectives(&mut self) {
        self.set_objectives(Vec::new(), Vec::new());
    }

    /// Force an evaluation on the next tick
    pub fn request_allocation(&mut self) {
        self.last_evaluation = None;
    }

    /// Should we re-evaluate at `now`?
    pub fn should_evaluate(&self, now: SimTime, interval: f64) -> bool {
        match self.last_evaluation {
            None => true,
            Some(last) => now >= last + interval,
        }
    }

    /// Evaluate if the recheck interval has elapsed
    pub fn update(
        &mut self,
        now: SimTime,
        config: &CommandConfig,
        registry: &mut Registry,
        board: &ObjectiveBoard,
        dispatcher: &mut OrderDispatcher,
        events: &mut SimEventLog,
    ) -> Option<AllocationReport> {
        if !self.should_evaluate(now, config.allocation_recheck_seconds) {
            return None;
        }
        Some(self.evaluate(now, config, registry, board, dispatcher, events))
    }

    /// Run one full allocation pass
    pub fn evaluate(
        &mut self,
        now: SimTime,
        config: &CommandConfig,
        registry: &mut Registry,
        board: &ObjectiveBoard,
        dispatcher: &mut OrderDispatcher,
        events: &mut SimEventLog,
    ) -> AllocationReport {
        self.last_evaluation = Some(now);

        let mut report = AllocationReport {
            commander: Some(self.commander),
            time: now,
            ..Default::default()
        };

        let alive = registry
            .get(self.commander)
            .map(|e| e.is_alive())
            .unwrap_or(false);
        if !alive {
            return report;
        }

        let (attack, defend) = self.resolve_objectives(registry, board);
        report.attack = attack.clone();
        report.defend = defend.clone();

        if let Ok(command) = registry.command_mut(self.commander) {
            command.attack_objective = None;
            command.defend_objective = None;
        }

        self.release_stale(registry, board, events, &attack, &defend, &mut report);

        self.allocate_side(
            Posture::Defend,
            &defend,
            config,
            registry,
            board,
            dispatcher,
            events,
            &mut report,
        );
        self.allocate_side(
            Posture::Attack,
            &attack,
            config,
            registry,
            board,
            dispatcher,
            events,
            &mut report,
        );

        if !report.uncovered.is_empty() {
            events.push(
                SimEventType::ObjectivesUncovered {
                    commander: self.commander,
                    objectives: report.uncovered.clone(),
                },
                format!(
                    "{} left {} objective(s) uncovered",
                    self.commander,
                    report.uncovered.len()
                ),
            );
        }

        report
    }

    /// Requested objectives that still exist, or discovered candidates
    fn resolve_objectives(
        &self,
        registry: &Registry,
        board: &ObjectiveBoard,
    ) -> (Vec<ObjectiveId>, Vec<ObjectiveId>) {
        let exists = |id: &ObjectiveId| board.get(*id).is_some();
        let attack: Vec<_> = self.attack_objectives.iter().copied().filter(exists).collect();
        let defend: Vec<_> = self.defend_objectives.iter().copied().filter(exists).collect();

        if attack.is_empty() && defend.is_empty() {
            discover_objectives(registry, board, self.commander)
        } else {
            (attack, defend)
        }
    }

    /// Demote leaders whose objective dropped out of both candidate lists,
    /// and leaders left without any objective (e.g. after capturing it)
    fn release_stale(
        &self,
        registry: &mut Registry,
        board: &ObjectiveBoard,
        events: &mut SimEventLog,
        attack: &[ObjectiveId],
        defend: &[ObjectiveId],
        report: &mut AllocationReport,
    ) {
        let mut leaders = registry
            .command(self.commander)
            .map(|(_, c)| c.leaders.clone())
            .unwrap_or_default();
        leaders.push(self.commander);

        for leader in leaders {
            let objective = registry.core(leader).ok().and_then(|c| c.current_objective);
            match objective {
                Some(o) if attack.contains(&o) || defend.contains(&o) => continue,
                // A zero share deallocates through the normal path
                Some(o) => {
                    allocate_to_single_objective(registry, board, events, self.commander, o, 0.0);
                }
                None if leader == self.commander => continue,
                None => match registry.demote(leader) {
                    Ok(()) => events.push(
                        SimEventType::Demoted {
                            unit: leader,
                            commander: self.commander,
                        },
                        format!("{} demoted, no objective left", leader),
                    ),
                    Err(e) => {
                        tracing::warn!("Demotion of idle leader {} failed: {}", leader, e);
                        continue;
                    }
                },
            }
            report.released.push(leader);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn allocate_side(
        &self,
        posture: Posture,
        objectives: &[ObjectiveId],
        config: &CommandConfig,
        registry: &mut Registry,
        board: &ObjectiveBoard,
        dispatcher: &mut OrderDispatcher,
        events: &mut SimEventLog,
        report: &mut AllocationReport,
    ) {
        let full = match posture {
            Posture::Attack => config.max_attackers_percentage,
            Posture::Defend => config.min_defenders_percentage,
        };

        let (primary, percentage, branch) = match objectives {
            [] => return,
            [single] => (*single, full, AllocationBranch::Single),
            _ => {
                let risk = classify_risk(board, objectives, config.too_far_away_to_respond);
                match (risk.capturable.as_slice(), risk.at_risk.len()) {
                    ([primary], 0) => (*primary, full, AllocationBranch::CapturableOnly),
                    ([primary], 1) => {
                        // Split policy between primary and at-risk is open; the
                        // at-risk objective waits for a later cycle
                        report.uncovered.extend(risk.at_risk.iter().copied());
                        (*primary, full, AllocationBranch::CapturableWithAtRisk)
                    }
                    ([primary], _) => (
                        *primary,
                        config.split_defenders_percentage,
                        AllocationBranch::CapturableWithManyAtRisk,
                    ),
                    ([], _) => {
                        tracing::debug!(
                            "{} has no capturable {:?} objective",
                            self.commander,
                            posture
                        );
                        report.uncovered.extend(objectives.iter().copied());
                        report
                            .branches
                            .push((posture, AllocationBranch::NothingCapturable));
                        return;
                    }
                    _ => {
                        tracing::warn!(
                            "{} has {} capturable {:?} objectives; multi-objective allocation is not supported",
                            self.commander,
                            risk.capturable.len(),
                            posture
                        );
                        report.uncovered.extend(objectives.iter().copied());
                        report
                            .branches
                            .push((posture, AllocationBranch::MultipleCapturable));
                        return;
                    }
                }
            }
        };
        report.branches.push((posture, branch));

        let Some(leader) = allocate_to_single_objective(
            registry,
            board,
            events,
            self.commander,
            primary,
            percentage,
        ) else {
            if leader_for(registry, self.commander, primary).is_none() {
                report.uncovered.push(primary);
            }
            return;
        };
        report.allocations.push((primary, leader));

        if let Ok(command) = registry.command_mut(self.commander) {
            match posture {
                Posture::Attack => command.attack_objective = Some(primary),
                Posture::Defend => command.defend_objective = Some(primary),
            }
        }

        let order = match posture {
            Posture::Attack => Order::attack(OrderTarget::Objective(primary)),
            Posture::Defend => Order::defend(OrderTarget::Objective(primary)),
        };
        self.order_squad(registry, board, dispatcher, events, leader, primary, order);
    }

    /// Send `order` to the objective's leader and down through its squad
    #[allow(clippy::too_many_arguments)]
    fn order_squad(
        &self,
        registry: &mut Registry,
        board: &ObjectiveBoard,
        dispatcher: &mut OrderDispatcher,
        events: &mut SimEventLog,
        leader: EntityId,
        objective: ObjectiveId,
        order: Order,
    ) {
        if leader != self.commander {
            dispatcher.propagate(registry, board, events, Some(self.commander), leader, order);
            return;
        }

        // The commander's squad is the whole reserve; only the units it
        // assigned to this objective follow the order
        let assigned: Vec<EntityId> = registry
            .members(self.commander)
            .into_iter()
            .filter(|id| {
                registry
                    .get(*id)
                    .map(|e| {
                        e.kind() == RankKind::Unit && e.core.current_objective == Some(objective)
                    })
                    .unwrap_or(false)
            })
            .collect();

        for unit in std::iter::once(self.commander).chain(assigned) {
            let issuer = (unit != self.commander).then_some(self.commander);
            if let Err(e) = dispatcher.issue(registry, board, events, issuer, unit, order) {
                tracing::trace!("Order for {} not applied: {}", unit, e);
            }
        }
    }
}

/// Partition the board into attack and defend candidates for `commander`
///
/// Defend candidates are owned by the commander and either capturable or
/// one step from it. Attack candidates are everything else that is
/// capturable now, except enemy home bases.
///
/// Enemy home bases are skipped even at capture index 0: a base only flips
/// through a flag run, so a squad standing in it never captures anything.
/// Flags are the attack targets for that.
pub fn discover_objectives(
    registry: &Registry,
    board: &ObjectiveBoard,
    commander: EntityId,
) -> (Vec<ObjectiveId>, Vec<ObjectiveId>) {
    let mut attack = Vec::new();
    let mut defend = Vec::new();

    for objective in board.iter() {
        let ours = objective.owner == Some(commander);
        if ours {
            if objective.capture_index == 0 || objective.is_at_risk() {
                defend.push(objective.id);
            }
        } else if objective.capture_index == 0 && objective.kind != ObjectiveKind::HomeBase {
            // Our own flag being carried off is retaken by defending it
            let carried_by_us = objective
                .carrier
                .and_then(|c| registry.commander_of(c))
                .map(|c| c == commander)
                .unwrap_or(false);
            if !carried_by_us {
                attack.push(objective.id);
            }
        }
    }

    (attack, defend)
}

/// Split same-posture objectives into capturable and at-risk
///
/// An at-risk objective within `respond_distance` of a capturable objective
/// or of an at-risk objective already accepted is dropped: forces
/// converging there can cover it.
pub fn classify_risk(
    board: &ObjectiveBoard,
    objectives: &[ObjectiveId],
    respond_distance: f32,
) -> RiskClassification {
    let mut risk = RiskClassification::default();
    let position = |id: &ObjectiveId| board.position(*id).unwrap_or(Vec3::ZERO);

    for id in objectives {
        if board.get(*id).map(|o| o.capture_index == 0).unwrap_or(false) {
            risk.capturable.push(*id);
        }
    }

    let respond_sq = respond_distance * respond_distance;
    for id in objectives {
        let Some(objective) = board.get(*id) else {
            continue;
        };
        if !objective.is_at_risk() {
            continue;
        }
        let covered = risk
            .capturable
            .iter()
            .chain(risk.at_risk.iter())
            .any(|other| planar_distance_squared(objective.position, position(other)) <= respond_sq);
        if !covered {
            risk.at_risk.push(*id);
        }
    }

    risk
}
