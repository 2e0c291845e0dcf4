//! Property tests: random rank changes never break the hierarchy

use glam::Vec3;
use proptest::prelude::*;

use squad_command::core::config::CommandConfig;
use squad_command::core::types::TeamColor;
use squad_command::hierarchy::RankKind;
use squad_command::simulation::Simulation;

const UNITS: usize = 8;
const CAP: usize = 3;

#[derive(Debug, Clone)]
enum RankOp {
    Promote(usize),
    Demote(usize),
    Register(usize, usize),
    Die(usize),
    Tick(usize),
}

fn rank_op() -> impl Strategy<Value = RankOp> {
    prop_oneof![
        (0..UNITS).prop_map(RankOp::Promote),
        (0..UNITS).prop_map(RankOp::Demote),
        (0..UNITS, 0..=UNITS).prop_map(|(a, b)| RankOp::Register(a, b)),
        (0..UNITS).prop_map(RankOp::Die),
        (1..20usize).prop_map(RankOp::Tick),
    ]
}

fn create_test_sim() -> Simulation {
    let config = CommandConfig {
        auto_allocate: false,
        max_leader_count: CAP,
        respawn_seconds: 0.5,
        ..CommandConfig::default()
    };
    let mut sim = Simulation::new(config);
    sim.spawn_team(TeamColor::Red, "Red", Vec3::ZERO, UNITS).unwrap();
    sim
}

proptest! {
    #[test]
    fn test_rank_changes_keep_hierarchy_consistent(ops in prop::collection::vec(rank_op(), 1..60)) {
        let mut sim = create_test_sim();
        let commander = sim.commander(TeamColor::Red).unwrap();
        let roster = sim.registry().command(commander).unwrap().1.all_units.clone();

        for op in ops {
            // Errors are expected (dead units, full cap, wrong rank); only
            // the structure afterwards matters
            let _ = match op {
                RankOp::Promote(i) => sim.promote(roster[i]),
                RankOp::Demote(i) => sim.demote(roster[i]),
                RankOp::Register(i, j) => {
                    let leader = roster.get(j).copied().unwrap_or(commander);
                    sim.register(roster[i], leader)
                }
                RankOp::Die(i) => sim.die(roster[i]),
                RankOp::Tick(n) => {
                    for _ in 0..n {
                        sim.run_tick();
                    }
                    Ok(())
                }
            };

            let violations = sim.registry().hierarchy_violations();
            prop_assert!(violations.is_empty(), "{:?}", violations);
            prop_assert!(sim.registry().leader_count(commander) <= CAP);
        }

        for unit in &roster {
            let Some(entity) = sim.registry().get(*unit) else { continue };
            if entity.kind() == RankKind::Leader {
                prop_assert!(entity.is_alive());
                prop_assert_eq!(sim.registry().superior_of(*unit), Some(commander));
            }
        }
    }

    #[test]
    fn test_every_living_unit_has_one_superior(ops in prop::collection::vec(rank_op(), 1..40)) {
        let mut sim = create_test_sim();
        let commander = sim.commander(TeamColor::Red).unwrap();
        let roster = sim.registry().command(commander).unwrap().1.all_units.clone();

        for op in ops {
            let _ = match op {
                RankOp::Promote(i) => sim.promote(roster[i]),
                RankOp::Demote(i) => sim.demote(roster[i]),
                RankOp::Register(i, j) => {
                    let leader = roster.get(j).copied().unwrap_or(commander);
                    sim.register(roster[i], leader)
                }
                RankOp::Die(i) => sim.die(roster[i]),
                RankOp::Tick(n) => {
                    for _ in 0..n {
                        sim.run_tick();
                    }
                    Ok(())
                }
            };
        }

        for unit in &roster {
            let alive = sim
                .registry()
                .get(*unit)
                .map(|e| e.is_alive())
                .unwrap_or(false);
            if !alive {
                continue;
            }
            let superior = sim.registry().superior_of(*unit);
            prop_assert!(superior.is_some());
            let holders = sim
                .registry()
                .iter()
                .filter(|e| e.squad().map(|s| s.contains(*unit)).unwrap_or(false))
                .count();
            prop_assert_eq!(holders, 1);
        }
    }
}
