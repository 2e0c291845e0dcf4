//! Headless Skirmish Runner
//!
//! Runs two AI-commanded teams over a small capture map and prints the
//! final state as JSON or text.

use clap::Parser;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use squad_command::core::config::CommandConfig;
use squad_command::core::error::Result;
use squad_command::core::types::{planar_distance, EntityId, SequenceId, TeamColor};
use squad_command::objectives::ObjectiveKind;
use squad_command::simulation::{SimEventType, Simulation, SimulationSnapshot};

/// Headless Skirmish Runner - AI vs AI objective play
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "Run two AI commanders against each other over capture objectives")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, default_value = "data/command.toml")]
    config: String,

    /// Units per team, excluding the commander
    #[arg(long, default_value_t = 12)]
    units: usize,

    /// Ticks to simulate
    #[arg(long, default_value_t = 3000)]
    max_ticks: u64,

    /// Random seed for deterministic runs (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Log every simulation event
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct SkirmishResult {
    ticks: u64,
    seed: u64,
    red_score: u32,
    blue_score: u32,
    captures: usize,
    deaths: usize,
    snapshot: SimulationSnapshot,
}

/// Chance per tick that a unit in range of an enemy lands a hit
const HIT_CHANCE: f64 = 0.05;
const HIT_DAMAGE: f32 = 25.0;
const ENGAGE_RANGE: f32 = 6.0;

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        "squad_command=debug"
    } else {
        "squad_command=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = CommandConfig::load(&args.config).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config '{}': {}", args.config, e);
        eprintln!("Using default configuration");
        CommandConfig::default()
    });
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let seed = config.seed;
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));

    let mut sim = Simulation::new(config);
    build_map(&mut sim, args.units)?;

    let mut captures = 0;
    let mut deaths = 0;
    for _ in 0..args.max_ticks {
        resolve_combat(&mut sim, &mut rng);

        let log = sim.run_tick();
        for event in &log.events {
            match event.event_type {
                SimEventType::ObjectiveCaptured { .. } => captures += 1,
                SimEventType::UnitDied { .. } => deaths += 1,
                _ => {}
            }
            if args.verbose {
                tracing::debug!("[{}] {}", event.tick, event.description);
            }
        }
    }

    let result = SkirmishResult {
        ticks: sim.tick(),
        seed,
        red_score: sim.score(TeamColor::Red),
        blue_score: sim.score(TeamColor::Blue),
        captures,
        deaths,
        snapshot: sim.snapshot(),
    };

    match args.format.as_str() {
        "text" => print_text(&result),
        _ => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}

/// Two bases with flags at either end and a three-point sequence between
fn build_map(sim: &mut Simulation, units: usize) -> Result<()> {
    let red_home = Vec3::new(0.0, 0.0, -120.0);
    let blue_home = Vec3::new(0.0, 0.0, 120.0);

    sim.spawn_team(TeamColor::Red, "Red Commander", red_home, units)?;
    sim.spawn_team(TeamColor::Blue, "Blue Commander", blue_home, units)?;

    sim.add_objective("Red Base", ObjectiveKind::HomeBase, red_home, Some(TeamColor::Red));
    sim.add_objective("Blue Base", ObjectiveKind::HomeBase, blue_home, Some(TeamColor::Blue));
    sim.add_objective(
        "Red Flag",
        ObjectiveKind::Flag,
        red_home + Vec3::new(10.0, 0.0, 0.0),
        Some(TeamColor::Red),
    );
    sim.add_objective(
        "Blue Flag",
        ObjectiveKind::Flag,
        blue_home + Vec3::new(10.0, 0.0, 0.0),
        Some(TeamColor::Blue),
    );

    let line = SequenceId(1);
    let south = sim.add_objective(
        "South Ridge",
        ObjectiveKind::ControlPoint,
        Vec3::new(-20.0, 0.0, -50.0),
        Some(TeamColor::Red),
    );
    let centre = sim.add_objective(
        "Centre Mill",
        ObjectiveKind::ControlPoint,
        Vec3::ZERO,
        None,
    );
    let north = sim.add_objective(
        "North Ridge",
        ObjectiveKind::ControlPoint,
        Vec3::new(20.0, 0.0, 50.0),
        Some(TeamColor::Blue),
    );
    sim.set_sequence(south, line, -1);
    sim.set_sequence(centre, line, 0);
    sim.set_sequence(north, line, 1);

    Ok(())
}

/// Stand-in for a combat collaborator: adjacent enemies trade random hits
fn resolve_combat(sim: &mut Simulation, rng: &mut ChaCha8Rng) {
    let living: Vec<(EntityId, TeamColor, Vec3)> = sim
        .registry()
        .iter()
        .filter(|e| e.is_alive())
        .map(|e| (e.id(), e.core.team, e.core.position))
        .collect();

    let mut hits = Vec::new();
    for (attacker, team, position) in &living {
        let target = living.iter().find(|(_, other_team, other_position)| {
            other_team != team && planar_distance(*position, *other_position) <= ENGAGE_RANGE
        });
        if let Some((target, _, _)) = target {
            if rng.gen_bool(HIT_CHANCE) {
                hits.push((*attacker, *target));
            }
        }
    }

    for (attacker, target) in hits {
        match sim.apply_damage(target, HIT_DAMAGE) {
            Ok(true) => tracing::debug!("{} killed {}", attacker, target),
            Ok(false) => {}
            Err(e) => tracing::trace!("Hit on {} ignored: {}", target, e),
        }
    }
}

fn print_text(result: &SkirmishResult) {
    println!("=== SKIRMISH RESULT ===");
    println!("Ticks: {}  Seed: {}", result.ticks, result.seed);
    println!(
        "Score: red {} - blue {}",
        result.red_score, result.blue_score
    );
    println!("Captures: {}  Deaths: {}", result.captures, result.deaths);
    println!();
    for objective in &result.snapshot.objectives {
        let owner = objective
            .owner_team
            .map(|t| t.to_string())
            .unwrap_or_else(|| "neutral".into());
        println!(
            "  {:<12} {:?} owner={} index={} attackers={} defenders={}",
            objective.name,
            objective.kind,
            owner,
            objective.capture_index,
            objective.attackers,
            objective.defenders
        );
    }
    println!();
    for commander in &result.snapshot.commanders {
        println!(
            "  {} commander {}: score {}, {} leaders, {} units",
            commander.team,
            commander.id,
            commander.score,
            commander.leaders.len(),
            commander.roster_size
        );
    }
}
