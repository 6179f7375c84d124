//! Headless battle peer (default binary).
//!
//! Runs one side of a battle with a scripted player, or a single-player
//! game with no network at all. Useful for smoke-testing two machines
//! against each other without a front end.
//!
//! ```text
//! battle-peer host [normal|item|time_attack]
//! battle-peer join
//! battle-peer solo [mode] [seed]
//! ```
//!
//! Address, port, and name come from `TETRIS_BATTLE_*` variables; log level
//! from `RUST_LOG`.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tetris_battle::core::{EngineConfig, GameEngine, MatchResult, TickClock};
use tetris_battle::sync::{BattleConfig, BattleMatch, ConnectionState, MatchNotice, NetBridge, Role, SessionEvent};
use tetris_battle::types::{GameAction, GameMode, TICK_MS};

const USAGE: &str = "usage: battle-peer host [mode] | join | solo [mode] [seed]";

/// Solo games stop here even if the autopilot survives
const SOLO_LIMIT_MS: u64 = 60 * 60 * 1000;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("host") => run_battle(Role::Server, parse_mode(args.get(1))?),
        Some("join") => run_battle(Role::Client, GameMode::Normal),
        Some("solo") => {
            let mode = parse_mode(args.get(1))?;
            let seed = args
                .get(2)
                .map(|s| s.parse::<u64>())
                .transpose()
                .context("seed must be a number")?
                .unwrap_or(1);
            run_solo(mode, seed)
        }
        _ => bail!(USAGE),
    }
}

fn parse_mode(arg: Option<&String>) -> Result<GameMode> {
    match arg {
        None => Ok(GameMode::Normal),
        Some(s) => GameMode::from_str(s).with_context(|| format!("unknown mode {s:?}")),
    }
}

/// Scripted player: cycles through a fixed move pattern
#[derive(Debug, Default)]
struct Autopilot {
    step: usize,
    since_ms: u32,
}

impl Autopilot {
    const PATTERN: [GameAction; 9] = [
        GameAction::Rotate,
        GameAction::MoveLeft,
        GameAction::MoveLeft,
        GameAction::HardDrop,
        GameAction::MoveRight,
        GameAction::MoveRight,
        GameAction::MoveRight,
        GameAction::SoftDrop,
        GameAction::HardDrop,
    ];
    const EVERY_MS: u32 = 120;

    fn next(&mut self, elapsed_ms: u32) -> Option<GameAction> {
        self.since_ms += elapsed_ms;
        if self.since_ms < Self::EVERY_MS {
            return None;
        }
        self.since_ms = 0;
        let action = Self::PATTERN[self.step % Self::PATTERN.len()];
        self.step += 1;
        Some(action)
    }
}

fn print_result(result: &MatchResult) {
    println!(
        "{}: {} score={} level={} lines={} time={}s end={:?}",
        result.player_name,
        result.mode.as_str(),
        result.score,
        result.level,
        result.lines,
        result.elapsed_ms / 1000,
        result.reason
    );
}

fn run_solo(mode: GameMode, seed: u64) -> Result<()> {
    let mut engine = GameEngine::new(seed, EngineConfig::single(mode));
    let mut clock = TickClock::default();
    let mut pilot = Autopilot::default();
    engine.start();
    clock.start();

    // Simulated time, as fast as the CPU allows.
    while !engine.is_game_over() && engine.elapsed_ms() < SOLO_LIMIT_MS {
        if let Some(action) = pilot.next(TICK_MS) {
            engine.apply_action(action);
        }
        for _ in 0..clock.advance(TICK_MS) {
            engine.tick(clock.step_ms());
        }
        for event in engine.take_events() {
            debug!(?event, "engine");
        }
    }

    print_result(&engine.result("solo"));
    Ok(())
}

fn report(notice: &MatchNotice) {
    match notice {
        MatchNotice::Session(SessionEvent::MatchStarted { seed, mode }) => {
            info!(seed, mode = mode.as_str(), "match started")
        }
        MatchNotice::Session(SessionEvent::PeerHello { name }) => info!(%name, "opponent joined"),
        MatchNotice::Session(SessionEvent::OpponentGameOver) => info!("opponent topped out"),
        MatchNotice::Session(SessionEvent::EffectReceived(effect)) => info!(?effect, "hit by effect"),
        MatchNotice::Session(SessionEvent::LagChanged(lagging)) => info!(lagging, "link quality changed"),
        MatchNotice::Session(SessionEvent::Chat(message)) => println!("opponent: {message}"),
        MatchNotice::EffectSent(effect) => info!(?effect, "effect sent"),
        MatchNotice::LocalGameOver(reason) => info!(?reason, "topped out"),
        other => debug!(?other, "notice"),
    }
}

fn run_battle(role: Role, mode: GameMode) -> Result<()> {
    let config = BattleConfig::from_env();
    let link = match role {
        Role::Server => NetBridge::host(&config)?,
        Role::Client => NetBridge::join(&config)?,
    };
    info!(role = ?role, host = %config.host, port = config.port, "battle peer starting");

    let start = Instant::now();
    let tick = Duration::from_millis(TICK_MS as u64);
    let mut battle = BattleMatch::new(config, role, link, 0);
    let mut pilot = Autopilot::default();
    let mut last = Instant::now();

    loop {
        thread::sleep(tick);
        let now_ms = start.elapsed().as_millis() as u64;
        let elapsed_ms = last.elapsed().as_millis() as u32;
        last = Instant::now();

        let mut notices = battle.pump(now_ms);
        match battle.session().state() {
            ConnectionState::ModeSelect if role == Role::Server => {
                battle.select_mode(mode, now_ms);
            }
            ConnectionState::ReadyWaiting if !battle.session().local_ready() => {
                notices.extend(battle.set_ready(now_ms));
            }
            ConnectionState::Disconnected(reason) => {
                info!(%reason, "battle ended");
                break;
            }
            _ => {}
        }

        if let Some(action) = pilot.next(elapsed_ms) {
            let (_, more) = battle.input(action, now_ms);
            notices.extend(more);
        }
        notices.extend(battle.tick(elapsed_ms, now_ms));

        for notice in &notices {
            report(notice);
        }
        if battle.session().match_finished() {
            break;
        }
    }

    if let Some(result) = battle.result() {
        print_result(&result);
    }
    let opponent = battle.session().opponent();
    println!(
        "{}: score={} level={} lines={}",
        opponent.name.as_deref().unwrap_or("opponent"),
        opponent.summary.score,
        opponent.summary.level,
        opponent.summary.lines
    );
    battle.dispose(start.elapsed().as_millis() as u64);
    Ok(())
}
