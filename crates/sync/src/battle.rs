//! Battle loop - one local engine wired to a session and a link
//!
//! [`BattleMatch`] is what a front end drives. Each frame it calls
//! [`BattleMatch::pump`] to take in network traffic and
//! [`BattleMatch::tick`] to advance the local engine; player input goes
//! through [`BattleMatch::input`]. Everything the engine produces for the
//! opponent (effects, game over, state summaries) leaves through the session
//! outbox, which is flushed onto the link at the end of each call.
//!
//! Losing the peer does not end the local game. The engine keeps running
//! offline until it tops out on its own; nothing more is sent.

use tracing::{debug, info};

use crate::config::BattleConfig;
use crate::core::{EngineConfig, EngineEvent, GameEngine, MatchResult, TickClock};
use crate::link::{LinkEvent, PacketLink};
use crate::protocol::StateSummary;
use crate::session::{ConnectionState, Role, SessionEvent, SyncSession};
use crate::types::{BattleEffect, GameAction, GameMode, GameOverReason};

/// Something a front end may want to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchNotice {
    Session(SessionEvent),
    EffectSent(BattleEffect),
    LocalGameOver(GameOverReason),
}

pub struct BattleMatch<L: PacketLink> {
    session: SyncSession,
    link: L,
    engine: Option<GameEngine>,
    clock: TickClock,
    last_now_ms: u64,
    disposed: bool,
}

impl<L: PacketLink> BattleMatch<L> {
    /// Start a match in `role` over `link`
    pub fn new(config: BattleConfig, role: Role, link: L, now_ms: u64) -> Self {
        let mut session = SyncSession::new(config);
        session.choose_role(role, now_ms);
        Self::with_session(session, link, now_ms)
    }

    /// Use a prepared session; its role must already be chosen
    pub fn with_session(session: SyncSession, link: L, now_ms: u64) -> Self {
        Self {
            session,
            link,
            engine: None,
            clock: TickClock::default(),
            last_now_ms: now_ms,
            disposed: false,
        }
    }

    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    /// Local engine; present once the first match has started
    pub fn engine(&self) -> Option<&GameEngine> {
        self.engine.as_ref()
    }

    pub fn engine_mut(&mut self) -> Option<&mut GameEngine> {
        self.engine.as_mut()
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn result(&self) -> Option<MatchResult> {
        let engine = self.engine.as_ref()?;
        Some(engine.result(&self.session.config().player_name))
    }

    /// Take in link events and run session timers
    pub fn pump(&mut self, now_ms: u64) -> Vec<MatchNotice> {
        self.last_now_ms = now_ms;
        let mut notices = Vec::new();
        if self.disposed {
            return notices;
        }

        while let Some(event) = self.link.try_recv() {
            let events = match event {
                LinkEvent::Connected { peer } => self.session.on_connected(peer, now_ms),
                LinkEvent::Packet(packet) => self.session.handle_packet(packet, now_ms),
                LinkEvent::Closed(reason) => self.session.handle_link_closed(reason, now_ms),
            };
            self.absorb(events, &mut notices);
        }
        let events = self.session.poll(now_ms);
        self.absorb(events, &mut notices);

        self.flush();
        notices
    }

    fn absorb(&mut self, events: Vec<SessionEvent>, notices: &mut Vec<MatchNotice>) {
        for event in events {
            match event {
                SessionEvent::MatchStarted { seed, mode } => {
                    let mut engine = GameEngine::new(seed, EngineConfig::battle(mode));
                    engine.start();
                    self.engine = Some(engine);
                    self.clock.stop();
                    self.clock.start();
                }
                SessionEvent::EffectReceived(effect) => {
                    if let Some(engine) = self.engine.as_mut() {
                        let applied = engine.apply_battle_effect(effect);
                        debug!(?effect, applied, "effect from opponent");
                    }
                }
                SessionEvent::Disconnected(reason) => {
                    if self.local_alive() {
                        info!(%reason, "peer gone, local game continues offline");
                    } else {
                        self.clock.stop();
                    }
                }
                _ => {}
            }
            notices.push(MatchNotice::Session(event));
        }
    }

    /// The local engine still takes ticks and input. A disconnect keeps an
    /// unfinished game going; reconnecting (a new role) ends it.
    fn local_alive(&self) -> bool {
        matches!(
            self.session.state(),
            ConnectionState::Playing | ConnectionState::GameOverRemote | ConnectionState::Disconnected(_)
        ) && self.engine.as_ref().is_some_and(|e| !e.is_game_over())
    }

    /// Advance the local engine by `elapsed_ms` of wall time
    pub fn tick(&mut self, elapsed_ms: u32, now_ms: u64) -> Vec<MatchNotice> {
        self.last_now_ms = now_ms;
        let mut notices = Vec::new();
        if self.disposed || !self.local_alive() {
            return notices;
        }
        let steps = self.clock.advance(elapsed_ms);
        let step_ms = self.clock.step_ms();
        if let Some(engine) = self.engine.as_mut() {
            for _ in 0..steps {
                engine.tick(step_ms);
                if engine.is_game_over() {
                    break;
                }
            }
        }
        self.after_engine(now_ms, &mut notices);
        notices
    }

    /// Apply a player action. Returns true if the engine accepted it.
    pub fn input(&mut self, action: GameAction, now_ms: u64) -> (bool, Vec<MatchNotice>) {
        self.last_now_ms = now_ms;
        let mut notices = Vec::new();
        if self.disposed || !self.local_alive() {
            return (false, notices);
        }
        let accepted = self.engine.as_mut().is_some_and(|e| e.apply_action(action));
        self.after_engine(now_ms, &mut notices);
        (accepted, notices)
    }

    fn after_engine(&mut self, now_ms: u64, notices: &mut Vec<MatchNotice>) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let mut force = false;
        for event in engine.take_events() {
            match event {
                EngineEvent::SendEffect(effect) => {
                    if self.session.queue_effect(effect, now_ms) {
                        notices.push(MatchNotice::EffectSent(effect));
                    }
                }
                EngineEvent::GameOver(reason) => {
                    info!(?reason, score = engine.score(), "local game over");
                    self.session.note_local_game_over(now_ms);
                    self.clock.stop();
                    force = true;
                    notices.push(MatchNotice::LocalGameOver(reason));
                }
                EngineEvent::Locked { .. } => {}
            }
        }
        if force || self.session.state_due(now_ms) {
            let summary = StateSummary::from_snapshot(&engine.snapshot());
            self.session.publish_state(summary, now_ms, force);
        }
        self.flush();
    }

    /// Server only: pick the mode
    pub fn select_mode(&mut self, mode: GameMode, now_ms: u64) -> bool {
        self.last_now_ms = now_ms;
        let selected = self.session.select_mode(mode, now_ms);
        self.flush();
        selected
    }

    pub fn set_ready(&mut self, now_ms: u64) -> Vec<MatchNotice> {
        self.last_now_ms = now_ms;
        let mut notices = Vec::new();
        let events = self.session.set_ready(now_ms);
        self.absorb(events, &mut notices);
        self.flush();
        notices
    }

    pub fn request_restart(&mut self, now_ms: u64) -> Vec<MatchNotice> {
        self.last_now_ms = now_ms;
        let mut notices = Vec::new();
        let events = self.session.request_restart(now_ms);
        self.absorb(events, &mut notices);
        self.flush();
        notices
    }

    pub fn send_chat(&mut self, message: &str, now_ms: u64) -> bool {
        self.last_now_ms = now_ms;
        let sent = self.session.send_chat(message, now_ms);
        self.flush();
        sent
    }

    fn flush(&mut self) {
        for packet in self.session.drain_outbox() {
            self.link.send(packet);
        }
    }

    /// Leave the match: stop the clock, tell the peer, close the link.
    /// Safe to call any number of times.
    pub fn dispose(&mut self, now_ms: u64) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.clock.stop();
        self.session.disconnect(now_ms);
        self.flush();
        self.link.close();
    }
}

impl<L: PacketLink> Drop for BattleMatch<L> {
    fn drop(&mut self) {
        self.dispose(self.last_now_ms);
    }
}
