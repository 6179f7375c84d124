//! Session module - the battle connection state machine
//!
//! ```text
//! RoleSelection -> ServerWaiting | ClientConnecting -> ModeSelect -> ReadyWaiting
//!     -> Playing -> GameOverLocal | GameOverRemote
//! any connected state -> Disconnected(reason)
//! ```
//!
//! The session never touches a socket or a clock. Callers feed it packets,
//! link events, and the current time in milliseconds; it answers with
//! [`SessionEvent`]s and queues outgoing packets in an outbox that the caller
//! drains onto whatever link it uses.
//!
//! Only the server generates the shared seed. Packets that do not fit the
//! current state are dropped with a debug log; they never end the session.

use std::collections::VecDeque;
use std::net::SocketAddr;

use tracing::{debug, info};

use crate::config::BattleConfig;
use crate::error::DisconnectReason;
use crate::protocol::{ModeName, Packet, PacketBody, StateSummary};
use crate::types::{BattleEffect, GameMode, Tile};
use crate::core::ACTIVE_CODE_FLAG;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Listens, picks the mode, and generates the seed
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    RoleSelection,
    ServerWaiting,
    ClientConnecting,
    ModeSelect,
    ReadyWaiting,
    Playing,
    /// Local board topped out; the opponent may still be playing
    GameOverLocal,
    /// Opponent topped out first
    GameOverRemote,
    Disconnected(DisconnectReason),
}

impl ConnectionState {
    /// A peer is on the other end
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            Self::ModeSelect | Self::ReadyWaiting | Self::Playing | Self::GameOverLocal | Self::GameOverRemote
        )
    }

    /// A match has started and not been torn down
    pub fn in_match(&self) -> bool {
        matches!(self, Self::Playing | Self::GameOverLocal | Self::GameOverRemote)
    }
}

/// What the session learned from a packet, link event, or timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected { peer: Option<SocketAddr> },
    PeerHello { name: String },
    /// Client side: the server picked the mode
    ModeSelected(GameMode),
    PeerReady,
    /// Start a fresh local engine with this seed and mode
    MatchStarted { seed: u64, mode: GameMode },
    OpponentUpdated,
    OpponentGameOver,
    /// Apply to the local engine
    EffectReceived(BattleEffect),
    Chat(String),
    /// The opponent asked for a restart
    RestartRequested,
    LagChanged(bool),
    Disconnected(DisconnectReason),
}

/// Mirror of the opponent's last reported state. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpponentView {
    pub name: Option<String>,
    pub summary: StateSummary,
    /// Sequence number of the summary shown
    pub last_seq: Option<u64>,
    pub updated_ms: Option<u64>,
}

impl OpponentView {
    /// Tile at (x, y) and whether it belongs to the opponent's falling piece
    pub fn cell(&self, x: usize, y: usize) -> Option<(Tile, bool)> {
        let code = *self.summary.board.get(y)?.get(x)?;
        let tile = Tile::from_code(code & !ACTIVE_CODE_FLAG)?;
        Some((tile, code & ACTIVE_CODE_FLAG != 0))
    }

    pub fn is_game_over(&self) -> bool {
        self.summary.game_over
    }
}

/// Unanswered pings remembered for round-trip matching
const MAX_PENDING_PINGS: usize = 16;

fn random_seed() -> u64 {
    rand::random::<u64>()
}

#[derive(Debug, Clone)]
pub struct SyncSession {
    config: BattleConfig,
    seed_source: fn() -> u64,
    role: Option<Role>,
    state: ConnectionState,
    state_since_ms: u64,
    mode: GameMode,
    seed: Option<u64>,
    local_ready: bool,
    remote_ready: bool,
    local_restart: bool,
    remote_restart: bool,
    local_over: bool,
    next_seq: u64,
    outbox: Vec<Packet>,
    opponent: OpponentView,
    last_heard_ms: u64,
    last_state_sent_ms: Option<u64>,
    last_ping_ms: Option<u64>,
    ping_nonce: u64,
    /// (nonce, sent_ms), oldest first
    pending_pings: VecDeque<(u64, u64)>,
    /// Highest seq seen from the peer on this connection
    peer_seq: Option<u64>,
    latency_ms: Option<u64>,
    lagging: bool,
    peer_addr: Option<SocketAddr>,
    last_peer: Option<SocketAddr>,
}

impl SyncSession {
    pub fn new(config: BattleConfig) -> Self {
        Self {
            config,
            seed_source: random_seed,
            role: None,
            state: ConnectionState::RoleSelection,
            state_since_ms: 0,
            mode: GameMode::Normal,
            seed: None,
            local_ready: false,
            remote_ready: false,
            local_restart: false,
            remote_restart: false,
            local_over: false,
            next_seq: 0,
            outbox: Vec::new(),
            opponent: OpponentView::default(),
            last_heard_ms: 0,
            last_state_sent_ms: None,
            last_ping_ms: None,
            ping_nonce: 0,
            pending_pings: VecDeque::new(),
            peer_seq: None,
            latency_ms: None,
            lagging: false,
            peer_addr: None,
            last_peer: None,
        }
    }

    /// Replace the seed generator (server side only ever calls it)
    pub fn with_seed_source(mut self, seed_source: fn() -> u64) -> Self {
        self.seed_source = seed_source;
        self
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    /// Seed of the current match
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn opponent(&self) -> &OpponentView {
        &self.opponent
    }

    /// Last measured round trip
    pub fn latency_ms(&self) -> Option<u64> {
        self.latency_ms
    }

    pub fn is_lagging(&self) -> bool {
        self.lagging
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn local_ready(&self) -> bool {
        self.local_ready
    }

    /// Both boards have topped out
    pub fn match_finished(&self) -> bool {
        self.state.in_match() && self.local_over && self.opponent.is_game_over()
    }

    /// Address to dial for a reconnect: the server we last reached, once the
    /// session is disconnected. Servers re-host instead.
    pub fn reconnect_target(&self) -> Option<SocketAddr> {
        match (self.state, self.role) {
            (ConnectionState::Disconnected(_), Some(Role::Client)) => self.last_peer,
            _ => None,
        }
    }

    fn enter(&mut self, state: ConnectionState, now_ms: u64) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "session state");
        }
        self.state = state;
        self.state_since_ms = now_ms;
    }

    fn push(&mut self, now_ms: u64, body: PacketBody) {
        self.next_seq += 1;
        self.outbox.push(Packet::new(self.next_seq, now_ms, body));
    }

    fn ignore(&self, packet: &Packet) {
        debug!(kind = packet.kind(), seq = packet.seq, state = ?self.state, "ignoring out-of-state packet");
    }

    /// Pick a side. Allowed at the start and again after a disconnect.
    pub fn choose_role(&mut self, role: Role, now_ms: u64) -> bool {
        match self.state {
            ConnectionState::RoleSelection => {}
            ConnectionState::Disconnected(_) => self.reset_connection(),
            _ => return false,
        }
        self.role = Some(role);
        let next = match role {
            Role::Server => ConnectionState::ServerWaiting,
            Role::Client => ConnectionState::ClientConnecting,
        };
        self.enter(next, now_ms);
        true
    }

    fn reset_connection(&mut self) {
        self.mode = GameMode::Normal;
        self.seed = None;
        self.local_ready = false;
        self.remote_ready = false;
        self.local_restart = false;
        self.remote_restart = false;
        self.local_over = false;
        self.outbox.clear();
        self.opponent = OpponentView::default();
        self.last_state_sent_ms = None;
        self.last_ping_ms = None;
        self.pending_pings.clear();
        self.peer_seq = None;
        self.latency_ms = None;
        self.lagging = false;
        self.peer_addr = None;
    }

    /// The link is up
    pub fn on_connected(&mut self, peer: Option<SocketAddr>, now_ms: u64) -> Vec<SessionEvent> {
        if !matches!(self.state, ConnectionState::ServerWaiting | ConnectionState::ClientConnecting) {
            debug!(state = ?self.state, "ignoring connect outside of a connect phase");
            return Vec::new();
        }
        info!(peer = ?peer, role = ?self.role, "peer connected");
        self.peer_addr = peer;
        if peer.is_some() {
            self.last_peer = peer;
        }
        self.last_heard_ms = now_ms;
        self.enter(ConnectionState::ModeSelect, now_ms);
        let name = self.config.player_name.clone();
        self.push(now_ms, PacketBody::Hello { name });
        vec![SessionEvent::Connected { peer }]
    }

    /// Server only: choose the battle sub-mode
    pub fn select_mode(&mut self, mode: GameMode, now_ms: u64) -> bool {
        if self.role != Some(Role::Server) || self.state != ConnectionState::ModeSelect {
            return false;
        }
        self.mode = mode;
        self.push(now_ms, PacketBody::GameModeSelect { mode: mode.into() });
        self.enter(ConnectionState::ReadyWaiting, now_ms);
        true
    }

    /// Declare the local player ready
    pub fn set_ready(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        if self.state != ConnectionState::ReadyWaiting || self.local_ready {
            return Vec::new();
        }
        self.local_ready = true;
        self.push(now_ms, PacketBody::Ready);
        self.try_start(now_ms).into_iter().collect()
    }

    fn try_start(&mut self, now_ms: u64) -> Option<SessionEvent> {
        if self.role != Some(Role::Server)
            || self.state != ConnectionState::ReadyWaiting
            || !(self.local_ready && self.remote_ready)
        {
            return None;
        }
        Some(self.start_as_server(now_ms))
    }

    fn start_as_server(&mut self, now_ms: u64) -> SessionEvent {
        let seed = (self.seed_source)();
        let mode = self.mode;
        self.push(
            now_ms,
            PacketBody::GameStart {
                seed,
                mode: mode.into(),
            },
        );
        self.begin_match(seed, now_ms);
        SessionEvent::MatchStarted { seed, mode }
    }

    fn begin_match(&mut self, seed: u64, now_ms: u64) {
        info!(seed, mode = self.mode.as_str(), "match starting");
        self.seed = Some(seed);
        self.local_ready = false;
        self.remote_ready = false;
        self.local_restart = false;
        self.remote_restart = false;
        self.local_over = false;
        // Summaries the peer sent before this point belong to the old match
        self.opponent.summary = StateSummary::default();
        self.opponent.last_seq = self.peer_seq;
        self.opponent.updated_ms = None;
        self.last_state_sent_ms = None;
        self.enter(ConnectionState::Playing, now_ms);
    }

    /// Ask for a restart. The match resets once both sides have asked.
    pub fn request_restart(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        if !self.state.in_match() || self.local_restart {
            return Vec::new();
        }
        self.local_restart = true;
        self.push(now_ms, PacketBody::Restart);
        self.try_restart(now_ms).into_iter().collect()
    }

    fn try_restart(&mut self, now_ms: u64) -> Option<SessionEvent> {
        if self.role != Some(Role::Server) || !(self.local_restart && self.remote_restart) {
            return None;
        }
        Some(self.start_as_server(now_ms))
    }

    pub fn send_chat(&mut self, message: &str, now_ms: u64) -> bool {
        if !self.state.is_connected() {
            return false;
        }
        self.push(
            now_ms,
            PacketBody::ChatMessage {
                message: message.to_string(),
            },
        );
        true
    }

    /// Handle a packet from the peer
    pub fn handle_packet(&mut self, packet: Packet, now_ms: u64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.state.is_connected() {
            self.ignore(&packet);
            return events;
        }
        self.last_heard_ms = now_ms;
        self.peer_seq = Some(self.peer_seq.map_or(packet.seq, |seq| seq.max(packet.seq)));

        match packet.body {
            PacketBody::Hello { ref name } => {
                self.opponent.name = Some(name.clone());
                events.push(SessionEvent::PeerHello { name: name.clone() });
            }
            PacketBody::GameModeSelect { mode } => {
                if self.role == Some(Role::Client) && self.state == ConnectionState::ModeSelect {
                    self.mode = mode.into();
                    self.enter(ConnectionState::ReadyWaiting, now_ms);
                    events.push(SessionEvent::ModeSelected(self.mode));
                } else {
                    self.ignore(&packet);
                }
            }
            PacketBody::Ready => {
                if self.state == ConnectionState::ReadyWaiting && !self.remote_ready {
                    self.remote_ready = true;
                    events.push(SessionEvent::PeerReady);
                    events.extend(self.try_start(now_ms));
                } else {
                    self.ignore(&packet);
                }
            }
            PacketBody::GameStart { seed, mode } => {
                let restarting = self.state.in_match() && self.local_restart && self.remote_restart;
                if self.role == Some(Role::Client) && (self.state == ConnectionState::ReadyWaiting || restarting) {
                    self.mode = mode.into();
                    self.begin_match(seed, now_ms);
                    events.push(SessionEvent::MatchStarted { seed, mode: self.mode });
                } else {
                    self.ignore(&packet);
                }
            }
            PacketBody::GameState(ref summary) => {
                if !self.state.in_match() {
                    self.ignore(&packet);
                } else if self.opponent.last_seq.is_some_and(|last| packet.seq <= last) {
                    debug!(seq = packet.seq, "dropping stale state summary");
                } else {
                    let newly_over = summary.game_over && !self.opponent.summary.game_over;
                    self.opponent.summary = summary.clone();
                    self.opponent.last_seq = Some(packet.seq);
                    self.opponent.updated_ms = Some(now_ms);
                    events.push(SessionEvent::OpponentUpdated);
                    if newly_over {
                        info!(score = summary.score, "opponent topped out");
                        events.push(SessionEvent::OpponentGameOver);
                        if self.state == ConnectionState::Playing {
                            self.enter(ConnectionState::GameOverRemote, now_ms);
                        }
                    }
                }
            }
            PacketBody::ChatMessage { ref message } => {
                events.push(SessionEvent::Chat(message.clone()));
            }
            PacketBody::Ping { nonce, sent_ms } => {
                self.push(now_ms, PacketBody::Pong { nonce, sent_ms });
            }
            PacketBody::Pong { nonce, sent_ms } => {
                let answered = self.pending_pings.iter().position(|&(n, _)| n == nonce);
                if let Some(index) = answered {
                    // Pongs arrive in ping order; anything older is answered or lost
                    self.pending_pings.drain(..=index);
                    let rtt = now_ms.saturating_sub(sent_ms);
                    self.latency_ms = Some(rtt);
                    let lagging = rtt > self.config.lag_threshold_ms || self.ping_overdue(now_ms);
                    events.extend(self.set_lagging(lagging));
                } else {
                    debug!(nonce, "dropping unknown pong");
                }
            }
            PacketBody::Effect { effect } => {
                if self.state.in_match() && !self.local_over {
                    events.push(SessionEvent::EffectReceived(effect.into()));
                } else {
                    self.ignore(&packet);
                }
            }
            PacketBody::Restart => {
                if self.state.in_match() {
                    if !self.remote_restart {
                        self.remote_restart = true;
                        events.push(SessionEvent::RestartRequested);
                    }
                    events.extend(self.try_restart(now_ms));
                } else {
                    self.ignore(&packet);
                }
            }
            PacketBody::Disconnect { reason } => {
                events.push(self.fail(reason, now_ms, false));
            }
        }

        events
    }

    /// The link went away underneath us
    pub fn handle_link_closed(&mut self, reason: DisconnectReason, now_ms: u64) -> Vec<SessionEvent> {
        match self.state {
            ConnectionState::RoleSelection | ConnectionState::Disconnected(_) => Vec::new(),
            _ => vec![self.fail(reason, now_ms, false)],
        }
    }

    /// Run timers: connect and ready deadlines, peer silence, pings
    pub fn poll(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        let in_state = now_ms.saturating_sub(self.state_since_ms);
        match self.state {
            ConnectionState::ClientConnecting if in_state >= self.config.connect_timeout_ms => {
                vec![self.fail(DisconnectReason::Timeout, now_ms, false)]
            }
            ConnectionState::ServerWaiting if in_state >= self.config.ready_timeout_ms => {
                vec![self.fail(DisconnectReason::Timeout, now_ms, false)]
            }
            state if state.is_connected() => {
                if now_ms.saturating_sub(self.last_heard_ms) >= self.config.peer_timeout_ms {
                    return vec![self.fail(DisconnectReason::Timeout, now_ms, true)];
                }
                if state == ConnectionState::ReadyWaiting && in_state >= self.config.ready_timeout_ms {
                    return vec![self.fail(DisconnectReason::Timeout, now_ms, true)];
                }
                let ping_due = self
                    .last_ping_ms
                    .map_or(true, |t| now_ms.saturating_sub(t) >= self.config.ping_interval_ms);
                if ping_due {
                    self.ping_nonce += 1;
                    let nonce = self.ping_nonce;
                    self.push(now_ms, PacketBody::Ping { nonce, sent_ms: now_ms });
                    self.last_ping_ms = Some(now_ms);
                    if self.pending_pings.len() == MAX_PENDING_PINGS {
                        self.pending_pings.pop_front();
                    }
                    self.pending_pings.push_back((nonce, now_ms));
                }
                if !self.lagging && self.ping_overdue(now_ms) {
                    return self.set_lagging(true).into_iter().collect();
                }
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// The oldest unanswered ping has waited longer than the lag threshold
    fn ping_overdue(&self, now_ms: u64) -> bool {
        self.pending_pings
            .front()
            .is_some_and(|&(_, sent_ms)| now_ms.saturating_sub(sent_ms) > self.config.lag_threshold_ms)
    }

    fn set_lagging(&mut self, lagging: bool) -> Option<SessionEvent> {
        if lagging == self.lagging {
            return None;
        }
        info!(lagging, latency_ms = ?self.latency_ms, "peer lag changed");
        self.lagging = lagging;
        Some(SessionEvent::LagChanged(lagging))
    }

    /// A state summary is due at `now_ms`. Nothing is due while our own
    /// restart request is pending, so the peer never sees the old match after
    /// the new one starts.
    pub fn state_due(&self, now_ms: u64) -> bool {
        self.state.in_match()
            && !self.local_restart
            && self
                .last_state_sent_ms
                .map_or(true, |t| now_ms.saturating_sub(t) >= self.config.state_interval_ms)
    }

    /// Queue a state summary if the broadcast interval has passed (or `force`)
    pub fn publish_state(&mut self, summary: StateSummary, now_ms: u64, force: bool) -> bool {
        if !self.state.in_match() || self.local_restart || !(force || self.state_due(now_ms)) {
            return false;
        }
        self.push(now_ms, PacketBody::GameState(summary));
        self.last_state_sent_ms = Some(now_ms);
        true
    }

    /// Send an effect produced by the local engine to the opponent
    pub fn queue_effect(&mut self, effect: BattleEffect, now_ms: u64) -> bool {
        if !self.state.in_match() || self.opponent.is_game_over() {
            return false;
        }
        self.push(now_ms, PacketBody::Effect { effect: effect.into() });
        true
    }

    /// The local engine reported game over
    pub fn note_local_game_over(&mut self, now_ms: u64) -> bool {
        if !self.state.in_match() || self.local_over {
            return false;
        }
        self.local_over = true;
        if self.state == ConnectionState::Playing {
            self.enter(ConnectionState::GameOverLocal, now_ms);
        }
        true
    }

    /// Leave on purpose. Queues DISCONNECT if a peer is there. Idempotent.
    pub fn disconnect(&mut self, now_ms: u64) -> bool {
        match self.state {
            ConnectionState::RoleSelection | ConnectionState::Disconnected(_) => false,
            _ => {
                self.fail(DisconnectReason::Quit, now_ms, true);
                true
            }
        }
    }

    fn fail(&mut self, reason: DisconnectReason, now_ms: u64, notify_peer: bool) -> SessionEvent {
        if notify_peer && self.state.is_connected() {
            self.push(now_ms, PacketBody::Disconnect { reason });
        }
        info!(reason = %reason, state = ?self.state, "session disconnected");
        self.peer_addr = None;
        self.enter(ConnectionState::Disconnected(reason), now_ms);
        SessionEvent::Disconnected(reason)
    }

    /// Take every queued outgoing packet
    pub fn drain_outbox(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.outbox)
    }

    /// Mode name as it travels on the wire
    pub fn mode_name(&self) -> ModeName {
        self.mode.into()
    }
}
