//! Sync module - two-player battles over a line-delimited JSON link
//!
//! Each peer runs its own engine. Nothing authoritative crosses the wire
//! except the seed: the server picks it, both sides build identical piece
//! sequences from it, and after that the peers only exchange low-frequency
//! state summaries, item effects, and control messages.
//!
//! # Flow
//!
//! 1. **Role**: one side hosts ([`Role::Server`]), the other joins
//! 2. **Hello**: both send their name once the link is up
//! 3. **Mode**: the server picks normal, item, or time attack
//! 4. **Ready**: both declare ready; the server then sends `game_start` with the seed
//! 5. **Playing**: state summaries every 250ms, effects as they happen, pings every second
//! 6. **Game over / restart**: a restart needs both sides; the server deals a new seed
//!
//! ```text
//! server                          client
//!   | <---------- connect ---------- |
//!   | ----------- hello -----------> |
//!   | <---------- hello ------------ |
//!   | ------ game_mode_select -----> |
//!   | <---------- ready ------------ |
//!   | ----------- ready -----------> |
//!   | -------- game_start ---------> |
//!   | <======= game_state ========> |
//! ```
//!
//! # Layers
//!
//! - [`protocol`]: packet types and the line codec
//! - [`session`]: connection state machine, pure and clock-free
//! - [`link`]: the [`PacketLink`] seam and an in-process link
//! - [`transport`]: TCP reader and writer tasks
//! - [`runtime`]: tokio runtime bridge for a synchronous game loop
//! - [`battle`]: one engine plus a session plus a link
//!
//! # Environment Variables
//!
//! See [`config`]; everything is prefixed `TETRIS_BATTLE_`.

pub mod battle;
pub mod config;
pub mod error;
pub mod link;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod transport;

pub use tetris_battle_core as core;
pub use tetris_battle_types as types;

pub use battle::{BattleMatch, MatchNotice};
pub use config::BattleConfig;
pub use error::{DisconnectReason, ProtocolError};
pub use link::{memory_link_pair, LinkEvent, MemoryLink, PacketLink};
pub use protocol::{
    decode_packet, encode_packet, EffectWire, ModeName, Packet, PacketBody, StateSummary, MAX_LINE_BYTES,
    PROTOCOL_VERSION,
};
pub use runtime::NetBridge;
pub use session::{ConnectionState, OpponentView, Role, SessionEvent, SyncSession};
pub use transport::{accept, connect, listen, PeerLink};
