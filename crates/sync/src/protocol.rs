//! Protocol module - packets exchanged between two battle peers
//!
//! Packets are line-delimited JSON. Every packet carries the same envelope:
//! `v` (protocol version), `seq` (per-sender sequence number), `ts` (sender
//! clock in ms), and `type`, followed by the fields of that type.
//!
//! ```text
//! {"v":1,"seq":1,"ts":0,"type":"hello","name":"alice"}
//! {"v":1,"seq":2,"ts":5,"type":"game_mode_select","mode":"item"}
//! {"v":1,"seq":3,"ts":9,"type":"ready"}
//! {"v":1,"seq":4,"ts":12,"type":"game_start","seed":42,"mode":"item"}
//! {"v":1,"seq":9,"ts":300,"type":"game_state","score":120,"level":1,"lines":0,"game_over":false,"board":[[0,...],...]}
//! {"v":1,"seq":10,"ts":310,"type":"effect","effect":{"kind":"time_stop","duration_ms":5000}}
//! {"v":1,"seq":11,"ts":900,"type":"disconnect","reason":"quit"}
//! ```

use serde::{Deserialize, Serialize};

use crate::core::GameSnapshot;
use crate::error::{DisconnectReason, ProtocolError};
use crate::types::{BattleEffect, GameMode, BOARD_HEIGHT, BOARD_WIDTH};

/// Current protocol version
pub const PROTOCOL_VERSION: u16 = 1;

/// Longest line a peer may send
pub const MAX_LINE_BYTES: usize = 16 * 1024;

pub type BoardCodes = [[u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    pub v: u16,
    pub seq: u64,
    pub ts: u64,
    #[serde(flatten)]
    pub body: PacketBody,
}

impl Packet {
    pub fn new(seq: u64, ts: u64, body: PacketBody) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            seq,
            ts,
            body,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PacketBody {
    /// Sent by both peers once connected
    Hello { name: String },
    /// Server -> client: the battle sub-mode
    GameModeSelect { mode: ModeName },
    Ready,
    /// Server -> client: shared seed and mode; starts (or restarts) the match
    GameStart { seed: u64, mode: ModeName },
    GameState(StateSummary),
    ChatMessage { message: String },
    Ping { nonce: u64, sent_ms: u64 },
    /// Echo of a ping
    Pong { nonce: u64, sent_ms: u64 },
    Effect { effect: EffectWire },
    /// Request (or acknowledge) a restart
    Restart,
    Disconnect { reason: DisconnectReason },
}

impl PacketBody {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::GameModeSelect { .. } => "game_mode_select",
            Self::Ready => "ready",
            Self::GameStart { .. } => "game_start",
            Self::GameState(_) => "game_state",
            Self::ChatMessage { .. } => "chat_message",
            Self::Ping { .. } => "ping",
            Self::Pong { .. } => "pong",
            Self::Effect { .. } => "effect",
            Self::Restart => "restart",
            Self::Disconnect { .. } => "disconnect",
        }
    }
}

/// Low-frequency summary of one player's match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSummary {
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub game_over: bool,
    /// Tile codes per cell; 0 is empty, active cells carry `ACTIVE_CODE_FLAG`
    pub board: BoardCodes,
}

impl StateSummary {
    pub fn from_snapshot(snapshot: &GameSnapshot) -> Self {
        Self {
            score: snapshot.score,
            level: snapshot.level,
            lines: snapshot.lines,
            game_over: snapshot.is_game_over(),
            board: snapshot.board_codes(),
        }
    }
}

impl Default for StateSummary {
    fn default() -> Self {
        Self {
            score: 0,
            level: 1,
            lines: 0,
            game_over: false,
            board: [[0u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeName {
    Normal,
    Item,
    TimeAttack,
}

impl From<GameMode> for ModeName {
    fn from(value: GameMode) -> Self {
        match value {
            GameMode::Normal => Self::Normal,
            GameMode::Item => Self::Item,
            GameMode::TimeAttack => Self::TimeAttack,
        }
    }
}

impl From<ModeName> for GameMode {
    fn from(value: ModeName) -> Self {
        match value {
            ModeName::Normal => GameMode::Normal,
            ModeName::Item => GameMode::Item,
            ModeName::TimeAttack => GameMode::TimeAttack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectWire {
    TimeStop { duration_ms: u32 },
}

impl From<BattleEffect> for EffectWire {
    fn from(value: BattleEffect) -> Self {
        match value {
            BattleEffect::TimeStop { duration_ms } => Self::TimeStop { duration_ms },
        }
    }
}

impl From<EffectWire> for BattleEffect {
    fn from(value: EffectWire) -> Self {
        match value {
            EffectWire::TimeStop { duration_ms } => BattleEffect::TimeStop { duration_ms },
        }
    }
}

/// Encode a packet as a single JSON line (without the trailing newline)
pub fn encode_packet(packet: &Packet) -> Result<String, ProtocolError> {
    let line = serde_json::to_string(packet).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    if line.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::Encode(format!("packet too large: {} bytes", line.len())));
    }
    Ok(line)
}

/// Decode one line. The version is checked before the body so that a newer
/// peer is reported as a mismatch rather than as garbage.
pub fn decode_packet(line: &str) -> Result<Packet, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    if line.len() > MAX_LINE_BYTES {
        return Err(ProtocolError::Malformed(format!("line too long: {} bytes", line.len())));
    }

    #[derive(Debug, Deserialize)]
    struct VersionOnly {
        v: Option<u16>,
    }
    let version = serde_json::from_str::<VersionOnly>(line)
        .map_err(|e| ProtocolError::Malformed(e.to_string()))?
        .v
        .ok_or_else(|| ProtocolError::Malformed("missing protocol version".to_string()))?;
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            found: version,
        });
    }

    serde_json::from_str::<Packet>(line).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_game_start() {
        let packet = Packet::new(
            4,
            12,
            PacketBody::GameStart {
                seed: 42,
                mode: ModeName::Item,
            },
        );
        let line = encode_packet(&packet).unwrap();
        assert!(line.contains(r#""type":"game_start""#));
        assert!(line.contains(r#""seed":42"#));
        assert!(line.contains(r#""mode":"item""#));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_decode_unit_packet() {
        let packet = decode_packet(r#"{"v":1,"seq":3,"ts":9,"type":"ready"}"#).unwrap();
        assert_eq!(packet.seq, 3);
        assert_eq!(packet.body, PacketBody::Ready);
    }

    #[test]
    fn test_decode_disconnect_reason() {
        let packet = decode_packet(r#"{"v":1,"seq":11,"ts":900,"type":"disconnect","reason":"quit"}"#).unwrap();
        assert_eq!(
            packet.body,
            PacketBody::Disconnect {
                reason: DisconnectReason::Quit
            }
        );
    }

    #[test]
    fn test_decode_effect() {
        let line = r#"{"v":1,"seq":1,"ts":0,"type":"effect","effect":{"kind":"time_stop","duration_ms":5000}}"#;
        let packet = decode_packet(line).unwrap();
        match packet.body {
            PacketBody::Effect { effect } => {
                assert_eq!(BattleEffect::from(effect), BattleEffect::TimeStop { duration_ms: 5000 });
            }
            other => panic!("expected effect, got {:?}", other),
        }
    }

    #[test]
    fn test_game_state_survives_the_wire() {
        let mut summary = StateSummary {
            score: 120,
            lines: 1,
            ..StateSummary::default()
        };
        summary.board[19][0] = 3;
        summary.board[0][4] = 0x13;
        let packet = Packet::new(9, 300, PacketBody::GameState(summary.clone()));

        let decoded = decode_packet(&encode_packet(&packet).unwrap()).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_version_mismatch() {
        let err = decode_packet(r#"{"v":2,"seq":1,"ts":0,"type":"ready"}"#).unwrap_err();
        assert_eq!(err, ProtocolError::VersionMismatch { expected: 1, found: 2 });
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert_eq!(decode_packet("   \n"), Err(ProtocolError::Empty));
        assert!(matches!(decode_packet("not json"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            decode_packet(r#"{"seq":1,"ts":0,"type":"ready"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            decode_packet(r#"{"v":1,"seq":1,"ts":0,"type":"teleport"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
