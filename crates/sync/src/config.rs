//! Battle configuration
//!
//! Environment variables:
//!
//! - `TETRIS_BATTLE_HOST`: bind or connect address (default: "127.0.0.1")
//! - `TETRIS_BATTLE_PORT`: port number (default: 7788)
//! - `TETRIS_BATTLE_NAME`: player name shown to the opponent (default: "player")
//! - `TETRIS_BATTLE_CONNECT_TIMEOUT_MS`: connect / accept wait (default: 10000)
//! - `TETRIS_BATTLE_READY_TIMEOUT_MS`: ready handshake wait (default: 60000)
//! - `TETRIS_BATTLE_PEER_TIMEOUT_MS`: silence before the peer is dropped (default: 10000)
//! - `TETRIS_BATTLE_STATE_INTERVAL_MS`: state summary cadence (default: 250)
//! - `TETRIS_BATTLE_PING_INTERVAL_MS`: ping cadence (default: 1000)
//! - `TETRIS_BATTLE_LAG_MS`: round trip above which the peer counts as lagging (default: 200)

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleConfig {
    pub host: String,
    pub port: u16,
    pub player_name: String,
    pub connect_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub peer_timeout_ms: u64,
    pub state_interval_ms: u64,
    pub ping_interval_ms: u64,
    pub lag_threshold_ms: u64,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7788,
            player_name: "player".to_string(),
            connect_timeout_ms: 10_000,
            ready_timeout_ms: 60_000,
            peer_timeout_ms: 10_000,
            state_interval_ms: 250,
            ping_interval_ms: 1_000,
            lag_threshold_ms: 200,
        }
    }
}

fn env_num(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl BattleConfig {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let host = env::var("TETRIS_BATTLE_HOST").unwrap_or(defaults.host);
        let port = env::var("TETRIS_BATTLE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);
        let player_name = env::var("TETRIS_BATTLE_NAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.player_name);

        Self {
            host,
            port,
            player_name,
            connect_timeout_ms: env_num("TETRIS_BATTLE_CONNECT_TIMEOUT_MS", defaults.connect_timeout_ms),
            ready_timeout_ms: env_num("TETRIS_BATTLE_READY_TIMEOUT_MS", defaults.ready_timeout_ms),
            peer_timeout_ms: env_num("TETRIS_BATTLE_PEER_TIMEOUT_MS", defaults.peer_timeout_ms),
            state_interval_ms: env_num("TETRIS_BATTLE_STATE_INTERVAL_MS", defaults.state_interval_ms),
            ping_interval_ms: env_num("TETRIS_BATTLE_PING_INTERVAL_MS", defaults.ping_interval_ms),
            lag_threshold_ms: env_num("TETRIS_BATTLE_LAG_MS", defaults.lag_threshold_ms),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .to_socket_addrs()
            .with_context(|| format!("invalid address {}:{}", self.host, self.port))?
            .next()
            .ok_or_else(|| anyhow!("no address for {}:{}", self.host, self.port))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
