//! Core game logic - pure, deterministic, and testable
//!
//! This crate contains the rules of a single player's match: the grid, piece
//! shapes and rotation, the seeded generator, scoring, items, and the engine
//! that ties them together. It has no dependencies on UI, networking, or I/O:
//!
//! - **Deterministic**: the same seed deals the same pieces and items, which is
//!   what keeps two battle peers on identical sequences
//! - **Testable**: every rule is reachable through plain function calls
//! - **Portable**: runs headless, under a terminal, or behind a network session
//!
//! # Module Structure
//!
//! - [`grid`]: 10x20 playfield with item marks and one-pass line clearing
//! - [`pieces`]: tetromino shapes and clockwise rotation that carries items along
//! - [`collision`]: placement tests, kicked rotation, drop distance
//! - [`rng`]: seeded 7-bag generator with item dealing
//! - [`scoring`]: line clear points, levels, gravity
//! - [`items`]: item effects resolved at lock time
//! - [`game_state`]: the engine and its phase machine
//! - [`snapshot`]: read-only views for rendering and summaries
//! - [`clock`]: fixed-timestep accumulator
//!
//! # Example
//!
//! ```
//! use tetris_battle_core::{EngineConfig, GameEngine};
//! use tetris_battle_types::GameAction;
//!
//! let mut game = GameEngine::new(12345, EngineConfig::default());
//! game.start();
//!
//! game.apply_action(GameAction::MoveRight);
//! game.apply_action(GameAction::Rotate);
//! game.apply_action(GameAction::HardDrop);
//!
//! assert!(game.score() > 0);
//! ```
//!
//! # Timing
//!
//! Callers drive [`GameEngine::tick`] with elapsed milliseconds, normally in
//! fixed steps produced by a [`TickClock`]. Gravity starts at 1000ms per row
//! and speeds up every ten lines, clamped to 100..=1000ms.

pub mod clock;
pub mod collision;
pub mod config;
pub mod game_state;
pub mod grid;
pub mod items;
pub mod pieces;
pub mod rng;
pub mod scoring;
pub mod snapshot;

pub use tetris_battle_types as types;

pub use clock::TickClock;
pub use collision::{can_place, drop_distance, fits, try_rotate, Rotated, DEFAULT_KICKS};
pub use config::{EngineConfig, ItemRules, ScoreRules};
pub use game_state::{ActivePiece, EngineEvent, GameEngine, MatchResult, Phase};
pub use grid::{Grid, LockedItem};
pub use items::{ItemEngine, ItemOutcome};
pub use pieces::{remap_cw, shape_cells, MinoOffset, Piece, PieceShape};
pub use rng::{PieceGenerator, PieceQueue, SimpleRng};
pub use scoring::{drop_score, gravity_interval_ms, level_for_lines, line_clear_score};
pub use snapshot::{ActiveSnapshot, CellView, GameSnapshot, ACTIVE_CODE_FLAG};
