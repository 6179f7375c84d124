//! Tetris battle (workspace facade crate).
//!
//! Re-exports the workspace crates under one name:
//! `tetris_battle::{core, sync, types}`. The implementation lives in
//! dedicated crates under `crates/`.

pub use tetris_battle_core as core;
pub use tetris_battle_sync as sync;
pub use tetris_battle_types as types;
