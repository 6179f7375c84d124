//! Read-only views of an engine for presentation and network summaries.
//!
//! The grid stores only EMPTY and FIXED cells; a snapshot overlays the falling
//! piece as ACTIVE cells, with any items it carries.

use crate::game_state::{ActivePiece, Phase};
use crate::pieces::Piece;
use crate::types::{
    CellState, Color, GameMode, GameOverReason, ItemKind, PieceKind, Rotation, Tile, BOARD_HEIGHT, BOARD_WIDTH,
};

/// Added to a tile code in board summaries when the cell belongs to the falling piece
pub const ACTIVE_CODE_FLAG: u8 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellView {
    pub state: CellState,
    pub tile: Option<Tile>,
    pub item: Option<ItemKind>,
}

impl CellView {
    pub fn color(&self) -> Option<Color> {
        self.tile.map(|t| t.color())
    }

    /// Summary code: 0 empty, 1..=9 tile, with [`ACTIVE_CODE_FLAG`] set for ACTIVE cells
    pub fn code(&self) -> u8 {
        match (self.state, self.tile) {
            (CellState::Empty, _) | (_, None) => 0,
            (CellState::Fixed, Some(tile)) => tile.code(),
            (CellState::Active, Some(tile)) => tile.code() | ACTIVE_CODE_FLAG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub x: i8,
    pub y: i8,
    pub items: [Option<ItemKind>; 4],
}

impl From<ActivePiece> for ActiveSnapshot {
    fn from(value: ActivePiece) -> Self {
        Self {
            kind: value.piece.kind(),
            rotation: value.piece.rotation(),
            x: value.x,
            y: value.y,
            items: *value.piece.items(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameSnapshot {
    pub cells: [[CellView; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize],
    pub active: Option<ActiveSnapshot>,
    pub ghost_y: Option<i8>,
    /// Next piece, items included
    pub next: Piece,
    /// Kinds after `next`
    pub upcoming: [PieceKind; 5],
    pub mode: GameMode,
    pub seed: u64,
    pub phase: Phase,
    pub paused: bool,
    pub game_over: Option<GameOverReason>,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub elapsed_ms: u64,
    pub gravity_interval_ms: u32,
    pub time_stop_remaining_ms: u32,
    pub double_score_clears: u32,
}

impl GameSnapshot {
    pub fn cell(&self, x: i8, y: i8) -> Option<&CellView> {
        if x < 0 || y < 0 {
            return None;
        }
        self.cells.get(y as usize).and_then(|row| row.get(x as usize))
    }

    /// Board as summary codes, row-major
    pub fn board_codes(&self) -> [[u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize] {
        let mut out = [[0u8; BOARD_WIDTH as usize]; BOARD_HEIGHT as usize];
        for (y, row) in self.cells.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                out[y][x] = cell.code();
            }
        }
        out
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over.is_some()
    }

    pub fn playable(&self) -> bool {
        self.game_over.is_none() && !self.paused && self.phase == Phase::Falling
    }
}
