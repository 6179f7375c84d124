//! Shared types for the battle engine - data structures and constants
//!
//! Everything in this crate is plain data with no external dependencies, so it
//! can be used from the deterministic core, the network layer, and any
//! presentation layer alike.
//!
//! # Board Dimensions
//!
//! - **Width**: 10 columns (indexed 0-9, left to right)
//! - **Height**: 20 rows (indexed 0-19, top to bottom)
//! - **Spawn origin**: (3, 0)
//!
//! # Timing Constants
//!
//! | Constant | Value | Description |
//! |----------|-------|-------------|
//! | `TICK_MS` | 16 | Fixed timestep interval (~60 FPS) |
//! | `BASE_DROP_MS` | 1000 | Gravity interval at level 1 |
//! | `MIN_DROP_MS` | 100 | Lower clamp for gravity |
//! | `TIME_STOP_MS` | 5000 | Opponent freeze applied by a TimeStop item |
//! | `TIME_ATTACK_LIMIT_MS` | 180000 | Match length in time-attack mode |
//!
//! # Examples
//!
//! ```
//! use tetris_battle_types::{GameMode, PieceKind, Rotation, BOARD_HEIGHT, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::from_str("t"), Some(PieceKind::T));
//! assert_eq!(Rotation::North.rotate_cw(), Rotation::East);
//! assert_eq!(Rotation::from_index(5), Rotation::East);
//! assert_eq!(GameMode::from_str("time_attack"), Some(GameMode::TimeAttack));
//! assert_eq!((BOARD_WIDTH, BOARD_HEIGHT), (10, 20));
//! ```

/// Board width in cells (10 columns)
pub const BOARD_WIDTH: u8 = 10;

/// Board height in cells (20 rows)
pub const BOARD_HEIGHT: u8 = 20;

/// Spawn origin of a new piece (x, y)
pub const SPAWN_POSITION: (i8, i8) = (3, 0);

/// Fixed timestep interval in milliseconds (16ms ≈ 60 FPS)
pub const TICK_MS: u32 = 16;

/// Gravity interval at level 1 (1000ms = 1 second per row)
pub const BASE_DROP_MS: u32 = 1000;

/// Gravity intervals by level (milliseconds per row), index 0 = level 1
pub const DROP_INTERVALS: [u32; 9] = [1000, 800, 650, 500, 400, 320, 250, 200, 160];

/// Gravity interval once the table is exhausted
pub const DROP_INTERVAL_FLOOR_MS: u32 = 120;

/// Absolute minimum gravity interval
pub const MIN_DROP_MS: u32 = 100;

/// Lines needed to advance one level
pub const LINES_PER_LEVEL: u32 = 10;

/// Base points for clearing 0..=4 lines at level 1
pub const LINE_SCORES: [u32; 5] = [0, 100, 300, 500, 800];

/// Points for every line beyond four cleared by a single lock (only reachable with items)
pub const EXTRA_LINE_SCORE: u32 = 300;

/// Flat points awarded whenever a piece locks
pub const LOCK_SCORE: u32 = 10;

/// Points per cell for a manual soft drop
pub const SOFT_DROP_SCORE: u32 = 1;

/// Points per cell for a hard drop
pub const HARD_DROP_SCORE: u32 = 2;

/// Every Nth spawned piece carries an item in item mode
pub const ITEM_PIECE_INTERVAL: u32 = 4;

/// Opponent gravity freeze applied by a TimeStop item
pub const TIME_STOP_MS: u32 = 5000;

/// Number of line-clear events a DoubleScore item lasts
pub const DOUBLE_SCORE_CLEARS: u32 = 3;

/// Half-width of the square cleared by a Bomb item (1 = 3x3)
pub const BOMB_RADIUS: i8 = 1;

/// Match length in time-attack mode
pub const TIME_ATTACK_LIMIT_MS: u64 = 180_000;


/// The seven tetromino piece kinds
///
/// Each piece has a distinct shape and color:
/// - **I**: Cyan, horizontal bar
/// - **O**: Yellow, 2x2 square
/// - **T**: Magenta, T-shaped
/// - **S**: Green, S-shaped
/// - **Z**: Red, Z-shaped (mirror of S)
/// - **J**: Blue, J-shaped
/// - **L**: Orange, L-shaped (mirror of J)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    /// All kinds in canonical bag order
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Parse piece kind from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use tetris_battle_types::PieceKind;
    ///
    /// assert_eq!(PieceKind::from_str("i"), Some(PieceKind::I));
    /// assert_eq!(PieceKind::from_str("O"), Some(PieceKind::O));
    /// assert_eq!(PieceKind::from_str("unknown"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "i" => Some(PieceKind::I),
            "o" => Some(PieceKind::O),
            "t" => Some(PieceKind::T),
            "s" => Some(PieceKind::S),
            "z" => Some(PieceKind::Z),
            "j" => Some(PieceKind::J),
            "l" => Some(PieceKind::L),
            _ => None,
        }
    }

    /// Convert to lowercase string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PieceKind::I => "i",
            PieceKind::O => "o",
            PieceKind::T => "t",
            PieceKind::S => "s",
            PieceKind::Z => "z",
            PieceKind::J => "j",
            PieceKind::L => "l",
        }
    }

    /// Display color of the piece
    pub fn color(&self) -> Color {
        match self {
            PieceKind::I => Color(0, 240, 240),
            PieceKind::O => Color(240, 240, 0),
            PieceKind::T => Color(160, 0, 240),
            PieceKind::S => Color(0, 240, 0),
            PieceKind::Z => Color(240, 0, 0),
            PieceKind::J => Color(0, 0, 240),
            PieceKind::L => Color(240, 160, 0),
        }
    }
}

/// Rotation states, North is the spawn orientation
///
/// The rotation cycle goes: North → East → South → West → North,
/// which is the rotation index cycle 0 → 1 → 2 → 3 → 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    North,
    East,
    South,
    West,
}

impl Rotation {
    /// Rotate clockwise (90°)
    pub fn rotate_cw(&self) -> Self {
        match self {
            Rotation::North => Rotation::East,
            Rotation::East => Rotation::South,
            Rotation::South => Rotation::West,
            Rotation::West => Rotation::North,
        }
    }

    /// Rotation index 0..=3
    pub fn index(&self) -> u8 {
        match self {
            Rotation::North => 0,
            Rotation::East => 1,
            Rotation::South => 2,
            Rotation::West => 3,
        }
    }

    /// Rotation for an index, taken modulo 4
    pub fn from_index(index: u8) -> Self {
        match index % 4 {
            0 => Rotation::North,
            1 => Rotation::East,
            2 => Rotation::South,
            _ => Rotation::West,
        }
    }

    /// Convert to lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            Rotation::North => "north",
            Rotation::East => "east",
            Rotation::South => "south",
            Rotation::West => "west",
        }
    }
}

/// Discrete commands delivered by the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Move piece one cell left
    MoveLeft,
    /// Move piece one cell right
    MoveRight,
    /// Move piece one cell down (with soft drop scoring)
    SoftDrop,
    /// Drop piece to the lowest valid position and lock it
    HardDrop,
    /// Rotate piece 90° clockwise
    Rotate,
    /// Toggle pause state
    Pause,
}

impl GameAction {
    /// Parse action from string (case-insensitive)
    ///
    /// ```
    /// use tetris_battle_types::GameAction;
    ///
    /// assert_eq!(GameAction::from_str("hardDrop"), Some(GameAction::HardDrop));
    /// assert_eq!(GameAction::from_str("spin"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "moveleft" => Some(GameAction::MoveLeft),
            "moveright" => Some(GameAction::MoveRight),
            "softdrop" => Some(GameAction::SoftDrop),
            "harddrop" => Some(GameAction::HardDrop),
            "rotate" => Some(GameAction::Rotate),
            "pause" => Some(GameAction::Pause),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameAction::MoveLeft => "moveLeft",
            GameAction::MoveRight => "moveRight",
            GameAction::SoftDrop => "softDrop",
            GameAction::HardDrop => "hardDrop",
            GameAction::Rotate => "rotate",
            GameAction::Pause => "pause",
        }
    }
}

/// Special behavior attached to one cell of a piece
///
/// An item is consumed exactly once, when its host piece locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Forces the item's row into the line-clear pass
    LineClear,
    /// Suspends the opponent's gravity for a fixed duration (battle only)
    TimeStop,
    /// Doubles line-clear score for the next few clears
    DoubleScore,
    /// Empties a square of cells around the item
    Bomb,
    /// Fills the empty cells directly beneath the item
    WeightBlock,
    /// Flat score bonus
    Score(u32),
}

impl ItemKind {
    /// Whether the effect targets the opponent rather than the local board
    pub fn targets_opponent(&self) -> bool {
        matches!(self, ItemKind::TimeStop)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::LineClear => "line_clear",
            ItemKind::TimeStop => "time_stop",
            ItemKind::DoubleScore => "double_score",
            ItemKind::Bomb => "bomb",
            ItemKind::WeightBlock => "weight_block",
            ItemKind::Score(_) => "score",
        }
    }
}

/// Occupancy state of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellState {
    #[default]
    Empty,
    Fixed,
    /// Part of the currently falling piece
    Active,
}

/// Content of a fixed cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    /// Locked mino of a piece
    Piece(PieceKind),
    /// Cell added by a WeightBlock item
    Weight,
    /// Cell filled in by a LineClear item
    Filler,
}

impl Tile {
    pub fn color(&self) -> Color {
        match self {
            Tile::Piece(kind) => kind.color(),
            Tile::Weight => Color(128, 128, 128),
            Tile::Filler => Color(255, 255, 255),
        }
    }

    /// Compact code used by board summaries (1..=9, 0 means empty)
    pub fn code(&self) -> u8 {
        match self {
            Tile::Piece(PieceKind::I) => 1,
            Tile::Piece(PieceKind::O) => 2,
            Tile::Piece(PieceKind::T) => 3,
            Tile::Piece(PieceKind::S) => 4,
            Tile::Piece(PieceKind::Z) => 5,
            Tile::Piece(PieceKind::J) => 6,
            Tile::Piece(PieceKind::L) => 7,
            Tile::Weight => 8,
            Tile::Filler => 9,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Tile::Piece(PieceKind::I)),
            2 => Some(Tile::Piece(PieceKind::O)),
            3 => Some(Tile::Piece(PieceKind::T)),
            4 => Some(Tile::Piece(PieceKind::S)),
            5 => Some(Tile::Piece(PieceKind::Z)),
            6 => Some(Tile::Piece(PieceKind::J)),
            7 => Some(Tile::Piece(PieceKind::L)),
            8 => Some(Tile::Weight),
            9 => Some(Tile::Filler),
            _ => None,
        }
    }
}

/// RGB display color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u8, pub u8, pub u8);

/// Rule set of a match (the battle sub-mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameMode {
    /// Plain rules, no items
    #[default]
    Normal,
    /// Some pieces carry items
    Item,
    /// Plain rules with a fixed match length
    TimeAttack,
}

impl GameMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "normal" => Some(GameMode::Normal),
            "item" => Some(GameMode::Item),
            "time_attack" | "timeattack" => Some(GameMode::TimeAttack),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Normal => "normal",
            GameMode::Item => "item",
            GameMode::TimeAttack => "time_attack",
        }
    }

    pub fn has_items(&self) -> bool {
        matches!(self, GameMode::Item)
    }
}

/// Why a match ended for the local player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameOverReason {
    /// The spawn position was already occupied
    BlockOut,
    /// A piece locked touching the top boundary row
    LockOut,
    /// The time-attack clock ran out
    TimeUp,
}

/// Effects that cross from one player's board to the opponent's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BattleEffect {
    /// Suspend the receiver's gravity for `duration_ms`
    TimeStop { duration_ms: u32 },
}
