//! Engine configuration
//!
//! Every rule constant the engine consults lives here so a match can be set up
//! without touching the global defaults. `EngineConfig::default()` reproduces
//! the standard rules.

use crate::collision::DEFAULT_KICKS;
use crate::types::{
    GameMode, BOMB_RADIUS, DOUBLE_SCORE_CLEARS, EXTRA_LINE_SCORE, HARD_DROP_SCORE, ITEM_PIECE_INTERVAL,
    LINES_PER_LEVEL, LINE_SCORES, LOCK_SCORE, MIN_DROP_MS, SOFT_DROP_SCORE, TIME_ATTACK_LIMIT_MS,
    TIME_STOP_MS, BASE_DROP_MS,
};

/// Point values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRules {
    /// Points for 0..=4 lines at level 1
    pub line_scores: [u32; 5],
    /// Points for each line past four
    pub extra_line: u32,
    pub lock: u32,
    pub soft_drop: u32,
    pub hard_drop: u32,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self {
            line_scores: LINE_SCORES,
            extra_line: EXTRA_LINE_SCORE,
            lock: LOCK_SCORE,
            soft_drop: SOFT_DROP_SCORE,
            hard_drop: HARD_DROP_SCORE,
        }
    }
}

/// Item dealing and effect parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRules {
    /// Every Nth piece carries an item
    pub piece_interval: u32,
    pub time_stop_ms: u32,
    /// Line-clear events a DoubleScore lasts
    pub double_score_clears: u32,
    pub bomb_radius: i8,
}

impl Default for ItemRules {
    fn default() -> Self {
        Self {
            piece_interval: ITEM_PIECE_INTERVAL,
            time_stop_ms: TIME_STOP_MS,
            double_score_clears: DOUBLE_SCORE_CLEARS,
            bomb_radius: BOMB_RADIUS,
        }
    }
}

/// Everything a [`GameEngine`](crate::GameEngine) needs besides its seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub mode: GameMode,
    /// Two-player match: opponent-targeted items produce effects
    pub battle: bool,
    pub lines_per_level: u32,
    /// Gravity clamp, inclusive
    pub min_gravity_ms: u32,
    pub max_gravity_ms: u32,
    /// Rotation kick offsets, tried in order
    pub kicks: Vec<(i8, i8)>,
    pub score: ScoreRules,
    pub items: ItemRules,
    /// Match length for time attack
    pub time_limit_ms: u64,
}

impl EngineConfig {
    pub fn single(mode: GameMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn battle(mode: GameMode) -> Self {
        Self {
            mode,
            battle: true,
            ..Self::default()
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: GameMode::Normal,
            battle: false,
            lines_per_level: LINES_PER_LEVEL,
            min_gravity_ms: MIN_DROP_MS,
            max_gravity_ms: BASE_DROP_MS,
            kicks: DEFAULT_KICKS.to_vec(),
            score: ScoreRules::default(),
            items: ItemRules::default(),
            time_limit_ms: TIME_ATTACK_LIMIT_MS,
        }
    }
}
