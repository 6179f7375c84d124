//! Scoring module - line clear points, levels, and gravity
//!
//! Line clears pay `line_scores[n] * level`; clears of more than four lines
//! (only reachable with LineClear items) add `extra_line` per line past four.
//! The level is derived from total lines and never goes down.

use crate::config::ScoreRules;
use crate::types::{DROP_INTERVALS, DROP_INTERVAL_FLOOR_MS};

/// Points for clearing `lines` rows at `level` (1-based)
pub fn line_clear_score(rules: &ScoreRules, lines: u32, level: u32) -> u32 {
    if lines == 0 {
        return 0;
    }
    let base = if lines <= 4 {
        rules.line_scores[lines as usize]
    } else {
        rules.line_scores[4].saturating_add(rules.extra_line.saturating_mul(lines - 4))
    };
    base.saturating_mul(level.max(1))
}

/// Level for a total line count (1-based)
pub fn level_for_lines(lines: u32, lines_per_level: u32) -> u32 {
    1 + lines / lines_per_level.max(1)
}

/// Gravity interval for a level, clamped to `[min_ms, max_ms]`
pub fn gravity_interval_ms(level: u32, min_ms: u32, max_ms: u32) -> u32 {
    let index = level.max(1) as usize - 1;
    let raw = DROP_INTERVALS
        .get(index)
        .copied()
        .unwrap_or(DROP_INTERVAL_FLOOR_MS);
    raw.clamp(min_ms, max_ms.max(min_ms))
}

/// Points for manually dropping `cells` rows
pub fn drop_score(rules: &ScoreRules, cells: u32, is_hard_drop: bool) -> u32 {
    let per_cell = if is_hard_drop { rules.hard_drop } else { rules.soft_drop };
    cells.saturating_mul(per_cell)
}
