//! Item engine - resolves items when their host piece locks
//!
//! Items are processed in row-major order (top row first, then left to right).
//! Each item mark is taken off the grid before its effect runs, so an item is
//! consumed exactly once. A Bomb that empties another item's cell consumes
//! that item without triggering it.

use arrayvec::ArrayVec;

use crate::config::ItemRules;
use crate::grid::{Grid, LockedItem};
use crate::types::{BattleEffect, ItemKind, Tile, BOARD_HEIGHT};

/// What the items of one lock did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemOutcome {
    /// Flat points from Score items
    pub bonus_score: u32,
    /// Cells emptied by bombs
    pub cells_cleared: u32,
    /// Cells added by LineClear and WeightBlock
    pub cells_filled: u32,
    /// Effects to deliver to the opponent
    pub effects: ArrayVec<BattleEffect, 4>,
    /// Items that actually fired, in processing order
    pub triggered: ArrayVec<ItemKind, 4>,
}

/// Per-match item state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemEngine {
    double_score_clears: u32,
}

impl ItemEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the items of a just-locked piece against the grid.
    ///
    /// Runs before the line-clear pass, so rows filled by LineClear or
    /// WeightBlock are cleared by the same lock.
    pub fn on_lock(&mut self, grid: &mut Grid, locked: &[LockedItem], rules: &ItemRules, battle: bool) -> ItemOutcome {
        let mut outcome = ItemOutcome::default();
        let mut ordered: ArrayVec<LockedItem, 4> = locked.iter().copied().take(4).collect();
        ordered.sort_by_key(|it| (it.y, it.x));

        for LockedItem { x, y, .. } in ordered {
            let Some(item) = grid.take_item(x, y) else {
                continue;
            };
            outcome.triggered.push(item);

            match item {
                ItemKind::LineClear => {
                    outcome.cells_filled += grid.fill_row(y, Tile::Filler);
                }
                ItemKind::TimeStop => {
                    if battle {
                        outcome.effects.push(BattleEffect::TimeStop {
                            duration_ms: rules.time_stop_ms,
                        });
                    }
                }
                ItemKind::DoubleScore => {
                    self.double_score_clears = rules.double_score_clears;
                }
                ItemKind::Bomb => {
                    let r = rules.bomb_radius.max(0);
                    for dy in -r..=r {
                        for dx in -r..=r {
                            if grid.clear_cell(x + dx, y + dy) {
                                outcome.cells_cleared += 1;
                            }
                        }
                    }
                }
                ItemKind::WeightBlock => {
                    for below in (y + 1)..BOARD_HEIGHT as i8 {
                        if !grid.is_valid(x, below) {
                            break;
                        }
                        grid.set(x, below, Some(Tile::Weight));
                        outcome.cells_filled += 1;
                    }
                }
                ItemKind::Score(points) => {
                    outcome.bonus_score = outcome.bonus_score.saturating_add(points);
                }
            }
        }

        outcome
    }

    /// 2 while a DoubleScore is active, otherwise 1
    pub fn score_multiplier(&self) -> u32 {
        if self.double_score_clears > 0 {
            2
        } else {
            1
        }
    }

    /// Count one line-clear event against an active DoubleScore
    pub fn note_line_clear(&mut self) {
        self.double_score_clears = self.double_score_clears.saturating_sub(1);
    }

    /// Line-clear events left on the active DoubleScore
    pub fn double_score_remaining(&self) -> u32 {
        self.double_score_clears
    }

    pub fn reset(&mut self) {
        self.double_score_clears = 0;
    }
}
