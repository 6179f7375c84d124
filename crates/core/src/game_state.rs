//! Game state module - the single-player engine
//!
//! Ties together the grid, pieces, generator, scoring, and items. The engine
//! is driven by two kinds of input: discrete [`GameAction`]s and fixed-step
//! [`GameEngine::tick`] calls. Between them it walks the phase machine
//!
//! ```text
//! Idle -> Spawning -> Falling -> Locking -> LineClearing -> Spawning ...
//!                        \-> GameOver (from Spawning, Locking, or the time limit)
//! ```
//!
//! Transitions after a lock run to completion inside the call that caused the
//! lock, so callers only ever observe `Idle`, `Falling`, or `GameOver`.

use arrayvec::ArrayVec;

use crate::collision;
use crate::config::EngineConfig;
use crate::grid::Grid;
use crate::items::ItemEngine;
use crate::pieces::Piece;
use crate::rng::PieceGenerator;
use crate::scoring::{drop_score, gravity_interval_ms, level_for_lines, line_clear_score};
use crate::snapshot::{CellView, GameSnapshot};
use crate::types::{
    BattleEffect, CellState, GameAction, GameMode, GameOverReason, ItemKind, BOARD_HEIGHT, BOARD_WIDTH,
    SPAWN_POSITION,
};

/// Engine lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Created, not started
    Idle,
    Spawning,
    Falling,
    Locking,
    LineClearing,
    GameOver,
}

/// The falling piece and its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivePiece {
    pub piece: Piece,
    pub x: i8,
    pub y: i8,
}

impl ActivePiece {
    pub fn spawn(piece: Piece) -> Self {
        Self {
            piece,
            x: SPAWN_POSITION.0,
            y: SPAWN_POSITION.1,
        }
    }

    /// Absolute grid positions of the minos
    pub fn cells(&self) -> [(i8, i8); 4] {
        self.piece.cells().map(|(dx, dy)| (self.x + dx, self.y + dy))
    }
}

/// Things that happened since the last [`GameEngine::take_events`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A piece locked and the line-clear pass ran
    Locked {
        lines_cleared: u32,
        /// Points from the clear, multipliers applied
        line_clear_score: u32,
        /// Items that fired on this lock
        items: ArrayVec<ItemKind, 4>,
    },
    /// An effect for the opponent (battle only)
    SendEffect(BattleEffect),
    GameOver(GameOverReason),
}

/// Final numbers of a finished match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub player_name: String,
    pub mode: GameMode,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub elapsed_ms: u64,
    pub reason: Option<GameOverReason>,
}

/// Complete game state for one player
#[derive(Debug, Clone)]
pub struct GameEngine {
    config: EngineConfig,
    seed: u64,
    grid: Grid,
    active: Option<ActivePiece>,
    next: Piece,
    generator: PieceGenerator,
    items: ItemEngine,
    phase: Phase,
    score: u32,
    level: u32,
    lines: u32,
    pieces_locked: u32,
    gravity_timer_ms: u32,
    time_stop_remaining_ms: u32,
    elapsed_ms: u64,
    paused: bool,
    game_over: Option<GameOverReason>,
    /// Items fired by the lock currently being resolved
    lock_items: ArrayVec<ItemKind, 4>,
    events: Vec<EngineEvent>,
}

impl GameEngine {
    /// Create an idle engine; no piece is dealt until [`GameEngine::start`]
    pub fn new(seed: u64, config: EngineConfig) -> Self {
        let mut generator = PieceGenerator::new(seed, config.mode.has_items(), &config.items);
        let next = generator.next_piece();

        Self {
            config,
            seed,
            grid: Grid::new(),
            active: None,
            next,
            generator,
            items: ItemEngine::new(),
            phase: Phase::Idle,
            score: 0,
            level: 1,
            lines: 0,
            pieces_locked: 0,
            gravity_timer_ms: 0,
            time_stop_remaining_ms: 0,
            elapsed_ms: 0,
            paused: false,
            game_over: None,
            lock_items: ArrayVec::new(),
            events: Vec::new(),
        }
    }

    /// Start the match and spawn the first piece
    pub fn start(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        self.phase = Phase::Spawning;
        self.run_transitions();
    }

    /// Throw the current match away and start a fresh one from `seed`
    pub fn restart(&mut self, seed: u64) {
        *self = Self::new(seed, self.config.clone());
        self.start();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn mode(&self) -> GameMode {
        self.config.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over.is_some()
    }

    pub fn game_over_reason(&self) -> Option<GameOverReason> {
        self.game_over
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines(&self) -> u32 {
        self.lines
    }

    pub fn pieces_locked(&self) -> u32 {
        self.pieces_locked
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn time_stop_remaining_ms(&self) -> u32 {
        self.time_stop_remaining_ms
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable grid access for scenario setup
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn active(&self) -> Option<ActivePiece> {
        self.active
    }

    pub fn next_piece(&self) -> &Piece {
        &self.next
    }

    /// Replace the next piece (scenario setup)
    pub fn set_next_piece(&mut self, piece: Piece) {
        self.next = piece;
    }

    /// Replace the falling piece, keeping its position
    pub fn set_active_piece(&mut self, piece: Piece) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        if !collision::fits(&self.grid, &piece, active.x, active.y) {
            return false;
        }
        self.active = Some(ActivePiece { piece, ..active });
        true
    }

    /// Current gravity interval
    pub fn gravity_interval_ms(&self) -> u32 {
        gravity_interval_ms(self.level, self.config.min_gravity_ms, self.config.max_gravity_ms)
    }

    /// Row the falling piece would land on
    pub fn ghost_y(&self) -> Option<i8> {
        let active = self.active?;
        Some(active.y + collision::drop_distance(&self.grid, &active.piece, active.x, active.y) as i8)
    }

    fn can_act(&self) -> bool {
        self.phase == Phase::Falling && !self.paused
    }

    /// Advance time by `elapsed_ms`.
    ///
    /// Gravity moves the piece one row per interval and starts the lock when it
    /// cannot fall. An active TimeStop absorbs elapsed time before gravity sees
    /// it. Returns true if anything moved.
    pub fn tick(&mut self, elapsed_ms: u32) -> bool {
        if self.phase != Phase::Falling || self.paused {
            return false;
        }

        self.elapsed_ms += elapsed_ms as u64;
        if self.config.mode == GameMode::TimeAttack && self.elapsed_ms >= self.config.time_limit_ms {
            self.finish(GameOverReason::TimeUp);
            return true;
        }

        let mut remaining = elapsed_ms;
        if self.time_stop_remaining_ms > 0 {
            let frozen = remaining.min(self.time_stop_remaining_ms);
            self.time_stop_remaining_ms -= frozen;
            remaining -= frozen;
            if remaining == 0 {
                return false;
            }
        }

        self.gravity_timer_ms += remaining;
        let mut changed = false;
        loop {
            let interval = self.gravity_interval_ms();
            if self.phase != Phase::Falling || self.gravity_timer_ms < interval {
                break;
            }
            self.gravity_timer_ms -= interval;
            changed = true;
            if !self.try_shift(0, 1) {
                self.phase = Phase::Locking;
                self.run_transitions();
            }
        }
        changed
    }

    fn try_shift(&mut self, dx: i8, dy: i8) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        let (nx, ny) = (active.x + dx, active.y + dy);
        if !collision::fits(&self.grid, &active.piece, nx, ny) {
            return false;
        }
        self.active = Some(ActivePiece { x: nx, y: ny, ..active });
        true
    }

    pub fn move_left(&mut self) -> bool {
        self.can_act() && self.try_shift(-1, 0)
    }

    pub fn move_right(&mut self) -> bool {
        self.can_act() && self.try_shift(1, 0)
    }

    /// Move down one row for soft-drop points. Rejected when blocked; the
    /// piece then locks on the next gravity step.
    pub fn soft_drop(&mut self) -> bool {
        if !self.can_act() || !self.try_shift(0, 1) {
            return false;
        }
        self.score += drop_score(&self.config.score, 1, false);
        true
    }

    /// Drop to the landing row and lock immediately
    pub fn hard_drop(&mut self) -> bool {
        if !self.can_act() {
            return false;
        }
        let Some(active) = self.active else {
            return false;
        };
        let distance = collision::drop_distance(&self.grid, &active.piece, active.x, active.y);
        self.active = Some(ActivePiece {
            y: active.y + distance as i8,
            ..active
        });
        self.score += drop_score(&self.config.score, distance as u32, true);
        self.phase = Phase::Locking;
        self.run_transitions();
        true
    }

    /// Rotate clockwise with kicks; nothing changes if every kick fails
    pub fn rotate(&mut self) -> bool {
        if !self.can_act() {
            return false;
        }
        let Some(active) = self.active else {
            return false;
        };
        match collision::try_rotate(&self.grid, &active.piece, active.x, active.y, &self.config.kicks) {
            Some(rotated) => {
                self.active = Some(ActivePiece {
                    piece: rotated.piece,
                    x: rotated.x,
                    y: rotated.y,
                });
                true
            }
            None => false,
        }
    }

    /// Pause or resume. No-op once the match has ended or before it starts.
    pub fn toggle_pause(&mut self) -> bool {
        if self.phase != Phase::Falling {
            return false;
        }
        self.paused = !self.paused;
        true
    }

    /// Apply a game action
    pub fn apply_action(&mut self, action: GameAction) -> bool {
        match action {
            GameAction::MoveLeft => self.move_left(),
            GameAction::MoveRight => self.move_right(),
            GameAction::SoftDrop => self.soft_drop(),
            GameAction::HardDrop => self.hard_drop(),
            GameAction::Rotate => self.rotate(),
            GameAction::Pause => self.toggle_pause(),
        }
    }

    /// Apply an effect sent by the opponent. Ignored outside battle or after game over.
    pub fn apply_battle_effect(&mut self, effect: BattleEffect) -> bool {
        if !self.config.battle || self.is_game_over() {
            return false;
        }
        match effect {
            BattleEffect::TimeStop { duration_ms } => {
                self.time_stop_remaining_ms = self.time_stop_remaining_ms.max(duration_ms);
                true
            }
        }
    }

    /// Drain pending events
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    fn run_transitions(&mut self) {
        loop {
            match self.phase {
                Phase::Spawning => self.spawn(),
                Phase::Locking => self.lock_active(),
                Phase::LineClearing => self.clear_lines(),
                Phase::Idle | Phase::Falling | Phase::GameOver => break,
            }
        }
    }

    /// Promote `next` to the falling piece and deal a new `next`
    fn spawn(&mut self) {
        let piece = self.next;
        self.next = self.generator.next_piece();

        let active = ActivePiece::spawn(piece);
        if !collision::fits(&self.grid, &active.piece, active.x, active.y) {
            self.finish(GameOverReason::BlockOut);
            return;
        }
        self.active = Some(active);
        self.gravity_timer_ms = 0;
        self.phase = Phase::Falling;
    }

    fn lock_active(&mut self) {
        let Some(active) = self.active.take() else {
            self.phase = Phase::Spawning;
            return;
        };
        let Some(locked) = self.grid.lock_piece(&active.piece, active.x, active.y) else {
            self.finish(GameOverReason::LockOut);
            return;
        };

        self.pieces_locked += 1;
        self.score += self.config.score.lock;

        let outcome = self
            .items
            .on_lock(&mut self.grid, &locked, &self.config.items, self.config.battle);
        self.score = self.score.saturating_add(outcome.bonus_score);
        for effect in outcome.effects {
            self.events.push(EngineEvent::SendEffect(effect));
        }
        self.lock_items = outcome.triggered;

        if active.cells().iter().any(|&(_, y)| y <= 0) {
            self.events.push(EngineEvent::Locked {
                lines_cleared: 0,
                line_clear_score: 0,
                items: std::mem::take(&mut self.lock_items),
            });
            self.finish(GameOverReason::LockOut);
            return;
        }

        self.phase = Phase::LineClearing;
    }

    fn clear_lines(&mut self) {
        let cleared = self.grid.clear_full_rows().len() as u32;
        let mut points = 0;
        if cleared > 0 {
            points = line_clear_score(&self.config.score, cleared, self.level) * self.items.score_multiplier();
            self.items.note_line_clear();
            self.score = self.score.saturating_add(points);
            self.lines += cleared;
            self.level = self.level.max(level_for_lines(self.lines, self.config.lines_per_level));
        }
        self.events.push(EngineEvent::Locked {
            lines_cleared: cleared,
            line_clear_score: points,
            items: std::mem::take(&mut self.lock_items),
        });
        self.phase = Phase::Spawning;
    }

    fn finish(&mut self, reason: GameOverReason) {
        if self.game_over.is_some() {
            return;
        }
        self.game_over = Some(reason);
        self.active = None;
        self.paused = false;
        self.phase = Phase::GameOver;
        self.events.push(EngineEvent::GameOver(reason));
    }

    /// Final numbers for the match so far
    pub fn result(&self, player_name: &str) -> MatchResult {
        MatchResult {
            player_name: player_name.to_string(),
            mode: self.config.mode,
            score: self.score,
            level: self.level,
            lines: self.lines,
            elapsed_ms: self.elapsed_ms,
            reason: self.game_over,
        }
    }

    /// Fill `out` without allocating
    pub fn snapshot_into(&self, out: &mut GameSnapshot) {
        for y in 0..BOARD_HEIGHT as i8 {
            for x in 0..BOARD_WIDTH as i8 {
                let tile = self.grid.tile(x, y);
                out.cells[y as usize][x as usize] = CellView {
                    state: if tile.is_some() { CellState::Fixed } else { CellState::Empty },
                    tile,
                    item: self.grid.item_at(x, y),
                };
            }
        }

        if let Some(active) = self.active {
            let tile = active.piece.tile();
            for (&(x, y), item) in active.cells().iter().zip(active.piece.items().iter()) {
                if x < 0 || y < 0 || x >= BOARD_WIDTH as i8 || y >= BOARD_HEIGHT as i8 {
                    continue;
                }
                out.cells[y as usize][x as usize] = CellView {
                    state: CellState::Active,
                    tile: Some(tile),
                    item: *item,
                };
            }
        }

        out.active = self.active.map(Into::into);
        out.ghost_y = self.ghost_y();
        out.next = self.next;
        out.upcoming = self.generator.peek_kinds();
        out.mode = self.config.mode;
        out.seed = self.seed;
        out.phase = self.phase;
        out.paused = self.paused;
        out.game_over = self.game_over;
        out.score = self.score;
        out.level = self.level;
        out.lines = self.lines;
        out.elapsed_ms = self.elapsed_ms;
        out.gravity_interval_ms = self.gravity_interval_ms();
        out.time_stop_remaining_ms = self.time_stop_remaining_ms;
        out.double_score_clears = self.items.double_score_remaining();
    }

    pub fn snapshot(&self) -> GameSnapshot {
        let mut out = GameSnapshot {
            cells: [[CellView::default(); BOARD_WIDTH as usize]; BOARD_HEIGHT as usize],
            active: None,
            ghost_y: None,
            next: self.next,
            upcoming: self.generator.peek_kinds(),
            mode: self.config.mode,
            seed: self.seed,
            phase: self.phase,
            paused: false,
            game_over: None,
            score: 0,
            level: 1,
            lines: 0,
            elapsed_ms: 0,
            gravity_interval_ms: 0,
            time_stop_remaining_ms: 0,
            double_score_clears: 0,
        };
        self.snapshot_into(&mut out);
        out
    }
}
