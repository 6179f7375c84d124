//! Engine scenarios driven through the public API

use tetris_battle::core::{EngineConfig, EngineEvent, GameEngine, Phase, Piece};
use tetris_battle::types::{
    BattleEffect, CellState, GameAction, GameMode, GameOverReason, ItemKind, PieceKind, Tile,
};

fn engine_with_first(kind: PieceKind, config: EngineConfig) -> GameEngine {
    let mut engine = GameEngine::new(12345, config);
    engine.set_next_piece(Piece::new(kind));
    engine.start();
    engine
}

fn lines_cleared(events: &[EngineEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Locked { lines_cleared, .. } => Some(*lines_cleared),
            _ => None,
        })
        .collect()
}

#[test]
fn test_game_lifecycle() {
    let mut engine = GameEngine::new(12345, EngineConfig::default());
    assert_eq!(engine.phase(), Phase::Idle);
    assert!(engine.active().is_none());
    assert!(!engine.apply_action(GameAction::HardDrop));

    engine.start();
    assert_eq!(engine.phase(), Phase::Falling);
    assert!(engine.active().is_some());
    assert!(!engine.is_game_over());
    assert!(engine.snapshot().playable());
}

#[test]
fn test_hard_drop_o_on_empty_grid() {
    let mut engine = engine_with_first(PieceKind::O, EngineConfig::default());
    assert!(engine.hard_drop());

    // 18 rows at 2 points plus the lock bonus
    assert_eq!(engine.score(), 46);
    assert_eq!(engine.pieces_locked(), 1);
    for (x, y) in [(4, 18), (5, 18), (4, 19), (5, 19)] {
        assert_eq!(engine.grid().tile(x, y), Some(Tile::Piece(PieceKind::O)));
    }
    assert_eq!(lines_cleared(&engine.take_events()), vec![0]);
}

#[test]
fn test_single_line_clear_in_last_columns() {
    let mut engine = GameEngine::new(12345, EngineConfig::default());
    engine.set_next_piece(Piece::new(PieceKind::O));
    for x in 0..8 {
        engine.grid_mut().set(x, 19, Some(Tile::Weight));
    }
    engine.start();

    for _ in 0..4 {
        assert!(engine.move_right());
    }
    assert!(!engine.move_right(), "O should be against the right wall");
    engine.hard_drop();

    assert_eq!(engine.lines(), 1);
    assert_eq!(engine.score(), 36 + 10 + 100);
    assert!(engine.grid().is_occupied(8, 19));
    assert!(engine.grid().is_occupied(9, 19));
    assert!(!engine.grid().is_occupied(0, 19));
    assert_eq!(engine.grid().fixed_count(), 2);

    let events = engine.take_events();
    assert!(events.contains(&EngineEvent::Locked {
        lines_cleared: 1,
        line_clear_score: 100,
        items: Default::default(),
    }));
}

#[test]
fn test_gravity_moves_one_row_per_interval() {
    let mut engine = engine_with_first(PieceKind::T, EngineConfig::default());
    let y0 = engine.active().unwrap().y;

    engine.tick(999);
    assert_eq!(engine.active().unwrap().y, y0);
    engine.tick(1);
    assert_eq!(engine.active().unwrap().y, y0 + 1);
}

#[test]
fn test_pause_blocks_gravity_and_input() {
    let mut engine = engine_with_first(PieceKind::T, EngineConfig::default());
    let before = engine.active().unwrap();

    assert!(engine.apply_action(GameAction::Pause));
    assert!(engine.paused());
    engine.tick(5000);
    assert!(!engine.move_left());
    assert_eq!(engine.active().unwrap(), before);

    assert!(engine.toggle_pause());
    assert!(engine.move_left());
}

#[test]
fn test_block_out_when_spawn_is_covered() {
    let mut engine = GameEngine::new(1, EngineConfig::default());
    engine.set_next_piece(Piece::new(PieceKind::O));
    engine.grid_mut().set(4, 0, Some(Tile::Weight));
    engine.start();

    assert!(engine.is_game_over());
    assert_eq!(engine.game_over_reason(), Some(GameOverReason::BlockOut));
    assert_eq!(
        engine.take_events(),
        vec![EngineEvent::GameOver(GameOverReason::BlockOut)]
    );
    assert!(!engine.apply_action(GameAction::MoveLeft));
    assert!(!engine.tick(1000));
    assert!(engine.take_events().is_empty(), "game over is reported once");
}

#[test]
fn test_time_attack_runs_out() {
    let config = EngineConfig {
        time_limit_ms: 100,
        ..EngineConfig::single(GameMode::TimeAttack)
    };
    let mut engine = engine_with_first(PieceKind::I, config);

    engine.tick(60);
    assert!(!engine.is_game_over());
    engine.tick(60);
    assert_eq!(engine.game_over_reason(), Some(GameOverReason::TimeUp));
    assert_eq!(engine.result("solo").reason, Some(GameOverReason::TimeUp));
}

#[test]
fn test_line_clear_item_clears_its_row() {
    let mut engine = engine_with_first(PieceKind::O, EngineConfig::single(GameMode::Item));
    assert!(engine.set_active_piece(Piece::new(PieceKind::O).with_item(2, ItemKind::LineClear)));
    engine.hard_drop();

    assert_eq!(engine.lines(), 1);
    assert_eq!(engine.grid().fixed_count(), 2);
    let items: Vec<_> = engine
        .take_events()
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::Locked { items, .. } => Some(items.to_vec()),
            _ => None,
        })
        .collect();
    assert_eq!(items, vec![vec![ItemKind::LineClear]]);
}

#[test]
fn test_time_stop_is_sent_in_battle() {
    let mut engine = engine_with_first(PieceKind::T, EngineConfig::battle(GameMode::Item));
    engine.set_active_piece(Piece::new(PieceKind::T).with_item(0, ItemKind::TimeStop));
    engine.hard_drop();

    let events = engine.take_events();
    assert!(events.contains(&EngineEvent::SendEffect(BattleEffect::TimeStop { duration_ms: 5000 })));
    assert_eq!(engine.time_stop_remaining_ms(), 0, "the sender is never frozen");
}

#[test]
fn test_received_time_stop_freezes_gravity() {
    let mut engine = engine_with_first(PieceKind::T, EngineConfig::battle(GameMode::Item));
    let y0 = engine.active().unwrap().y;
    assert!(engine.apply_battle_effect(BattleEffect::TimeStop { duration_ms: 5000 }));

    engine.tick(4000);
    assert_eq!(engine.active().unwrap().y, y0);
    assert_eq!(engine.time_stop_remaining_ms(), 1000);

    engine.tick(2000);
    assert_eq!(engine.time_stop_remaining_ms(), 0);
    assert_eq!(engine.active().unwrap().y, y0 + 1);
}

#[test]
fn test_snapshot_overlays_active_piece() {
    let engine = engine_with_first(PieceKind::O, EngineConfig::default());
    let snapshot = engine.snapshot();

    assert_eq!(snapshot.cell(4, 0).unwrap().state, CellState::Active);
    assert_eq!(snapshot.cell(0, 0).unwrap().state, CellState::Empty);
    assert_eq!(snapshot.ghost_y, Some(18));
    assert_eq!(snapshot.upcoming.len(), 5);
    assert_eq!(engine.grid().fixed_count(), 0, "active cells never live in the grid");
}

#[test]
fn test_same_seed_same_game() {
    let script = [
        GameAction::MoveLeft,
        GameAction::Rotate,
        GameAction::HardDrop,
        GameAction::MoveRight,
        GameAction::MoveRight,
        GameAction::HardDrop,
        GameAction::SoftDrop,
        GameAction::HardDrop,
    ];
    let run = || {
        let mut engine = GameEngine::new(42, EngineConfig::single(GameMode::Item));
        engine.start();
        for round in 0..10 {
            for action in script {
                engine.apply_action(action);
            }
            engine.tick(16 * round);
        }
        engine.snapshot()
    };

    let (a, b) = (run(), run());
    assert_eq!(a.board_codes(), b.board_codes());
    assert_eq!(a.score, b.score);
    assert_eq!(a.upcoming, b.upcoming);
}
