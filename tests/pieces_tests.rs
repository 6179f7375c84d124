//! Pieces tests - shapes, clockwise rotation, and kicks

use tetris_battle::core::{can_place, drop_distance, remap_cw, shape_cells, try_rotate, Grid, Piece, DEFAULT_KICKS};
use tetris_battle::types::{ItemKind, PieceKind, Rotation};

fn sorted(mut cells: [(i8, i8); 4]) -> [(i8, i8); 4] {
    cells.sort();
    cells
}

#[test]
fn test_i_piece_shapes() {
    assert_eq!(sorted(shape_cells(PieceKind::I, Rotation::North)), [(0, 1), (1, 1), (2, 1), (3, 1)]);
    assert_eq!(sorted(shape_cells(PieceKind::I, Rotation::East)), [(2, 0), (2, 1), (2, 2), (2, 3)]);
    assert_eq!(sorted(shape_cells(PieceKind::I, Rotation::South)), [(0, 2), (1, 2), (2, 2), (3, 2)]);
    assert_eq!(sorted(shape_cells(PieceKind::I, Rotation::West)), [(1, 0), (1, 1), (1, 2), (1, 3)]);
}

#[test]
fn test_o_piece_never_moves() {
    let north = sorted(shape_cells(PieceKind::O, Rotation::North));
    for rotation in [Rotation::East, Rotation::South, Rotation::West] {
        assert_eq!(sorted(shape_cells(PieceKind::O, rotation)), north);
    }
}

#[test]
fn test_t_piece_shapes() {
    assert_eq!(sorted(shape_cells(PieceKind::T, Rotation::North)), [(0, 1), (1, 0), (1, 1), (2, 1)]);
    assert_eq!(sorted(shape_cells(PieceKind::T, Rotation::East)), [(1, 0), (1, 1), (1, 2), (2, 1)]);
}

#[test]
fn test_every_state_is_a_box_rotation() {
    for kind in PieceKind::ALL {
        let mut rotation = Rotation::North;
        for _ in 0..4 {
            let turned = shape_cells(kind, rotation).map(|c| remap_cw(kind, c));
            rotation = rotation.rotate_cw();
            assert_eq!(turned, shape_cells(kind, rotation), "{:?} into {:?}", kind, rotation);
        }
    }
}

#[test]
fn test_items_follow_their_mino() {
    let piece = Piece::new(PieceKind::L).with_item(0, ItemKind::Bomb);
    let before: Vec<_> = piece.item_cells().collect();
    let turned = piece.rotated();
    let after: Vec<_> = turned.item_cells().collect();

    assert_eq!(after.len(), 1);
    assert_eq!(after[0].0, remap_cw(PieceKind::L, before[0].0));
    assert_eq!(turned.items(), piece.items());
}

#[test]
fn test_four_turns_return_home() {
    let piece = Piece::new(PieceKind::S).with_item(3, ItemKind::TimeStop);
    let back = piece.rotated().rotated().rotated().rotated();
    assert_eq!(back, piece);
}

#[test]
fn test_rotation_kicks_off_the_wall() {
    let grid = Grid::new();
    // I standing in column 9 (east state box column 2) cannot turn in place
    let piece = Piece::new(PieceKind::I).rotated();
    assert!(can_place(&grid, PieceKind::I, Rotation::East, 7, 5));

    let rotated = try_rotate(&grid, &piece, 7, 5, &DEFAULT_KICKS).unwrap();
    assert_ne!(rotated.kick, (0, 0));
    assert_eq!(rotated.piece.rotation(), Rotation::South);
    assert!(can_place(&grid, PieceKind::I, Rotation::South, rotated.x, rotated.y));
}

#[test]
fn test_rotation_blocked_everywhere_fails() {
    let grid = Grid::from_rows(&[
        "##########",
        "##########",
        "####.#####",
        "###...####",
        "##########",
        "##########",
        "##########",
    ]);
    // T-shaped pocket: no column has three empty rows to stand in
    let piece = Piece::new(PieceKind::T);
    assert!(can_place(&grid, PieceKind::T, Rotation::North, 3, 15));
    assert!(try_rotate(&grid, &piece, 3, 15, &DEFAULT_KICKS).is_none());
}

#[test]
fn test_drop_distance_to_floor() {
    let grid = Grid::new();
    assert_eq!(drop_distance(&grid, &Piece::new(PieceKind::O), 3, 0), 18);
    assert_eq!(drop_distance(&grid, &Piece::new(PieceKind::I), 3, 0), 18);
}
