//! Collision module - placement tests, kicked rotation, and drop distance
//!
//! All functions are pure queries over a [`Grid`]; none of them mutate state.

use crate::grid::Grid;
use crate::pieces::{shape_cells, Piece};
use crate::types::{PieceKind, Rotation};

/// Kick offsets tried in order when a clockwise rotation is blocked in place
pub const DEFAULT_KICKS: [(i8, i8); 7] = [(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1), (-2, 0), (2, 0)];

/// Result of a successful rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotated {
    pub piece: Piece,
    pub x: i8,
    pub y: i8,
    /// Offset that made the rotation fit
    pub kick: (i8, i8),
}

/// True iff every mino of `kind` in `rotation` at (x, y) is in bounds and empty
pub fn can_place(grid: &Grid, kind: PieceKind, rotation: Rotation, x: i8, y: i8) -> bool {
    shape_cells(kind, rotation)
        .iter()
        .all(|&(dx, dy)| grid.is_valid(x + dx, y + dy))
}

/// [`can_place`] for a concrete piece
pub fn fits(grid: &Grid, piece: &Piece, x: i8, y: i8) -> bool {
    can_place(grid, piece.kind(), piece.rotation(), x, y)
}

/// Rotate clockwise, trying each kick offset in order.
///
/// Returns `None` if every candidate collides; the caller keeps the original
/// piece and position, so a failed rotation changes nothing.
pub fn try_rotate(grid: &Grid, piece: &Piece, x: i8, y: i8, kicks: &[(i8, i8)]) -> Option<Rotated> {
    let turned = piece.rotated();
    for &(dx, dy) in kicks {
        let (nx, ny) = (x + dx, y + dy);
        if fits(grid, &turned, nx, ny) {
            return Some(Rotated {
                piece: turned,
                x: nx,
                y: ny,
                kick: (dx, dy),
            });
        }
    }
    None
}

/// How many rows the piece can fall from (x, y) before resting
pub fn drop_distance(grid: &Grid, piece: &Piece, x: i8, y: i8) -> u8 {
    let mut distance = 0u8;
    while fits(grid, piece, x, y + distance as i8 + 1) {
        distance += 1;
    }
    distance
}
