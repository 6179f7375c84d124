//! Pieces module - tetromino shapes, rotation, and item-carrying cells
//!
//! Shapes follow the SRS layout inside a rotation box anchored at the piece
//! origin: I uses a 4x4 box, O a 2x2 box at column offset 1, and the other five
//! kinds a 3x3 box. A clockwise turn is a pure rotation of that box, so every
//! rotation state is the image of the previous one under [`remap_cw`]. That is
//! what lets item cells follow the mino they are attached to.

use crate::types::{ItemKind, PieceKind, Rotation, Tile};

/// Offset of a single mino relative to piece origin
pub type MinoOffset = (i8, i8);

/// Shape of a piece - 4 mino offsets from piece origin
pub type PieceShape = [MinoOffset; 4];

/// Get the shape (mino offsets) for a piece kind and rotation
pub fn shape_cells(kind: PieceKind, rotation: Rotation) -> PieceShape {
    match kind {
        PieceKind::I => i_shape(rotation),
        PieceKind::O => o_shape(rotation),
        PieceKind::T => t_shape(rotation),
        PieceKind::S => s_shape(rotation),
        PieceKind::Z => z_shape(rotation),
        PieceKind::J => j_shape(rotation),
        PieceKind::L => l_shape(rotation),
    }
}

fn i_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 1), (1, 1), (2, 1), (3, 1)],
        Rotation::East => [(2, 0), (2, 1), (2, 2), (2, 3)],
        Rotation::South => [(3, 2), (2, 2), (1, 2), (0, 2)],
        Rotation::West => [(1, 3), (1, 2), (1, 1), (1, 0)],
    }
}

/// O piece occupies the same cells in every state; only the mino order turns
fn o_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(1, 0), (2, 0), (1, 1), (2, 1)],
        Rotation::East => [(2, 0), (2, 1), (1, 0), (1, 1)],
        Rotation::South => [(2, 1), (1, 1), (2, 0), (1, 0)],
        Rotation::West => [(1, 1), (1, 0), (2, 1), (2, 0)],
    }
}

fn t_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(1, 0), (0, 1), (1, 1), (2, 1)],
        Rotation::East => [(2, 1), (1, 0), (1, 1), (1, 2)],
        Rotation::South => [(1, 2), (2, 1), (1, 1), (0, 1)],
        Rotation::West => [(0, 1), (1, 2), (1, 1), (1, 0)],
    }
}

fn s_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(1, 0), (2, 0), (0, 1), (1, 1)],
        Rotation::East => [(2, 1), (2, 2), (1, 0), (1, 1)],
        Rotation::South => [(1, 2), (0, 2), (2, 1), (1, 1)],
        Rotation::West => [(0, 1), (0, 0), (1, 2), (1, 1)],
    }
}

fn z_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (1, 0), (1, 1), (2, 1)],
        Rotation::East => [(2, 0), (2, 1), (1, 1), (1, 2)],
        Rotation::South => [(2, 2), (1, 2), (1, 1), (0, 1)],
        Rotation::West => [(0, 2), (0, 1), (1, 1), (1, 0)],
    }
}

fn j_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(0, 0), (0, 1), (1, 1), (2, 1)],
        Rotation::East => [(2, 0), (1, 0), (1, 1), (1, 2)],
        Rotation::South => [(2, 2), (2, 1), (1, 1), (0, 1)],
        Rotation::West => [(0, 2), (1, 2), (1, 1), (1, 0)],
    }
}

fn l_shape(rotation: Rotation) -> PieceShape {
    match rotation {
        Rotation::North => [(2, 0), (0, 1), (1, 1), (2, 1)],
        Rotation::East => [(2, 2), (1, 0), (1, 1), (1, 2)],
        Rotation::South => [(0, 2), (2, 1), (1, 1), (0, 1)],
        Rotation::West => [(0, 0), (1, 2), (1, 1), (1, 0)],
    }
}

/// Rotation box of a kind: (origin_x, origin_y, size)
fn rotation_box(kind: PieceKind) -> (i8, i8, i8) {
    match kind {
        PieceKind::I => (0, 0, 4),
        PieceKind::O => (1, 0, 2),
        _ => (0, 0, 3),
    }
}

/// Where a cell of `kind` lands after one clockwise turn of its rotation box
pub fn remap_cw(kind: PieceKind, cell: MinoOffset) -> MinoOffset {
    let (ox, oy, size) = rotation_box(kind);
    let (col, row) = (cell.0 - ox, cell.1 - oy);
    (size - 1 - row + ox, col + oy)
}

/// A tetromino with optional items attached to its minos.
///
/// `items[i]` belongs to `cells()[i]`. Position lives with the owner
/// (the engine's active piece); a `Piece` only knows its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    kind: PieceKind,
    rotation: Rotation,
    items: [Option<ItemKind>; 4],
}

impl Piece {
    /// A plain piece in spawn orientation
    pub fn new(kind: PieceKind) -> Self {
        Self {
            kind,
            rotation: Rotation::North,
            items: [None; 4],
        }
    }

    /// Attach an item to mino `slot` (0..4) of the current shape
    pub fn with_item(mut self, slot: usize, item: ItemKind) -> Self {
        if let Some(entry) = self.items.get_mut(slot) {
            *entry = Some(item);
        }
        self
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Mino offsets of the current rotation state
    pub fn cells(&self) -> PieceShape {
        shape_cells(self.kind, self.rotation)
    }

    /// Items aligned with [`Piece::cells`]
    pub fn items(&self) -> &[Option<ItemKind>; 4] {
        &self.items
    }

    /// Offsets of the item-bearing minos with their items
    pub fn item_cells(&self) -> impl Iterator<Item = (MinoOffset, ItemKind)> + '_ {
        let cells = self.cells();
        self.items
            .iter()
            .enumerate()
            .filter_map(move |(i, item)| item.map(|item| (cells[i], item)))
    }

    pub fn item_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_some()).count()
    }

    /// The same piece turned clockwise, items following their minos
    pub fn rotated(&self) -> Self {
        let next_rotation = self.rotation.rotate_cw();
        let next_cells = shape_cells(self.kind, next_rotation);
        let mut items = [None; 4];
        for (cell, item) in self.cells().iter().zip(self.items.iter()) {
            let Some(item) = item else { continue };
            let target = remap_cw(self.kind, *cell);
            if let Some(slot) = next_cells.iter().position(|c| *c == target) {
                items[slot] = Some(*item);
            }
        }
        Self {
            kind: self.kind,
            rotation: next_rotation,
            items,
        }
    }

    /// Tile left behind when the piece locks
    pub fn tile(&self) -> Tile {
        Tile::Piece(self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut shape: PieceShape) -> PieceShape {
        shape.sort();
        shape
    }

    #[test]
    fn each_state_is_the_cw_image_of_the_previous() {
        for kind in PieceKind::ALL {
            let mut rotation = Rotation::North;
            for _ in 0..4 {
                let next = rotation.rotate_cw();
                let mapped = shape_cells(kind, rotation).map(|c| remap_cw(kind, c));
                assert_eq!(mapped, shape_cells(kind, next), "{:?} {:?}", kind, rotation);
                rotation = next;
            }
        }
    }

    #[test]
    fn o_piece_cells_do_not_move() {
        let north = sorted(shape_cells(PieceKind::O, Rotation::North));
        for rotation in [Rotation::East, Rotation::South, Rotation::West] {
            assert_eq!(sorted(shape_cells(PieceKind::O, rotation)), north);
        }
    }

    #[test]
    fn shapes_have_four_distinct_cells() {
        for kind in PieceKind::ALL {
            for r in 0..4 {
                let shape = sorted(shape_cells(kind, Rotation::from_index(r)));
                for pair in shape.windows(2) {
                    assert_ne!(pair[0], pair[1]);
                }
            }
        }
    }

    #[test]
    fn item_follows_its_mino() {
        let piece = Piece::new(PieceKind::T).with_item(0, ItemKind::Bomb);
        assert_eq!(piece.item_cells().next(), Some(((1, 0), ItemKind::Bomb)));

        let east = piece.rotated();
        assert_eq!(east.item_cells().next(), Some(((2, 1), ItemKind::Bomb)));

        let north = east.rotated().rotated().rotated();
        assert_eq!(north, piece);
    }

    #[test]
    fn with_item_ignores_bad_slot() {
        let piece = Piece::new(PieceKind::I).with_item(7, ItemKind::TimeStop);
        assert_eq!(piece.item_count(), 0);
    }
}
