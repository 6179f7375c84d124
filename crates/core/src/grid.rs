//! Grid module - the fixed-size playfield
//!
//! The grid is a 10x20 matrix of fixed cells plus a parallel layer of item marks.
//! Uses flat arrays for cache locality and zero allocation.
//! Coordinates: (x, y) where x ranges 0..9 (left to right), y ranges 0..19 (top to bottom).
//!
//! Only EMPTY and FIXED cells live here. ACTIVE cells are the falling piece,
//! which the engine overlays when it builds a snapshot.

use arrayvec::ArrayVec;

use crate::pieces::Piece;
use crate::types::{CellState, Color, ItemKind, Tile, BOARD_HEIGHT, BOARD_WIDTH};

/// Total number of cells on the grid
const GRID_SIZE: usize = (BOARD_WIDTH as usize) * (BOARD_HEIGHT as usize);

/// A fixed cell that still carries an unconsumed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LockedItem {
    pub x: i8,
    pub y: i8,
    pub item: ItemKind,
}

/// The playfield - 10 columns x 20 rows, row-major flat storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    /// Fixed cells (`None` = empty), index = y * WIDTH + x
    tiles: [Option<Tile>; GRID_SIZE],
    /// Item marks on fixed cells, waiting for the item engine
    items: [Option<ItemKind>; GRID_SIZE],
}

impl Grid {
    /// Create a new empty grid
    pub fn new() -> Self {
        Self {
            tiles: [None; GRID_SIZE],
            items: [None; GRID_SIZE],
        }
    }

    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * (BOARD_WIDTH as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at (x, y); `None` if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Option<Tile>> {
        Self::index(x, y).map(|idx| self.tiles[idx])
    }

    /// Tile at (x, y); `None` when empty or out of bounds
    pub fn tile(&self, x: i8, y: i8) -> Option<Tile> {
        self.get(x, y).flatten()
    }

    /// Color of a fixed cell (undefined, i.e. `None`, where the cell is empty)
    pub fn color(&self, x: i8, y: i8) -> Option<Color> {
        self.tile(x, y).map(|t| t.color())
    }

    /// EMPTY or FIXED; `None` if out of bounds
    pub fn state(&self, x: i8, y: i8) -> Option<CellState> {
        self.get(x, y).map(|cell| match cell {
            Some(_) => CellState::Fixed,
            None => CellState::Empty,
        })
    }

    /// Set cell at (x, y). Emptying a cell also drops its item mark.
    /// Returns false if out of bounds.
    pub fn set(&mut self, x: i8, y: i8, tile: Option<Tile>) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.tiles[idx] = tile;
                if tile.is_none() {
                    self.items[idx] = None;
                }
                true
            }
            None => false,
        }
    }

    /// Within bounds and empty
    pub fn is_valid(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(None))
    }

    /// Within bounds and fixed
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    pub fn is_out_of_bounds(&self, x: i8, y: i8) -> bool {
        Self::index(x, y).is_none()
    }

    /// Check if a row has no empty cell
    pub fn is_row_full(&self, y: usize) -> bool {
        if y >= BOARD_HEIGHT as usize {
            return false;
        }
        let start = y * BOARD_WIDTH as usize;
        let end = start + BOARD_WIDTH as usize;
        self.tiles[start..end].iter().all(|cell| cell.is_some())
    }

    /// Fill every empty cell of a row so the next line-clear pass removes it.
    /// Returns the number of cells filled.
    pub fn fill_row(&mut self, y: i8, tile: Tile) -> u32 {
        let mut filled = 0;
        for x in 0..BOARD_WIDTH as i8 {
            if self.is_valid(x, y) {
                self.set(x, y, Some(tile));
                filled += 1;
            }
        }
        filled
    }

    /// Empty a single cell. Returns true if it was fixed.
    pub fn clear_cell(&mut self, x: i8, y: i8) -> bool {
        if !self.is_occupied(x, y) {
            return false;
        }
        self.set(x, y, None)
    }

    /// Clear all full rows in one pass and return their indices (bottom to top).
    ///
    /// Rows above shift down by the number of cleared rows beneath them, so
    /// non-adjacent clears keep the relative order of the surviving rows.
    /// A grid with no full row is left untouched.
    pub fn clear_full_rows(&mut self) -> ArrayVec<usize, { BOARD_HEIGHT as usize }> {
        let mut cleared_rows = ArrayVec::new();
        let width = BOARD_WIDTH as usize;
        let mut write_y = BOARD_HEIGHT as usize;

        for read_y in (0..BOARD_HEIGHT as usize).rev() {
            if self.is_row_full(read_y) {
                cleared_rows.push(read_y);
            } else {
                write_y -= 1;
                if write_y != read_y {
                    let src = read_y * width;
                    let dst = write_y * width;
                    self.tiles.copy_within(src..src + width, dst);
                    self.items.copy_within(src..src + width, dst);
                }
            }
        }

        for cell in &mut self.tiles[..write_y * width] {
            *cell = None;
        }
        for mark in &mut self.items[..write_y * width] {
            *mark = None;
        }

        cleared_rows
    }

    /// Copy a piece into the grid as fixed cells and mark its item-bearing cells.
    ///
    /// Returns `None` (grid unchanged) if any cell is out of bounds or occupied,
    /// otherwise the items that now sit on the grid waiting for the item engine.
    pub fn lock_piece(&mut self, piece: &Piece, x: i8, y: i8) -> Option<ArrayVec<LockedItem, 4>> {
        let cells = piece.cells();
        if !cells.iter().all(|&(dx, dy)| self.is_valid(x + dx, y + dy)) {
            return None;
        }

        let tile = piece.tile();
        let mut locked = ArrayVec::new();
        for (&(dx, dy), item) in cells.iter().zip(piece.items().iter()) {
            let (px, py) = (x + dx, y + dy);
            self.set(px, py, Some(tile));
            if let (Some(item), Some(idx)) = (*item, Self::index(px, py)) {
                self.items[idx] = Some(item);
                locked.push(LockedItem { x: px, y: py, item });
            }
        }
        Some(locked)
    }

    /// Item mark at (x, y), if any
    pub fn item_at(&self, x: i8, y: i8) -> Option<ItemKind> {
        Self::index(x, y).and_then(|idx| self.items[idx])
    }

    /// Remove and return the item mark at (x, y)
    pub fn take_item(&mut self, x: i8, y: i8) -> Option<ItemKind> {
        Self::index(x, y).and_then(|idx| self.items[idx].take())
    }

    /// Number of fixed cells
    pub fn fixed_count(&self) -> usize {
        self.tiles.iter().filter(|c| c.is_some()).count()
    }

    /// Raw row-major cells
    pub fn cells(&self) -> &[Option<Tile>] {
        &self.tiles
    }

    /// Empty the whole grid
    pub fn clear(&mut self) {
        self.tiles = [None; GRID_SIZE];
        self.items = [None; GRID_SIZE];
    }

    /// Build a grid from rows of text, bottom-aligned: `#` is a fixed cell, anything else empty.
    pub fn from_rows(rows: &[&str]) -> Self {
        let mut grid = Self::new();
        let offset = (BOARD_HEIGHT as usize).saturating_sub(rows.len());
        for (i, row) in rows.iter().enumerate().take(BOARD_HEIGHT as usize) {
            for (x, ch) in row.chars().enumerate().take(BOARD_WIDTH as usize) {
                if ch == '#' {
                    grid.set(x as i8, (offset + i) as i8, Some(Tile::Weight));
                }
            }
        }
        grid
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}
