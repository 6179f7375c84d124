//! RNG module - seeded 7-bag piece generation
//!
//! Implements the "7-bag" randomization algorithm: each bag contains one of
//! each piece (I, O, T, S, Z, J, L), shuffled, and is drawn until empty.
//!
//! Both battle peers build their generator from the same seed, so the whole
//! piece sequence (items included) must be a pure function of that seed.
//! Items use a second stream derived from the seed so that turning item mode
//! on does not change which kinds come out of the bag.

use crate::config::ItemRules;
use crate::pieces::Piece;
use crate::types::{ItemKind, PieceKind};

/// Salt mixed into the seed for the item stream
const ITEM_STREAM_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Items a piece can be dealt, uniformly
const ITEM_TABLE: [ItemKind; 8] = [
    ItemKind::LineClear,
    ItemKind::TimeStop,
    ItemKind::DoubleScore,
    ItemKind::Bomb,
    ItemKind::WeightBlock,
    ItemKind::Score(100),
    ItemKind::Score(200),
    ItemKind::Score(300),
];

/// 64-bit LCG (Knuth's MMIX constants), high half used as output
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate next random u32
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 32) as u32
    }

    /// Generate random value in range [0, max)
    pub fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        self.next_u32() % max
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }
}

/// 7-bag of piece kinds
#[derive(Debug, Clone)]
pub struct PieceQueue {
    bag: [PieceKind; 7],
    bag_index: usize,
    rng: SimpleRng,
}

impl PieceQueue {
    pub fn new(seed: u64) -> Self {
        let mut queue = Self {
            bag: PieceKind::ALL,
            bag_index: 0,
            rng: SimpleRng::new(seed),
        };
        queue.refill_bag();
        queue
    }

    fn refill_bag(&mut self) {
        self.bag = PieceKind::ALL;
        self.rng.shuffle(&mut self.bag);
        self.bag_index = 0;
    }

    /// Peek at the next 5 kinds without drawing.
    ///
    /// When the bag runs out mid-preview, the next bag is previewed with a
    /// cloned RNG, so the preview always matches the following draws.
    pub fn peek_5(&self) -> [PieceKind; 5] {
        let mut out = [PieceKind::I; 5];
        let mut out_i = 0usize;
        let mut idx = self.bag_index;

        while out_i < 5 && idx < 7 {
            out[out_i] = self.bag[idx];
            out_i += 1;
            idx += 1;
        }

        if out_i < 5 {
            let mut preview_rng = self.rng.clone();
            let mut next_bag = PieceKind::ALL;
            preview_rng.shuffle(&mut next_bag);

            let mut nb_i = 0usize;
            while out_i < 5 {
                out[out_i] = next_bag[nb_i];
                nb_i += 1;
                out_i += 1;
            }
        }

        out
    }

    /// Draw the next kind, refilling the bag when empty
    pub fn draw(&mut self) -> PieceKind {
        if self.bag_index >= 7 {
            self.refill_bag();
        }

        let piece = self.bag[self.bag_index];
        self.bag_index += 1;
        piece
    }

    #[cfg(test)]
    fn current_bag(&self) -> &[PieceKind] {
        &self.bag[self.bag_index..]
    }
}

/// Seeded source of pieces, dealing items when enabled
#[derive(Debug, Clone)]
pub struct PieceGenerator {
    seed: u64,
    queue: PieceQueue,
    item_rng: SimpleRng,
    items_enabled: bool,
    item_interval: u32,
    dealt: u32,
}

impl PieceGenerator {
    pub fn new(seed: u64, items_enabled: bool, rules: &ItemRules) -> Self {
        Self {
            seed,
            queue: PieceQueue::new(seed),
            item_rng: SimpleRng::new(seed ^ ITEM_STREAM_SALT),
            items_enabled,
            item_interval: rules.piece_interval.max(1),
            dealt: 0,
        }
    }

    /// Next piece in the sequence. In item mode every Nth piece carries one
    /// item on a randomly chosen mino.
    pub fn next_piece(&mut self) -> Piece {
        let kind = self.queue.draw();
        self.dealt += 1;

        let mut piece = Piece::new(kind);
        if self.items_enabled && self.dealt % self.item_interval == 0 {
            let item = ITEM_TABLE[self.item_rng.next_range(ITEM_TABLE.len() as u32) as usize];
            let slot = self.item_rng.next_range(4) as usize;
            piece = piece.with_item(slot, item);
        }
        piece
    }

    /// Kinds of the next 5 pieces
    pub fn peek_kinds(&self) -> [PieceKind; 5] {
        self.queue.peek_5()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Pieces dealt so far
    pub fn dealt(&self) -> u32 {
        self.dealt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(12345);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(54321);
        assert_ne!(rng1.next_u32(), rng2.next_u32());
    }

    #[test]
    fn test_piece_queue_draws_all_seven() {
        let mut queue = PieceQueue::new(1);
        assert_eq!(queue.current_bag().len(), 7);

        let mut drawn = Vec::new();
        for _ in 0..7 {
            drawn.push(queue.draw());
        }

        for kind in PieceKind::ALL {
            assert!(drawn.contains(&kind), "Missing piece: {:?}", kind);
        }
    }

    #[test]
    fn test_peek_5_matches_draws_across_bag_boundary() {
        let mut queue = PieceQueue::new(7);
        for _ in 0..5 {
            queue.draw();
        }

        let preview = queue.peek_5();
        for expected in preview {
            assert_eq!(queue.draw(), expected);
        }
    }

    #[test]
    fn test_items_every_fourth_piece() {
        let rules = ItemRules::default();
        let mut gen = PieceGenerator::new(42, true, &rules);
        for n in 1..=16 {
            let piece = gen.next_piece();
            let expected = if n % 4 == 0 { 1 } else { 0 };
            assert_eq!(piece.item_count(), expected, "piece {}", n);
        }
    }

    #[test]
    fn test_item_mode_keeps_kind_sequence() {
        let rules = ItemRules::default();
        let mut plain = PieceGenerator::new(99, false, &rules);
        let mut items = PieceGenerator::new(99, true, &rules);
        for _ in 0..21 {
            assert_eq!(plain.next_piece().kind(), items.next_piece().kind());
        }
    }
}
