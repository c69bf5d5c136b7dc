/// Slide puzzle: a picture cut into `n × n` pieces, placed by click-to-swap.
///
/// ## Ownership model
///
/// `locations[id]` is the single source of truth for where piece `id` is.
/// A piece is either in the bank (at a fixed bank spot) or in a board slot.
/// Slot occupancy is derived from it, so "slot says X, piece says Y" cannot
/// happen. Renderers read `location()`, `slot_filled()` and `bank_pieces()`.
///
/// A piece's id is its correct slot index.
///
/// ## Click protocol
///
/// | selection | clicked                 | effect                      |
/// |-----------|-------------------------|-----------------------------|
/// | none      | piece P                 | select P                    |
/// | P         | piece P                 | deselect                    |
/// | P         | piece Q                 | swap P and Q, deselect      |
/// | P         | empty slot              | move P there, deselect      |
/// | P         | slot holding Q          | swap P and Q, deselect      |
/// | P         | slot holding P          | deselect                    |
/// | none      | any slot                | nothing                     |
///
/// Once solved, every click is ignored.

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct PieceId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Location {
    Bank(usize),
    Slot(usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlaceOutcome {
    Ignored,
    Selected(PieceId),
    Deselected,
    Moved { piece: PieceId, slot: usize, solved: bool },
    Swapped { a: PieceId, b: PieceId, solved: bool },
}

pub struct PuzzleBoard {
    grid: usize,
    locations: Vec<Location>,
    selected: Option<PieceId>,
    solved: bool,
}

impl PuzzleBoard {
    /// Empty board, every piece in the bank in random order.
    pub fn new<R: Rng + ?Sized>(grid: usize, rng: &mut R) -> Self {
        let mut order: Vec<usize> = (0..grid * grid).collect();
        order.shuffle(rng);
        Self::with_bank_order(grid, &order)
    }

    /// `order[spot]` is the piece sitting at bank spot `spot`.
    pub fn with_bank_order(grid: usize, order: &[usize]) -> Self {
        let mut locations = vec![Location::Bank(0); grid * grid];
        for (spot, &id) in order.iter().enumerate() {
            locations[id] = Location::Bank(spot);
        }
        let board = PuzzleBoard { grid, locations, selected: None, solved: false };
        board.debug_check();
        board
    }

    pub fn grid(&self) -> usize { self.grid }
    pub fn piece_count(&self) -> usize { self.locations.len() }
    pub fn selected(&self) -> Option<PieceId> { self.selected }
    pub fn is_solved(&self) -> bool { self.solved }

    pub fn location(&self, piece: PieceId) -> Option<Location> {
        self.locations.get(piece.0).copied()
    }

    pub fn slot_occupant(&self, slot: usize) -> Option<PieceId> {
        self.locations
            .iter()
            .position(|&l| l == Location::Slot(slot))
            .map(PieceId)
    }

    /// Whether a slot currently holds any piece (drawn as "filled").
    pub fn slot_filled(&self, slot: usize) -> bool {
        self.slot_occupant(slot).is_some()
    }

    /// Pieces in the bank, ordered by bank spot.
    pub fn bank_pieces(&self) -> Vec<PieceId> {
        let mut bank: Vec<(usize, PieceId)> = self.locations
            .iter()
            .enumerate()
            .filter_map(|(id, l)| match l {
                Location::Bank(spot) => Some((*spot, PieceId(id))),
                Location::Slot(_) => None,
            })
            .collect();
        bank.sort();
        bank.into_iter().map(|(_, id)| id).collect()
    }

    pub fn click_piece(&mut self, piece: PieceId) -> PlaceOutcome {
        if self.solved || piece.0 >= self.locations.len() {
            return PlaceOutcome::Ignored;
        }
        match self.selected {
            None => {
                self.selected = Some(piece);
                PlaceOutcome::Selected(piece)
            }
            Some(sel) if sel == piece => {
                self.selected = None;
                PlaceOutcome::Deselected
            }
            Some(sel) => {
                self.swap(sel, piece);
                self.selected = None;
                let solved = self.check_solved();
                PlaceOutcome::Swapped { a: sel, b: piece, solved }
            }
        }
    }

    pub fn click_slot(&mut self, slot: usize) -> PlaceOutcome {
        if self.solved || slot >= self.locations.len() {
            return PlaceOutcome::Ignored;
        }
        let sel = match self.selected {
            Some(s) => s,
            None => return PlaceOutcome::Ignored,
        };
        self.selected = None;

        match self.slot_occupant(slot) {
            None => {
                self.locations[sel.0] = Location::Slot(slot);
                self.debug_check();
                let solved = self.check_solved();
                PlaceOutcome::Moved { piece: sel, slot, solved }
            }
            Some(occ) if occ == sel => PlaceOutcome::Deselected,
            Some(occ) => {
                self.swap(sel, occ);
                let solved = self.check_solved();
                PlaceOutcome::Swapped { a: sel, b: occ, solved }
            }
        }
    }

    fn swap(&mut self, a: PieceId, b: PieceId) {
        self.locations.swap(a.0, b.0);
        self.debug_check();
    }

    /// True exactly once: on the first placement that leaves every slot
    /// holding its own piece.
    fn check_solved(&mut self) -> bool {
        if self.solved {
            return false;
        }
        let all = (0..self.locations.len())
            .all(|slot| self.locations[slot] == Location::Slot(slot));
        if all {
            self.solved = true;
        }
        all
    }

    /// Is every piece in exactly one place, with no place shared?
    pub fn is_consistent(&self) -> bool {
        let n = self.locations.len();
        let mut bank = vec![false; n];
        let mut slots = vec![false; n];
        for loc in &self.locations {
            let (seen, i) = match *loc {
                Location::Bank(i) => (&mut bank, i),
                Location::Slot(i) => (&mut slots, i),
            };
            if i >= n || seen[i] {
                return false;
            }
            seen[i] = true;
        }
        true
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert!(self.is_consistent(), "puzzle ownership broken: {:?}", self.locations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn all_in_bank() -> PuzzleBoard {
        PuzzleBoard::with_bank_order(3, &[0, 1, 2, 3, 4, 5, 6, 7, 8])
    }

    fn place(b: &mut PuzzleBoard, piece: usize, slot: usize) -> PlaceOutcome {
        b.click_piece(PieceId(piece));
        b.click_slot(slot)
    }

    #[test]
    fn new_board_has_every_piece_in_bank() {
        let b = PuzzleBoard::new(3, &mut StdRng::seed_from_u64(9));
        assert_eq!(b.piece_count(), 9);
        assert_eq!(b.bank_pieces().len(), 9);
        assert!((0..9).all(|s| !b.slot_filled(s)));
        assert!(b.is_consistent());
        let mut ids: Vec<usize> = b.bank_pieces().iter().map(|p| p.0).collect();
        ids.sort();
        assert_eq!(ids, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn select_then_toggle_off() {
        let mut b = all_in_bank();
        assert_eq!(b.click_piece(PieceId(4)), PlaceOutcome::Selected(PieceId(4)));
        assert_eq!(b.selected(), Some(PieceId(4)));
        assert_eq!(b.click_piece(PieceId(4)), PlaceOutcome::Deselected);
        assert_eq!(b.selected(), None);
    }

    #[test]
    fn slot_click_without_selection_does_nothing() {
        let mut b = all_in_bank();
        assert_eq!(b.click_slot(0), PlaceOutcome::Ignored);
        assert!(!b.slot_filled(0));
    }

    #[test]
    fn move_into_empty_slot_then_swap_back_to_bank() {
        let mut b = all_in_bank();
        assert_eq!(
            place(&mut b, 5, 2),
            PlaceOutcome::Moved { piece: PieceId(5), slot: 2, solved: false }
        );
        assert_eq!(b.slot_occupant(2), Some(PieceId(5)));
        assert!(!b.bank_pieces().contains(&PieceId(5)));
        assert_eq!(b.selected(), None);

        b.click_piece(PieceId(5));
        let out = b.click_piece(PieceId(3));
        assert_eq!(out, PlaceOutcome::Swapped { a: PieceId(5), b: PieceId(3), solved: false });
        assert_eq!(b.slot_occupant(2), Some(PieceId(3)));
        assert!(b.bank_pieces().contains(&PieceId(5)));
        assert_eq!(b.location(PieceId(5)), Some(Location::Bank(3)));
        assert!(b.is_consistent());
    }

    #[test]
    fn occupied_slot_click_swaps_occupants() {
        let mut b = all_in_bank();
        place(&mut b, 1, 0);
        place(&mut b, 0, 1);
        b.click_piece(PieceId(1));
        let out = b.click_slot(1);
        assert_eq!(out, PlaceOutcome::Swapped { a: PieceId(1), b: PieceId(0), solved: false });
        assert_eq!(b.slot_occupant(0), Some(PieceId(0)));
        assert_eq!(b.slot_occupant(1), Some(PieceId(1)));
    }

    #[test]
    fn own_slot_click_just_deselects() {
        let mut b = all_in_bank();
        place(&mut b, 7, 7);
        b.click_piece(PieceId(7));
        assert_eq!(b.click_slot(7), PlaceOutcome::Deselected);
        assert_eq!(b.slot_occupant(7), Some(PieceId(7)));
    }

    #[test]
    fn bank_to_bank_swap_trades_spots() {
        let mut b = PuzzleBoard::with_bank_order(3, &[8, 7, 6, 5, 4, 3, 2, 1, 0]);
        b.click_piece(PieceId(8));
        b.click_piece(PieceId(0));
        assert_eq!(b.location(PieceId(8)), Some(Location::Bank(8)));
        assert_eq!(b.location(PieceId(0)), Some(Location::Bank(0)));
        assert_eq!(b.bank_pieces()[0], PieceId(0));
    }

    #[test]
    fn swap_twice_restores_placement() {
        let mut b = all_in_bank();
        place(&mut b, 2, 4);
        place(&mut b, 6, 8);
        let before: Vec<_> = (0..9).map(|i| b.location(PieceId(i))).collect();
        for _ in 0..2 {
            b.click_piece(PieceId(2));
            b.click_piece(PieceId(6));
        }
        let after: Vec<_> = (0..9).map(|i| b.location(PieceId(i))).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn random_clicks_keep_ownership_consistent() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut b = PuzzleBoard::new(3, &mut rng);
        for _ in 0..2000 {
            let i = rng.random_range(0..9);
            if rng.random_bool(0.5) {
                b.click_piece(PieceId(i));
            } else {
                b.click_slot(i);
            }
            assert!(b.is_consistent());
            let placed = (0..9).filter(|&s| b.slot_filled(s)).count();
            assert_eq!(placed + b.bank_pieces().len(), 9);
        }
    }

    #[test]
    fn solved_only_when_every_slot_matches() {
        let mut b = all_in_bank();
        for i in 0..8 {
            assert_eq!(
                place(&mut b, i, i),
                PlaceOutcome::Moved { piece: PieceId(i), slot: i, solved: false }
            );
        }
        assert!(!b.is_solved());
        assert_eq!(
            place(&mut b, 8, 8),
            PlaceOutcome::Moved { piece: PieceId(8), slot: 8, solved: true }
        );
        assert!(b.is_solved());
        assert_eq!(b.click_piece(PieceId(0)), PlaceOutcome::Ignored);
    }

    #[test]
    fn full_but_wrong_board_is_not_solved() {
        let mut b = all_in_bank();
        for i in 0..9 {
            place(&mut b, i, (i + 1) % 9);
        }
        assert!(b.bank_pieces().is_empty());
        assert!(!b.is_solved());

        // Rotate back into place one swap at a time; only the last solves.
        let mut solves = 0;
        for i in 0..8 {
            b.click_piece(PieceId(i));
            if let PlaceOutcome::Swapped { solved: true, .. } = b.click_slot(i) {
                solves += 1;
            }
        }
        assert_eq!(solves, 1);
        assert!(b.is_solved());
    }
}
