/// Memory match: pairs of face-down cards, two flips per turn.
///
/// ## Card lifecycle
///
///   Hidden ──activate──▶ Revealed ──pair equal──▶ Matched (permanent)
///                            │
///                            └──pair differs──▶ Hidden (after hide_mismatch)
///
/// The board starts in a preview: every card is shown and input is locked
/// until `end_preview()`. While two unequal cards are showing the board is
/// locked again until `hide_mismatch()`. The lock is the only thing keeping
/// a third click from corrupting a comparison in flight.
///
/// Timing lives in the sequencer; this type only knows the order of calls.

use rand::seq::SliceRandom;
use rand::Rng;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Face {
    Hidden,
    Revealed,
    Matched,
}

#[derive(Clone, Debug)]
pub struct Card {
    pub symbol: String,
    pub face: Face,
}

impl Card {
    fn new(symbol: &str) -> Self {
        Card { symbol: symbol.to_string(), face: Face::Revealed }
    }
}

/// Result of a single card activation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FlipOutcome {
    /// Locked board, out-of-range position, or card not face-down.
    Ignored,
    /// First card of a pair turned over.
    Revealed { pos: usize },
    /// Second card equals the first. `won` is set on the final pair only.
    Matched { first: usize, second: usize, won: bool },
    /// Second card differs; board stays locked until `hide_mismatch()`.
    Mismatched { first: usize, second: usize },
}

pub struct MemoryGame {
    cards: Vec<Card>,
    pairs: usize,
    /// Positions currently face-up and not yet resolved (0, 1 or 2 entries).
    flipped: Vec<usize>,
    matched_pairs: usize,
    locked: bool,
    previewing: bool,
    won: bool,
}

impl MemoryGame {
    /// Deal two copies of every icon in a uniformly random order.
    pub fn new<R: Rng + ?Sized>(icons: &[String], rng: &mut R) -> Self {
        let mut deck: Vec<&str> = icons.iter().chain(icons.iter()).map(String::as_str).collect();
        deck.shuffle(rng);
        Self::with_deck(&deck)
    }

    /// Deal an explicit deck, in order. Used by `new` after shuffling.
    pub fn with_deck(deck: &[&str]) -> Self {
        MemoryGame {
            cards: deck.iter().map(|s| Card::new(s)).collect(),
            pairs: deck.len() / 2,
            flipped: Vec::with_capacity(2),
            matched_pairs: 0,
            locked: true,
            previewing: true,
            won: false,
        }
    }

    /// Turn every card face-down and accept input.
    pub fn end_preview(&mut self) {
        if !self.previewing {
            return;
        }
        for card in &mut self.cards {
            card.face = Face::Hidden;
        }
        self.previewing = false;
        self.locked = false;
    }

    pub fn activate(&mut self, pos: usize) -> FlipOutcome {
        if self.locked {
            return FlipOutcome::Ignored;
        }
        match self.cards.get(pos) {
            Some(card) if card.face == Face::Hidden => {}
            _ => return FlipOutcome::Ignored,
        }

        self.cards[pos].face = Face::Revealed;
        self.flipped.push(pos);

        if self.flipped.len() < 2 {
            return FlipOutcome::Revealed { pos };
        }

        self.locked = true;
        let (first, second) = (self.flipped[0], self.flipped[1]);

        if self.cards[first].symbol == self.cards[second].symbol {
            self.cards[first].face = Face::Matched;
            self.cards[second].face = Face::Matched;
            self.matched_pairs += 1;
            self.flipped.clear();
            self.locked = false;

            let won = !self.won && self.matched_pairs == self.pairs;
            if won {
                self.won = true;
                self.locked = true;
            }
            FlipOutcome::Matched { first, second, won }
        } else {
            FlipOutcome::Mismatched { first, second }
        }
    }

    /// Turn a mismatched pair back over and unlock the board.
    pub fn hide_mismatch(&mut self) {
        if self.flipped.len() != 2 {
            return;
        }
        for &pos in &self.flipped {
            if self.cards[pos].face == Face::Revealed {
                self.cards[pos].face = Face::Hidden;
            }
        }
        self.flipped.clear();
        self.locked = false;
    }

    pub fn cards(&self) -> &[Card] { &self.cards }
    pub fn matched_pairs(&self) -> usize { self.matched_pairs }
    pub fn pairs(&self) -> usize { self.pairs }
    pub fn is_previewing(&self) -> bool { self.previewing }
    pub fn is_won(&self) -> bool { self.won }
}

#[cfg(test)]
impl MemoryGame {
    pub fn flipped_count(&self) -> usize { self.flipped.len() }
    pub fn is_locked(&self) -> bool { self.locked }
}
