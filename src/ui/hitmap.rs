/// Click targets recorded while a frame is composed.
///
/// Zones are stacked in the order they are pushed; a click resolves to the
/// topmost zone under it. Pieces are pushed after the slots they sit in, so
/// a click on a placed piece never reaches the slot behind it.

use crate::sim::event::Target;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Rect { x, y, w, h }
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        col >= self.x && col < self.x + self.w && row >= self.y && row < self.y + self.h
    }
}

pub struct HitMap {
    zones: Vec<(Rect, Target)>,
}

impl HitMap {
    pub fn new() -> Self {
        HitMap { zones: Vec::with_capacity(32) }
    }

    pub fn clear(&mut self) {
        self.zones.clear();
    }

    /// Register a zone above every zone pushed so far.
    pub fn push(&mut self, rect: Rect, target: Target) {
        if rect.w > 0 && rect.h > 0 {
            self.zones.push((rect, target));
        }
    }

    pub fn hit(&self, col: usize, row: usize) -> Option<Target> {
        self.zones
            .iter()
            .rev()
            .find(|(r, _)| r.contains(col, row))
            .map(|(_, t)| *t)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize { self.zones.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::puzzle::PieceId;

    #[test]
    fn rect_edges_are_half_open() {
        let r = Rect::new(2, 3, 4, 2);
        assert!(r.contains(2, 3));
        assert!(r.contains(5, 4));
        assert!(!r.contains(6, 4));
        assert!(!r.contains(5, 5));
        assert!(!r.contains(1, 3));
    }

    #[test]
    fn topmost_zone_wins() {
        let mut map = HitMap::new();
        map.push(Rect::new(0, 0, 12, 5), Target::Slot(4));
        map.push(Rect::new(1, 1, 10, 3), Target::Piece(PieceId(7)));
        assert_eq!(map.hit(5, 2), Some(Target::Piece(PieceId(7))));
        // Slot frame outside the piece still hits the slot.
        assert_eq!(map.hit(0, 0), Some(Target::Slot(4)));
        assert_eq!(map.hit(11, 4), Some(Target::Slot(4)));
        assert_eq!(map.hit(20, 20), None);
    }

    #[test]
    fn empty_rects_are_dropped_and_clear_resets() {
        let mut map = HitMap::new();
        map.push(Rect::new(0, 0, 0, 5), Target::StartButton);
        assert_eq!(map.len(), 0);
        map.push(Rect::new(0, 0, 3, 1), Target::Candle(0));
        assert_eq!(map.hit(1, 0), Some(Target::Candle(0)));
        map.clear();
        assert_eq!(map.hit(1, 0), None);
    }
}
