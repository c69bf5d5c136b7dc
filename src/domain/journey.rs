/// Scroll-driven narrative: a path that draws itself as the reader scrolls
/// through the journey section, and text blocks that appear along the way.
///
/// Progress is a pure function of the scroll offset and section geometry.
/// The only state kept is which blocks have appeared; they never disappear.

/// Map a scroll offset to progress through a section.
///
/// `None` until the section's top has entered the viewport. From there the
/// value ramps from 0 (section top at mid-viewport) to 1 (section bottom at
/// mid-viewport), clamped.
pub fn scroll_progress(
    scroll_y: f32,
    section_top: f32,
    section_height: f32,
    window_height: f32,
) -> Option<f32> {
    if scroll_y <= section_top - window_height {
        return None;
    }
    let span = section_height - window_height / 2.0;
    if span <= 0.0 {
        return Some(1.0);
    }
    let p = (scroll_y - (section_top - window_height / 2.0)) / span;
    Some(p.clamp(0.0, 1.0))
}

pub struct Journey {
    stroke: f32,
    revealed: Vec<bool>,
}

impl Journey {
    pub fn new(text_count: usize) -> Self {
        Journey { stroke: 0.0, revealed: vec![false; text_count] }
    }

    /// Reveal threshold for block `k`: evenly spaced strictly inside (0, 1).
    pub fn threshold(&self, k: usize) -> f32 {
        (k + 1) as f32 / (self.revealed.len() + 1) as f32
    }

    /// Apply a new progress value. Returns the blocks revealed by this call.
    pub fn update(&mut self, progress: f32) -> Vec<usize> {
        self.stroke = progress.clamp(0.0, 1.0);
        let mut fresh = Vec::new();
        for k in 0..self.revealed.len() {
            if !self.revealed[k] && self.stroke > self.threshold(k) {
                self.revealed[k] = true;
                fresh.push(k);
            }
        }
        fresh
    }

    /// Fraction of the path drawn, in [0, 1].
    pub fn stroke(&self) -> f32 { self.stroke }

    pub fn is_revealed(&self, k: usize) -> bool {
        self.revealed.get(k).copied().unwrap_or(false)
    }

    pub fn text_count(&self) -> usize { self.revealed.len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_none_before_section() {
        assert_eq!(scroll_progress(0.0, 100.0, 300.0, 100.0), None);
        assert_eq!(scroll_progress(-60.0, 50.0, 300.0, 100.0), None);
        // Exactly one window above the top is still outside.
        assert_eq!(scroll_progress(-50.0, 50.0, 300.0, 100.0), None);
        assert_eq!(scroll_progress(-49.0, 50.0, 300.0, 100.0), Some(0.0));
    }

    #[test]
    fn progress_ramps_and_clamps() {
        // top=200, height=300, window=100 → starts counting past scroll 100,
        // zero at scroll 150, one at scroll 400.
        assert_eq!(scroll_progress(120.0, 200.0, 300.0, 100.0), Some(0.0));
        assert_eq!(scroll_progress(150.0, 200.0, 300.0, 100.0), Some(0.0));
        let mid = scroll_progress(275.0, 200.0, 300.0, 100.0).unwrap();
        assert!((mid - 0.5).abs() < 1e-6);
        assert_eq!(scroll_progress(400.0, 200.0, 300.0, 100.0), Some(1.0));
        assert_eq!(scroll_progress(9000.0, 200.0, 300.0, 100.0), Some(1.0));
    }

    #[test]
    fn degenerate_section_is_fully_drawn() {
        assert_eq!(scroll_progress(10.0, 0.0, 40.0, 100.0), Some(1.0));
    }

    #[test]
    fn four_blocks_use_fifths() {
        let j = Journey::new(4);
        assert!((j.threshold(0) - 0.2).abs() < 1e-6);
        assert!((j.threshold(3) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn blocks_reveal_in_order_and_stay() {
        let mut j = Journey::new(4);
        assert!(j.update(0.2).is_empty());
        assert_eq!(j.update(0.45), vec![0, 1]);
        assert_eq!(j.update(0.9), vec![2, 3]);
        assert!(j.update(0.1).is_empty());
        assert!((0..4).all(|k| j.is_revealed(k)));
        assert!((j.stroke() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn jump_to_end_reveals_everything_once() {
        let mut j = Journey::new(3);
        assert_eq!(j.update(1.0), vec![0, 1, 2]);
        assert!(j.update(1.0).is_empty());
    }
}
