/// Geometry of the scrollable page revealed after the candles.
///
/// ```text
///   row 0          ┌──────────────┐
///                  │   journey    │  JOURNEY_SCREENS viewports tall
///                  ├──────────────┤
///                  │    video     │  one viewport
///                  ├──────────────┤
///                  │   closing    │  one viewport
///   total          └──────────────┘
/// ```
///
/// All values are in terminal rows. The viewport is the area below the HUD.

const JOURNEY_SCREENS: u32 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Section {
    pub top: u32,
    pub height: u32,
}

impl Section {
    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }

    /// Fraction of this section inside `[scroll, scroll + viewport)`.
    pub fn visible_fraction(&self, scroll: u32, viewport: u32) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        let lo = self.top.max(scroll);
        let hi = self.bottom().min(scroll.saturating_add(viewport));
        if hi <= lo {
            return 0.0;
        }
        (hi - lo) as f32 / self.height as f32
    }

    /// At least `threshold` of the section is on screen. A zero threshold
    /// still needs some overlap.
    pub fn is_visible(&self, scroll: u32, viewport: u32, threshold: f32) -> bool {
        let fraction = self.visible_fraction(scroll, viewport);
        fraction > 0.0 && fraction >= threshold
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PageLayout {
    pub viewport: u32,
    pub journey: Section,
    pub video: Section,
    pub closing: Section,
}

impl PageLayout {
    pub fn new(viewport: u32) -> Self {
        let h = viewport.max(1);
        let journey = Section { top: 0, height: h * JOURNEY_SCREENS };
        let video = Section { top: journey.bottom(), height: h };
        let closing = Section { top: video.bottom(), height: h };
        PageLayout { viewport: h, journey, video, closing }
    }

    pub fn total_height(&self) -> u32 {
        self.closing.bottom()
    }

    pub fn max_scroll(&self) -> u32 {
        self.total_height().saturating_sub(self.viewport)
    }

    /// Apply a signed scroll delta, clamped to the page.
    pub fn scroll_by(&self, scroll: u32, delta: i32) -> u32 {
        let target = scroll as i64 + delta as i64;
        target.clamp(0, self.max_scroll() as i64) as u32
    }
}
