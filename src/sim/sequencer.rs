/// Sequencer: owns every stage's component state and moves the greeting
/// forward one stage at a time.
///
/// ## Flow
///
///   Welcome ─start click─▶ MemoryGame ─won +1.5s─▶ Puzzle ─won +1.5s─▶
///   Candles ─all out +2s─▶ Journey ─video ≥50% visible─▶ Video
///   ─closing ≥50% visible─▶ Closing
///
/// Inputs arrive through `handle()`, time through `tick()`. Both return the
/// events the presentation layer should react to. The clock is whatever
/// millisecond counter the caller supplies, so tests drive it by hand.
///
/// Delays are scheduled on `Timers` and never cancelled. A delayed advance
/// names the stage it leaves; `StageCursor` refuses it if that stage is no
/// longer current.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::GreetConfig;
use crate::domain::candles::{BlowOutcome, Cake};
use crate::domain::confetti::{Canvas, Confetti};
use crate::domain::journey::{scroll_progress, Journey};
use crate::domain::memory::{FlipOutcome, MemoryGame};
use crate::domain::puzzle::{PlaceOutcome, PuzzleBoard};
use super::event::{Input, StageEvent, Target};
use super::page::{PageLayout, Section};
use super::stage::{GameStage, StageCursor};
use super::timer::Timers;

/// How long one smoke puff lasts after a candle goes out.
pub const SMOKE_MS: u64 = 900;

const DEFAULT_CANVAS: Canvas = Canvas { width: 640.0, height: 384.0 };

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Deferred {
    EndPreview,
    HideMismatch,
    Advance(GameStage),
}

pub struct Sequencer {
    cfg: GreetConfig,
    stage: StageCursor,
    timers: Timers<Deferred>,
    rng: StdRng,
    now_ms: u64,
    last_tick_ms: Option<u64>,

    // ── Stage components ──
    memory: Option<MemoryGame>,
    puzzle: Option<PuzzleBoard>,
    cake: Option<Cake>,
    journey: Option<Journey>,
    confetti: Confetti,

    // ── Surface ──
    canvas: Canvas,
    layout: PageLayout,
    scroll: u32,

    // ── UI ──
    smoke: Vec<Option<u64>>,
    message: String,
    message_until: u64,
}

impl Sequencer {
    pub fn new(cfg: GreetConfig) -> Self {
        Self::with_rng(cfg, StdRng::from_os_rng())
    }

    #[cfg(test)]
    pub fn with_seed(cfg: GreetConfig, seed: u64) -> Self {
        Self::with_rng(cfg, StdRng::seed_from_u64(seed))
    }

    fn with_rng(cfg: GreetConfig, rng: StdRng) -> Self {
        Sequencer {
            cfg,
            stage: StageCursor::new(),
            timers: Timers::new(),
            rng,
            now_ms: 0,
            last_tick_ms: None,
            memory: None,
            puzzle: None,
            cake: None,
            journey: None,
            confetti: Confetti::new(),
            canvas: DEFAULT_CANVAS,
            layout: PageLayout::new(20),
            scroll: 0,
            smoke: Vec::new(),
            message: String::new(),
            message_until: 0,
        }
    }

    // ── Read access for the renderer ──

    pub fn stage(&self) -> GameStage { self.stage.current() }
    pub fn config(&self) -> &GreetConfig { &self.cfg }
    pub fn memory(&self) -> Option<&MemoryGame> { self.memory.as_ref() }
    pub fn puzzle(&self) -> Option<&PuzzleBoard> { self.puzzle.as_ref() }
    pub fn cake(&self) -> Option<&Cake> { self.cake.as_ref() }
    pub fn journey(&self) -> Option<&Journey> { self.journey.as_ref() }
    pub fn confetti(&self) -> &Confetti { &self.confetti }
    pub fn layout(&self) -> &PageLayout { &self.layout }
    pub fn scroll(&self) -> u32 { self.scroll }
    pub fn now_ms(&self) -> u64 { self.now_ms }

    /// Active banner text, if any.
    pub fn message(&self) -> Option<&str> {
        if self.message.is_empty() || self.now_ms >= self.message_until {
            None
        } else {
            Some(&self.message)
        }
    }

    /// Milliseconds since this candle's smoke puff started, while it lasts.
    pub fn smoke_age(&self, candle: usize) -> Option<u64> {
        let start = self.smoke.get(candle).copied().flatten()?;
        let age = self.now_ms.saturating_sub(start);
        (age < SMOKE_MS).then_some(age)
    }

    fn set_message(&mut self, msg: &str) {
        self.message = msg.to_string();
        self.message_until = self.now_ms + self.cfg.timing.message_ms;
    }

    // ── Input ──

    pub fn handle(&mut self, now_ms: u64, input: Input) -> Vec<StageEvent> {
        self.now_ms = self.now_ms.max(now_ms);
        let mut events = Vec::new();
        match input {
            Input::Click(target) => self.click(target, &mut events),
            Input::Scroll(delta) => {
                if self.stage().on_page() {
                    self.scroll = self.layout.scroll_by(self.scroll, delta);
                    self.page_changed(&mut events);
                }
            }
            Input::ScrollToEnd(bottom) => {
                if self.stage().on_page() {
                    self.scroll = if bottom { self.layout.max_scroll() } else { 0 };
                    self.page_changed(&mut events);
                }
            }
            Input::Resize { canvas, page_rows } => {
                self.canvas = canvas;
                self.layout = PageLayout::new(page_rows);
                self.scroll = self.scroll.min(self.layout.max_scroll());
                if self.stage().on_page() {
                    self.page_changed(&mut events);
                }
            }
        }
        events
    }

    fn click(&mut self, target: Target, events: &mut Vec<StageEvent>) {
        match (self.stage(), target) {
            (GameStage::Welcome, Target::StartButton) => self.start(events),
            (GameStage::MemoryGame, Target::Card(pos)) => self.flip_card(pos, events),
            (GameStage::Puzzle, Target::Piece(id)) => {
                let out = match self.puzzle.as_mut() {
                    Some(p) => p.click_piece(id),
                    None => return,
                };
                self.placed(out, events);
            }
            (GameStage::Puzzle, Target::Slot(slot)) => {
                let out = match self.puzzle.as_mut() {
                    Some(p) => p.click_slot(slot),
                    None => return,
                };
                self.placed(out, events);
            }
            (GameStage::Candles, Target::Candle(i)) => self.blow_candle(i, events),
            _ => {}
        }
    }

    fn start(&mut self, events: &mut Vec<StageEvent>) {
        if self.stage.advance_from(GameStage::Welcome).is_none() {
            return;
        }
        log::info!("greeting started");
        events.push(StageEvent::MusicStart);
        self.enter_memory(events);
    }

    fn flip_card(&mut self, pos: usize, events: &mut Vec<StageEvent>) {
        let out = match self.memory.as_mut() {
            Some(m) => m.activate(pos),
            None => return,
        };
        match out {
            FlipOutcome::Ignored => {}
            FlipOutcome::Revealed { pos } => events.push(StageEvent::CardRevealed { pos }),
            FlipOutcome::Matched { first, second, won } => {
                events.push(StageEvent::CardRevealed { pos: second });
                events.push(StageEvent::PairMatched { first, second });
                if won {
                    log::info!("memory game won");
                    events.push(StageEvent::MemoryWon);
                    self.burst(self.cfg.confetti.small_burst, events);
                    self.set_message("All pairs found!");
                    self.timers.schedule(
                        self.now_ms,
                        self.cfg.timing.memory_advance_ms,
                        Deferred::Advance(GameStage::MemoryGame),
                    );
                }
            }
            FlipOutcome::Mismatched { first, second } => {
                events.push(StageEvent::CardRevealed { pos: second });
                events.push(StageEvent::PairMissed { first, second });
                self.timers.schedule(self.now_ms, self.cfg.timing.mismatch_ms, Deferred::HideMismatch);
            }
        }
    }

    fn placed(&mut self, out: PlaceOutcome, events: &mut Vec<StageEvent>) {
        let solved = match out {
            PlaceOutcome::Ignored | PlaceOutcome::Deselected => return,
            PlaceOutcome::Selected(id) => {
                events.push(StageEvent::PieceSelected(id));
                return;
            }
            PlaceOutcome::Moved { solved, .. } | PlaceOutcome::Swapped { solved, .. } => solved,
        };
        events.push(StageEvent::PiecePlaced);
        if solved {
            log::info!("puzzle solved");
            events.push(StageEvent::PuzzleWon);
            self.burst(self.cfg.confetti.big_burst, events);
            self.set_message("Puzzle complete!");
            self.timers.schedule(
                self.now_ms,
                self.cfg.timing.puzzle_advance_ms,
                Deferred::Advance(GameStage::Puzzle),
            );
        }
    }

    fn blow_candle(&mut self, candle: usize, events: &mut Vec<StageEvent>) {
        let out = match self.cake.as_mut() {
            Some(c) => c.blow(candle),
            None => return,
        };
        if let BlowOutcome::Extinguished { candle, all_out } = out {
            if let Some(slot) = self.smoke.get_mut(candle) {
                *slot = Some(self.now_ms);
            }
            events.push(StageEvent::CandleBlown { candle });
            if all_out {
                log::info!("all candles out");
                events.push(StageEvent::AllCandlesOut);
                self.set_message("Make a wish...");
                self.timers.schedule(
                    self.now_ms,
                    self.cfg.timing.candles_advance_ms,
                    Deferred::Advance(GameStage::Candles),
                );
            }
        }
    }

    fn burst(&mut self, count: usize, events: &mut Vec<StageEvent>) {
        self.confetti.launch(
            count,
            &self.cfg.confetti.palette,
            self.canvas,
            self.cfg.timing.confetti_ms,
            &mut self.rng,
        );
        if self.confetti.is_active() {
            events.push(StageEvent::ConfettiLaunched { count });
        }
    }

    // ── Stage entry ──

    fn enter_memory(&mut self, events: &mut Vec<StageEvent>) {
        self.memory = Some(MemoryGame::new(&self.cfg.memory.icons, &mut self.rng));
        self.timers.schedule(self.now_ms, self.cfg.timing.preview_ms, Deferred::EndPreview);
        self.set_message("Remember the cards...");
        events.push(StageEvent::StageEntered(GameStage::MemoryGame));
    }

    fn advance(&mut self, from: GameStage, events: &mut Vec<StageEvent>) {
        let next = match self.stage.advance_from(from) {
            Some(s) => s,
            None => return,
        };
        log::info!("stage {} -> {}", from.title(), next.title());
        match next {
            GameStage::Puzzle => {
                self.puzzle = Some(PuzzleBoard::new(self.cfg.puzzle.grid_size, &mut self.rng));
                self.set_message("Rebuild the picture: pick a piece, then a spot");
            }
            GameStage::Candles => {
                self.cake = Some(Cake::new(self.cfg.candles.count));
                self.smoke = vec![None; self.cfg.candles.count];
                self.set_message("Blow out the candles");
            }
            GameStage::Journey => {
                self.journey = Some(Journey::new(self.cfg.journey.texts.len()));
                self.scroll = 0;
                self.set_message("Scroll down");
            }
            GameStage::Video => {
                events.push(StageEvent::VideoStart);
            }
            GameStage::Welcome | GameStage::MemoryGame | GameStage::Closing => {}
        }
        events.push(StageEvent::StageEntered(next));
        if next == GameStage::Journey {
            self.page_changed(events);
        }
    }

    /// Recompute everything that depends on the scroll offset.
    fn page_changed(&mut self, events: &mut Vec<StageEvent>) {
        let layout = self.layout;
        let scroll = self.scroll;

        if let Some(journey) = self.journey.as_mut() {
            let progress = scroll_progress(
                scroll as f32,
                layout.journey.top as f32,
                layout.journey.height as f32,
                layout.viewport as f32,
            );
            if let Some(p) = progress {
                for k in journey.update(p) {
                    events.push(StageEvent::TextRevealed(k));
                }
            }
        }

        let threshold = self.cfg.media.visibility_threshold;
        if self.stage() == GameStage::Journey && reached(&layout.video, scroll, layout.viewport, threshold) {
            self.advance(GameStage::Journey, events);
        }
        if self.stage() == GameStage::Video && reached(&layout.closing, scroll, layout.viewport, threshold) {
            self.advance(GameStage::Video, events);
        }
    }

    // ── Time ──

    /// Fire due timers and step the confetti.
    pub fn tick(&mut self, now_ms: u64) -> Vec<StageEvent> {
        self.now_ms = self.now_ms.max(now_ms);
        let dt = self.last_tick_ms.map_or(0, |t| self.now_ms.saturating_sub(t));
        self.last_tick_ms = Some(self.now_ms);

        let mut events = Vec::new();
        for action in self.timers.take_due(self.now_ms) {
            match action {
                Deferred::EndPreview => {
                    if let Some(m) = self.memory.as_mut() {
                        m.end_preview();
                        events.push(StageEvent::PreviewEnded);
                    }
                }
                Deferred::HideMismatch => {
                    if let Some(m) = self.memory.as_mut() {
                        m.hide_mismatch();
                        events.push(StageEvent::PairHidden);
                    }
                }
                Deferred::Advance(from) => self.advance(from, &mut events),
            }
        }

        if self.confetti.is_active() && !self.confetti.step(dt, &mut self.rng) {
            events.push(StageEvent::ConfettiCleared);
        }
        events
    }

    #[cfg(test)]
    fn puzzle_mut(&mut self) -> Option<&mut PuzzleBoard> { self.puzzle.as_mut() }
}

/// A page section counts as reached once enough of it is on screen, or once
/// the reader has scrolled past its top (a jump can skip over it entirely).
fn reached(section: &Section, scroll: u32, viewport: u32, threshold: f32) -> bool {
    section.is_visible(scroll, viewport, threshold) || scroll >= section.top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::Face;
    use crate::domain::puzzle::PieceId;

    fn cfg() -> GreetConfig {
        let mut c = GreetConfig::default();
        c.memory.icons = vec!["A".into(), "B".into()];
        c
    }

    fn started() -> Sequencer {
        started_with(cfg())
    }

    fn started_with(c: GreetConfig) -> Sequencer {
        let mut s = Sequencer::with_seed(c, 11);
        let ev = s.handle(0, Input::Click(Target::StartButton));
        assert!(ev.contains(&StageEvent::MusicStart));
        s
    }

    /// Positions of each symbol's two cards.
    fn pairs(s: &Sequencer) -> Vec<(usize, usize)> {
        let cards = s.memory().expect("memory game").cards();
        let mut out = Vec::new();
        for (i, c) in cards.iter().enumerate() {
            if let Some(j) = (i + 1..cards.len()).find(|&j| cards[j].symbol == c.symbol) {
                out.push((i, j));
            }
        }
        out
    }

    fn click(s: &mut Sequencer, now: u64, t: Target) -> Vec<StageEvent> {
        s.handle(now, Input::Click(t))
    }

    fn win_memory(s: &mut Sequencer, now: u64) -> Vec<StageEvent> {
        let mut all = Vec::new();
        for (a, b) in pairs(s) {
            all.extend(click(s, now, Target::Card(a)));
            all.extend(click(s, now, Target::Card(b)));
        }
        all
    }

    fn solve_puzzle(s: &mut Sequencer, now: u64) -> Vec<StageEvent> {
        let n = s.puzzle().expect("puzzle").piece_count();
        let mut all = Vec::new();
        for i in 0..n {
            all.extend(click(s, now, Target::Piece(PieceId(i))));
            all.extend(click(s, now, Target::Slot(i)));
        }
        all
    }

    fn count(events: &[StageEvent], e: &StageEvent) -> usize {
        events.iter().filter(|x| *x == e).count()
    }

    fn to_journey() -> Sequencer {
        to_journey_with(cfg())
    }

    fn to_journey_with(c: GreetConfig) -> Sequencer {
        let mut s = started_with(c);
        s.tick(3000);
        win_memory(&mut s, 3000);
        s.tick(4500);
        solve_puzzle(&mut s, 4500);
        s.tick(6000);
        for i in 0..3 {
            click(&mut s, 6000, Target::Candle(i));
        }
        s.tick(8000);
        assert_eq!(s.stage(), GameStage::Journey);
        s
    }

    #[test]
    fn clicks_outside_current_stage_are_ignored() {
        let mut s = Sequencer::with_seed(cfg(), 1);
        assert!(click(&mut s, 0, Target::Card(0)).is_empty());
        assert!(click(&mut s, 0, Target::Candle(0)).is_empty());
        assert_eq!(s.stage(), GameStage::Welcome);
        assert!(s.handle(0, Input::Scroll(5)).is_empty());
        assert_eq!(s.scroll(), 0);
    }

    #[test]
    fn start_enters_memory_with_preview() {
        let mut s = Sequencer::with_seed(cfg(), 2);
        let ev = click(&mut s, 100, Target::StartButton);
        assert_eq!(ev, vec![StageEvent::MusicStart, StageEvent::StageEntered(GameStage::MemoryGame)]);
        assert!(s.memory().map_or(false, |m| m.is_previewing()));

        // Second start click does nothing.
        assert!(click(&mut s, 200, Target::StartButton).is_empty());

        // Clicks during preview are rejected.
        assert!(click(&mut s, 500, Target::Card(0)).is_empty());
        assert!(s.tick(3099).is_empty());
        assert_eq!(s.tick(3100), vec![StageEvent::PreviewEnded]);
        assert!(s.memory().unwrap().cards().iter().all(|c| c.face == Face::Hidden));
    }

    #[test]
    fn mismatch_hides_after_delay() {
        let mut s = started();
        s.tick(3000);
        let (a, _) = pairs(&s)[0];
        let (b, _) = pairs(&s)[1];
        click(&mut s, 3000, Target::Card(a));
        let ev = click(&mut s, 3010, Target::Card(b));
        assert!(ev.contains(&StageEvent::PairMissed { first: a, second: b }));
        assert!(s.tick(4009).is_empty());
        assert_eq!(s.tick(4010), vec![StageEvent::PairHidden]);
        assert_eq!(s.memory().unwrap().flipped_count(), 0);
        assert_eq!(s.memory().unwrap().cards()[a].face, Face::Hidden);
    }

    #[test]
    fn memory_win_bursts_and_advances_once() {
        let mut s = started();
        s.tick(3000);
        let ev = win_memory(&mut s, 3000);
        assert_eq!(count(&ev, &StageEvent::MemoryWon), 1);
        assert!(ev.contains(&StageEvent::ConfettiLaunched { count: 50 }));
        assert!(s.confetti().is_active());
        assert_eq!(s.stage(), GameStage::MemoryGame);

        assert!(!s.tick(4499).contains(&StageEvent::StageEntered(GameStage::Puzzle)));
        let ev = s.tick(4500);
        assert!(ev.contains(&StageEvent::StageEntered(GameStage::Puzzle)));
        assert_eq!(s.stage(), GameStage::Puzzle);
        assert_eq!(s.puzzle().unwrap().bank_pieces().len(), 9);
    }

    #[test]
    fn puzzle_win_advances_to_candles() {
        let mut s = started();
        s.tick(3000);
        win_memory(&mut s, 3000);
        s.tick(4500);
        let ev = solve_puzzle(&mut s, 5000);
        assert_eq!(count(&ev, &StageEvent::PuzzleWon), 1);
        assert!(ev.contains(&StageEvent::ConfettiLaunched { count: 150 }));
        assert_eq!(s.confetti().particles().len(), 150);
        s.tick(6499);
        assert_eq!(s.stage(), GameStage::Puzzle);
        s.tick(6500);
        assert_eq!(s.stage(), GameStage::Candles);
        assert_eq!(s.cake().unwrap().candle_count(), 3);
    }

    #[test]
    fn puzzle_scenario_through_sequencer() {
        let mut s = started();
        s.tick(3000);
        win_memory(&mut s, 3000);
        s.tick(4500);
        click(&mut s, 5000, Target::Piece(PieceId(5)));
        click(&mut s, 5000, Target::Slot(2));
        let p = s.puzzle().unwrap();
        assert_eq!(p.slot_occupant(2), Some(PieceId(5)));
        click(&mut s, 5000, Target::Piece(PieceId(5)));
        click(&mut s, 5000, Target::Piece(PieceId(3)));
        let p = s.puzzle_mut().unwrap();
        assert_eq!(p.slot_occupant(2), Some(PieceId(3)));
        assert!(p.bank_pieces().contains(&PieceId(5)));
    }

    #[test]
    fn candles_reveal_journey_after_delay() {
        let mut s = started();
        s.tick(3000);
        win_memory(&mut s, 3000);
        s.tick(4500);
        solve_puzzle(&mut s, 4500);
        s.tick(6000);
        assert_eq!(s.stage(), GameStage::Candles);

        click(&mut s, 6000, Target::Candle(0));
        assert!(s.smoke_age(0).is_some());
        assert!(click(&mut s, 6000, Target::Candle(0)).is_empty());
        click(&mut s, 6000, Target::Candle(1));
        let ev = click(&mut s, 6100, Target::Candle(2));
        assert_eq!(count(&ev, &StageEvent::AllCandlesOut), 1);

        s.tick(8099);
        assert_eq!(s.stage(), GameStage::Candles);
        let ev = s.tick(8100);
        assert!(ev.contains(&StageEvent::StageEntered(GameStage::Journey)));
        assert!(s.journey().is_some());
        assert_eq!(s.scroll(), 0);
    }

    #[test]
    fn scrolling_reveals_text_then_video_then_closing() {
        let mut s = to_journey();
        let canvas = Canvas { width: 800.0, height: 320.0 };
        s.handle(8000, Input::Resize { canvas, page_rows: 20 });

        // Journey 0..60, video 60..80, closing 80..100.
        let ev = s.handle(8000, Input::Scroll(20));
        assert!(ev.contains(&StageEvent::TextRevealed(0)));
        assert_eq!(s.stage(), GameStage::Journey);

        let ev = s.handle(8000, Input::Scroll(29));
        assert!(!ev.contains(&StageEvent::VideoStart));
        let ev = s.handle(8000, Input::Scroll(1));
        assert!(ev.contains(&StageEvent::VideoStart));
        assert_eq!(s.stage(), GameStage::Video);
        assert!((0..4).all(|k| s.journey().unwrap().is_revealed(k)));

        // Scrolling back up never re-enters or hides anything.
        let ev = s.handle(8000, Input::Scroll(-50));
        assert!(ev.is_empty());
        assert_eq!(s.stage(), GameStage::Video);
        assert!(s.journey().unwrap().is_revealed(3));

        let ev = s.handle(8000, Input::Scroll(70));
        assert!(ev.contains(&StageEvent::StageEntered(GameStage::Closing)));
        assert_eq!(s.stage(), GameStage::Closing);
    }

    #[test]
    fn jump_to_bottom_passes_through_video() {
        let mut s = to_journey();
        let ev = s.handle(9000, Input::ScrollToEnd(true));
        let video = ev.iter().position(|e| *e == StageEvent::VideoStart).expect("video");
        let closing = ev
            .iter()
            .position(|e| *e == StageEvent::StageEntered(GameStage::Closing))
            .expect("closing");
        assert!(video < closing);
        assert_eq!(count(&ev, &StageEvent::VideoStart), 1);
    }

    #[test]
    fn zero_threshold_waits_for_the_reader_to_scroll() {
        let mut c = cfg();
        c.media.visibility_threshold = 0.0;
        let mut s = to_journey_with(c);
        let canvas = Canvas { width: 800.0, height: 320.0 };
        let ev = s.handle(8000, Input::Resize { canvas, page_rows: 20 });
        assert!(!ev.contains(&StageEvent::VideoStart));
        assert_eq!(s.scroll(), 0);
        assert_eq!(s.stage(), GameStage::Journey);

        // Any overlap with the video section is enough at threshold 0.
        let ev = s.handle(8000, Input::Scroll(41));
        assert!(ev.contains(&StageEvent::VideoStart));
        assert_eq!(s.stage(), GameStage::Video);
    }

    #[test]
    fn confetti_clears_after_duration() {
        let mut s = started();
        s.tick(3000);
        win_memory(&mut s, 3000);
        let mut cleared = 0;
        let mut t = 3000;
        while t <= 9000 {
            t += 16;
            cleared += count(&s.tick(t), &StageEvent::ConfettiCleared);
        }
        assert_eq!(cleared, 1);
        assert!(!s.confetti().is_active());
    }

    #[test]
    fn message_expires() {
        let mut s = started();
        assert!(s.message().is_some());
        s.tick(2600);
        assert!(s.message().is_none());
    }
}
