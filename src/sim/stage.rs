/// The greeting's stages, in the only order they can happen.

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum GameStage {
    Welcome,
    MemoryGame,
    Puzzle,
    Candles,
    Journey,
    Video,
    Closing,
}

impl GameStage {
    pub fn next(self) -> Option<GameStage> {
        match self {
            GameStage::Welcome => Some(GameStage::MemoryGame),
            GameStage::MemoryGame => Some(GameStage::Puzzle),
            GameStage::Puzzle => Some(GameStage::Candles),
            GameStage::Candles => Some(GameStage::Journey),
            GameStage::Journey => Some(GameStage::Video),
            GameStage::Video => Some(GameStage::Closing),
            GameStage::Closing => None,
        }
    }

    /// Stages from Journey on share the scrollable page.
    pub fn on_page(self) -> bool {
        self >= GameStage::Journey
    }

    pub fn title(self) -> &'static str {
        match self {
            GameStage::Welcome => "Welcome",
            GameStage::MemoryGame => "Memory",
            GameStage::Puzzle => "Puzzle",
            GameStage::Candles => "Candles",
            GameStage::Journey => "Journey",
            GameStage::Video => "Video",
            GameStage::Closing => "Closing",
        }
    }
}

/// Monotonic stage cursor: moves one step forward or not at all.
#[derive(Clone, Copy, Debug)]
pub struct StageCursor {
    current: GameStage,
}

impl StageCursor {
    pub fn new() -> Self {
        StageCursor { current: GameStage::Welcome }
    }

    pub fn current(&self) -> GameStage { self.current }

    /// Advance from `from` to its successor. Refused unless `from` is the
    /// current stage, so a stale or duplicate completion can't skip ahead
    /// or re-enter anything.
    pub fn advance_from(&mut self, from: GameStage) -> Option<GameStage> {
        if self.current != from {
            return None;
        }
        let next = self.current.next()?;
        self.current = next;
        Some(next)
    }
}
