/// Inputs the sequencer accepts and events it emits.
/// The presentation layer turns events into sound, video and messages.

use crate::domain::confetti::Canvas;
use crate::domain::puzzle::PieceId;
use super::stage::GameStage;

/// A clickable element, as resolved by the hit map.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Target {
    StartButton,
    Card(usize),
    Piece(PieceId),
    Slot(usize),
    Candle(usize),
}

#[derive(Clone, Copy, Debug)]
pub enum Input {
    Click(Target),
    /// Signed scroll in rows; positive is down the page.
    Scroll(i32),
    /// Jump to the top (`false`) or bottom (`true`) of the page.
    ScrollToEnd(bool),
    /// Surface size changed: confetti canvas and page viewport rows.
    Resize { canvas: Canvas, page_rows: u32 },
}

#[derive(Clone, Debug, PartialEq)]
#[allow(dead_code)]
pub enum StageEvent {
    StageEntered(GameStage),
    /// Start the intro track, chained to the looping track.
    MusicStart,
    /// Pause both music tracks and start the video.
    VideoStart,
    PreviewEnded,
    CardRevealed { pos: usize },
    PairMatched { first: usize, second: usize },
    PairMissed { first: usize, second: usize },
    PairHidden,
    MemoryWon,
    PieceSelected(PieceId),
    PiecePlaced,
    PuzzleWon,
    CandleBlown { candle: usize },
    AllCandlesOut,
    TextRevealed(usize),
    ConfettiLaunched { count: usize },
    ConfettiCleared,
}
