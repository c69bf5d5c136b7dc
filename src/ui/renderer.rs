/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// While composing, every clickable element registers its screen rect in
/// the hit map, so a mouse press resolves against exactly what was drawn.
///
/// Screen layout:
///
///   row 0        HUD: title and stage progress
///   row 1        rule
///   rows 2..h-1  stage body (the scrollable page from Journey on)
///   row h-1      message bar

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::confetti::{Canvas, Rgb};
use crate::domain::memory::Face;
use crate::domain::puzzle::{Location, PieceId};
use crate::sim::event::Target;
use crate::sim::sequencer::{Sequencer, SMOKE_MS};
use crate::sim::stage::GameStage;
use super::hitmap::{HitMap, Rect};

// ── Palette ──

const BASE_BG: Color = Color::Rgb { r: 22, g: 18, b: 32 };
const GOLD: Color = Color::Rgb { r: 212, g: 175, b: 55 };
const CREAM: Color = Color::Rgb { r: 253, g: 251, b: 247 };
const DIM: Color = Color::Rgb { r: 110, g: 100, b: 130 };
const ROSE: Color = Color::Rgb { r: 240, g: 140, b: 170 };
const MINT: Color = Color::Rgb { r: 110, g: 220, b: 150 };
const FLAME: Color = Color::Rgb { r: 255, g: 170, b: 40 };
const FLAME_HOT: Color = Color::Rgb { r: 255, g: 230, b: 90 };
const SPONGE: Color = Color::Rgb { r: 150, g: 95, b: 60 };
const BAR_BG: Color = Color::Rgb { r: 45, g: 32, b: 64 };
const SELECT_BG: Color = Color::Rgb { r: 90, g: 75, b: 20 };

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 4],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool, // occupies 2 terminal columns
    cont: bool, // right half of a wide char (never printed)
}

impl Cell {
    const BLANK: Cell = Cell {
        ch: [b' ', 0, 0, 0],
        ch_len: 1,
        fg: Color::White,
        bg: BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 4],
        ch_len: 0,
        fg: Color::White,
        bg: BASE_BG,
        wide: false,
        cont: true,
    };

    /// Never equal to a real cell: filling `back` with it forces a repaint.
    const INVALID: Cell = Cell {
        ch: [b'?', 0, 0, 0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    fn new(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = bg;
        cell.wide = char_width(c) == 2;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or(" ")
    }
}

/// Terminal columns a char occupies. Zero-width joiners and variation
/// selectors are dropped; emoji and CJK take two columns.
fn char_width(c: char) -> usize {
    match c as u32 {
        0x200D | 0xFE00..=0xFE0F => 0,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFF00..=0xFF60
        | 0x1F000..=0x1FAFF
        | 0x2728 | 0x2B50 | 0x2705 | 0x274C | 0x2615 => 2,
        _ => 1,
    }
}

fn text_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Greedy word wrap by display width. Words wider than `width` get a line
/// to themselves.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let needed = if line.is_empty() {
            text_width(word)
        } else {
            text_width(&line) + 1 + text_width(word)
        };
        if needed > width && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn rgb(c: Rgb) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write text at (x, y), honouring wide chars. Returns the column after
    /// the last char written.
    fn put_text(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) -> usize {
        let mut cx = x;
        for ch in s.chars() {
            let w = char_width(ch);
            if w == 0 {
                continue;
            }
            if cx + w > self.width {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            if w == 2 {
                let mut cont = Cell::WIDE_CONT;
                cont.bg = bg;
                self.set(cx + 1, y, cont);
            }
            cx += w;
        }
        cx
    }

    fn put_centered(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        let x = self.width.saturating_sub(text_width(s)) / 2;
        self.put_text(x, y, s, fg, bg);
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, ch: char, fg: Color, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::new(ch, fg, bg));
            }
        }
    }

    fn draw_box(&mut self, x: usize, y: usize, w: usize, h: usize, fg: Color, bg: Color) {
        if w < 2 || h < 2 {
            return;
        }
        self.fill_rect(x + 1, y + 1, w - 2, h - 2, ' ', fg, bg);
        for xx in x + 1..x + w - 1 {
            self.set(xx, y, Cell::new('─', fg, bg));
            self.set(xx, y + h - 1, Cell::new('─', fg, bg));
        }
        for yy in y + 1..y + h - 1 {
            self.set(x, yy, Cell::new('│', fg, bg));
            self.set(x + w - 1, yy, Cell::new('│', fg, bg));
        }
        self.set(x, y, Cell::new('┌', fg, bg));
        self.set(x + w - 1, y, Cell::new('┐', fg, bg));
        self.set(x, y + h - 1, Cell::new('└', fg, bg));
        self.set(x + w - 1, y + h - 1, Cell::new('┘', fg, bg));
    }
}

// ── Surface geometry ──

const HUD_ROW: usize = 0;
const BODY_ROW: usize = 2;
/// Rows outside the body: HUD, rule, message bar.
const CHROME_ROWS: usize = 3;

/// Confetti pixels per terminal cell. Cells are roughly twice as tall as wide.
const PX_PER_COL: f32 = 8.0;
const PX_PER_ROW: f32 = 16.0;

/// Confetti canvas and page viewport rows for a terminal of this size.
pub fn surface(cols: u16, rows: u16) -> (Canvas, u32) {
    let canvas = Canvas {
        width: cols as f32 * PX_PER_COL,
        height: rows as f32 * PX_PER_ROW,
    };
    let page_rows = (rows as usize).saturating_sub(CHROME_ROWS).max(1) as u32;
    (canvas, page_rows)
}

// Memory cards
const CARD_W: usize = 8;
const CARD_H: usize = 3;
const CARD_GAP_X: usize = 2;
const CARD_GAP_Y: usize = 1;

// Puzzle: a piece sits inside its slot's frame
const SLOT_W: usize = 12;
const SLOT_H: usize = 5;
const PIECE_W: usize = SLOT_W - 2;
const PIECE_H: usize = SLOT_H - 2;
const BANK_GAP: usize = 4;

const CANDLE_SPACING: usize = 6;

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<GameStage>,
    hits: HitMap,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
            hits: HitMap::new(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn size(&self) -> (u16, u16) {
        (self.term_w as u16, self.term_h as u16)
    }

    /// Target under a screen cell, as of the last rendered frame.
    pub fn hit(&self, col: u16, row: u16) -> Option<Target> {
        self.hits.hit(col as usize, row as usize)
    }

    pub fn render(&mut self, seq: &Sequencer) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
        }

        // Page stages share one screen; only clear when the screen changes.
        let stage = seq.stage();
        let screen = if stage.on_page() { GameStage::Journey } else { stage };
        if self.last_screen != Some(screen) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(screen);
        }

        self.front.clear();
        self.hits.clear();
        self.compose(seq);

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn compose(&mut self, seq: &Sequencer) {
        self.compose_hud(seq);
        match seq.stage() {
            GameStage::Welcome => self.compose_welcome(seq),
            GameStage::MemoryGame => self.compose_memory(seq),
            GameStage::Puzzle => self.compose_puzzle(seq),
            GameStage::Candles => self.compose_candles(seq),
            GameStage::Journey | GameStage::Video | GameStage::Closing => self.compose_page(seq),
        }
        self.compose_confetti(seq);
        self.compose_message_bar(seq);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default background.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(BASE_BG))?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: chrome ──

    fn compose_hud(&mut self, seq: &Sequencer) {
        let cfg = seq.config();
        self.front.fill_row(HUD_ROW, BAR_BG);
        let title = format!(" 🎂 {} ", cfg.general.title);
        self.front.put_text(0, HUD_ROW, &title, GOLD, BAR_BG);

        let status = match seq.stage() {
            GameStage::Welcome => String::new(),
            GameStage::MemoryGame => match seq.memory() {
                Some(m) if m.is_won() => "Memory · all pairs found ".to_string(),
                Some(m) => format!("Memory · pairs {}/{} ", m.matched_pairs(), m.pairs()),
                None => String::new(),
            },
            GameStage::Puzzle => match seq.puzzle() {
                Some(p) => {
                    let placed = (0..p.piece_count()).filter(|&s| p.slot_filled(s)).count();
                    format!("Puzzle · placed {}/{} ", placed, p.piece_count())
                }
                None => String::new(),
            },
            GameStage::Candles => match seq.cake() {
                Some(c) if c.all_out() => "Candles · make a wish ".to_string(),
                Some(c) => format!("Candles · {}/{} out ", c.blown(), c.candle_count()),
                None => String::new(),
            },
            stage => {
                let max = seq.layout().max_scroll().max(1);
                let pct = seq.scroll() * 100 / max;
                match seq.journey() {
                    Some(j) => {
                        let shown = (0..j.text_count()).filter(|&k| j.is_revealed(k)).count();
                        format!("{} · {}/{} memories · {}% ", stage.title(), shown, j.text_count(), pct)
                    }
                    None => format!("{} · {}% ", stage.title(), pct),
                }
            }
        };
        let sx = self.front.width.saturating_sub(text_width(&status));
        self.front.put_text(sx, HUD_ROW, &status, CREAM, BAR_BG);

        for x in 0..self.front.width {
            self.front.set(x, HUD_ROW + 1, Cell::new('─', DIM, BASE_BG));
        }
    }

    fn compose_message_bar(&mut self, seq: &Sequencer) {
        let row = match self.front.height.checked_sub(1) {
            Some(r) if r > BODY_ROW => r,
            _ => return,
        };
        if let Some(msg) = seq.message() {
            self.front.fill_row(row, GOLD);
            self.front.put_text(0, row, &format!(" ◈ {msg} "), Color::Black, GOLD);
            return;
        }
        let help = match seq.stage() {
            GameStage::Welcome => "Click Start or press Enter · Esc quits",
            GameStage::MemoryGame => "Click two cards to find a pair",
            GameStage::Puzzle => "Click a piece, then a board slot · click two pieces to swap them",
            GameStage::Candles => "Click the flames to blow them out",
            _ => "Scroll: wheel, ↑↓, PgUp/PgDn, Home/End · Esc quits",
        };
        self.front.fill_row(row, BASE_BG);
        self.front.put_text(1, row, help, DIM, BASE_BG);
    }

    fn compose_confetti(&mut self, seq: &Sequencer) {
        let confetti = seq.confetti();
        if !confetti.is_active() {
            return;
        }
        // Keep the message bar readable.
        let max_row = self.front.height.saturating_sub(1);
        for p in confetti.particles() {
            if p.x < 0.0 || p.y < 0.0 {
                continue;
            }
            let col = (p.x / PX_PER_COL) as usize;
            let row = (p.y / PX_PER_ROW) as usize;
            if row >= max_row || col >= self.front.width {
                continue;
            }
            let under = self.front.get(col, row);
            if under.wide || under.cont {
                continue;
            }
            let glyph = if p.radius < 8.0 {
                '·'
            } else if p.radius < 12.0 {
                '•'
            } else {
                '●'
            };
            self.front.set(col, row, Cell::new(glyph, rgb(p.color), under.bg));
        }
    }

    // ── Compose: stages ──

    fn compose_welcome(&mut self, seq: &Sequencer) {
        let cfg = seq.config();
        let w = self.front.width;
        let top = BODY_ROW + 2;

        let heading = format!("✦  {}  ✦", cfg.general.title);
        let box_w = (text_width(&heading) + 8).min(w);
        let bx = w.saturating_sub(box_w) / 2;
        self.front.draw_box(bx, top, box_w, 3, GOLD, BASE_BG);
        self.front.put_centered(top + 1, &heading, GOLD, BASE_BG);

        let dear = format!("for {}", cfg.general.recipient);
        self.front.put_centered(top + 4, &dear, ROSE, BASE_BG);
        self.front.put_centered(top + 6, "🎈   🎁   🎈", CREAM, BASE_BG);

        let label = "Start";
        let btn_w = 13;
        let btn_x = w.saturating_sub(btn_w) / 2;
        let btn_y = top + 8;
        self.front.draw_box(btn_x, btn_y, btn_w, 3, MINT, BAR_BG);
        self.front.put_centered(btn_y + 1, label, CREAM, BAR_BG);
        self.hits.push(Rect::new(btn_x, btn_y, btn_w, 3), Target::StartButton);
    }

    fn compose_memory(&mut self, seq: &Sequencer) {
        let game = match seq.memory() {
            Some(g) => g,
            None => return,
        };
        let n = game.cards().len();
        if n == 0 {
            return;
        }
        let cols = (n as f64).sqrt().ceil() as usize;
        let grid_w = cols * CARD_W + (cols - 1) * CARD_GAP_X;
        let x0 = self.front.width.saturating_sub(grid_w) / 2;
        let y0 = BODY_ROW + 1;

        for (i, card) in game.cards().iter().enumerate() {
            let x = x0 + (i % cols) * (CARD_W + CARD_GAP_X);
            let y = y0 + (i / cols) * (CARD_H + CARD_GAP_Y);
            match card.face {
                Face::Hidden => {
                    self.front.draw_box(x, y, CARD_W, CARD_H, DIM, BAR_BG);
                    self.front.fill_rect(x + 1, y + 1, CARD_W - 2, CARD_H - 2, '░', DIM, BAR_BG);
                }
                Face::Revealed | Face::Matched => {
                    let border = if card.face == Face::Matched { MINT } else { GOLD };
                    self.front.draw_box(x, y, CARD_W, CARD_H, border, BASE_BG);
                    let sx = x + CARD_W.saturating_sub(text_width(&card.symbol)) / 2;
                    self.front.put_text(sx, y + 1, &card.symbol, CREAM, BASE_BG);
                }
            }
            self.hits.push(Rect::new(x, y, CARD_W, CARD_H), Target::Card(i));
        }

        if game.is_previewing() {
            let caption_y = y0 + n.div_ceil(cols) * (CARD_H + CARD_GAP_Y);
            self.front.put_centered(caption_y, "Memorise the cards...", DIM, BASE_BG);
        }
    }

    fn compose_puzzle(&mut self, seq: &Sequencer) {
        let board = match seq.puzzle() {
            Some(b) => b,
            None => return,
        };
        let g = board.grid();
        let n = board.piece_count();
        let grid_w = g * SLOT_W;
        let x0 = self.front.width.saturating_sub(grid_w * 2 + BANK_GAP) / 2;
        let bank_x = x0 + grid_w + BANK_GAP;
        let label_y = BODY_ROW;
        let y0 = label_y + 1;

        self.front.put_text(x0, label_y, "Board", GOLD, BASE_BG);
        let left = board.bank_pieces().len();
        let bank_label = if board.is_solved() {
            "Solved!".to_string()
        } else {
            format!("Pieces ({left} left)")
        };
        self.front.put_text(bank_x, label_y, &bank_label, GOLD, BASE_BG);

        let slot_origin = |s: usize| (x0 + (s % g) * SLOT_W, y0 + (s / g) * SLOT_H);
        let bank_origin = |b: usize| (bank_x + (b % g) * SLOT_W, y0 + (b / g) * SLOT_H);

        // Slots first: pieces drawn later sit above them in the hit map.
        for s in 0..n {
            let (x, y) = slot_origin(s);
            let border = if board.slot_filled(s) { MINT } else { DIM };
            self.front.draw_box(x, y, SLOT_W, SLOT_H, border, BASE_BG);
            self.hits.push(Rect::new(x, y, SLOT_W, SLOT_H), Target::Slot(s));
        }

        let pic_w = g * PIECE_W;
        let pic_h = g * PIECE_H;
        for id in 0..n {
            let piece = PieceId(id);
            let (ox, oy) = match board.location(piece) {
                Some(Location::Slot(s)) => slot_origin(s),
                Some(Location::Bank(b)) => bank_origin(b),
                None => continue,
            };
            let (px, py) = (ox + 1, oy + 1);
            let selected = board.selected() == Some(piece);
            if selected {
                self.front.draw_box(ox, oy, SLOT_W, SLOT_H, FLAME_HOT, BASE_BG);
            }
            let src_x = (id % g) * PIECE_W;
            let src_y = (id / g) * PIECE_H;
            for dy in 0..PIECE_H {
                for dx in 0..PIECE_W {
                    let (ch, fg, bg) = picture_cell(src_x + dx, src_y + dy, pic_w, pic_h);
                    let bg = if selected { SELECT_BG } else { bg };
                    self.front.set(px + dx, py + dy, Cell::new(ch, fg, bg));
                }
            }
            self.hits.push(Rect::new(px, py, PIECE_W, PIECE_H), Target::Piece(piece));
        }
    }

    fn compose_candles(&mut self, seq: &Sequencer) {
        let cake = match seq.cake() {
            Some(c) => c,
            None => return,
        };
        let n = cake.candle_count();
        let cake_w = (n * CANDLE_SPACING + 4).max(24);
        let x0 = self.front.width.saturating_sub(cake_w) / 2;
        let top = BODY_ROW + 1;
        let flame_y = top + 3;
        let flicker = (seq.now_ms() / 150) as usize;

        let lead = (cake_w - n * CANDLE_SPACING) / 2;
        for i in 0..n {
            let cx = x0 + lead + i * CANDLE_SPACING + CANDLE_SPACING / 2;
            if cake.is_lit(i) {
                let (glyph, color) = if (flicker + i) % 2 == 0 { ('▲', FLAME) } else { ('♦', FLAME_HOT) };
                self.front.set(cx, flame_y, Cell::new(glyph, color, BASE_BG));
            } else {
                self.front.set(cx, flame_y, Cell::new('╷', DIM, BASE_BG));
                if let Some(age) = seq.smoke_age(i) {
                    let rise = (age * 3 / SMOKE_MS) as usize;
                    let shade = 200u8.saturating_sub((age * 150 / SMOKE_MS) as u8);
                    let smoke = Color::Rgb { r: shade, g: shade, b: shade };
                    let glyph = if rise % 2 == 0 { '~' } else { '°' };
                    self.front.set(cx, flame_y.saturating_sub(rise + 1), Cell::new(glyph, smoke, BASE_BG));
                }
            }
            let stick = if i % 2 == 0 { ROSE } else { CREAM };
            for dy in 1..=3 {
                self.front.set(cx, flame_y + dy, Cell::new('█', stick, BASE_BG));
            }
            self.hits.push(Rect::new(cx.saturating_sub(1), flame_y, 3, 4), Target::Candle(i));
        }

        let body_y = flame_y + 4;
        self.front.fill_rect(x0, body_y, cake_w, 1, '▄', ROSE, BASE_BG);
        self.front.fill_rect(x0, body_y + 1, cake_w, 2, '▒', SPONGE, Color::Rgb { r: 120, g: 72, b: 44 });
        self.front.fill_rect(x0, body_y + 3, cake_w, 1, '═', CREAM, SPONGE);
        self.front.fill_rect(x0, body_y + 4, cake_w, 2, '▒', SPONGE, Color::Rgb { r: 120, g: 72, b: 44 });
        self.front.fill_rect(x0.saturating_sub(2), body_y + 6, cake_w + 4, 1, '▀', DIM, BASE_BG);
    }

    /// Journey, video and closing: one tall page seen through the body rows.
    fn compose_page(&mut self, seq: &Sequencer) {
        let cfg = seq.config();
        let layout = *seq.layout();
        let scroll = seq.scroll();
        let bottom = self.front.height.saturating_sub(1);
        let w = self.front.width;

        // Page row -> screen row, if on screen.
        let to_screen = |page_y: u32| -> Option<usize> {
            let r = page_y.checked_sub(scroll)? as usize;
            let y = BODY_ROW + r;
            (r < layout.viewport as usize && y < bottom).then_some(y)
        };

        // ── Journey path ──
        if let Some(journey) = seq.journey() {
            let sec = layout.journey;
            let center = w / 2;
            let amp = (w / 5).max(2) as f32;
            let period = (layout.viewport as f32 * 1.5).max(4.0);
            let path_x = |py: u32| -> usize {
                let phase = py as f32 / period * std::f32::consts::TAU;
                (center as f32 + amp * phase.sin()).round().max(0.0) as usize
            };
            let drawn = (journey.stroke() * sec.height as f32) as u32;
            let mut prev_x: Option<usize> = None;
            for py in sec.top..sec.top + drawn.min(sec.height) {
                let x = path_x(py);
                if let Some(y) = to_screen(py) {
                    if let Some(px) = prev_x {
                        let (a, b) = if px < x { (px, x) } else { (x, px) };
                        for xx in a..=b {
                            self.front.set(xx, y, Cell::new('•', GOLD, BASE_BG));
                        }
                    }
                    self.front.set(x, y, Cell::new('●', FLAME_HOT, BASE_BG));
                }
                prev_x = Some(x);
            }

            let box_w = (w / 2).saturating_sub(amp as usize + 4).max(12);
            for (k, text) in cfg.journey.texts.iter().enumerate() {
                if !journey.is_revealed(k) {
                    continue;
                }
                let anchor = sec.top + (journey.threshold(k) * sec.height as f32) as u32;
                let lines = wrap(text, box_w.saturating_sub(4));
                let bx = if k % 2 == 0 { 1 } else { w.saturating_sub(box_w + 1) };
                let h = lines.len() as u32 + 2;
                for dy in 0..h {
                    let y = match to_screen(anchor + dy) {
                        Some(y) => y,
                        None => continue,
                    };
                    let (l, m, r) = if dy == 0 {
                        ('╭', '─', '╮')
                    } else if dy == h - 1 {
                        ('╰', '─', '╯')
                    } else {
                        ('│', ' ', '│')
                    };
                    self.front.set(bx, y, Cell::new(l, ROSE, BASE_BG));
                    for xx in bx + 1..bx + box_w - 1 {
                        self.front.set(xx, y, Cell::new(m, ROSE, BASE_BG));
                    }
                    self.front.set(bx + box_w - 1, y, Cell::new(r, ROSE, BASE_BG));
                    if dy > 0 && dy < h - 1 {
                        self.front.put_text(bx + 2, y, &lines[(dy - 1) as usize], CREAM, BASE_BG);
                    }
                }
            }
        }

        // ── Video ──
        let video = layout.video;
        let clip = cfg
            .media
            .video
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let playing = seq.stage() >= GameStage::Video;
        let mid = video.top + video.height / 2;
        let frame_w = (w * 2 / 3).max(20).min(w);
        let fx = w.saturating_sub(frame_w) / 2;
        for py in video.top + 1..video.bottom().saturating_sub(1) {
            if let Some(y) = to_screen(py) {
                let edge = py == video.top + 1 || py + 2 == video.bottom();
                let ch = if edge { '▓' } else { ' ' };
                self.front.fill_rect(fx, y, frame_w, 1, ch, DIM, Color::Rgb { r: 10, g: 10, b: 14 });
            }
        }
        if let Some(y) = to_screen(mid) {
            let label = if playing {
                format!("▶  Playing {clip} in the video player")
            } else {
                "▶  A little film for you".to_string()
            };
            let bg = Color::Rgb { r: 10, g: 10, b: 14 };
            let x = w.saturating_sub(text_width(&label)) / 2;
            self.front.put_text(x, y, &label, if playing { MINT } else { CREAM }, bg);
        }

        // ── Closing ──
        let closing = layout.closing;
        let cy = closing.top + closing.height / 3;
        if let Some(y) = to_screen(cy) {
            let heading = format!("✦  {}, {}!  ✦", cfg.general.title, cfg.general.recipient);
            self.front.put_centered(y, &heading, GOLD, BASE_BG);
        }
        let lines = wrap(&cfg.general.closing_message, (w * 2 / 3).max(10));
        for (i, line) in lines.iter().enumerate() {
            if let Some(y) = to_screen(cy + 2 + i as u32) {
                self.front.put_centered(y, line, CREAM, BASE_BG);
            }
        }
        if let Some(y) = to_screen(cy + 4 + lines.len() as u32) {
            self.front.put_centered(y, "♥", ROSE, BASE_BG);
        }

        // ── Scroll indicator ──
        let rows = (layout.viewport as usize).min(bottom.saturating_sub(BODY_ROW));
        if rows > 0 && w > 0 {
            let max = layout.max_scroll().max(1) as usize;
            let thumb = BODY_ROW + (scroll as usize * (rows - 1)) / max;
            for y in BODY_ROW..BODY_ROW + rows {
                let (ch, fg) = if y == thumb { ('█', GOLD) } else { ('│', BAR_BG) };
                self.front.set(w - 1, y, Cell::new(ch, fg, BASE_BG));
            }
        }
    }
}

/// The picture the puzzle is cut from: a layered cake under a night sky.
/// `w`×`h` is the whole picture; returns glyph, foreground and background.
fn picture_cell(x: usize, y: usize, w: usize, h: usize) -> (char, Color, Color) {
    let u = x as f32 / w.max(1) as f32;
    let v = y as f32 / h.max(1) as f32;
    let sky = Color::Rgb { r: 20 + (u * 50.0) as u8, g: 24, b: 70 - (u * 30.0) as u8 };
    let inside = u > 0.12 && u < 0.88;

    if v >= 0.88 {
        return ('▀', DIM, sky);
    }
    if v < 0.3 {
        if inside && x % 5 == 2 {
            return if v < 0.1 { ('▲', FLAME, sky) } else { ('┃', ROSE, sky) };
        }
        if (x * 7 + y * 13) % 11 == 0 {
            return ('·', CREAM, sky);
        }
        return (' ', CREAM, sky);
    }
    if !inside {
        return (' ', CREAM, sky);
    }
    if v < 0.45 {
        return ('~', CREAM, ROSE);
    }
    if (0.62..0.7).contains(&v) {
        return ('═', CREAM, SPONGE);
    }
    let crumb = Color::Rgb { r: 120, g: 72 + (v * 20.0) as u8, b: 44 };
    ('▒', SPONGE, crumb)
}
