/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. Batch everything with `queue!`, flush once
///   5. Swap front/back
///
/// The map is drawn from a `FrameView` and the static `Board`; the
/// renderer never touches simulation state.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::geom::GridCell;
use crate::domain::physics::Board;
use crate::domain::tile::Tile;
use crate::sim::view::FrameView;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit background for every cell, so row gaps match on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 30 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never produced by compose; forces a full repaint when written to `back`.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
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

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Layout ──

/// Each grid cell is two terminal columns wide.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const TEXT_ROW: usize = 1;
const MAP_ROW: usize = 3;
const MAP_COL: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 24, g: 40, b: 70 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 60 };
const ACCENT: Color = Color::Rgb { r: 120, g: 220, b: 255 };

// ── Map glyphs ──

const FLOOR_FG: Color = Color::Rgb { r: 60, g: 60, b: 80 };
const WALL_BG: Color = Color::Rgb { r: 90, g: 90, b: 110 };
const CRATE_FG: Color = Color::Rgb { r: 210, g: 150, b: 80 };
const SWITCH_OFF: Color = Color::Rgb { r: 200, g: 70, b: 70 };
const SWITCH_ON: Color = Color::Rgb { r: 80, g: 230, b: 110 };
const DOOR_CLOSED: Color = Color::Rgb { r: 150, g: 90, b: 40 };
const DOOR_OPEN: Color = Color::Rgb { r: 40, g: 120, b: 60 };
const PLAYER_FG: Color = Color::Rgb { r: 255, g: 230, b: 80 };

/// Echo colour fades towards the floor as playback nears its end.
fn echo_color(remaining_ms: f64, window_ms: f64) -> Color {
    let f = (remaining_ms / window_ms.max(1.0)).clamp(0.0, 1.0) as f32;
    let lerp = |lo: f32, hi: f32| (lo + (hi - lo) * f) as u8;
    Color::Rgb { r: lerp(60.0, 90.0), g: lerp(90.0, 200.0), b: lerp(110.0, 255.0) }
}

/// Draw the level at terminal (x0, y0). Layers, bottom to top:
/// terrain, switches, door, crates, echoes, player.
fn draw_map(buf: &mut FrameBuffer, x0: usize, y0: usize, board: &Board, view: &FrameView, window_ms: f64) {
    let mut put = |cell: GridCell, glyph: [char; 2], fg: Color, bg: Color| {
        if cell.col < 0 || cell.row < 0 { return; }
        let x = x0 + cell.col as usize * CELL_W;
        let y = y0 + cell.row as usize;
        buf.set(x, y, Cell::new(glyph[0], fg, bg));
        buf.set(x + 1, y, Cell::new(glyph[1], fg, bg));
    };

    for row in 0..board.height {
        for col in 0..board.width {
            let cell = GridCell::new(col as i32, row as i32);
            match board.terrain_at(cell) {
                Tile::Wall => put(cell, [' ', ' '], Color::White, WALL_BG),
                Tile::Floor => put(cell, ['·', ' '], FLOOR_FG, Color::Reset),
            }
        }
    }

    for s in &view.switches {
        let fg = if s.active { SWITCH_ON } else { SWITCH_OFF };
        put(s.cell, ['(', ')'], fg, Color::Reset);
    }

    if view.door_open {
        put(view.door, ['>', '>'], Color::White, DOOR_OPEN);
    } else {
        put(view.door, ['#', '#'], Color::Black, DOOR_CLOSED);
    }

    for &c in &view.crates {
        let bg = match view.switch_at(c) {
            Some(s) if s.active => Color::Rgb { r: 30, g: 70, b: 40 },
            _ => Color::Reset,
        };
        put(c, ['[', ']'], CRATE_FG, bg);
    }

    for e in &view.echoes {
        put(e.cell, ['%', '%'], echo_color(e.remaining_ms, window_ms), Color::Reset);
    }

    put(view.player_cell, ['@', '@'], PLAYER_FG, Color::Reset);
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    key_release: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            key_release: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        // Release events make held movement keys stop on key-up.
        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.key_release = true;
        }

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    /// True once the terminal reports key releases.
    pub fn reports_key_release(&self) -> bool {
        self.key_release
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.front.clear();
        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Playing => self.compose_game(world),
            Phase::GameComplete => self.compose_game_complete(world),
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose ──

    fn compose_game(&mut self, w: &WorldState) {
        let view = w.view();

        self.front.fill_row(HUD_ROW, HUD_BG);
        let door = if view.door_open { "OPEN" } else { "shut" };
        let hud = format!(
            " Level {}/{}  {}   Switches {}/{}  Door {}  Echoes {}  Rec {}",
            w.current_level + 1, w.total_levels, w.level_name,
            view.active_switches(), view.switches.len(), door,
            view.echoes.len(), view.recorded_samples,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
        self.front.put_str(1, TEXT_ROW, &w.level_text, Color::Grey, Color::Reset);

        draw_map(&mut self.front, MAP_COL, MAP_ROW, &w.board, &view, w.tuning.record_window_ms);

        let msg_row = MAP_ROW + w.board.height + 1;
        if !w.message.is_empty() && msg_row < self.front.height {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(1, msg_row, &w.message, Color::Black, MSG_BG);
        }

        let help_row = msg_row + 2;
        if help_row < self.front.height {
            let help = " Arrows/WASD move  E/Space echo  R restart  Enter next (when solved)  Esc quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_title(&mut self, w: &WorldState) {
        let title = [
            r"  ___      _         _____         _ _ ",
            r" | __|__ _| |_  ___ |_   _| _ __ _(_) |",
            r" | _|/ _| ' \ \/ _ \  | || '_/ _` | | |",
            r" |___\__|_||_|_\___/  |_||_| \__,_|_|_|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, ACCENT, Color::Reset);
        }

        self.front.put_str(4, 7, "Your last three seconds walk again.", Color::Grey, Color::Reset);

        let menu = 10;
        self.front.put_str(6, menu, "ENTER   Start", SWITCH_ON, Color::Reset);
        self.front.put_str(6, menu + 1, "  Q     Quit", Color::White, Color::Reset);
        let info = format!("{} levels loaded", w.total_levels);
        self.front.put_str(6, menu + 3, &info, Color::DarkGrey, Color::Reset);

        let help = [
            "Controls",
            "  Arrows / WASD   Move",
            "  E / Space       Spawn echo of your last 3s",
            "  R               Restart level",
            "  Enter           Next level once solved",
            "  Esc / Q         Quit",
        ];
        for (i, line) in help.iter().enumerate() {
            let color = if i == 0 { PLAYER_FG } else { Color::White };
            self.front.put_str(6, menu + 5 + i, line, color, Color::Reset);
        }
    }

    fn compose_game_complete(&mut self, w: &WorldState) {
        self.front.put_str(4, 4, "*  All levels complete!  *", PLAYER_FG, Color::Reset);
        let levels = format!("{} levels solved.", w.total_levels);
        self.front.put_str(6, 6, &levels, SWITCH_ON, Color::Reset);
        self.front.put_str(6, 8, "ENTER / ESC: back to title", Color::DarkGrey, Color::Reset);
    }
}
