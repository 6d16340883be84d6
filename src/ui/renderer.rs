/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws. A screen
/// change (menu → play field, etc.) invalidates the back buffer for one
/// full repaint.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::tile::Tile;
use crate::sim::creator::{Brush, LevelDraft};
use crate::sim::level::{LevelState, Status, TRAIL_LIFETIME_MS};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, used for
    /// both Clear and cell backgrounds so inter-row gap pixels match.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 28 };

    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::White,
        bg: Cell::BASE_BG,
    };

    /// Sentinel used to invalidate the back buffer: differs from any real
    /// cell, so every position gets re-emitted on the next diff.
    const INVALID: Cell = Cell {
        ch: '?',
        fg: Color::Magenta,
        bg: Color::Magenta,
    };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
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
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
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
        let mut cx = x;
        for ch in s.chars() {
            if cx >= self.width {
                break;
            }
            self.set(cx, y, Cell::new(ch, fg, bg));
            cx += 1;
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Renderer ──

/// Each grid cell = 2 terminal columns, so cells render roughly square.
const CELL_W: usize = 2;
/// First terminal row of the play field / editor grid.
const MAP_ROW: usize = 2;
const HUD_ROW: usize = 0;

/// Window height of the level browser list.
pub const MAX_VISIBLE_LEVELS: usize = 10;

const HUD_BG: Color = Color::Rgb { r: 20, g: 24, b: 58 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Screen {
    Menu,
    LevelSelect,
    Playing,
    CreatorDims,
    CreatorEdit,
    CreatorName,
}

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
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
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Start a frame: pick up terminal resizes and screen changes, both of
    /// which force a full repaint.
    fn begin(&mut self, screen: Screen) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let resized = tw as usize != self.term_w || th as usize != self.term_h;
        if resized {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
        }
        if resized || self.last_screen != Some(screen) {
            self.back.cells.fill(Cell::INVALID);
            queue!(
                self.writer,
                SetBackgroundColor(Cell::BASE_BG),
                Clear(ClearType::All)
            )?;
            self.last_screen = Some(screen);
        }
        self.front.clear();
        Ok(())
    }

    /// Diff against the previous frame, emit only changed cells, swap.
    fn finish(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;

        queue!(
            self.writer,
            SetForegroundColor(last_fg),
            SetBackgroundColor(last_bg),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }
                if need_move {
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
                queue!(self.writer, Print(cell.ch))?;
            }
            need_move = true;
        }

        self.writer.flush()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn centered_x(&self, text: &str) -> usize {
        self.term_w.saturating_sub(text.chars().count()) / 2
    }

    /// Two-column game cell at grid (gx, gy), origin (ox, oy) in terminal
    /// columns/rows.
    fn put_grid_cell(&mut self, ox: usize, oy: usize, gx: usize, gy: usize, ch: char, fg: Color, bg: Color) {
        let col = ox + gx * CELL_W;
        let row = oy + gy;
        self.front.set(col, row, Cell::new(ch, fg, bg));
        self.front.set(col + 1, row, Cell::new(ch, fg, bg));
    }

    fn tile_visual(tile: Tile) -> (char, Color, Color) {
        match tile {
            Tile::Wall => (
                '█',
                Color::Rgb { r: 130, g: 130, b: 145 },
                Color::Rgb { r: 72, g: 72, b: 84 },
            ),
            Tile::Empty => (' ', Color::White, Cell::BASE_BG),
            Tile::Start => (
                '░',
                Color::Rgb { r: 90, g: 220, b: 120 },
                Cell::BASE_BG,
            ),
            Tile::Finish => (
                '▓',
                Color::Rgb { r: 250, g: 210, b: 60 },
                Color::Rgb { r: 80, g: 64, b: 10 },
            ),
            Tile::Trap => (
                '×',
                Color::Rgb { r: 240, g: 80, b: 80 },
                Color::Rgb { r: 60, g: 14, b: 14 },
            ),
        }
    }

    fn message_rows(&mut self, message: &str, help: &str) {
        if !message.is_empty() {
            let row = self.term_h.saturating_sub(3);
            self.front.fill_row(row, MSG_BG);
            self.front
                .put_str(1, row, &format!("◈ {message}"), Color::Black, MSG_BG);
        }
        let row = self.term_h.saturating_sub(1);
        self.front.put_str(1, row, help, Color::DarkGrey, Cell::BASE_BG);
    }

    // ── Main menu ──

    pub fn draw_menu(&mut self, items: &[&str], selected: usize, message: &str) -> io::Result<()> {
        self.begin(Screen::Menu)?;

        let title = "S  K  I  D";
        let tx = self.centered_x(title);
        self.front.put_str(
            tx,
            2,
            title,
            Color::Rgb { r: 120, g: 210, b: 255 },
            Cell::BASE_BG,
        );
        let sub = "a sliding-block puzzle";
        let sx = self.centered_x(sub);
        self.front.put_str(sx, 4, sub, Color::DarkGrey, Cell::BASE_BG);

        for (i, item) in items.iter().enumerate() {
            let row = 7 + i * 2;
            let text = if i == selected {
                format!("▸ {item} ◂")
            } else {
                item.to_string()
            };
            let x = self.centered_x(&text);
            let (fg, bg) = if i == selected {
                (Color::Black, Color::Rgb { r: 120, g: 210, b: 255 })
            } else {
                (Color::White, Cell::BASE_BG)
            };
            self.front.put_str(x, row, &text, fg, bg);
        }

        self.message_rows(message, "↑/↓: choose   Enter: confirm   Esc: quit");
        self.finish()
    }

    // ── Level browser ──

    pub fn draw_level_select(
        &mut self,
        files: &[String],
        cursor: usize,
        scroll: usize,
        message: &str,
    ) -> io::Result<()> {
        self.begin(Screen::LevelSelect)?;

        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(1, HUD_ROW, "SELECT LEVEL", Color::White, HUD_BG);

        if files.is_empty() {
            let note = "no level files found — Enter plays the built-in level";
            let x = self.centered_x(note);
            self.front.put_str(x, MAP_ROW + 2, note, Color::DarkGrey, Cell::BASE_BG);
        } else {
            if scroll > 0 {
                self.front.put_str(2, MAP_ROW, "▲ more", Color::DarkGrey, Cell::BASE_BG);
            }
            for (slot, idx) in (scroll..files.len().min(scroll + MAX_VISIBLE_LEVELS)).enumerate() {
                let row = MAP_ROW + 1 + slot;
                let name = files[idx].trim_end_matches(".bin");
                let text = format!("{:>3}. {name}", idx + 1);
                let (fg, bg) = if idx == cursor {
                    (Color::Black, Color::Rgb { r: 120, g: 210, b: 255 })
                } else {
                    (Color::White, Cell::BASE_BG)
                };
                self.front.put_str(4, row, &text, fg, bg);
            }
            if scroll + MAX_VISIBLE_LEVELS < files.len() {
                self.front.put_str(
                    2,
                    MAP_ROW + 1 + MAX_VISIBLE_LEVELS,
                    "▼ more",
                    Color::DarkGrey,
                    Cell::BASE_BG,
                );
            }
        }

        self.message_rows(message, "↑/↓: choose   Enter: play   Esc: back");
        self.finish()
    }

    // ── Play field ──

    pub fn draw_playing(
        &mut self,
        level: &LevelState,
        level_name: &str,
        now_ms: u64,
        message: &str,
    ) -> io::Result<()> {
        self.begin(Screen::Playing)?;

        let status_text = match level.status() {
            Status::InProgress => String::new(),
            Status::Finished => "LEVEL CLEARED!".to_string(),
            Status::Failed => "TRAPPED!".to_string(),
        };
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(
            1,
            HUD_ROW,
            &format!("{level_name}  {status_text}"),
            Color::White,
            HUD_BG,
        );

        let w = level.width() as usize;
        let h = level.height() as usize;
        let ox = self.term_w.saturating_sub(w * CELL_W) / 2;
        let oy = MAP_ROW;

        // Tiles
        for gy in 0..h {
            for gx in 0..w {
                let (ch, fg, bg) = Self::tile_visual(level.tile_at(gx as i32, gy as i32));
                self.put_grid_cell(ox, oy, gx, gy, ch, fg, bg);
            }
        }

        // Trail, faded by age
        for p in level.trail() {
            let age = now_ms.saturating_sub(p.born_ms);
            if age > TRAIL_LIFETIME_MS {
                continue;
            }
            let keep = 1.0 - age as f32 / TRAIL_LIFETIME_MS as f32;
            let fg = Color::Rgb {
                r: (40.0 + 60.0 * keep) as u8,
                g: (80.0 + 120.0 * keep) as u8,
                b: (110.0 + 140.0 * keep) as u8,
            };
            self.put_grid_cell(ox, oy, p.x as usize, p.y as usize, '·', fg, Cell::BASE_BG);
        }

        // Win/lose flood fill, growing from the final player cell
        if level.status() != Status::InProgress {
            let radius = level.animation_radius() as i64;
            let (px, py) = level.player();
            let (ch, fg, bg) = if level.is_finished() {
                (
                    '▒',
                    Color::Rgb { r: 110, g: 230, b: 130 },
                    Color::Rgb { r: 18, g: 70, b: 28 },
                )
            } else {
                (
                    '▒',
                    Color::Rgb { r: 230, g: 90, b: 80 },
                    Color::Rgb { r: 70, g: 16, b: 14 },
                )
            };
            for gy in 0..h {
                for gx in 0..w {
                    let dx = gx as i64 - px as i64;
                    let dy = gy as i64 - py as i64;
                    if dx * dx + dy * dy <= radius * radius {
                        self.put_grid_cell(ox, oy, gx, gy, ch, fg, bg);
                    }
                }
            }
        }

        // Player on top
        let (px, py) = level.player();
        self.put_grid_cell(
            ox,
            oy,
            px as usize,
            py as usize,
            '█',
            Color::Rgb { r: 120, g: 210, b: 255 },
            Cell::BASE_BG,
        );

        let help = match level.status() {
            Status::InProgress => "↑/↓/←/→ or WASD: slide   R: restart   Esc: menu",
            _ => "R: restart   Esc: menu",
        };
        self.message_rows(message, help);
        self.finish()
    }

    // ── Creator: dimension input ──

    pub fn draw_creator_dims(&mut self, input: &str, message: &str) -> io::Result<()> {
        self.begin(Screen::CreatorDims)?;

        let title = "CREATE NEW LEVEL";
        let tx = self.centered_x(title);
        self.front.put_str(tx, 2, title, Color::White, Cell::BASE_BG);

        let prompt = "Enter the level dimensions as WIDTH*HEIGHT:";
        let px = self.centered_x(prompt);
        self.front.put_str(px, 5, prompt, Color::White, Cell::BASE_BG);

        let field = format!(" {input}█ ");
        let fx = self.centered_x(&field);
        self.front.put_str(
            fx,
            7,
            &field,
            Color::White,
            Color::Rgb { r: 40, g: 40, b: 52 },
        );

        let hint1 = "Edges from 6 to 60 cells";
        let hint2 = "Proportions from 1:2 to 2:1";
        let h1x = self.centered_x(hint1);
        let h2x = self.centered_x(hint2);
        let hint_fg = Color::Rgb { r: 200, g: 200, b: 120 };
        self.front.put_str(h1x, 10, hint1, hint_fg, Cell::BASE_BG);
        self.front.put_str(h2x, 11, hint2, hint_fg, Cell::BASE_BG);

        self.message_rows(message, "Enter: continue   Esc: cancel");
        self.finish()
    }

    // ── Creator: grid editing ──

    pub fn draw_creator_edit(
        &mut self,
        draft: &LevelDraft,
        cursor: (usize, usize),
        message: &str,
    ) -> io::Result<()> {
        self.begin(Screen::CreatorEdit)?;

        self.front.fill_row(HUD_ROW, HUD_BG);
        let brushes = [Brush::Wall, Brush::Trap, Brush::Start, Brush::Finish, Brush::Eraser];
        let mut col = 1;
        for (i, brush) in brushes.iter().enumerate() {
            let text = format!(" {}:{} ", i + 1, brush.label());
            let (fg, bg) = if *brush == draft.brush() {
                (Color::Black, Color::Rgb { r: 120, g: 210, b: 255 })
            } else {
                (Color::White, HUD_BG)
            };
            self.front.put_str(col, HUD_ROW, &text, fg, bg);
            col += text.chars().count();
        }

        let ox = self.term_w.saturating_sub(draft.width() * CELL_W) / 2;
        let oy = MAP_ROW;
        for gy in 0..draft.height() {
            for gx in 0..draft.width() {
                let (ch, fg, bg) = Self::tile_visual(draft.tile_at(gx, gy));
                if (gx, gy) == cursor {
                    self.put_grid_cell(ox, oy, gx, gy, ch, Color::Black, Color::Rgb {
                        r: 250,
                        g: 250,
                        b: 160,
                    });
                } else {
                    self.put_grid_cell(ox, oy, gx, gy, ch, fg, bg);
                }
            }
        }

        self.message_rows(
            message,
            "Arrows: cursor   Space: paint   1-5: brush   Enter: save   Esc: cancel",
        );
        self.finish()
    }

    // ── Creator: file name input ──

    pub fn draw_creator_name(&mut self, input: &str, message: &str) -> io::Result<()> {
        self.begin(Screen::CreatorName)?;

        let prompt = "Level file name (without extension):";
        let px = self.centered_x(prompt);
        self.front.put_str(px, 5, prompt, Color::White, Cell::BASE_BG);

        let field = format!(" {input}█ ");
        let fx = self.centered_x(&field);
        self.front.put_str(
            fx,
            7,
            &field,
            Color::White,
            Color::Rgb { r: 40, g: 40, b: 52 },
        );

        self.message_rows(message, "Enter: save   Esc: back to editing");
        self.finish()
    }
}
