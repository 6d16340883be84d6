/// Level authoring: dimension parsing, brush painting, validation, save.
///
/// The creator is a constrained writer for the same grid model the level
/// state machine reads. Its invariants:
///   - the one-cell wall border is immutable
///   - at most one start and one finish exist at any time
///   - a level needs both before it can be saved
///
/// The saved player position is the start cell's coordinates, so the file
/// a draft writes is directly playable.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::tile::Tile;
use crate::sim::levelfile;

pub const MIN_SIZE: usize = 6;
pub const MAX_SIZE: usize = 60;
/// Width:height may not exceed 2:1 in either orientation.
pub const MAX_RATIO: f32 = 2.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Brush {
    Wall,
    Trap,
    Start,
    Finish,
    Eraser,
}

impl Brush {
    /// The tile this brush paints.
    pub fn tile(self) -> Tile {
        match self {
            Brush::Wall => Tile::Wall,
            Brush::Trap => Tile::Trap,
            Brush::Start => Tile::Start,
            Brush::Finish => Tile::Finish,
            Brush::Eraser => Tile::Empty,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Brush::Wall => "Wall",
            Brush::Trap => "Trap",
            Brush::Start => "Start",
            Brush::Finish => "Finish",
            Brush::Eraser => "Eraser",
        }
    }
}

#[derive(Debug, Error)]
pub enum CreatorError {
    #[error("level must have a start position")]
    MissingStart,
    #[error("level must have a finish position")]
    MissingFinish,
    #[error("could not write level file: {0}")]
    Io(#[from] std::io::Error),
}

// ── Dimension input ──

/// Parse a "<width>*<height>" dimension string: decimal digits joined by
/// a single '*', nothing else. Returns None for malformed input or
/// out-of-range dimensions.
pub fn parse_dimensions(input: &str) -> Option<(usize, usize)> {
    let (w, h) = input.split_once('*')?;
    if w.is_empty() || h.is_empty() {
        return None;
    }
    if !w.bytes().all(|b| b.is_ascii_digit()) || !h.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let width: usize = w.parse().ok()?;
    let height: usize = h.parse().ok()?;
    valid_dimensions(width, height).then_some((width, height))
}

/// 6..=60 on both edges, aspect ratio within [1/2, 2/1] inclusive.
pub fn valid_dimensions(width: usize, height: usize) -> bool {
    if width < MIN_SIZE || width > MAX_SIZE || height < MIN_SIZE || height > MAX_SIZE {
        return false;
    }
    let ratio = width as f32 / height as f32;
    ratio >= 1.0 / MAX_RATIO && ratio <= MAX_RATIO
}

// ── Draft grid ──

pub struct LevelDraft {
    width: usize,
    height: usize,
    tiles: Vec<Vec<Tile>>,
    brush: Brush,
    has_start: bool,
    has_finish: bool,
}

impl LevelDraft {
    /// Empty interior with a wall border.
    pub fn new(width: usize, height: usize) -> Self {
        let mut tiles = vec![vec![Tile::Empty; width]; height];
        for (y, row) in tiles.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                    *cell = Tile::Wall;
                }
            }
        }
        LevelDraft {
            width,
            height,
            tiles,
            brush: Brush::Wall,
            has_start: false,
            has_finish: false,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn brush(&self) -> Brush {
        self.brush
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    pub fn tile_at(&self, x: usize, y: usize) -> Tile {
        if x < self.width && y < self.height {
            self.tiles[y][x]
        } else {
            Tile::Wall
        }
    }

    /// Apply the current brush at (x, y). Border edits are silently
    /// ignored. Painting a second start/finish clears the first, so the
    /// at-most-one invariant holds after every stroke.
    pub fn paint(&mut self, x: usize, y: usize) {
        if x == 0 || y == 0 || x + 1 >= self.width || y + 1 >= self.height {
            return;
        }

        // Whatever the brush, overwriting a start/finish drops its flag.
        match self.tiles[y][x] {
            Tile::Start => self.has_start = false,
            Tile::Finish => self.has_finish = false,
            _ => {}
        }

        match self.brush {
            Brush::Start => {
                if self.has_start {
                    self.clear_all(Tile::Start);
                }
                self.has_start = true;
            }
            Brush::Finish => {
                if self.has_finish {
                    self.clear_all(Tile::Finish);
                }
                self.has_finish = true;
            }
            _ => {}
        }

        self.tiles[y][x] = self.brush.tile();
    }

    fn clear_all(&mut self, tile: Tile) {
        for row in &mut self.tiles {
            for cell in row.iter_mut() {
                if *cell == tile {
                    *cell = Tile::Empty;
                }
            }
        }
    }

    /// A level needs both endpoints before it can be saved.
    pub fn validate(&self) -> Result<(), CreatorError> {
        if !self.has_start {
            return Err(CreatorError::MissingStart);
        }
        if !self.has_finish {
            return Err(CreatorError::MissingFinish);
        }
        Ok(())
    }

    fn start_position(&self) -> Option<(i32, i32)> {
        for (y, row) in self.tiles.iter().enumerate() {
            for (x, &tile) in row.iter().enumerate() {
                if tile == Tile::Start {
                    return Some((x as i32, y as i32));
                }
            }
        }
        None
    }

    /// Validate and write `<dir>/<name>.bin`, creating `dir` if needed.
    /// The byte image is fully buffered before any filesystem call, so a
    /// failed save never leaves a partial file behind.
    pub fn save(&self, dir: &Path, name: &str) -> Result<PathBuf, CreatorError> {
        self.validate()?;
        let (px, py) = self.start_position().ok_or(CreatorError::MissingStart)?;
        let bytes = levelfile::encode(&self.tiles, px, py);

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{name}.bin"));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
