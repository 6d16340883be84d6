/// Level state machine and slide movement.
///
/// ## Slide rule
///
/// A move steps the player one cell at a time in the chosen direction
/// until the NEXT cell is an obstacle (out of bounds, or a wall), then
/// stops on the last free cell. Start, finish and trap tiles never stop
/// a slide; only the landing cell is checked for win/lose.
///
/// ### Status transitions
/// ┌──────────────┬───────────────────────────┬────────────┐
/// │ From          │ Condition                 │ To         │
/// ├──────────────┼───────────────────────────┼────────────┤
/// │ InProgress    │ landing tile == Finish    │ Finished   │
/// │ InProgress    │ landing tile == Trap      │ Failed     │
/// │ Finished      │ reset()                   │ InProgress │
/// │ Failed        │ reset()                   │ InProgress │
/// └──────────────┴───────────────────────────┴────────────┘
/// `move_player` outside InProgress is a no-op, not an error.
///
/// ## Time
///
/// The core carries no clock. The driving loop passes milliseconds since
/// process start into `move_player` and `tick`; the value must be
/// monotonically non-decreasing (a decreasing clock is a caller bug, not
/// a defended invariant).

use std::path::Path;

use crate::domain::direction::Direction;
use crate::domain::tile::Tile;
use crate::sim::levelfile::{self, LevelFileError};

/// Trail points strictly older than this are evicted.
pub const TRAIL_LIFETIME_MS: u64 = 200;
/// Interval between win/lose flood-fill radius increments.
pub const ANIM_STEP_MS: u64 = 200;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    InProgress,
    Finished,
    Failed,
}

/// One cell entered during a slide, with the time it was recorded.
#[derive(Clone, Copy, Debug)]
pub struct TrailPoint {
    pub x: i32,
    pub y: i32,
    pub born_ms: u64,
}

pub struct LevelState {
    width: i32,
    height: i32,
    tiles: Vec<Vec<Tile>>,
    player_x: i32,
    player_y: i32,
    status: Status,
    trail: Vec<TrailPoint>,
    anim_radius: u32,
    last_anim_ms: u64,
}

// ── Built-in fallback level ──

/// Used when no level files are discoverable. Player starts at (1, 7).
const DEFAULT_LEVEL: [&str; 9] = [
    "xxxxxxxx",
    "xf_xxx_x",
    "x__xxx_x",
    "x______x",
    "xxxxx_xx",
    "xd__x__x",
    "x___x__x",
    "xs_____x",
    "xxxxxxxx",
];

impl LevelState {
    pub fn new() -> Self {
        LevelState {
            width: 0,
            height: 0,
            tiles: vec![],
            player_x: 0,
            player_y: 0,
            status: Status::InProgress,
            trail: vec![],
            anim_radius: 0,
            last_anim_ms: 0,
        }
    }

    // ── Queries ──

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn player(&self) -> (i32, i32) {
        (self.player_x, self.player_y)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == Status::Finished
    }

    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    pub fn trail(&self) -> &[TrailPoint] {
        &self.trail
    }

    pub fn animation_radius(&self) -> u32 {
        self.anim_radius
    }

    /// Tile at (x, y). Out of bounds reads as wall.
    pub fn tile_at(&self, x: i32, y: i32) -> Tile {
        if x >= 0 && x < self.width && y >= 0 && y < self.height {
            self.tiles[y as usize][x as usize]
        } else {
            Tile::Wall
        }
    }

    /// True iff (x, y) halts a slide: out of bounds, or a wall.
    pub fn is_obstacle(&self, x: i32, y: i32) -> bool {
        self.tile_at(x, y).is_wall()
    }

    /// Flood-fill ceiling for the win/lose animation, from the grid diagonal.
    pub fn radius_cap(&self) -> u32 {
        let diag = ((self.width * self.width + self.height * self.height) as f64).sqrt();
        diag.ceil() as u32 + 1
    }

    // ── Movement ──

    /// Slide in `dir` until blocked, recording each cell entered into the
    /// trail. No-op unless the level is in progress. The win/lose check
    /// runs exactly once, on the landing tile.
    pub fn move_player(&mut self, dir: Direction, now_ms: u64) {
        if self.status != Status::InProgress {
            return;
        }

        let (dx, dy) = dir.delta();
        let (mut x, mut y) = (self.player_x, self.player_y);
        while !self.is_obstacle(x + dx, y + dy) {
            x += dx;
            y += dy;
            self.trail.push(TrailPoint { x, y, born_ms: now_ms });
        }

        if (x, y) == (self.player_x, self.player_y) {
            return;
        }
        self.player_x = x;
        self.player_y = y;

        match self.tile_at(x, y) {
            Tile::Finish => self.enter_terminal(Status::Finished, now_ms),
            Tile::Trap => self.enter_terminal(Status::Failed, now_ms),
            _ => {}
        }
    }

    fn enter_terminal(&mut self, status: Status, now_ms: u64) {
        self.status = status;
        self.anim_radius = 0;
        self.last_anim_ms = now_ms;
    }

    // ── Per-frame tick ──

    /// Advance time-based state: evict expired trail points and, in a
    /// terminal state, grow the flood-fill radius by at most one step per
    /// call (a large time jump is not caught up in bulk).
    pub fn tick(&mut self, now_ms: u64) {
        self.trail
            .retain(|p| now_ms.saturating_sub(p.born_ms) <= TRAIL_LIFETIME_MS);

        if self.status == Status::InProgress {
            return;
        }
        if now_ms.saturating_sub(self.last_anim_ms) >= ANIM_STEP_MS {
            if self.anim_radius < self.radius_cap() {
                self.anim_radius += 1;
            }
            self.last_anim_ms += ANIM_STEP_MS;
        }
    }

    /// Back to InProgress with a clean trail and animation. The player and
    /// the grid are untouched; reloading the file is the caller's call.
    pub fn reset(&mut self) {
        self.trail.clear();
        self.status = Status::InProgress;
        self.anim_radius = 0;
        self.last_anim_ms = 0;
    }

    // ── Loading ──

    /// Replace the grid and player position from a level file.
    /// On any error the previous state is left fully intact.
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), LevelFileError> {
        let data = levelfile::load(path)?;
        self.width = data.width as i32;
        self.height = data.height as i32;
        self.tiles = data.tiles;
        self.player_x = data.player_x;
        self.player_y = data.player_y;
        self.reset();
        Ok(())
    }

    /// Populate the fixed built-in layout.
    pub fn create_default(&mut self) {
        self.width = DEFAULT_LEVEL[0].len() as i32;
        self.height = DEFAULT_LEVEL.len() as i32;
        self.tiles = DEFAULT_LEVEL
            .iter()
            .map(|row| row.bytes().map(Tile::from_byte).collect())
            .collect();
        self.player_x = 1;
        self.player_y = 7;
        self.reset();
    }
}

// ── Level discovery ──

/// Non-recursive scan of `dir` for `.bin` entries, sorted by filename so
/// the browser ordering is stable.
pub fn level_files(dir: &Path) -> Vec<String> {
    let mut names = vec![];
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map_or(false, |e| e == "bin") {
                if let Some(name) = path.file_name() {
                    names.push(name.to_string_lossy().to_string());
                }
            }
        }
    }
    names.sort();
    names
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: build a LevelState from a string diagram.
    /// Legend:  'x'=Wall  '_'=Empty  's'=Start (player here)  'f'=Finish  'd'=Trap
    fn level_from(rows: &[&str]) -> LevelState {
        let mut level = LevelState::new();
        level.width = rows[0].len() as i32;
        level.height = rows.len() as i32;
        level.tiles = rows
            .iter()
            .map(|row| row.bytes().map(Tile::from_byte).collect())
            .collect();
        for (y, row) in rows.iter().enumerate() {
            if let Some(x) = row.bytes().position(|b| b == b's') {
                level.player_x = x as i32;
                level.player_y = y as i32;
            }
        }
        level
    }

    // ── Slide resolution ──

    #[test]
    fn slide_stops_on_cell_before_wall() {
        let mut level = level_from(&[
            "xxxxxxx",
            "xs____x",
            "xxxxxxx",
        ]);
        level.move_player(Direction::Right, 0);
        assert_eq!(level.player(), (5, 1));
        assert_eq!(level.status(), Status::InProgress);
    }

    #[test]
    fn slide_never_lands_on_wall_or_outside() {
        let mut level = level_from(&[
            "xxxxx",
            "x_s_x",
            "x___x",
            "xxxxx",
        ]);
        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            level.reset();
            level.move_player(dir, 0);
            let (x, y) = level.player();
            assert!(x >= 0 && x < level.width() && y >= 0 && y < level.height());
            assert_ne!(level.tile_at(x, y), Tile::Wall);
        }
    }

    #[test]
    fn blocked_slide_is_a_no_op() {
        let mut level = level_from(&[
            "xxxx",
            "xs_x",
            "xxxx",
        ]);
        level.move_player(Direction::Left, 10);
        assert_eq!(level.player(), (1, 1));
        assert!(level.trail().is_empty());

        // Repeating the blocked move changes nothing and adds no trail.
        level.move_player(Direction::Left, 20);
        assert_eq!(level.player(), (1, 1));
        assert!(level.trail().is_empty());
        assert_eq!(level.status(), Status::InProgress);
    }

    #[test]
    fn landing_on_finish_wins() {
        let mut level = level_from(&[
            "xxxxxx",
            "xs__fx",
            "xxxxxx",
        ]);
        level.move_player(Direction::Right, 0);
        assert_eq!(level.player(), (4, 1));
        assert_eq!(level.status(), Status::Finished);
    }

    #[test]
    fn landing_on_trap_fails() {
        let mut level = level_from(&[
            "xxxxxx",
            "xs__dx",
            "xxxxxx",
        ]);
        level.move_player(Direction::Right, 0);
        assert_eq!(level.player(), (4, 1));
        assert_eq!(level.status(), Status::Failed);
    }

    #[test]
    fn sliding_across_a_trap_does_not_stop() {
        // The trap sits mid-path; only the landing tile is evaluated.
        let mut level = level_from(&[
            "xxxxxx",
            "xs_d_x",
            "xxxxxx",
        ]);
        level.move_player(Direction::Right, 0);
        assert_eq!(level.player(), (4, 1));
        assert_eq!(level.status(), Status::InProgress);
    }

    #[test]
    fn sliding_across_finish_does_not_win() {
        let mut level = level_from(&[
            "xxxxxx",
            "xs_f_x",
            "xxxxxx",
        ]);
        level.move_player(Direction::Right, 0);
        assert_eq!(level.player(), (4, 1));
        assert_eq!(level.status(), Status::InProgress);
    }

    #[test]
    fn terminal_state_locks_movement_until_reset() {
        let mut level = level_from(&[
            "xxxxxx",
            "xs__fx",
            "x____x",
            "xxxxxx",
        ]);
        level.move_player(Direction::Right, 0);
        assert_eq!(level.status(), Status::Finished);

        let locked = level.player();
        let trail_len = level.trail().len();
        for dir in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            level.move_player(dir, 50);
        }
        assert_eq!(level.player(), locked);
        assert_eq!(level.trail().len(), trail_len);

        level.reset();
        assert_eq!(level.status(), Status::InProgress);
        level.move_player(Direction::Down, 100);
        assert_eq!(level.player(), (4, 2));
    }

    // ── Trail ──

    #[test]
    fn trail_records_every_cell_entered() {
        let mut level = level_from(&[
            "xxxxxx",
            "xs___x",
            "xxxxxx",
        ]);
        level.move_player(Direction::Right, 42);
        let cells: Vec<(i32, i32)> = level.trail().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(cells, vec![(2, 1), (3, 1), (4, 1)]);
        assert!(level.trail().iter().all(|p| p.born_ms == 42));
    }

    #[test]
    fn trail_point_survives_exactly_the_lifetime() {
        let mut level = level_from(&[
            "xxxxx",
            "xs__x",
            "xxxxx",
        ]);
        level.move_player(Direction::Right, 1000);
        assert_eq!(level.trail().len(), 2);

        // Eviction is strictly-greater-than: age == lifetime survives.
        level.tick(1000 + TRAIL_LIFETIME_MS - 1);
        assert_eq!(level.trail().len(), 2);
        level.tick(1000 + TRAIL_LIFETIME_MS);
        assert_eq!(level.trail().len(), 2);
        level.tick(1000 + TRAIL_LIFETIME_MS + 1);
        assert!(level.trail().is_empty());
    }

    #[test]
    fn reset_clears_trail() {
        let mut level = level_from(&[
            "xxxxx",
            "xs__x",
            "xxxxx",
        ]);
        level.move_player(Direction::Right, 5);
        assert!(!level.trail().is_empty());
        level.reset();
        assert!(level.trail().is_empty());
    }

    // ── Win/lose animation ──

    #[test]
    fn radius_grows_one_step_per_interval() {
        let mut level = level_from(&[
            "xxxxx",
            "xs_fx",
            "xxxxx",
        ]);
        level.move_player(Direction::Right, 1000);
        assert_eq!(level.status(), Status::Finished);
        assert_eq!(level.animation_radius(), 0);

        level.tick(1000 + ANIM_STEP_MS - 1);
        assert_eq!(level.animation_radius(), 0);
        level.tick(1000 + ANIM_STEP_MS);
        assert_eq!(level.animation_radius(), 1);
        level.tick(1000 + 2 * ANIM_STEP_MS);
        assert_eq!(level.animation_radius(), 2);
    }

    #[test]
    fn radius_does_not_catch_up_after_a_time_jump() {
        let mut level = level_from(&[
            "xxxxx",
            "xs_fx",
            "xxxxx",
        ]);
        level.move_player(Direction::Right, 0);

        // Ten intervals pass at once; a single tick adds a single step.
        level.tick(10 * ANIM_STEP_MS);
        assert_eq!(level.animation_radius(), 1);
        level.tick(10 * ANIM_STEP_MS);
        assert_eq!(level.animation_radius(), 2);
    }

    #[test]
    fn radius_is_capped_by_the_grid_diagonal() {
        let mut level = level_from(&[
            "xxxxx",
            "xs_fx",
            "xxxxx",
        ]);
        level.move_player(Direction::Right, 0);
        let cap = level.radius_cap();
        assert_eq!(cap, 7); // ceil(sqrt(25 + 9)) + 1

        let mut now = 0;
        for _ in 0..cap + 10 {
            now += ANIM_STEP_MS;
            level.tick(now);
        }
        assert_eq!(level.animation_radius(), cap);

        level.reset();
        assert_eq!(level.animation_radius(), 0);
    }

    // ── Grid queries ──

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let level = level_from(&[
            "xxx",
            "xsx",
            "xxx",
        ]);
        assert_eq!(level.tile_at(-1, 0), Tile::Wall);
        assert_eq!(level.tile_at(0, -1), Tile::Wall);
        assert_eq!(level.tile_at(3, 1), Tile::Wall);
        assert_eq!(level.tile_at(1, 3), Tile::Wall);
        assert!(level.is_obstacle(-5, -5));
    }

    // ── Built-in level ──

    #[test]
    fn default_level_layout() {
        let mut level = LevelState::new();
        level.create_default();
        assert_eq!((level.width(), level.height()), (8, 9));
        assert_eq!(level.player(), (1, 7));
        assert_eq!(level.status(), Status::InProgress);
        assert_eq!(level.tile_at(1, 1), Tile::Finish);
        assert_eq!(level.tile_at(1, 5), Tile::Trap);
        assert_eq!(level.tile_at(1, 7), Tile::Start);
    }

    #[test]
    fn default_level_down_from_start_is_blocked() {
        let mut level = LevelState::new();
        level.create_default();
        level.move_player(Direction::Down, 0);
        assert_eq!(level.player(), (1, 7));
        assert!(level.trail().is_empty());
    }

    #[test]
    fn default_level_right_from_start() {
        let mut level = LevelState::new();
        level.create_default();
        level.move_player(Direction::Right, 0);
        assert_eq!(level.player(), (6, 7));
        assert_eq!(level.status(), Status::InProgress);
    }

    #[test]
    fn default_level_up_from_start_lands_on_the_trap() {
        let mut level = LevelState::new();
        level.create_default();
        level.move_player(Direction::Up, 0);
        assert_eq!(level.player(), (1, 5));
        assert_eq!(level.status(), Status::Failed);
    }

    // ── Loading ──

    #[test]
    fn failed_load_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut level = LevelState::new();
        level.create_default();
        level.move_player(Direction::Right, 0);
        let before = level.player();

        assert!(level.load_from_file(&dir.path().join("missing.bin")).is_err());
        assert_eq!((level.width(), level.height()), (8, 9));
        assert_eq!(level.player(), before);

        // A bad header is rejected before anything is replaced.
        let bad = dir.path().join("bad.bin");
        let mut bytes = vec![];
        bytes.extend_from_slice(&500i32.to_le_bytes());
        bytes.extend_from_slice(&500i32.to_le_bytes());
        std::fs::write(&bad, bytes).unwrap();
        assert!(level.load_from_file(&bad).is_err());
        assert_eq!((level.width(), level.height()), (8, 9));
    }

    #[test]
    fn load_replaces_grid_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let tiles: Vec<Vec<Tile>> = ["xxxxx", "xs_fx", "xxxxx"]
            .iter()
            .map(|row| row.bytes().map(Tile::from_byte).collect())
            .collect();
        let path = dir.path().join("one.bin");
        std::fs::write(&path, levelfile::encode(&tiles, 1, 1)).unwrap();

        let mut level = LevelState::new();
        level.create_default();
        level.move_player(Direction::Up, 0); // ends on the trap, Failed
        assert!(level.is_failed());

        level.load_from_file(&path).unwrap();
        assert_eq!((level.width(), level.height()), (5, 3));
        assert_eq!(level.player(), (1, 1));
        assert_eq!(level.status(), Status::InProgress);
        assert!(level.trail().is_empty());
    }

    #[test]
    fn level_files_scans_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.bin", "a.bin", "c.txt", "z.bin"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/d.bin"), b"").unwrap();

        assert_eq!(level_files(dir.path()), vec!["a.bin", "b.bin", "z.bin"]);
        assert!(level_files(&dir.path().join("absent")).is_empty());
    }
}
