/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use crossterm::event::KeyCode;

use config::GameConfig;
use domain::direction::Direction;
use sim::creator::{self, Brush, LevelDraft};
use sim::level::{self, LevelState, Status};
use ui::input::InputState;
use ui::renderer::{Renderer, MAX_VISIBLE_LEVELS};
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(16);
/// How long a status message stays on screen.
const MESSAGE_MS: u64 = 2500;

const MENU_ITEMS: [&str; 4] = ["Select Level", "Create Level", "Generate Level", "Quit"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Menu,
    LevelSelect,
    Playing,
    CreatorDims,
    CreatorEdit,
    CreatorName,
}

struct App {
    phase: Phase,
    menu_cursor: usize,
    level_files: Vec<String>,
    select_cursor: usize,
    select_scroll: usize,
    level: LevelState,
    /// File the running level was loaded from; None = built-in level.
    current_file: Option<String>,
    draft: Option<LevelDraft>,
    edit_cursor: (usize, usize),
    /// Shared text field for dimension and file name entry.
    text_input: String,
    message: String,
    message_until_ms: u64,
}

impl App {
    fn new() -> Self {
        App {
            phase: Phase::Menu,
            menu_cursor: 0,
            level_files: vec![],
            select_cursor: 0,
            select_scroll: 0,
            level: LevelState::new(),
            current_file: None,
            draft: None,
            edit_cursor: (0, 0),
            text_input: String::new(),
            message: String::new(),
            message_until_ms: 0,
        }
    }

    fn set_message(&mut self, msg: &str, now_ms: u64) {
        self.message = msg.to_string();
        self.message_until_ms = now_ms + MESSAGE_MS;
    }

    fn level_title(&self) -> String {
        match &self.current_file {
            Some(name) => name.trim_end_matches(".bin").to_string(),
            None => "built-in level".to_string(),
        }
    }
}

fn main() {
    let config = GameConfig::load();
    let mut app = App::new();

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = run(&mut app, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }
}

fn run(
    app: &mut App,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let mut input = InputState::new();

    loop {
        input.drain_events();
        if input.ctrl_c_pressed() {
            break;
        }
        let now_ms = started.elapsed().as_millis() as u64;

        if !app.message.is_empty() && now_ms >= app.message_until_ms {
            app.message.clear();
        }

        let quit = match app.phase {
            Phase::Menu => handle_menu(app, &input, config, now_ms),
            Phase::LevelSelect => {
                handle_level_select(app, &input, config, now_ms);
                false
            }
            Phase::Playing => {
                handle_playing(app, &input, sound, config, now_ms);
                false
            }
            Phase::CreatorDims => {
                handle_creator_dims(app, &input, now_ms);
                false
            }
            Phase::CreatorEdit => {
                handle_creator_edit(app, &input, now_ms);
                false
            }
            Phase::CreatorName => {
                handle_creator_name(app, &input, config, now_ms);
                false
            }
        };
        if quit {
            break;
        }

        if app.phase == Phase::Playing {
            app.level.tick(now_ms);
        }

        match app.phase {
            Phase::Menu => renderer.draw_menu(&MENU_ITEMS, app.menu_cursor, &app.message)?,
            Phase::LevelSelect => renderer.draw_level_select(
                &app.level_files,
                app.select_cursor,
                app.select_scroll,
                &app.message,
            )?,
            Phase::Playing => {
                renderer.draw_playing(&app.level, &app.level_title(), now_ms, &app.message)?
            }
            Phase::CreatorDims => renderer.draw_creator_dims(&app.text_input, &app.message)?,
            Phase::CreatorEdit => {
                if let Some(draft) = &app.draft {
                    renderer.draw_creator_edit(draft, app.edit_cursor, &app.message)?;
                }
            }
            Phase::CreatorName => renderer.draw_creator_name(&app.text_input, &app.message)?,
        }

        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Key Constants ──

const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];

fn detect_direction(input: &InputState) -> Option<Direction> {
    if input.any_pressed(KEYS_UP) {
        Some(Direction::Up)
    } else if input.any_pressed(KEYS_DOWN) {
        Some(Direction::Down)
    } else if input.any_pressed(KEYS_LEFT) {
        Some(Direction::Left)
    } else if input.any_pressed(KEYS_RIGHT) {
        Some(Direction::Right)
    } else {
        None
    }
}

// ── Main menu ──

fn handle_menu(app: &mut App, input: &InputState, config: &GameConfig, now_ms: u64) -> bool {
    let count = MENU_ITEMS.len();
    if input.any_pressed(&[KeyCode::Up]) {
        app.menu_cursor = (app.menu_cursor + count - 1) % count;
    } else if input.any_pressed(&[KeyCode::Down]) {
        app.menu_cursor = (app.menu_cursor + 1) % count;
    } else if input.any_pressed(KEYS_CONFIRM) {
        match app.menu_cursor {
            0 => {
                app.level_files = level::level_files(&config.levels_dir);
                app.select_cursor = 0;
                app.select_scroll = 0;
                app.phase = Phase::LevelSelect;
            }
            1 => {
                app.text_input.clear();
                app.phase = Phase::CreatorDims;
            }
            2 => app.set_message("Level generation is not implemented yet", now_ms),
            _ => return true,
        }
    } else if input.was_pressed(KeyCode::Esc) {
        return true;
    }
    false
}

// ── Level browser ──

fn handle_level_select(app: &mut App, input: &InputState, config: &GameConfig, now_ms: u64) {
    let total = app.level_files.len();

    if input.any_pressed(&[KeyCode::Up]) {
        if app.select_cursor > 0 {
            app.select_cursor -= 1;
            if app.select_cursor < app.select_scroll {
                app.select_scroll = app.select_cursor;
            }
        }
    } else if input.any_pressed(&[KeyCode::Down]) {
        if app.select_cursor + 1 < total {
            app.select_cursor += 1;
            if app.select_cursor >= app.select_scroll + MAX_VISIBLE_LEVELS {
                app.select_scroll = app.select_cursor - MAX_VISIBLE_LEVELS + 1;
            }
        }
    } else if input.any_pressed(KEYS_CONFIRM) {
        if total == 0 {
            app.level.create_default();
            app.current_file = None;
            app.phase = Phase::Playing;
        } else {
            let name = app.level_files[app.select_cursor].clone();
            match app.level.load_from_file(&config.levels_dir.join(&name)) {
                Ok(()) => {
                    app.current_file = Some(name);
                    app.phase = Phase::Playing;
                }
                Err(e) => {
                    let msg = format!("Could not load {name}: {e}");
                    app.set_message(&msg, now_ms);
                }
            }
        }
    } else if input.was_pressed(KeyCode::Esc) {
        app.phase = Phase::Menu;
    }
}

// ── Gameplay ──

fn handle_playing(
    app: &mut App,
    input: &InputState,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    now_ms: u64,
) {
    if app.level.status() == Status::InProgress {
        if let Some(dir) = detect_direction(input) {
            if let Some(sfx) = sound {
                sfx.play_slide();
            }
            app.level.move_player(dir, now_ms);
            match app.level.status() {
                Status::Finished => {
                    if let Some(sfx) = sound {
                        sfx.play_win();
                    }
                }
                Status::Failed => {
                    if let Some(sfx) = sound {
                        sfx.play_lose();
                    }
                }
                Status::InProgress => {}
            }
        }
    }

    if input.any_pressed(KEYS_RESTART) {
        restart_level(app, config, now_ms);
    }
    if input.was_pressed(KeyCode::Esc) {
        app.phase = Phase::Menu;
    }
}

/// Restart re-reads the level source; reset alone would keep the player
/// where the last slide left them.
fn restart_level(app: &mut App, config: &GameConfig, now_ms: u64) {
    match app.current_file.clone() {
        Some(name) => {
            if let Err(e) = app.level.load_from_file(&config.levels_dir.join(&name)) {
                let msg = format!("Could not reload {name}: {e}");
                app.set_message(&msg, now_ms);
            }
        }
        None => app.level.create_default(),
    }
}

// ── Creator: dimension entry ──

fn handle_creator_dims(app: &mut App, input: &InputState, now_ms: u64) {
    for c in input.typed_chars() {
        if c.is_ascii_digit() || c == '*' {
            app.text_input.push(c);
        }
    }
    if input.was_pressed(KeyCode::Backspace) {
        app.text_input.pop();
    }

    if input.was_pressed(KeyCode::Enter) {
        match creator::parse_dimensions(&app.text_input) {
            Some((w, h)) => {
                app.draft = Some(LevelDraft::new(w, h));
                app.edit_cursor = (w / 2, h / 2);
                app.phase = Phase::CreatorEdit;
            }
            None => app.set_message(
                "Dimensions must be W*H, edges 6-60, proportions 1:2 to 2:1",
                now_ms,
            ),
        }
    } else if input.was_pressed(KeyCode::Esc) {
        app.phase = Phase::Menu;
    }
}

// ── Creator: grid editing ──

fn handle_creator_edit(app: &mut App, input: &InputState, now_ms: u64) {
    let (w, h) = match &app.draft {
        Some(d) => (d.width(), d.height()),
        None => {
            app.phase = Phase::Menu;
            return;
        }
    };

    let (mut cx, mut cy) = app.edit_cursor;
    if input.any_pressed(&[KeyCode::Up]) && cy > 0 {
        cy -= 1;
    } else if input.any_pressed(&[KeyCode::Down]) && cy + 1 < h {
        cy += 1;
    } else if input.any_pressed(&[KeyCode::Left]) && cx > 0 {
        cx -= 1;
    } else if input.any_pressed(&[KeyCode::Right]) && cx + 1 < w {
        cx += 1;
    }
    app.edit_cursor = (cx, cy);

    if let Some(draft) = app.draft.as_mut() {
        for c in input.typed_chars() {
            match c {
                '1' => draft.set_brush(Brush::Wall),
                '2' => draft.set_brush(Brush::Trap),
                '3' => draft.set_brush(Brush::Start),
                '4' => draft.set_brush(Brush::Finish),
                '5' => draft.set_brush(Brush::Eraser),
                _ => {}
            }
        }
        if input.was_pressed(KeyCode::Char(' ')) {
            draft.paint(cx, cy);
        }
    }

    if input.was_pressed(KeyCode::Enter) {
        let verdict = app
            .draft
            .as_ref()
            .map(|d| d.validate().map_err(|e| e.to_string()));
        match verdict {
            Some(Ok(())) => {
                app.text_input.clear();
                app.phase = Phase::CreatorName;
            }
            Some(Err(msg)) => app.set_message(&msg, now_ms),
            None => {}
        }
    } else if input.was_pressed(KeyCode::Esc) {
        app.draft = None;
        app.phase = Phase::Menu;
        app.set_message("Level creation cancelled", now_ms);
    }
}

// ── Creator: file name entry ──

fn handle_creator_name(app: &mut App, input: &InputState, config: &GameConfig, now_ms: u64) {
    for c in input.typed_chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            app.text_input.push(c);
        }
    }
    if input.was_pressed(KeyCode::Backspace) {
        app.text_input.pop();
    }

    if input.was_pressed(KeyCode::Enter) {
        if app.text_input.is_empty() {
            app.set_message("The file name cannot be empty", now_ms);
            return;
        }
        let outcome = app
            .draft
            .as_ref()
            .map(|d| d.save(&config.levels_dir, &app.text_input));
        match outcome {
            Some(Ok(path)) => {
                let msg = format!("Level saved to {}", path.display());
                app.draft = None;
                app.phase = Phase::Menu;
                app.set_message(&msg, now_ms);
            }
            Some(Err(e)) => {
                let msg = format!("Save failed: {e}");
                app.set_message(&msg, now_ms);
            }
            None => app.phase = Phase::Menu,
        }
    } else if input.was_pressed(KeyCode::Esc) {
        app.phase = Phase::CreatorEdit;
    }
}
