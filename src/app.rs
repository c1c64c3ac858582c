//! App: terminal init, main loop, per-frame game update and key handling.

use crate::input::{Action, key_to_action};
use crate::save::{self, Session};
use crate::theme::Theme;
use crate::tray::Tray;
use crate::ui::{self, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use sandbridge::{BlockShape, GameEvent, Rgba, SandColor, SandConfig, SandGame};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// Delay before a held movement key starts repeating.
const REPEAT_DELAY_MS: u64 = 170;
/// Time between repeated moves while holding.
const REPEAT_INTERVAL_MS: u64 = 40;
/// How long a score popup stays up.
const POPUP_MS: u32 = 1200;
/// Longest frame delta fed to the game, so a stalled terminal does not skip a clear.
const MAX_FRAME_SECS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Playing,
    Paused,
    GameOver,
}

/// Floating "+N" over a cleared region.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub x: usize,
    pub y: usize,
    pub amount: u32,
    pub color: Rgba,
    pub ttl_ms: u32,
}

pub struct App {
    config: SandConfig,
    theme: Theme,
    game: SandGame<Vec<GameEvent>>,
    tray: Tray,
    /// Requested drop anchor in grid cells; clamped per shape when used.
    cursor: (i32, i32),
    screen: Screen,
    high_score: u64,
    new_record: bool,
    popups: Vec<Popup>,
    /// TachyonFX fade-in for the game-over overlay (created on entering the screen).
    game_over_effect: Option<Effect>,
    game_over_effect_process_time: Option<Instant>,
    frame_duration: Duration,
    save_path: Option<PathBuf>,
    repeat_state: Option<(Action, Instant)>,
    last_repeat_fire: Option<Instant>,
    /// Terminal reports key releases; without them the OS key repeat drives movement.
    release_events: bool,
}

impl App {
    /// `save_path` of `None` disables persistence.
    pub fn new(config: SandConfig, theme: Theme, frame_rate: f64, save_path: Option<PathBuf>) -> Self {
        let session = save_path.as_deref().and_then(save::load_session);
        let tray = Tray::new(config.seed, config.sub_square_size, &SandColor::BASE);
        let cursor = (config.width as i32 / 2, config.height as i32 / 2);
        let mut app = Self {
            game: SandGame::new(config.clone(), Vec::new()),
            config,
            theme,
            tray,
            cursor,
            screen: Screen::Playing,
            high_score: 0,
            new_record: false,
            popups: Vec::new(),
            game_over_effect: None,
            game_over_effect_process_time: None,
            frame_duration: Duration::from_secs_f64(1.0 / frame_rate.clamp(1.0, 240.0)),
            save_path,
            repeat_state: None,
            last_repeat_fire: None,
            release_events: false,
        };
        if let Some(session) = session {
            app.restore(&session);
        }
        app
    }

    pub fn game(&self) -> &SandGame<Vec<GameEvent>> {
        &self.game
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    fn restore(&mut self, session: &Session) {
        let cells = session.cells_within(self.config.width, self.config.height);
        match self.game.load_cells(cells) {
            Ok(n) => log::info!("restored {n} grains"),
            Err(e) => log::warn!("could not restore saved grains: {e}"),
        }
        self.game.set_score(session.score);
        self.high_score = self.high_score.max(session.high_score).max(session.score);
    }

    fn session(&self) -> Session {
        if self.screen == Screen::GameOver {
            // A lost board is not worth resuming.
            return Session {
                high_score: self.high_score,
                ..Session::default()
            };
        }
        Session::capture(self.game.grid(), self.game.score(), self.high_score)
    }

    /// Shrink the grid to `width`×`height` if it is larger. Grains keep their height above
    /// the floor; columns past the new width and rows above the new top are lost.
    pub fn fit_grid(&mut self, width: usize, height: usize) {
        let (w, h) = (self.config.width.min(width).max(1), self.config.height.min(height).max(2));
        if (w, h) == (self.config.width, self.config.height) {
            return;
        }
        log::info!(
            "grid {}x{} does not fit the terminal; using {}x{}",
            self.config.width,
            self.config.height,
            w,
            h
        );
        let session = self.session();
        self.config.width = w;
        self.config.height = h;
        self.game = SandGame::new(self.config.clone(), Vec::new());
        self.restore(&session);
        self.cursor = (w as i32 / 2, h as i32 / 2);
    }

    fn selected_shape(&self) -> Option<&BlockShape> {
        self.tray.selected().map(|b| &b.shape)
    }

    /// The cursor moved so the selected shape stays inside the columns and rows.
    pub fn anchor(&self) -> (i32, i32) {
        match self.selected_shape() {
            Some(shape) => clamp_anchor(shape, self.cursor, self.config.width, self.config.height),
            None => self.cursor,
        }
    }

    fn move_cursor(&mut self, dx: i32, dy: i32, fast: bool) {
        let step = if fast { self.config.sub_square_size.max(1) as i32 } else { 1 };
        let (x, y) = self.anchor();
        self.cursor = (x + dx * step, y + dy * step);
        self.cursor = self.anchor();
    }

    fn drop_selected(&mut self) {
        let anchor = self.anchor();
        let Some(block) = self.tray.selected() else {
            log::debug!("drop on empty slot {}", self.tray.selected_index());
            return;
        };
        match self.game.place_block(&block.shape, block.color.rgba(), anchor) {
            Ok(Some(_)) => {
                self.tray.take_selected();
            }
            Ok(None) => {}
            Err(e) => log::warn!("drop rejected: {e}"),
        }
    }

    fn retry(&mut self) {
        self.game.reset_grid();
        self.game.reset_score();
        self.tray.refill();
        self.popups.clear();
        self.new_record = false;
        self.game_over_effect = None;
        self.game_over_effect_process_time = None;
        self.screen = Screen::Playing;
        log::info!("retry");
    }

    /// Apply one action. Returns true when the app should exit.
    pub fn handle_action(&mut self, action: Action) -> bool {
        match (self.screen, action) {
            (_, Action::Quit) => return true,
            (_, Action::Retry) => self.retry(),
            (Screen::Playing, Action::Pause) => self.screen = Screen::Paused,
            (Screen::Paused, Action::Pause) => self.screen = Screen::Playing,
            (Screen::Playing, Action::Move { dx, dy, fast }) => self.move_cursor(dx, dy, fast),
            (Screen::Playing, Action::SelectSlot(i)) => self.tray.select(i),
            (Screen::Playing, Action::NextSlot) => self.tray.select_next(),
            (Screen::Playing, Action::Drop) => self.drop_selected(),
            _ => {}
        }
        false
    }

    /// Advance the game by `dt` seconds and react to what it reports.
    pub fn update(&mut self, dt: f32) {
        if self.screen != Screen::Playing {
            return;
        }
        self.game.advance(dt.min(MAX_FRAME_SECS));
        for event in std::mem::take(self.game.listener_mut()) {
            match event {
                GameEvent::Score { amount, color, cells } => {
                    let Some(&(x, y)) = cells.iter().min_by_key(|&&(x, y)| (y, x)) else {
                        continue;
                    };
                    self.popups.push(Popup {
                        x,
                        y,
                        amount,
                        color,
                        ttl_ms: POPUP_MS,
                    });
                }
                GameEvent::GameOver => {
                    log::info!("game over with {} points", self.game.score());
                    self.screen = Screen::GameOver;
                }
            }
        }
        if self.game.score() > self.high_score {
            self.high_score = self.game.score();
            self.new_record = true;
        }
        let elapsed = (dt * 1000.0) as u32;
        self.popups.retain_mut(|p| {
            p.ttl_ms = p.ttl_ms.saturating_sub(elapsed);
            p.ttl_ms > 0
        });
    }

    fn tick_repeat(&mut self) {
        let Some((action, first)) = self.repeat_state else {
            return;
        };
        if first.elapsed() < Duration::from_millis(REPEAT_DELAY_MS) {
            return;
        }
        let now = Instant::now();
        let next = self.last_repeat_fire.unwrap_or(first) + Duration::from_millis(REPEAT_INTERVAL_MS);
        if now >= next {
            self.handle_action(action);
            self.last_repeat_fire = Some(now);
        }
    }

    fn save(&self) {
        let Some(path) = &self.save_path else {
            return;
        };
        if let Err(e) = save::save_session(path, &self.session()) {
            log::error!("saving session failed: {e:#}");
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size,
                supports_keyboard_enhancement,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        // Release events let held keys stop repeating; not every terminal supports them.
        self.release_events = supports_keyboard_enhancement().unwrap_or(false);
        log::debug!("key release events: {}", self.release_events);
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal = DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let (cols, rows) = size()?;
        let (fit_w, fit_h) = ui::max_grid_for_terminal(cols, rows);
        self.fit_grid(fit_w, fit_h);

        let result = self.run_loop(&mut terminal);

        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        self.save();
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let mut last_frame = Instant::now();
        loop {
            let now = Instant::now();
            let dt = now.duration_since(last_frame).as_secs_f32();
            last_frame = now;

            if self.screen == Screen::Playing {
                self.tick_repeat();
                self.update(dt);
            }
            if self.screen != Screen::GameOver {
                self.game_over_effect = None;
                self.game_over_effect_process_time = None;
            }

            let view = View {
                game: &self.game,
                tray: &self.tray,
                anchor: self.anchor(),
                screen: self.screen,
                theme: &self.theme,
                high_score: self.high_score,
                new_record: self.new_record,
                popups: &self.popups,
            };
            let effect = &mut self.game_over_effect;
            let process_time = &mut self.game_over_effect_process_time;
            terminal.draw(|f| ui::draw(f, &view, effect, process_time, now))?;

            let timeout = self.frame_duration.saturating_sub(now.elapsed());
            if !event::poll(timeout)? {
                continue;
            }
            while event::poll(Duration::ZERO)? {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                let action = key_to_action(key);
                if key.kind == KeyEventKind::Release {
                    if self.repeat_state.map(|(a, _)| a) == Some(action) {
                        self.repeat_state = None;
                        self.last_repeat_fire = None;
                    }
                    continue;
                }
                if key.kind != KeyEventKind::Press || self.repeat_state.map(|(a, _)| a) == Some(action) {
                    continue;
                }
                if self.handle_action(action) {
                    return Ok(());
                }
                self.repeat_state =
                    (self.release_events && action.repeats()).then(|| (action, Instant::now()));
                self.last_repeat_fire = None;
            }
        }
    }
}

/// Anchor nearest `anchor` that keeps every column of `shape` on the grid and the anchor
/// row inside it. A shape wider than the grid is held against the left edge.
pub fn clamp_anchor(shape: &BlockShape, anchor: (i32, i32), width: usize, height: usize) -> (i32, i32) {
    let y = anchor.1.clamp(0, height.saturating_sub(1) as i32);
    let Some((min_x, _, max_x, _)) = shape.bounds() else {
        return (anchor.0.clamp(0, width.saturating_sub(1) as i32), y);
    };
    let cx = shape.center().0.round_ties_even() as i32;
    let lo = cx - min_x;
    let hi = width as i32 - 1 - max_x + cx;
    (anchor.0.min(hi).max(lo), y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbridge::BlockKind;
    use sandbridge::controller::Phase;

    fn app(width: usize, height: usize) -> App {
        let config = SandConfig {
            width,
            height,
            sub_square_size: 2,
            ..SandConfig::default()
        };
        App::new(config, Theme::default(), 30.0, None)
    }

    fn settle(app: &mut App) {
        for _ in 0..10_000 {
            app.update(0.05);
            if app.game().phase() == Phase::Idle {
                return;
            }
        }
        panic!("game never settled");
    }

    #[test]
    fn test_clamp_anchor_keeps_shape_on_grid() {
        let shape = BlockShape::from_kind(BlockKind::IHorizontal, 2);
        // bounds x 0..=5, centre 2.5 rounds to 2
        assert_eq!(clamp_anchor(&shape, (0, 3), 10, 10), (2, 3));
        assert_eq!(clamp_anchor(&shape, (9, 3), 10, 10), (6, 3));
        assert_eq!(clamp_anchor(&shape, (5, -4), 10, 10), (5, 0));
        assert_eq!(clamp_anchor(&shape, (5, 40), 10, 10), (5, 9));
        // Wider than the grid: left edge wins.
        assert_eq!(clamp_anchor(&shape, (3, 3), 4, 10), (2, 3));
    }

    #[test]
    fn test_drop_consumes_slot_and_places_sand() {
        let mut app = app(20, 30);
        let before = app.tray.slots().iter().flatten().count();
        assert!(!app.handle_action(Action::Drop));
        assert!(app.game().grid().occupied_count() > 0);
        assert_eq!(app.tray.slots().iter().flatten().count(), before - 1);
        assert_eq!(app.game().phase(), Phase::Stepping);
    }

    #[test]
    fn test_cursor_moves_and_stays_clamped() {
        let mut app = app(20, 30);
        let start = app.anchor();
        app.handle_action(Action::Move { dx: 1, dy: 0, fast: false });
        assert_eq!(app.anchor(), (start.0 + 1, start.1));
        for _ in 0..50 {
            app.handle_action(Action::Move { dx: -1, dy: -1, fast: true });
        }
        let (x, y) = app.anchor();
        assert_eq!(y, 0);
        let shape = app.selected_shape().unwrap();
        let origin = sandbridge::placement::PlacementResolver::origin_for_anchor(shape, (x, y));
        assert_eq!(origin.0 + shape.bounds().unwrap().0, 0);
    }

    #[test]
    fn test_pause_stops_the_game() {
        let mut app = app(20, 30);
        app.handle_action(Action::Drop);
        app.handle_action(Action::Pause);
        assert_eq!(app.screen(), Screen::Paused);
        let grid = app.game().grid().clone();
        app.update(0.05);
        assert_eq!(app.game().grid(), &grid);
        app.handle_action(Action::Drop);
        assert_eq!(app.tray.slots().iter().flatten().count(), 2);
        app.handle_action(Action::Pause);
        assert_eq!(app.screen(), Screen::Playing);
    }

    #[test]
    fn test_bridge_scores_popup_and_high_score() {
        let mut app = app(6, 20);
        let red = SandColor::Red.rgba();
        app.game.load_cells((0..6).map(|x| (x, 19, red))).unwrap();
        settle(&mut app);
        assert_eq!(app.game().score(), 60);
        assert_eq!(app.high_score(), 60);
        assert!(app.new_record);
        // Popup may already have expired during the clear; the events were drained.
        assert!(app.game().listener().is_empty());
    }

    #[test]
    fn test_game_over_then_retry() {
        let mut app = app(1, 10);
        let blue = SandColor::Blue.rgba();
        app.game.load_cells((2..10).map(|y| (0, y, blue))).unwrap();
        settle(&mut app);
        assert_eq!(app.screen(), Screen::GameOver);
        assert!(app.session().cells.is_empty());
        assert!(!app.handle_action(Action::Drop));
        app.handle_action(Action::Retry);
        assert_eq!(app.screen(), Screen::Playing);
        assert_eq!(app.game().grid().occupied_count(), 0);
        assert_eq!(app.game().score(), 0);
        assert!(!app.game().is_game_over());
    }

    #[test]
    fn test_fit_grid_keeps_grains_that_fit() {
        let mut app = app(20, 30);
        let green = SandColor::Green.rgba();
        app.game.load_cells([(1, 29, green), (15, 29, green)]).unwrap();
        app.fit_grid(10, 40);
        assert_eq!(app.game().grid().width(), 10);
        assert_eq!(app.game().grid().height(), 30);
        assert_eq!(app.game().grid().occupied_count(), 1);
    }

    #[test]
    fn test_fit_grid_keeps_the_settled_floor() {
        let mut app = app(10, 30);
        let red = SandColor::Red.rgba();
        app.game.load_cells([(2, 29, red), (3, 28, red), (4, 5, red)]).unwrap();
        app.fit_grid(10, 20);
        let grid = app.game().grid();
        assert_eq!(grid.height(), 20);
        assert_eq!(grid.occupied_count(), 2);
        assert_eq!(grid.get(2, 19).unwrap().color(), red);
        assert_eq!(grid.get(3, 18).unwrap().color(), red);
    }

    #[test]
    fn test_quit_from_any_screen() {
        let mut app = app(10, 10);
        assert!(app.handle_action(Action::Quit));
        app.handle_action(Action::Pause);
        assert!(app.handle_action(Action::Quit));
    }
}
