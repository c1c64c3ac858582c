//! Layout and drawing: playfield, tray, score, pause and game over.

use crate::app::{Popup, Screen};
use crate::theme::Theme;
use crate::tray::Tray;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use sandbridge::placement::PlacementResolver;
use sandbridge::{GameEvent, Rgba, SandGame};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

const SIDEBAR_WIDTH: u16 = 24;
/// Game-over overlay fade-in.
const GAME_OVER_FADE_MS: u32 = 600;
/// Ghost preview opacity over the background.
const GHOST_ALPHA: f32 = 0.35;

const PREVIEW_SLOT_W: u16 = 7;
const MINI_CELL_W: u16 = 2;

/// Everything a frame needs, borrowed from the app.
pub struct View<'a> {
    pub game: &'a SandGame<Vec<GameEvent>>,
    pub tray: &'a Tray,
    pub anchor: (i32, i32),
    pub screen: Screen,
    pub theme: &'a Theme,
    pub high_score: u64,
    pub new_record: bool,
    pub popups: &'a [Popup],
}

/// Largest grid (width, height) in cells whose board, border and sidebar fit the terminal.
/// Half-blocks put two grid rows in each terminal row.
pub fn max_grid_for_terminal(term_cols: u16, term_rows: u16) -> (usize, usize) {
    let w = term_cols.saturating_sub(2).saturating_sub(SIDEBAR_WIDTH);
    let h = term_rows.saturating_sub(2) * 2;
    (usize::from(w.max(1)), usize::from(h.max(2)))
}

/// Board size in terminal cells, border included.
fn playfield_size(view: &View) -> (u16, u16) {
    let grid = view.game.grid();
    (grid.width() as u16 + 2, grid.height().div_ceil(2) as u16 + 2)
}

fn to_color((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

pub fn draw(
    frame: &mut Frame,
    view: &View,
    game_over_effect: &mut Option<Effect>,
    game_over_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    draw_game(frame, view, area);
    match view.screen {
        Screen::Playing => {}
        Screen::Paused => draw_pause_overlay(frame, view.theme, area),
        Screen::GameOver => {
            draw_game_over(frame, view, area, game_over_effect, game_over_process_time, now);
        }
    }
}

/// Playfield + sidebar, centred.
fn draw_game(frame: &mut Frame, view: &View, area: Rect) {
    let (pw, ph) = playfield_size(view);
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph.max(22)),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let playfield_area = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    draw_playfield(frame, view, playfield_area);
    draw_sidebar(frame, view, inner[1]);
}

/// Ghost cells for the selected block at the current anchor.
fn ghost_cells(view: &View) -> (HashSet<(usize, usize)>, Rgba) {
    if view.screen != Screen::Playing {
        return (HashSet::new(), Rgba::CLEAR);
    }
    let Some(block) = view.tray.selected() else {
        return (HashSet::new(), Rgba::CLEAR);
    };
    let cells = PlacementResolver::resolve(view.game.grid(), &block.shape, view.anchor)
        .map(|p| p.cells.into_iter().collect())
        .unwrap_or_default();
    (cells, block.color.rgba().with_alpha(GHOST_ALPHA))
}

fn draw_playfield(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Sandbridge ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let grid = view.game.grid();
    let bg = theme.bg_rgb();
    let loss_row = view.game.loss_row();
    let (ghost, ghost_color) = ghost_cells(view);

    let color_at = |x: usize, y: usize| -> Color {
        if y >= grid.height() {
            return theme.bg;
        }
        match grid.get(x, y) {
            Ok(cell) if cell.is_occupied() => return to_color(cell.color().blend_over(bg)),
            _ => {}
        }
        if ghost.contains(&(x, y)) {
            to_color(ghost_color.blend_over(bg))
        } else if y == loss_row && x % 2 == 0 {
            theme.warn
        } else {
            theme.bg
        }
    };

    let buf = frame.buffer_mut();
    for y in (0..grid.height()).step_by(2) {
        let ry = inner.y + (y / 2) as u16;
        if ry >= inner.y + inner.height {
            break;
        }
        for x in 0..grid.width() {
            let rx = inner.x + x as u16;
            if rx >= inner.x + inner.width {
                break;
            }
            buf[(rx, ry)]
                .set_symbol("▀")
                .set_style(Style::default().fg(color_at(x, y)).bg(color_at(x, y + 1)));
        }
    }

    for popup in view.popups {
        let rx = inner.x + popup.x as u16;
        let ry = inner.y + (popup.y / 2) as u16;
        if rx < inner.x + inner.width && ry < inner.y + inner.height {
            let fg = to_color(popup.color.with_alpha(1.0).blend_over(bg));
            let style = Style::default().fg(fg).bg(theme.bg).bold();
            buf.set_string(rx, ry, format!("+{}", popup.amount), style);
        }
    }
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let bordered = || Block::default().borders(Borders::ALL).border_style(border_style);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Tray (border + title + previews + keys)
            Constraint::Length(1),
            Constraint::Length(5), // Score, best
            Constraint::Length(1),
            Constraint::Length(4), // Headroom gauge
            Constraint::Length(1),
            Constraint::Min(0), // Controls
        ])
        .split(area);

    // --- Tray ---
    let tray_block = bordered();
    let tray_inner = tray_block.inner(chunks[0]);
    tray_block.render(chunks[0], frame.buffer_mut());
    let tray_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3), Constraint::Length(1)])
        .split(tray_inner);
    Paragraph::new(Line::from(Span::styled("Blocks", title_style)))
        .render(tray_layout[0], frame.buffer_mut());
    draw_tray(frame, view, tray_layout[1], tray_layout[2]);

    // --- Stats ---
    let stats_block = bordered();
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let status = if view.game.is_clearing() { "clearing" } else { "" };
    let stats = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(view.game.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best: ", title_style),
            Span::styled(view.high_score.to_string(), fg_style),
        ]),
        Line::from(Span::styled(status, Style::default().fg(theme.inactive_fg))),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    // --- Headroom: rows left above the loss line ---
    let head_block = bordered();
    let head_inner = head_block.inner(chunks[4]);
    head_block.render(chunks[4], frame.buffer_mut());
    let head_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(head_inner);
    Paragraph::new(Line::from(Span::styled("Headroom", title_style)))
        .render(head_layout[0], frame.buffer_mut());
    let ratio = headroom(view);
    let bar_color = if ratio > 0.5 {
        Color::Green
    } else if ratio > 0.2 {
        Color::Yellow
    } else {
        Color::Red
    };
    Gauge::default()
        .ratio(ratio)
        .gauge_style(Style::default().fg(bar_color))
        .render(head_layout[1], frame.buffer_mut());

    // --- Controls ---
    let help_style = Style::default().fg(theme.inactive_fg);
    let help = [
        "←→↑↓/hjkl  move",
        "Shift      move fast",
        "1 2 3/Tab  pick block",
        "Space      drop",
        "P pause  R retry  Q quit",
    ];
    Paragraph::new(Text::from(
        help.iter()
            .map(|s| Line::from(Span::styled(*s, help_style)))
            .collect::<Vec<_>>(),
    ))
    .render(chunks[6], frame.buffer_mut());
}

/// Fraction of the rows between the loss line and the floor that are still clear of sand.
fn headroom(view: &View) -> f64 {
    let grid = view.game.grid();
    let loss = view.game.loss_row();
    let span = grid.height().saturating_sub(loss);
    if span == 0 {
        return 0.0;
    }
    let top = (loss..grid.height())
        .find(|&y| grid.row_occupied(y))
        .unwrap_or(grid.height());
    ((top - loss) as f64 / span as f64).clamp(0.0, 1.0)
}

/// Three previews side by side with slot keys underneath; the selected one is marked.
fn draw_tray(frame: &mut Frame, view: &View, area: Rect, keys: Rect) {
    let bg = view.theme.bg_rgb();
    for (i, slot) in view.tray.slots().iter().enumerate() {
        let x = area.x + i as u16 * PREVIEW_SLOT_W;
        if x + PREVIEW_SLOT_W > area.x + area.width {
            break;
        }
        let selected = i == view.tray.selected_index();
        let label_style = if selected {
            Style::default().fg(view.theme.bg).bg(view.theme.title).bold()
        } else {
            Style::default().fg(view.theme.inactive_fg)
        };
        frame
            .buffer_mut()
            .set_string(x + 2, keys.y, format!(" {} ", i + 1), label_style);

        let Some(block) = slot else {
            continue;
        };
        let color = to_color(block.color.rgba().blend_over(bg));
        let cells = block.kind.cells();
        let (lo_x, lo_y) = cells
            .iter()
            .fold((i32::MAX, i32::MAX), |(ax, ay), &(dx, dy)| (ax.min(dx), ay.min(dy)));
        let (hi_x, hi_y) = cells
            .iter()
            .fold((i32::MIN, i32::MIN), |(ax, ay), &(dx, dy)| (ax.max(dx), ay.max(dy)));
        let bw = (hi_x - lo_x + 1) as u16 * MINI_CELL_W;
        let bh = (hi_y - lo_y + 1) as u16;
        let off_x = PREVIEW_SLOT_W.saturating_sub(bw) / 2;
        let off_y = area.height.saturating_sub(bh) / 2;
        for &(dx, dy) in cells {
            let rx = x + off_x + (dx - lo_x) as u16 * MINI_CELL_W;
            let ry = area.y + off_y + (dy - lo_y) as u16;
            if ry < area.y + area.height {
                frame
                    .buffer_mut()
                    .set_string(rx, ry, "██", Style::default().fg(color).bg(color));
            }
        }
    }
}

fn centered(area: Rect, w: u16, h: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(w) / 2,
        y: area.y + area.height.saturating_sub(h) / 2,
        width: w.min(area.width),
        height: h.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Paused ", Style::default().fg(Color::Black).bg(theme.title))),
        Line::from(""),
        Line::from(Span::styled(" P Resume    Q Quit ", Style::default().fg(theme.main_fg))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

/// Game-over card over the final board. Fades in (TachyonFX) the first frames it is shown.
fn draw_game_over(
    frame: &mut Frame,
    view: &View,
    area: Rect,
    effect: &mut Option<Effect>,
    process_time: &mut Option<Instant>,
    now: Instant,
) {
    let theme = view.theme;
    let popup = centered(area, 30, 10);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(" Game Over ", Style::default().fg(Color::White).bg(theme.warn))),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", view.game.score()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", view.high_score),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if view.new_record {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(theme.title).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R Retry    Q Quit ",
        Style::default().fg(theme.main_fg),
    )));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" Sandbridge ", Style::default().fg(theme.title))),
        )
        .render(popup, frame.buffer_mut());

    let delta = process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *process_time = Some(now);
    let effect = effect.get_or_insert_with(|| {
        fx::fade_from(theme.bg, theme.bg, (GAME_OVER_FADE_MS, Interpolation::QuadOut)).with_area(popup)
    });
    if !effect.done() {
        frame.render_effect(effect, popup, TfxDuration::from_millis(delta_ms));
    }
}
