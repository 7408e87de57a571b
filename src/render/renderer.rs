use std::path::Path;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tracing::warn;

use super::assets::{Backdrop, load_background};
use crate::game::{DrawCommand, Position, Scene, SnakeRole};
use crate::metrics::SessionStats;

/// Food glyphs cycled over one animation period
const FOOD_FRAMES: [char; 4] = ['·', 'o', 'O', 'o'];

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    glyph: char,
    style: Style,
}

/// Counters pulled out of the scene's scoreboard command
#[derive(Debug, Clone, Copy, Default)]
struct Hud {
    food_eaten: u32,
    enemies_remaining: usize,
    food_remaining: usize,
}

pub struct Renderer {
    backdrop: Backdrop,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            backdrop: Backdrop::dotted(),
        }
    }

    /// Use a text backdrop, falling back to dots if it cannot be loaded
    pub fn with_background(path: Option<&Path>) -> Self {
        let backdrop = match path.map(load_background) {
            Some(Ok(backdrop)) => backdrop,
            Some(Err(err)) => {
                warn!(error = %err, "background unavailable, using default");
                Backdrop::dotted()
            }
            None => Backdrop::dotted(),
        };
        Self { backdrop }
    }

    pub fn render(&self, frame: &mut Frame, scene: &Scene, stats: &SessionStats) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Game area
                Constraint::Length(3), // Footer
            ])
            .split(frame.area());

        let hud = scene
            .commands
            .iter()
            .find_map(|command| match command {
                DrawCommand::Scoreboard {
                    food_eaten,
                    enemies_remaining,
                    food_remaining,
                } => Some(Hud {
                    food_eaten: *food_eaten,
                    enemies_remaining: *enemies_remaining,
                    food_remaining: *food_remaining,
                }),
                _ => None,
            })
            .unwrap_or_default();
        frame.render_widget(self.render_stats(hud, stats), chunks[0]);

        let game_area = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(10),
                Constraint::Percentage(80),
                Constraint::Percentage(10),
            ])
            .split(chunks[1])[1];
        frame.render_widget(self.render_grid(scene), game_area);

        if let Some(DrawCommand::Banner { text, player_won }) = scene
            .commands
            .iter()
            .find(|command| matches!(command, DrawCommand::Banner { .. }))
        {
            let popup = centered(game_area, 44, 7);
            frame.render_widget(Clear, popup);
            frame.render_widget(self.render_banner(text, *player_won), popup);
        }

        frame.render_widget(self.render_controls(), chunks[2]);
    }

    /// Paint the scene's grid commands in order; later commands cover earlier ones
    fn paint(&self, scene: &Scene) -> Vec<Vec<Cell>> {
        let blank = Cell {
            glyph: ' ',
            style: Style::default(),
        };
        let mut cells = vec![vec![blank; scene.grid.width]; scene.grid.height];
        let set = |cells: &mut Vec<Vec<Cell>>, pos: Position, cell: Cell| {
            if scene.grid.contains(pos) {
                cells[pos.y as usize][pos.x as usize] = cell;
            }
        };

        for command in &scene.commands {
            match command {
                DrawCommand::Background => {
                    for pos in scene.grid.cells() {
                        let cell = Cell {
                            glyph: self.backdrop.glyph_at(pos),
                            style: Style::default().fg(Color::DarkGray),
                        };
                        set(&mut cells, pos, cell);
                    }
                }
                DrawCommand::Food { position, phase } => {
                    let frame = (*phase as usize * FOOD_FRAMES.len())
                        / scene.animation_period.max(1) as usize;
                    let cell = Cell {
                        glyph: FOOD_FRAMES[frame % FOOD_FRAMES.len()],
                        style: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    };
                    set(&mut cells, *position, cell);
                }
                DrawCommand::Snake { role, body } => {
                    let (head_style, body_style) = snake_styles(*role);
                    // Tail first so the head lands on top
                    for (i, pos) in body.iter().enumerate().rev() {
                        let cell = if i == 0 {
                            Cell {
                                glyph: '■',
                                style: head_style,
                            }
                        } else {
                            Cell {
                                glyph: '□',
                                style: body_style,
                            }
                        };
                        set(&mut cells, *pos, cell);
                    }
                }
                DrawCommand::Scoreboard { .. } | DrawCommand::Banner { .. } => {}
            }
        }

        cells
    }

    fn render_grid(&self, scene: &Scene) -> Paragraph<'static> {
        let lines: Vec<Line> = self
            .paint(scene)
            .into_iter()
            .map(|row| {
                Line::from(
                    row.into_iter()
                        .map(|cell| Span::styled(format!("{} ", cell.glyph), cell.style))
                        .collect::<Vec<_>>(),
                )
            })
            .collect();

        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Double)
                    .border_style(Style::default().fg(Color::White))
                    .title(" Snake Arena "),
            )
            .alignment(Alignment::Center)
    }

    fn render_stats(&self, hud: Hud, stats: &SessionStats) -> Paragraph<'static> {
        let label = Style::default().fg(Color::Yellow);
        let value = Style::default().fg(Color::White);

        let text = vec![Line::from(vec![
            Span::styled("Eaten: ", label),
            Span::styled(
                hud.food_eaten.to_string(),
                value.add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled("Food left: ", label),
            Span::styled(hud.food_remaining.to_string(), value),
            Span::raw("    "),
            Span::styled("Enemies: ", label),
            Span::styled(hud.enemies_remaining.to_string(), value),
            Span::raw("    "),
            Span::styled("Time: ", label),
            Span::styled(stats.format_time(), value),
            Span::raw("    "),
            Span::styled("Wins: ", label),
            Span::styled(format!("{}/{}", stats.wins, stats.games_played), value),
        ])];

        Paragraph::new(text).alignment(Alignment::Center)
    }

    fn render_banner(&self, text: &str, player_won: bool) -> Paragraph<'static> {
        let color = if player_won { Color::Green } else { Color::Red };
        let mut lines: Vec<Line> = text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                let style = if i == 0 {
                    Style::default().fg(color).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                Line::from(Span::styled(line.to_string(), style))
            })
            .collect();

        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Press ", Style::default().fg(Color::Gray)),
            Span::styled(
                "R",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(" to restart or ", Style::default().fg(Color::Gray)),
            Span::styled(
                "Q",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" to quit", Style::default().fg(Color::Gray)),
        ]));

        Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
    }

    fn render_controls(&self) -> Paragraph<'static> {
        let text = vec![Line::from(vec![
            Span::styled("↑↓←→", Style::default().fg(Color::Cyan)),
            Span::raw(" or "),
            Span::styled("WASD", Style::default().fg(Color::Cyan)),
            Span::raw(" to steer | "),
            Span::styled("R", Style::default().fg(Color::Green)),
            Span::raw(" to restart | "),
            Span::styled("Q", Style::default().fg(Color::Red)),
            Span::raw(" to quit"),
        ])];

        Paragraph::new(text).alignment(Alignment::Center)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn snake_styles(role: SnakeRole) -> (Style, Style) {
    match role {
        SnakeRole::Player => (
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            Style::default().fg(Color::Green),
        ),
        SnakeRole::Enemy { alive: true } => (
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            Style::default().fg(Color::LightMagenta),
        ),
        SnakeRole::Enemy { alive: false } => (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        ),
    }
}

/// A width x height rect centered in `area`, clipped to fit
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
