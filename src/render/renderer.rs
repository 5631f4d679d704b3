use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::game::{GameState, Position};

/// Counters shown above the board
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardStatus {
    pub episode: usize,
}

/// Draws a snake board as a header line plus a bordered grid
pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Terminal rows needed for a board `grid_height` cells tall
    pub fn height_for(grid_height: usize) -> u16 {
        // header + top and bottom border
        (grid_height + 3).min(u16::MAX as usize) as u16
    }

    pub fn render(&self, frame: &mut Frame, state: &GameState, status: &BoardStatus) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Header
                Constraint::Min(0),    // Board
            ])
            .split(frame.area());

        frame.render_widget(self.render_stats(state, status), chunks[0]);

        // Two terminal columns per cell plus the border
        let board_width = (state.grid_width * 2 + 2).min(u16::MAX as usize) as u16;
        let board_area = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(board_width), Constraint::Min(0)])
            .split(chunks[1])[0];

        frame.render_widget(self.render_grid(state), board_area);
    }

    fn render_grid(&self, state: &GameState) -> Paragraph<'static> {
        let mut lines = Vec::with_capacity(state.grid_height);

        for y in 0..state.grid_height {
            let spans: Vec<Span> = (0..state.grid_width)
                .map(|x| Self::cell(state, Position::new(x as i32, y as i32)))
                .collect();
            lines.push(Line::from(spans));
        }

        let border_color = if state.is_alive() {
            Color::White
        } else {
            Color::Red
        };

        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(border_color)),
        )
    }

    fn cell(state: &GameState, pos: Position) -> Span<'static> {
        for (idx, snake) in state.snakes.iter().enumerate() {
            if !snake.body.contains(&pos) {
                continue;
            }

            let is_head = snake.head() == pos;
            let color = match (idx, snake.alive) {
                (_, false) => Color::DarkGray,
                (0, true) if is_head => Color::Cyan,
                (0, true) => Color::Green,
                (_, true) if is_head => Color::Magenta,
                (_, true) => Color::Yellow,
            };
            let glyph = if is_head { "■ " } else { "□ " };

            return Span::styled(glyph, Style::default().fg(color).add_modifier(Modifier::BOLD));
        }

        if state.food == Some(pos) {
            Span::styled(
                "O ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(". ", Style::default().fg(Color::DarkGray))
        }
    }

    fn render_stats(&self, state: &GameState, status: &BoardStatus) -> Paragraph<'static> {
        let text = Line::from(vec![
            Span::styled("Episode: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                status.episode.to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled("Score: ", Style::default().fg(Color::Yellow)),
            Span::styled(state.score().to_string(), Style::default().fg(Color::White)),
            Span::raw("  "),
            Span::styled("Steps: ", Style::default().fg(Color::Yellow)),
            Span::styled(state.steps.to_string(), Style::default().fg(Color::White)),
        ]);

        Paragraph::new(text).alignment(Alignment::Left)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Direction as Heading, Snake};
    use ratatui::{Terminal, backend::TestBackend};

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_height_for() {
        assert_eq!(Renderer::height_for(7), 10);
    }

    #[test]
    fn test_render_draws_snake_food_and_header() {
        let snake = Snake::new(Position::new(3, 3), Heading::Right, 2);
        let state = GameState::single(snake, Position::new(0, 0), 7, 7);
        let status = BoardStatus { episode: 4 };

        let mut terminal = Terminal::new(TestBackend::new(20, Renderer::height_for(7))).unwrap();
        terminal
            .draw(|frame| Renderer::new().render(frame, &state, &status))
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Episode: 4"));
        assert!(text.contains('■'));
        assert!(text.contains('□'));
        assert!(text.contains('O'));
    }

    #[test]
    fn test_cell_symbols() {
        let snake = Snake::new(Position::new(3, 3), Heading::Right, 2);
        let state = GameState::single(snake, Position::new(5, 5), 7, 7);

        assert_eq!(Renderer::cell(&state, Position::new(3, 3)).content, "■ ");
        assert_eq!(Renderer::cell(&state, Position::new(2, 3)).content, "□ ");
        assert_eq!(Renderer::cell(&state, Position::new(5, 5)).content, "O ");
        assert_eq!(Renderer::cell(&state, Position::new(0, 0)).content, ". ");
    }
}
