//! Interactive line chart for a single series
//!
//! The plot is drawn on a braille canvas so that terminal cells map linearly
//! onto data coordinates, which is what the hover lookup relies on. Axis
//! labels, titles and the legend are laid out around and over the canvas.
//!
//! ```text
//! ┌──────────────── title ────────────────┐
//! │somnox_ay                   ┌─────────┐│
//! │   4.00 │⡀    ⢀⠔⠢⡀          │── name  ││
//! │        │⠈⠢⣀⠔⠁   ⠈⠢⡀        └─────────┘│
//! │  -3.20 │           ⠈⠢⣀⣀                │
//! │        └──────────────────────────────│
//! │         68580       220982      373384│
//! │                                   Time│
//! └───────────────────────────────────────┘
//! ```

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, Paragraph,
        canvas::{Canvas, Line as Segment, Points},
    },
};

use crate::data::{Bounds, Series, format_annotation};

/// Pointer distance, in terminal cells, within which a point is hovered
pub const HOVER_RADIUS: f64 = 3.0;

/// Points kept per column of canvas width when decimating for drawing
const POINTS_PER_COLUMN: usize = 4;

const LINE_COLOR: Color = Color::Cyan;

/// Screen regions of the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartLayout {
    pub y_title: Rect,
    pub y_labels: Rect,
    pub canvas: Rect,
    pub x_axis: Rect,
    pub x_labels: Rect,
    pub x_title: Rect,
}

impl ChartLayout {
    /// Split the inner area of the chart block
    pub fn new(area: Rect, y_label_width: u16) -> Self {
        // y title row, then the plot, then axis line, tick labels and x title
        let bottom = 3.min(area.height);
        let top = 1.min(area.height - bottom);
        let plot_height = area.height - bottom - top;

        // label column plus the axis line
        let left = (y_label_width + 1).min(area.width);
        let plot_width = area.width - left;

        let row = |y: u16, height: u16| Rect::new(area.x, y, area.width, height);
        let plot_y = area.y + top;

        Self {
            y_title: row(area.y, top),
            y_labels: Rect::new(area.x, plot_y, left, plot_height),
            canvas: Rect::new(area.x + left, plot_y, plot_width, plot_height),
            x_axis: Rect::new(area.x + left.saturating_sub(1), plot_y + plot_height, plot_width + 1, bottom.min(1)),
            x_labels: row(plot_y + plot_height + 1, bottom.saturating_sub(1).min(1)),
            x_title: row(plot_y + plot_height + 2, bottom.saturating_sub(2)),
        }
    }
}

/// Label text for an axis value, with precision chosen from the axis span
pub fn axis_label(value: f64, span: f64) -> String {
    if span.abs() >= 100.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// A line chart of one series with hover annotation
pub struct ChartView {
    title: String,
    x_title: String,
    series: Series,
    bounds: Bounds,
    /// Decimated runs for the current canvas width; NaN cells separate runs
    drawn: Vec<Vec<(f64, f64)>>,
    drawn_width: u16,
    layout: Option<ChartLayout>,
    hovered: Option<usize>,
}

impl ChartView {
    pub fn new(title: impl Into<String>, x_title: impl Into<String>, series: Series) -> Self {
        let bounds = series
            .bounds()
            .unwrap_or(Bounds {
                x_min: 0.0,
                x_max: 1.0,
                y_min: 0.0,
                y_max: 1.0,
            })
            .padded();

        Self {
            title: title.into(),
            x_title: x_title.into(),
            series,
            bounds,
            drawn: Vec::new(),
            drawn_width: 0,
            layout: None,
            hovered: None,
        }
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Layout from the most recent draw
    pub fn layout(&self) -> Option<ChartLayout> {
        self.layout
    }

    /// Runs of points drawn by the last render
    pub fn drawn_runs(&self) -> &[Vec<(f64, f64)>] {
        &self.drawn
    }

    /// The hovered point, if any
    pub fn hovered(&self) -> Option<(f64, f64)> {
        self.hovered.map(|i| self.series.points[i])
    }

    fn y_label_width(&self) -> u16 {
        let span = self.bounds.y_max - self.bounds.y_min;
        [self.bounds.y_min, self.bounds.y_max]
            .iter()
            .map(|&v| axis_label(v, span).len())
            .max()
            .unwrap_or(1)
            .min(u16::MAX as usize) as u16
            + 1
    }

    /// Data coordinates under a terminal cell, `None` outside the canvas
    pub fn data_position(&self, column: u16, row: u16) -> Option<(f64, f64)> {
        let canvas = self.layout?.canvas;
        if canvas.width == 0 || canvas.height == 0 {
            return None;
        }
        if column < canvas.x
            || column >= canvas.x + canvas.width
            || row < canvas.y
            || row >= canvas.y + canvas.height
        {
            return None;
        }

        let fx = (f64::from(column - canvas.x) + 0.5) / f64::from(canvas.width);
        let fy = (f64::from(row - canvas.y) + 0.5) / f64::from(canvas.height);
        let b = self.bounds;

        Some((
            b.x_min + fx * (b.x_max - b.x_min),
            b.y_max - fy * (b.y_max - b.y_min),
        ))
    }

    /// Terminal cell showing a data point, `None` when off the canvas
    pub fn screen_position(&self, x: f64, y: f64) -> Option<(u16, u16)> {
        let canvas = self.layout?.canvas;
        let b = self.bounds;

        let fx = (x - b.x_min) / (b.x_max - b.x_min);
        let fy = (b.y_max - y) / (b.y_max - b.y_min);
        if !(0.0..=1.0).contains(&fx) || !(0.0..=1.0).contains(&fy) {
            return None;
        }

        let col = (fx * f64::from(canvas.width)).floor().min(f64::from(canvas.width) - 1.0);
        let row = (fy * f64::from(canvas.height)).floor().min(f64::from(canvas.height) - 1.0);
        Some((canvas.x + col.max(0.0) as u16, canvas.y + row.max(0.0) as u16))
    }

    /// Cells per data unit on each axis
    fn screen_scale(&self) -> Option<(f64, f64)> {
        let canvas = self.layout?.canvas;
        let b = self.bounds;
        Some((
            f64::from(canvas.width) / (b.x_max - b.x_min),
            f64::from(canvas.height) / (b.y_max - b.y_min),
        ))
    }

    /// Update the hover target for a pointer at a terminal cell
    ///
    /// Returns the annotation text when a point lies within
    /// [`HOVER_RADIUS`] cells of the pointer.
    pub fn hover(&mut self, column: u16, row: u16) -> Option<String> {
        self.hovered = None;

        let (x, y) = self.data_position(column, row)?;
        let scale = self.screen_scale()?;
        let (index, distance) = self.series.nearest(x, y, scale)?;

        if distance > HOVER_RADIUS {
            return None;
        }

        self.hovered = Some(index);
        let (px, py) = self.series.points[index];
        Some(format_annotation(px, py))
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(format!(" {} ", self.title)).centered());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = ChartLayout::new(inner, self.y_label_width());
        self.layout = Some(layout);

        let target = usize::from(layout.canvas.width).max(1) * POINTS_PER_COLUMN;
        if self.drawn_width != layout.canvas.width || self.drawn.is_empty() {
            self.drawn = self.series.decimate(target);
            self.drawn_width = layout.canvas.width;
        }

        self.render_axes(frame, &layout);
        self.render_canvas(frame, &layout);
        self.render_legend(frame, &layout);
        self.render_annotation(frame, &layout);
    }

    fn render_axes(&self, frame: &mut Frame, layout: &ChartLayout) {
        let b = self.bounds;
        let label_style = Style::default().fg(Color::Gray);

        frame.render_widget(
            Paragraph::new(Span::styled(
                self.series.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            layout.y_title,
        );

        // y ticks at the top and bottom rows of the canvas
        let y_span = b.y_max - b.y_min;
        let mut y_lines = vec![Line::raw(""); usize::from(layout.y_labels.height)];
        if let Some(first) = y_lines.first_mut() {
            *first = Line::styled(format!("{} │", axis_label(b.y_max, y_span)), label_style);
        }
        if y_lines.len() > 1 {
            let last = y_lines.len() - 1;
            y_lines[last] = Line::styled(format!("{} │", axis_label(b.y_min, y_span)), label_style);
        }
        for line in y_lines.iter_mut().filter(|l| l.width() == 0) {
            *line = Line::styled("│", label_style);
        }
        frame.render_widget(
            Paragraph::new(y_lines).right_aligned(),
            layout.y_labels,
        );

        let axis = format!("└{}", "─".repeat(usize::from(layout.canvas.width)));
        frame.render_widget(Paragraph::new(Span::styled(axis, label_style)), layout.x_axis);

        // x ticks at the left edge, the middle and the right edge
        let x_span = b.x_max - b.x_min;
        let width = usize::from(layout.x_labels.width);
        let offset = usize::from(layout.canvas.x - layout.x_labels.x);
        let mut row = vec![' '; width];
        let ticks = [
            (0.0, b.x_min),
            (0.5, b.x_min + x_span / 2.0),
            (1.0, b.x_max),
        ];
        for (frac, value) in ticks {
            let label: Vec<char> = axis_label(value, x_span).chars().collect();
            let anchor = offset + (frac * usize::from(layout.canvas.width).saturating_sub(1) as f64) as usize;
            let start = anchor
                .saturating_sub(label.len() / 2)
                .min(width.saturating_sub(label.len()));
            for (i, c) in label.into_iter().enumerate() {
                if let Some(slot) = row.get_mut(start + i) {
                    *slot = c;
                }
            }
        }
        frame.render_widget(
            Paragraph::new(Span::styled(row.into_iter().collect::<String>(), label_style)),
            layout.x_labels,
        );

        frame.render_widget(
            Paragraph::new(Span::styled(
                self.x_title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .right_aligned(),
            layout.x_title,
        );
    }

    fn render_canvas(&self, frame: &mut Frame, layout: &ChartLayout) {
        let b = self.bounds;
        let hovered = self.hovered();

        let canvas = Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([b.x_min, b.x_max])
            .y_bounds([b.y_min, b.y_max])
            .paint(|ctx| {
                for run in &self.drawn {
                    for pair in run.windows(2) {
                        ctx.draw(&Segment {
                            x1: pair[0].0,
                            y1: pair[0].1,
                            x2: pair[1].0,
                            y2: pair[1].1,
                            color: LINE_COLOR,
                        });
                    }
                    // an isolated sample between two gaps
                    if run.len() == 1 {
                        ctx.draw(&Points {
                            coords: run,
                            color: LINE_COLOR,
                        });
                    }
                }
                if let Some((x, y)) = hovered {
                    ctx.layer();
                    ctx.draw(&Points {
                        coords: &[(x, y)],
                        color: Color::Yellow,
                    });
                }
            });

        frame.render_widget(canvas, layout.canvas);
    }

    fn render_legend(&self, frame: &mut Frame, layout: &ChartLayout) {
        let text = format!("── {}", self.series.name);
        let width = (text.chars().count() as u16 + 2).min(layout.canvas.width);
        let height = 3.min(layout.canvas.height);
        if width == 0 || height == 0 {
            return;
        }

        let area = Rect::new(
            layout.canvas.x + layout.canvas.width - width,
            layout.canvas.y,
            width,
            height,
        );
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(LINE_COLOR)))
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
    }

    fn render_annotation(&self, frame: &mut Frame, layout: &ChartLayout) {
        let Some((x, y)) = self.hovered() else {
            return;
        };
        let Some((col, row)) = self.screen_position(x, y) else {
            return;
        };

        let text = format_annotation(x, y);
        let width = text.lines().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 2;
        let height = text.lines().count() as u16 + 2;

        let canvas = layout.canvas;
        if width > canvas.width || height > canvas.height {
            return;
        }

        // Up and to the right of the point, flipped when it would leave the canvas
        let right = canvas.x + canvas.width;
        let ax = if col + 2 + width <= right {
            col + 2
        } else {
            col.saturating_sub(width + 1).max(canvas.x)
        };
        let ay = if row >= canvas.y + height {
            row - height
        } else {
            (row + 1).min(canvas.y + canvas.height - height)
        };

        let area = Rect::new(ax, ay, width, height);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(Text::from(text)).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow)),
            ),
            area,
        );
    }
}
