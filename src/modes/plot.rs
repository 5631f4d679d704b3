//! Sensor-data viewer
//!
//! Loads a CSV, keeps rows inside a time window and shows one column against
//! time in an interactive terminal chart. Pointing at the line shows the
//! nearest sample's time and value.
//!
//! # Controls
//!
//! - Mouse: hover to annotate the nearest point
//! - Q/Esc/Ctrl+C: Quit
//!
//! # Example
//!
//! ```rust,ignore
//! use ml_lab::modes::{PlotConfig, PlotMode};
//!
//! let mut plot_mode = PlotMode::new(PlotConfig::default())?;
//! plot_mode.run().await?;
//! ```

use anyhow::{Context, Result};
use crossterm::{
    event::{
        DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        EventStream,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{Stderr, stderr},
    path::PathBuf,
    time::Duration,
};
use tokio::time::interval;

use crate::data::{Dataset, Series, TimeRange};
use crate::input::{InputHandler, ViewerAction};
use crate::render::{ChartView, export_svg};

/// Configuration for plot mode
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    pub csv_path: PathBuf,
    pub time_column: String,
    pub value_column: String,

    /// Rows kept, inclusive on both ends
    pub range: TimeRange,

    /// Figure size in inches
    ///
    /// Only the SVG export uses it; the terminal viewer fills the terminal.
    pub figure_size: (f64, f64),

    /// Also write the chart to this SVG file
    pub export: Option<PathBuf>,
    pub export_dpi: u32,

    /// Open the terminal viewer; when false only the export runs
    pub interactive: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("testfile_somnox_labeled.csv"),
            time_column: "time".to_string(),
            value_column: "somnox_ay".to_string(),
            range: TimeRange::new(68580.0, 373384.0),
            figure_size: (25.0, 8.0),
            export: None,
            export_dpi: 100,
            interactive: true,
        }
    }
}

/// Plot mode: a filtered time series and its viewer
pub struct PlotMode {
    config: PlotConfig,
    series: Series,
    rows_loaded: usize,
}

impl PlotMode {
    /// Load the CSV and build the series to plot
    pub fn new(config: PlotConfig) -> Result<Self> {
        let dataset = Dataset::from_csv_path(&config.csv_path, &config.time_column)
            .with_context(|| format!("Failed to load {}", config.csv_path.display()))?;

        let filtered = dataset.filter_time(config.range);
        if filtered.is_empty() {
            tracing::warn!(
                start = config.range.start,
                end = config.range.end,
                "no rows inside the time range"
            );
        }

        let series = filtered
            .series(&config.value_column)
            .with_context(|| format!("Failed to read column {:?}", config.value_column))?;

        tracing::info!(
            rows = dataset.len(),
            kept = filtered.len(),
            column = %config.value_column,
            "prepared series"
        );

        Ok(Self {
            config,
            series,
            rows_loaded: dataset.len(),
        })
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn rows_loaded(&self) -> usize {
        self.rows_loaded
    }

    /// Write the configured export, if any
    pub fn export(&self) -> Result<Option<PathBuf>> {
        let Some(path) = &self.config.export else {
            return Ok(None);
        };

        export_svg(
            &self.series,
            &self.config.value_column,
            path,
            self.config.figure_size,
            self.config.export_dpi,
        )
        .with_context(|| format!("Failed to export chart to {}", path.display()))?;

        Ok(Some(path.clone()))
    }

    /// Export, then show the viewer until the user closes it
    pub async fn run(&mut self) -> Result<()> {
        self.export()?;

        if !self.config.interactive {
            return Ok(());
        }

        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut terminal = setup_or_restore(Self::setup_terminal, || {
            let _ = execute!(
                stderr(),
                DisableFocusChange,
                DisableMouseCapture,
                LeaveAlternateScreen
            );
            let _ = disable_raw_mode();
        })?;

        let mut view = ChartView::new(self.config.value_column.clone(), "Time", self.series.clone());
        let result = Self::view_loop(&mut terminal, &mut view).await;

        Self::cleanup_terminal(&mut terminal)?;

        result
    }

    fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stderr>>> {
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)
            .context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;
        Ok(terminal)
    }

    async fn view_loop(
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
        view: &mut ChartView,
    ) -> Result<()> {
        let handler = InputHandler::new();
        let mut events = EventStream::new();
        let mut render_timer = interval(Duration::from_millis(33));
        let mut dirty = true;

        loop {
            tokio::select! {
                maybe_event = events.next() => {
                    let Some(event) = maybe_event else {
                        break;
                    };
                    let event = event.context("Failed to read terminal event")?;

                    match handler.handle_event(&event) {
                        ViewerAction::Quit => break,
                        ViewerAction::Hover { column, row } => {
                            view.hover(column, row);
                            dirty = true;
                        }
                        ViewerAction::ClearHover => {
                            view.clear_hover();
                            dirty = true;
                        }
                        ViewerAction::Redraw => dirty = true,
                        ViewerAction::None => {}
                    }
                }

                _ = render_timer.tick() => {
                    if dirty {
                        terminal
                            .draw(|frame| view.render(frame))
                            .context("Failed to draw chart")?;
                        dirty = false;
                    }
                }
            }
        }

        Ok(())
    }

    fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<Stderr>>) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(
            terminal.backend_mut(),
            DisableFocusChange,
            DisableMouseCapture,
            LeaveAlternateScreen
        )
        .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    }
}

/// Run `setup`, calling `restore` if it fails
fn setup_or_restore<T>(setup: impl FnOnce() -> Result<T>, restore: impl FnOnce()) -> Result<T> {
    setup().inspect_err(|_| restore())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, tempdir};

    fn csv_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "time,somnox_ay,somnox_az").unwrap();
        for t in [1000, 68580, 100000, 250000, 373384, 400000] {
            writeln!(file, "{t},{},{}", t as f64 / 1e5, -1.0).unwrap();
        }
        file
    }

    fn config_for(file: &NamedTempFile) -> PlotConfig {
        PlotConfig {
            csv_path: file.path().to_path_buf(),
            interactive: false,
            ..PlotConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = PlotConfig::default();
        assert_eq!(config.csv_path, PathBuf::from("testfile_somnox_labeled.csv"));
        assert_eq!(config.range, TimeRange::new(68580.0, 373384.0));
        assert_eq!(config.figure_size, (25.0, 8.0));
        assert!(config.export.is_none());
    }

    #[test]
    fn test_new_filters_series() {
        let file = csv_file();
        let mode = PlotMode::new(config_for(&file)).unwrap();

        assert_eq!(mode.rows_loaded(), 6);
        assert_eq!(mode.series().name, "somnox_ay");
        let times: Vec<f64> = mode.series().points.iter().map(|p| p.0).collect();
        assert_eq!(times, vec![68580.0, 100000.0, 250000.0, 373384.0]);
    }

    #[test]
    fn test_missing_file_fails() {
        let config = PlotConfig {
            csv_path: PathBuf::from("/nonexistent/somnox.csv"),
            ..PlotConfig::default()
        };
        let err = PlotMode::new(config).err().unwrap();
        assert!(format!("{err:#}").contains("dataset not found"));
    }

    #[test]
    fn test_missing_column_fails() {
        let file = csv_file();
        let config = PlotConfig {
            value_column: "somnox_ax".to_string(),
            ..config_for(&file)
        };
        assert!(PlotMode::new(config).is_err());
    }

    #[tokio::test]
    async fn test_run_without_viewer_exports() {
        let file = csv_file();
        let dir = tempdir().unwrap();
        let out = dir.path().join("somnox.svg");
        let config = PlotConfig {
            export: Some(out.clone()),
            export_dpi: 20,
            ..config_for(&file)
        };

        let mut mode = PlotMode::new(config).unwrap();
        mode.run().await.unwrap();

        assert!(out.exists());
    }

    #[test]
    fn test_failed_setup_restores_terminal() {
        let mut restored = false;
        let result: Result<()> =
            setup_or_restore(|| Err(anyhow::anyhow!("no terminal")), || restored = true);

        assert!(result.is_err());
        assert!(restored);
    }

    #[test]
    fn test_successful_setup_keeps_terminal() {
        let mut restored = false;
        let value = setup_or_restore(|| Ok(7), || restored = true).unwrap();

        assert_eq!(value, 7);
        assert!(!restored);
    }

    #[test]
    fn test_export_is_skipped_without_path() {
        let file = csv_file();
        let mode = PlotMode::new(config_for(&file)).unwrap();
        assert_eq!(mode.export().unwrap(), None);
    }
}
