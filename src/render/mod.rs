//! Terminal and file rendering
//!
//! - [`Renderer`] draws the snake board
//! - [`ChartView`] draws an interactive line chart
//! - [`export_svg`] writes a chart to disk

pub mod chart;
pub mod export;
pub mod renderer;

pub use chart::ChartView;
pub use export::export_svg;
pub use renderer::{BoardStatus, Renderer};
