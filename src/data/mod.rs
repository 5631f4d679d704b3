//! Tabular sensor data: CSV loading, time-range filtering and plottable series

pub mod dataset;
pub mod series;

pub use dataset::{Dataset, DatasetError, TimeRange};
pub use series::{Bounds, Series, format_annotation};
