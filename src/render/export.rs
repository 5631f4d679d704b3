//! Static SVG rendering of a series

use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;

use crate::data::Series;

/// Pixel size of a figure given in inches
pub fn figure_pixels(figure_size: (f64, f64), dpi: u32) -> (u32, u32) {
    let px = |inches: f64| (inches * f64::from(dpi)).round().max(1.0) as u32;
    (px(figure_size.0), px(figure_size.1))
}

/// Write `series` as a line chart with `Time` on the x axis
///
/// NaN cells break the line.
pub fn export_svg(
    series: &Series,
    title: &str,
    path: &Path,
    figure_size: (f64, f64),
    dpi: u32,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let bounds = series
        .bounds()
        .context("series has no finite points to plot")?
        .padded();
    let size = figure_pixels(figure_size, dpi);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(12)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(bounds.x_min..bounds.x_max, bounds.y_min..bounds.y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time")
        .y_desc(series.name.as_str())
        .draw()?;

    for (i, segment) in series.segments().into_iter().enumerate() {
        let drawn = chart.draw_series(LineSeries::new(segment, BLUE))?;
        if i == 0 {
            drawn
                .label(series.name.as_str())
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), width = size.0, height = size.1, "exported chart");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_figure_pixels() {
        assert_eq!(figure_pixels((25.0, 8.0), 100), (2500, 800));
        assert_eq!(figure_pixels((0.0, 1.0), 10), (1, 10));
    }

    #[test]
    fn test_export_writes_svg() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plots").join("somnox.svg");
        let series = Series::new(
            "somnox_ay",
            (0..200).map(|i| (68580.0 + i as f64, (i as f64 / 10.0).cos())).collect(),
        );

        export_svg(&series, "somnox_ay", &path, (8.0, 4.0), 50).unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Time"));
        assert!(svg.contains("somnox_ay"));
    }

    #[test]
    fn test_export_empty_series_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.svg");

        assert!(export_svg(&Series::new("s", vec![]), "s", &path, (4.0, 3.0), 50).is_err());
        assert!(!path.exists());
    }
}
