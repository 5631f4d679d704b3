/// Text shown next to a hovered point
///
/// ```rust
/// use ml_lab::data::format_annotation;
///
/// assert_eq!(format_annotation(100.456, -3.2), "Time: 100.46\nValue: -3.20");
/// ```
pub fn format_annotation(x: f64, y: f64) -> String {
    format!("Time: {x:.2}\nValue: {y:.2}")
}

/// Axis-aligned extent of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    /// Grow degenerate ranges so both axes have a non-zero span
    pub fn padded(self) -> Self {
        let pad = |lo: f64, hi: f64| {
            if hi > lo {
                (lo, hi)
            } else {
                (lo - 0.5, hi + 0.5)
            }
        };
        let (x_min, x_max) = pad(self.x_min, self.x_max);
        let (y_min, y_max) = pad(self.y_min, self.y_max);
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }
}

/// A named line of `(x, y)` points in input order
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    pub fn new(name: impl Into<String>, points: Vec<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Finite points only; NaN cells are gaps in the line
    pub fn finite_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
    }

    /// Extent of the finite points, `None` when there are none
    pub fn bounds(&self) -> Option<Bounds> {
        self.finite_points().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Bounds {
                    x_min: x,
                    x_max: x,
                    y_min: y,
                    y_max: y,
                },
                Some(b) => Bounds {
                    x_min: b.x_min.min(x),
                    x_max: b.x_max.max(x),
                    y_min: b.y_min.min(y),
                    y_max: b.y_max.max(y),
                },
            })
        })
    }

    /// Index of the point closest to `(x, y)` after scaling each axis
    ///
    /// `scale` converts data units to screen units per axis, so distances are
    /// measured the way the user sees them. Returns the index and the screen
    /// distance.
    pub fn nearest(&self, x: f64, y: f64, scale: (f64, f64)) -> Option<(usize, f64)> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, (px, py))| px.is_finite() && py.is_finite())
            .map(|(i, &(px, py))| {
                let dx = (px - x) * scale.0;
                let dy = (py - y) * scale.1;
                (i, dx.hypot(dy))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Runs of consecutive finite points; NaN cells end a run
    pub fn segments(&self) -> Vec<Vec<(f64, f64)>> {
        let mut out = Vec::new();
        let mut current = Vec::new();

        for &(x, y) in &self.points {
            if x.is_finite() && y.is_finite() {
                current.push((x, y));
            } else if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }

    /// Decimated [`segments`](Self::segments), about `2 * buckets` points in total
    ///
    /// The bucket budget is shared between runs by length, and each run keeps
    /// at least one bucket, so gaps are never bridged.
    pub fn decimate(&self, buckets: usize) -> Vec<Vec<(f64, f64)>> {
        let segments = self.segments();
        let total: usize = segments.iter().map(Vec::len).sum();

        segments
            .iter()
            .map(|run| {
                let share = (buckets * run.len()).checked_div(total).unwrap_or(0).max(1);
                decimate_run(run, share)
            })
            .collect()
    }
}

/// Reduce to at most `2 * buckets` points, keeping each bucket's min and max
///
/// Points are bucketed by position, and each bucket's extremes are emitted in
/// their original order, so spikes survive.
fn decimate_run(points: &[(f64, f64)], buckets: usize) -> Vec<(f64, f64)> {
    if buckets == 0 || points.len() <= buckets * 2 {
        return points.to_vec();
    }

    let chunk = points.len().div_ceil(buckets);
    let mut out = Vec::with_capacity(buckets * 2);

    for bucket in points.chunks(chunk) {
        let (mut lo, mut hi) = (0, 0);
        for (i, p) in bucket.iter().enumerate() {
            if p.1 < bucket[lo].1 {
                lo = i;
            }
            if p.1 > bucket[hi].1 {
                hi = i;
            }
        }

        match lo.cmp(&hi) {
            std::cmp::Ordering::Less => out.extend([bucket[lo], bucket[hi]]),
            std::cmp::Ordering::Greater => out.extend([bucket[hi], bucket[lo]]),
            std::cmp::Ordering::Equal => out.push(bucket[lo]),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_annotation() {
        assert_eq!(format_annotation(100.456, -3.2), "Time: 100.46\nValue: -3.20");
        assert_eq!(format_annotation(68580.0, 0.0), "Time: 68580.00\nValue: 0.00");
    }

    #[test]
    fn test_bounds_skip_nan() {
        let series = Series::new("s", vec![(1.0, 5.0), (2.0, f64::NAN), (3.0, -1.0)]);

        assert_eq!(
            series.bounds(),
            Some(Bounds {
                x_min: 1.0,
                x_max: 3.0,
                y_min: -1.0,
                y_max: 5.0
            })
        );
        assert_eq!(Series::new("empty", vec![]).bounds(), None);
    }

    #[test]
    fn test_padded_bounds() {
        let bounds = Series::new("flat", vec![(1.0, 2.0)]).bounds().unwrap().padded();
        assert!(bounds.x_max > bounds.x_min);
        assert!(bounds.y_max > bounds.y_min);
    }

    #[test]
    fn test_nearest_uses_screen_scale() {
        let series = Series::new("s", vec![(0.0, 0.0), (10.0, 1.0)]);

        // In data units (1, 1) is closer to (0, 0)...
        assert_eq!(series.nearest(1.0, 1.0, (1.0, 1.0)).unwrap().0, 0);
        // ...but with a squashed x axis and a stretched y axis it is closer to (10, 1)
        assert_eq!(series.nearest(1.0, 1.0, (0.01, 100.0)).unwrap().0, 1);
    }

    #[test]
    fn test_nearest_skips_nan_and_empty() {
        let series = Series::new("s", vec![(0.0, f64::NAN), (5.0, 5.0)]);
        assert_eq!(series.nearest(0.0, 0.0, (1.0, 1.0)).unwrap().0, 1);
        assert!(Series::new("empty", vec![]).nearest(0.0, 0.0, (1.0, 1.0)).is_none());
    }

    #[test]
    fn test_decimate_keeps_extremes() {
        let mut points: Vec<(f64, f64)> = (0..1000).map(|i| (i as f64, 0.0)).collect();
        points[321].1 = 50.0;
        points[777].1 = -50.0;
        let series = Series::new("s", points);

        let runs = series.decimate(10);
        assert_eq!(runs.len(), 1);
        let reduced = &runs[0];

        assert!(reduced.len() <= 20);
        assert!(reduced.contains(&(321.0, 50.0)));
        assert!(reduced.contains(&(777.0, -50.0)));
        assert!(reduced.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_decimate_small_series_is_unchanged() {
        let series = Series::new("s", vec![(0.0, 1.0), (1.0, 2.0)]);
        assert_eq!(series.decimate(10), vec![series.points.clone()]);
    }

    #[test]
    fn test_segments_split_at_nan() {
        let series = Series::new(
            "s",
            vec![(0.0, 1.0), (1.0, f64::NAN), (2.0, 2.0), (3.0, 3.0), (4.0, f64::NAN)],
        );

        assert_eq!(
            series.segments(),
            vec![vec![(0.0, 1.0)], vec![(2.0, 2.0), (3.0, 3.0)]]
        );
    }

    #[test]
    fn test_decimate_keeps_gaps() {
        let mut points: Vec<(f64, f64)> = (0..400).map(|i| (i as f64, (i % 7) as f64)).collect();
        points[100].1 = f64::NAN;
        points[300].1 = f64::NAN;
        let series = Series::new("s", points);

        let runs = series.decimate(20);

        assert_eq!(runs.len(), 3);
        assert!(runs[0].iter().all(|p| p.0 < 100.0));
        assert!(runs[1].iter().all(|p| p.0 > 100.0 && p.0 < 300.0));
        assert!(runs[2].iter().all(|p| p.0 > 300.0));
        assert!(runs.iter().map(Vec::len).sum::<usize>() <= 2 * 20 + 6);
    }
}
