use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use super::series::Series;

/// Errors raised while loading or querying a dataset
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to open {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error on line {line}: {message}")]
    Parse { line: u64, message: String },
    #[error("missing column: {0}")]
    MissingColumn(String),
}

impl DatasetError {
    fn from_csv(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        Self::Parse {
            line,
            message: err.to_string(),
        }
    }
}

/// Inclusive time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

/// A headed CSV table with one numeric time column
///
/// Rows keep their original order and all of their columns. Cells other than
/// the time column are parsed only when a series is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    times: Vec<f64>,
    /// CSV line of each row, for error messages
    lines: Vec<u64>,
    time_column: usize,
}

impl Dataset {
    /// Load a CSV file
    pub fn from_csv_path(path: &Path, time_column: &str) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => DatasetError::NotFound {
                path: path.to_path_buf(),
            },
            _ => DatasetError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let dataset = Self::from_reader(file, time_column)?;
        tracing::info!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.headers.len(),
            "loaded dataset"
        );
        Ok(dataset)
    }

    /// Parse CSV text from any reader; the first record is the header
    pub fn from_reader<R: Read>(reader: R, time_column: &str) -> Result<Self, DatasetError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = reader.headers().map_err(DatasetError::from_csv)?.clone();
        let time_index = column_index(&headers, time_column)?;

        let mut rows = Vec::new();
        let mut times = Vec::new();
        let mut lines = Vec::new();

        for record in reader.records() {
            let record = record.map_err(DatasetError::from_csv)?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let cell = record.get(time_index).unwrap_or("");
            let time = parse_number(cell).ok_or_else(|| DatasetError::Parse {
                line,
                message: format!("time value {cell:?} is not a number"),
            })?;

            times.push(time);
            lines.push(line);
            rows.push(record);
        }

        Ok(Self {
            headers,
            rows,
            times,
            lines,
            time_column: time_index,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> Vec<&str> {
        self.headers.iter().collect()
    }

    pub fn time_column(&self) -> &str {
        self.headers.get(self.time_column).unwrap_or("")
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Rows whose time lies in `range`, as a new dataset
    pub fn filter_time(&self, range: TimeRange) -> Dataset {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| range.contains(self.times[i]))
            .collect();

        let filtered = Dataset {
            headers: self.headers.clone(),
            rows: keep.iter().map(|&i| self.rows[i].clone()).collect(),
            times: keep.iter().map(|&i| self.times[i]).collect(),
            lines: keep.iter().map(|&i| self.lines[i]).collect(),
            time_column: self.time_column,
        };

        tracing::debug!(
            before = self.len(),
            after = filtered.len(),
            start = range.start,
            end = range.end,
            "filtered dataset by time"
        );
        filtered
    }

    /// `(time, value)` points of `column`
    ///
    /// Empty cells become NaN; any other non-numeric cell is an error.
    pub fn series(&self, column: &str) -> Result<Series, DatasetError> {
        let index = column_index(&self.headers, column)?;

        let points = self
            .rows
            .iter()
            .zip(&self.times)
            .zip(&self.lines)
            .map(|((row, &time), &line)| {
                let cell = row.get(index).unwrap_or("").trim();
                if cell.is_empty() {
                    return Ok((time, f64::NAN));
                }
                parse_number(cell)
                    .map(|value| (time, value))
                    .ok_or_else(|| DatasetError::Parse {
                        line,
                        message: format!("{column} value {cell:?} is not a number"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Series::new(column, points))
    }
}

fn column_index(headers: &StringRecord, column: &str) -> Result<usize, DatasetError> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| DatasetError::MissingColumn(column.to_string()))
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
time,somnox_ay,label
100,0.5,a
68580,1.25,b
200000,-3.2,c
373384,4.0,d
400000,9.9,e
";

    fn sample() -> Dataset {
        Dataset::from_reader(SAMPLE.as_bytes(), "time").unwrap()
    }

    #[test]
    fn test_load_preserves_columns_and_order() {
        let dataset = sample();

        assert_eq!(dataset.len(), 5);
        assert_eq!(dataset.columns(), vec!["time", "somnox_ay", "label"]);
        assert_eq!(dataset.time_column(), "time");
        assert_eq!(
            dataset.times(),
            &[100.0, 68580.0, 200000.0, 373384.0, 400000.0]
        );
    }

    #[test]
    fn test_filter_is_inclusive() {
        let filtered = sample().filter_time(TimeRange::new(68580.0, 373384.0));

        assert_eq!(filtered.times(), &[68580.0, 200000.0, 373384.0]);
        assert_eq!(filtered.columns(), sample().columns());
    }

    #[test]
    fn test_filter_to_empty() {
        let filtered = sample().filter_time(TimeRange::new(0.0, 50.0));
        assert!(filtered.is_empty());
        assert!(filtered.series("somnox_ay").unwrap().points.is_empty());
    }

    #[test]
    fn test_series_values() {
        let series = sample().series("somnox_ay").unwrap();

        assert_eq!(series.name, "somnox_ay");
        assert_eq!(series.points[2], (200000.0, -3.2));
    }

    #[test]
    fn test_missing_column() {
        let err = sample().series("somnox_az").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(ref c) if c == "somnox_az"));

        let err = Dataset::from_reader(SAMPLE.as_bytes(), "timestamp").unwrap_err();
        assert!(matches!(err, DatasetError::MissingColumn(_)));
    }

    #[test]
    fn test_non_numeric_time_is_parse_error() {
        let csv = "time,somnox_ay\n1,2\nnoon,3\n";
        let err = Dataset::from_reader(csv.as_bytes(), "time").unwrap_err();

        match err {
            DatasetError::Parse { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("noon"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ragged_row_is_parse_error() {
        let csv = "time,somnox_ay\n1,2\n3,4,5\n";
        let err = Dataset::from_reader(csv.as_bytes(), "time").unwrap_err();
        assert!(matches!(err, DatasetError::Parse { .. }));
    }

    #[test]
    fn test_empty_value_cell_is_nan() {
        let csv = "time,somnox_ay\n1,\n2,0.5\n";
        let series = Dataset::from_reader(csv.as_bytes(), "time")
            .unwrap()
            .series("somnox_ay")
            .unwrap();

        assert!(series.points[0].1.is_nan());
        assert_eq!(series.points[1], (2.0, 0.5));
    }

    #[test]
    fn test_non_numeric_value_is_parse_error() {
        let csv = "time,somnox_ay\n1,abc\n";
        let dataset = Dataset::from_reader(csv.as_bytes(), "time").unwrap();
        assert!(matches!(
            dataset.series("somnox_ay"),
            Err(DatasetError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let dataset = Dataset::from_csv_path(file.path(), "time").unwrap();
        assert_eq!(dataset, sample());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = Dataset::from_csv_path(Path::new("/nonexistent/data.csv"), "time").unwrap_err();
        assert!(matches!(err, DatasetError::NotFound { .. }));
        assert!(err.to_string().contains("/nonexistent/data.csv"));
    }
}
