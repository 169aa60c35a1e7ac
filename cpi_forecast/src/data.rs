//! Monthly time series handling and CSV loading

use crate::calendar::month_start;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// Date formats accepted in the date column, tried in order
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// One monthly observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "CPI")]
    pub value: f64,
}

/// Chronologically ordered monthly series, one observation per month.
///
/// Dates are normalised to the first of their month. The series is never
/// empty and is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

/// Descriptive statistics shown next to the raw series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub observations: usize,
    pub first_month: NaiveDate,
    pub last_month: NaiveDate,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub last_value: f64,
}

impl TimeSeries {
    /// Build a series from (date, value) pairs in any order.
    ///
    /// Fails with `EmptySeries` for no points, and with `MalformedInput` for
    /// non-finite values or two points falling in the same month.
    pub fn new(points: Vec<(NaiveDate, f64)>) -> Result<Self> {
        if points.is_empty() {
            return Err(ForecastError::EmptySeries);
        }

        let mut points: Vec<(NaiveDate, f64)> = points
            .into_iter()
            .map(|(date, value)| (month_start(date), value))
            .collect();

        if let Some((date, value)) = points.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ForecastError::MalformedInput(format!(
                "Non-finite value {} for {}",
                value,
                date.format("%Y-%m")
            )));
        }

        points.sort_by_key(|(date, _)| *date);

        if let Some(pair) = points.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ForecastError::MalformedInput(format!(
                "Duplicate observations for month {}",
                pair[0].0.format("%Y-%m")
            )));
        }

        let (dates, values) = points.into_iter().unzip();
        Ok(Self { dates, values })
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no observations; never true for a constructed series
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Month starts, ascending
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Observed values aligned with [`TimeSeries::dates`]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Most recent month
    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Most recent observed value
    pub fn last_value(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.dates
            .iter()
            .zip(&self.values)
            .map(|(&date, &value)| Observation { date, value })
            .collect()
    }

    /// Split off the last `months` observations.
    ///
    /// Returns the shortened series and the withheld values. At least one
    /// observation must remain.
    pub fn split_holdout(&self, months: usize) -> Result<(TimeSeries, Vec<f64>)> {
        if months == 0 || months >= self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Holdout of {} months must be between 1 and {} for a series of {}",
                months,
                self.len().saturating_sub(1),
                self.len()
            )));
        }
        let cut = self.len() - months;
        let training = TimeSeries {
            dates: self.dates[..cut].to_vec(),
            values: self.values[..cut].to_vec(),
        };
        Ok((training, self.values[cut..].to_vec()))
    }

    pub fn summary(&self) -> SeriesSummary {
        let min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = self.values.iter().sum::<f64>() / self.len() as f64;
        SeriesSummary {
            observations: self.len(),
            first_month: self.dates[0],
            last_month: self.last_date(),
            min,
            max,
            mean,
            last_value: self.last_value(),
        }
    }
}

/// Loader for dated single-value CSV files
#[derive(Debug, Clone)]
pub struct DataLoader {
    date_column: String,
    value_column: String,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new("Date", "CPI")
    }
}

impl DataLoader {
    /// Loader reading the given date and value columns
    pub fn new(date_column: impl Into<String>, value_column: impl Into<String>) -> Self {
        Self {
            date_column: date_column.into(),
            value_column: value_column.into(),
        }
    }

    /// Load a `Date`,`CPI` CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeries> {
        Self::default().load_csv(path)
    }

    /// Load a CSV file using this loader's column names
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<TimeSeries> {
        let path = path.as_ref();
        let contents = std::fs::read(path)?;

        // Header-only or blank files have no observations
        let data_lines = contents
            .split(|&b| b == b'\n')
            .skip(1)
            .filter(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
            .count();
        if data_lines == 0 {
            return Err(ForecastError::EmptySeries);
        }

        let df = CsvReader::new(Cursor::new(contents))
            .has_header(true)
            .infer_schema(Some(100))
            .finish()?;

        let series = self.load_dataframe(&df)?;
        info!(
            path = %path.display(),
            observations = series.len(),
            last_month = %series.last_date(),
            "loaded monthly series"
        );
        Ok(series)
    }

    /// Load a Parquet file using this loader's column names
    pub fn load_parquet<P: AsRef<Path>>(&self, path: P) -> Result<TimeSeries> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let df = ParquetReader::new(file).finish()?;

        let series = self.load_dataframe(&df)?;
        info!(
            path = %path.display(),
            observations = series.len(),
            last_month = %series.last_date(),
            "loaded monthly series"
        );
        Ok(series)
    }

    /// Load by file extension: `.parquet` as Parquet, anything else as CSV
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<TimeSeries> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => self.load_parquet(path),
            _ => self.load_csv(path),
        }
    }

    /// Build a series from an already loaded DataFrame
    pub fn load_dataframe(&self, df: &DataFrame) -> Result<TimeSeries> {
        if df.height() == 0 {
            return Err(ForecastError::EmptySeries);
        }

        let date_column = self.resolve_date_column(df)?;
        let value_column = self.resolve_value_column(df, &date_column)?;
        debug!(%date_column, %value_column, "resolved input columns");

        let dates = df.column(&date_column)?.cast(&DataType::Utf8)?;
        let values = df.column(&value_column)?.cast(&DataType::Float64)?;

        let points = dates
            .utf8()?
            .into_iter()
            .zip(values.f64()?.into_iter())
            .enumerate()
            .map(|(row, (date, value))| {
                let date = date.ok_or_else(|| {
                    ForecastError::MalformedInput(format!("Missing date in row {}", row + 1))
                })?;
                let value = value.ok_or_else(|| {
                    ForecastError::MalformedInput(format!(
                        "Missing or non-numeric {} value in row {}",
                        value_column,
                        row + 1
                    ))
                })?;
                Ok((parse_date(date)?, value))
            })
            .collect::<Result<Vec<_>>>()?;

        TimeSeries::new(points)
    }

    fn resolve_date_column(&self, df: &DataFrame) -> Result<String> {
        let names = df.get_column_names();
        if let Some(name) = find_column(&names, &self.date_column) {
            return Ok(name);
        }

        // Fall back to any column that looks like a date/time column
        names
            .iter()
            .find(|name| {
                let lower = name.to_lowercase();
                lower.contains("date") || lower.contains("time")
            })
            .map(|name| name.to_string())
            .ok_or_else(|| {
                ForecastError::MalformedInput(format!(
                    "No '{}' column found in data",
                    self.date_column
                ))
            })
    }

    fn resolve_value_column(&self, df: &DataFrame, date_column: &str) -> Result<String> {
        let names = df.get_column_names();
        if let Some(name) = find_column(&names, &self.value_column) {
            return Ok(name);
        }

        // A two-column file has only one candidate
        let others: Vec<&&str> = names.iter().filter(|n| **n != date_column).collect();
        match others.as_slice() {
            [only] => Ok(only.to_string()),
            _ => Err(ForecastError::MalformedInput(format!(
                "No '{}' column found in data",
                self.value_column
            ))),
        }
    }
}

/// Exact match first, then case-insensitive
fn find_column(names: &[&str], wanted: &str) -> Option<String> {
    names
        .iter()
        .find(|n| **n == wanted)
        .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(wanted)))
        .map(|n| n.to_string())
}

/// Parse a calendar date, accepting month-only and timestamp forms
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let s = raw.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(datetime.date());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Ok(datetime.date_naive());
    }

    Err(ForecastError::MalformedInput(format!(
        "Cannot parse '{}' as a date",
        raw
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sorts_and_normalises() {
        let series = TimeSeries::new(vec![
            (ymd(2023, 3, 15), 101.0),
            (ymd(2023, 1, 31), 100.0),
            (ymd(2023, 2, 1), 100.5),
        ])
        .unwrap();

        assert_eq!(series.dates(), &[ymd(2023, 1, 1), ymd(2023, 2, 1), ymd(2023, 3, 1)]);
        assert_eq!(series.values(), &[100.0, 100.5, 101.0]);
        assert_eq!(series.last_value(), 101.0);
        assert_eq!(series.len(), 3);
        assert!(!series.is_empty());
    }

    #[test]
    fn rejects_duplicate_months() {
        let err = TimeSeries::new(vec![(ymd(2023, 1, 1), 1.0), (ymd(2023, 1, 20), 2.0)]).unwrap_err();
        match err {
            ForecastError::MalformedInput(msg) => assert!(msg.contains("2023-01")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rejects_empty_and_non_finite() {
        assert!(matches!(TimeSeries::new(vec![]), Err(ForecastError::EmptySeries)));
        assert!(matches!(
            TimeSeries::new(vec![(ymd(2023, 1, 1), f64::NAN)]),
            Err(ForecastError::MalformedInput(_))
        ));
    }

    #[test]
    fn parses_supported_date_forms() {
        assert_eq!(parse_date("2023-04-17").unwrap(), ymd(2023, 4, 17));
        assert_eq!(parse_date("2023/04/17").unwrap(), ymd(2023, 4, 17));
        assert_eq!(parse_date("04/17/2023").unwrap(), ymd(2023, 4, 17));
        assert_eq!(parse_date("2023-04").unwrap(), ymd(2023, 4, 1));
        assert_eq!(parse_date("2023-04-17 12:30:00").unwrap(), ymd(2023, 4, 17));
        assert_eq!(parse_date("2023-04-17T12:30:00Z").unwrap(), ymd(2023, 4, 17));
        assert!(parse_date("April").is_err());
    }

    #[test]
    fn holdout_split() {
        let series = TimeSeries::new(
            (1..=6).map(|m| (ymd(2022, m, 1), m as f64)).collect(),
        )
        .unwrap();
        let (train, withheld) = series.split_holdout(2).unwrap();
        assert_eq!(train.len(), 4);
        assert_eq!(withheld, vec![5.0, 6.0]);
        assert!(series.split_holdout(6).is_err());
        assert!(series.split_holdout(0).is_err());
    }

    #[test]
    fn summary_statistics() {
        let series = TimeSeries::new(vec![
            (ymd(2023, 1, 1), 2.0),
            (ymd(2023, 2, 1), 6.0),
            (ymd(2023, 3, 1), 4.0),
        ])
        .unwrap();
        let summary = series.summary();
        assert_eq!(summary.observations, 3);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 6.0);
        assert_eq!(summary.mean, 4.0);
        assert_eq!(summary.last_month, ymd(2023, 3, 1));
    }
}
