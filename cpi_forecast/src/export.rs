//! Writing forecast tables and dashboard reports to disk

use crate::error::Result;
use crate::report::ForecastTable;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write one forecast table as CSV with a header row
pub fn write_table_csv<P: AsRef<Path>>(table: &ForecastTable, path: P) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for row in &table.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    info!(
        strategy = %table.strategy,
        horizon = table.horizon,
        path = %path.as_ref().display(),
        "wrote forecast table"
    );
    Ok(())
}

/// File name for a table inside an output directory
pub fn table_file_name(table: &ForecastTable) -> String {
    format!("{}_{}m.csv", table.strategy, table.horizon)
}

/// Write every table into `dir`, returning the paths written
pub fn write_tables<'a, I>(tables: I, dir: &Path) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = &'a ForecastTable>,
{
    std::fs::create_dir_all(dir)?;
    tables
        .into_iter()
        .map(|table| {
            let path = dir.join(table_file_name(table));
            write_table_csv(table, &path)?;
            Ok(path)
        })
        .collect()
}

/// Write any serialisable report as pretty-printed JSON
pub fn write_report_json<T: Serialize, P: AsRef<Path>>(report: &T, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!(path = %path.as_ref().display(), "wrote JSON report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ForecastRecord;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn table(with_bounds: bool) -> ForecastTable {
        let rows = (1..=2)
            .map(|m| ForecastRecord {
                timestamp: NaiveDate::from_ymd_opt(2024, m, 1).unwrap(),
                forecasted_cpi: 300.0 + m as f64,
                percent_change: 0.5,
                lower: with_bounds.then_some(299.0),
                upper: with_bounds.then_some(305.0),
            })
            .collect();
        ForecastTable {
            strategy: "fixed-arima".to_string(),
            model: "ARIMA(1,1,1)".to_string(),
            horizon: 2,
            rows,
        }
    }

    #[test]
    fn csv_has_display_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        write_table_csv(&table(false), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("Date,Forecasted CPI,Percent Change"));
        assert_eq!(lines.next(), Some("2024-01-01,301.0,0.5"));
    }

    #[test]
    fn csv_includes_bounds_when_present() {
        let dir = tempdir().unwrap();
        let paths = write_tables([&table(true)], dir.path()).unwrap();
        assert_eq!(paths, vec![dir.path().join("fixed-arima_2m.csv")]);

        let written = std::fs::read_to_string(&paths[0]).unwrap();
        assert!(written.starts_with("Date,Forecasted CPI,Percent Change,Lower,Upper"));
    }

    #[test]
    fn json_report_round_trips_as_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report_json(&table(false), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["strategy"], "fixed-arima");
        assert_eq!(value["rows"].as_array().map(|r| r.len()), Some(2));
    }
}
