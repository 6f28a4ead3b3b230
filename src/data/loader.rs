//! CSV Data Loader Module
//! Reads collision CSVs with Polars and converts them into typed records.

use crate::config::ColumnSchema;
use crate::data::model::{format_timestamp, CollisionRecord, CollisionTable, DATETIME_COLUMN};
use crate::error::{CoreError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;

/// Row limit used by the dashboard when none is configured.
pub const DEFAULT_ROW_LIMIT: usize = 100_000;

const INFER_SCHEMA_ROWS: usize = 10_000;

/// Where a collision CSV lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataSource {
    Local(PathBuf),
    Remote(String),
}

impl DataSource {
    /// Interpret an identifier: http(s) URLs are remote, anything else is a path.
    pub fn parse(identifier: &str) -> Self {
        let trimmed = identifier.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Remote(trimmed.to_string())
        } else {
            DataSource::Local(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Local(path) => write!(f, "{}", path.display()),
            DataSource::Remote(url) => f.write_str(url),
        }
    }
}

/// Loads collision CSVs into [`CollisionTable`]s.
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    schema: ColumnSchema,
}

impl DataLoader {
    pub fn new(schema: ColumnSchema) -> Self {
        Self { schema }
    }

    /// Load up to `row_limit` source rows, drop rows without geolocation and
    /// combine the date and time columns. The cleaned frame keeps every other
    /// source column.
    pub fn load(&self, source: &DataSource, row_limit: Option<usize>) -> Result<CollisionTable> {
        tracing::info!(source = %source, row_limit = ?row_limit, "Loading collision data");
        let mut df = Self::read_frame(source, row_limit)?;
        let columns = Self::lowercase_columns(&mut df)?;
        let table = self.build_table(&df, &columns)?;
        tracing::info!(
            source = %source,
            read = df.height(),
            kept = table.len(),
            "Collision data loaded"
        );
        Ok(table)
    }

    /// Read the raw CSV into a DataFrame.
    fn read_frame(source: &DataSource, row_limit: Option<usize>) -> Result<DataFrame> {
        match source {
            DataSource::Local(path) => {
                // A missing file would otherwise surface as a Polars error.
                std::fs::File::open(path).map_err(|e| CoreError::SourceUnavailable {
                    source_id: source.to_string(),
                    reason: e.to_string(),
                })?;

                let df = LazyCsvReader::new(path)
                    .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
                    .with_ignore_errors(true)
                    .with_n_rows(row_limit)
                    .finish()?
                    .collect()?;
                Ok(df)
            }
            DataSource::Remote(url) => {
                let bytes = Self::fetch_remote(url)?;
                let df = CsvReadOptions::default()
                    .with_has_header(true)
                    .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
                    .with_ignore_errors(true)
                    .with_n_rows(row_limit)
                    .into_reader_with_file_handle(Cursor::new(bytes))
                    .finish()?;
                Ok(df)
            }
        }
    }

    fn fetch_remote(url: &str) -> Result<Vec<u8>> {
        let unavailable = |reason: String| CoreError::SourceUnavailable {
            source_id: url.to_string(),
            reason,
        };

        tracing::debug!(url, "Fetching remote CSV");
        let response = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| unavailable(e.to_string()))?;
        let bytes = response.bytes().map_err(|e| unavailable(e.to_string()))?;
        tracing::debug!(url, bytes = bytes.len(), "Remote CSV fetched");
        Ok(bytes.to_vec())
    }

    /// Rename every column to its lowercase form.
    fn lowercase_columns(df: &mut DataFrame) -> Result<Vec<String>> {
        let lowered: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.trim().to_lowercase())
            .collect();

        let mut seen = HashSet::new();
        for name in &lowered {
            if !seen.insert(name.as_str()) {
                return Err(CoreError::MalformedData(format!(
                    "duplicate column '{name}' after lowercasing"
                )));
            }
        }

        df.set_column_names(lowered.iter().map(String::as_str))?;
        Ok(lowered)
    }

    fn build_table(&self, df: &DataFrame, columns: &[String]) -> Result<CollisionTable> {
        let schema = &self.schema;
        let date_col = schema.date.to_lowercase();
        let time_col = schema.time.to_lowercase();
        let lat_col = schema.latitude.to_lowercase();
        let lon_col = schema.longitude.to_lowercase();

        let missing: Vec<&str> = [&date_col, &time_col, &lat_col, &lon_col]
            .into_iter()
            .filter(|name| !columns.contains(*name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::MalformedData(format!(
                "required columns missing: {}",
                missing.join(", ")
            )));
        }

        let dates = string_column(df, &date_col)?;
        let times = string_column(df, &time_col)?;
        let latitudes = float_column(df, &lat_col)?;
        let longitudes = float_column(df, &lon_col)?;
        let persons = count_column(df, columns, &schema.injured_persons)?;
        let pedestrians = count_column(df, columns, &schema.injured_pedestrians)?;
        let cyclists = count_column(df, columns, &schema.injured_cyclists)?;
        let motorists = count_column(df, columns, &schema.injured_motorists)?;
        let streets = optional_string_column(df, columns, &schema.street_name)?;

        let mut records = Vec::with_capacity(df.height());
        let mut kept: Vec<IdxSize> = Vec::with_capacity(df.height());
        let mut dropped = 0usize;
        let mut undated = 0usize;

        for i in 0..df.height() {
            let (Some(latitude), Some(longitude)) = (latitudes[i], longitudes[i]) else {
                dropped += 1;
                continue;
            };

            let timestamp = match (&dates[i], &times[i]) {
                (Some(date), Some(time)) => self.parse_timestamp(date, time),
                _ => None,
            };
            if timestamp.is_none() {
                undated += 1;
            }
            kept.push(i as IdxSize);

            records.push(CollisionRecord {
                timestamp,
                latitude,
                longitude,
                injured_persons: persons[i],
                injured_pedestrians: pedestrians[i],
                injured_cyclists: cyclists[i],
                injured_motorists: motorists[i],
                on_street_name: streets[i].clone(),
            });
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Dropped rows without latitude/longitude");
        }
        if undated > 0 {
            tracing::warn!(undated, "Rows with unparseable date/time kept without timestamp");
        }

        // The date and time pair is exposed as one leading column.
        let mut frame = df.take(&IdxCa::from_vec("row".into(), kept))?.drop(&date_col)?;
        if time_col != date_col {
            frame = frame.drop(&time_col)?;
        }
        let stamps: Vec<Option<String>> = records
            .iter()
            .map(|r| r.timestamp.as_ref().map(format_timestamp))
            .collect();
        frame.insert_column(0, Column::new(DATETIME_COLUMN.into(), stamps))?;

        Ok(CollisionTable::with_frame(records, frame))
    }

    /// Combine a date cell and a time cell using the configured formats.
    pub fn parse_timestamp(&self, date: &str, time: &str) -> Option<NaiveDateTime> {
        let date = date.trim();
        let time = time.trim();

        let date = self.schema.date_formats.iter().find_map(|fmt| {
            NaiveDate::parse_from_str(date, fmt)
                .ok()
                .or_else(|| NaiveDateTime::parse_from_str(date, fmt).ok().map(|dt| dt.date()))
        })?;
        let time = self
            .schema
            .time_formats
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(time, fmt).ok())?;

        Some(date.and_time(time))
    }
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Non-finite values count as missing.
fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

/// Injury counts; absent columns and missing or negative cells are `None`.
fn count_column(df: &DataFrame, columns: &[String], name: &str) -> Result<Vec<Option<u32>>> {
    let name = name.to_lowercase();
    if !columns.contains(&name) {
        tracing::warn!(column = %name, "Injury column missing, counts unavailable");
        return Ok(vec![None; df.height()]);
    }

    let column = df.column(&name)?.cast(&DataType::Int64)?;
    let values = column
        .i64()?
        .into_iter()
        .map(|v| v.and_then(|x| u32::try_from(x).ok()))
        .collect();
    Ok(values)
}

/// Street names are trimmed; blank cells become `None`.
fn optional_string_column(
    df: &DataFrame,
    columns: &[String],
    name: &str,
) -> Result<Vec<Option<String>>> {
    let name = name.to_lowercase();
    if !columns.contains(&name) {
        tracing::warn!(column = %name, "Street column missing, street names unavailable");
        return Ok(vec![None; df.height()]);
    }

    let values = string_column(df, &name)?
        .into_iter()
        .map(|v| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .collect();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    const SAMPLE: &str = "\
CRASH_DATE,CRASH_TIME,LATITUDE,LONGITUDE,INJURED_PERSONS,INJURED_PEDESTRIANS,INJURED_CYCLISTS,INJURED_MOTORISTS,ON_STREET_NAME
04/14/2021,5:32,40.71,-73.99,2,1,0,1,BROADWAY
04/14/2021,17:05,,-73.95,1,0,1,0,PARK AVENUE
04/15/2021,23:59,40.65,-73.91,,0,0,0,
";

    /// Serve a single HTTP response on a local port and return its URL.
    fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 4096];
                let _ = stream.read(&mut request);
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/collisions.csv")
    }

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_source_parse() {
        assert_eq!(
            DataSource::parse("https://example.org/c.csv"),
            DataSource::Remote("https://example.org/c.csv".to_string())
        );
        assert_eq!(
            DataSource::parse("data/c.csv"),
            DataSource::Local(PathBuf::from("data/c.csv"))
        );
    }

    #[test]
    fn test_load_drops_rows_without_geolocation() {
        let file = write_csv(SAMPLE);
        let source = DataSource::Local(file.path().to_path_buf());
        let table = DataLoader::default().load(&source, None).unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.records().iter().all(|r| r.latitude.is_finite()));

        let first = &table.records()[0];
        assert_eq!(first.hour(), Some(5));
        assert_eq!(first.minute(), Some(32));
        assert_eq!(first.injured_persons, Some(2));
        assert_eq!(first.on_street_name.as_deref(), Some("BROADWAY"));

        let last = &table.records()[1];
        assert_eq!(last.on_street_name, None);
        assert_eq!(last.injured_persons, None);
        assert_eq!(last.injured_pedestrians, Some(0));
    }

    #[test]
    fn test_frame_is_aligned_with_records() {
        let file = write_csv(SAMPLE);
        let source = DataSource::Local(file.path().to_path_buf());
        let table = DataLoader::default().load(&source, None).unwrap();

        let frame = table.frame().unwrap();
        assert_eq!(frame.height(), table.len());
        assert_eq!(frame.get_column_names()[0].as_str(), DATETIME_COLUMN);
        let stamps: Vec<Option<&str>> = frame
            .column(DATETIME_COLUMN)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            stamps,
            vec![Some("2021-04-14 05:32:00"), Some("2021-04-15 23:59:00")]
        );
    }

    #[test]
    fn test_remote_source_loads() {
        let url = serve_once("200 OK", SAMPLE);
        let source = DataSource::parse(&url);
        assert!(matches!(source, DataSource::Remote(_)));

        let table = DataLoader::default().load(&source, None).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].on_street_name.as_deref(), Some("BROADWAY"));
    }

    #[test]
    fn test_remote_error_status_is_unavailable() {
        let url = serve_once("404 Not Found", "missing");
        let result = DataLoader::default().load(&DataSource::parse(&url), None);
        match result {
            Err(CoreError::SourceUnavailable { source_id, reason }) => {
                assert_eq!(source_id, url);
                assert!(reason.contains("404"), "unexpected reason: {reason}");
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_load_lowercases_and_combines_columns() {
        let file = write_csv(SAMPLE);
        let source = DataSource::Local(file.path().to_path_buf());
        let table = DataLoader::default().load(&source, None).unwrap();

        assert_eq!(table.columns()[0], DATETIME_COLUMN);
        assert!(table.columns().contains(&"latitude".to_string()));
        assert!(!table.columns().iter().any(|c| c == "crash_date" || c == "crash_time"));
        assert!(table.columns().iter().all(|c| c.to_lowercase() == *c));
    }

    #[test]
    fn test_row_limit_counts_source_rows() {
        let file = write_csv(SAMPLE);
        let source = DataSource::Local(file.path().to_path_buf());
        let table = DataLoader::default().load(&source, Some(2)).unwrap();
        // Second source row has no latitude.
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_required_column() {
        let file = write_csv("CRASH_DATE,CRASH_TIME,LATITUDE\n04/14/2021,5:32,40.71\n");
        let source = DataSource::Local(file.path().to_path_buf());
        let result = DataLoader::default().load(&source, None);
        match result {
            Err(CoreError::MalformedData(msg)) => assert!(msg.contains("longitude")),
            other => panic!("expected MalformedData, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let source = DataSource::Local(PathBuf::from("/nonexistent/collisions.csv"));
        let result = DataLoader::default().load(&source, None);
        assert!(matches!(result, Err(CoreError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let loader = DataLoader::default();
        let expected = NaiveDate::from_ymd_opt(2019, 7, 10)
            .and_then(|d| d.and_hms_opt(8, 5, 0))
            .unwrap();
        assert_eq!(loader.parse_timestamp("07/10/2019", "8:05"), Some(expected));
        assert_eq!(loader.parse_timestamp("2019-07-10", "08:05:00"), Some(expected));
        assert_eq!(
            loader.parse_timestamp("2019-07-10T00:00:00.000", "8:05"),
            Some(expected)
        );
        assert_eq!(loader.parse_timestamp("yesterday", "8:05"), None);
    }
}
