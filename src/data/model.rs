//! Collision Data Model
//! Typed rows and the immutable table produced by the loader.

use chrono::{NaiveDateTime, Timelike};
use polars::prelude::DataFrame;
use serde::Serialize;

/// Canonical name of the combined date and time column.
pub const DATETIME_COLUMN: &str = "date/time";

/// Columns backing [`CollisionRecord`], in raw-view order.
pub const RECORD_COLUMNS: [&str; 8] = [
    DATETIME_COLUMN,
    "latitude",
    "longitude",
    "injured_persons",
    "injured_pedestrians",
    "injured_cyclists",
    "injured_motorists",
    "on_street_name",
];

/// Rendering of [`DATETIME_COLUMN`] values in raw views.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// One reported vehicle collision.
///
/// Injury counts are `None` when the source cell is empty or not a
/// non-negative integer; such rows never satisfy a count threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub latitude: f64,
    pub longitude: f64,
    pub injured_persons: Option<u32>,
    pub injured_pedestrians: Option<u32>,
    pub injured_cyclists: Option<u32>,
    pub injured_motorists: Option<u32>,
    pub on_street_name: Option<String>,
}

impl CollisionRecord {
    /// Hour-of-day of the timestamp, if one was parsed.
    pub fn hour(&self) -> Option<u32> {
        self.timestamp.map(|ts| ts.hour())
    }

    /// Minute-of-hour of the timestamp, if one was parsed.
    pub fn minute(&self) -> Option<u32> {
        self.timestamp.map(|ts| ts.minute())
    }
}

/// Ordered, read-only collection of collision records.
///
/// Every record has a latitude and longitude; rows without them are dropped
/// while loading. Tables produced by the loader also keep the cleaned source
/// frame (row-aligned with the records) so raw views carry every column.
#[derive(Debug, Clone)]
pub struct CollisionTable {
    records: Vec<CollisionRecord>,
    frame: Option<DataFrame>,
}

impl CollisionTable {
    /// Table without a source frame; raw views use [`RECORD_COLUMNS`].
    pub fn new(records: Vec<CollisionRecord>) -> Self {
        Self {
            records,
            frame: None,
        }
    }

    /// `frame` must have one row per record, in the same order.
    pub fn with_frame(records: Vec<CollisionRecord>, frame: DataFrame) -> Self {
        debug_assert_eq!(records.len(), frame.height());
        Self {
            records,
            frame: Some(frame),
        }
    }

    /// Lowercase column names, with the date and time pair replaced by a
    /// leading [`DATETIME_COLUMN`].
    pub fn columns(&self) -> Vec<String> {
        match &self.frame {
            Some(frame) => frame
                .get_column_names()
                .iter()
                .map(|name| name.to_string())
                .collect(),
            None => RECORD_COLUMNS.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn frame(&self) -> Option<&DataFrame> {
        self.frame.as_ref()
    }

    pub fn records(&self) -> &[CollisionRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&CollisionRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl PartialEq for CollisionTable {
    fn eq(&self, other: &Self) -> bool {
        let frames_equal = match (&self.frame, &other.frame) {
            (Some(a), Some(b)) => a.equals_missing(b),
            (None, None) => true,
            _ => false,
        };
        frames_equal && self.records == other.records
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}
