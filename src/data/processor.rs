//! Filter Engine Module
//! Row filters over a loaded table, producing borrowed views.

use crate::data::model::{format_timestamp, CollisionRecord, CollisionTable, DATETIME_COLUMN};
use crate::error::{CoreError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hour-of-day in `0..=23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct HourOfDay(u8);

impl HourOfDay {
    pub fn new(hour: u32) -> Result<Self> {
        if hour > 23 {
            return Err(CoreError::InvalidParameter {
                name: "hour",
                value: hour.to_string(),
                reason: "must be within 0..=23",
            });
        }
        Ok(Self(hour as u8))
    }

    pub fn value(self) -> u32 {
        u32::from(self.0)
    }

    /// Hour that closes the window, wrapping at midnight.
    pub fn next(self) -> u32 {
        (self.value() + 1) % 24
    }
}

impl TryFrom<u32> for HourOfDay {
    type Error = CoreError;

    fn try_from(hour: u32) -> Result<Self> {
        Self::new(hour)
    }
}

impl From<HourOfDay> for u32 {
    fn from(hour: HourOfDay) -> Self {
        hour.value()
    }
}

/// Renders the window as `"H:00 and H+1:00"`.
impl fmt::Display for HourOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:00 and {}:00", self.value(), self.next())
    }
}

/// A subset of a table's rows, kept as ascending row indices.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a CollisionTable,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// View over every row of the table.
    pub fn all(table: &'a CollisionTable) -> Self {
        Self {
            table,
            indices: (0..table.len()).collect(),
        }
    }

    fn matching<P>(table: &'a CollisionTable, predicate: P) -> Self
    where
        P: Fn(&CollisionRecord) -> bool,
    {
        let indices = table
            .records()
            .iter()
            .enumerate()
            .filter(|(_, record)| predicate(record))
            .map(|(idx, _)| idx)
            .collect();
        Self { table, indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a CollisionRecord> + '_ {
        let table = self.table;
        self.indices.iter().filter_map(move |&idx| table.get(idx))
    }

    /// Rows of the underlying table that are not in this view.
    pub fn complement(&self) -> FilteredView<'a> {
        let mut included = vec![false; self.table.len()];
        for &idx in &self.indices {
            included[idx] = true;
        }
        let indices = included
            .iter()
            .enumerate()
            .filter(|(_, &inside)| !inside)
            .map(|(idx, _)| idx)
            .collect();
        FilteredView {
            table: self.table,
            indices,
        }
    }

    /// Materialize the view as a DataFrame for tabular display.
    ///
    /// Loaded tables yield every source column; tables built from records
    /// alone yield the record fields.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        if let Some(frame) = self.table.frame() {
            let rows: Vec<IdxSize> = self.indices.iter().map(|&idx| idx as IdxSize).collect();
            return Ok(frame.take(&IdxCa::from_vec("row".into(), rows))?);
        }

        let mut timestamps: Vec<Option<String>> = Vec::with_capacity(self.len());
        let mut latitudes: Vec<f64> = Vec::with_capacity(self.len());
        let mut longitudes: Vec<f64> = Vec::with_capacity(self.len());
        let mut persons: Vec<Option<u32>> = Vec::with_capacity(self.len());
        let mut pedestrians: Vec<Option<u32>> = Vec::with_capacity(self.len());
        let mut cyclists: Vec<Option<u32>> = Vec::with_capacity(self.len());
        let mut motorists: Vec<Option<u32>> = Vec::with_capacity(self.len());
        let mut streets: Vec<Option<String>> = Vec::with_capacity(self.len());

        for record in self.iter() {
            timestamps.push(record.timestamp.as_ref().map(format_timestamp));
            latitudes.push(record.latitude);
            longitudes.push(record.longitude);
            persons.push(record.injured_persons);
            pedestrians.push(record.injured_pedestrians);
            cyclists.push(record.injured_cyclists);
            motorists.push(record.injured_motorists);
            streets.push(record.on_street_name.clone());
        }

        let df = DataFrame::new(vec![
            Column::new(DATETIME_COLUMN.into(), timestamps),
            Column::new("latitude".into(), latitudes),
            Column::new("longitude".into(), longitudes),
            Column::new("injured_persons".into(), persons),
            Column::new("injured_pedestrians".into(), pedestrians),
            Column::new("injured_cyclists".into(), cyclists),
            Column::new("injured_motorists".into(), motorists),
            Column::new("on_street_name".into(), streets),
        ])?;

        Ok(df)
    }
}

/// Pure row filters over an immutable [`CollisionTable`].
pub struct FilterEngine;

impl FilterEngine {
    /// Rows with at least `min_injured` injured persons.
    ///
    /// Rows whose count is missing never match, even for a threshold of 0.
    pub fn filter_by_min_injured(table: &CollisionTable, min_injured: u32) -> FilteredView<'_> {
        FilteredView::matching(table, |record| {
            record.injured_persons.is_some_and(|n| n >= min_injured)
        })
    }

    /// Rows whose timestamp falls in the given hour of day.
    ///
    /// Rows without a timestamp never match.
    pub fn filter_by_hour(table: &CollisionTable, hour: u32) -> Result<FilteredView<'_>> {
        let hour = HourOfDay::new(hour)?;
        Ok(FilteredView::matching(table, |record| {
            record.hour() == Some(hour.value())
        }))
    }
}
