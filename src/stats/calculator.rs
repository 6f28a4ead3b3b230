//! Aggregation Module
//! Per-minute histograms, street rankings and map projections over views.

use crate::data::{CollisionRecord, CollisionTable, FilteredView, GeoPoint, HourOfDay};
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;
use std::str::FromStr;

/// Number of minute buckets in an hour histogram.
pub const MINUTE_BUCKETS: usize = 60;

/// Victim classification used to rank streets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjuryCategory {
    #[default]
    Pedestrians,
    Cyclists,
    Motorists,
}

impl InjuryCategory {
    pub const ALL: [InjuryCategory; 3] = [
        InjuryCategory::Pedestrians,
        InjuryCategory::Cyclists,
        InjuryCategory::Motorists,
    ];

    /// Injury count of this category on a record.
    pub fn count(self, record: &CollisionRecord) -> Option<u32> {
        match self {
            InjuryCategory::Pedestrians => record.injured_pedestrians,
            InjuryCategory::Cyclists => record.injured_cyclists,
            InjuryCategory::Motorists => record.injured_motorists,
        }
    }
}

impl fmt::Display for InjuryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InjuryCategory::Pedestrians => "Pedestrians",
            InjuryCategory::Cyclists => "Cyclists",
            InjuryCategory::Motorists => "Motorists",
        };
        f.write_str(label)
    }
}

impl FromStr for InjuryCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        InjuryCategory::ALL
            .into_iter()
            .find(|c| c.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidParameter {
                name: "category",
                value: s.to_string(),
                reason: "expected pedestrians, cyclists or motorists",
            })
    }
}

/// Crash counts for each minute of an hour, all 60 minutes present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramSummary {
    counts: Vec<u64>,
}

impl HistogramSummary {
    pub fn count(&self, minute: usize) -> Option<u64> {
        self.counts.get(minute).copied()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `(minute, crashes)` pairs in minute order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.counts.iter().copied().enumerate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetInjuries {
    pub street: String,
    pub injuries: u32,
}

/// Streets ordered by injury count, highest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetRanking {
    pub category: InjuryCategory,
    pub entries: Vec<StreetInjuries>,
}

impl StreetRanking {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stateless aggregations over tables and views.
pub struct AggregationEngine;

impl AggregationEngine {
    /// Count crashes per minute for rows within `[hour, hour + 1)`.
    ///
    /// The view is re-filtered by hour even when it already came from
    /// `filter_by_hour`; undated rows are skipped.
    pub fn minute_histogram(view: &FilteredView<'_>, hour: HourOfDay) -> HistogramSummary {
        let lower = hour.value();
        let upper = lower + 1;
        let mut counts = vec![0u64; MINUTE_BUCKETS];

        for record in view.iter() {
            let (Some(h), Some(minute)) = (record.hour(), record.minute()) else {
                continue;
            };
            if h < lower || h >= upper {
                continue;
            }
            if let Some(bucket) = counts.get_mut(minute as usize) {
                *bucket += 1;
            }
        }

        HistogramSummary { counts }
    }

    /// Top `n` (street, count) rows for a category.
    ///
    /// Rows with a zero count or no street name are excluded; ties keep
    /// table order.
    pub fn top_streets(
        table: &CollisionTable,
        category: InjuryCategory,
        n: usize,
    ) -> Result<StreetRanking> {
        if n == 0 {
            return Err(CoreError::InvalidParameter {
                name: "top_n",
                value: n.to_string(),
                reason: "must be positive",
            });
        }

        let mut rows: Vec<(Option<&str>, u32)> = table
            .records()
            .iter()
            .filter_map(|record| {
                let count = category.count(record).filter(|&count| count >= 1)?;
                Some((record.on_street_name.as_deref(), count))
            })
            .collect();

        // sort_by is stable
        rows.sort_by(|a, b| b.1.cmp(&a.1));

        let entries = rows
            .into_iter()
            .filter_map(|(street, injuries)| {
                street.map(|s| StreetInjuries {
                    street: s.to_string(),
                    injuries,
                })
            })
            .take(n)
            .collect();

        Ok(StreetRanking { category, entries })
    }

    /// Latitude/longitude of every row with finite coordinates.
    pub fn map_points(view: &FilteredView<'_>) -> Vec<GeoPoint> {
        view.iter()
            .filter(|record| record.latitude.is_finite() && record.longitude.is_finite())
            .map(|record| GeoPoint {
                latitude: record.latitude,
                longitude: record.longitude,
            })
            .collect()
    }

    /// Mean position of the view, used to center a map.
    pub fn midpoint(view: &FilteredView<'_>) -> Option<GeoPoint> {
        let points = Self::map_points(view);
        if points.is_empty() {
            return None;
        }

        let latitude = points.iter().map(|p| p.latitude).mean();
        let longitude = points.iter().map(|p| p.longitude).mean();
        Some(GeoPoint {
            latitude,
            longitude,
        })
    }
}
