//! Dashboard Module
//! Runs the filters and aggregations behind each dashboard panel.

use crate::config::DashboardConfig;
use crate::data::{
    CollisionTable, DataLoader, DataSource, FilterEngine, GeoPoint, HourOfDay, LoadCache,
};
use crate::error::Result;
use crate::stats::{AggregationEngine, HistogramSummary, InjuryCategory, StreetRanking};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Upper bound offered for the minimum-injured selector.
pub const MAX_MIN_INJURED: u32 = 19;

/// Ranking sizes offered for the top-streets selector.
pub const TOP_N_CHOICES: [usize; 3] = [5, 10, 15];

/// User-selected filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardParams {
    pub min_injured: u32,
    pub hour: u32,
    pub category: InjuryCategory,
    pub top_n: usize,
}

impl Default for DashboardParams {
    fn default() -> Self {
        Self {
            min_injured: 0,
            hour: 0,
            category: InjuryCategory::Pedestrians,
            top_n: TOP_N_CHOICES[0],
        }
    }
}

/// Everything the dashboard panels display for one set of parameters.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub source: String,
    pub params: DashboardParams,
    pub total_rows: usize,
    /// Collisions with at least `min_injured` injured persons.
    pub injury_map: Vec<GeoPoint>,
    /// Heading text, e.g. "17:00 and 18:00".
    pub hour_window: String,
    pub hour_rows: usize,
    pub hour_points: Vec<GeoPoint>,
    pub midpoint: Option<GeoPoint>,
    pub minute_histogram: HistogramSummary,
    pub top_streets: StreetRanking,
}

/// Owns the load cache and builds reports from it.
pub struct Dashboard {
    source: DataSource,
    row_limit: Option<usize>,
    cache: LoadCache,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            source: DataSource::parse(&config.source),
            row_limit: config.row_limit,
            cache: LoadCache::new(DataLoader::new(config.schema.clone())),
        }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// The loaded table; only the first call reads the source.
    pub fn table(&self) -> Result<Arc<CollisionTable>> {
        self.cache.get_or_load(&self.source, self.row_limit)
    }

    /// Build the report for `params`.
    pub fn report(&self, params: &DashboardParams) -> Result<DashboardReport> {
        let hour = HourOfDay::new(params.hour)?;
        let table = self.table()?;
        let report = build_report(&table, &self.source.to_string(), params, hour)?;

        tracing::debug!(
            hour_rows = report.hour_rows,
            injury_points = report.injury_map.len(),
            streets = report.top_streets.len(),
            "Dashboard report built"
        );
        Ok(report)
    }

    /// Rows of the selected hour as a table.
    pub fn raw_hour_view(&self, params: &DashboardParams) -> Result<DataFrame> {
        let table = self.table()?;
        let view = FilterEngine::filter_by_hour(&table, params.hour)?;
        view.to_dataframe()
    }
}

/// Compute every panel of the report over an already loaded table.
pub fn build_report(
    table: &CollisionTable,
    source: &str,
    params: &DashboardParams,
    hour: HourOfDay,
) -> Result<DashboardReport> {
    // Panels only share the immutable table.
    let (injury_map, (hour_panel, top_streets)) = rayon::join(
        || {
            let view = FilterEngine::filter_by_min_injured(table, params.min_injured);
            AggregationEngine::map_points(&view)
        },
        || {
            rayon::join(
                || {
                    FilterEngine::filter_by_hour(table, hour.value()).map(|view| {
                        (
                            view.len(),
                            AggregationEngine::map_points(&view),
                            AggregationEngine::midpoint(&view),
                            AggregationEngine::minute_histogram(&view, hour),
                        )
                    })
                },
                || AggregationEngine::top_streets(table, params.category, params.top_n),
            )
        },
    );

    let (hour_rows, hour_points, midpoint, minute_histogram) = hour_panel?;

    Ok(DashboardReport {
        source: source.to_string(),
        params: *params,
        total_rows: table.len(),
        injury_map,
        hour_window: hour.to_string(),
        hour_rows,
        hour_points,
        midpoint,
        minute_histogram,
        top_streets: top_streets?,
    })
}
