//! Stats module - Aggregations feeding the dashboard panels

mod calculator;

pub use calculator::{
    AggregationEngine, HistogramSummary, InjuryCategory, StreetInjuries, StreetRanking,
    MINUTE_BUCKETS,
};
