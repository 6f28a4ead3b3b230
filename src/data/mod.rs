//! Data module - CSV loading, caching and filtering

mod cache;
mod loader;
mod model;
mod processor;

pub use cache::{CacheKey, LoadCache, LOADER_REVISION};
pub use loader::{DataLoader, DataSource, DEFAULT_ROW_LIMIT};
pub use model::{
    format_timestamp, CollisionRecord, CollisionTable, GeoPoint, DATETIME_COLUMN, RECORD_COLUMNS,
};
pub use processor::{FilterEngine, FilteredView, HourOfDay};
