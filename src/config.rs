//! Configuration Module
//! Source location, column schema and default dashboard parameters.

use crate::dashboard::DashboardParams;
use crate::data::DEFAULT_ROW_LIMIT;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Local dataset location used when nothing else is configured.
pub const DEFAULT_SOURCE: &str = "data/Motor_Vehicle_Collisions.csv";

/// Source column names, matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    pub date: String,
    pub time: String,
    pub latitude: String,
    pub longitude: String,
    pub injured_persons: String,
    pub injured_pedestrians: String,
    pub injured_cyclists: String,
    pub injured_motorists: String,
    pub street_name: String,
    /// chrono formats tried in order for the date column.
    pub date_formats: Vec<String>,
    /// chrono formats tried in order for the time column.
    pub time_formats: Vec<String>,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            date: "crash_date".to_string(),
            time: "crash_time".to_string(),
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
            injured_persons: "injured_persons".to_string(),
            injured_pedestrians: "injured_pedestrians".to_string(),
            injured_cyclists: "injured_cyclists".to_string(),
            injured_motorists: "injured_motorists".to_string(),
            street_name: "on_street_name".to_string(),
            date_formats: vec![
                "%m/%d/%Y".to_string(),
                "%Y-%m-%d".to_string(),
                "%Y-%m-%dT%H:%M:%S%.f".to_string(),
            ],
            time_formats: vec!["%H:%M".to_string(), "%H:%M:%S".to_string()],
        }
    }
}

/// Top-level dashboard configuration, read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Local path or http(s) URL of the collision CSV.
    pub source: String,
    /// Maximum number of source rows read; `None` reads everything.
    pub row_limit: Option<usize>,
    pub schema: ColumnSchema,
    pub params: DashboardParams,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            row_limit: Some(DEFAULT_ROW_LIMIT),
            schema: ColumnSchema::default(),
            params: DashboardParams::default(),
        }
    }
}

impl DashboardConfig {
    /// Load a configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), source = %config.source, "Config loaded");
        Ok(config)
    }
}
