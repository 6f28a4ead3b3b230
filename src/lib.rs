//! Collision Dash - vehicle collision CSV loading, filtering and aggregation.
//!
//! The library holds the data core; `main.rs` is a headless front end that
//! prints dashboard reports.

pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod logging;
pub mod stats;

pub use error::{CoreError, Result};
