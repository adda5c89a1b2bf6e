//! In-memory time-series model
//!
//! The series types the storage layer persists and reconstructs:
//!
//! - **values**: per-step element storage (`Values`, `ElementType`, `Matrix`)
//! - **types**: single series, forecasts and the `TimeSeriesData` variant
//! - **registry**: `LogicalType`, the `(module, type name)` tag of every type
//! - **owner**: `OwnerRef`, one consumer of a stored series
//! - **error**: error types
//!
//! Timestamps are epoch milliseconds; resolutions and intervals are
//! `chrono::Duration` and are normalized to milliseconds when stored.

pub mod error;
pub mod owner;
pub mod registry;
pub mod types;
pub mod values;

pub use error::{SeriesError, SeriesResult};
pub use owner::OwnerRef;
pub use registry::{LogicalType, SeriesFamily, SOURCE_MODULE};
pub use types::{
    duration_to_millis, millis_to_duration, Deterministic, DeterministicSingleTimeSeries,
    ForecastParams, Probabilistic, Scenarios, SeriesMetadata, SingleTimeSeries, TimeSeriesData,
};
pub use values::{ElementType, Matrix, Values};
