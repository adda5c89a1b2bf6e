//! # seriesvault
//!
//! Deduplicated, reference-counted storage for time series and forecasts.
//!
//! Each distinct series value is stored once in a single container file,
//! keyed by its content UUID, and every owner that uses it is recorded as a
//! reference. The entry disappears with its last reference.
//!
//! ## Features
//!
//! - **Structured elements**: scalars, polynomial coefficient tuples and
//!   piecewise-linear segment lists
//! - **Windowed reads**: decode only the requested rows and forecast windows
//! - **Forecast layouts**: deterministic, probabilistic and scenario ensembles
//! - **Shared read-only access**: any number of read-only handles on one file
//!
//! ## Modules
//!
//! - [`storage`]: the series store
//! - [`series`]: in-memory series types
//! - [`container`]: the hierarchical binary container file
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::Duration;
//! use seriesvault::series::{Deterministic, SeriesMetadata, TimeSeriesData, Values};
//! use seriesvault::storage::{IndexRange, SeriesStorage, StorageOptions};
//! use std::collections::BTreeMap;
//! use uuid::Uuid;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut storage = SeriesStorage::create(StorageOptions::default())?;
//!
//!     // Three hourly windows of 24 values each
//!     let hour = 3_600_000;
//!     let windows: BTreeMap<i64, Values> = (0..3)
//!         .map(|w| (w * hour, Values::Float(vec![w as f64; 24])))
//!         .collect();
//!     let forecast: TimeSeriesData =
//!         Deterministic::new(Duration::hours(1), Duration::hours(1), windows)?.into();
//!
//!     let (owner_a, owner_b) = (Uuid::new_v4(), Uuid::new_v4());
//!     storage.store(owner_a, "load", &forecast)?;
//!     storage.add_reference(owner_b, "load", forecast.uuid())?;
//!
//!     // Read only the second window
//!     let metadata = SeriesMetadata::for_series("load", &forecast);
//!     let window = storage.read(&metadata, IndexRange::new(1, 24)?, IndexRange::single(2)?)?;
//!     println!("{:?}", window.timestamps());
//!
//!     storage.remove_reference(forecast.uuid(), owner_a, "load")?;
//!     let deleted = storage.remove_reference(forecast.uuid(), owner_b, "load")?;
//!     assert!(deleted);
//!
//!     storage.close()?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod container;
pub mod series;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    compare_storages, DataKind, EntryAttributes, EntryIter, IndexRange, SeriesStorage,
    StorageError, StorageOptions, StorageResult, StoredEntry,
};

pub use series::{
    Deterministic, DeterministicSingleTimeSeries, ElementType, ForecastParams, LogicalType,
    Matrix, OwnerRef, Probabilistic, Scenarios, SeriesError, SeriesMetadata, SingleTimeSeries,
    TimeSeriesData, Values,
};

pub use container::{Compression, Container, ContainerError, OpenMode};

pub use config::{Config, ConfigError, LoggingConfig, StoreConfig};
