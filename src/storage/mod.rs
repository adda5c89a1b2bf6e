//! Series storage
//!
//! Stores each distinct series value once, keyed by its content UUID, and
//! tracks which owners reference it:
//!
//! - **handle**: `SeriesStorage`, the file-owning entry point
//! - **attributes**: entry type tags and metadata
//! - **codec**: payload encode/decode per data kind
//! - **ledger**: per-entry owner references
//! - **reader**: row/column windowed reads
//! - **traversal**: lazy iteration over every entry, storage comparison
//! - **error**: error types
//!
//! # Layout
//!
//! ```text
//! /time_series/
//!   /<content-uuid>/        attributes: see `attributes`
//!       data                numeric payload, see `codec`
//!       components          owner references, one per owner
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use seriesvault::series::{SeriesMetadata, SingleTimeSeries, TimeSeriesData, Values};
//! use seriesvault::storage::{IndexRange, SeriesStorage, StorageOptions};
//! use uuid::Uuid;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut storage = SeriesStorage::create(StorageOptions::default())?;
//!
//!     let series: TimeSeriesData = SingleTimeSeries::new(
//!         0,
//!         chrono::Duration::hours(1),
//!         Values::Float(vec![1.0, 2.0, 3.0]),
//!     )
//!     .into();
//!     storage.store(Uuid::new_v4(), "load", &series)?;
//!
//!     let metadata = SeriesMetadata::for_series("load", &series);
//!     let first_two = storage.read(&metadata, IndexRange::new(1, 2)?, IndexRange::single(1)?)?;
//!     println!("{:?}", first_two);
//!
//!     storage.close()?;
//!     Ok(())
//! }
//! ```

pub mod attributes;
pub mod codec;
pub mod error;
pub mod handle;
pub mod ledger;
pub mod reader;
pub mod traversal;

pub use attributes::{DataKind, EntryAttributes};
pub use error::{StorageError, StorageResult};
pub use handle::{SeriesStorage, StorageOptions};
pub use reader::IndexRange;
pub use traversal::{compare_storages, EntryIter, StoredEntry};

use uuid::Uuid;

/// Group holding every entry
pub const ROOT_GROUP: &str = "time_series";

pub(crate) fn entry_path(content_id: Uuid) -> String {
    format!("{}/{}", ROOT_GROUP, content_id)
}

pub(crate) fn data_path(content_id: Uuid) -> String {
    format!("{}/{}/data", ROOT_GROUP, content_id)
}

pub(crate) fn components_path(content_id: Uuid) -> String {
    format!("{}/{}/{}", ROOT_GROUP, content_id, ledger::COMPONENTS)
}
