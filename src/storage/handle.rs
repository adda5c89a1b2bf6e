//! Series storage handle
//!
//! `SeriesStorage` owns one container file. Every operation opens the
//! container, does its work and closes it again before returning, on error
//! paths too; no container stays open between calls.
//!
//! Storage created without a path lives in a temporary file that is removed
//! by [`SeriesStorage::close`], or when the handle is dropped.

use crate::container::{Compression, Container, OpenMode, DEFAULT_CHUNK_TARGET_BYTES};
use crate::series::{OwnerRef, SeriesMetadata, TimeSeriesData};
use crate::storage::attributes::{read_attributes, EntryAttributes};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::ledger;
use crate::storage::reader::{read_series, IndexRange};
use crate::storage::traversal::{compare_storages, EntryIter};
use crate::storage::{entry_path, ROOT_GROUP};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use uuid::Uuid;

/// How to construct a [`SeriesStorage`]
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Container file; `None` creates a temporary file
    pub path: Option<PathBuf>,
    /// Directory for temporary files (default: system temp dir)
    pub directory: Option<PathBuf>,
    /// Forbid every mutating operation
    pub read_only: bool,
    /// Chunk compression for new containers
    pub compression: Compression,
    /// Target uncompressed size of a dataset chunk
    pub chunk_target_bytes: usize,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            path: None,
            directory: None,
            read_only: false,
            compression: Compression::Lz4,
            chunk_target_bytes: DEFAULT_CHUNK_TARGET_BYTES,
        }
    }
}

impl StorageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: back the storage with `path`
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Builder: place temporary files in `directory`
    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn chunk_target_bytes(mut self, bytes: usize) -> Self {
        self.chunk_target_bytes = bytes;
        self
    }
}

/// Deduplicating store of time series shared by many owners
pub struct SeriesStorage {
    path: PathBuf,
    read_only: bool,
    chunk_target_bytes: usize,
    /// Set when the file is private to this handle and removed with it
    temp: Option<TempPath>,
}

impl SeriesStorage {
    /// Create an empty storage
    ///
    /// Without `options.path` the container lives in a temporary file. A
    /// read-only storage must name an existing file, which is opened as is.
    pub fn create(options: StorageOptions) -> StorageResult<Self> {
        if options.read_only {
            let path = options.path.ok_or_else(|| {
                StorageError::NotFound("a read-only storage needs an existing file".to_string())
            })?;
            return Self::open_existing(path, true, options.directory.as_deref());
        }

        let (path, temp) = match options.path {
            Some(path) => (path, None),
            None => {
                let temp = temp_path(options.directory.as_deref())?;
                (temp.to_path_buf(), Some(temp))
            }
        };

        let mut container = Container::create(&path, options.compression)?
            .with_chunk_target(options.chunk_target_bytes);
        container.create_group(ROOT_GROUP)?;
        container.close()?;

        tracing::info!("Created series storage at {:?}", path);
        Ok(Self {
            path,
            read_only: false,
            chunk_target_bytes: options.chunk_target_bytes,
            temp,
        })
    }

    /// Load a storage from an existing container file
    ///
    /// A read-only storage opens `path` directly, so several handles may share
    /// it. Otherwise the file is copied into `directory` (default: system temp
    /// dir) and the handle works on the private copy; `path` is never modified.
    pub fn open_existing(
        path: impl AsRef<Path>,
        read_only: bool,
        directory: Option<&Path>,
    ) -> StorageResult<Self> {
        let source = path.as_ref();
        if !source.exists() {
            return Err(StorageError::NotFound(source.display().to_string()));
        }

        let (path, temp) = if read_only {
            (source.to_path_buf(), None)
        } else {
            let temp = temp_path(directory)?;
            std::fs::copy(source, &temp)?;
            tracing::debug!("Copied {:?} to {:?}", source, temp);
            (temp.to_path_buf(), Some(temp))
        };

        // Validate the header and index before handing out the handle
        Container::open(&path, OpenMode::ReadOnly)?;

        tracing::info!(
            "Opened series storage {:?} ({})",
            source,
            if read_only { "read-only" } else { "private copy" }
        );
        Ok(Self {
            path,
            read_only,
            chunk_target_bytes: DEFAULT_CHUNK_TARGET_BYTES,
            temp,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Path of the container file this handle operates on
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the container file, dead space included
    pub fn size_on_disk(&self) -> StorageResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    // ==================== Mutation ====================

    /// Store `series` for `owner` under `name`
    ///
    /// A series whose content UUID is already stored only gains a reference.
    /// Returns whether a new entry was written.
    pub fn store(&mut self, owner: Uuid, name: &str, series: &TimeSeriesData) -> StorageResult<bool> {
        let reference = OwnerRef::new(owner, name).to_string();
        self.write(|container| ledger::store_entry(container, series, &reference))
    }

    /// Reference an already stored series from `owner` under `name`
    pub fn add_reference(&mut self, owner: Uuid, name: &str, content_id: Uuid) -> StorageResult<()> {
        let reference = OwnerRef::new(owner, name).to_string();
        self.write(|container| ledger::append_reference(container, content_id, &reference))?;
        Ok(())
    }

    /// Drop `owner`'s reference to a series
    ///
    /// Returns true when that was the last reference and the entry was deleted.
    pub fn remove_reference(
        &mut self,
        content_id: Uuid,
        owner: Uuid,
        name: &str,
    ) -> StorageResult<bool> {
        let reference = OwnerRef::new(owner, name).to_string();
        self.write(|container| ledger::remove_reference(container, content_id, &reference))
    }

    /// Remove every entry
    ///
    /// The space they used is not reclaimed; repacking the file is a separate step.
    pub fn clear(&mut self) -> StorageResult<()> {
        self.write(|container| {
            container.delete(ROOT_GROUP)?;
            container.create_group(ROOT_GROUP)?;
            Ok(())
        })?;
        tracing::info!("Cleared series storage {:?}", self.path);
        Ok(())
    }

    // ==================== Reads ====================

    /// Read rows `rows` of windows `columns` of a stored series
    ///
    /// Rows and columns are 1-based and inclusive; a single series uses
    /// `IndexRange::single(1)` for `columns`.
    pub fn read(
        &self,
        metadata: &SeriesMetadata,
        rows: IndexRange,
        columns: IndexRange,
    ) -> StorageResult<TimeSeriesData> {
        self.with_reader(|container| read_series(container, metadata, rows, columns))
    }

    /// Number of stored entries
    pub fn count(&self) -> StorageResult<usize> {
        self.with_reader(|container| Ok(container.children(ROOT_GROUP)?.len()))
    }

    pub fn contains(&self, content_id: Uuid) -> StorageResult<bool> {
        self.with_reader(|container| Ok(container.contains(&entry_path(content_id))))
    }

    /// Owner references recorded for a series, in insertion order
    pub fn references(&self, content_id: Uuid) -> StorageResult<Vec<String>> {
        self.with_reader(|container| ledger::references(container, content_id))
    }

    /// Decoded attributes of a stored series
    pub fn entry_metadata(&self, content_id: Uuid, rows: IndexRange) -> StorageResult<EntryAttributes> {
        self.with_reader(|container| {
            if !container.contains(&entry_path(content_id)) {
                return Err(StorageError::NotFound(format!("time series {}", content_id)));
            }
            read_attributes(container, content_id, rows)
        })
    }

    /// Lazily walk every (entry, reference) pair
    ///
    /// Each call starts a fresh pass over the file.
    pub fn entries(&self) -> EntryIter {
        EntryIter::new(self.path.clone())
    }

    /// Whether `other` holds exactly the same entries and references
    pub fn compare(&self, other: &SeriesStorage) -> StorageResult<bool> {
        compare_storages(self, other)
    }

    // ==================== Lifecycle ====================

    /// Release the storage, removing its file if it is temporary
    pub fn close(mut self) -> StorageResult<()> {
        if let Some(temp) = self.temp.take() {
            let path = temp.to_path_buf();
            temp.close()?;
            tracing::debug!("Removed temporary storage file {:?}", path);
        }
        Ok(())
    }

    // ==================== Internals ====================

    fn check_read_only(&self) -> StorageResult<()> {
        if self.read_only {
            return Err(StorageError::ReadOnlyViolation);
        }
        Ok(())
    }

    /// Run `f` against a writable container, closing it on every path
    fn write<T>(
        &mut self,
        f: impl FnOnce(&mut Container) -> StorageResult<T>,
    ) -> StorageResult<T> {
        self.check_read_only()?;
        let mut container = Container::open(&self.path, OpenMode::ReadWrite)?
            .with_chunk_target(self.chunk_target_bytes);
        let result = f(&mut container);
        finish(result, container.close())
    }

    /// Run `f` against a read-only container
    fn with_reader<T>(&self, f: impl FnOnce(&Container) -> StorageResult<T>) -> StorageResult<T> {
        let container = Container::open(&self.path, OpenMode::ReadOnly)?;
        let result = f(&container);
        finish(result, container.close())
    }
}

impl Drop for SeriesStorage {
    fn drop(&mut self) {
        if let Some(temp) = self.temp.take() {
            let path = temp.to_path_buf();
            if let Err(e) = temp.close() {
                tracing::warn!("Failed to remove temporary storage file {:?}: {}", path, e);
            }
        }
    }
}

/// Combine an operation's result with the container close result,
/// preferring the operation's error
fn finish<T>(
    result: StorageResult<T>,
    closed: crate::container::ContainerResult<()>,
) -> StorageResult<T> {
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!("Failed to close container after error: {}", close_err);
            Err(e)
        }
    }
}

fn temp_path(directory: Option<&Path>) -> StorageResult<TempPath> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("seriesvault-").suffix(".tsv");
    let file = match directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            builder.tempfile_in(dir)?
        }
        None => builder.tempfile()?,
    };
    Ok(file.into_temp_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{
        Deterministic, DeterministicSingleTimeSeries, ForecastParams, LogicalType, Matrix,
        Probabilistic, SingleTimeSeries, Values,
    };
    use chrono::Duration;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    const HOUR: i64 = 3_600_000;
    const T0: i64 = 1_704_067_200_000; // 2024-01-01T00:00:00Z

    fn storage_in(dir: &Path) -> SeriesStorage {
        SeriesStorage::create(StorageOptions::new().directory(dir).chunk_target_bytes(256)).unwrap()
    }

    fn hourly_forecast(horizon: usize, count: usize) -> TimeSeriesData {
        let windows = (0..count)
            .map(|w| {
                let values = (0..horizon).map(|r| w as f64 * 1000.0 + r as f64 * 0.25).collect();
                (T0 + w as i64 * HOUR, Values::Float(values))
            })
            .collect();
        Deterministic::new(Duration::hours(1), Duration::hours(1), windows)
            .unwrap()
            .into()
    }

    fn full_read(storage: &SeriesStorage, series: &TimeSeriesData) -> TimeSeriesData {
        let metadata = SeriesMetadata::for_series("x", series);
        let (rows, columns) = match series {
            TimeSeriesData::SingleTimeSeries(s) => (s.len(), 1),
            _ => (metadata.horizon.unwrap(), metadata.count.unwrap()),
        };
        storage
            .read(&metadata, IndexRange::new(1, rows).unwrap(), IndexRange::new(1, columns).unwrap())
            .unwrap()
    }

    #[test]
    fn test_example_scenario() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        let (owner_a, owner_b) = (Uuid::new_v4(), Uuid::new_v4());

        let forecast = hourly_forecast(24, 3);
        let content_id = forecast.uuid();
        assert!(storage.store(owner_a, "load", &forecast).unwrap());
        storage.add_reference(owner_b, "load2", content_id).unwrap();
        assert_eq!(storage.references(content_id).unwrap().len(), 2);
        let before = storage.count().unwrap();

        let metadata = SeriesMetadata::for_series("load", &forecast);
        let read = storage
            .read(&metadata, IndexRange::new(1, 24).unwrap(), IndexRange::single(2).unwrap())
            .unwrap();
        assert_eq!(read.timestamps(), vec![T0 + HOUR]);
        match (&read, &forecast) {
            (TimeSeriesData::Deterministic(read), TimeSeriesData::Deterministic(original)) => {
                assert_eq!(read.window(T0 + HOUR), original.window(T0 + HOUR));
            }
            other => panic!("unexpected {:?}", other),
        }

        assert!(!storage.remove_reference(content_id, owner_a, "load").unwrap());
        assert!(storage.contains(content_id).unwrap());
        assert!(storage.remove_reference(content_id, owner_b, "load2").unwrap());
        assert!(!storage.contains(content_id).unwrap());
        assert_eq!(storage.count().unwrap(), before - 1);

        let err = storage
            .read(&metadata, IndexRange::new(1, 24).unwrap(), IndexRange::single(2).unwrap())
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_roundtrip_every_kind() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        let owner = Uuid::new_v4();

        let pwl = |seed: f64| -> Vec<Vec<Vec<f64>>> {
            (0..6)
                .map(|r| (0..3).map(|s| vec![seed + r as f64, s as f64 / 3.0]).collect())
                .collect()
        };
        let mut poly_windows = BTreeMap::new();
        let mut pwl_windows = BTreeMap::new();
        for w in 0..4 {
            let key = T0 + w * 2 * HOUR;
            poly_windows.insert(
                key,
                Values::Polynomial((0..6).map(|r| vec![w as f64, r as f64, 1e-9]).collect()),
            );
            pwl_windows.insert(key, Values::PiecewiseLinear(pwl(w as f64)));
        }

        let cases: Vec<TimeSeriesData> = vec![
            SingleTimeSeries::new(T0, Duration::minutes(5), Values::Float(vec![0.1, -2.5, f64::MAX]))
                .into(),
            SingleTimeSeries::new(
                T0,
                Duration::hours(1),
                Values::Polynomial(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]),
            )
            .into(),
            SingleTimeSeries::new(T0, Duration::hours(1), Values::PiecewiseLinear(pwl(0.5))).into(),
            hourly_forecast(12, 5),
            Deterministic::new(Duration::hours(1), Duration::hours(2), poly_windows)
                .unwrap()
                .into(),
            Deterministic::new(Duration::hours(1), Duration::hours(2), pwl_windows)
                .unwrap()
                .into(),
        ];

        for series in &cases {
            storage.store(owner, "x", series).unwrap();
            assert_eq!(&full_read(&storage, series), series);
        }
        assert_eq!(storage.count().unwrap(), cases.len());
    }

    #[test]
    fn test_derived_forecast_stored_as_backing_series() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());

        let single = SingleTimeSeries::new(
            T0,
            Duration::hours(1),
            Values::Float((0..48).map(|i| i as f64 * 1.5).collect()),
        );
        let params = ForecastParams {
            initial_timestamp: T0,
            interval: Duration::hours(12),
            horizon: 24,
            count: 3,
        };
        let derived: TimeSeriesData = DeterministicSingleTimeSeries::new(single, params)
            .unwrap()
            .into();

        assert!(storage.store(Uuid::new_v4(), "load", &derived).unwrap());
        let attributes = storage
            .entry_metadata(derived.uuid(), IndexRange::new(1, 48).unwrap())
            .unwrap();
        assert_eq!(attributes.logical_type, LogicalType::SingleTimeSeries);
        assert_eq!(attributes.dataset_shape, vec![48]);

        let metadata = SeriesMetadata::for_series("load", &derived);
        let read = storage
            .read(&metadata, IndexRange::new(1, 24).unwrap(), IndexRange::new(1, 3).unwrap())
            .unwrap();
        assert_eq!(read, derived);
    }

    #[test]
    fn test_reference_growth_is_linear() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        let series: TimeSeriesData =
            SingleTimeSeries::new(T0, Duration::hours(1), Values::Float(vec![1.0])).into();
        storage.store(Uuid::new_v4(), "load", &series).unwrap();

        for _ in 0..500 {
            storage.add_reference(Uuid::new_v4(), "load", series.uuid()).unwrap();
        }
        assert_eq!(storage.references(series.uuid()).unwrap().len(), 501);
        // each reference is about 50 bytes once encoded
        assert!(storage.size_on_disk().unwrap() < 500 * 512);
    }

    #[test]
    fn test_distinct_references_counted_once() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        let series = hourly_forecast(4, 2);
        let owners: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();

        for owner in &owners {
            storage.store(*owner, "load", &series).unwrap();
            storage.add_reference(*owner, "load", series.uuid()).unwrap();
        }
        assert_eq!(storage.references(series.uuid()).unwrap().len(), owners.len());
        assert_eq!(storage.count().unwrap(), 1);
        assert_eq!(storage.entries().count(), owners.len());
    }

    #[test]
    fn test_remove_unknown_reference_leaves_entry() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        let series = hourly_forecast(4, 2);
        let owner = Uuid::new_v4();
        storage.store(owner, "load", &series).unwrap();

        let err = storage
            .remove_reference(series.uuid(), Uuid::new_v4(), "load")
            .unwrap_err();
        assert!(matches!(err, StorageError::ReferenceNotFound { .. }));
        assert_eq!(
            storage.references(series.uuid()).unwrap(),
            vec![OwnerRef::new(owner, "load").to_string()]
        );

        assert!(matches!(
            storage
                .remove_reference(Uuid::new_v4(), owner, "load")
                .unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[test]
    fn test_add_reference_to_missing_entry() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        assert!(matches!(
            storage
                .add_reference(Uuid::new_v4(), "load", Uuid::new_v4())
                .unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.tsv");
        let series = hourly_forecast(4, 2);
        {
            let mut storage = SeriesStorage::create(StorageOptions::new().path(&path)).unwrap();
            storage.store(Uuid::new_v4(), "load", &series).unwrap();
            storage.close().unwrap();
        }
        let before = std::fs::read(&path).unwrap();

        let mut storage =
            SeriesStorage::create(StorageOptions::new().path(&path).read_only(true)).unwrap();
        assert!(storage.is_read_only());
        assert_eq!(storage.path(), path.as_path());

        let owner = Uuid::new_v4();
        let results = [
            storage.store(owner, "load", &hourly_forecast(2, 1)).err(),
            storage.add_reference(owner, "load", series.uuid()).err(),
            storage.remove_reference(series.uuid(), owner, "load").err(),
            storage.clear().err(),
        ];
        for err in results {
            assert!(matches!(err, Some(StorageError::ReadOnlyViolation)));
        }

        assert_eq!(storage.count().unwrap(), 1);
        drop(storage);
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(path.exists());
    }

    #[test]
    fn test_read_only_handles_share_a_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.tsv");
        let series = hourly_forecast(6, 3);
        {
            let mut storage = SeriesStorage::create(StorageOptions::new().path(&path)).unwrap();
            storage.store(Uuid::new_v4(), "load", &series).unwrap();
        }

        let a = SeriesStorage::open_existing(&path, true, None).unwrap();
        let b = SeriesStorage::open_existing(&path, true, None).unwrap();
        assert_eq!(full_read(&a, &series), full_read(&b, &series));
        assert!(a.compare(&b).unwrap());
    }

    #[test]
    fn test_read_only_create_needs_a_file() {
        let err = SeriesStorage::create(StorageOptions::new().read_only(true))
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::NotFound(_)));

        let dir = tempdir().unwrap();
        let err = SeriesStorage::open_existing(dir.path().join("missing.tsv"), false, None)
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_open_existing_works_on_a_copy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("source.tsv");
        let series = hourly_forecast(4, 2);
        {
            let mut storage = SeriesStorage::create(StorageOptions::new().path(&path)).unwrap();
            storage.store(Uuid::new_v4(), "load", &series).unwrap();
        }
        let before = std::fs::read(&path).unwrap();

        let scratch = dir.path().join("scratch");
        let mut storage = SeriesStorage::open_existing(&path, false, Some(scratch.as_path())).unwrap();
        assert_ne!(storage.path(), path.as_path());
        assert!(storage.path().starts_with(&scratch));
        assert_eq!(full_read(&storage, &series), series);

        storage.clear().unwrap();
        assert_eq!(storage.count().unwrap(), 0);
        assert_eq!(std::fs::read(&path).unwrap(), before);

        let copy = storage.path().to_path_buf();
        storage.close().unwrap();
        assert!(!copy.exists());
    }

    #[test]
    fn test_clear_empties_storage() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        for _ in 0..3 {
            storage
                .store(Uuid::new_v4(), "load", &hourly_forecast(8, 2))
                .unwrap();
        }
        let size = storage.size_on_disk().unwrap();

        storage.clear().unwrap();
        assert_eq!(storage.count().unwrap(), 0);
        assert_eq!(storage.entries().count(), 0);
        // no space reclaimed
        assert!(storage.size_on_disk().unwrap() >= size);
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let dir = tempdir().unwrap();
        let storage = storage_in(dir.path());
        let path = storage.path().to_path_buf();
        assert!(path.exists());
        drop(storage);
        assert!(!path.exists());
    }

    #[test]
    fn test_entry_metadata() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        let forecast = hourly_forecast(24, 3);
        storage.store(Uuid::new_v4(), "load", &forecast).unwrap();

        let attrs = storage
            .entry_metadata(forecast.uuid(), IndexRange::new(3, 24).unwrap())
            .unwrap();
        assert_eq!(attrs.logical_type, LogicalType::Deterministic);
        assert_eq!(attrs.dataset_shape, vec![24, 3]);
        assert_eq!(attrs.start_time, T0 + 2 * HOUR);
        assert_eq!(attrs.interval_ms, Some(HOUR));

        assert!(matches!(
            storage
                .entry_metadata(Uuid::new_v4(), IndexRange::single(1).unwrap())
                .unwrap_err(),
            StorageError::NotFound(_)
        ));
    }

    #[test]
    fn test_unsupported_elements_are_not_stored() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        let flags: TimeSeriesData =
            SingleTimeSeries::new(T0, Duration::hours(1), Values::Boolean(vec![true, false])).into();
        assert!(matches!(
            storage.store(Uuid::new_v4(), "flags", &flags).unwrap_err(),
            StorageError::UnsupportedDataKind(_)
        ));
        assert_eq!(storage.count().unwrap(), 0);
    }

    #[test]
    fn test_probabilistic_through_storage() {
        let dir = tempdir().unwrap();
        let mut storage = storage_in(dir.path());
        let windows = (0..3)
            .map(|w| {
                let rows = (0..4).map(|r| vec![w as f64, r as f64]).collect();
                (T0 + w * HOUR, Matrix::from_rows(rows).unwrap())
            })
            .collect();
        let series: TimeSeriesData =
            Probabilistic::new(Duration::hours(1), Duration::hours(1), vec![0.25, 0.75], windows)
                .unwrap()
                .into();
        storage.store(Uuid::new_v4(), "load", &series).unwrap();

        assert_eq!(full_read(&storage, &series), series);

        // single column equals the same column of a full read
        let metadata = SeriesMetadata::for_series("load", &series);
        let one = storage
            .read(&metadata, IndexRange::new(1, 4).unwrap(), IndexRange::single(2).unwrap())
            .unwrap();
        match (one, series) {
            (TimeSeriesData::Probabilistic(one), TimeSeriesData::Probabilistic(all)) => {
                assert_eq!(one.windows().get(&(T0 + HOUR)), all.windows().get(&(T0 + HOUR)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
