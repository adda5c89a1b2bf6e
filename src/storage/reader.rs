//! Windowed reads
//!
//! A read selects a row range (time steps within a window) and a column
//! range (forecast windows) and decodes only that block. Both ranges are
//! 1-based and inclusive; bounds are the caller's responsibility.
//!
//! Dispatch is by the family of the requested type:
//!
//! ```text
//! Single         data[rows]                       stored type must match exactly
//! Deterministic  data[rows, columns]              or windows derived from a stored single series
//! Probabilistic  data[0..percentiles, rows, columns] -> (column, row, percentile)
//! Scenarios      data[0..scenarios, rows, columns]   -> (column, row, scenario)
//! ```

use crate::container::{Container, Hyperslab};
use crate::series::{
    millis_to_duration, Deterministic, DeterministicSingleTimeSeries, LogicalType, Matrix,
    Probabilistic, Scenarios, SeriesFamily, SeriesMetadata, SingleTimeSeries, TimeSeriesData,
};
use crate::storage::attributes::{read_attributes, EntryAttributes, INTERVAL};
use crate::storage::codec::{check_rank, decode_ensemble, decode_values, decode_windows, Arity};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::{data_path, entry_path};
use std::collections::BTreeMap;
use std::ops::Range;
use uuid::Uuid;

/// 1-based inclusive index range over rows or forecast windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexRange {
    pub first: usize,
    pub last: usize,
}

impl IndexRange {
    /// Create a new index range; `first` must be at least 1 and at most `last`
    pub fn new(first: usize, last: usize) -> StorageResult<Self> {
        if first == 0 || first > last {
            return Err(StorageError::InvalidRange { first, last });
        }
        Ok(Self { first, last })
    }

    /// Range covering only `index`
    pub fn single(index: usize) -> StorageResult<Self> {
        Self::new(index, index)
    }

    pub fn len(&self) -> usize {
        self.last - self.first + 1
    }

    /// Zero-based half-open equivalent
    pub fn to_zero_based(&self) -> Range<usize> {
        self.first - 1..self.last
    }
}

/// Read rows `rows` of windows `columns` of the entry described by `metadata`
pub fn read_series(
    container: &Container,
    metadata: &SeriesMetadata,
    rows: IndexRange,
    columns: IndexRange,
) -> StorageResult<TimeSeriesData> {
    let content_id = metadata.content_id;
    if !container.contains(&entry_path(content_id)) {
        return Err(StorageError::NotFound(format!("time series {}", content_id)));
    }

    let attrs = read_attributes(container, content_id, rows)?;
    tracing::trace!(
        "Reading {} as {} rows {:?} columns {:?}",
        content_id,
        metadata.logical_type,
        rows,
        columns
    );

    match metadata.logical_type.family() {
        SeriesFamily::Single => read_single(container, metadata, &attrs, rows),
        SeriesFamily::Deterministic => read_deterministic(container, metadata, &attrs, rows, columns),
        SeriesFamily::Probabilistic => {
            ensure_stored(&attrs, metadata.logical_type)?;
            let windows = read_ensemble(
                container,
                content_id,
                &attrs,
                metadata.percentiles.len(),
                rows,
                columns,
            )?;
            let forecast = Probabilistic::new(
                millis_to_duration(attrs.resolution_ms),
                stored_interval(&attrs, content_id)?,
                metadata.percentiles.clone(),
                windows,
            )?;
            Ok(forecast.with_uuid(content_id).into())
        }
        SeriesFamily::Scenarios => {
            ensure_stored(&attrs, metadata.logical_type)?;
            let scenario_count =
                metadata
                    .scenario_count
                    .ok_or_else(|| StorageError::MissingAttribute {
                        content_id,
                        name: "scenario_count".to_string(),
                    })?;
            let windows =
                read_ensemble(container, content_id, &attrs, scenario_count, rows, columns)?;
            let forecast = Scenarios::new(
                millis_to_duration(attrs.resolution_ms),
                stored_interval(&attrs, content_id)?,
                scenario_count,
                windows,
            )?;
            Ok(forecast.with_uuid(content_id).into())
        }
    }
}

fn ensure_stored(attrs: &EntryAttributes, requested: LogicalType) -> StorageResult<()> {
    if attrs.logical_type != requested {
        return Err(StorageError::TypeMismatch {
            stored: attrs.logical_type.to_string(),
            requested: requested.to_string(),
        });
    }
    Ok(())
}

fn stored_interval(attrs: &EntryAttributes, content_id: Uuid) -> StorageResult<chrono::Duration> {
    attrs
        .interval_ms
        .map(millis_to_duration)
        .ok_or_else(|| StorageError::MissingAttribute {
            content_id,
            name: INTERVAL.to_string(),
        })
}

/// Selection of `rows` on axis 0 and everything on the remaining axes
fn row_slab(shape: &[usize], rows: IndexRange) -> Hyperslab {
    let mut slab = Hyperslab::full(shape);
    slab.ranges[0] = rows.to_zero_based();
    slab
}

/// Start timestamp of each window in `columns`, relative to the row window
fn window_keys(
    attrs: &EntryAttributes,
    interval_ms: i64,
    columns: IndexRange,
) -> impl Iterator<Item = i64> {
    let start = attrs.start_time;
    (columns.first - 1..columns.last).map(move |column| start + interval_ms * column as i64)
}

fn read_single(
    container: &Container,
    metadata: &SeriesMetadata,
    attrs: &EntryAttributes,
    rows: IndexRange,
) -> StorageResult<TimeSeriesData> {
    ensure_stored(attrs, metadata.logical_type)?;
    if check_rank(attrs.data_kind, &attrs.dataset_shape)? != Arity::Single {
        return Err(StorageError::MalformedPayloadShape(format!(
            "single series stored with shape {:?}",
            attrs.dataset_shape
        )));
    }

    let block = container.read_slab(
        &data_path(metadata.content_id),
        &row_slab(&attrs.dataset_shape, rows),
    )?;
    let values = decode_values(attrs.data_kind, &block)?;

    Ok(SingleTimeSeries::new(attrs.start_time, millis_to_duration(attrs.resolution_ms), values)
        .with_uuid(metadata.content_id)
        .into())
}

fn read_deterministic(
    container: &Container,
    metadata: &SeriesMetadata,
    attrs: &EntryAttributes,
    rows: IndexRange,
    columns: IndexRange,
) -> StorageResult<TimeSeriesData> {
    let content_id = metadata.content_id;

    match attrs.logical_type {
        // Stored as a plain series: derive the windows from it
        LogicalType::SingleTimeSeries => {
            let params = metadata
                .forecast_params()
                .ok_or_else(|| StorageError::MissingAttribute {
                    content_id,
                    name: "interval, horizon and count".to_string(),
                })?;
            let block = container.read_dataset(&data_path(content_id))?;
            let values = decode_values(attrs.data_kind, &block)?;
            let single = SingleTimeSeries::new(
                attrs.initial_timestamp,
                millis_to_duration(attrs.resolution_ms),
                values,
            )
            .with_uuid(content_id);

            let last_valid_row = attrs.dataset_shape[0];
            let derived = DeterministicSingleTimeSeries::windowed(
                single,
                params,
                rows.to_zero_based(),
                columns.to_zero_based(),
                last_valid_row,
            )?;
            Ok(derived.into())
        }
        LogicalType::Deterministic => {
            if check_rank(attrs.data_kind, &attrs.dataset_shape)? != Arity::Windowed {
                return Err(StorageError::MalformedPayloadShape(format!(
                    "forecast stored with shape {:?}",
                    attrs.dataset_shape
                )));
            }

            let interval = stored_interval(attrs, content_id)?;
            let mut slab = row_slab(&attrs.dataset_shape, rows);
            slab.ranges[1] = columns.to_zero_based();
            let block = container.read_slab(&data_path(content_id), &slab)?;

            let windows: BTreeMap<i64, _> = window_keys(attrs, interval.num_milliseconds(), columns)
                .zip(decode_windows(attrs.data_kind, &block)?)
                .collect();
            let forecast =
                Deterministic::new(millis_to_duration(attrs.resolution_ms), interval, windows)?;
            Ok(forecast.with_uuid(content_id).into())
        }
        other => Err(StorageError::TypeMismatch {
            stored: other.to_string(),
            requested: metadata.logical_type.to_string(),
        }),
    }
}

/// Read a `(width, row, column)` ensemble and split it into one matrix per column
///
/// Only the requested columns are read, so a single-column request touches
/// one column of the payload.
fn read_ensemble(
    container: &Container,
    content_id: Uuid,
    attrs: &EntryAttributes,
    width: usize,
    rows: IndexRange,
    columns: IndexRange,
) -> StorageResult<BTreeMap<i64, Matrix>> {
    if attrs.dataset_shape.len() != 3 {
        return Err(StorageError::MalformedPayloadShape(format!(
            "ensemble stored with shape {:?}",
            attrs.dataset_shape
        )));
    }

    let interval_ms = stored_interval(attrs, content_id)?.num_milliseconds();
    let slab = Hyperslab::new(vec![0..width, rows.to_zero_based(), columns.to_zero_based()]);
    let block = container.read_slab(&data_path(content_id), &slab)?;
    let reordered = block.permute(&[2, 1, 0])?;

    Ok(window_keys(attrs, interval_ms, columns)
        .zip(decode_ensemble(&reordered)?)
        .collect())
}
