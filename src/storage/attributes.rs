//! Entry attributes
//!
//! Every entry group carries the tag that says what it holds:
//!
//! ```text
//! source_module      string   module half of the type tag
//! logical_type       string   type half of the type tag
//! initial_timestamp  integer  epoch milliseconds
//! resolution         integer  milliseconds
//! data_kind          string   CONSTANT | POLYNOMIAL | PWL
//! interval           integer  milliseconds, forecast entries only
//! ```

use crate::container::{AttrValue, Attributes, Container};
use crate::series::{duration_to_millis, ElementType, LogicalType, TimeSeriesData};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::reader::IndexRange;
use crate::storage::{data_path, entry_path};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const SOURCE_MODULE: &str = "source_module";
pub const LOGICAL_TYPE: &str = "logical_type";
pub const INITIAL_TIMESTAMP: &str = "initial_timestamp";
pub const RESOLUTION: &str = "resolution";
pub const DATA_KIND: &str = "data_kind";
pub const INTERVAL: &str = "interval";

/// Element encoding of an entry's data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataKind {
    /// One number per cell
    Constant,
    /// A fixed-length coefficient tuple per cell
    Polynomial,
    /// A fixed number of coefficient tuples (segments) per cell
    #[serde(rename = "PWL")]
    PiecewiseLinear,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Constant => "CONSTANT",
            DataKind::Polynomial => "POLYNOMIAL",
            DataKind::PiecewiseLinear => "PWL",
        }
    }

    /// Rank of a single-series payload; windowed payloads add one axis
    pub fn base_rank(&self) -> usize {
        match self {
            DataKind::Constant => 1,
            DataKind::Polynomial => 2,
            DataKind::PiecewiseLinear => 3,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONSTANT" => Ok(DataKind::Constant),
            "POLYNOMIAL" => Ok(DataKind::Polynomial),
            "PWL" => Ok(DataKind::PiecewiseLinear),
            other => Err(StorageError::UnsupportedDataKind(other.to_string())),
        }
    }
}

/// Classify an element type; integers are stored as floating point
pub fn data_kind_of(element: ElementType) -> StorageResult<DataKind> {
    match element {
        ElementType::Float | ElementType::Integer => Ok(DataKind::Constant),
        ElementType::Polynomial { .. } => Ok(DataKind::Polynomial),
        ElementType::PiecewiseLinear { .. } => Ok(DataKind::PiecewiseLinear),
        other => Err(StorageError::UnsupportedDataKind(other.to_string())),
    }
}

/// Map a stored `(module, type name)` tag back to a series type
pub fn resolve_logical_type(module: &str, type_name: &str) -> StorageResult<LogicalType> {
    LogicalType::resolve(module, type_name).ok_or_else(|| StorageError::UnresolvableType {
        module: module.to_string(),
        type_name: type_name.to_string(),
    })
}

/// Tag the entry group of `content_id` with the attributes of `series`
///
/// A derived forecast is stored as its backing single series, so it is
/// tagged as one.
pub fn write_attributes(
    container: &mut Container,
    content_id: Uuid,
    series: &TimeSeriesData,
) -> StorageResult<()> {
    let (logical_type, initial_timestamp, resolution, interval) = match series {
        TimeSeriesData::DeterministicSingleTimeSeries(derived) => {
            let single = derived.single();
            (
                LogicalType::SingleTimeSeries,
                single.initial_timestamp,
                single.resolution,
                None,
            )
        }
        other => (
            other.logical_type(),
            other.initial_timestamp(),
            other.resolution(),
            other.interval(),
        ),
    };
    let data_kind = data_kind_of(series.element_type())?;

    let path = entry_path(content_id);
    container.set_attr(&path, SOURCE_MODULE, logical_type.module())?;
    container.set_attr(&path, LOGICAL_TYPE, logical_type.type_name())?;
    container.set_attr(&path, INITIAL_TIMESTAMP, initial_timestamp)?;
    container.set_attr(&path, RESOLUTION, duration_to_millis(resolution))?;
    container.set_attr(&path, DATA_KIND, data_kind.as_str())?;
    if let Some(interval) = interval {
        container.set_attr(&path, INTERVAL, duration_to_millis(interval))?;
    }
    Ok(())
}

/// Decoded attributes of one entry, relative to a row window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryAttributes {
    /// Type the entry was stored as
    #[serde(serialize_with = "serialize_logical_type")]
    pub logical_type: LogicalType,
    pub initial_timestamp: i64,
    pub resolution_ms: i64,
    pub data_kind: DataKind,
    pub dataset_shape: Vec<usize>,
    /// Timestamp of the first row of the window
    pub start_time: i64,
    pub interval_ms: Option<i64>,
}

fn serialize_logical_type<S: serde::Serializer>(
    ty: &LogicalType,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(ty)
}

/// Read and decode the attributes of `content_id`'s entry
///
/// `start_time` is the timestamp of row `rows.first` (1-based).
pub fn read_attributes(
    container: &Container,
    content_id: Uuid,
    rows: IndexRange,
) -> StorageResult<EntryAttributes> {
    let attrs = container.attrs(&entry_path(content_id))?;

    let module = required_str(attrs, content_id, SOURCE_MODULE)?;
    let type_name = required_str(attrs, content_id, LOGICAL_TYPE)?;
    let logical_type = resolve_logical_type(module, type_name)?;
    let initial_timestamp = required_int(attrs, content_id, INITIAL_TIMESTAMP)?;
    let resolution_ms = required_int(attrs, content_id, RESOLUTION)?;
    let data_kind = required_str(attrs, content_id, DATA_KIND)?.parse::<DataKind>()?;
    let interval_ms = attrs.get(INTERVAL).and_then(AttrValue::as_int);
    let dataset_shape = container.dataset_shape(&data_path(content_id))?;

    Ok(EntryAttributes {
        logical_type,
        initial_timestamp,
        resolution_ms,
        data_kind,
        dataset_shape,
        start_time: initial_timestamp + resolution_ms * (rows.first as i64 - 1),
        interval_ms,
    })
}

fn required<'a>(attrs: &'a Attributes, content_id: Uuid, name: &str) -> StorageResult<&'a AttrValue> {
    attrs.get(name).ok_or_else(|| StorageError::MissingAttribute {
        content_id,
        name: name.to_string(),
    })
}

fn required_str<'a>(attrs: &'a Attributes, content_id: Uuid, name: &str) -> StorageResult<&'a str> {
    required(attrs, content_id, name)?
        .as_str()
        .ok_or_else(|| StorageError::MissingAttribute {
            content_id,
            name: format!("{} (string)", name),
        })
}

fn required_int(attrs: &Attributes, content_id: Uuid, name: &str) -> StorageResult<i64> {
    required(attrs, content_id, name)?
        .as_int()
        .ok_or_else(|| StorageError::MissingAttribute {
            content_id,
            name: format!("{} (integer)", name),
        })
}
