//! Entry payload encoding
//!
//! Payload layouts by data kind, for a single series and for a windowed
//! ensemble (one column per forecast window):
//!
//! ```text
//!              single                 windowed
//! CONSTANT     (row)                  (row, column)
//! POLYNOMIAL   (row, coeff)           (row, column, coeff)
//! PWL          (row, coeff, segment)  (row, column, coeff, segment)
//! ```
//!
//! Probabilistic and scenario ensembles are always `(width, row, column)`
//! where `width` is the percentile or scenario count.
//!
//! Decoding is a pure transform of an already-read block.

use crate::container::NdArray;
use crate::series::{Matrix, TimeSeriesData, Values};
use crate::storage::attributes::DataKind;
use crate::storage::error::{StorageError, StorageResult};

/// Whether a payload holds one series or an ensemble of windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Single,
    Windowed,
}

/// Validate the rank of a `kind` payload and report its arity
pub fn check_rank(kind: DataKind, shape: &[usize]) -> StorageResult<Arity> {
    let base = kind.base_rank();
    match shape.len() {
        n if n == base => Ok(Arity::Single),
        n if n == base + 1 => Ok(Arity::Windowed),
        _ => Err(StorageError::MalformedPayloadShape(format!(
            "{} payload of shape {:?}; expected rank {} or {}",
            kind,
            shape,
            base,
            base + 1
        ))),
    }
}

/// Trailing (per-cell) dimensions of `values`
fn cell_shape(values: &Values) -> StorageResult<Vec<usize>> {
    match values {
        Values::Float(_) | Values::Integer(_) => Ok(Vec::new()),
        Values::Polynomial(rows) => Ok(vec![rows.first().map_or(0, Vec::len)]),
        Values::PiecewiseLinear(rows) => {
            let segments = rows.first().map_or(0, Vec::len);
            let terms = rows.first().and_then(|s| s.first()).map_or(0, Vec::len);
            Ok(vec![terms, segments])
        }
        Values::Boolean(_) => Err(StorageError::UnsupportedDataKind(
            values.element_type().to_string(),
        )),
    }
}

fn ragged(row: usize, expected: &[usize]) -> StorageError {
    StorageError::MalformedPayloadShape(format!(
        "row {} does not match cell shape {:?}",
        row, expected
    ))
}

/// Append the cell at `row` to `out` in `(coeff, segment)` order
fn push_cell(values: &Values, row: usize, cell: &[usize], out: &mut Vec<f64>) -> StorageResult<()> {
    match values {
        Values::Float(v) => out.push(v[row]),
        Values::Integer(v) => out.push(v[row] as f64),
        Values::Polynomial(rows) => {
            let tuple = &rows[row];
            if tuple.len() != cell[0] {
                return Err(ragged(row, cell));
            }
            out.extend_from_slice(tuple);
        }
        Values::PiecewiseLinear(rows) => {
            let (terms, segments) = (cell[0], cell[1]);
            let segs = &rows[row];
            if segs.len() != segments || segs.iter().any(|s| s.len() != terms) {
                return Err(ragged(row, cell));
            }
            for k in 0..terms {
                out.extend(segs.iter().map(|s| s[k]));
            }
        }
        Values::Boolean(_) => {
            return Err(StorageError::UnsupportedDataKind(
                values.element_type().to_string(),
            ))
        }
    }
    Ok(())
}

/// Encode a single series payload
pub fn encode_values(values: &Values) -> StorageResult<NdArray> {
    let cell = cell_shape(values)?;
    let rows = values.len();
    let mut data = Vec::with_capacity(rows * cell.iter().product::<usize>());
    for row in 0..rows {
        push_cell(values, row, &cell, &mut data)?;
    }

    let mut shape = vec![rows];
    shape.extend(&cell);
    NdArray::new(shape, data).map_err(|e| StorageError::MalformedPayloadShape(e.to_string()))
}

/// Encode forecast windows as a `(row, column, ...)` payload
pub fn encode_windows(windows: &[&Values]) -> StorageResult<NdArray> {
    let first = windows.first().ok_or_else(|| {
        StorageError::MalformedPayloadShape("a windowed payload needs at least one window".into())
    })?;
    let cell = cell_shape(first)?;
    let rows = first.len();
    if windows.iter().any(|w| w.len() != rows) {
        return Err(StorageError::MalformedPayloadShape(
            "forecast windows differ in length".into(),
        ));
    }

    let mut data = Vec::with_capacity(rows * windows.len() * cell.iter().product::<usize>());
    for row in 0..rows {
        for window in windows {
            push_cell(window, row, &cell, &mut data)?;
        }
    }

    let mut shape = vec![rows, windows.len()];
    shape.extend(&cell);
    NdArray::new(shape, data).map_err(|e| StorageError::MalformedPayloadShape(e.to_string()))
}

/// Encode percentile or scenario windows as a `(width, row, column)` payload
pub fn encode_ensemble(windows: &[&Matrix], width: usize) -> StorageResult<NdArray> {
    let rows = windows.first().map_or(0, |m| m.rows());
    if windows.iter().any(|m| m.rows() != rows || m.width() != width) {
        return Err(StorageError::MalformedPayloadShape(format!(
            "ensemble windows must all be {} x {}",
            rows, width
        )));
    }

    let mut data = Vec::with_capacity(width * rows * windows.len());
    for p in 0..width {
        for r in 0..rows {
            // in bounds: every window was checked to be rows x width
            data.extend(windows.iter().map(|m| m.get(r, p).unwrap_or_default()));
        }
    }
    NdArray::new(vec![width, rows, windows.len()], data)
        .map_err(|e| StorageError::MalformedPayloadShape(e.to_string()))
}

/// Encode the payload stored for `series`
///
/// A derived forecast stores its backing single series.
pub fn encode_series(series: &TimeSeriesData) -> StorageResult<NdArray> {
    match series {
        TimeSeriesData::SingleTimeSeries(single) => encode_values(&single.values),
        TimeSeriesData::DeterministicSingleTimeSeries(derived) => {
            encode_values(&derived.single().values)
        }
        TimeSeriesData::Deterministic(forecast) => {
            encode_windows(&forecast.windows().values().collect::<Vec<_>>())
        }
        TimeSeriesData::Probabilistic(forecast) => encode_ensemble(
            &forecast.windows().values().collect::<Vec<_>>(),
            forecast.percentiles().len(),
        ),
        TimeSeriesData::Scenarios(forecast) => encode_ensemble(
            &forecast.windows().values().collect::<Vec<_>>(),
            forecast.scenario_count(),
        ),
    }
}

/// Axis of the payload from [`encode_series`] that indexes forecast windows
pub fn window_axis(series: &TimeSeriesData) -> Option<usize> {
    match series {
        TimeSeriesData::SingleTimeSeries(_) | TimeSeriesData::DeterministicSingleTimeSeries(_) => {
            None
        }
        TimeSeriesData::Deterministic(_) => Some(1),
        TimeSeriesData::Probabilistic(_) | TimeSeriesData::Scenarios(_) => Some(2),
    }
}

/// Decode a single-series block
pub fn decode_values(kind: DataKind, block: &NdArray) -> StorageResult<Values> {
    if check_rank(kind, block.shape())? != Arity::Single {
        return Err(StorageError::MalformedPayloadShape(format!(
            "expected a single-series {} block, got shape {:?}",
            kind,
            block.shape()
        )));
    }

    let shape = block.shape();
    let rows = shape[0];
    let data = block.data();
    Ok(match kind {
        DataKind::Constant => Values::Float(data.to_vec()),
        DataKind::Polynomial => {
            let terms = shape[1];
            if terms == 0 {
                Values::Polynomial(vec![Vec::new(); rows])
            } else {
                Values::Polynomial(data.chunks(terms).map(<[f64]>::to_vec).collect())
            }
        }
        DataKind::PiecewiseLinear => {
            let (terms, segments) = (shape[1], shape[2]);
            let cell = terms * segments;
            let unpacked = (0..rows)
                .map(|r| {
                    let base = r * cell;
                    (0..segments)
                        .map(|s| (0..terms).map(|k| data[base + k * segments + s]).collect())
                        .collect()
                })
                .collect();
            Values::PiecewiseLinear(unpacked)
        }
    })
}

/// Decode a `(row, column, ...)` block into one `Values` per column
pub fn decode_windows(kind: DataKind, block: &NdArray) -> StorageResult<Vec<Values>> {
    if check_rank(kind, block.shape())? != Arity::Windowed {
        return Err(StorageError::MalformedPayloadShape(format!(
            "expected a windowed {} block, got shape {:?}",
            kind,
            block.shape()
        )));
    }

    (0..block.shape()[1])
        .map(|column| {
            let single = block.index_axis(1, column)?;
            decode_values(kind, &single)
        })
        .collect()
}

/// Turn a `(column, row, width)` block into one matrix per column
pub fn decode_ensemble(block: &NdArray) -> StorageResult<Vec<Matrix>> {
    let shape = block.shape();
    if shape.len() != 3 {
        return Err(StorageError::MalformedPayloadShape(format!(
            "ensemble block must be (column, row, width), got {:?}",
            shape
        )));
    }

    let (rows, width) = (shape[1], shape[2]);
    if rows * width == 0 {
        return Ok((0..shape[0])
            .filter_map(|_| Matrix::new(rows, width, Vec::new()))
            .collect());
    }
    block
        .data()
        .chunks(rows * width)
        .take(shape[0])
        .map(|slice| {
            Matrix::new(rows, width, slice.to_vec()).ok_or_else(|| {
                StorageError::MalformedPayloadShape(format!(
                    "ensemble column is not {} x {}",
                    rows, width
                ))
            })
        })
        .collect()
}
