//! In-memory series types
//!
//! - `SingleTimeSeries`: one sequence of values at a fixed resolution
//! - `Deterministic`: forecast windows of plain values
//! - `Probabilistic`: forecast windows of percentile rows
//! - `Scenarios`: forecast windows of scenario rows
//! - `DeterministicSingleTimeSeries`: forecast windows derived from a single series
//! - `TimeSeriesData`: tagged variant over all of the above
//! - `SeriesMetadata`: what a caller knows about a stored series when reading it

use crate::series::error::{SeriesError, SeriesResult};
use crate::series::registry::LogicalType;
use crate::series::values::{ElementType, Matrix, Values};
use chrono::Duration;
use std::collections::BTreeMap;
use std::ops::Range;
use uuid::Uuid;

/// Normalize a duration to whole milliseconds
pub fn duration_to_millis(duration: Duration) -> i64 {
    duration.num_milliseconds()
}

/// Inverse of [`duration_to_millis`]
pub fn millis_to_duration(millis: i64) -> Duration {
    Duration::milliseconds(millis)
}

/// One sequence of values at a fixed resolution
#[derive(Debug, Clone, PartialEq)]
pub struct SingleTimeSeries {
    /// Content identity of the values
    pub uuid: Uuid,
    /// Timestamp of the first value, epoch milliseconds
    pub initial_timestamp: i64,
    pub resolution: Duration,
    pub values: Values,
}

impl SingleTimeSeries {
    pub fn new(initial_timestamp: i64, resolution: Duration, values: Values) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            initial_timestamp,
            resolution,
            values,
        }
    }

    /// Builder: set the content identity
    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Check that window keys step by exactly `interval`
fn check_window_spacing<T>(windows: &BTreeMap<i64, T>, interval: Duration) -> SeriesResult<()> {
    if windows.is_empty() {
        return Err(SeriesError::InvalidSeries("a forecast needs at least one window".into()));
    }
    let step = duration_to_millis(interval);
    if step <= 0 {
        return Err(SeriesError::InvalidSeries(format!(
            "interval must be positive, got {} ms",
            step
        )));
    }
    let keys: Vec<i64> = windows.keys().copied().collect();
    if let Some(pair) = keys.windows(2).find(|pair| pair[1] - pair[0] != step) {
        return Err(SeriesError::InvalidSeries(format!(
            "windows at {} and {} are not {} ms apart",
            pair[0], pair[1], step
        )));
    }
    Ok(())
}

/// Forecast windows of plain values, keyed by window start
#[derive(Debug, Clone, PartialEq)]
pub struct Deterministic {
    uuid: Uuid,
    resolution: Duration,
    interval: Duration,
    windows: BTreeMap<i64, Values>,
}

impl Deterministic {
    /// Windows must be evenly spaced by `interval`, equally long and share an element type
    pub fn new(
        resolution: Duration,
        interval: Duration,
        windows: BTreeMap<i64, Values>,
    ) -> SeriesResult<Self> {
        check_window_spacing(&windows, interval)?;

        let mut iter = windows.values();
        if let Some(first) = iter.next() {
            let (len, element) = (first.len(), first.element_type());
            if iter.any(|w| w.len() != len || w.element_type() != element) {
                return Err(SeriesError::InvalidSeries(
                    "all windows must have the same length and element type".into(),
                ));
            }
        }

        Ok(Self {
            uuid: Uuid::new_v4(),
            resolution,
            interval,
            windows,
        })
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn initial_timestamp(&self) -> i64 {
        self.windows.keys().next().copied().unwrap_or_default()
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Steps per window
    pub fn horizon(&self) -> usize {
        self.windows.values().next().map_or(0, Values::len)
    }

    /// Number of windows
    pub fn count(&self) -> usize {
        self.windows.len()
    }

    pub fn windows(&self) -> &BTreeMap<i64, Values> {
        &self.windows
    }

    pub fn window(&self, start: i64) -> Option<&Values> {
        self.windows.get(&start)
    }
}

/// Forecast windows where each step holds one value per percentile
#[derive(Debug, Clone, PartialEq)]
pub struct Probabilistic {
    uuid: Uuid,
    resolution: Duration,
    interval: Duration,
    percentiles: Vec<f64>,
    windows: BTreeMap<i64, Matrix>,
}

impl Probabilistic {
    /// Every window must be `horizon x percentiles.len()`
    pub fn new(
        resolution: Duration,
        interval: Duration,
        percentiles: Vec<f64>,
        windows: BTreeMap<i64, Matrix>,
    ) -> SeriesResult<Self> {
        check_window_spacing(&windows, interval)?;
        check_matrix_windows(&windows, percentiles.len())?;
        Ok(Self {
            uuid: Uuid::new_v4(),
            resolution,
            interval,
            percentiles,
            windows,
        })
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn initial_timestamp(&self) -> i64 {
        self.windows.keys().next().copied().unwrap_or_default()
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn percentiles(&self) -> &[f64] {
        &self.percentiles
    }

    pub fn horizon(&self) -> usize {
        self.windows.values().next().map_or(0, Matrix::rows)
    }

    pub fn count(&self) -> usize {
        self.windows.len()
    }

    pub fn windows(&self) -> &BTreeMap<i64, Matrix> {
        &self.windows
    }
}

/// Forecast windows where each step holds one value per scenario
#[derive(Debug, Clone, PartialEq)]
pub struct Scenarios {
    uuid: Uuid,
    resolution: Duration,
    interval: Duration,
    scenario_count: usize,
    windows: BTreeMap<i64, Matrix>,
}

impl Scenarios {
    /// Every window must be `horizon x scenario_count`
    pub fn new(
        resolution: Duration,
        interval: Duration,
        scenario_count: usize,
        windows: BTreeMap<i64, Matrix>,
    ) -> SeriesResult<Self> {
        check_window_spacing(&windows, interval)?;
        check_matrix_windows(&windows, scenario_count)?;
        Ok(Self {
            uuid: Uuid::new_v4(),
            resolution,
            interval,
            scenario_count,
            windows,
        })
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn initial_timestamp(&self) -> i64 {
        self.windows.keys().next().copied().unwrap_or_default()
    }

    pub fn resolution(&self) -> Duration {
        self.resolution
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn scenario_count(&self) -> usize {
        self.scenario_count
    }

    pub fn horizon(&self) -> usize {
        self.windows.values().next().map_or(0, Matrix::rows)
    }

    pub fn count(&self) -> usize {
        self.windows.len()
    }

    pub fn windows(&self) -> &BTreeMap<i64, Matrix> {
        &self.windows
    }
}

fn check_matrix_windows(windows: &BTreeMap<i64, Matrix>, width: usize) -> SeriesResult<()> {
    let rows = windows.values().next().map_or(0, Matrix::rows);
    if windows.values().any(|m| m.width() != width || m.rows() != rows) {
        return Err(SeriesError::InvalidSeries(format!(
            "every window must be {} x {}",
            rows, width
        )));
    }
    Ok(())
}

/// Shape of the forecast a single series is viewed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastParams {
    /// Start of the first window, epoch milliseconds
    pub initial_timestamp: i64,
    /// Spacing between window starts
    pub interval: Duration,
    /// Steps per window
    pub horizon: usize,
    /// Number of windows
    pub count: usize,
}

/// Forecast windows read out of a single series
///
/// Window `k` starts at `initial_timestamp + k * interval` and covers
/// `horizon` consecutive steps of the backing series starting at that time.
#[derive(Debug, Clone, PartialEq)]
pub struct DeterministicSingleTimeSeries {
    single: SingleTimeSeries,
    params: ForecastParams,
    windows: BTreeMap<i64, Values>,
}

impl DeterministicSingleTimeSeries {
    /// View every window in full
    pub fn new(single: SingleTimeSeries, params: ForecastParams) -> SeriesResult<Self> {
        let last_valid_row = single.len();
        Self::windowed(single, params, 0..params.horizon, 0..params.count, last_valid_row)
    }

    /// View steps `rows` of windows `columns` (both zero-based, half-open)
    ///
    /// `last_valid_row` is the number of steps actually available in the
    /// backing series; windows reaching past it are rejected.
    pub fn windowed(
        single: SingleTimeSeries,
        params: ForecastParams,
        rows: Range<usize>,
        columns: Range<usize>,
        last_valid_row: usize,
    ) -> SeriesResult<Self> {
        let resolution = duration_to_millis(single.resolution);
        let interval = duration_to_millis(params.interval);
        if resolution <= 0 || interval <= 0 {
            return Err(SeriesError::InvalidSeries(
                "resolution and interval must be positive".into(),
            ));
        }

        let mut windows = BTreeMap::new();
        for column in columns {
            let window_start = params.initial_timestamp + column as i64 * interval;
            let offset = window_start - single.initial_timestamp;
            if offset < 0 || offset % resolution != 0 {
                return Err(SeriesError::InvalidSeries(format!(
                    "window {} starting at {} does not align with the series",
                    column, window_start
                )));
            }

            let base = (offset / resolution) as usize;
            let (first, end) = (base + rows.start, base + rows.end);
            if end > last_valid_row {
                return Err(SeriesError::WindowOutOfRange {
                    row: end,
                    last_valid: last_valid_row,
                });
            }
            let values = single
                .values
                .slice(first..end)
                .ok_or(SeriesError::WindowOutOfRange {
                    row: end,
                    last_valid: single.len(),
                })?;

            windows.insert(window_start + rows.start as i64 * resolution, values);
        }

        Ok(Self {
            single,
            params,
            windows,
        })
    }

    /// The backing series
    pub fn single(&self) -> &SingleTimeSeries {
        &self.single
    }

    pub fn params(&self) -> ForecastParams {
        self.params
    }

    pub fn windows(&self) -> &BTreeMap<i64, Values> {
        &self.windows
    }
}

/// Any series the storage can hold or return
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSeriesData {
    SingleTimeSeries(SingleTimeSeries),
    Deterministic(Deterministic),
    DeterministicSingleTimeSeries(DeterministicSingleTimeSeries),
    Probabilistic(Probabilistic),
    Scenarios(Scenarios),
}

impl TimeSeriesData {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            TimeSeriesData::SingleTimeSeries(_) => LogicalType::SingleTimeSeries,
            TimeSeriesData::Deterministic(_) => LogicalType::Deterministic,
            TimeSeriesData::DeterministicSingleTimeSeries(_) => {
                LogicalType::DeterministicSingleTimeSeries
            }
            TimeSeriesData::Probabilistic(_) => LogicalType::Probabilistic,
            TimeSeriesData::Scenarios(_) => LogicalType::Scenarios,
        }
    }

    /// Content identity; a derived forecast shares its backing series' identity
    pub fn uuid(&self) -> Uuid {
        match self {
            TimeSeriesData::SingleTimeSeries(s) => s.uuid,
            TimeSeriesData::Deterministic(f) => f.uuid(),
            TimeSeriesData::DeterministicSingleTimeSeries(f) => f.single.uuid,
            TimeSeriesData::Probabilistic(f) => f.uuid(),
            TimeSeriesData::Scenarios(f) => f.uuid(),
        }
    }

    pub fn initial_timestamp(&self) -> i64 {
        match self {
            TimeSeriesData::SingleTimeSeries(s) => s.initial_timestamp,
            TimeSeriesData::Deterministic(f) => f.initial_timestamp(),
            TimeSeriesData::DeterministicSingleTimeSeries(f) => f.params.initial_timestamp,
            TimeSeriesData::Probabilistic(f) => f.initial_timestamp(),
            TimeSeriesData::Scenarios(f) => f.initial_timestamp(),
        }
    }

    pub fn resolution(&self) -> Duration {
        match self {
            TimeSeriesData::SingleTimeSeries(s) => s.resolution,
            TimeSeriesData::Deterministic(f) => f.resolution(),
            TimeSeriesData::DeterministicSingleTimeSeries(f) => f.single.resolution,
            TimeSeriesData::Probabilistic(f) => f.resolution(),
            TimeSeriesData::Scenarios(f) => f.resolution(),
        }
    }

    /// Window spacing; `None` for a single series
    pub fn interval(&self) -> Option<Duration> {
        match self {
            TimeSeriesData::SingleTimeSeries(_) => None,
            TimeSeriesData::Deterministic(f) => Some(f.interval()),
            TimeSeriesData::DeterministicSingleTimeSeries(f) => Some(f.params.interval),
            TimeSeriesData::Probabilistic(f) => Some(f.interval()),
            TimeSeriesData::Scenarios(f) => Some(f.interval()),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            TimeSeriesData::SingleTimeSeries(s) => s.values.element_type(),
            TimeSeriesData::Deterministic(f) => f
                .windows()
                .values()
                .next()
                .map_or(ElementType::Float, Values::element_type),
            TimeSeriesData::DeterministicSingleTimeSeries(f) => f.single.values.element_type(),
            TimeSeriesData::Probabilistic(_) | TimeSeriesData::Scenarios(_) => ElementType::Float,
        }
    }

    /// Start timestamps of the windows held, or the series start for a single series
    pub fn timestamps(&self) -> Vec<i64> {
        match self {
            TimeSeriesData::SingleTimeSeries(s) => vec![s.initial_timestamp],
            TimeSeriesData::Deterministic(f) => f.windows().keys().copied().collect(),
            TimeSeriesData::DeterministicSingleTimeSeries(f) => f.windows.keys().copied().collect(),
            TimeSeriesData::Probabilistic(f) => f.windows().keys().copied().collect(),
            TimeSeriesData::Scenarios(f) => f.windows().keys().copied().collect(),
        }
    }
}

impl From<SingleTimeSeries> for TimeSeriesData {
    fn from(series: SingleTimeSeries) -> Self {
        TimeSeriesData::SingleTimeSeries(series)
    }
}

impl From<Deterministic> for TimeSeriesData {
    fn from(series: Deterministic) -> Self {
        TimeSeriesData::Deterministic(series)
    }
}

impl From<DeterministicSingleTimeSeries> for TimeSeriesData {
    fn from(series: DeterministicSingleTimeSeries) -> Self {
        TimeSeriesData::DeterministicSingleTimeSeries(series)
    }
}

impl From<Probabilistic> for TimeSeriesData {
    fn from(series: Probabilistic) -> Self {
        TimeSeriesData::Probabilistic(series)
    }
}

impl From<Scenarios> for TimeSeriesData {
    fn from(series: Scenarios) -> Self {
        TimeSeriesData::Scenarios(series)
    }
}

/// Caller-side description of a stored series, used to drive reads
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesMetadata {
    pub name: String,
    pub content_id: Uuid,
    /// Type the caller asks the read to produce
    pub logical_type: LogicalType,
    pub initial_timestamp: i64,
    pub resolution: Duration,
    pub interval: Option<Duration>,
    pub horizon: Option<usize>,
    /// Number of forecast windows
    pub count: Option<usize>,
    pub percentiles: Vec<f64>,
    pub scenario_count: Option<usize>,
}

impl SeriesMetadata {
    /// Metadata describing `series` exactly as it would be stored
    pub fn for_series(name: impl Into<String>, series: &TimeSeriesData) -> Self {
        let mut metadata = Self {
            name: name.into(),
            content_id: series.uuid(),
            logical_type: series.logical_type(),
            initial_timestamp: series.initial_timestamp(),
            resolution: series.resolution(),
            interval: series.interval(),
            horizon: None,
            count: None,
            percentiles: Vec::new(),
            scenario_count: None,
        };

        match series {
            TimeSeriesData::SingleTimeSeries(_) => {}
            TimeSeriesData::Deterministic(f) => {
                metadata.horizon = Some(f.horizon());
                metadata.count = Some(f.count());
            }
            TimeSeriesData::DeterministicSingleTimeSeries(f) => {
                metadata.horizon = Some(f.params.horizon);
                metadata.count = Some(f.params.count);
            }
            TimeSeriesData::Probabilistic(f) => {
                metadata.horizon = Some(f.horizon());
                metadata.count = Some(f.count());
                metadata.percentiles = f.percentiles().to_vec();
            }
            TimeSeriesData::Scenarios(f) => {
                metadata.horizon = Some(f.horizon());
                metadata.count = Some(f.count());
                metadata.scenario_count = Some(f.scenario_count());
            }
        }
        metadata
    }

    /// Builder: ask reads to produce `logical_type`
    pub fn requesting(mut self, logical_type: LogicalType) -> Self {
        self.logical_type = logical_type;
        self
    }

    /// Builder: describe the forecast a single series should be viewed as
    pub fn with_forecast(mut self, params: ForecastParams) -> Self {
        self.initial_timestamp = params.initial_timestamp;
        self.interval = Some(params.interval);
        self.horizon = Some(params.horizon);
        self.count = Some(params.count);
        self
    }

    /// Forecast shape, when interval, horizon and count are all known
    pub fn forecast_params(&self) -> Option<ForecastParams> {
        Some(ForecastParams {
            initial_timestamp: self.initial_timestamp,
            interval: self.interval?,
            horizon: self.horizon?,
            count: self.count?,
        })
    }
}
