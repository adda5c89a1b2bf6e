//! Logical type registry
//!
//! Every series type that can appear in a stored entry is listed once in
//! [`LogicalType::ALL`], and its `(module, type name)` tag is defined in one
//! `match`. Decoding a tag goes through [`LogicalType::resolve`]; nothing
//! else matches on raw type-name strings.

use std::fmt;

/// Module tag written alongside every type name
pub const SOURCE_MODULE: &str = "seriesvault";

/// Concrete in-memory series type of a stored or requested entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalType {
    SingleTimeSeries,
    Deterministic,
    DeterministicSingleTimeSeries,
    Probabilistic,
    Scenarios,
}

/// Read-path family a logical type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesFamily {
    /// One sequence, no window axis
    Single,
    /// Windows of plain values
    Deterministic,
    /// Windows of percentile rows
    Probabilistic,
    /// Windows of scenario rows
    Scenarios,
}

impl LogicalType {
    /// Every registered type
    pub const ALL: [LogicalType; 5] = [
        LogicalType::SingleTimeSeries,
        LogicalType::Deterministic,
        LogicalType::DeterministicSingleTimeSeries,
        LogicalType::Probabilistic,
        LogicalType::Scenarios,
    ];

    /// Look up the type registered under `(module, type_name)`
    pub fn resolve(module: &str, type_name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.module() == module && ty.type_name() == type_name)
    }

    pub fn module(&self) -> &'static str {
        SOURCE_MODULE
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LogicalType::SingleTimeSeries => "SingleTimeSeries",
            LogicalType::Deterministic => "Deterministic",
            LogicalType::DeterministicSingleTimeSeries => "DeterministicSingleTimeSeries",
            LogicalType::Probabilistic => "Probabilistic",
            LogicalType::Scenarios => "Scenarios",
        }
    }

    pub fn family(&self) -> SeriesFamily {
        match self {
            LogicalType::SingleTimeSeries => SeriesFamily::Single,
            LogicalType::Deterministic | LogicalType::DeterministicSingleTimeSeries => {
                SeriesFamily::Deterministic
            }
            LogicalType::Probabilistic => SeriesFamily::Probabilistic,
            LogicalType::Scenarios => SeriesFamily::Scenarios,
        }
    }

    /// Whether entries of this type carry a window axis and an `interval`
    pub fn is_forecast(&self) -> bool {
        self.family() != SeriesFamily::Single
    }

    pub fn is_deterministic_family(&self) -> bool {
        self.family() == SeriesFamily::Deterministic
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module(), self.type_name())
    }
}
