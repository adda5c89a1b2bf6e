//! Element storage for one sequence of time steps
//!
//! - `Values`: the per-step elements of a series or forecast window
//! - `ElementType`: what kind of element a `Values` holds
//! - `Matrix`: a `rows x width` block used by probabilistic and scenario windows

use serde::{Deserialize, Serialize};

/// Per-step elements of a series or of one forecast window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Values {
    /// Plain floating-point values
    Float(Vec<f64>),
    /// Integer values (stored as floating point)
    Integer(Vec<i64>),
    /// One fixed-length coefficient tuple per step
    Polynomial(Vec<Vec<f64>>),
    /// Per step, a list of segments, each a fixed-length coefficient tuple
    PiecewiseLinear(Vec<Vec<Vec<f64>>>),
    /// Flags; representable in memory but without a storage encoding
    Boolean(Vec<bool>),
}

impl Values {
    /// Number of time steps
    pub fn len(&self) -> usize {
        match self {
            Values::Float(v) => v.len(),
            Values::Integer(v) => v.len(),
            Values::Polynomial(v) => v.len(),
            Values::PiecewiseLinear(v) => v.len(),
            Values::Boolean(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type, with tuple sizes taken from the first step
    pub fn element_type(&self) -> ElementType {
        match self {
            Values::Float(_) => ElementType::Float,
            Values::Integer(_) => ElementType::Integer,
            Values::Polynomial(rows) => ElementType::Polynomial {
                terms: rows.first().map_or(0, Vec::len),
            },
            Values::PiecewiseLinear(rows) => {
                let segments = rows.first().map_or(0, Vec::len);
                let terms = rows
                    .first()
                    .and_then(|segs| segs.first())
                    .map_or(0, Vec::len);
                ElementType::PiecewiseLinear { terms, segments }
            }
            Values::Boolean(_) => ElementType::Boolean,
        }
    }

    /// Copy of the steps in `range` (zero-based, half-open)
    pub fn slice(&self, range: std::ops::Range<usize>) -> Option<Values> {
        if range.start > range.end || range.end > self.len() {
            return None;
        }
        Some(match self {
            Values::Float(v) => Values::Float(v[range].to_vec()),
            Values::Integer(v) => Values::Integer(v[range].to_vec()),
            Values::Polynomial(v) => Values::Polynomial(v[range].to_vec()),
            Values::PiecewiseLinear(v) => Values::PiecewiseLinear(v[range].to_vec()),
            Values::Boolean(v) => Values::Boolean(v[range].to_vec()),
        })
    }
}

/// Kind of element held by a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float,
    Integer,
    Polynomial { terms: usize },
    PiecewiseLinear { terms: usize, segments: usize },
    Boolean,
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementType::Float => write!(f, "float"),
            ElementType::Integer => write!(f, "integer"),
            ElementType::Polynomial { terms } => write!(f, "polynomial({})", terms),
            ElementType::PiecewiseLinear { terms, segments } => {
                write!(f, "piecewise_linear({}x{})", segments, terms)
            }
            ElementType::Boolean => write!(f, "boolean"),
        }
    }
}

/// Row-major `rows x width` block of values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    width: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a matrix, returning None if `data` does not fill it exactly
    pub fn new(rows: usize, width: usize, data: Vec<f64>) -> Option<Self> {
        if rows * width != data.len() {
            return None;
        }
        Some(Self { rows, width, data })
    }

    /// Build from one `Vec` per row; rows must share a length
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return None;
        }
        let n = rows.len();
        Some(Self {
            rows: n,
            width,
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of percentiles or scenarios per row
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        Some(&self.data[row * self.width..(row + 1) * self.width])
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}
