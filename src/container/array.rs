//! Dense n-dimensional arrays and hyperslab selections
//!
//! Datasets in a container are row-major `f64` arrays. A [`Hyperslab`]
//! selects a rectangular sub-block (one half-open range per axis), which is
//! how windowed reads avoid materializing a whole dataset.

use crate::container::error::{ContainerError, ContainerResult};
use std::ops::Range;

/// Row-major n-dimensional array of `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl NdArray {
    /// Create an array, checking that `data` fills `shape` exactly
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> ContainerResult<Self> {
        if shape.is_empty() {
            return Err(ContainerError::ShapeMismatch(
                "arrays must have at least one axis".into(),
            ));
        }
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ContainerError::ShapeMismatch(format!(
                "shape {:?} needs {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// One-dimensional array over `data`
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat row-major view of the elements
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Elements per step of each axis
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.shape.len()];
        for axis in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.shape[axis + 1];
        }
        strides
    }

    /// Element at a full multi-index, if in bounds
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }
        let offset: usize = index.iter().zip(self.strides()).map(|(i, s)| i * s).sum();
        self.data.get(offset).copied()
    }

    /// Copy out the sub-block selected by `slab`
    pub fn slice(&self, slab: &Hyperslab) -> ContainerResult<NdArray> {
        slab.check(&self.shape)?;
        let out_shape = slab.shape();
        let total: usize = out_shape.iter().product();
        let mut data = Vec::with_capacity(total);
        if total == 0 {
            return NdArray::new(out_shape, data);
        }

        let strides = self.strides();
        let last = self.shape.len() - 1;
        let run = slab.ranges[last].clone();
        let mut cursor: Vec<usize> = slab.ranges[..last].iter().map(|r| r.start).collect();

        loop {
            let base: usize = cursor.iter().zip(&strides).map(|(i, s)| i * s).sum();
            data.extend_from_slice(&self.data[base + run.start..base + run.end]);

            // odometer over every axis but the last
            let mut axis = last;
            loop {
                if axis == 0 {
                    return NdArray::new(out_shape, data);
                }
                axis -= 1;
                cursor[axis] += 1;
                if cursor[axis] < slab.ranges[axis].end {
                    break;
                }
                cursor[axis] = slab.ranges[axis].start;
            }
        }
    }

    /// Copy `block` into this array with its first element at `origin`
    pub fn paste(&mut self, origin: &[usize], block: &NdArray) -> ContainerResult<()> {
        let target = Hyperslab::new(
            origin
                .iter()
                .zip(&block.shape)
                .map(|(&o, &n)| o..o + n)
                .collect(),
        );
        if origin.len() != block.shape.len() {
            return Err(ContainerError::ShapeMismatch(format!(
                "origin {:?} does not match block rank {}",
                origin,
                block.shape.len()
            )));
        }
        target.check(&self.shape)?;
        if block.is_empty() {
            return Ok(());
        }

        let strides = self.strides();
        let last = self.shape.len() - 1;
        let run = block.shape[last];
        let mut cursor = vec![0usize; last];
        let mut src = 0;

        loop {
            let base: usize = cursor
                .iter()
                .zip(origin)
                .zip(&strides)
                .map(|((c, o), s)| (c + o) * s)
                .sum::<usize>()
                + origin[last];
            self.data[base..base + run].copy_from_slice(&block.data[src..src + run]);
            src += run;

            let mut axis = last;
            loop {
                if axis == 0 {
                    return Ok(());
                }
                axis -= 1;
                cursor[axis] += 1;
                if cursor[axis] < block.shape[axis] {
                    break;
                }
                cursor[axis] = 0;
            }
        }
    }

    /// Reorder axes: output axis `i` is input axis `axes[i]`
    pub fn permute(&self, axes: &[usize]) -> ContainerResult<NdArray> {
        let ndim = self.shape.len();
        let mut seen = vec![false; ndim];
        if axes.len() != ndim {
            return Err(ContainerError::ShapeMismatch(format!(
                "permutation {:?} does not match rank {}",
                axes, ndim
            )));
        }
        for &axis in axes {
            if axis >= ndim || seen[axis] {
                return Err(ContainerError::ShapeMismatch(format!(
                    "invalid permutation {:?}",
                    axes
                )));
            }
            seen[axis] = true;
        }

        let out_shape: Vec<usize> = axes.iter().map(|&a| self.shape[a]).collect();
        let strides = self.strides();
        let src_strides: Vec<usize> = axes.iter().map(|&a| strides[a]).collect();
        let mut data = Vec::with_capacity(self.data.len());
        if self.data.is_empty() {
            return NdArray::new(out_shape, data);
        }

        let mut cursor = vec![0usize; ndim];
        loop {
            let offset: usize = cursor.iter().zip(&src_strides).map(|(i, s)| i * s).sum();
            data.push(self.data[offset]);

            let mut axis = ndim;
            loop {
                if axis == 0 {
                    return NdArray::new(out_shape, data);
                }
                axis -= 1;
                cursor[axis] += 1;
                if cursor[axis] < out_shape[axis] {
                    break;
                }
                cursor[axis] = 0;
            }
        }
    }

    /// Select index `idx` along `axis`, dropping that axis
    pub fn index_axis(&self, axis: usize, idx: usize) -> ContainerResult<NdArray> {
        if axis >= self.shape.len() || self.shape.len() < 2 {
            return Err(ContainerError::ShapeMismatch(format!(
                "cannot index axis {} of shape {:?}",
                axis, self.shape
            )));
        }
        let mut ranges: Vec<Range<usize>> = self.shape.iter().map(|&n| 0..n).collect();
        ranges[axis] = idx..idx + 1;
        let sliced = self.slice(&Hyperslab::new(ranges))?;
        let mut shape = sliced.shape;
        shape.remove(axis);
        NdArray::new(shape, sliced.data)
    }

    /// Element-wise equality on bit patterns, so NaN payloads compare equal
    pub fn bit_eq(&self, other: &NdArray) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// Rectangular selection: one zero-based, half-open range per axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperslab {
    pub ranges: Vec<Range<usize>>,
}

impl Hyperslab {
    pub fn new(ranges: Vec<Range<usize>>) -> Self {
        Self { ranges }
    }

    /// Selection covering the whole of `shape`
    pub fn full(shape: &[usize]) -> Self {
        Self {
            ranges: shape.iter().map(|&n| 0..n).collect(),
        }
    }

    /// Shape of the selected block
    pub fn shape(&self) -> Vec<usize> {
        self.ranges.iter().map(|r| r.end.saturating_sub(r.start)).collect()
    }

    /// Verify the selection lies within `shape`
    pub fn check(&self, shape: &[usize]) -> ContainerResult<()> {
        if self.ranges.len() != shape.len() {
            return Err(ContainerError::ShapeMismatch(format!(
                "selection of rank {} against dataset of rank {}",
                self.ranges.len(),
                shape.len()
            )));
        }
        for (axis, (range, &extent)) in self.ranges.iter().zip(shape).enumerate() {
            if range.start > range.end || range.end > extent {
                return Err(ContainerError::ShapeMismatch(format!(
                    "axis {}: range {:?} outside extent {}",
                    axis, range, extent
                )));
            }
        }
        Ok(())
    }
}
