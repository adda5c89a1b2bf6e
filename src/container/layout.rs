//! Chunk grids
//!
//! A numeric dataset is cut into a regular grid of chunks, one chunk shape
//! for the whole dataset; chunks on the far edge of an axis are truncated.
//! Chunks are numbered in row-major order over the grid.

use crate::container::array::Hyperslab;
use crate::container::error::{ContainerError, ContainerResult};
use std::ops::Range;

/// Choose a chunk shape for `shape`
///
/// Axes listed in `unit_axes` get extent 1, so one index along them maps to
/// its own chunks. The remaining axes start at full extent and the largest is
/// halved until a chunk holds at most `target_bytes` of values.
pub fn guess_chunk_shape(shape: &[usize], target_bytes: usize, unit_axes: &[usize]) -> Vec<usize> {
    let target = (target_bytes / 8).max(1);
    let mut chunk: Vec<usize> = shape
        .iter()
        .enumerate()
        .map(|(axis, &n)| if unit_axes.contains(&axis) { 1 } else { n.max(1) })
        .collect();

    while chunk.iter().product::<usize>() > target {
        match chunk.iter().copied().enumerate().max_by_key(|&(_, n)| n) {
            Some((axis, n)) if n > 1 => chunk[axis] = n.div_ceil(2),
            _ => break,
        }
    }
    chunk
}

/// Regular grid of chunks over a dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkGrid {
    shape: Vec<usize>,
    chunk: Vec<usize>,
    /// Chunks along each axis
    dims: Vec<usize>,
}

impl ChunkGrid {
    pub fn new(shape: &[usize], chunk: &[usize]) -> ContainerResult<Self> {
        if shape.is_empty() || shape.len() != chunk.len() || chunk.contains(&0) {
            return Err(ContainerError::InvalidFormat(format!(
                "chunk shape {:?} does not fit dataset shape {:?}",
                chunk, shape
            )));
        }
        Ok(Self {
            shape: shape.to_vec(),
            chunk: chunk.to_vec(),
            dims: shape.iter().zip(chunk).map(|(n, c)| n.div_ceil(*c)).collect(),
        })
    }

    /// Total number of chunks
    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of the chunk at grid coordinate `coord` in row-major order
    pub fn linear(&self, coord: &[usize]) -> usize {
        coord
            .iter()
            .zip(&self.dims)
            .fold(0, |acc, (&i, &n)| acc * n + i)
    }

    /// Element ranges covered by the chunk at `coord`
    pub fn bounds(&self, coord: &[usize]) -> Vec<Range<usize>> {
        coord
            .iter()
            .zip(&self.chunk)
            .zip(&self.shape)
            .map(|((&i, &c), &n)| i * c..((i + 1) * c).min(n))
            .collect()
    }

    /// Every chunk coordinate, in row-major order
    pub fn coords(&self) -> Vec<Vec<usize>> {
        odometer(&self.dims.iter().map(|&n| 0..n).collect::<Vec<_>>())
    }

    /// Coordinates of the chunks intersecting `slab`, in row-major order
    pub fn covering(&self, slab: &Hyperslab) -> Vec<Vec<usize>> {
        if slab.ranges.iter().any(|r| r.start >= r.end) {
            return Vec::new();
        }
        let spans: Vec<Range<usize>> = slab
            .ranges
            .iter()
            .zip(&self.chunk)
            .map(|(r, &c)| r.start / c..(r.end - 1) / c + 1)
            .collect();
        odometer(&spans)
    }
}

/// Cartesian product of `ranges`, last axis fastest
fn odometer(ranges: &[Range<usize>]) -> Vec<Vec<usize>> {
    if ranges.iter().any(|r| r.start >= r.end) {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut cursor: Vec<usize> = ranges.iter().map(|r| r.start).collect();
    loop {
        out.push(cursor.clone());
        let mut axis = ranges.len();
        loop {
            if axis == 0 {
                return out;
            }
            axis -= 1;
            cursor[axis] += 1;
            if cursor[axis] < ranges[axis].end {
                break;
            }
            cursor[axis] = ranges[axis].start;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_halves_largest_axis() {
        // 96 bytes = 12 values: (100, 3) -> (4, 3)
        assert_eq!(guess_chunk_shape(&[100, 3], 96, &[]), vec![4, 3]);
        assert_eq!(guess_chunk_shape(&[10], 1024, &[]), vec![10]);
        assert_eq!(guess_chunk_shape(&[0, 4], 1024, &[]), vec![1, 4]);
    }

    #[test]
    fn test_guess_unit_axes() {
        let chunk = guess_chunk_shape(&[3, 24, 365], 64 * 1024, &[2]);
        assert_eq!(chunk, vec![3, 24, 1]);

        let chunk = guess_chunk_shape(&[8760, 30, 2], 64 * 1024, &[1]);
        assert_eq!(chunk[1], 1);
        assert!(chunk.iter().product::<usize>() <= 8192);
    }

    #[test]
    fn test_grid_bounds_and_order() {
        let grid = ChunkGrid::new(&[5, 7], &[2, 3]).unwrap();
        assert_eq!(grid.len(), 9);
        assert_eq!(grid.bounds(&[2, 2]), vec![4..5, 6..7]);

        let coords = grid.coords();
        assert_eq!(coords.len(), 9);
        for (i, coord) in coords.iter().enumerate() {
            assert_eq!(grid.linear(coord), i);
        }
    }

    #[test]
    fn test_covering_selects_intersecting_chunks() {
        let grid = ChunkGrid::new(&[3, 24, 365], &[3, 24, 1]).unwrap();
        let one_column = Hyperslab::new(vec![0..3, 0..24, 5..6]);
        assert_eq!(grid.covering(&one_column), vec![vec![0, 0, 5]]);

        let grid = ChunkGrid::new(&[10, 10], &[4, 4]).unwrap();
        let slab = Hyperslab::new(vec![3..5, 0..1]);
        assert_eq!(grid.covering(&slab), vec![vec![0, 0], vec![1, 0]]);
        assert!(grid.covering(&Hyperslab::new(vec![2..2, 0..1])).is_empty());
    }

    #[test]
    fn test_empty_axis_has_no_chunks() {
        let grid = ChunkGrid::new(&[0, 4], &[1, 4]).unwrap();
        assert!(grid.is_empty());
        assert!(grid.coords().is_empty());
    }

    #[test]
    fn test_rejects_mismatched_chunk_shape() {
        assert!(ChunkGrid::new(&[], &[]).is_err());
        assert!(ChunkGrid::new(&[4, 4], &[2]).is_err());
        assert!(ChunkGrid::new(&[4], &[0]).is_err());
    }
}
