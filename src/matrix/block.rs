use std::mem::size_of;

use crate::arena::try_filled_vec;
use crate::distance::Distance;
use crate::matrix::Block;
use crate::Result;

/// A dense tile padded out to a square of edge `max(rows, cols)`
///
/// Padding cells hold the sentinel and are never visited by kernels, which
/// only iterate the logical extent. Keeping every tile square gives all
/// blocks of a grid the same stride.
#[derive(Debug)]
pub struct SquareBlock<D: Distance> {
    edge: usize,
    rows: usize,
    cols: usize,
    data: Vec<D>,
}

impl<D: Distance> SquareBlock<D> {
    /// Edge length of the padded storage
    pub fn edge(&self) -> usize {
        self.edge
    }

    /// Row `row` of the padded storage, restricted to the logical columns
    pub fn row(&self, row: usize) -> &[D] {
        let start = row * self.edge;
        &self.data[start..start + self.cols]
    }
}

impl<D: Distance> Clone for SquareBlock<D> {
    fn clone(&self) -> Self {
        SquareBlock {
            edge: self.edge,
            rows: self.rows,
            cols: self.cols,
            data: self.data.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.edge = source.edge;
        self.rows = source.rows;
        self.cols = source.cols;
        self.data.clone_from(&source.data);
    }
}

impl<D: Distance> Block for SquareBlock<D> {
    type Value = D;
    type Config = ();

    fn filled(rows: usize, cols: usize, fill: D, _config: &()) -> Result<Self> {
        let edge = rows.max(cols);
        let mut data = try_filled_vec(edge * edge, D::sentinel())?;
        for row in 0..rows {
            data[row * edge..row * edge + cols].fill(fill);
        }
        Ok(SquareBlock {
            edge,
            rows,
            cols,
            data,
        })
    }

    fn storage_bytes(rows: usize, cols: usize, _config: &()) -> usize {
        let edge = rows.max(cols);
        edge * edge * size_of::<D>()
    }

    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> D {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.edge + col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: D) {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.edge + col] = value;
    }
}

/// A dense tile stored row-major with exactly `rows * cols` cells
#[derive(Debug)]
pub struct RectBlock<D: Distance> {
    rows: usize,
    cols: usize,
    data: Vec<D>,
}

impl<D: Distance> RectBlock<D> {
    /// Row `row` of the block
    pub fn row(&self, row: usize) -> &[D] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Raw row-major cells of the block
    pub fn as_slice(&self) -> &[D] {
        &self.data
    }
}

impl<D: Distance> Clone for RectBlock<D> {
    fn clone(&self) -> Self {
        RectBlock {
            rows: self.rows,
            cols: self.cols,
            data: self.data.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.rows = source.rows;
        self.cols = source.cols;
        self.data.clone_from(&source.data);
    }
}

impl<D: Distance> Block for RectBlock<D> {
    type Value = D;
    type Config = ();

    fn filled(rows: usize, cols: usize, fill: D, _config: &()) -> Result<Self> {
        Ok(RectBlock {
            rows,
            cols,
            data: try_filled_vec(rows * cols, fill)?,
        })
    }

    fn storage_bytes(rows: usize, cols: usize, _config: &()) -> usize {
        rows * cols * size_of::<D>()
    }

    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> D {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: D) {
        debug_assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }
}
