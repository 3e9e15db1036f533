pub mod block;
pub mod block_matrix;

pub use block::{RectBlock, SquareBlock};
pub use block_matrix::{BlockMatrix, Nested};

use std::fmt::Debug;

use crate::distance::Distance;
use crate::kernel;
use crate::workspace::Scratch;
use crate::Result;

/// A tile of the distance matrix
///
/// Kernels only see blocks through this trait, so a dense tile and a whole
/// [`BlockMatrix`] can stand in for each other. That is how the matrix
/// recurses: a `BlockMatrix<BlockMatrix<SquareBlock<D>>>` is a grid of
/// blocks that are themselves grids of cache-sized tiles.
pub trait Block: Clone + Debug + Send + Sync {
    /// Distance type stored in the block
    type Value: Distance;

    /// Layout parameters needed to create a block of this type
    type Config: Copy + Debug + Default + Send + Sync;

    /// Creates a `rows` x `cols` block with every cell set to `fill`
    fn filled(rows: usize, cols: usize, fill: Self::Value, config: &Self::Config) -> Result<Self>;

    /// Bytes of storage a `rows` x `cols` block of this type occupies
    fn storage_bytes(rows: usize, cols: usize, config: &Self::Config) -> usize;

    /// Number of rows in the block
    fn rows(&self) -> usize;

    /// Number of columns in the block
    fn cols(&self) -> usize;

    /// Reads the cell at (`row`, `col`)
    fn get(&self, row: usize, col: usize) -> Self::Value;

    /// Writes the cell at (`row`, `col`)
    fn set(&mut self, row: usize, col: usize, value: Self::Value);

    /// Lowers the cell at (`row`, `col`) to `candidate` if that is an improvement
    #[inline]
    fn relax(&mut self, row: usize, col: usize, candidate: Self::Value) -> bool {
        if candidate < self.get(row, col) {
            self.set(row, col, candidate);
            true
        } else {
            false
        }
    }

    /// Closes the block under Floyd-Warshall relaxation using only its own cells
    fn close(&mut self, scratch: &mut Scratch<Self::Value>) {
        kernel::relax_diagonal(self, scratch);
    }
}
