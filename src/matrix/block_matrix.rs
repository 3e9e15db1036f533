use crate::arena::{ArenaLease, HeapArena, SharedArena};
use crate::distance::Distance;
use crate::matrix::Block;
use crate::scheduler::sequential;
use crate::scheduler::PivotPlan;
use crate::workspace::Scratch;
use crate::{Error, Result};

/// Layout of the tiles inside a [`BlockMatrix`] used as a block
#[derive(Debug, Clone, Copy)]
pub struct Nested<C> {
    /// Edge of the inner tiles
    pub tile: usize,
    /// Configuration of the inner tiles
    pub inner: C,
}

impl<C: Default> Default for Nested<C> {
    fn default() -> Self {
        Nested {
            tile: 32,
            inner: C::default(),
        }
    }
}

/// Position of a vertex inside the grid: which block, and where in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    block: usize,
    offset: usize,
}

/// A distance matrix stored as a grid of dense blocks
///
/// Blocks along one axis may have unequal extents, so that block boundaries
/// can follow cluster boundaries. Global vertex indices are resolved in O(1)
/// through a translation cache that maps every index to its block and
/// in-block offset. The cache is rebuilt by [`BlockMatrix::rebind`] and must
/// be rebuilt after any change of block boundaries.
#[derive(Debug)]
pub struct BlockMatrix<B: Block> {
    row_sizes: Vec<usize>,
    col_sizes: Vec<usize>,
    row_offsets: Vec<usize>,
    col_offsets: Vec<usize>,
    row_slots: Vec<Slot>,
    col_slots: Vec<Slot>,
    bound: bool,
    blocks: Vec<B>,
    config: B::Config,
    lease: Option<ArenaLease>,
}

/// Splits `total` into consecutive extents of `size`, the last one possibly shorter
pub fn uniform_sizes(total: usize, size: usize) -> Vec<usize> {
    (0..total)
        .step_by(size.max(1))
        .map(|start| size.min(total - start))
        .collect()
}

fn prefix_offsets(sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(sizes.len() + 1);
    let mut acc = 0;
    offsets.push(acc);
    for &size in sizes {
        acc += size;
        offsets.push(acc);
    }
    offsets
}

fn slots(sizes: &[usize]) -> Vec<Slot> {
    sizes
        .iter()
        .enumerate()
        .flat_map(|(block, &size)| (0..size).map(move |offset| Slot { block, offset }))
        .collect()
}

impl<B: Block> BlockMatrix<B> {
    /// Creates a `total` x `total` matrix tiled with blocks of edge `block_size`
    ///
    /// The grid has `ceil(total / block_size)` blocks per axis; the last row
    /// and column of blocks are narrower when `block_size` does not divide
    /// `total`. Every cell starts out as the sentinel.
    pub fn uniform(total: usize, block_size: usize, config: B::Config) -> Result<Self> {
        Self::uniform_in(total, block_size, config, &HeapArena::shared())
    }

    /// Like [`BlockMatrix::uniform`], with storage claimed from `arena`
    pub fn uniform_in(
        total: usize,
        block_size: usize,
        config: B::Config,
        arena: &SharedArena,
    ) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::InvalidBlockSizes("block size must be non-zero".to_string()));
        }
        let sizes = uniform_sizes(total, block_size);
        Self::build(sizes.clone(), sizes, B::Value::sentinel(), config, Some(arena))
    }

    /// Creates a square matrix whose blocks have the given extents on both axes
    pub fn with_block_sizes(sizes: &[usize], config: B::Config) -> Result<Self> {
        Self::with_block_sizes_in(sizes, config, &HeapArena::shared())
    }

    /// Like [`BlockMatrix::with_block_sizes`], with storage claimed from `arena`
    pub fn with_block_sizes_in(
        sizes: &[usize],
        config: B::Config,
        arena: &SharedArena,
    ) -> Result<Self> {
        Self::build(
            sizes.to_vec(),
            sizes.to_vec(),
            B::Value::sentinel(),
            config,
            Some(arena),
        )
    }

    fn build(
        row_sizes: Vec<usize>,
        col_sizes: Vec<usize>,
        fill: B::Value,
        config: B::Config,
        arena: Option<&SharedArena>,
    ) -> Result<Self> {
        if row_sizes.iter().chain(col_sizes.iter()).any(|&size| size == 0) {
            return Err(Error::InvalidBlockSizes(
                "every block extent must be non-zero".to_string(),
            ));
        }

        let storage: usize = row_sizes
            .iter()
            .flat_map(|&rows| col_sizes.iter().map(move |&cols| (rows, cols)))
            .map(|(rows, cols)| B::storage_bytes(rows, cols, &config))
            .sum();
        let lease = match arena {
            Some(arena) => Some(ArenaLease::acquire(arena, storage)?),
            None => None,
        };

        let mut blocks = Vec::with_capacity(row_sizes.len() * col_sizes.len());
        for &rows in &row_sizes {
            for &cols in &col_sizes {
                blocks.push(B::filled(rows, cols, fill, &config)?);
            }
        }

        let mut matrix = BlockMatrix {
            row_offsets: prefix_offsets(&row_sizes),
            col_offsets: prefix_offsets(&col_sizes),
            row_sizes,
            col_sizes,
            row_slots: Vec::new(),
            col_slots: Vec::new(),
            bound: false,
            blocks,
            config,
            lease,
        };
        matrix.rebind();
        Ok(matrix)
    }

    /// Recomputes the index translation cache from the current block boundaries
    pub fn rebind(&mut self) {
        self.row_offsets = prefix_offsets(&self.row_sizes);
        self.col_offsets = prefix_offsets(&self.col_sizes);
        self.row_slots = slots(&self.row_sizes);
        self.col_slots = slots(&self.col_sizes);
        self.bound = true;
    }

    /// Returns true if the translation cache matches the block boundaries
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Re-tiles a square matrix with new block extents, keeping every distance
    ///
    /// The translation cache is left stale: [`BlockMatrix::rebind`] must be
    /// called before any further index lookup or relaxation run.
    pub fn resize(&mut self, sizes: &[usize]) -> Result<()> {
        self.ensure_square()?;
        self.ensure_bound()?;
        let total: usize = sizes.iter().sum();
        if total != self.dimensions() {
            return Err(Error::InvalidBlockSizes(format!(
                "block extents cover {} vertices, matrix has {}",
                total,
                self.dimensions()
            )));
        }

        let arena = self.lease.as_ref().map(|lease| lease.arena().clone());
        let mut retiled = Self::build(
            sizes.to_vec(),
            sizes.to_vec(),
            B::Value::sentinel(),
            self.config,
            None,
        )?;
        if let Some(arena) = arena {
            let bytes = retiled.storage_bytes();
            // the old lease is released only once the new one is held
            retiled.lease = Some(ArenaLease::acquire(&arena, bytes)?);
        }
        for row in 0..total {
            for col in 0..total {
                retiled.put(row, col, self.fetch(row, col));
            }
        }

        *self = retiled;
        self.bound = false;
        Ok(())
    }

    fn storage_bytes(&self) -> usize {
        self.row_sizes
            .iter()
            .flat_map(|&rows| self.col_sizes.iter().map(move |&cols| (rows, cols)))
            .map(|(rows, cols)| B::storage_bytes(rows, cols, &self.config))
            .sum()
    }

    fn ensure_square(&self) -> Result<()> {
        if self.row_sizes != self.col_sizes {
            return Err(Error::NonSquare {
                rows: self.dimensions(),
                cols: self.total_cols(),
            });
        }
        Ok(())
    }

    fn ensure_bound(&self) -> Result<()> {
        if !self.bound {
            return Err(Error::StaleIndex);
        }
        Ok(())
    }

    /// Number of block rows, i.e. the grid extent of a square matrix
    pub fn size(&self) -> usize {
        self.row_sizes.len()
    }

    /// Number of block rows and block columns
    pub fn grid(&self) -> (usize, usize) {
        (self.row_sizes.len(), self.col_sizes.len())
    }

    /// Total number of vertices (rows) covered by the matrix
    pub fn dimensions(&self) -> usize {
        self.row_offsets.last().copied().unwrap_or(0)
    }

    /// Total number of columns covered by the matrix
    pub fn total_cols(&self) -> usize {
        self.col_offsets.last().copied().unwrap_or(0)
    }

    /// Returns true if the matrix has the same tiling on both axes
    pub fn is_square(&self) -> bool {
        self.row_sizes == self.col_sizes
    }

    /// Layout parameters used to create the blocks
    pub fn config(&self) -> &B::Config {
        &self.config
    }

    /// Extents of the block rows
    pub fn block_sizes(&self) -> &[usize] {
        &self.row_sizes
    }

    /// First vertex index covered by block row `block`
    pub fn offset_of(&self, block: usize) -> usize {
        self.row_offsets[block]
    }

    /// Largest extent of any block along either axis
    pub fn largest_block(&self) -> usize {
        self.row_sizes
            .iter()
            .chain(self.col_sizes.iter())
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// The block at grid position (`i`, `j`)
    #[inline]
    pub fn at(&self, i: usize, j: usize) -> &B {
        &self.blocks[i * self.col_sizes.len() + j]
    }

    /// The block at grid position (`i`, `j`), mutably
    #[inline]
    pub fn at_mut(&mut self, i: usize, j: usize) -> &mut B {
        let cols = self.col_sizes.len();
        &mut self.blocks[i * cols + j]
    }

    /// Block and in-block offset of row `vertex`
    pub fn locate(&self, vertex: usize) -> Result<(usize, usize)> {
        self.ensure_bound()?;
        let slot = self
            .row_slots
            .get(vertex)
            .ok_or(Error::VertexOutOfRange {
                vertex,
                count: self.dimensions(),
            })?;
        Ok((slot.block, slot.offset))
    }

    fn check_pair(&self, row: usize, col: usize) -> Result<()> {
        self.ensure_bound()?;
        if row >= self.dimensions() {
            return Err(Error::VertexOutOfRange {
                vertex: row,
                count: self.dimensions(),
            });
        }
        if col >= self.total_cols() {
            return Err(Error::VertexOutOfRange {
                vertex: col,
                count: self.total_cols(),
            });
        }
        Ok(())
    }

    /// Distance stored for the pair (`row`, `col`)
    pub fn distance(&self, row: usize, col: usize) -> Result<B::Value> {
        self.check_pair(row, col)?;
        Ok(self.fetch(row, col))
    }

    /// Overwrites the distance stored for the pair (`row`, `col`)
    pub fn set_distance(&mut self, row: usize, col: usize, value: B::Value) -> Result<()> {
        self.check_pair(row, col)?;
        self.put(row, col, value);
        Ok(())
    }

    /// Lowers the distance for (`row`, `col`) to `value` if that is an improvement
    pub fn relax_distance(&mut self, row: usize, col: usize, value: B::Value) -> Result<bool> {
        self.check_pair(row, col)?;
        let r = self.row_slots[row];
        let c = self.col_slots[col];
        let cols = self.col_sizes.len();
        Ok(self.blocks[r.block * cols + c.block].relax(r.offset, c.offset, value))
    }

    #[inline]
    fn fetch(&self, row: usize, col: usize) -> B::Value {
        let r = self.row_slots[row];
        let c = self.col_slots[col];
        self.blocks[r.block * self.col_sizes.len() + c.block].get(r.offset, c.offset)
    }

    #[inline]
    fn put(&mut self, row: usize, col: usize, value: B::Value) {
        let r = self.row_slots[row];
        let c = self.col_slots[col];
        let cols = self.col_sizes.len();
        self.blocks[r.block * cols + c.block].set(r.offset, c.offset, value);
    }

    /// Row-major copy of every distance in the matrix
    pub fn to_dense(&self) -> Result<Vec<B::Value>> {
        self.ensure_bound()?;
        let rows = self.dimensions();
        let cols = self.total_cols();
        let mut dense = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                dense.push(self.fetch(row, col));
            }
        }
        Ok(dense)
    }

    /// All blocks in row-major grid order
    pub fn blocks(&self) -> &[B] {
        &self.blocks
    }

    /// All blocks in row-major grid order, mutably
    pub fn blocks_mut(&mut self) -> &mut [B] {
        &mut self.blocks
    }

    /// Moves the blocks out, leaving the grid empty until [`BlockMatrix::restore_blocks`]
    pub(crate) fn take_blocks(&mut self) -> Vec<B> {
        std::mem::take(&mut self.blocks)
    }

    /// Puts back blocks previously moved out with [`BlockMatrix::take_blocks`]
    pub(crate) fn restore_blocks(&mut self, blocks: Vec<B>) {
        debug_assert_eq!(blocks.len(), self.row_sizes.len() * self.col_sizes.len());
        self.blocks = blocks;
    }
}

impl<B: Block> Clone for BlockMatrix<B> {
    fn clone(&self) -> Self {
        BlockMatrix {
            row_sizes: self.row_sizes.clone(),
            col_sizes: self.col_sizes.clone(),
            row_offsets: self.row_offsets.clone(),
            col_offsets: self.col_offsets.clone(),
            row_slots: self.row_slots.clone(),
            col_slots: self.col_slots.clone(),
            bound: self.bound,
            blocks: self.blocks.clone(),
            config: self.config,
            // copies are not charged against the arena of the original
            lease: None,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.row_sizes.clone_from(&source.row_sizes);
        self.col_sizes.clone_from(&source.col_sizes);
        self.row_offsets.clone_from(&source.row_offsets);
        self.col_offsets.clone_from(&source.col_offsets);
        self.row_slots.clone_from(&source.row_slots);
        self.col_slots.clone_from(&source.col_slots);
        self.bound = source.bound;
        self.blocks.clone_from(&source.blocks);
        self.config = source.config;
    }
}

impl<B: Block> Block for BlockMatrix<B> {
    type Value = B::Value;
    type Config = Nested<B::Config>;

    fn filled(rows: usize, cols: usize, fill: B::Value, config: &Self::Config) -> Result<Self> {
        if config.tile == 0 {
            return Err(Error::InvalidBlockSizes("tile size must be non-zero".to_string()));
        }
        Self::build(
            uniform_sizes(rows, config.tile),
            uniform_sizes(cols, config.tile),
            fill,
            config.inner,
            None,
        )
    }

    fn storage_bytes(rows: usize, cols: usize, config: &Self::Config) -> usize {
        let col_sizes = uniform_sizes(cols, config.tile);
        uniform_sizes(rows, config.tile)
            .into_iter()
            .flat_map(|r| col_sizes.iter().map(move |&c| (r, c)))
            .map(|(r, c)| B::storage_bytes(r, c, &config.inner))
            .sum()
    }

    fn rows(&self) -> usize {
        self.dimensions()
    }

    fn cols(&self) -> usize {
        self.total_cols()
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> B::Value {
        debug_assert!(self.bound, "lookup through a stale translation cache");
        self.fetch(row, col)
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: B::Value) {
        debug_assert!(self.bound, "lookup through a stale translation cache");
        self.put(row, col, value);
    }

    /// Closes a square nested matrix with a sequential blocked Floyd-Warshall
    fn close(&mut self, scratch: &mut Scratch<B::Value>) {
        debug_assert!(self.is_square(), "only a diagonal block can be closed");
        let plan = PivotPlan::full(&self.row_sizes);
        let grid = self.row_sizes.len();
        sequential::close_blocks(&mut self.blocks, grid, &plan, scratch, None);
    }
}
