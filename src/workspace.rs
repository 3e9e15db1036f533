//! Scoped scratch memory for one relaxation run
//!
//! A [`Workspace`] is acquired right before a run and dropped right after
//! it. Every buffer it holds is charged against the run's arena and handed
//! back by `Drop`, so the budget is returned on every exit path.

use crate::arena::{ArenaBuf, ArenaLease, SharedArena};
use crate::distance::Distance;
use crate::matrix::{Block, BlockMatrix};
use crate::scheduler::height::HeightCounters;
use crate::scheduler::Schedule;
use crate::{Error, Result};

/// Pivot row and column caches used by the diagonal kernel
///
/// `row` and `column` hold the current pivot's row and column; the kernel
/// fills `next_row` and `next_column` with the following pivot's cells while
/// it sweeps, then swaps the pairs.
#[derive(Debug)]
pub struct Scratch<D> {
    pub(crate) row: ArenaBuf<D>,
    pub(crate) next_row: ArenaBuf<D>,
    pub(crate) column: ArenaBuf<D>,
    pub(crate) next_column: ArenaBuf<D>,
}

impl<D: Distance> Scratch<D> {
    /// Allocates scratch vectors able to serve blocks of up to `len` rows
    pub fn new(arena: &SharedArena, len: usize) -> Result<Self> {
        Ok(Scratch {
            row: ArenaBuf::filled(arena, len, D::sentinel())?,
            next_row: ArenaBuf::filled(arena, len, D::sentinel())?,
            column: ArenaBuf::filled(arena, len, D::sentinel())?,
            next_column: ArenaBuf::filled(arena, len, D::sentinel())?,
        })
    }

    /// Largest block extent these vectors can serve
    pub fn capacity(&self) -> usize {
        self.row.len()
    }

    /// Moves the prepared next pivot row and column into place
    pub(crate) fn advance(&mut self) {
        std::mem::swap(&mut self.row, &mut self.next_row);
        std::mem::swap(&mut self.column, &mut self.next_column);
    }
}

/// Per-worker copy of the workspace used by the wavefront scheduler
///
/// `lhs` and `rhs` receive copies of operand blocks, so that a worker never
/// holds a lock on an operand while it writes its target block. `lhs_key`
/// names the block and round currently held in `lhs`.
#[derive(Debug)]
pub struct Replica<B: Block> {
    pub(crate) scratch: Scratch<B::Value>,
    pub(crate) lhs: B,
    pub(crate) rhs: B,
    pub(crate) lhs_key: Option<(usize, usize)>,
}

/// Scratch memory and synchronization objects for one run
#[derive(Debug)]
pub struct Workspace<B: Block> {
    scratch: Scratch<B::Value>,
    replicas: Vec<Replica<B>>,
    heights: Option<HeightCounters>,
    _operands: Option<ArenaLease>,
}

impl<B: Block> Workspace<B> {
    /// Acquires everything `schedule` needs to relax `matrix` with `workers` threads
    ///
    /// The sequential and fork-join schedules share a single set of scratch
    /// vectors, since only the diagonal kernel uses them. The wavefront
    /// replicates the vectors per physical worker and adds one height counter
    /// per block.
    pub fn acquire(
        arena: &SharedArena,
        matrix: &BlockMatrix<B>,
        schedule: Schedule,
        workers: usize,
    ) -> Result<Self> {
        let largest = matrix.largest_block();
        let scratch = Scratch::new(arena, largest)?;

        let (replicas, heights, operands) = match schedule {
            Schedule::Wavefront => {
                let workers = workers.max(1);
                let operand_bytes =
                    2 * workers * B::storage_bytes(largest, largest, matrix.config());
                let lease = ArenaLease::acquire(arena, operand_bytes)?;
                let replicas = (0..workers)
                    .map(|_| {
                        let sentinel = B::Value::sentinel();
                        Ok(Replica {
                            scratch: Scratch::new(arena, largest)?,
                            lhs: B::filled(largest, largest, sentinel, matrix.config())?,
                            rhs: B::filled(largest, largest, sentinel, matrix.config())?,
                            lhs_key: None,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                (replicas, Some(HeightCounters::new(matrix.size())), Some(lease))
            }
            Schedule::Sequential | Schedule::ForkJoin => (Vec::new(), None, None),
        };

        Ok(Workspace {
            scratch,
            replicas,
            heights,
            _operands: operands,
        })
    }

    /// Shared scratch vectors
    pub fn scratch_mut(&mut self) -> &mut Scratch<B::Value> {
        &mut self.scratch
    }

    /// Fails unless every scratch vector can serve the blocks of `matrix`
    pub(crate) fn check_fits(&self, matrix: &BlockMatrix<B>) -> Result<()> {
        let largest = matrix.largest_block();
        let fits = self.scratch.capacity() >= largest
            && self
                .replicas
                .iter()
                .all(|replica| replica.scratch.capacity() >= largest);
        if !fits {
            return Err(Error::WorkspaceMismatch("scratch smaller than the largest block"));
        }
        Ok(())
    }

    /// Number of per-worker replicas
    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    /// Per-worker replicas together with the height counters they synchronise on
    pub(crate) fn wavefront_parts(
        &mut self,
    ) -> Option<(&mut [Replica<B>], &mut HeightCounters)> {
        let heights = self.heights.as_mut()?;
        Some((&mut self.replicas, heights))
    }
}
