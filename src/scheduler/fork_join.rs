use std::time::Instant;

use log::{debug, trace};
use rayon::prelude::*;

use crate::kernel;
use crate::matrix::{Block, BlockMatrix};
use crate::measure::{KernelKind, Measurements};
use crate::scheduler::{lookahead, resolve_threads, tally, validate, PivotPlan, Scheduler};
use crate::workspace::{Scratch, Workspace};
use crate::Result;

/// Coarse-grained parallel schedule
///
/// Each pivot round closes the diagonal block on the calling thread, then
/// runs one rayon task per block of the pivot row and column, waits for all
/// of them, and finally runs one task per block row for the peripheral
/// blocks. The barrier between phases is the end of a parallel iterator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForkJoin {
    threads: usize,
}

impl ForkJoin {
    /// Creates a fork-join scheduler on one thread per core
    pub fn new() -> Self {
        ForkJoin { threads: 0 }
    }

    /// Sets the number of worker threads (0 = one per core)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

impl<B: Block> Scheduler<B> for ForkJoin {
    fn run(
        &self,
        matrix: &mut BlockMatrix<B>,
        plan: &PivotPlan,
        workspace: &mut Workspace<B>,
        measurements: &Measurements,
    ) -> Result<()> {
        validate(matrix, plan)?;
        workspace.check_fits(matrix)?;
        let grid = matrix.size();
        let threads = resolve_threads(self.threads);
        debug!(
            "fork-join run over a {}x{} block grid on {} threads",
            grid, grid, threads
        );

        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
        let blocks = matrix.blocks_mut();
        let scratch = workspace.scratch_mut();
        pool.install(|| {
            for m in 0..grid {
                let start = Instant::now();
                pivot_round(blocks, grid, m, plan, scratch, measurements);
                measurements.record_round();
                trace!("pivot {} done in {:?}", m, start.elapsed());
            }
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ForkJoin"
    }
}

fn pivot_round<B: Block>(
    blocks: &mut [B],
    grid: usize,
    m: usize,
    plan: &PivotPlan,
    scratch: &mut Scratch<B::Value>,
    measurements: &Measurements,
) {
    let diagonal = m * grid + m;
    blocks[diagonal].close(scratch);
    measurements.record(KernelKind::Diagonal);

    // phase 2: pivot row and column against the closed diagonal block
    let vertical = plan.vertical(m);
    let horizontal = plan.horizontal(m);
    {
        let (before, rest) = blocks.split_at_mut(diagonal);
        let (pivot, after) = rest.split_at_mut(1);
        let pivot = &pivot[0];
        before
            .par_iter_mut()
            .enumerate()
            .chain(
                after
                    .par_iter_mut()
                    .enumerate()
                    .map(|(index, block)| (index + diagonal + 1, block)),
            )
            .filter(|(index, _)| index / grid == m || index % grid == m)
            .for_each(|(index, block)| {
                if index % grid == m {
                    let ran = !vertical.is_empty();
                    if ran {
                        kernel::relax_vertical(block, pivot, &vertical);
                    }
                    tally(Some(measurements), KernelKind::Vertical, ran);
                } else {
                    let ran = !horizontal.is_empty();
                    if ran {
                        kernel::relax_horizontal(block, pivot, &horizontal);
                    }
                    tally(Some(measurements), KernelKind::Horizontal, ran);
                }
            });
    }

    // phase 3: one task per block row outside the pivot row
    let peripheral = plan.peripheral(m);
    let (above, rest) = blocks.split_at_mut(m * grid);
    let (pivot_row, below) = rest.split_at_mut(grid);
    let pivot_row: &[B] = pivot_row;
    above
        .par_chunks_mut(grid)
        .chain(below.par_chunks_mut(grid))
        .for_each(|row| {
            let (left, rest) = row.split_at_mut(m);
            let (im, right) = rest.split_at_mut(1);
            let im = &im[0];
            for j in lookahead(grid, m) {
                let ij = if j < m {
                    &mut left[j]
                } else {
                    &mut right[j - m - 1]
                };
                let ran = !peripheral.is_empty();
                if ran {
                    kernel::relax_peripheral(ij, im, &pivot_row[j], &peripheral);
                }
                tally(Some(measurements), KernelKind::Peripheral, ran);
            }
        });
}
