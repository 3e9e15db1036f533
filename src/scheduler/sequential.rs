use log::debug;

use crate::kernel;
use crate::matrix::{Block, BlockMatrix};
use crate::measure::{KernelKind, Measurements};
use crate::scheduler::{lookahead, tally, validate, PivotPlan, Scheduler};
use crate::workspace::{Scratch, Workspace};
use crate::Result;

/// Every block of a grid except one, borrowed immutably
struct Around<'a, B> {
    before: &'a [B],
    after: &'a [B],
    hole: usize,
}

impl<'a, B> Around<'a, B> {
    /// Splits `blocks` into the block at `hole`, mutably, and all the others
    fn split(blocks: &'a mut [B], hole: usize) -> (&'a mut B, Self) {
        let (before, rest) = blocks.split_at_mut(hole);
        let (target, after) = rest.split_at_mut(1);
        (
            &mut target[0],
            Around {
                before,
                after,
                hole,
            },
        )
    }

    #[inline]
    fn get(&self, index: usize) -> &'a B {
        debug_assert_ne!(index, self.hole, "operand aliases the target block");
        if index < self.hole {
            &self.before[index]
        } else {
            &self.after[index - self.hole - 1]
        }
    }
}

/// Blocked Floyd-Warshall over a row-major `grid` x `grid` slice of blocks
///
/// This is the pivot loop shared by [`Sequential`] and by the closure of a
/// nested [`BlockMatrix`] block.
pub(crate) fn close_blocks<B: Block>(
    blocks: &mut [B],
    grid: usize,
    plan: &PivotPlan,
    scratch: &mut Scratch<B::Value>,
    measurements: Option<&Measurements>,
) {
    debug_assert_eq!(blocks.len(), grid * grid);
    let at = |i: usize, j: usize| i * grid + j;

    for m in 0..grid {
        blocks[at(m, m)].close(scratch);
        tally(measurements, KernelKind::Diagonal, true);

        let vertical = plan.vertical(m);
        let horizontal = plan.horizontal(m);
        for other in lookahead(grid, m) {
            let (im, rest) = Around::split(blocks, at(other, m));
            let ran = !vertical.is_empty();
            if ran {
                kernel::relax_vertical(im, rest.get(at(m, m)), &vertical);
            }
            tally(measurements, KernelKind::Vertical, ran);

            let (mi, rest) = Around::split(blocks, at(m, other));
            let ran = !horizontal.is_empty();
            if ran {
                kernel::relax_horizontal(mi, rest.get(at(m, m)), &horizontal);
            }
            tally(measurements, KernelKind::Horizontal, ran);
        }

        let peripheral = plan.peripheral(m);
        for i in lookahead(grid, m) {
            for j in lookahead(grid, m) {
                let (ij, rest) = Around::split(blocks, at(i, j));
                let ran = !peripheral.is_empty();
                if ran {
                    let (ik, kj) = (rest.get(at(i, m)), rest.get(at(m, j)));
                    kernel::relax_peripheral(ij, ik, kj, &peripheral);
                }
                tally(measurements, KernelKind::Peripheral, ran);
            }
        }

        if let Some(measurements) = measurements {
            measurements.record_round();
        }
    }
}

/// Runs every kernel on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Sequential {
    pub fn new() -> Self {
        Sequential
    }
}

impl<B: Block> Scheduler<B> for Sequential {
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
        debug!("sequential run over a {}x{} block grid", grid, grid);
        close_blocks(
            matrix.blocks_mut(),
            grid,
            plan,
            workspace.scratch_mut(),
            Some(measurements),
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Sequential"
    }
}
