//! Schedulers driving the block kernels pivot by pivot
//!
//! Every scheduler performs the same blocked Floyd-Warshall: for each pivot
//! block `m`, close (m, m), propagate it into row and column `m`, then relax
//! every remaining block through the pivot. They differ in how much of that
//! runs at once.
//!
//! - [`Sequential`] runs every kernel on the calling thread.
//! - [`ForkJoin`] runs phase 2 and phase 3 of each pivot as rayon tasks with
//!   a barrier between them.
//! - [`Wavefront`] drops the barriers: each block carries a height counter
//!   and a kernel starts as soon as the blocks it reads are high enough, so
//!   consecutive pivot rounds overlap.

pub mod fork_join;
pub mod height;
pub mod plan;
pub mod sequential;
pub mod wavefront;

pub use fork_join::ForkJoin;
pub use height::HeightCounters;
pub use plan::PivotPlan;
pub use sequential::Sequential;
pub use wavefront::Wavefront;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::matrix::{Block, BlockMatrix};
use crate::measure::{KernelKind, Measurements};
use crate::workspace::Workspace;
use crate::{Error, Result};

/// Available scheduling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    /// Single-threaded pivot loop
    Sequential,
    /// Rayon tasks per phase, with a barrier between phases
    #[default]
    ForkJoin,
    /// Barrier-free execution synchronised by per-block height counters
    Wavefront,
}

impl Schedule {
    /// Every schedule, in increasing order of concurrency
    pub const ALL: [Schedule; 3] = [Schedule::Sequential, Schedule::ForkJoin, Schedule::Wavefront];

    /// Short name of the schedule
    pub fn name(&self) -> &'static str {
        match self {
            Schedule::Sequential => "sequential",
            Schedule::ForkJoin => "fork_join",
            Schedule::Wavefront => "wavefront",
        }
    }

    /// Number of physical workers the schedule uses on a `grid` x `grid` matrix
    ///
    /// `threads == 0` means one per available core.
    pub fn workers(&self, threads: usize, grid: usize) -> usize {
        match self {
            Schedule::Sequential => 1,
            Schedule::ForkJoin => resolve_threads(threads),
            Schedule::Wavefront => resolve_threads(threads).min(grid).max(1),
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Schedule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "sequential" | "seq" => Ok(Schedule::Sequential),
            "fork_join" | "forkjoin" => Ok(Schedule::ForkJoin),
            "wavefront" | "wave" => Ok(Schedule::Wavefront),
            other => Err(format!("unknown schedule: {}", other)),
        }
    }
}

pub(crate) fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        threads
    }
}

/// A strategy for running a full blocked Floyd-Warshall over a matrix
pub trait Scheduler<B>
where
    B: Block,
{
    /// Relaxes `matrix` in place through every pivot of `plan`
    fn run(
        &self,
        matrix: &mut BlockMatrix<B>,
        plan: &PivotPlan,
        workspace: &mut Workspace<B>,
        measurements: &Measurements,
    ) -> Result<()>;

    /// Get the name of the scheduler
    fn name(&self) -> &'static str;
}

/// Runs `schedule` with `threads` workers (0 = one per core)
pub fn run<B: Block>(
    schedule: Schedule,
    threads: usize,
    matrix: &mut BlockMatrix<B>,
    plan: &PivotPlan,
    workspace: &mut Workspace<B>,
    measurements: &Measurements,
) -> Result<()> {
    match schedule {
        Schedule::Sequential => Sequential::new().run(matrix, plan, workspace, measurements),
        Schedule::ForkJoin => ForkJoin::new()
            .with_threads(threads)
            .run(matrix, plan, workspace, measurements),
        Schedule::Wavefront => Wavefront::new()
            .with_threads(threads)
            .run(matrix, plan, workspace, measurements),
    }
}

/// Checks every precondition of a run before any block is touched
pub(crate) fn validate<B: Block>(matrix: &BlockMatrix<B>, plan: &PivotPlan) -> Result<()> {
    if !matrix.is_square() {
        return Err(Error::NonSquare {
            rows: matrix.dimensions(),
            cols: matrix.total_cols(),
        });
    }
    if !matrix.is_bound() {
        return Err(Error::StaleIndex);
    }
    if plan.grid() != matrix.size() {
        return Err(Error::ClusterCountMismatch {
            expected: matrix.size(),
            found: plan.grid(),
        });
    }
    if plan.sizes() != matrix.block_sizes() {
        return Err(Error::InvalidBlockSizes(format!(
            "pivot plan extents {:?} do not match block extents {:?}",
            plan.sizes(),
            matrix.block_sizes()
        )));
    }
    Ok(())
}

/// Order in which the non-pivot blocks of a row or column are visited in round `m`
///
/// Starts right after the pivot and wraps around, so that the blocks of the
/// next pivot are finished first.
pub(crate) fn lookahead(grid: usize, m: usize) -> impl Iterator<Item = usize> {
    (1..grid).map(move |step| (m + step) % grid)
}

/// Records a kernel call, or a skip if its range is empty
#[inline]
pub(crate) fn tally(measurements: Option<&Measurements>, kind: KernelKind, ran: bool) {
    if let Some(measurements) = measurements {
        if ran {
            measurements.record(kind);
        } else {
            measurements.record_skip();
        }
    }
}
