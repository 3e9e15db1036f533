//! Barrier-free wavefront schedule
//!
//! The work of a run is split into one *logical rank* per block row. In
//! round `m`, rank `m` leads: it closes block (m, m), then relaxes the pivot
//! row and the pivot column. Every other rank `r` relaxes the peripheral
//! blocks (r, j) of its own row. Ranks are bound round-robin to a fixed set of
//! physical workers; a worker runs whichever of its ranks can make progress
//! and only sleeps when all of them are waiting on another worker.
//!
//! Ordering is carried entirely by the height counters. Block (i, j) has
//! height `h` once it has been relaxed through pivot rounds `0..h`:
//!
//! - leading round `m` reads (i, m) for its vertical kernels once its height
//!   is at least `m`, and raises every block it writes to `m + 1`;
//! - rank `r` in round `m` reads (r, m) and (m, j) once their heights are at
//!   least `m + 1`, and raises (r, j) to `m + 1`.
//!
//! Every wait targets work of a strictly earlier (round, phase) key, so the
//! wait graph follows pivot order and has no cycle.

use std::time::Instant;

use log::{debug, trace};
use parking_lot::RwLock;

use crate::kernel;
use crate::matrix::{Block, BlockMatrix};
use crate::measure::{KernelKind, Measurements};
use crate::scheduler::height::HeightCounters;
use crate::scheduler::{resolve_threads, validate, PivotPlan, Scheduler};
use crate::workspace::{Replica, Workspace};
use crate::{Error, Result};

/// Fine-grained schedule synchronised by per-block height counters
///
/// Every cell sees its candidates in the same pivot order as under the
/// other schedules, so integer results are identical bit for bit. Float
/// results can differ from them only by the rounding of inexact sums.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wavefront {
    threads: usize,
}

impl Wavefront {
    /// Creates a wavefront scheduler on one worker per core
    pub fn new() -> Self {
        Wavefront { threads: 0 }
    }

    /// Sets the number of physical workers (0 = one per core)
    ///
    /// The schedule never uses more workers than there are block rows, nor
    /// more than the workspace holds replicas for.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
}

/// Relationship of a logical rank to its current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Role {
    /// The rank owns the pivot of its round
    Leading,
    /// The rank leads one of the next rounds
    Following,
    /// The rank has already led and only relaxes its own row
    Passive,
    /// The rank leads much later and fills gaps meanwhile
    Complimenting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Diagonal,
    Horizontal(usize),
    Vertical(usize),
    Peripheral(usize),
}

/// Progress of one logical rank
#[derive(Debug, Clone, Copy)]
struct Rank {
    id: usize,
    round: usize,
    cursor: usize,
}

impl Rank {
    fn new(id: usize) -> Self {
        Rank {
            id,
            round: 0,
            cursor: 0,
        }
    }

    fn is_done(&self, grid: usize) -> bool {
        self.round >= grid
    }

    fn is_leading(&self) -> bool {
        self.id == self.round
    }

    /// Steps in the current round: 2s - 1 when leading, s - 1 otherwise
    fn steps(&self, grid: usize) -> usize {
        if self.is_leading() {
            2 * grid - 1
        } else {
            grid - 1
        }
    }

    fn step(&self, grid: usize) -> Step {
        let m = self.round;
        let wrap = |index: usize| (m + 1 + index) % grid;
        if !self.is_leading() {
            return Step::Peripheral(wrap(self.cursor));
        }
        match self.cursor {
            0 => Step::Diagonal,
            c if c < grid => Step::Horizontal(wrap(c - 1)),
            c => Step::Vertical(wrap(c - grid)),
        }
    }

    fn advance(&mut self, grid: usize) {
        self.cursor += 1;
        if self.cursor >= self.steps(grid) {
            self.round += 1;
            self.cursor = 0;
        }
    }

    /// Ordering key: earlier rounds first, leading work before peripheral work
    fn key(&self) -> (usize, usize, usize) {
        let phase = if self.is_leading() { 0 } else { 1 };
        (self.round, phase, self.id)
    }

    fn role(&self, workers: usize) -> Role {
        if self.id == self.round {
            Role::Leading
        } else if self.id < self.round {
            Role::Passive
        } else if self.id < self.round + workers {
            Role::Following
        } else {
            Role::Complimenting
        }
    }
}

/// Shared state of a run
struct Wave<'a, B: Block> {
    blocks: &'a [RwLock<B>],
    grid: usize,
    workers: usize,
    plan: &'a PivotPlan,
    heights: &'a HeightCounters,
    measurements: &'a Measurements,
}

impl<'a, B: Block> Wave<'a, B> {
    #[inline]
    fn lock(&self, i: usize, j: usize) -> &'a RwLock<B> {
        &self.blocks[i * self.grid + j]
    }

    /// The first height requirement of the rank's next step that is not met yet
    fn blocker(&self, rank: &Rank) -> Option<(usize, usize, usize)> {
        let m = rank.round;
        let needs: [Option<(usize, usize, usize)>; 2] = match rank.step(self.grid) {
            Step::Diagonal | Step::Horizontal(_) => [None, None],
            Step::Vertical(i) => [Some((i, m, m)), None],
            Step::Peripheral(j) => [Some((rank.id, m, m + 1)), Some((m, j, m + 1))],
        };
        needs
            .into_iter()
            .flatten()
            .find(|&(i, j, height)| !self.heights.is_at_least(i, j, height))
    }

    /// Copies block (i, j) as of `round` into `slot`, unless it is already there
    fn load(
        &self,
        slot: &mut B,
        held: &mut Option<(usize, usize)>,
        i: usize,
        j: usize,
        round: usize,
    ) {
        let key = (i * self.grid + j, round);
        if *held != Some(key) {
            slot.clone_from(&self.lock(i, j).read());
            *held = Some(key);
        }
    }

    /// Runs the next step of `rank`, whose dependencies must be satisfied
    fn execute(&self, rank: &Rank, replica: &mut Replica<B>) {
        let m = rank.round;
        let Replica {
            scratch,
            lhs,
            rhs,
            lhs_key,
        } = replica;

        match rank.step(self.grid) {
            Step::Diagonal => {
                self.lock(m, m).write().close(scratch);
                self.measurements.record(KernelKind::Diagonal);
                self.heights.notify(m, m, m + 1);
            }
            Step::Horizontal(j) => {
                let range = self.plan.horizontal(m);
                if range.is_empty() {
                    self.measurements.record_skip();
                } else {
                    self.load(lhs, lhs_key, m, m, m);
                    kernel::relax_horizontal(&mut *self.lock(m, j).write(), lhs, &range);
                    self.measurements.record(KernelKind::Horizontal);
                }
                self.heights.notify(m, j, m + 1);
            }
            Step::Vertical(i) => {
                let range = self.plan.vertical(m);
                if range.is_empty() {
                    self.measurements.record_skip();
                } else {
                    self.load(lhs, lhs_key, m, m, m);
                    kernel::relax_vertical(&mut *self.lock(i, m).write(), lhs, &range);
                    self.measurements.record(KernelKind::Vertical);
                }
                self.heights.notify(i, m, m + 1);
            }
            Step::Peripheral(j) => {
                let r = rank.id;
                let range = self.plan.peripheral(m);
                if range.is_empty() {
                    self.measurements.record_skip();
                } else {
                    self.load(lhs, lhs_key, r, m, m);
                    rhs.clone_from(&self.lock(m, j).read());
                    kernel::relax_peripheral(&mut *self.lock(r, j).write(), lhs, rhs, &range);
                    self.measurements.record(KernelKind::Peripheral);
                }
                self.heights.notify(r, j, m + 1);
            }
        }
    }

    /// Main loop of physical worker `worker`
    fn work(&self, worker: usize, replica: &mut Replica<B>) {
        let mut ranks: Vec<Rank> = (worker..self.grid)
            .step_by(self.workers)
            .map(Rank::new)
            .collect();
        let mut current: Option<usize> = None;
        replica.lhs_key = None;

        loop {
            ranks.retain(|rank| !rank.is_done(self.grid));
            if ranks.is_empty() {
                break;
            }

            let runnable = ranks
                .iter()
                .enumerate()
                .filter(|(_, rank)| self.blocker(rank).is_none())
                .min_by_key(|(_, rank)| (rank.role(self.workers), rank.key()))
                .map(|(index, _)| index);

            match runnable {
                Some(index) => {
                    let rank = &mut ranks[index];
                    if current.is_some_and(|id| id != rank.id) {
                        self.measurements.record_handoff();
                    }
                    current = Some(rank.id);
                    self.execute(rank, replica);
                    let round = rank.round;
                    rank.advance(self.grid);
                    if rank.round != round {
                        trace!("worker {} finished round {} of rank {}", worker, round, rank.id);
                        if rank.id == round {
                            self.measurements.record_round();
                        }
                    }
                }
                None => {
                    // sleep on the oldest outstanding dependency
                    let oldest = ranks.iter().min_by_key(|rank| rank.key());
                    if let Some((i, j, height)) = oldest.and_then(|rank| self.blocker(rank)) {
                        if self.heights.wait_until(i, j, height) {
                            self.measurements.record_wait();
                        }
                    }
                }
            }
        }
    }
}

impl<B: Block> Scheduler<B> for Wavefront {
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
        if grid == 0 {
            return Ok(());
        }

        let (replicas, heights) = workspace
            .wavefront_parts()
            .ok_or(Error::WorkspaceMismatch("no wavefront replicas"))?;
        if heights.grid() != grid {
            return Err(Error::ClusterCountMismatch {
                expected: grid,
                found: heights.grid(),
            });
        }
        // a reused workspace still holds the heights of its last run
        heights.reset();
        let heights: &HeightCounters = heights;
        let workers = resolve_threads(self.threads).min(grid).min(replicas.len());
        if workers == 0 {
            return Err(Error::WorkspaceMismatch("no wavefront replicas"));
        }
        debug!(
            "wavefront run over a {}x{} block grid with {} workers",
            grid, grid, workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("wavefront-{}", index))
            .build()?;

        let start = Instant::now();
        let blocks: Vec<RwLock<B>> = matrix.take_blocks().into_iter().map(RwLock::new).collect();
        let wave = Wave {
            blocks: &blocks,
            grid,
            workers,
            plan,
            heights,
            measurements,
        };
        pool.scope(|scope| {
            for (worker, replica) in replicas.iter_mut().take(workers).enumerate() {
                let wave = &wave;
                scope.spawn(move |_| wave.work(worker, replica));
            }
        });
        matrix.restore_blocks(blocks.into_iter().map(RwLock::into_inner).collect());

        debug!("wavefront run finished in {:?}", start.elapsed());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Wavefront"
    }
}
