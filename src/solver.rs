use std::time::Instant;

use log::{debug, info};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::arena::{BoundedArena, HeapArena, SharedArena};
use crate::cluster::ClusterIndex;
use crate::distance::Distance;
use crate::graph::Graph;
use crate::matrix::block_matrix::uniform_sizes;
use crate::matrix::{Block, BlockMatrix, SquareBlock};
use crate::measure::Measurements;
use crate::scheduler::{self, PivotPlan, Schedule};
use crate::workspace::Workspace;
use crate::{Error, Result};

/// Serialisable description of a solver run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApspConfig {
    /// Block edge used when blocks are not aligned with clusters
    pub block_size: usize,
    /// Scheduling strategy
    pub schedule: Schedule,
    /// Worker threads (0 = one per core)
    pub threads: usize,
    /// Align blocks with clusters and restrict kernels to bridge vertices
    /// whenever a partition is given
    pub use_bridges: bool,
    /// Byte budget of the arena backing the matrix and the workspace
    pub arena_limit: Option<usize>,
}

impl Default for ApspConfig {
    fn default() -> Self {
        ApspConfig {
            block_size: 64,
            schedule: Schedule::default(),
            threads: 0,
            use_bridges: true,
            arena_limit: None,
        }
    }
}

impl ApspConfig {
    /// Parses a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Renders the configuration as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Blocked all-pairs shortest path solver
///
/// ```no_run
/// use blocked_apsp::{Apsp, DirectedGraph, Schedule};
///
/// let graph = DirectedGraph::from_edges(3, [(0, 1, 4u32), (1, 2, 5)])?;
/// let solution = Apsp::new()
///     .with_block_size(2)
///     .with_schedule(Schedule::Wavefront)
///     .solve(&graph)?;
/// assert_eq!(solution.path_length(0, 2)?, Some(9));
/// # Ok::<(), blocked_apsp::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Apsp {
    config: ApspConfig,
    arena: Option<SharedArena>,
}

impl Apsp {
    /// Create a new solver with default settings
    pub fn new() -> Self {
        Apsp::default()
    }

    /// Create a solver from a complete configuration
    pub fn with_config(mut self, config: ApspConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the block edge used for uniform tiling
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Set the scheduling strategy
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.config.schedule = schedule;
        self
    }

    /// Set the number of worker threads (0 = one per core)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.threads = threads;
        self
    }

    /// Enable or disable bridge pruning for partitioned graphs
    pub fn with_bridges(mut self, enabled: bool) -> Self {
        self.config.use_bridges = enabled;
        self
    }

    /// Set a byte budget for the matrix and its workspace
    pub fn with_arena_limit(mut self, bytes: usize) -> Self {
        self.config.arena_limit = Some(bytes);
        self
    }

    /// Use an explicit arena; takes precedence over the arena limit
    pub fn with_arena(mut self, arena: SharedArena) -> Self {
        self.arena = Some(arena);
        self
    }

    /// Current configuration
    pub fn config(&self) -> &ApspConfig {
        &self.config
    }

    fn arena(&self) -> SharedArena {
        match (&self.arena, self.config.arena_limit) {
            (Some(arena), _) => arena.clone(),
            (None, Some(limit)) => BoundedArena::shared(limit),
            (None, None) => HeapArena::shared(),
        }
    }

    /// Builds a matrix for `graph`, optionally clustered by `partition`
    ///
    /// `partition[v]` is the cluster of vertex `v`. With a partition, vertices
    /// are reordered so every cluster is contiguous and, when bridges are
    /// enabled, every cluster becomes one block row.
    pub fn build<B, G>(&self, graph: &G, partition: Option<&[usize]>) -> Result<Solution<B>>
    where
        B: Block,
        G: Graph<B::Value>,
    {
        self.build_with(graph, None, partition)
    }

    /// Builds a matrix for `graph` with explicit block extents
    pub fn build_with_sizes<B, G>(&self, graph: &G, block_sizes: &[usize]) -> Result<Solution<B>>
    where
        B: Block,
        G: Graph<B::Value>,
    {
        self.build_with(graph, Some(block_sizes), None)
    }

    /// Builds a matrix for `graph` from optional block extents and an optional partition
    pub fn build_with<B, G>(
        &self,
        graph: &G,
        block_sizes: Option<&[usize]>,
        partition: Option<&[usize]>,
    ) -> Result<Solution<B>>
    where
        B: Block,
        G: Graph<B::Value>,
    {
        let n = graph.vertex_count();
        if block_sizes.is_none() && self.config.block_size == 0 {
            return Err(Error::InvalidBlockSizes("block size must be non-zero".to_string()));
        }

        let (order, clusters) = match partition {
            Some(partition) => {
                if partition.len() != n {
                    return Err(Error::ClusterCountMismatch {
                        expected: n,
                        found: partition.len(),
                    });
                }
                let clusters = ClusterIndex::from_partition(
                    partition,
                    graph.edges().map(|(from, to, _)| (from, to)),
                )?;
                (clusters.permutation()?, Some(clusters))
            }
            None => ((0..n).collect(), None),
        };

        let (sizes, plan) = match (&clusters, block_sizes) {
            (Some(clusters), explicit) if self.config.use_bridges => {
                let sizes = clusters.block_sizes();
                if explicit.is_some_and(|explicit| explicit != sizes.as_slice()) {
                    return Err(Error::InvalidBlockSizes(
                        "bridge pruning needs one block per cluster".to_string(),
                    ));
                }
                (sizes, PivotPlan::from_clusters(clusters)?)
            }
            (_, Some(explicit)) => {
                let total: usize = explicit.iter().sum();
                if total != n {
                    return Err(Error::InvalidBlockSizes(format!(
                        "block extents cover {} vertices, graph has {}",
                        total, n
                    )));
                }
                (explicit.to_vec(), PivotPlan::full(explicit))
            }
            (_, None) => {
                let sizes = uniform_sizes(n, self.config.block_size);
                let plan = PivotPlan::full(&sizes);
                (sizes, plan)
            }
        };

        let mut position = vec![0; n];
        for (p, &vertex) in order.iter().enumerate() {
            position[vertex] = p;
        }

        let arena = self.arena();
        let mut matrix = BlockMatrix::with_block_sizes_in(&sizes, B::Config::default(), &arena)?;
        for p in 0..n {
            matrix.set_distance(p, p, B::Value::zero())?;
        }
        for (from, to, weight) in graph.edges() {
            if weight.is_sentinel() {
                return Err(Error::WeightOutOfRange { from, to });
            }
            let (Some(&row), Some(&col)) = (position.get(from), position.get(to)) else {
                return Err(Error::VertexOutOfRange {
                    vertex: from.max(to),
                    count: n,
                });
            };
            matrix.relax_distance(row, col, weight)?;
        }

        debug!(
            "built {}x{} matrix in {} blocks per axis ({} restricted)",
            n,
            n,
            sizes.len(),
            if plan.is_restricted() { "bridge" } else { "not" }
        );

        Ok(Solution {
            matrix,
            order,
            position,
            plan,
            clusters,
            arena,
        })
    }

    /// Relaxes the matrix of `solution` in place
    ///
    /// The workspace lives exactly as long as this call. Running an already
    /// relaxed matrix again leaves it unchanged.
    pub fn run<B: Block>(
        &self,
        solution: &mut Solution<B>,
        measurements: &Measurements,
    ) -> Result<()> {
        scheduler::validate(&solution.matrix, &solution.plan)?;
        let schedule = self.config.schedule;
        let workers = schedule.workers(self.config.threads, solution.matrix.size());
        let mut workspace =
            Workspace::acquire(&solution.arena, &solution.matrix, schedule, workers)?;

        let start = Instant::now();
        scheduler::run(
            schedule,
            self.config.threads,
            &mut solution.matrix,
            &solution.plan,
            &mut workspace,
            measurements,
        )?;
        let elapsed = start.elapsed();
        measurements.record_elapsed(elapsed);

        info!(
            "{} relaxed {} vertices ({} blocks per axis) in {:?}",
            schedule,
            solution.vertex_count(),
            solution.matrix.size(),
            elapsed
        );
        Ok(())
    }

    /// Builds and relaxes a matrix of dense square tiles for `graph`
    pub fn solve<D, G>(&self, graph: &G) -> Result<Solution<SquareBlock<D>>>
    where
        D: Distance,
        G: Graph<D>,
    {
        let mut solution = self.build(graph, None)?;
        self.run(&mut solution, &Measurements::new())?;
        Ok(solution)
    }

    /// Builds and relaxes a clustered matrix for `graph`
    pub fn solve_partitioned<D, G>(
        &self,
        graph: &G,
        partition: &[usize],
    ) -> Result<Solution<SquareBlock<D>>>
    where
        D: Distance,
        G: Graph<D>,
    {
        let mut solution = self.build(graph, Some(partition))?;
        self.run(&mut solution, &Measurements::new())?;
        Ok(solution)
    }
}

/// A distance matrix together with the vertex order it is stored in
#[derive(Debug)]
pub struct Solution<B: Block> {
    matrix: BlockMatrix<B>,
    order: Vec<usize>,
    position: Vec<usize>,
    plan: PivotPlan,
    clusters: Option<ClusterIndex>,
    arena: SharedArena,
}

impl<B: Block> Solution<B> {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.order.len()
    }

    fn position(&self, vertex: usize) -> Result<usize> {
        self.position.get(vertex).copied().ok_or(Error::VertexOutOfRange {
            vertex,
            count: self.vertex_count(),
        })
    }

    /// Stored distance from `from` to `to`; the sentinel if there is no path
    pub fn distance(&self, from: usize, to: usize) -> Result<B::Value> {
        self.matrix.distance(self.position(from)?, self.position(to)?)
    }

    /// Shortest path length from `from` to `to`, or `None` if unreachable
    pub fn path_length(&self, from: usize, to: usize) -> Result<Option<B::Value>> {
        let distance = self.distance(from, to)?;
        Ok((!distance.is_sentinel()).then_some(distance))
    }

    /// Returns true if `to` is reachable from `from`
    pub fn is_reachable(&self, from: usize, to: usize) -> Result<bool> {
        Ok(!self.distance(from, to)?.is_sentinel())
    }

    /// Row-major distances in the original vertex order
    pub fn to_dense(&self) -> Result<Vec<B::Value>> {
        let n = self.vertex_count();
        let mut dense = Vec::with_capacity(n * n);
        for &row in &self.position {
            for &col in &self.position {
                dense.push(self.matrix.distance(row, col)?);
            }
        }
        Ok(dense)
    }

    /// The underlying matrix, in storage order
    pub fn matrix(&self) -> &BlockMatrix<B> {
        &self.matrix
    }

    /// The underlying matrix, mutably
    pub fn matrix_mut(&mut self) -> &mut BlockMatrix<B> {
        &mut self.matrix
    }

    /// `order()[p]` is the vertex stored at matrix position `p`
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Pivot plan the matrix is relaxed with
    pub fn plan(&self) -> &PivotPlan {
        &self.plan
    }

    /// Cluster index, if the matrix was built from a partition
    pub fn clusters(&self) -> Option<&ClusterIndex> {
        self.clusters.as_ref()
    }

    /// Arena backing the matrix
    pub fn arena(&self) -> &SharedArena {
        &self.arena
    }

    /// Consumes the solution, keeping only the matrix
    pub fn into_matrix(self) -> BlockMatrix<B> {
        self.matrix
    }
}
