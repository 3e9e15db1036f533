//! Blocked APSP - cache-blocked, dependency-parallel all-pairs shortest paths
//!
//! This library relaxes a dense distance matrix with a blocked Floyd-Warshall
//! algorithm. The matrix is stored as a grid of cache-sized blocks, a
//! cluster/bridge index prunes relaxation work between sparsely connected
//! vertex partitions, and a choice of schedulers drives the block kernels:
//! sequentially, with rayon fork-join phases, or as a barrier-free wavefront
//! synchronised by per-block height counters.

pub mod arena;
pub mod cluster;
pub mod distance;
pub mod graph;
pub mod io;
pub mod kernel;
pub mod matrix;
pub mod measure;
pub mod reference;
pub mod scheduler;
pub mod solver;
pub mod workspace;

pub use arena::{Arena, BoundedArena, HeapArena, SharedArena};
pub use cluster::{BridgeKind, ClusterIndex};
pub use distance::Distance;
pub use graph::{DirectedGraph, Graph, MutableGraph};
pub use kernel::KRange;
pub use matrix::{Block, BlockMatrix, Nested, RectBlock, SquareBlock};
pub use measure::{KernelKind, Measurements, Report};
pub use scheduler::{PivotPlan, Schedule};
/// Re-export main types for convenient use
pub use solver::{Apsp, ApspConfig, Solution};
pub use workspace::{Scratch, Workspace};

/// Error types for the library
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Matrix is not square: {rows} rows, {cols} columns")]
    NonSquare { rows: usize, cols: usize },

    #[error("Vertex {vertex} out of range for {count} vertices")]
    VertexOutOfRange { vertex: usize, count: usize },

    #[error("Cluster {cluster} out of range for {count} clusters")]
    ClusterOutOfRange { cluster: usize, count: usize },

    #[error("Vertex {0} is not mapped to any cluster")]
    UnmappedVertex(usize),

    #[error("Vertex {vertex} is already mapped to cluster {cluster}")]
    AlreadyMapped { vertex: usize, cluster: usize },

    #[error("Cluster {0} has no members")]
    EmptyCluster(usize),

    #[error("Cluster layout does not match the matrix: expected {expected}, found {found}")]
    ClusterCountMismatch { expected: usize, found: usize },

    #[error("Bridge set of cluster {cluster} is not contiguous; arrange its vertices first")]
    NonContiguousBridges { cluster: usize },

    #[error("Cluster index has not been optimised; call optimise() first")]
    NotOptimised,

    #[error("Invalid block sizes: {0}")]
    InvalidBlockSizes(String),

    #[error("Index translation cache is stale; call rebind() after resizing")]
    StaleIndex,

    #[error("Edge weight out of range on edge from {from} to {to}")]
    WeightOutOfRange { from: usize, to: usize },

    #[error("Arena exhausted: requested {requested} bytes, {available} available")]
    ResourceExhausted { requested: usize, available: usize },

    #[error("Workspace does not fit this run: {0}")]
    WorkspaceMismatch(&'static str),

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the library
pub type Result<T> = std::result::Result<T, Error>;
