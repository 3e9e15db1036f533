//! Cluster and bridge index
//!
//! Vertices are partitioned into clusters. A vertex that is the target of an
//! edge coming from another cluster is an *input* bridge of its cluster; the
//! source of an edge leaving its cluster is an *output* bridge. Every path
//! that enters a cluster does so through one of its input bridges and every
//! path that leaves it does so through an output bridge, which is what lets
//! the kernels restrict a pivot round to the bridges of the pivot cluster.

mod bitmap;

pub use bitmap::Bitmap;

use serde::{Deserialize, Serialize};

use crate::kernel::KRange;
use crate::{Error, Result};

/// Direction in which a bridge vertex connects its cluster to the others
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BridgeKind {
    /// Target of at least one cross-cluster edge
    Input,
    /// Source of at least one cross-cluster edge
    Output,
    /// Both a source and a target of cross-cluster edges
    Both,
}

/// Partition of the vertices into clusters, with their bridge vertices
///
/// Build the index with [`ClusterIndex::insert_map`] and
/// [`ClusterIndex::insert_edge`], reorder members with
/// [`ClusterIndex::arrange_vertices`], then freeze the local bridge lists
/// with [`ClusterIndex::optimise`]. Any mutation after that requires
/// optimising again.
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    cluster_of: Vec<Option<usize>>,
    members: Vec<Vec<usize>>,
    inputs: Bitmap,
    outputs: Bitmap,
    dominant: Vec<BridgeKind>,
    local_of: Vec<usize>,
    local_inputs: Vec<Vec<usize>>,
    local_outputs: Vec<Vec<usize>>,
    optimised: bool,
}

impl ClusterIndex {
    /// Creates an index over `vertex_count` vertices and `cluster_count` empty clusters
    pub fn new(vertex_count: usize, cluster_count: usize) -> Self {
        ClusterIndex {
            cluster_of: vec![None; vertex_count],
            members: vec![Vec::new(); cluster_count],
            inputs: Bitmap::new(vertex_count),
            outputs: Bitmap::new(vertex_count),
            dominant: vec![BridgeKind::Input; cluster_count],
            local_of: vec![0; vertex_count],
            local_inputs: vec![Vec::new(); cluster_count],
            local_outputs: vec![Vec::new(); cluster_count],
            optimised: false,
        }
    }

    /// Builds, arranges and optimises an index in one go
    ///
    /// `assignment[v]` is the cluster of vertex `v`; the number of clusters
    /// is one more than the largest cluster id.
    pub fn from_partition<I>(assignment: &[usize], edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let cluster_count = assignment.iter().max().map_or(0, |&max| max + 1);
        let mut index = ClusterIndex::new(assignment.len(), cluster_count);
        for (vertex, &cluster) in assignment.iter().enumerate() {
            index.insert_map(vertex, cluster)?;
        }
        for (from, to) in edges {
            index.insert_edge(from, to)?;
        }
        index.arrange_all()?;
        index.optimise()?;
        Ok(index)
    }

    /// Number of vertices covered by the index
    pub fn vertex_count(&self) -> usize {
        self.cluster_of.len()
    }

    /// Number of clusters
    pub fn cluster_count(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the local bridge lists reflect the current index
    pub fn is_optimised(&self) -> bool {
        self.optimised
    }

    fn check_vertex(&self, vertex: usize) -> Result<()> {
        if vertex >= self.vertex_count() {
            return Err(Error::VertexOutOfRange {
                vertex,
                count: self.vertex_count(),
            });
        }
        Ok(())
    }

    fn check_cluster(&self, cluster: usize) -> Result<()> {
        if cluster >= self.cluster_count() {
            return Err(Error::ClusterOutOfRange {
                cluster,
                count: self.cluster_count(),
            });
        }
        Ok(())
    }

    fn check_optimised(&self) -> Result<()> {
        if !self.optimised {
            return Err(Error::NotOptimised);
        }
        Ok(())
    }

    /// Records that `vertex` belongs to `cluster`
    ///
    /// Mapping a vertex twice to the same cluster is a no-op; mapping it to a
    /// different one fails.
    pub fn insert_map(&mut self, vertex: usize, cluster: usize) -> Result<()> {
        self.check_vertex(vertex)?;
        self.check_cluster(cluster)?;
        match self.cluster_of[vertex] {
            Some(existing) if existing == cluster => Ok(()),
            Some(existing) => Err(Error::AlreadyMapped {
                vertex,
                cluster: existing,
            }),
            None => {
                self.cluster_of[vertex] = Some(cluster);
                self.members[cluster].push(vertex);
                self.optimised = false;
                Ok(())
            }
        }
    }

    /// Records an edge, marking its endpoints as bridges if it crosses clusters
    pub fn insert_edge(&mut self, from: usize, to: usize) -> Result<()> {
        let from_cluster = self.cluster_of(from)?;
        let to_cluster = self.cluster_of(to)?;
        if from_cluster != to_cluster {
            self.outputs.insert(from);
            self.inputs.insert(to);
            self.optimised = false;
        }
        Ok(())
    }

    /// Cluster of `vertex`
    pub fn cluster_of(&self, vertex: usize) -> Result<usize> {
        self.check_vertex(vertex)?;
        self.cluster_of[vertex].ok_or(Error::UnmappedVertex(vertex))
    }

    /// Members of `cluster`, in their current arrangement
    pub fn members(&self, cluster: usize) -> Result<&[usize]> {
        self.check_cluster(cluster)?;
        Ok(&self.members[cluster])
    }

    /// Returns true if `vertex` is an input bridge
    #[inline]
    pub fn is_input(&self, vertex: usize) -> bool {
        self.inputs.contains(vertex)
    }

    /// Returns true if `vertex` is an output bridge
    #[inline]
    pub fn is_output(&self, vertex: usize) -> bool {
        self.outputs.contains(vertex)
    }

    /// Bridge direction of `vertex`, or `None` for an interior vertex
    pub fn bridge_kind(&self, vertex: usize) -> Result<Option<BridgeKind>> {
        self.check_vertex(vertex)?;
        Ok(match (self.is_input(vertex), self.is_output(vertex)) {
            (true, true) => Some(BridgeKind::Both),
            (true, false) => Some(BridgeKind::Input),
            (false, true) => Some(BridgeKind::Output),
            (false, false) => None,
        })
    }

    /// Number of input and output bridges in total
    pub fn bridge_counts(&self) -> (usize, usize) {
        (self.inputs.count(), self.outputs.count())
    }

    /// Direction with more single-direction bridges in `cluster`, as of its last arrangement
    pub fn dominant(&self, cluster: usize) -> Result<BridgeKind> {
        self.check_cluster(cluster)?;
        Ok(self.dominant[cluster])
    }

    /// Reorders the members of `cluster` as both-direction bridges, then the
    /// dominant direction, then the other direction, then interior vertices
    ///
    /// The dominant direction is the one with more single-direction bridges,
    /// input on a tie. After arranging, the bridges of the dominant direction
    /// occupy one contiguous run of local indices starting at zero. The
    /// order within each group is preserved.
    pub fn arrange_vertices(&mut self, cluster: usize) -> Result<()> {
        self.check_cluster(cluster)?;
        let members = &self.members[cluster];
        let kinds: Vec<Option<BridgeKind>> = members
            .iter()
            .map(|&vertex| self.bridge_kind(vertex))
            .collect::<Result<_>>()?;
        let input_only = kinds
            .iter()
            .filter(|kind| **kind == Some(BridgeKind::Input))
            .count();
        let output_only = kinds
            .iter()
            .filter(|kind| **kind == Some(BridgeKind::Output))
            .count();
        let dominant = if output_only > input_only {
            BridgeKind::Output
        } else {
            BridgeKind::Input
        };

        let group = |kind: Option<BridgeKind>| match kind {
            Some(BridgeKind::Both) => 0,
            Some(kind) if kind == dominant => 1,
            Some(_) => 2,
            None => 3,
        };
        let mut arranged: Vec<(usize, usize)> = members
            .iter()
            .zip(kinds)
            .map(|(&vertex, kind)| (group(kind), vertex))
            .collect();
        arranged.sort_by_key(|&(group, _)| group);

        self.members[cluster] = arranged.into_iter().map(|(_, vertex)| vertex).collect();
        self.dominant[cluster] = dominant;
        self.optimised = false;
        Ok(())
    }

    /// Arranges the members of every cluster
    pub fn arrange_all(&mut self) -> Result<()> {
        for cluster in 0..self.cluster_count() {
            self.arrange_vertices(cluster)?;
        }
        Ok(())
    }

    /// Freezes the per-cluster local bridge lists
    ///
    /// Fails if a vertex is unmapped or a cluster has no members.
    pub fn optimise(&mut self) -> Result<()> {
        if let Some(vertex) = self.cluster_of.iter().position(Option::is_none) {
            return Err(Error::UnmappedVertex(vertex));
        }
        if let Some(cluster) = self.members.iter().position(Vec::is_empty) {
            return Err(Error::EmptyCluster(cluster));
        }

        for (cluster, members) in self.members.iter().enumerate() {
            let inputs = &mut self.local_inputs[cluster];
            let outputs = &mut self.local_outputs[cluster];
            inputs.clear();
            outputs.clear();
            for (local, &vertex) in members.iter().enumerate() {
                self.local_of[vertex] = local;
                if self.inputs.contains(vertex) {
                    inputs.push(local);
                }
                if self.outputs.contains(vertex) {
                    outputs.push(local);
                }
            }
        }

        self.optimised = true;
        log::debug!(
            "optimised cluster index: {} vertices, {} clusters, {:?} bridges",
            self.vertex_count(),
            self.cluster_count(),
            self.bridge_counts()
        );
        Ok(())
    }

    /// Position of `vertex` among the members of its cluster
    pub fn local_index(&self, vertex: usize) -> Result<usize> {
        self.check_optimised()?;
        self.check_vertex(vertex)?;
        Ok(self.local_of[vertex])
    }

    /// Local indices of the input bridges of `cluster`
    pub fn input_bridges(&self, cluster: usize) -> Result<&[usize]> {
        self.check_optimised()?;
        self.check_cluster(cluster)?;
        Ok(&self.local_inputs[cluster])
    }

    /// Local indices of the output bridges of `cluster`
    pub fn output_bridges(&self, cluster: usize) -> Result<&[usize]> {
        self.check_optimised()?;
        self.check_cluster(cluster)?;
        Ok(&self.local_outputs[cluster])
    }

    /// Input bridges of `cluster` as a kernel range, contiguous when possible
    pub fn input_range(&self, cluster: usize) -> Result<KRange<'_>> {
        let list = self.input_bridges(cluster)?;
        Ok(KRange::contiguous(list, cluster).unwrap_or(KRange::List(list)))
    }

    /// Output bridges of `cluster` as a kernel range, contiguous when possible
    pub fn output_range(&self, cluster: usize) -> Result<KRange<'_>> {
        let list = self.output_bridges(cluster)?;
        Ok(KRange::contiguous(list, cluster).unwrap_or(KRange::List(list)))
    }

    /// Vertex order with every cluster contiguous: `permutation()[p]` is the
    /// vertex placed at position `p`
    pub fn permutation(&self) -> Result<Vec<usize>> {
        self.check_optimised()?;
        Ok(self.members.iter().flatten().copied().collect())
    }

    /// Extent of every cluster, in cluster order
    pub fn block_sizes(&self) -> Vec<usize> {
        self.members.iter().map(Vec::len).collect()
    }
}
