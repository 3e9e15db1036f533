use std::ops::Range;

use crate::cluster::{BridgeKind, ClusterIndex};
use crate::kernel::KRange;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Indices {
    Span(Range<usize>),
    List(Vec<usize>),
}

impl Indices {
    fn from_range(range: KRange<'_>) -> Self {
        match range {
            KRange::Span(span) => Indices::Span(span),
            KRange::List(list) => Indices::List(list.to_vec()),
        }
    }

    fn as_range(&self) -> KRange<'_> {
        match self {
            Indices::Span(span) => KRange::Span(span.clone()),
            Indices::List(list) => KRange::List(list),
        }
    }
}

#[derive(Debug, Clone)]
struct Bridges {
    input: Indices,
    output: Indices,
}

/// Intermediate ranges of every kernel, per pivot block
///
/// A full plan relaxes every block through all of the pivot's indices. A
/// plan built from a [`ClusterIndex`] assumes block `m` holds exactly the
/// arranged members of cluster `m`, and restricts the vertical and peripheral
/// kernels to the input bridges of the pivot cluster and the horizontal
/// kernel to its output bridges. The diagonal kernel is never restricted.
#[derive(Debug, Clone)]
pub struct PivotPlan {
    sizes: Vec<usize>,
    bridges: Option<Vec<Bridges>>,
}

impl PivotPlan {
    /// Unrestricted plan for blocks of the given extents
    pub fn full(sizes: &[usize]) -> Self {
        PivotPlan {
            sizes: sizes.to_vec(),
            bridges: None,
        }
    }

    /// Bridge-restricted plan, one pivot block per cluster
    ///
    /// Fails with [`Error::NonContiguousBridges`] if the dominant bridge
    /// direction of a cluster does not form a single run of local indices,
    /// which happens when the cluster was not arranged before optimising.
    pub fn from_clusters(index: &ClusterIndex) -> Result<Self> {
        if !index.is_optimised() {
            return Err(Error::NotOptimised);
        }
        let bridges = (0..index.cluster_count())
            .map(|cluster| {
                let dominant = match index.dominant(cluster)? {
                    BridgeKind::Output => index.output_bridges(cluster)?,
                    BridgeKind::Input | BridgeKind::Both => index.input_bridges(cluster)?,
                };
                KRange::contiguous(dominant, cluster)?;
                Ok(Bridges {
                    input: Indices::from_range(index.input_range(cluster)?),
                    output: Indices::from_range(index.output_range(cluster)?),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PivotPlan {
            sizes: index.block_sizes(),
            bridges: Some(bridges),
        })
    }

    /// Number of pivot blocks
    pub fn grid(&self) -> usize {
        self.sizes.len()
    }

    /// Extent of every pivot block
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Returns true if the plan prunes through bridges
    pub fn is_restricted(&self) -> bool {
        self.bridges.is_some()
    }

    /// Range for closing the pivot block itself
    pub fn diagonal(&self, m: usize) -> KRange<'_> {
        KRange::full(self.sizes[m])
    }

    /// Range for blocks (i, m) of the pivot column
    pub fn vertical(&self, m: usize) -> KRange<'_> {
        match &self.bridges {
            Some(bridges) => bridges[m].input.as_range(),
            None => KRange::full(self.sizes[m]),
        }
    }

    /// Range for blocks (m, j) of the pivot row
    pub fn horizontal(&self, m: usize) -> KRange<'_> {
        match &self.bridges {
            Some(bridges) => bridges[m].output.as_range(),
            None => KRange::full(self.sizes[m]),
        }
    }

    /// Range for blocks (i, j) outside the pivot row and column
    pub fn peripheral(&self, m: usize) -> KRange<'_> {
        self.vertical(m)
    }
}
