use std::fmt::Debug;

use crate::distance::Distance;
use crate::Result;

/// Trait representing a weighted directed graph
pub trait Graph<D>: Debug
where
    D: Distance,
{
    /// Returns the number of vertices in the graph
    fn vertex_count(&self) -> usize;

    /// Returns the number of edges in the graph
    fn edge_count(&self) -> usize;

    /// Returns an iterator over the outgoing edges from a vertex
    fn outgoing_edges(&self, vertex: usize) -> Box<dyn Iterator<Item = (usize, D)> + '_>;

    /// Returns an iterator over the incoming edges to a vertex
    fn incoming_edges(&self, vertex: usize) -> Box<dyn Iterator<Item = (usize, D)> + '_>;

    /// Returns true if the vertex exists in the graph
    fn has_vertex(&self, vertex: usize) -> bool {
        vertex < self.vertex_count()
    }

    /// Returns true if there's an edge between the two vertices
    fn has_edge(&self, from: usize, to: usize) -> bool {
        self.get_edge_weight(from, to).is_some()
    }

    /// Gets the weight of an edge if it exists
    fn get_edge_weight(&self, from: usize, to: usize) -> Option<D> {
        self.outgoing_edges(from)
            .find(|&(target, _)| target == to)
            .map(|(_, weight)| weight)
    }

    /// Returns every edge as `(from, to, weight)`, grouped by source vertex
    fn edges(&self) -> Box<dyn Iterator<Item = (usize, usize, D)> + '_> {
        Box::new((0..self.vertex_count()).flat_map(move |from| {
            self.outgoing_edges(from)
                .map(move |(to, weight)| (from, to, weight))
        }))
    }
}

/// Trait for mutable graph operations
pub trait MutableGraph<D>: Graph<D>
where
    D: Distance,
{
    /// Adds a vertex to the graph and returns its ID
    fn add_vertex(&mut self) -> usize;

    /// Adds a directed edge between vertices with the given weight
    ///
    /// A parallel edge keeps the smaller of the two weights. Fails if either
    /// endpoint does not exist or the weight reaches the sentinel.
    fn add_edge(&mut self, from: usize, to: usize, weight: D) -> Result<()>;

    /// Removes an edge from the graph
    fn remove_edge(&mut self, from: usize, to: usize) -> bool;
}
