use crate::distance::Distance;
use crate::graph::traits::{Graph, MutableGraph};
use crate::{Error, Result};

/// A directed graph implementation using adjacency lists
#[derive(Debug, Clone)]
pub struct DirectedGraph<D>
where
    D: Distance,
{
    /// Outgoing edges for each vertex: vertex_id -> [(target_vertex, weight)]
    outgoing_edges: Vec<Vec<(usize, D)>>,

    /// Incoming edges for each vertex: vertex_id -> [(source_vertex, weight)]
    incoming_edges: Vec<Vec<(usize, D)>>,
}

impl<D> Default for DirectedGraph<D>
where
    D: Distance,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D> DirectedGraph<D>
where
    D: Distance,
{
    /// Creates a new empty directed graph
    pub fn new() -> Self {
        DirectedGraph {
            outgoing_edges: Vec::new(),
            incoming_edges: Vec::new(),
        }
    }

    /// Creates a new directed graph with the specified number of vertices
    pub fn with_capacity(vertices: usize) -> Self {
        DirectedGraph {
            outgoing_edges: vec![Vec::new(); vertices],
            incoming_edges: vec![Vec::new(); vertices],
        }
    }

    /// Creates a graph on `vertices` vertices from `(from, to, weight)` triples
    pub fn from_edges<I>(vertices: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, D)>,
    {
        let mut graph = Self::with_capacity(vertices);
        for (from, to, weight) in edges {
            graph.add_edge(from, to, weight)?;
        }
        Ok(graph)
    }

    /// Validate that the graph doesn't have negative weights
    pub fn validate_non_negative(&self) -> bool {
        self.outgoing_edges
            .iter()
            .flatten()
            .all(|&(_, weight)| weight >= D::zero())
    }
}

impl<D> Graph<D> for DirectedGraph<D>
where
    D: Distance,
{
    fn vertex_count(&self) -> usize {
        self.outgoing_edges.len()
    }

    fn edge_count(&self) -> usize {
        self.outgoing_edges.iter().map(Vec::len).sum()
    }

    fn outgoing_edges(&self, vertex: usize) -> Box<dyn Iterator<Item = (usize, D)> + '_> {
        match self.outgoing_edges.get(vertex) {
            Some(edges) => Box::new(edges.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }

    fn incoming_edges(&self, vertex: usize) -> Box<dyn Iterator<Item = (usize, D)> + '_> {
        match self.incoming_edges.get(vertex) {
            Some(edges) => Box::new(edges.iter().copied()),
            None => Box::new(std::iter::empty()),
        }
    }
}

impl<D> MutableGraph<D> for DirectedGraph<D>
where
    D: Distance,
{
    fn add_vertex(&mut self) -> usize {
        self.outgoing_edges.push(Vec::new());
        self.incoming_edges.push(Vec::new());
        self.outgoing_edges.len() - 1
    }

    fn add_edge(&mut self, from: usize, to: usize, weight: D) -> Result<()> {
        for vertex in [from, to] {
            if !self.has_vertex(vertex) {
                return Err(Error::VertexOutOfRange {
                    vertex,
                    count: self.vertex_count(),
                });
            }
        }
        if weight.is_sentinel() {
            return Err(Error::WeightOutOfRange { from, to });
        }

        // Keep the lighter of two parallel edges
        if let Some(edge) = self.outgoing_edges[from]
            .iter_mut()
            .find(|(target, _)| *target == to)
        {
            if weight < edge.1 {
                edge.1 = weight;
                if let Some(back) = self.incoming_edges[to]
                    .iter_mut()
                    .find(|(source, _)| *source == from)
                {
                    back.1 = weight;
                }
            }
            return Ok(());
        }

        self.outgoing_edges[from].push((to, weight));
        self.incoming_edges[to].push((from, weight));
        Ok(())
    }

    fn remove_edge(&mut self, from: usize, to: usize) -> bool {
        let Some(outgoing) = self.outgoing_edges.get_mut(from) else {
            return false;
        };
        let len_before = outgoing.len();
        outgoing.retain(|(target, _)| *target != to);
        let removed = len_before > outgoing.len();

        if let Some(incoming) = self.incoming_edges.get_mut(to) {
            incoming.retain(|(source, _)| *source != from);
        }

        removed
    }
}
