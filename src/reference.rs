//! Unblocked Floyd-Warshall over a dense row-major matrix
//!
//! This is the textbook triple loop. It exists to check the blocked solver
//! against and as a baseline in benchmarks.

use crate::distance::Distance;
use crate::graph::Graph;

/// Row-major adjacency matrix of `graph`: zero on the diagonal, the lightest
/// edge weight between adjacent vertices and the sentinel elsewhere
pub fn dense_from_graph<D, G>(graph: &G) -> Vec<D>
where
    D: Distance,
    G: Graph<D>,
{
    let n = graph.vertex_count();
    let mut dense = vec![D::sentinel(); n * n];
    for v in 0..n {
        dense[v * n + v] = D::zero();
    }
    for (from, to, weight) in graph.edges() {
        let cell = &mut dense[from * n + to];
        *cell = cell.min_of(weight);
    }
    dense
}

/// Relaxes an `n` x `n` row-major matrix in place
pub fn floyd_warshall<D: Distance>(dense: &mut [D], n: usize) {
    assert_eq!(dense.len(), n * n, "matrix must hold n * n cells");
    for k in 0..n {
        for i in 0..n {
            let via = dense[i * n + k];
            if via.is_sentinel() {
                continue;
            }
            for j in 0..n {
                let candidate = via.relax_add(dense[k * n + j]);
                if candidate < dense[i * n + j] {
                    dense[i * n + j] = candidate;
                }
            }
        }
    }
}

/// All-pairs shortest distances of `graph`, row-major
pub fn all_pairs<D, G>(graph: &G) -> Vec<D>
where
    D: Distance,
    G: Graph<D>,
{
    let mut dense = dense_from_graph(graph);
    floyd_warshall(&mut dense, graph.vertex_count());
    dense
}
