use blocked_apsp::graph::{DirectedGraph, Graph, MutableGraph};
use blocked_apsp::{
    reference, Apsp, Block, BlockMatrix, Distance, Error, HeapArena, Measurements, Nested,
    RectBlock, Schedule, Scratch, SquareBlock,
};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// The five-vertex graph used throughout; vertex 4 is isolated
fn small_graph() -> DirectedGraph<u32> {
    DirectedGraph::from_edges(
        5,
        [(0, 1, 3), (1, 2, 1), (0, 2, 10), (2, 3, 2), (1, 3, 7)],
    )
    .unwrap()
}

fn random_graph(n: usize, edges: usize, seed: u64) -> DirectedGraph<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = DirectedGraph::with_capacity(n);
    for _ in 0..edges {
        let u = rng.gen_range(0..n);
        let v = rng.gen_range(0..n);
        if u != v {
            graph.add_edge(u, v, rng.gen_range(1..50)).unwrap();
        }
    }
    graph
}

fn solve_dense(graph: &DirectedGraph<u32>, block_size: usize, schedule: Schedule) -> Vec<u32> {
    Apsp::new()
        .with_block_size(block_size)
        .with_schedule(schedule)
        .with_threads(4)
        .solve(graph)
        .unwrap()
        .to_dense()
        .unwrap()
}

#[test]
fn test_small_graph_matches_known_distances() {
    let graph = small_graph();
    let solution = Apsp::new().with_block_size(2).solve(&graph).unwrap();

    assert_eq!(solution.path_length(0, 1).unwrap(), Some(3));
    assert_eq!(solution.path_length(0, 2).unwrap(), Some(4));
    assert_eq!(solution.path_length(0, 3).unwrap(), Some(6));
    assert_eq!(solution.path_length(1, 3).unwrap(), Some(3));
    assert_eq!(solution.path_length(2, 3).unwrap(), Some(2));
    assert_eq!(solution.path_length(4, 4).unwrap(), Some(0));
    assert_eq!(solution.path_length(3, 0).unwrap(), None);
    assert!(!solution.is_reachable(0, 4).unwrap());
    assert_eq!(solution.distance(4, 0).unwrap(), u32::sentinel());
}

#[test]
fn test_reference_equivalence_for_every_schedule() {
    let graph = small_graph();
    let expected = reference::all_pairs(&graph);
    for schedule in Schedule::ALL {
        for block_size in [1, 2, 3, 5] {
            assert_eq!(
                solve_dense(&graph, block_size, schedule),
                expected,
                "{} with block size {}",
                schedule,
                block_size
            );
        }
    }
}

#[test]
fn test_block_size_invariance_on_random_graph() {
    let graph = random_graph(37, 120, 1);
    let expected = reference::all_pairs(&graph);
    for block_size in [1, 2, 5, 8, 37, 64] {
        for schedule in Schedule::ALL {
            assert_eq!(
                solve_dense(&graph, block_size, schedule),
                expected,
                "{} with block size {}",
                schedule,
                block_size
            );
        }
    }
}

#[test]
fn test_explicit_unequal_block_sizes() {
    let graph = random_graph(20, 60, 2);
    let expected = reference::all_pairs(&graph);
    for schedule in Schedule::ALL {
        let solver = Apsp::new().with_schedule(schedule).with_threads(3);
        let mut solution = solver
            .build_with_sizes::<SquareBlock<u32>, _>(&graph, &[7, 1, 9, 3])
            .unwrap();
        solver.run(&mut solution, &Measurements::new()).unwrap();
        assert_eq!(solution.to_dense().unwrap(), expected, "{}", schedule);
    }
}

#[test]
fn test_explicit_block_sizes_must_cover_graph() {
    let graph = small_graph();
    let result = Apsp::new().build_with_sizes::<SquareBlock<u32>, _>(&graph, &[2, 2]);
    assert!(matches!(result, Err(Error::InvalidBlockSizes(_))));
}

#[test]
fn test_idempotence() {
    let graph = random_graph(30, 90, 3);
    for schedule in Schedule::ALL {
        let solver = Apsp::new().with_block_size(4).with_schedule(schedule);
        let mut solution = solver.build::<SquareBlock<u32>, _>(&graph, None).unwrap();
        solver.run(&mut solution, &Measurements::new()).unwrap();
        let once = solution.to_dense().unwrap();
        solver.run(&mut solution, &Measurements::new()).unwrap();
        assert_eq!(solution.to_dense().unwrap(), once, "{}", schedule);
    }
}

#[test]
fn test_relaxation_never_increases_a_distance() {
    let graph = random_graph(25, 70, 4);
    let solver = Apsp::new().with_block_size(3).with_schedule(Schedule::Sequential);
    let mut solution = solver.build::<SquareBlock<u32>, _>(&graph, None).unwrap();
    let before = solution.to_dense().unwrap();
    solver.run(&mut solution, &Measurements::new()).unwrap();
    let after = solution.to_dense().unwrap();
    for (b, a) in before.iter().zip(&after) {
        assert!(a <= b);
    }
}

#[test]
fn test_cluster_invariance() {
    let n = 24;
    let graph = random_graph(n, 70, 5);
    let expected = reference::all_pairs(&graph);

    let singletons: Vec<usize> = (0..n).collect();
    let single = vec![0; n];
    let interleaved: Vec<usize> = (0..n).map(|v| v % 5).collect();
    let lumpy: Vec<usize> = (0..n).map(|v| if v < 3 { 0 } else { 1 + v % 3 }).collect();

    for partition in [&singletons, &single, &interleaved, &lumpy] {
        for schedule in Schedule::ALL {
            for use_bridges in [true, false] {
                let solver = Apsp::new()
                    .with_block_size(4)
                    .with_schedule(schedule)
                    .with_bridges(use_bridges)
                    .with_threads(3);
                let solution = solver.solve_partitioned(&graph, partition).unwrap();
                assert_eq!(
                    solution.to_dense().unwrap(),
                    expected,
                    "{} bridges={} partition={:?}",
                    schedule,
                    use_bridges,
                    partition
                );
            }
        }
    }
}

#[test]
fn test_bridge_pruning_skips_kernels() {
    // Two chains joined by a single edge 2 -> 3
    let graph = DirectedGraph::from_edges(
        6,
        [(0, 1, 1u32), (1, 2, 1), (2, 3, 1), (3, 4, 1), (4, 5, 1)],
    )
    .unwrap();
    let partition = [0, 0, 0, 1, 1, 1];
    let solver = Apsp::new().with_schedule(Schedule::Sequential);
    let mut solution = solver.build::<SquareBlock<u32>, _>(&graph, Some(&partition[..])).unwrap();
    assert!(solution.plan().is_restricted());

    let measurements = Measurements::new();
    solver.run(&mut solution, &measurements).unwrap();
    assert_eq!(solution.path_length(0, 5).unwrap(), Some(5));
    assert_eq!(solution.path_length(5, 0).unwrap(), None);

    // cluster 0 has no input bridge, cluster 1 has no output bridge
    let report = measurements.report();
    assert_eq!(report.diagonal, 2);
    assert!(report.skipped >= 2);
}

#[test]
fn test_partition_length_must_match() {
    let graph = small_graph();
    let result = Apsp::new().build::<SquareBlock<u32>, _>(&graph, Some(&[0, 1][..]));
    assert!(matches!(
        result,
        Err(Error::ClusterCountMismatch {
            expected: 5,
            found: 2
        })
    ));
}

#[test]
fn test_unreachable_pairs_stay_sentinel_without_overflow() {
    // Weights close to the sentinel: sums of two must clamp rather than wrap
    let big = u16::sentinel() - 10;
    let graph = DirectedGraph::from_edges(4, [(0, 1, big), (1, 2, big), (3, 3, 1)]).unwrap();
    for schedule in Schedule::ALL {
        let solution = Apsp::new()
            .with_block_size(1)
            .with_schedule(schedule)
            .solve(&graph)
            .unwrap();
        assert_eq!(solution.distance(0, 1).unwrap(), big);
        assert_eq!(solution.distance(0, 2).unwrap(), u16::sentinel());
        assert_eq!(solution.distance(2, 0).unwrap(), u16::sentinel());
        assert_eq!(solution.distance(3, 3).unwrap(), 0);
    }
}

#[test]
fn test_sentinel_weight_is_rejected() {
    let mut graph = DirectedGraph::<u32>::with_capacity(2);
    assert!(matches!(
        graph.add_edge(0, 1, u32::sentinel()),
        Err(Error::WeightOutOfRange { from: 0, to: 1 })
    ));
    assert!(matches!(
        graph.add_edge(0, 2, 1),
        Err(Error::VertexOutOfRange { vertex: 2, count: 2 })
    ));
}

#[test]
fn test_concurrency_determinism() {
    let graph = random_graph(48, 200, 6);
    let baseline = solve_dense(&graph, 6, Schedule::Sequential);
    for threads in [1, 2, 3, 8] {
        for _ in 0..3 {
            for schedule in [Schedule::ForkJoin, Schedule::Wavefront] {
                let dense = Apsp::new()
                    .with_block_size(6)
                    .with_schedule(schedule)
                    .with_threads(threads)
                    .solve(&graph)
                    .unwrap()
                    .to_dense()
                    .unwrap();
                assert_eq!(dense, baseline, "{} on {} threads", schedule, threads);
            }
        }
    }
}

#[test]
fn test_float_weights_are_schedule_independent() {
    // quarter weights keep every path sum exact, so association order cannot round
    let mut rng = StdRng::seed_from_u64(16);
    let mut graph = DirectedGraph::with_capacity(40);
    for _ in 0..160 {
        let u = rng.gen_range(0..40);
        let v = rng.gen_range(0..40);
        if u != v {
            let weight = OrderedFloat(f64::from(rng.gen_range(1..16u32)) * 0.25);
            graph.add_edge(u, v, weight).unwrap();
        }
    }
    let expected: Vec<OrderedFloat<f64>> = reference::all_pairs(&graph);

    for schedule in Schedule::ALL {
        for threads in [1, 3, 8] {
            for _ in 0..2 {
                let dense = Apsp::new()
                    .with_block_size(6)
                    .with_schedule(schedule)
                    .with_threads(threads)
                    .solve(&graph)
                    .unwrap()
                    .to_dense()
                    .unwrap();
                assert_eq!(dense, expected, "{} on {} threads", schedule, threads);
            }
        }
    }
}

#[test]
fn test_signed_and_float_weights() {
    let graph = DirectedGraph::from_edges(
        4,
        [
            (0, 1, OrderedFloat(1.5f64)),
            (1, 2, OrderedFloat(2.25)),
            (0, 2, OrderedFloat(5.0)),
            (2, 3, OrderedFloat(0.25)),
        ],
    )
    .unwrap();
    let solution = Apsp::new()
        .with_block_size(3)
        .with_schedule(Schedule::Wavefront)
        .solve(&graph)
        .unwrap();
    assert_eq!(solution.path_length(0, 3).unwrap(), Some(OrderedFloat(4.0)));

    let signed = DirectedGraph::from_edges(3, [(0, 1, 4i64), (1, 2, -2), (0, 2, 3)]).unwrap();
    let solution = Apsp::new().with_block_size(2).solve(&signed).unwrap();
    assert_eq!(solution.path_length(0, 2).unwrap(), Some(2));
}

#[test]
fn test_rect_blocks_and_nested_matrix() {
    let graph = random_graph(29, 90, 7);
    let expected = reference::all_pairs(&graph);

    for schedule in Schedule::ALL {
        let solver = Apsp::new().with_block_size(8).with_schedule(schedule);

        let mut rect = solver.build::<RectBlock<u32>, _>(&graph, None).unwrap();
        solver.run(&mut rect, &Measurements::new()).unwrap();
        assert_eq!(rect.to_dense().unwrap(), expected, "rect {}", schedule);

        let mut nested = solver
            .build::<BlockMatrix<SquareBlock<u32>>, _>(&graph, None)
            .unwrap();
        solver.run(&mut nested, &Measurements::new()).unwrap();
        assert_eq!(nested.to_dense().unwrap(), expected, "nested {}", schedule);
    }
}

#[test]
fn test_nested_block_closure_with_small_tiles() {
    let graph = random_graph(12, 40, 8);
    let expected = reference::all_pairs(&graph);

    let config = Nested { tile: 5, inner: () };
    let mut matrix: BlockMatrix<BlockMatrix<SquareBlock<u32>>> =
        BlockMatrix::uniform(12, 12, config).unwrap();
    for v in 0..12 {
        matrix.set_distance(v, v, 0).unwrap();
    }
    for (from, to, weight) in graph.edges() {
        matrix.relax_distance(from, to, weight).unwrap();
    }

    let arena = HeapArena::shared();
    let mut scratch = Scratch::new(&arena, 12).unwrap();
    matrix.at_mut(0, 0).close(&mut scratch);
    assert_eq!(matrix.to_dense().unwrap(), expected);
}

#[test]
fn test_empty_graph() {
    let graph = DirectedGraph::<u32>::new();
    for schedule in Schedule::ALL {
        let solution = Apsp::new().with_schedule(schedule).solve(&graph).unwrap();
        assert_eq!(solution.vertex_count(), 0);
        assert!(solution.to_dense().unwrap().is_empty());
    }
}

#[test]
fn test_graph_edits() {
    let mut graph = small_graph();
    assert_eq!(graph.edge_count(), 5);
    assert!(graph.validate_non_negative());

    // a heavier parallel edge is ignored, a lighter one replaces the old weight
    graph.add_edge(0, 2, 12).unwrap();
    assert_eq!(graph.get_edge_weight(0, 2), Some(10));
    graph.add_edge(0, 2, 2).unwrap();
    assert_eq!(graph.get_edge_weight(0, 2), Some(2));
    assert_eq!(graph.incoming_edges(2).count(), 2);

    assert!(graph.remove_edge(1, 2));
    assert!(!graph.remove_edge(1, 2));
    assert!(!graph.has_edge(1, 2));

    let v = graph.add_vertex();
    assert_eq!(v, 5);
    graph.add_edge(4, v, 1).unwrap();

    let solution = Apsp::new().with_block_size(2).solve(&graph).unwrap();
    assert_eq!(solution.path_length(0, 3).unwrap(), Some(4));
    assert_eq!(solution.path_length(4, 5).unwrap(), Some(1));
    assert_eq!(solution.to_dense().unwrap(), reference::all_pairs(&graph));

    let signed = DirectedGraph::from_edges(2, [(0, 1, -1i32)]).unwrap();
    assert!(!signed.validate_non_negative());
}

#[test]
fn test_solution_keeps_vertex_order() {
    let graph = small_graph();
    let partition = [1, 0, 1, 0, 0];
    let solution = Apsp::new()
        .with_schedule(Schedule::Sequential)
        .solve_partitioned(&graph, &partition)
        .unwrap();

    let clusters = solution.clusters().unwrap();
    assert_eq!(clusters.cluster_count(), 2);
    assert_eq!(solution.order(), clusters.permutation().unwrap().as_slice());
    assert_eq!(solution.matrix().block_sizes(), &[3, 2]);
    assert_eq!(solution.to_dense().unwrap(), reference::all_pairs(&graph));

    // the raw matrix is in storage order
    let order = solution.order().to_vec();
    let matrix = solution.into_matrix();
    for (p, &u) in order.iter().enumerate() {
        for (q, &v) in order.iter().enumerate() {
            let expected = reference::all_pairs(&graph)[u * 5 + v];
            assert_eq!(matrix.distance(p, q).unwrap(), expected);
        }
    }
}
