use blocked_apsp::{BridgeKind, ClusterIndex, Error, KRange, PivotPlan};

// Two clusters: {0, 1, 2, 3} and {4, 5}
// 0 is a bridge both ways, 1 only leaves, 2 and 3 only enter
fn mixed_index() -> ClusterIndex {
    let mut index = ClusterIndex::new(6, 2);
    for (vertex, cluster) in [(0, 0), (1, 0), (2, 0), (3, 0), (4, 1), (5, 1)] {
        index.insert_map(vertex, cluster).unwrap();
    }
    for (from, to) in [(4, 0), (0, 4), (1, 5), (5, 2), (4, 3), (0, 1)] {
        index.insert_edge(from, to).unwrap();
    }
    index
}

#[test]
fn test_bridge_classification() {
    let index = mixed_index();
    assert_eq!(index.bridge_kind(0).unwrap(), Some(BridgeKind::Both));
    assert_eq!(index.bridge_kind(1).unwrap(), Some(BridgeKind::Output));
    assert_eq!(index.bridge_kind(2).unwrap(), Some(BridgeKind::Input));
    assert_eq!(index.bridge_kind(3).unwrap(), Some(BridgeKind::Input));
    assert_eq!(index.bridge_kind(4).unwrap(), Some(BridgeKind::Both));
    assert_eq!(index.bridge_kind(5).unwrap(), Some(BridgeKind::Both));
    // an edge inside a cluster marks nothing
    assert!(!index.is_input(1));
    assert_eq!(index.bridge_counts(), (5, 4));
}

#[test]
fn test_arrangement_order() {
    let mut index = mixed_index();
    index.arrange_all().unwrap();
    index.optimise().unwrap();

    // both, then the dominant direction (input), then output, then interior
    assert_eq!(index.dominant(0).unwrap(), BridgeKind::Input);
    assert_eq!(index.members(0).unwrap(), &[0, 2, 3, 1]);
    assert_eq!(index.local_index(3).unwrap(), 2);
    assert_eq!(index.input_bridges(0).unwrap(), &[0, 1, 2]);
    assert_eq!(index.output_bridges(0).unwrap(), &[0, 3]);

    assert_eq!(index.input_range(0).unwrap(), KRange::Span(0..3));
    let output = index.output_range(0).unwrap();
    assert!(!output.is_contiguous());
    assert_eq!(output.iter().collect::<Vec<_>>(), vec![0, 3]);

    assert_eq!(index.permutation().unwrap(), vec![0, 2, 3, 1, 4, 5]);
    assert_eq!(index.block_sizes(), vec![4, 2]);
}

#[test]
fn test_dominant_direction_ties_go_to_input() {
    let mut index = ClusterIndex::new(4, 2);
    for (vertex, cluster) in [(0, 0), (1, 0), (2, 0), (3, 1)] {
        index.insert_map(vertex, cluster).unwrap();
    }
    // 0 leaves, 1 is interior, 2 enters
    index.insert_edge(0, 3).unwrap();
    index.insert_edge(3, 2).unwrap();
    index.arrange_vertices(0).unwrap();

    assert_eq!(index.dominant(0).unwrap(), BridgeKind::Input);
    assert_eq!(index.members(0).unwrap(), &[2, 0, 1]);
}

#[test]
fn test_output_dominant_cluster() {
    let mut index = ClusterIndex::new(5, 2);
    for (vertex, cluster) in [(0, 0), (1, 0), (2, 0), (3, 0), (4, 1)] {
        index.insert_map(vertex, cluster).unwrap();
    }
    for (from, to) in [(1, 4), (3, 4), (4, 2)] {
        index.insert_edge(from, to).unwrap();
    }
    index.arrange_all().unwrap();
    index.optimise().unwrap();

    assert_eq!(index.dominant(0).unwrap(), BridgeKind::Output);
    assert_eq!(index.members(0).unwrap(), &[1, 3, 2, 0]);
    assert_eq!(index.output_range(0).unwrap(), KRange::Span(0..2));
    assert_eq!(index.input_range(0).unwrap(), KRange::Span(2..3));
}

#[test]
fn test_mapping_errors() {
    let mut index = ClusterIndex::new(3, 2);
    index.insert_map(0, 0).unwrap();
    // mapping to the same cluster again is allowed
    index.insert_map(0, 0).unwrap();
    assert!(matches!(
        index.insert_map(0, 1),
        Err(Error::AlreadyMapped {
            vertex: 0,
            cluster: 0
        })
    ));
    assert!(matches!(
        index.insert_map(3, 0),
        Err(Error::VertexOutOfRange { vertex: 3, count: 3 })
    ));
    assert!(matches!(
        index.insert_map(1, 2),
        Err(Error::ClusterOutOfRange {
            cluster: 2,
            count: 2
        })
    ));
    assert!(matches!(index.cluster_of(1), Err(Error::UnmappedVertex(1))));
    assert!(matches!(index.insert_edge(0, 1), Err(Error::UnmappedVertex(1))));
    assert!(matches!(index.optimise(), Err(Error::UnmappedVertex(1))));

    index.insert_map(1, 0).unwrap();
    index.insert_map(2, 0).unwrap();
    assert!(matches!(index.optimise(), Err(Error::EmptyCluster(1))));
}

#[test]
fn test_queries_need_optimise() {
    let mut index = mixed_index();
    assert!(!index.is_optimised());
    assert!(matches!(index.input_bridges(0), Err(Error::NotOptimised)));
    assert!(matches!(index.permutation(), Err(Error::NotOptimised)));
    assert!(matches!(
        PivotPlan::from_clusters(&index),
        Err(Error::NotOptimised)
    ));

    index.arrange_all().unwrap();
    index.optimise().unwrap();
    assert!(index.is_optimised());

    // any later change invalidates the frozen lists
    index.insert_edge(5, 3).unwrap();
    assert!(!index.is_optimised());
}

#[test]
fn test_unarranged_cluster_is_rejected_by_plan() {
    let mut index = ClusterIndex::new(4, 2);
    for (vertex, cluster) in [(0, 0), (1, 0), (2, 0), (3, 1)] {
        index.insert_map(vertex, cluster).unwrap();
    }
    index.insert_edge(3, 0).unwrap();
    index.insert_edge(3, 2).unwrap();
    index.optimise().unwrap();

    assert_eq!(index.input_bridges(0).unwrap(), &[0, 2]);
    assert!(matches!(
        PivotPlan::from_clusters(&index),
        Err(Error::NonContiguousBridges { cluster: 0 })
    ));

    index.arrange_all().unwrap();
    index.optimise().unwrap();
    let plan = PivotPlan::from_clusters(&index).unwrap();
    assert!(plan.is_restricted());
    assert_eq!(plan.sizes(), &[3, 1]);
    assert_eq!(plan.vertical(0), KRange::Span(0..2));
    assert_eq!(plan.peripheral(0), KRange::Span(0..2));
    assert!(plan.horizontal(0).is_empty());
    assert_eq!(plan.diagonal(0), KRange::full(3));
}

#[test]
fn test_from_partition() {
    let assignment = [1, 0, 1, 0];
    let index = ClusterIndex::from_partition(&assignment, [(0, 1), (1, 2), (2, 0)]).unwrap();
    assert_eq!(index.cluster_count(), 2);
    assert!(index.is_optimised());
    assert_eq!(index.cluster_of(2).unwrap(), 1);
    // cluster 0 = {1, 3}: 1 is both, 3 is interior
    assert_eq!(index.members(0).unwrap(), &[1, 3]);
    // cluster 1 = {0, 2}: 0 leaves, 2 enters, input wins the tie
    assert_eq!(index.members(1).unwrap(), &[2, 0]);
    assert_eq!(index.permutation().unwrap(), vec![1, 3, 2, 0]);
}
