use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::PathBuf;

use blocked_apsp::graph::Graph;
use blocked_apsp::io::{read_binary, read_edge_list, write_binary, write_distances};
use blocked_apsp::{Apsp, Error, Schedule};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn test_edge_list_end_to_end() {
    let file = File::open(fixture("dag10.txt")).unwrap();
    let graph = read_edge_list::<_, u32>(BufReader::new(file)).unwrap();
    assert_eq!(graph.vertex_count(), 10);
    assert_eq!(graph.edge_count(), 14);

    let expected = std::fs::read_to_string(fixture("dag10.expected")).unwrap();
    for schedule in Schedule::ALL {
        for block_size in [1, 3, 10] {
            let solution = Apsp::new()
                .with_block_size(block_size)
                .with_schedule(schedule)
                .solve(&graph)
                .unwrap();
            let mut out = Vec::new();
            write_distances(&mut out, &solution).unwrap();
            assert_eq!(
                String::from_utf8(out).unwrap(),
                expected,
                "{} with block size {}",
                schedule,
                block_size
            );
        }
    }
}

#[test]
fn test_clustered_end_to_end() {
    let file = File::open(fixture("dag10.txt")).unwrap();
    let graph = read_edge_list::<_, u32>(BufReader::new(file)).unwrap();
    let expected = std::fs::read_to_string(fixture("dag10.expected")).unwrap();

    let partition = [0, 0, 0, 1, 1, 1, 2, 2, 2, 2];
    let solution = Apsp::new()
        .with_schedule(Schedule::Wavefront)
        .with_threads(2)
        .solve_partitioned(&graph, &partition)
        .unwrap();
    assert!(solution.plan().is_restricted());

    let mut out = Vec::new();
    write_distances(&mut out, &solution).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn test_zero_weight_means_no_edge() {
    let text = "3\n0 1 0\n1 2 4\n";
    let graph = read_edge_list::<_, u64>(Cursor::new(text)).unwrap();
    assert_eq!(graph.edge_count(), 1);
    assert!(!graph.has_edge(0, 1));
    assert_eq!(graph.get_edge_weight(1, 2), Some(4));
}

#[test]
fn test_parse_errors_carry_line_numbers() {
    let cases = [
        ("", 0),
        ("# only a comment\n", 0),
        ("x\n", 1),
        ("3\n0 1\n", 2),
        ("3\n\n0 1 2 9\n", 3),
        ("3\n0 one 2\n", 2),
    ];
    for (text, expected_line) in cases {
        match read_edge_list::<_, u32>(Cursor::new(text)) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, expected_line, "{:?}", text),
            other => panic!("expected a parse error for {:?}, got {:?}", text, other),
        }
    }

    assert!(matches!(
        read_edge_list::<_, u32>(Cursor::new("2\n0 5 1\n")),
        Err(Error::VertexOutOfRange { vertex: 5, count: 2 })
    ));
}

#[test]
fn test_binary_framing() {
    let mut input = Vec::new();
    input.extend_from_slice(&3u32.to_le_bytes());
    for (from, to, weight) in [(0u32, 1u32, 5u64), (1, 2, 2), (2, 0, 0)] {
        input.extend_from_slice(&from.to_le_bytes());
        input.extend_from_slice(&to.to_le_bytes());
        input.extend_from_slice(&weight.to_le_bytes());
    }

    let graph = read_binary::<_, u32>(Cursor::new(input)).unwrap();
    assert_eq!(graph.vertex_count(), 3);
    assert_eq!(graph.edge_count(), 2);

    let solution = Apsp::new().with_block_size(2).solve(&graph).unwrap();
    let mut out = Vec::new();
    write_binary(&mut out, &solution).unwrap();
    assert_eq!(out.len(), 4 + 9 * 16);

    // the written pairs read back as a graph of direct shortest-path edges
    let closure = read_binary::<_, u32>(Cursor::new(out)).unwrap();
    assert_eq!(closure.get_edge_weight(0, 2), Some(7));
    assert_eq!(closure.get_edge_weight(0, 1), Some(5));
    assert!(!closure.has_edge(2, 0));
    // zero self distances are absent edges
    assert!(!closure.has_edge(1, 1));
}

#[test]
fn test_truncated_binary_record() {
    let mut input = Vec::new();
    input.extend_from_slice(&2u32.to_le_bytes());
    input.extend_from_slice(&0u32.to_le_bytes());
    input.extend_from_slice(&1u32.to_le_bytes());
    input.extend_from_slice(&[1, 0]);
    assert!(matches!(
        read_binary::<_, u32>(Cursor::new(input)),
        Err(Error::Io(_))
    ));
}
