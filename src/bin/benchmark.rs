use std::time::{Duration, Instant};

use rand::Rng;

use blocked_apsp::graph::{DirectedGraph, Graph, MutableGraph};
use blocked_apsp::{
    reference, Apsp, ApspConfig, Distance, Measurements, Report, Schedule, SquareBlock,
};

// Function to generate a random directed graph with specified parameters
fn generate_random_graph(num_vertices: usize, edge_factor: f64) -> DirectedGraph<u32> {
    let mut graph = DirectedGraph::with_capacity(num_vertices);
    let mut rng = rand::thread_rng();

    // Approximately edge_factor * n edges
    let num_edges = (edge_factor * num_vertices as f64) as usize;

    for _ in 0..num_edges {
        let u = rng.gen_range(0..num_vertices);
        let v = rng.gen_range(0..num_vertices);
        if u != v {
            let weight = rng.gen_range(1..100);
            graph
                .add_edge(u, v, weight)
                .expect("generated endpoints are in range");
        }
    }

    graph
}

// Function to benchmark one schedule on a graph
fn benchmark_schedule(
    config: &ApspConfig,
    graph: &DirectedGraph<u32>,
    expected: &[u32],
) -> (Duration, Report) {
    println!(
        "Running {} on graph with {} vertices...",
        config.schedule,
        graph.vertex_count()
    );

    let solver = Apsp::new().with_config(config.clone());
    let measurements = Measurements::new();
    let start = Instant::now();
    let mut solution = solver
        .build::<SquareBlock<u32>, _>(graph, None)
        .expect("matrix fits in memory");
    solver
        .run(&mut solution, &measurements)
        .expect("relaxation succeeds");
    let duration = start.elapsed();

    let dense = solution.to_dense().expect("solution is bound");
    let mismatches = dense.iter().zip(expected).filter(|(a, b)| a != b).count();
    let reachable = dense.iter().filter(|d| !d.is_sentinel()).count();
    println!(
        "  - {} reachable pairs, {} mismatches against the reference, {:?}",
        reachable, mismatches, duration
    );

    (duration, measurements.report())
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let size: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(512);
    let block_size: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(64);
    let threads: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(0);

    // Edge factor: average number of edges per vertex
    let edge_factor = 4.0;

    println!("=====================================================");
    println!("Benchmark: blocked APSP schedules");
    println!(
        "{} vertices, block size {}, edge factor {}",
        size, block_size, edge_factor
    );
    println!("=====================================================");

    let graph = generate_random_graph(size, edge_factor);

    let start = Instant::now();
    let expected = reference::all_pairs(&graph);
    let reference_time = start.elapsed();
    println!("Reference Floyd-Warshall: {:?}", reference_time);

    let mut results = Vec::new();
    for schedule in Schedule::ALL {
        let config = ApspConfig {
            block_size,
            schedule,
            threads,
            ..ApspConfig::default()
        };
        let (duration, report) = benchmark_schedule(&config, &graph, &expected);
        results.push((schedule, duration, report));
    }

    // Print summary table
    println!("\n=====================================================");
    println!("Summary of Results");
    println!("=====================================================");
    println!(
        "{:<12} | {:<12} | {:<10} | {:<8} | {:<8}",
        "Schedule", "Time (ms)", "Speedup", "Waits", "Handoffs"
    );
    println!("-----------------------------------------------------");
    for (schedule, duration, report) in &results {
        println!(
            "{:<12} | {:<12} | {:<10.2} | {:<8} | {:<8}",
            schedule.name(),
            duration.as_millis(),
            reference_time.as_secs_f64() / duration.as_secs_f64(),
            report.waits,
            report.handoffs
        );
    }

    let reports: Vec<_> = results
        .iter()
        .map(|(schedule, _, report)| (schedule.name(), report))
        .collect();
    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("\n{}", json),
        Err(err) => eprintln!("failed to render reports: {}", err),
    }
}
