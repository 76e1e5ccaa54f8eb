pub mod dijkstra;

pub use dijkstra::{all_pairs_costs, calculate_shortest_paths, shortest_costs, ShortestPath};
