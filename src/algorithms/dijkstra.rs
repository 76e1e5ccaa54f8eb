use crate::network::Topology;
use crate::{saturating_cost_add, Cost, NodeId, INFINITY};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortestPath {
    pub cost: Cost,
    pub next_hop: Option<NodeId>,
    pub path: Vec<NodeId>,
}

#[derive(Debug, PartialEq, Eq)]
struct State {
    cost: Cost,
    node: NodeId,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other.cost.cmp(&self.cost).then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest paths from `source` over the directed link costs of `topology`.
///
/// Costs saturate at `INFINITY` exactly like the distance-vector engine, so a
/// path whose total reaches the sentinel counts as unreachable (`None`).
pub fn calculate_shortest_paths(topology: &Topology, source: NodeId) -> Vec<Option<ShortestPath>> {
    let size = topology.size();
    let mut distances = vec![INFINITY; size];
    let mut previous: Vec<Option<NodeId>> = vec![None; size];
    let mut heap = BinaryHeap::new();

    distances[source] = 0;
    heap.push(State { cost: 0, node: source });

    while let Some(State { cost, node }) = heap.pop() {
        // Skip if we've already found a better path
        if cost > distances[node] {
            continue;
        }

        for (neighbor, link_cost) in topology.get_neighbors(node) {
            let new_cost = saturating_cost_add(cost, link_cost);
            if new_cost < distances[neighbor] {
                distances[neighbor] = new_cost;
                previous[neighbor] = Some(node);
                heap.push(State { cost: new_cost, node: neighbor });
            }
        }
    }

    (0..size)
        .map(|dest| {
            if distances[dest] >= INFINITY {
                return None;
            }
            let path = reconstruct_path(&previous, dest);
            Some(ShortestPath {
                cost: distances[dest],
                next_hop: path.get(1).copied(),
                path,
            })
        })
        .collect()
}

/// Cost-only view: `INFINITY` for unreachable destinations.
pub fn shortest_costs(topology: &Topology, source: NodeId) -> Vec<Cost> {
    calculate_shortest_paths(topology, source)
        .into_iter()
        .map(|path| path.map_or(INFINITY, |p| p.cost))
        .collect()
}

/// `result[u][d]` is the shortest-path cost from `u` to `d`.
pub fn all_pairs_costs(topology: &Topology) -> Vec<Vec<Cost>> {
    (0..topology.size())
        .map(|source| shortest_costs(topology, source))
        .collect()
}

fn reconstruct_path(previous: &[Option<NodeId>], dest: NodeId) -> Vec<NodeId> {
    let mut path = vec![dest];
    let mut current = dest;

    while let Some(prev) = previous[current] {
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}
