use crate::{cost_from_raw, Cost, NodeId, RoutingError, INFINITY};
use log::warn;
use serde::{Deserialize, Serialize};

/// Direct link costs between every pair of nodes: row `n` is node `n`'s
/// connect-cost vector, `INFINITY` where there is no link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    costs: Vec<Vec<Cost>>,
}

impl Topology {
    /// Validates a square cost matrix with zero self costs.
    pub fn new(costs: Vec<Vec<Cost>>) -> Result<Self, RoutingError> {
        let size = costs.len();
        if size == 0 {
            return Err(RoutingError::config("topology has no nodes"));
        }

        for (node, row) in costs.iter().enumerate() {
            if row.len() != size {
                return Err(RoutingError::config(format!(
                    "node {} has {} connect costs, expected {}",
                    node,
                    row.len(),
                    size
                )));
            }
            if row[node] != 0 {
                return Err(RoutingError::config(format!(
                    "node {} has cost {} to itself, expected 0",
                    node, row[node]
                )));
            }
        }

        let costs: Vec<Vec<Cost>> = costs
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.min(INFINITY)).collect())
            .collect();
        let topology = Self { costs };

        for a in 0..size {
            for b in (a + 1)..size {
                if topology.costs[a][b] != topology.costs[b][a] {
                    warn!(
                        "Asymmetric link between {} and {}: {} vs {}",
                        a, b, topology.costs[a][b], topology.costs[b][a]
                    );
                }
            }
        }

        Ok(topology)
    }

    /// Same as [`Topology::new`] for costs that may still be negative.
    pub fn from_raw(rows: &[Vec<i64>]) -> Result<Self, RoutingError> {
        let costs = rows
            .iter()
            .enumerate()
            .map(|(node, row)| {
                row.iter()
                    .map(|raw| {
                        cost_from_raw(*raw).map_err(|e| {
                            RoutingError::config(format!("node {}: {}", node, e))
                        })
                    })
                    .collect::<Result<Vec<Cost>, RoutingError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(costs)
    }

    /// Nodes `0..=n` chained with the given link costs, `0 - 1 - 2 ...`.
    pub fn line(link_costs: &[Cost]) -> Result<Self, RoutingError> {
        let size = link_costs.len() + 1;
        let mut costs = vec![vec![INFINITY; size]; size];
        for node in 0..size {
            costs[node][node] = 0;
        }
        for (i, cost) in link_costs.iter().enumerate() {
            costs[i][i + 1] = *cost;
            costs[i + 1][i] = *cost;
        }
        Self::new(costs)
    }

    pub fn size(&self) -> usize {
        self.costs.len()
    }

    pub fn connect_costs(&self, node: NodeId) -> &[Cost] {
        &self.costs[node]
    }

    pub fn cost(&self, from: NodeId, to: NodeId) -> Cost {
        self.costs[from][to]
    }

    pub fn is_link(&self, from: NodeId, to: NodeId) -> bool {
        from != to && self.costs[from][to] < INFINITY
    }

    pub fn get_neighbors(&self, node: NodeId) -> Vec<(NodeId, Cost)> {
        self.costs[node]
            .iter()
            .enumerate()
            .filter(|(other, cost)| *other != node && **cost < INFINITY)
            .map(|(other, cost)| (other, *cost))
            .collect()
    }

    /// Updates one direction of a link. Link changes are applied per endpoint.
    pub fn set_cost(&mut self, from: NodeId, to: NodeId, cost: Cost) {
        if from != to {
            self.costs[from][to] = cost.min(INFINITY);
        }
    }
}
