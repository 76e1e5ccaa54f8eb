use crate::{saturating_cost_add, Cost, NodeId, INFINITY};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node's view of the network: `costs[dest][via]` is the estimated cost of
/// reaching `dest` through neighbor `via`. The diagonal holds direct link costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceTable {
    owner: NodeId,
    costs: Vec<Vec<Cost>>,
}

impl DistanceTable {
    /// Builds the initial table: the only known paths are the direct links.
    pub fn initialize(owner: NodeId, connect_costs: &[Cost]) -> Self {
        let size = connect_costs.len();
        let costs = (0..size)
            .map(|dest| {
                (0..size)
                    .map(|via| {
                        if dest == via {
                            connect_costs[dest].min(INFINITY)
                        } else {
                            INFINITY
                        }
                    })
                    .collect()
            })
            .collect();

        Self { owner, costs }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn size(&self) -> usize {
        self.costs.len()
    }

    pub fn cost(&self, dest: NodeId, via: NodeId) -> Cost {
        self.costs[dest][via]
    }

    pub fn direct_cost(&self, via: NodeId) -> Cost {
        self.costs[via][via]
    }

    pub fn row(&self, dest: NodeId) -> &[Cost] {
        &self.costs[dest]
    }

    /// Bellman-Ford step: the cost to every `d` through `via` becomes the
    /// direct cost to `via` plus `via`'s advertised best cost to `d`.
    ///
    /// `neighbor_min_cost` must have one entry per node; callers validate it.
    pub fn relax(&mut self, via: NodeId, neighbor_min_cost: &[Cost]) {
        let direct = self.direct_cost(via);
        for (dest, advertised) in neighbor_min_cost.iter().enumerate() {
            self.costs[dest][via] = saturating_cost_add(direct, *advertised);
        }
    }

    /// Swaps the direct cost of `link` for `new_cost`, keeping the part of
    /// every path learned through `link` that lies beyond it.
    pub fn apply_link_cost_change(&mut self, link: NodeId, new_cost: Cost) {
        let old_direct = self.direct_cost(link);
        let new_cost = new_cost.min(INFINITY);

        for dest in 0..self.size() {
            let current = self.costs[dest][link];
            self.costs[dest][link] = if dest == link {
                new_cost
            } else if current >= INFINITY || old_direct >= INFINITY {
                INFINITY
            } else {
                saturating_cost_add(new_cost, current.saturating_sub(old_direct))
            };
        }
    }
}

impl fmt::Display for DistanceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vias: Vec<NodeId> = (0..self.size())
            .filter(|&via| via != self.owner && self.direct_cost(via) < INFINITY)
            .collect();

        write!(f, "   D{:<2}|", self.owner)?;
        for via in &vias {
            write!(f, " {:>5}", via)?;
        }
        writeln!(f, "   (via)")?;
        writeln!(f, "  -----|{}", "-".repeat(vias.len() * 6))?;

        for dest in (0..self.size()).filter(|&d| d != self.owner) {
            write!(f, "  {:>4} |", dest)?;
            for via in &vias {
                write!(f, " {:>5}", self.costs[dest][*via])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
