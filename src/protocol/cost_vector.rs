use super::DistanceTable;
use crate::{Cost, NodeId, INFINITY};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Best known cost from the owning node to every destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinCostVector(Vec<Cost>);

impl MinCostVector {
    /// Row minima of the table. Only the value is kept, not the via node.
    pub fn recompute(table: &DistanceTable) -> Self {
        let costs = (0..table.size())
            .map(|dest| table.row(dest).iter().copied().min().unwrap_or(INFINITY))
            .collect();
        Self(costs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, dest: NodeId) -> Option<Cost> {
        self.0.get(dest).copied()
    }

    pub fn as_slice(&self) -> &[Cost] {
        &self.0
    }

    /// True when at least one destination's cost changed.
    pub fn differs_from(&self, other: &MinCostVector) -> bool {
        self.0.len() != other.0.len() || self.0.iter().zip(&other.0).any(|(a, b)| a != b)
    }
}

impl Index<NodeId> for MinCostVector {
    type Output = Cost;

    fn index(&self, dest: NodeId) -> &Cost {
        &self.0[dest]
    }
}

impl From<MinCostVector> for Vec<Cost> {
    fn from(vector: MinCostVector) -> Self {
        vector.0
    }
}
