use crate::{cost_from_raw, ContractViolation, Cost, NodeId};

/// A validated change of the direct cost from a node to one of its links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCostChange {
    pub link: NodeId,
    pub cost: Cost,
}

impl LinkCostChange {
    /// Checks a raw link-change event against the receiving node.
    ///
    /// `link_id` must name another node in the network; `raw_cost` must be
    /// non-negative. Costs at or above `INFINITY` mean the link went down.
    pub fn validate(
        node: NodeId,
        size: usize,
        link_id: NodeId,
        raw_cost: i64,
    ) -> Result<Self, ContractViolation> {
        if link_id >= size {
            return Err(ContractViolation::UnknownNode { node: link_id, size });
        }
        if link_id == node {
            return Err(ContractViolation::SelfLink { node });
        }
        let cost = cost_from_raw(raw_cost)?;

        Ok(Self { link: link_id, cost })
    }
}
