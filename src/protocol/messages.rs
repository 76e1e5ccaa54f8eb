use super::MinCostVector;
use crate::{Cost, NodeId};
use serde::{Deserialize, Serialize};

/// Routing update exchanged between direct neighbors. The payload is always
/// the sender's complete minimum-cost vector; `dest_id` only addresses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceVectorPacket {
    pub source_id: NodeId,
    pub dest_id: NodeId,
    pub min_cost: Vec<Cost>,
}

impl DistanceVectorPacket {
    pub fn new(source_id: NodeId, dest_id: NodeId, min_cost: &MinCostVector) -> Self {
        Self {
            source_id,
            dest_id,
            min_cost: min_cost.as_slice().to_vec(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
