pub mod actor;
pub mod outbox;
pub mod simulator;
pub mod topology;

pub use actor::{ActorNetwork, NodeSnapshot};
pub use outbox::Outbox;
pub use simulator::{DelayModel, RunLimits, SimulationReport, Simulator};
pub use topology::Topology;

use crate::protocol::DistanceVectorPacket;
use crate::{ContractViolation, RoutingError};

/// Read-only view of the current simulated time, used for diagnostics only.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Hands packets to the network for delayed delivery to `packet.dest_id`.
///
/// The transport owns the propagation delay. Sends to self, to unknown nodes
/// or over a link that does not exist are rejected and the packet is dropped.
pub trait Transport: Clock {
    fn send(&mut self, packet: DistanceVectorPacket) -> Result<(), RoutingError>;
}

/// Addressing checks every transport applies before accepting a packet.
pub(crate) fn check_addressing(
    packet: &DistanceVectorPacket,
    size: usize,
) -> Result<(), ContractViolation> {
    for node in [packet.source_id, packet.dest_id] {
        if node >= size {
            return Err(ContractViolation::UnknownNode { node, size });
        }
    }
    if packet.source_id == packet.dest_id {
        return Err(ContractViolation::SelfAddressed {
            node: packet.source_id,
        });
    }
    if packet.min_cost.len() != size {
        return Err(ContractViolation::VectorLength {
            got: packet.min_cost.len(),
            expected: size,
        });
    }
    Ok(())
}
