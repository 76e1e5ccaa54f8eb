use super::{check_addressing, Clock, Transport};
use crate::protocol::DistanceVectorPacket;
use crate::{ContractViolation, Cost, NodeId, RoutingError, INFINITY};

/// Transport that records one node's packets instead of delivering them.
///
/// Useful for driving single engines by hand: every accepted send is kept in
/// order until drained. Sends only go out over links the node actually has.
#[derive(Debug)]
pub struct Outbox {
    node: NodeId,
    links: Vec<Cost>,
    now: f64,
    sent: Vec<DistanceVectorPacket>,
}

impl Outbox {
    pub fn for_node(node: NodeId, connect_costs: &[Cost]) -> Self {
        Self {
            node,
            links: connect_costs.to_vec(),
            now: 0.0,
            sent: Vec::new(),
        }
    }

    /// Mirrors a link change on the sending side, ahead of the engine's own update.
    pub fn set_link_cost(&mut self, link: NodeId, cost: Cost) {
        if link != self.node && link < self.links.len() {
            self.links[link] = cost.min(INFINITY);
        }
    }

    pub fn set_time(&mut self, now: f64) {
        self.now = now;
    }

    pub fn sent(&self) -> &[DistanceVectorPacket] {
        &self.sent
    }

    pub fn drain(&mut self) -> Vec<DistanceVectorPacket> {
        std::mem::take(&mut self.sent)
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl Clock for Outbox {
    fn now(&self) -> f64 {
        self.now
    }
}

impl Transport for Outbox {
    fn send(&mut self, packet: DistanceVectorPacket) -> Result<(), RoutingError> {
        check_addressing(&packet, self.links.len())?;
        if packet.source_id != self.node || self.links[packet.dest_id] >= INFINITY {
            return Err(ContractViolation::NotANeighbor {
                from: packet.source_id,
                to: packet.dest_id,
            }
            .into());
        }

        self.sent.push(packet);
        Ok(())
    }
}
