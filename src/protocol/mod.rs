pub mod cost_vector;
pub mod distance_table;
pub mod link_change;
pub mod messages;

pub use cost_vector::*;
pub use distance_table::*;
pub use link_change::*;
pub use messages::*;

use crate::network::Transport;
use crate::{ContractViolation, Cost, NodeId, RoutingError, INFINITY};
use log::{debug, info, trace, warn};
use std::fmt;

/// What a node did in reaction to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The minimum-cost vector changed and was sent to these neighbors.
    Broadcast { recipients: Vec<NodeId> },
    /// Nothing changed; no packet left the node.
    Unchanged,
}

impl UpdateOutcome {
    pub fn is_broadcast(&self) -> bool {
        matches!(self, UpdateOutcome::Broadcast { .. })
    }
}

/// Per-node distance-vector state machine.
///
/// An engine only exists once initialized, so the "uninitialized" state is
/// simply the absence of one. Every handler runs to completion: relax the
/// table, recompute the vector, and re-broadcast the full vector to all direct
/// neighbors if any entry moved.
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    id: NodeId,
    connect_costs: Vec<Cost>,
    table: DistanceTable,
    min_cost: MinCostVector,
}

impl RoutingEngine {
    /// Builds the node's table from its direct link costs and announces the
    /// resulting vector to every neighbor.
    pub fn initialize(
        id: NodeId,
        connect_costs: &[Cost],
        transport: &mut dyn Transport,
    ) -> Result<Self, RoutingError> {
        let size = connect_costs.len();
        if size == 0 {
            return Err(RoutingError::config("node has an empty cost vector"));
        }
        if id >= size {
            return Err(RoutingError::config(format!(
                "node id {} is outside a {}-node network",
                id, size
            )));
        }
        if connect_costs[id] != 0 {
            return Err(RoutingError::config(format!(
                "node {} has cost {} to itself, expected 0",
                id, connect_costs[id]
            )));
        }

        let connect_costs: Vec<Cost> = connect_costs.iter().map(|c| (*c).min(INFINITY)).collect();
        let table = DistanceTable::initialize(id, &connect_costs);
        let min_cost = MinCostVector::recompute(&table);

        let engine = Self {
            id,
            connect_costs,
            table,
            min_cost,
        };

        info!("Node {} initialized at t={:.3}", id, transport.now());
        trace!("Node {} distance table:\n{}", id, engine.table);

        engine.broadcast(transport);
        Ok(engine)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn size(&self) -> usize {
        self.connect_costs.len()
    }

    pub fn table(&self) -> &DistanceTable {
        &self.table
    }

    pub fn min_cost(&self) -> &MinCostVector {
        &self.min_cost
    }

    pub fn connect_costs(&self) -> &[Cost] {
        &self.connect_costs
    }

    /// Nodes reachable over a direct link, excluding this node.
    pub fn neighbors(&self) -> Vec<NodeId> {
        self.connect_costs
            .iter()
            .enumerate()
            .filter(|(node, cost)| *node != self.id && **cost < INFINITY)
            .map(|(node, _)| node)
            .collect()
    }

    pub fn on_packet_received(
        &mut self,
        packet: &DistanceVectorPacket,
        transport: &mut dyn Transport,
    ) -> Result<UpdateOutcome, RoutingError> {
        self.check_packet(packet)?;

        debug!(
            "Node {} received vector {:?} from node {} at t={:.3}",
            self.id,
            packet.min_cost,
            packet.source_id,
            transport.now()
        );

        self.table.relax(packet.source_id, &packet.min_cost);
        trace!("Node {} distance table:\n{}", self.id, self.table);

        Ok(self.refresh(transport))
    }

    /// Entry point for scripted link-cost changes; validates the raw event
    /// before touching any state.
    pub fn on_link_cost_change(
        &mut self,
        link_id: NodeId,
        new_cost: i64,
        transport: &mut dyn Transport,
    ) -> Result<UpdateOutcome, RoutingError> {
        let change = LinkCostChange::validate(self.id, self.size(), link_id, new_cost)?;
        Ok(self.apply_link_change(change, transport))
    }

    pub fn apply_link_change(
        &mut self,
        change: LinkCostChange,
        transport: &mut dyn Transport,
    ) -> UpdateOutcome {
        info!(
            "Link cost change at t={:.3}: node {} -> node {} now costs {} (was {})",
            transport.now(),
            self.id,
            change.link,
            change.cost,
            self.connect_costs[change.link]
        );

        self.connect_costs[change.link] = change.cost;
        self.table.apply_link_cost_change(change.link, change.cost);
        trace!("Node {} distance table:\n{}", self.id, self.table);

        self.refresh(transport)
    }

    fn check_packet(&self, packet: &DistanceVectorPacket) -> Result<(), ContractViolation> {
        let size = self.size();
        if packet.source_id >= size {
            return Err(ContractViolation::UnknownNode {
                node: packet.source_id,
                size,
            });
        }
        if packet.source_id == self.id {
            return Err(ContractViolation::SelfAddressed { node: self.id });
        }
        if packet.dest_id != self.id {
            return Err(ContractViolation::Misaddressed {
                node: self.id,
                dest: packet.dest_id,
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

    fn refresh(&mut self, transport: &mut dyn Transport) -> UpdateOutcome {
        let previous = std::mem::replace(&mut self.min_cost, MinCostVector::recompute(&self.table));

        if self.min_cost.differs_from(&previous) {
            debug!(
                "Node {} minimum costs updated {:?} -> {:?}",
                self.id,
                previous.as_slice(),
                self.min_cost.as_slice()
            );
            UpdateOutcome::Broadcast {
                recipients: self.broadcast(transport),
            }
        } else {
            debug!("Node {}: no change in minimum cost, nothing sent", self.id);
            UpdateOutcome::Unchanged
        }
    }

    fn broadcast(&self, transport: &mut dyn Transport) -> Vec<NodeId> {
        let mut recipients = Vec::new();

        for neighbor in self.neighbors() {
            let packet = DistanceVectorPacket::new(self.id, neighbor, &self.min_cost);
            match transport.send(packet) {
                Ok(()) => {
                    info!(
                        "t={:.3}: node {} sends packet to node {} with costs {:?}",
                        transport.now(),
                        self.id,
                        neighbor,
                        self.min_cost.as_slice()
                    );
                    recipients.push(neighbor);
                }
                Err(e) => warn!("Node {} failed to send to node {}: {}", self.id, neighbor, e),
            }
        }

        recipients
    }
}

impl fmt::Display for RoutingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        write!(f, "Node {}'s minimum costs to other nodes:", self.id)?;
        for cost in self.min_cost.as_slice() {
            write!(f, " {}", cost)?;
        }
        writeln!(f)
    }
}
