use super::{check_addressing, Clock, Topology, Transport};
use crate::config::SimulationConfig;
use crate::protocol::{DistanceVectorPacket, LinkCostChange, RoutingEngine, UpdateOutcome};
use crate::{ContractViolation, Cost, NodeId, RoutingError};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// How long a packet spends on a link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelayModel {
    Fixed { delay: f64 },
    /// Uniform in `[0, max)`, drawn from the simulator's seeded generator.
    Uniform { max: f64 },
}

impl Default for DelayModel {
    fn default() -> Self {
        DelayModel::Uniform { max: 2.0 }
    }
}

/// Bounds on a run. With neither set the simulator runs until no event is left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLimits {
    pub max_time: Option<f64>,
    pub max_events: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub events_processed: usize,
    pub packets_sent: usize,
    pub packets_delivered: usize,
    pub broadcasts: usize,
    pub link_changes_applied: usize,
    pub rejected_events: usize,
    pub final_time: f64,
    /// The event queue ran empty: no node has anything left to say.
    pub drained: bool,
}

#[derive(Debug, Clone)]
enum EventKind {
    Deliver(DistanceVectorPacket),
    LinkChange { node: NodeId, link: NodeId, cost: i64 },
}

#[derive(Debug)]
struct ScheduledEvent {
    time: f64,
    seq: u64,
    kind: EventKind,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap, FIFO among equal times
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of processing a single event.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub time: f64,
    pub node: NodeId,
    pub outcome: Result<UpdateOutcome, RoutingError>,
}

/// The simulated medium: clock, event queue and current link state.
struct Wire {
    clock: f64,
    next_seq: u64,
    queue: BinaryHeap<ScheduledEvent>,
    topology: Topology,
    delay: DelayModel,
    rng: StdRng,
    last_arrival: HashMap<(NodeId, NodeId), f64>,
    packets_sent: usize,
}

impl Wire {
    fn schedule(&mut self, time: f64, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent { time, seq, kind });
    }

    fn sample_delay(&mut self) -> f64 {
        match self.delay {
            DelayModel::Fixed { delay } => delay.max(0.0),
            DelayModel::Uniform { max } if max > 0.0 => self.rng.gen_range(0.0..max),
            DelayModel::Uniform { .. } => 0.0,
        }
    }
}

impl Clock for Wire {
    fn now(&self) -> f64 {
        self.clock
    }
}

impl Transport for Wire {
    fn send(&mut self, packet: DistanceVectorPacket) -> Result<(), RoutingError> {
        check_addressing(&packet, self.topology.size())?;
        if !self.topology.is_link(packet.source_id, packet.dest_id) {
            return Err(ContractViolation::NotANeighbor {
                from: packet.source_id,
                to: packet.dest_id,
            }
            .into());
        }

        // packets on one link never overtake each other
        let channel = (packet.source_id, packet.dest_id);
        let earliest = self
            .last_arrival
            .get(&channel)
            .copied()
            .unwrap_or(self.clock)
            .max(self.clock);
        let arrival = earliest + self.sample_delay();
        self.last_arrival.insert(channel, arrival);

        debug!(
            "Scheduled delivery {} -> {} at t={:.3}",
            packet.source_id, packet.dest_id, arrival
        );
        self.packets_sent += 1;
        self.schedule(arrival, EventKind::Deliver(packet));
        Ok(())
    }
}

/// Discrete-event driver running one [`RoutingEngine`] per node on a single
/// global timeline.
pub struct Simulator {
    nodes: Vec<RoutingEngine>,
    wire: Wire,
    limits: RunLimits,
    report: SimulationReport,
}

impl Simulator {
    /// Initializes every node at time 0, in id order, which queues the
    /// initial announcements.
    pub fn new(topology: Topology, delay: DelayModel, seed: u64) -> Result<Self, RoutingError> {
        let mut wire = Wire {
            clock: 0.0,
            next_seq: 0,
            queue: BinaryHeap::new(),
            topology,
            delay,
            rng: StdRng::seed_from_u64(seed),
            last_arrival: HashMap::new(),
            packets_sent: 0,
        };

        let mut nodes = Vec::with_capacity(wire.topology.size());
        for id in 0..wire.topology.size() {
            let connect_costs = wire.topology.connect_costs(id).to_vec();
            nodes.push(RoutingEngine::initialize(id, &connect_costs, &mut wire)?);
        }

        info!(
            "Simulator ready: {} nodes, {} initial packets queued",
            nodes.len(),
            wire.queue.len()
        );

        Ok(Self {
            nodes,
            wire,
            limits: RunLimits::default(),
            report: SimulationReport::default(),
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, RoutingError> {
        let mut simulator = Self::new(config.topology()?, config.delay, config.seed)?;
        simulator.set_limits(RunLimits {
            max_time: config.max_time,
            max_events: config.max_events,
        });
        for change in &config.link_changes {
            simulator.schedule_link_change(change.time, change.a, change.b, change.cost)?;
        }
        Ok(simulator)
    }

    pub fn set_limits(&mut self, limits: RunLimits) {
        self.limits = limits;
    }

    /// Schedules a change of the link between `a` and `b`; both endpoints
    /// are notified at time `at`.
    pub fn schedule_link_change(
        &mut self,
        at: f64,
        a: NodeId,
        b: NodeId,
        cost: i64,
    ) -> Result<(), RoutingError> {
        if !at.is_finite() || at < self.wire.clock {
            return Err(RoutingError::config(format!(
                "link change at t={} is not in the future of t={}",
                at, self.wire.clock
            )));
        }
        let size = self.nodes.len();
        LinkCostChange::validate(a, size, b, cost)?;
        LinkCostChange::validate(b, size, a, cost)?;

        self.wire.schedule(at, EventKind::LinkChange { node: a, link: b, cost });
        self.wire.schedule(at, EventKind::LinkChange { node: b, link: a, cost });
        Ok(())
    }

    /// Processes the next event, if any.
    pub fn step(&mut self) -> Option<StepRecord> {
        let event = self.wire.queue.pop()?;
        self.wire.clock = event.time;
        self.report.events_processed += 1;

        let (node, outcome) = match event.kind {
            EventKind::Deliver(packet) => {
                self.report.packets_delivered += 1;
                let node = packet.dest_id;
                (node, self.nodes[node].on_packet_received(&packet, &mut self.wire))
            }
            EventKind::LinkChange { node, link, cost } => {
                (node, self.fire_link_change(node, link, cost))
            }
        };

        match &outcome {
            Ok(UpdateOutcome::Broadcast { .. }) => self.report.broadcasts += 1,
            Ok(UpdateOutcome::Unchanged) => {}
            Err(e) => {
                self.report.rejected_events += 1;
                warn!("Dropped event for node {} at t={:.3}: {}", node, event.time, e);
            }
        }

        Some(StepRecord {
            time: event.time,
            node,
            outcome,
        })
    }

    fn fire_link_change(
        &mut self,
        node: NodeId,
        link: NodeId,
        cost: i64,
    ) -> Result<UpdateOutcome, RoutingError> {
        let change = LinkCostChange::validate(node, self.nodes.len(), link, cost)?;
        self.wire.topology.set_cost(node, change.link, change.cost);
        self.report.link_changes_applied += 1;
        Ok(self.nodes[node].apply_link_change(change, &mut self.wire))
    }

    /// Runs until the queue drains or a limit is reached.
    pub fn run(&mut self) -> SimulationReport {
        loop {
            if let Some(max_events) = self.limits.max_events {
                if self.report.events_processed >= max_events {
                    info!("Stopping after {} events", max_events);
                    break;
                }
            }
            match self.wire.queue.peek() {
                None => {
                    self.report.drained = true;
                    break;
                }
                Some(next) => {
                    if let Some(max_time) = self.limits.max_time {
                        if next.time > max_time {
                            info!("Stopping at time bound t={:.3}", max_time);
                            break;
                        }
                    }
                }
            }
            self.step();
        }

        self.report()
    }

    /// Processes every event scheduled at or before `time`.
    pub fn run_until(&mut self, time: f64) -> SimulationReport {
        while self.wire.queue.peek().is_some_and(|next| next.time <= time) {
            self.step();
        }
        self.report.drained = self.wire.queue.is_empty();
        self.report()
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            packets_sent: self.wire.packets_sent,
            final_time: self.wire.clock,
            ..self.report.clone()
        }
    }

    pub fn now(&self) -> f64 {
        self.wire.clock
    }

    pub fn pending_events(&self) -> usize {
        self.wire.queue.len()
    }

    pub fn topology(&self) -> &Topology {
        &self.wire.topology
    }

    pub fn node(&self, id: NodeId) -> Option<&RoutingEngine> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[RoutingEngine] {
        &self.nodes
    }

    /// Every node's current minimum-cost vector, indexed by node id.
    pub fn min_costs(&self) -> Vec<Vec<Cost>> {
        self.nodes
            .iter()
            .map(|node| node.min_cost().as_slice().to_vec())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::INFINITY;

    fn classic() -> Topology {
        const I: Cost = INFINITY;
        Topology::new(vec![
            vec![0, 1, 3, 7],
            vec![1, 0, 1, I],
            vec![3, 1, 0, 2],
            vec![7, I, 2, 0],
        ])
        .unwrap()
    }

    #[test]
    fn initialization_queues_one_packet_per_directed_link() {
        let simulator = Simulator::new(classic(), DelayModel::Fixed { delay: 1.0 }, 0).unwrap();
        // 0:3 + 1:2 + 2:3 + 3:2 neighbors
        assert_eq!(simulator.pending_events(), 10);
        assert_eq!(simulator.report().packets_sent, 10);
        assert_eq!(simulator.now(), 0.0);
    }

    #[test]
    fn equal_times_are_processed_in_scheduling_order() {
        let mut simulator = Simulator::new(classic(), DelayModel::Fixed { delay: 1.0 }, 0).unwrap();

        let first = simulator.step().unwrap();
        let second = simulator.step().unwrap();
        // node 0 announced first, to 1 then 2
        assert_eq!((first.time, first.node), (1.0, 1));
        assert_eq!((second.time, second.node), (1.0, 2));
    }

    #[test]
    fn same_seed_gives_same_run() {
        let run = |seed| {
            let mut simulator =
                Simulator::new(classic(), DelayModel::Uniform { max: 2.0 }, seed).unwrap();
            let report = simulator.run();
            (report, simulator.min_costs())
        };

        assert_eq!(run(7), run(7));
    }

    #[test]
    fn links_never_reorder_packets() {
        let mut wire = Wire {
            clock: 0.0,
            next_seq: 0,
            queue: BinaryHeap::new(),
            topology: classic(),
            delay: DelayModel::Uniform { max: 2.0 },
            rng: StdRng::seed_from_u64(3),
            last_arrival: HashMap::new(),
            packets_sent: 0,
        };

        for round in 0..20 {
            let packet = DistanceVectorPacket {
                source_id: 0,
                dest_id: 1,
                min_cost: vec![round; 4],
            };
            wire.send(packet).unwrap();
        }

        let mut previous = None;
        while let Some(event) = wire.queue.pop() {
            if let EventKind::Deliver(packet) = event.kind {
                let round = packet.min_cost[0];
                if let Some(prev) = previous {
                    assert!(round > prev);
                }
                previous = Some(round);
            }
        }
    }

    #[test]
    fn wire_rejects_sends_over_missing_links() {
        let mut simulator = Simulator::new(classic(), DelayModel::Fixed { delay: 1.0 }, 0).unwrap();
        let packet = DistanceVectorPacket { source_id: 1, dest_id: 3, min_cost: vec![0; 4] };

        let err = simulator.wire.send(packet).unwrap_err();
        assert_eq!(err, RoutingError::Contract(ContractViolation::NotANeighbor { from: 1, to: 3 }));
        assert_eq!(simulator.pending_events(), 10);
    }

    #[test]
    fn limits_stop_the_run_early() {
        let mut simulator = Simulator::new(classic(), DelayModel::Fixed { delay: 1.0 }, 0).unwrap();
        simulator.set_limits(RunLimits { max_time: None, max_events: Some(3) });
        let report = simulator.run();
        assert_eq!(report.events_processed, 3);
        assert!(!report.drained);

        let mut simulator = Simulator::new(classic(), DelayModel::Fixed { delay: 1.0 }, 0).unwrap();
        simulator.set_limits(RunLimits { max_time: Some(1.5), max_events: None });
        let report = simulator.run();
        assert_eq!(report.events_processed, 10);
        assert!(report.final_time <= 1.5);
        assert!(!report.drained);
    }

    #[test]
    fn link_changes_must_be_valid_and_in_the_future() {
        let mut simulator = Simulator::new(classic(), DelayModel::Fixed { delay: 1.0 }, 0).unwrap();
        simulator.run_until(2.0);

        assert!(simulator.schedule_link_change(1.0, 0, 1, 5).is_err());
        assert!(simulator.schedule_link_change(f64::NAN, 0, 1, 5).is_err());
        assert!(simulator.schedule_link_change(10.0, 0, 0, 5).is_err());
        assert!(simulator.schedule_link_change(10.0, 0, 4, 5).is_err());
        assert!(simulator.schedule_link_change(10.0, 0, 1, -5).is_err());
        assert!(simulator.schedule_link_change(10.0, 0, 1, 5).is_ok());
    }

    #[test]
    fn link_change_updates_both_endpoints_and_the_wire() {
        let mut simulator = Simulator::new(classic(), DelayModel::Fixed { delay: 1.0 }, 0).unwrap();
        simulator.run();
        simulator.schedule_link_change(100.0, 1, 3, 4).unwrap();
        let report = simulator.run();

        assert_eq!(report.link_changes_applied, 2);
        assert_eq!(simulator.topology().cost(1, 3), 4);
        assert_eq!(simulator.topology().cost(3, 1), 4);
        assert_eq!(simulator.node(1).unwrap().neighbors(), vec![0, 2, 3]);
        assert_eq!(simulator.node(1).unwrap().min_cost()[3], 3);
    }
}
