use super::{check_addressing, Clock, Topology, Transport};
use crate::protocol::{
    DistanceTable, DistanceVectorPacket, LinkCostChange, MinCostVector, RoutingEngine,
};
use crate::{ContractViolation, Cost, NodeId, RoutingError, INFINITY};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

enum NodeCommand {
    /// JSON-encoded [`DistanceVectorPacket`].
    Packet(Vec<u8>),
    LinkChange { link: NodeId, cost: i64 },
    Snapshot(oneshot::Sender<NodeSnapshot>),
}

/// Copy of one node's routing state, taken inside the node's own task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub connect_costs: Vec<Cost>,
    pub table: DistanceTable,
    pub min_cost: MinCostVector,
}

impl NodeSnapshot {
    fn of(engine: &RoutingEngine) -> Self {
        Self {
            id: engine.id(),
            connect_costs: engine.connect_costs().to_vec(),
            table: engine.table().clone(),
            min_cost: engine.min_cost().clone(),
        }
    }
}

/// Counts commands that are queued or being handled anywhere in the network.
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn enter(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn leave(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

type Mailboxes = Arc<Vec<mpsc::UnboundedSender<NodeCommand>>>;

/// Per-node transport over the other nodes' mailboxes.
struct ChannelTransport {
    node: NodeId,
    links: Vec<Cost>,
    mailboxes: Mailboxes,
    in_flight: Arc<InFlight>,
    started: Instant,
}

impl Clock for ChannelTransport {
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, packet: DistanceVectorPacket) -> Result<(), RoutingError> {
        check_addressing(&packet, self.links.len())?;
        if packet.source_id != self.node || self.links[packet.dest_id] >= INFINITY {
            return Err(ContractViolation::NotANeighbor {
                from: packet.source_id,
                to: packet.dest_id,
            }
            .into());
        }

        let data = packet
            .encode()
            .map_err(|e| RoutingError::Transport(e.to_string()))?;

        self.in_flight.enter();
        if self.mailboxes[packet.dest_id].send(NodeCommand::Packet(data)).is_err() {
            self.in_flight.leave();
            return Err(RoutingError::Transport(format!(
                "mailbox of node {} is closed",
                packet.dest_id
            )));
        }
        Ok(())
    }
}

/// Runs every node as its own tokio task. Nodes share nothing but their
/// mailboxes; each engine is owned by exactly one task.
pub struct ActorNetwork {
    size: usize,
    mailboxes: Mailboxes,
    in_flight: Arc<InFlight>,
    shutdown_tx: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl ActorNetwork {
    /// Spawns one task per node. Must be called from within a tokio runtime.
    pub fn spawn(topology: &Topology) -> Self {
        let size = topology.size();
        let started = Instant::now();
        let (shutdown_tx, _) = broadcast::channel(1);

        // one token per node until its initial announcement is out
        let in_flight = Arc::new(InFlight {
            count: AtomicUsize::new(size),
            idle: Notify::new(),
        });

        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::unbounded_channel()).unzip();
        let mailboxes: Mailboxes = Arc::new(senders);

        let handles = receivers
            .into_iter()
            .enumerate()
            .map(|(node, rx)| {
                let transport = ChannelTransport {
                    node,
                    links: topology.connect_costs(node).to_vec(),
                    mailboxes: mailboxes.clone(),
                    in_flight: in_flight.clone(),
                    started,
                };
                let shutdown_rx = shutdown_tx.subscribe();
                tokio::spawn(node_task(transport, rx, shutdown_rx))
            })
            .collect();

        info!("Spawned {} node tasks", size);

        Self {
            size,
            mailboxes,
            in_flight,
            shutdown_tx,
            handles,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Resolves once no packet or link change is queued or being handled.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            if self.in_flight.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Changes the link between `a` and `b` at both endpoints.
    pub fn change_link(&self, a: NodeId, b: NodeId, cost: i64) -> Result<(), RoutingError> {
        LinkCostChange::validate(a, self.size, b, cost)?;
        LinkCostChange::validate(b, self.size, a, cost)?;

        for (node, link) in [(a, b), (b, a)] {
            self.in_flight.enter();
            if self.mailboxes[node].send(NodeCommand::LinkChange { link, cost }).is_err() {
                self.in_flight.leave();
                return Err(RoutingError::Transport(format!("mailbox of node {} is closed", node)));
            }
        }
        Ok(())
    }

    pub async fn snapshot(&self, node: NodeId) -> Result<NodeSnapshot, RoutingError> {
        let mailbox = self.mailboxes.get(node).ok_or(ContractViolation::UnknownNode {
            node,
            size: self.size,
        })?;

        let (tx, rx) = oneshot::channel();
        mailbox
            .send(NodeCommand::Snapshot(tx))
            .map_err(|_| RoutingError::Transport(format!("mailbox of node {} is closed", node)))?;

        rx.await
            .map_err(|_| RoutingError::Transport(format!("node {} stopped before replying", node)))
    }

    pub async fn snapshots(&self) -> Result<Vec<NodeSnapshot>, RoutingError> {
        let mut snapshots = Vec::with_capacity(self.size);
        for node in 0..self.size {
            snapshots.push(self.snapshot(node).await?);
        }
        Ok(snapshots)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Node task failed: {}", e);
            }
        }
        info!("All node tasks stopped");
    }
}

async fn node_task(
    mut transport: ChannelTransport,
    mut rx: mpsc::UnboundedReceiver<NodeCommand>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let node = transport.node;
    let in_flight = transport.in_flight.clone();
    let links = transport.links.clone();

    let mut engine = match RoutingEngine::initialize(node, &links, &mut transport) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Node {} failed to initialize: {}", node, e);
            in_flight.leave();
            return;
        }
    };
    in_flight.leave();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Node {} task shutting down", node);
                break;
            }
            command = rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    NodeCommand::Packet(data) => {
                        match DistanceVectorPacket::decode(&data) {
                            Ok(packet) => {
                                if let Err(e) = engine.on_packet_received(&packet, &mut transport) {
                                    warn!("Node {} dropped packet: {}", node, e);
                                }
                            }
                            Err(e) => warn!("Node {} received an undecodable packet: {}", node, e),
                        }
                        in_flight.leave();
                    }
                    NodeCommand::LinkChange { link, cost } => {
                        match LinkCostChange::validate(node, engine.size(), link, cost) {
                            Ok(change) => {
                                transport.links[change.link] = change.cost;
                                engine.apply_link_change(change, &mut transport);
                            }
                            Err(e) => warn!("Node {} rejected link change: {}", node, e),
                        }
                        in_flight.leave();
                    }
                    NodeCommand::Snapshot(reply) => {
                        let _ = reply.send(NodeSnapshot::of(&engine));
                    }
                }
            }
        }
    }
}
