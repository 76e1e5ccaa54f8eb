use crate::NodeId;

/// Errors surfaced by the routing core and its transports.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// Invalid topology or node setup. Fatal, reported before any event runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An event or send broke the node/transport contract and was dropped.
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),

    /// The carrier itself failed (closed mailbox, unencodable packet).
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Ways an event can reference the network incorrectly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("node {node} is outside a {size}-node network")]
    UnknownNode { node: NodeId, size: usize },

    #[error("node {node} cannot address itself")]
    SelfAddressed { node: NodeId },

    #[error("packet for node {dest} was delivered to node {node}")]
    Misaddressed { node: NodeId, dest: NodeId },

    #[error("node {from} has no direct link to node {to}")]
    NotANeighbor { from: NodeId, to: NodeId },

    #[error("negative link cost {cost}")]
    NegativeCost { cost: i64 },

    #[error("cost vector has {got} entries, expected {expected}")]
    VectorLength { got: usize, expected: usize },

    #[error("node {node} cannot change the cost of a link to itself")]
    SelfLink { node: NodeId },
}

impl RoutingError {
    pub fn config(reason: impl Into<String>) -> Self {
        RoutingError::Configuration(reason.into())
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, RoutingError::Contract(_))
    }
}
