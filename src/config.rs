use crate::network::{DelayModel, Topology};
use crate::{NodeId, RoutingError, INFINITY};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub delay: DelayModel,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub link_changes: Vec<LinkChangeConfig>,
    #[serde(default)]
    pub max_time: Option<f64>,
    #[serde(default)]
    pub max_events: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Direct cost to every node, 0 for self, 999 or more for no link.
    pub connect_costs: Vec<i64>,
}

/// Scripted change of the link between `a` and `b`, applied at both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkChangeConfig {
    pub time: f64,
    pub a: NodeId,
    pub b: NodeId,
    pub cost: i64,
}

impl Default for SimulationConfig {
    /// The four-node network:
    ///
    /// ```text
    ///     1 --1-- 0 --7-- 3
    ///      \      |      /
    ///       1     3     2
    ///        \    |    /
    ///          -- 2 --
    /// ```
    fn default() -> Self {
        let i = INFINITY as i64;
        Self {
            nodes: vec![
                NodeConfig { connect_costs: vec![0, 1, 3, 7] },
                NodeConfig { connect_costs: vec![1, 0, 1, i] },
                NodeConfig { connect_costs: vec![3, 1, 0, 2] },
                NodeConfig { connect_costs: vec![7, i, 2, 0] },
            ],
            delay: DelayModel::default(),
            seed: 0,
            link_changes: Vec::new(),
            max_time: None,
            max_events: None,
        }
    }
}

impl SimulationConfig {
    /// Default network plus the classic link-change script: the 0-1 link
    /// rises to 20 at t=10000 and drops back to 1 at t=20000.
    pub fn with_link_changes() -> Self {
        Self {
            link_changes: vec![
                LinkChangeConfig { time: 10_000.0, a: 0, b: 1, cost: 20 },
                LinkChangeConfig { time: 20_000.0, a: 0, b: 1, cost: 1 },
            ],
            ..Self::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SimulationConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn topology(&self) -> Result<Topology, RoutingError> {
        let rows: Vec<Vec<i64>> = self.nodes.iter().map(|n| n.connect_costs.clone()).collect();
        Topology::from_raw(&rows)
    }

    /// Link changes ordered by time; stable for equal times.
    pub fn sorted_link_changes(&self) -> Vec<LinkChangeConfig> {
        let mut changes = self.link_changes.clone();
        changes.sort_by(|a, b| a.time.total_cmp(&b.time));
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_four_node_network() {
        let topology = SimulationConfig::default().topology().unwrap();
        assert_eq!(topology.size(), 4);
        assert_eq!(topology.connect_costs(0), &[0, 1, 3, 7]);
        assert!(!topology.is_link(1, 3));
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{ "nodes": [ { "connect_costs": [0, 2] }, { "connect_costs": [2, 0] } ] }"#,
        )
        .unwrap();

        assert_eq!(config.delay, DelayModel::Uniform { max: 2.0 });
        assert_eq!(config.seed, 0);
        assert!(config.link_changes.is_empty());
        assert_eq!(config.topology().unwrap().cost(0, 1), 2);
    }

    #[test]
    fn delay_model_is_tagged() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{ "nodes": [ { "connect_costs": [0] } ], "delay": { "kind": "fixed", "delay": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.delay, DelayModel::Fixed { delay: 0.5 });
    }

    #[test]
    fn negative_costs_are_configuration_errors() {
        let mut config = SimulationConfig::default();
        config.nodes[2].connect_costs[3] = -2;
        assert!(matches!(config.topology(), Err(RoutingError::Configuration(_))));
    }

    #[test]
    fn save_and_load_through_a_file() {
        let path =
            std::env::temp_dir().join(format!("custom-dv-config-{}.json", std::process::id()));
        let config = SimulationConfig::with_link_changes();

        config.save(&path).unwrap();
        let loaded = SimulationConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn link_changes_sort_by_time() {
        let mut config = SimulationConfig::with_link_changes();
        config.link_changes.reverse();
        let times: Vec<f64> = config.sorted_link_changes().iter().map(|c| c.time).collect();
        assert_eq!(times, vec![10_000.0, 20_000.0]);
    }
}
