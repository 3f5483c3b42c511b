//! Results Graph: typed nodes and edges over a stable arena
//!
//! Nodes are keyed by the identity of what they stand for ([`NodeKey`]);
//! registering the same key twice leaves the graph unchanged. Every edge
//! names the service that owns it, so several services can point at the
//! same design or result node without their roll-ups mixing.

use netcam_core::{CheckResult, CheckStatus};
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("GRAPH/unknown node {0}")]
    UnknownNode(NodeKey),

    #[error("GRAPH/unknown service {0}")]
    UnknownService(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKey {
    Service { name: String },
    Design { id: String },
    /// One persisted result; the collection keeps identical check ids from
    /// different collections apart.
    Result {
        device: String,
        collection: String,
        check_type: String,
        check_id: String,
    },
}

impl NodeKey {
    pub fn service(name: impl Into<String>) -> Self {
        NodeKey::Service { name: name.into() }
    }

    pub fn design(id: impl Into<String>) -> Self {
        NodeKey::Design { id: id.into() }
    }

    pub fn result(collection: &str, result: &CheckResult) -> Self {
        NodeKey::Result {
            device: result.device().to_string(),
            collection: collection.to_string(),
            check_type: result.check_type().to_string(),
            check_id: result.check_id(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeKey::Service { .. } => NodeKind::Service,
            NodeKey::Design { .. } => NodeKind::Design,
            NodeKey::Result { .. } => NodeKind::Result,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Service { name } => write!(f, "service:{}", name),
            NodeKey::Design { id } => write!(f, "design:{}", id),
            NodeKey::Result {
                device,
                collection,
                check_type,
                check_id,
            } => write!(f, "result:{}/{}/{}/{}", device, collection, check_type, check_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Service,
    Design,
    Result,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Service => "service",
            NodeKind::Design => "design",
            NodeKind::Result => "result",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub key: NodeKey,
    pub label: String,
    /// Service that first registered the node.
    pub service: Option<String>,
    pub status: CheckStatus,
    pub pass_count: usize,
    pub fail_count: usize,
    /// Set on result nodes only.
    pub result: Option<CheckResult>,
}

impl GraphNode {
    pub fn kind(&self) -> NodeKind {
        self.key.kind()
    }

    /// Service root, seeded healthy with nothing counted yet.
    pub fn service(name: &str) -> Self {
        Self {
            key: NodeKey::service(name),
            label: name.to_string(),
            service: Some(name.to_string()),
            status: CheckStatus::Pass,
            pass_count: 0,
            fail_count: 0,
            result: None,
        }
    }

    pub fn design(id: &str, label: impl Into<String>, service: &str) -> Self {
        Self {
            key: NodeKey::design(id),
            label: label.into(),
            service: Some(service.to_string()),
            status: CheckStatus::Pass,
            pass_count: 0,
            fail_count: 0,
            result: None,
        }
    }

    /// Leaf wrapping one result; counts one pass, or one fail for any
    /// other status.
    pub fn result(service: &str, collection: &str, result: CheckResult) -> Self {
        let passed = result.status() == CheckStatus::Pass;
        Self {
            key: NodeKey::result(collection, &result),
            label: format!("{} {}", result.check_type(), result.check_id()),
            service: Some(service.to_string()),
            status: result.status(),
            pass_count: usize::from(passed),
            fail_count: usize::from(!passed),
            result: Some(result),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Service composition: one service depending on or showing another.
    Service,
    /// Service to the design element (device) it covers.
    Design,
    /// Design element to a check result.
    Result,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Service => "service",
            EdgeKind::Design => "design",
            EdgeKind::Result => "result",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    /// Owning service.
    pub service: String,
    /// Excluded from roll-up.
    #[serde(default)]
    pub stop: bool,
}

impl GraphEdge {
    pub fn new(kind: EdgeKind, service: impl Into<String>) -> Self {
        Self {
            kind,
            service: service.into(),
            stop: false,
        }
    }

    pub fn stopped(mut self) -> Self {
        self.stop = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultsGraph {
    graph: StableGraph<GraphNode, GraphEdge>,
    index: HashMap<NodeKey, NodeIndex>,
}

impl ResultsGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under its key. Returns `true` only when a new node
    /// was created.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.index.contains_key(&node.key) {
            return false;
        }
        let key = node.key.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        true
    }

    pub fn add_service(&mut self, name: &str) -> bool {
        self.add_node(GraphNode::service(name))
    }

    pub fn add_result(&mut self, service: &str, collection: &str, result: CheckResult) -> (NodeKey, bool) {
        let node = GraphNode::result(service, collection, result);
        let key = node.key.clone();
        let created = self.add_node(node);
        (key, created)
    }

    /// Connect two registered nodes. An identical edge is not duplicated.
    pub fn add_edge(&mut self, from: &NodeKey, to: &NodeKey, edge: GraphEdge) -> Result<EdgeIndex, GraphError> {
        let source = self.index_of(from)?;
        let target = self.index_of(to)?;

        if let Some(existing) = self
            .graph
            .edges_directed(source, Direction::Outgoing)
            .find(|e| e.target() == target && e.weight() == &edge)
        {
            return Ok(existing.id());
        }
        Ok(self.graph.add_edge(source, target, edge))
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn node(&self, key: &NodeKey) -> Option<&GraphNode> {
        self.index.get(key).and_then(|idx| self.graph.node_weight(*idx))
    }

    pub fn node_mut(&mut self, key: &NodeKey) -> Option<&mut GraphNode> {
        let idx = *self.index.get(key)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, key: &NodeKey) -> Result<NodeIndex, GraphError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(key.clone()))
    }

    pub(crate) fn weight(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    pub(crate) fn weight_mut(&mut self, idx: NodeIndex) -> Option<&mut GraphNode> {
        self.graph.node_weight_mut(idx)
    }

    /// Out-edges of `idx` owned by `service`, in insertion order.
    pub(crate) fn owned_edges(&self, idx: NodeIndex, service: &str) -> Vec<(NodeIndex, GraphEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().service == service)
            .map(|e| (e.id(), e.target(), e.weight().clone()))
            .collect();
        edges.sort_by_key(|(id, _, _)| *id);
        edges.into_iter().map(|(_, target, edge)| (target, edge)).collect()
    }

    pub(crate) fn inner(&self) -> &StableGraph<GraphNode, GraphEdge> {
        &self.graph
    }
}
