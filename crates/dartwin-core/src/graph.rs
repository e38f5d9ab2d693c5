//! Render-ready graph types.
//!
//! A [`Graph`] is a flat list of typed [`Node`]s and [`Edge`]s. Containment is
//! expressed through each node's `parent_id`; edges only carry connections and
//! allocations. The serialized form is the flat record shape any external
//! diagram renderer can consume directly:
//!
//! ```text
//! { "id": "dt::Plant::Controller", "type": "digitalTwin",
//!   "label": "Controller", "parentId": "system::Plant" }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::identifier::NodeId;

/// Label written on every allocation edge.
pub const ALLOCATION_LABEL: &str = "allocate";

/// The kind of a node, carrying exactly the data that kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    Root,
    System,
    DigitalTwin,
    OriginalTwin,
    Port,
    Goal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        doc: Option<String>,
    },
}

impl NodeKind {
    /// Short name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::System => "system",
            NodeKind::DigitalTwin => "digitalTwin",
            NodeKind::OriginalTwin => "originalTwin",
            NodeKind::Port => "port",
            NodeKind::Goal { .. } => "goal",
        }
    }
}

/// A typed, uniquely identified graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    id: NodeId,
    #[serde(flatten)]
    kind: NodeKind,
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<NodeId>,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            parent_id: None,
        }
    }

    /// Sets the containing node.
    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }

    /// Documentation text; only goals carry any.
    pub fn doc(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Goal { doc } => doc.as_deref(),
            _ => None,
        }
    }
}

/// Distinguishes port wiring from goal allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    Connection,
    Allocation,
}

/// A directed edge between two existing nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    id: String,
    #[serde(rename = "type")]
    kind: EdgeKind,
    source: NodeId,
    target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
}

impl Edge {
    pub fn new(id: impl Into<String>, kind: EdgeKind, source: NodeId, target: NodeId) -> Self {
        Self {
            id: id.into(),
            kind,
            source,
            target,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    pub fn source(&self) -> &NodeId {
        &self.source
    }

    pub fn target(&self) -> &NodeId {
        &self.target
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Flat node and edge lists in deterministic, first-declared-first order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Iterates over nodes whose parent is `parent`, in graph order.
    pub fn children<'a>(&'a self, parent: &'a NodeId) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes
            .iter()
            .filter(move |node| node.parent_id() == Some(parent))
    }

    /// Returns the first edge whose endpoint does not name a node, if any.
    pub fn find_dangling_edge(&self) -> Option<&Edge> {
        let ids: HashSet<&NodeId> = self.nodes.iter().map(Node::id).collect();
        self.edges
            .iter()
            .find(|edge| !ids.contains(edge.source()) || !ids.contains(edge.target()))
    }

    /// Consumes the graph, returning its parts.
    pub fn into_parts(self) -> (Vec<Node>, Vec<Edge>) {
        (self.nodes, self.edges)
    }
}
