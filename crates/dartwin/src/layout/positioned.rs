//! Layout output: graph nodes and edges with geometry and drawing style.

use serde::Serialize;

use dartwin_core::{
    geometry::{Bounds, Point, Size},
    graph::{Edge, EdgeKind, Node},
    identifier::NodeId,
    interchange::InterchangeError,
};

use super::ports::PortRole;

/// A graph node with its box.
///
/// `position` is relative to the parent's top-left corner when the node has
/// a parent, and absolute otherwise; `absolute` is always in canvas space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedNode {
    #[serde(flatten)]
    node: Node,
    position: Point,
    absolute: Point,
    width: f32,
    height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<PortRole>,
}

impl PositionedNode {
    pub(super) fn new(
        node: Node,
        position: Point,
        absolute: Point,
        size: Size,
        role: Option<PortRole>,
    ) -> Self {
        Self {
            node,
            position,
            absolute,
            width: size.width(),
            height: size.height(),
            role,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn id(&self) -> &NodeId {
        self.node.id()
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn absolute(&self) -> Point {
        self.absolute
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Absolute bounds of the node's box.
    pub fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.absolute, self.size())
    }

    /// Absolute center of the node's box.
    pub fn center(&self) -> Point {
        Point::new(
            self.absolute.x() + self.width / 2.0,
            self.absolute.y() + self.height / 2.0,
        )
    }

    /// Port role, for port nodes.
    pub fn role(&self) -> Option<PortRole> {
        self.role
    }
}

/// Line style of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeStyle {
    Solid,
    Dashed,
}

impl EdgeStyle {
    /// SVG-style dash pattern, if any.
    pub fn dash_array(self) -> Option<&'static str> {
        match self {
            EdgeStyle::Solid => None,
            EdgeStyle::Dashed => Some("6 4"),
        }
    }
}

impl From<EdgeKind> for EdgeStyle {
    fn from(kind: EdgeKind) -> Self {
        match kind {
            EdgeKind::Connection => EdgeStyle::Solid,
            EdgeKind::Allocation => EdgeStyle::Dashed,
        }
    }
}

/// A graph edge with its drawing style. Edges are not routed; renderers draw
/// a straight line between the endpoint nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedEdge {
    #[serde(flatten)]
    edge: Edge,
    style: EdgeStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    dash_array: Option<&'static str>,
}

impl PositionedEdge {
    pub(super) fn new(edge: Edge) -> Self {
        let style = EdgeStyle::from(edge.kind());
        Self {
            edge,
            style,
            dash_array: style.dash_array(),
        }
    }

    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    pub fn style(&self) -> EdgeStyle {
        self.style
    }
}

/// A fully laid out graph, in the node and edge order of its source graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionedGraph {
    nodes: Vec<PositionedNode>,
    edges: Vec<PositionedEdge>,
}

impl PositionedGraph {
    pub(super) fn new(nodes: Vec<PositionedNode>, edges: Vec<PositionedEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[PositionedNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[PositionedEdge] {
        &self.edges
    }

    /// Looks up a positioned node by id.
    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    /// Serializes to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`InterchangeError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, InterchangeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
