//! Template layout engine.
//!
//! Assigns every node of a [`Graph`] a box, following one fixed,
//! domain-specific template instead of a general graph-drawing algorithm:
//!
//! ```text
//!  [goal A]  [goal B]  [goal C]          goals, sorted by label
//!
//!  ┌──────── system ────────┐  ┌── ...   systems, declaration order
//!  ■   ┌─ twin ─┐ ┌─ twin ─┐ ■
//!  ■  ■│        │■│        │■ ■           sensor ports left,
//!      └───■────┘ └────────┘              actuator ports right,
//!  └──────────■─────────────┘             unclassified ports bottom
//! ```
//!
//! Digital twins sit inside their system, centered as a group. A part
//! (original twin) covers its whole system region and puts its ports on the
//! system boundary, aligned with the digital-twin port they are connected to.
//! Anything no rule covers goes onto a fallback grid, so every node gets a
//! position. The layout is a pure function of the graph and configuration.
//!
//! # Submodules
//!
//! - [`ports`] - Port role classification
//! - [`positioned`] - Layout output types

mod ports;
mod positioned;

pub use ports::{PortClassifier, PortRole};
pub use positioned::{EdgeStyle, PositionedEdge, PositionedGraph, PositionedNode};

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, info, trace};

use dartwin_core::{
    geometry::{Bounds, Point, Size},
    graph::{EdgeKind, Graph, Node, NodeKind},
    identifier::NodeId,
};

use crate::config::{LayoutConfig, PortConfig};

/// The box assigned to one node, in canvas coordinates.
#[derive(Debug, Clone, Copy)]
struct Placement {
    origin: Point,
    size: Size,
    role: Option<PortRole>,
}

impl Placement {
    fn new(origin: Point, size: Size) -> Self {
        Self {
            origin,
            size,
            role: None,
        }
    }

    fn with_role(mut self, role: PortRole) -> Self {
        self.role = Some(role);
        self
    }

    fn bounds(&self) -> Bounds {
        Bounds::new_from_top_left(self.origin, self.size)
    }

    fn center(&self) -> Point {
        Point::new(
            self.origin.x() + self.size.width() / 2.0,
            self.origin.y() + self.size.height() / 2.0,
        )
    }
}

/// The side of a box a port is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Bottom,
}

impl From<PortRole> for Side {
    fn from(role: PortRole) -> Self {
        match role {
            PortRole::Sensor => Side::Left,
            PortRole::Actuator => Side::Right,
            PortRole::Unclassified => Side::Bottom,
        }
    }
}

/// Lays out graphs using one [`LayoutConfig`] and [`PortConfig`].
///
/// # Examples
///
/// ```
/// use dartwin::{config::AppConfig, layout::Engine, structure};
///
/// let model = dartwin_parser::parse("#root R { #goal G; }");
/// let graph = structure::build(&model).graph;
///
/// let config = AppConfig::default();
/// let engine = Engine::new(config.layout(), config.ports());
/// let positioned = engine.layout(&graph);
/// assert_eq!(positioned.nodes().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    config: LayoutConfig,
    classifier: PortClassifier,
}

impl Engine {
    pub fn new(layout: &LayoutConfig, ports: &PortConfig) -> Self {
        Self {
            config: layout.clone(),
            classifier: PortClassifier::new(ports),
        }
    }

    /// Lays out `graph`. Never fails; the output lists the graph's nodes and
    /// edges in the same order.
    pub fn layout(&self, graph: &Graph) -> PositionedGraph {
        info!(nodes = graph.nodes().len(), edges = graph.edges().len(); "Laying out graph");

        let mut pass = LayoutPass::new(self, graph);
        pass.place_goals();
        pass.place_systems();
        pass.place_twin_ports();
        pass.place_boundary_ports();
        pass.place_fallback();
        pass.place_roots();
        let positioned = pass.finish();

        debug!(nodes = positioned.nodes().len(); "Layout calculated");
        trace!(positioned:?; "Positioned graph");
        positioned
    }
}

/// State of a single layout run.
struct LayoutPass<'a> {
    config: &'a LayoutConfig,
    classifier: &'a PortClassifier,
    graph: &'a Graph,
    placements: IndexMap<&'a NodeId, Placement>,
}

impl<'a> LayoutPass<'a> {
    fn new(engine: &'a Engine, graph: &'a Graph) -> Self {
        Self {
            config: &engine.config,
            classifier: &engine.classifier,
            graph,
            placements: IndexMap::new(),
        }
    }

    fn nodes_of_kind(
        &self,
        is_kind: fn(&NodeKind) -> bool,
    ) -> impl Iterator<Item = &'a Node> + use<'a> {
        let graph: &'a Graph = self.graph;
        graph.nodes().iter().filter(move |node| is_kind(node.kind()))
    }

    /// Children of `parent` that have the given kind, in graph order.
    fn children_of_kind(
        &self,
        parent: &'a NodeId,
        is_kind: fn(&NodeKind) -> bool,
    ) -> Vec<&'a Node> {
        self.graph
            .children(parent)
            .filter(|node| is_kind(node.kind()))
            .collect()
    }

    /// The y coordinate below the goal row, where systems start.
    fn system_row_y(&self) -> f32 {
        let has_goals = self
            .nodes_of_kind(|kind| matches!(kind, NodeKind::Goal { .. }))
            .next()
            .is_some();
        let goal_row = if has_goals {
            self.config.goal_height + self.config.row_gap
        } else {
            0.0
        };
        self.config.padding + goal_row
    }

    /// Goals form one row, sorted by label so the row does not depend on
    /// declaration order.
    fn place_goals(&mut self) {
        let mut goals: Vec<&Node> = self
            .nodes_of_kind(|kind| matches!(kind, NodeKind::Goal { .. }))
            .collect();
        goals.sort_by(|a, b| a.label().cmp(b.label()).then_with(|| a.id().cmp(b.id())));

        for (index, goal) in goals.into_iter().enumerate() {
            let x = self.config.padding + index as f32 * self.config.goal_pitch;
            let origin = Point::new(x, self.config.padding);
            self.placements
                .insert(goal.id(), Placement::new(origin, self.config.goal_size()));
        }
    }

    /// Systems form one row below the goals, in declaration order, each with
    /// its digital twins and parts.
    fn place_systems(&mut self) {
        let y = self.system_row_y();
        let pitch = self.config.system_width + self.config.system_spacing;
        let systems: Vec<&Node> = self
            .nodes_of_kind(|kind| matches!(kind, NodeKind::System))
            .collect();

        for (index, system) in systems.into_iter().enumerate() {
            let origin = Point::new(self.config.padding + index as f32 * pitch, y);
            let region = Placement::new(origin, self.config.system_size());
            self.placements.insert(system.id(), region);
            self.place_twins(system.id(), region);

            for part in self.children_of_kind(system.id(), |kind| {
                matches!(kind, NodeKind::OriginalTwin)
            }) {
                self.placements.insert(part.id(), region);
            }
        }
    }

    /// Digital twins are centered as a group inside the system region,
    /// shrunk if they would not fit between the margins.
    fn place_twins(&mut self, system: &'a NodeId, region: Placement) {
        let twins = self.children_of_kind(system, |kind| matches!(kind, NodeKind::DigitalTwin));
        if twins.is_empty() {
            return;
        }

        let count = twins.len() as f32;
        let spacing = self.config.twin_spacing;
        let twin_size = self.config.twin_size();
        let available = (region.size.width() - 2.0 * self.config.twin_margin).max(0.0);
        let natural = count * twin_size.width() + (count - 1.0) * spacing;
        let width = if natural > available {
            ((available - (count - 1.0) * spacing) / count).max(self.config.port_size)
        } else {
            twin_size.width()
        };
        let height = twin_size.height().min(region.size.height());
        let total = count * width + (count - 1.0) * spacing;

        let start_x = region.origin.x() + (region.size.width() - total) / 2.0;
        let y = region.origin.y() + (region.size.height() - height) / 2.0;
        debug!(system:%, twins = twins.len(), width; "Placing digital twins");

        for (index, twin) in twins.into_iter().enumerate() {
            let origin = Point::new(start_x + index as f32 * (width + spacing), y);
            self.placements
                .insert(twin.id(), Placement::new(origin, Size::new(width, height)));
        }
    }

    /// Groups the port children of `owner` by role, each group sorted.
    fn ports_by_role(&self, owner: &'a NodeId) -> Vec<(PortRole, Vec<&'a Node>)> {
        let ports = self.children_of_kind(owner, |kind| matches!(kind, NodeKind::Port));
        PortRole::ALL
            .into_iter()
            .map(|role| {
                let mut group: Vec<&Node> = ports
                    .iter()
                    .copied()
                    .filter(|port| self.classifier.classify(port.label()) == role)
                    .collect();
                group.sort_by(|a, b| {
                    self.classifier.compare(
                        role,
                        (a.label(), a.id().as_str()),
                        (b.label(), b.id().as_str()),
                    )
                });
                (role, group)
            })
            .collect()
    }

    /// Top-left corner of slot `index` of `count` evenly spaced port slots
    /// along `side` of `owner`. Ports straddle the owner's edge.
    fn port_slot(&self, owner: &Placement, side: Side, index: usize, count: usize) -> Point {
        let half = self.config.port_size / 2.0;
        let fraction = (index + 1) as f32 / (count + 1) as f32;
        let bounds = owner.bounds();
        match side {
            Side::Left => Point::new(
                bounds.min_x() - half,
                bounds.min_y() + bounds.height() * fraction - half,
            ),
            Side::Right => Point::new(
                bounds.max_x() - half,
                bounds.min_y() + bounds.height() * fraction - half,
            ),
            Side::Bottom => Point::new(
                bounds.min_x() + bounds.width() * fraction - half,
                bounds.max_y() - half,
            ),
        }
    }

    fn place_twin_ports(&mut self) {
        let twins: Vec<&Node> = self
            .nodes_of_kind(|kind| matches!(kind, NodeKind::DigitalTwin))
            .collect();

        for twin in twins {
            let Some(owner) = self.placements.get(twin.id()).copied() else {
                continue;
            };
            for (role, group) in self.ports_by_role(twin.id()) {
                let count = group.len();
                for (index, port) in group.into_iter().enumerate() {
                    let origin = self.port_slot(&owner, Side::from(role), index, count);
                    let placement =
                        Placement::new(origin, self.config.port_size()).with_role(role);
                    self.placements.insert(port.id(), placement);
                }
            }
        }
    }

    /// For every port, the first digital-twin port it is connected to.
    fn twin_port_partners(&self) -> HashMap<&'a NodeId, &'a NodeId> {
        let is_twin_port = |id: &NodeId| {
            self.graph
                .node(id)
                .and_then(Node::parent_id)
                .and_then(|parent| self.graph.node(parent))
                .is_some_and(|parent| matches!(parent.kind(), NodeKind::DigitalTwin))
        };

        let mut partners = HashMap::new();
        for edge in self.graph.edges() {
            if edge.kind() != EdgeKind::Connection {
                continue;
            }
            if is_twin_port(edge.target()) {
                partners.entry(edge.source()).or_insert(edge.target());
            }
            if is_twin_port(edge.source()) {
                partners.entry(edge.target()).or_insert(edge.source());
            }
        }
        partners
    }

    /// Part ports sit on the system boundary. A port connected to a placed
    /// digital-twin port lines up with it; the others take evenly spaced
    /// slots.
    fn place_boundary_ports(&mut self) {
        let partners = self.twin_port_partners();
        let parts: Vec<&Node> = self
            .nodes_of_kind(|kind| matches!(kind, NodeKind::OriginalTwin))
            .collect();
        let half = self.config.port_size / 2.0;

        for part in parts {
            let Some(owner) = self.placements.get(part.id()).copied() else {
                continue;
            };
            for (role, group) in self.ports_by_role(part.id()) {
                let side = Side::from(role);
                let count = group.len();
                for (index, port) in group.into_iter().enumerate() {
                    let slot = self.port_slot(&owner, side, index, count);
                    let aligned = partners
                        .get(port.id())
                        .and_then(|partner| self.placements.get(*partner))
                        .map(|partner| {
                            let center = partner.center();
                            match side {
                                Side::Left | Side::Right => slot.with_y(center.y() - half),
                                Side::Bottom => slot.with_x(center.x() - half),
                            }
                        });
                    let placement =
                        Placement::new(aligned.unwrap_or(slot), self.config.port_size())
                            .with_role(role);
                    self.placements.insert(port.id(), placement);
                }
            }
        }
    }

    /// The lowest edge of everything placed so far.
    fn content_bottom(&self) -> f32 {
        self.placements
            .values()
            .map(|placement| placement.bounds().max_y())
            .fold(self.config.padding, f32::max)
    }

    /// Puts every remaining non-root node on a grid: inside its parent if
    /// the parent is placed, else in a row below the drawing.
    fn place_fallback(&mut self) {
        let free_origin = Point::new(
            self.config.padding,
            self.content_bottom() + self.config.row_gap,
        );
        let columns = self.config.fallback_columns.max(1);
        let mut sibling_counts: HashMap<Option<&NodeId>, usize> = HashMap::new();

        for node in self.graph.nodes() {
            if matches!(node.kind(), NodeKind::Root) || self.placements.contains_key(node.id()) {
                continue;
            }

            let parent = node.parent_id();
            let base = parent
                .and_then(|parent| self.placements.get(parent))
                .map_or(free_origin, |placement| placement.origin);
            let index = sibling_counts.entry(parent).or_insert(0);
            let column = (*index % columns) as f32;
            let row = (*index / columns) as f32;
            *index += 1;

            let origin = base.add_point(Point::new(
                column * self.config.fallback_cell_width,
                row * self.config.fallback_cell_height,
            ));
            let mut placement = Placement::new(origin, self.config.fallback_node_size());
            if matches!(node.kind(), NodeKind::Port) {
                placement = placement.with_role(self.classifier.classify(node.label()));
            }
            debug!(node:% = node.id(), column, row; "Fallback placement");
            self.placements.insert(node.id(), placement);
        }
    }

    /// Root nodes span everything else plus padding.
    fn place_roots(&mut self) {
        let content = self
            .placements
            .values()
            .map(Placement::bounds)
            .reduce(|a, b| a.merge(&b));
        let frame = match content {
            Some(bounds) => bounds.expand(self.config.padding),
            None => Bounds::new_from_top_left(
                Point::default(),
                Size::square(2.0 * self.config.padding),
            ),
        };

        for root in self.nodes_of_kind(|kind| matches!(kind, NodeKind::Root)) {
            self.placements
                .insert(root.id(), Placement::new(frame.min_point(), frame.to_size()));
        }
    }

    /// Converts to output, expressing positions relative to placed parents.
    fn finish(self) -> PositionedGraph {
        let nodes = self
            .graph
            .nodes()
            .iter()
            .map(|node| {
                let placement = self
                    .placements
                    .get(node.id())
                    .copied()
                    .unwrap_or_else(|| Placement::new(Point::default(), Size::default()));
                let position = node
                    .parent_id()
                    .and_then(|parent| self.placements.get(parent))
                    .map_or(placement.origin, |parent| {
                        placement.origin.sub_point(parent.origin)
                    });
                PositionedNode::new(
                    node.clone(),
                    position,
                    placement.origin,
                    placement.size,
                    placement.role,
                )
            })
            .collect();

        let edges = self
            .graph
            .edges()
            .iter()
            .cloned()
            .map(PositionedEdge::new)
            .collect();

        PositionedGraph::new(nodes, edges)
    }
}


#[cfg(test)]
mod proptest_tests {
    use dartwin_core::graph::Edge;
    use proptest::prelude::*;

    use super::*;

    /// A random forest of systems, twins, parts and ports with random
    /// connections between ports.
    fn graph_strategy() -> impl Strategy<Value = Graph> {
        (
            prop::collection::vec((0usize..3, 0usize..2, prop::collection::vec("[a-z_]{1,12}", 0..5)), 0..4),
            prop::collection::vec((any::<prop::sample::Index>(), any::<prop::sample::Index>()), 0..6),
        )
            .prop_map(|(systems, connections)| {
                let mut nodes = vec![Node::new(NodeId::from_raw("root::R"), NodeKind::Root, "R")];
                let mut ports = Vec::new();
                for (s, (twins, parts, port_names)) in systems.into_iter().enumerate() {
                    let system_id = NodeId::from_raw(format!("system::S{s}"));
                    nodes.push(
                        Node::new(system_id.clone(), NodeKind::System, format!("S{s}"))
                            .with_parent(NodeId::from_raw("root::R")),
                    );
                    let owners = (0..twins)
                        .map(|t| (format!("dt::S{s}::T{t}"), NodeKind::DigitalTwin))
                        .chain((0..parts).map(|p| (format!("ot::S{s}::P{p}"), NodeKind::OriginalTwin)));
                    for (owner, kind) in owners {
                        let owner_id = NodeId::from_raw(owner.clone());
                        nodes.push(Node::new(owner_id.clone(), kind, owner.clone()).with_parent(system_id.clone()));
                        for (p, name) in port_names.iter().enumerate() {
                            let port_id = NodeId::from_raw(format!("port::{owner}::{p}"));
                            ports.push(port_id.clone());
                            nodes.push(Node::new(port_id, NodeKind::Port, name.clone()).with_parent(owner_id.clone()));
                        }
                    }
                }
                let edges = if ports.is_empty() {
                    Vec::new()
                } else {
                    connections
                        .into_iter()
                        .enumerate()
                        .map(|(i, (a, b))| {
                            Edge::new(
                                format!("conn::{i}"),
                                EdgeKind::Connection,
                                a.get(&ports).clone(),
                                b.get(&ports).clone(),
                            )
                        })
                        .collect()
                };
                Graph::new(nodes, edges)
            })
    }

    /// Two runs over the same graph agree on every coordinate.
    fn check_layout_is_deterministic(graph: &Graph) -> Result<(), TestCaseError> {
        let engine = Engine::new(&LayoutConfig::default(), &PortConfig::default());
        let first = engine.layout(graph);
        let second = engine.layout(graph);
        prop_assert_eq!(first, second);
        Ok(())
    }

    /// Every coordinate is finite and every node appears exactly once.
    fn check_layout_is_total(graph: &Graph) -> Result<(), TestCaseError> {
        let engine = Engine::new(&LayoutConfig::default(), &PortConfig::default());
        let positioned = engine.layout(graph);
        prop_assert_eq!(positioned.nodes().len(), graph.nodes().len());
        for node in positioned.nodes() {
            prop_assert!(node.absolute().x().is_finite());
            prop_assert!(node.absolute().y().is_finite());
            prop_assert!(node.position().x().is_finite());
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn layout_is_deterministic(graph in graph_strategy()) {
            check_layout_is_deterministic(&graph)?;
        }

        #[test]
        fn layout_is_total(graph in graph_strategy()) {
            check_layout_is_total(&graph)?;
        }
    }
}
