//! Graph building: turns a parsed model into typed nodes and edges.
//!
//! Building runs in two passes. The first walks the model in declaration
//! order, creates one node per declared entity and registers every entity in
//! a [`SymbolTable`]. The second resolves the textual references of
//! connections and allocations against that table and creates edges.
//!
//! References that resolve to nothing are expected while a document is being
//! typed; such edges are dropped and reported as [`BuildDiagnostic`]s rather
//! than failing the build.

mod symbols;

use std::collections::{HashMap, HashSet};

use log::{debug, info, trace, warn};
use thiserror::Error;

use dartwin_core::{
    graph::{ALLOCATION_LABEL, Edge, EdgeKind, Graph, Node, NodeKind},
    identifier::NodeId,
    model::{Allocation, DarTwinModel, Goal, Stage, TwinSystem},
};

use symbols::SymbolTable;

const ROOT_TAG: &str = "root";
const SYSTEM_TAG: &str = "system";
const DIGITAL_TWIN_TAG: &str = "dt";
const ORIGINAL_TWIN_TAG: &str = "ot";
const PORT_TAG: &str = "port";
const GOAL_TAG: &str = "goal";

/// Something the builder had to drop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildDiagnostic {
    #[error("connection endpoint `{reference}` in system `{system}` does not name a port")]
    UnresolvedPort { system: String, reference: String },

    #[error("allocation of goal `{goal}` targets `{target}`, which is not a digital twin")]
    UnresolvedAllocationTarget { goal: String, target: String },

    #[error("allocation refers to undeclared goal `{goal}`")]
    UnknownGoal { goal: String },

    #[error("`{id}` is declared more than once; the first declaration is kept")]
    DuplicateDeclaration { id: NodeId },
}

/// A built graph together with everything that was dropped while building it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutcome {
    pub graph: Graph,
    pub diagnostics: Vec<BuildDiagnostic>,
}

/// Builds the graph of a model's top-level declarations.
///
/// The transformation section, if any, is not part of this graph; see
/// [`build_stage`].
pub fn build(model: &DarTwinModel) -> BuildOutcome {
    info!(model = model.name.as_str(); "Building graph");
    let outcome = GraphBuilder::new(&model.name).build(
        &model.systems,
        &model.goals,
        &model.allocations,
    );
    log_outcome(&outcome);
    outcome
}

/// Builds the graph of one stage of the model's transformation section.
///
/// A model without a transformation section, or without the requested
/// stage, yields a graph holding only the root node.
pub fn build_stage(model: &DarTwinModel, stage: Stage) -> BuildOutcome {
    info!(model = model.name.as_str(), stage:%; "Building stage graph");
    let builder = GraphBuilder::new(&model.name);
    let outcome = match model.stage(stage) {
        Some(slice) => builder.build(slice.systems(), slice.goals(), slice.allocations()),
        None => {
            debug!(stage:%; "Stage not declared");
            builder.build(&[], &[], &[])
        }
    };
    log_outcome(&outcome);
    outcome
}

fn log_outcome(outcome: &BuildOutcome) {
    debug!(
        nodes = outcome.graph.nodes().len(),
        edges = outcome.graph.edges().len(),
        diagnostics = outcome.diagnostics.len();
        "Graph built"
    );
    trace!(graph:? = outcome.graph; "Built graph");
}

struct GraphBuilder {
    root_id: NodeId,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_ids: HashSet<NodeId>,
    edge_occurrences: HashMap<String, usize>,
    symbols: SymbolTable,
    diagnostics: Vec<BuildDiagnostic>,
}

impl GraphBuilder {
    fn new(root_name: &str) -> Self {
        let root_id = NodeId::from_path(ROOT_TAG, [root_name]);
        let mut builder = Self {
            root_id: root_id.clone(),
            nodes: Vec::new(),
            edges: Vec::new(),
            node_ids: HashSet::new(),
            edge_occurrences: HashMap::new(),
            symbols: SymbolTable::new(),
            diagnostics: Vec::new(),
        };
        builder.add_node(Node::new(root_id, NodeKind::Root, root_name));
        builder
    }

    fn build(
        mut self,
        systems: &[TwinSystem],
        goals: &[Goal],
        allocations: &[Allocation],
    ) -> BuildOutcome {
        for system in systems {
            self.add_system(system);
        }
        for goal in goals {
            self.add_goal(goal);
        }

        for system in systems {
            self.connect_system(system);
        }
        for allocation in allocations {
            self.allocate(allocation);
        }

        BuildOutcome {
            graph: Graph::new(self.nodes, self.edges),
            diagnostics: self.diagnostics,
        }
    }

    fn report(&mut self, diagnostic: BuildDiagnostic) {
        warn!(diagnostic:%; "Dropped while building graph");
        self.diagnostics.push(diagnostic);
    }

    /// Adds `node` unless its id is taken. Returns `false` for a duplicate.
    fn add_node(&mut self, node: Node) -> bool {
        if !self.node_ids.insert(node.id().clone()) {
            let id = node.id().clone();
            self.report(BuildDiagnostic::DuplicateDeclaration { id });
            return false;
        }
        self.nodes.push(node);
        true
    }

    fn add_system(&mut self, system: &TwinSystem) {
        let system_id = NodeId::from_path(SYSTEM_TAG, [&system.name]);
        self.add_node(
            Node::new(system_id.clone(), NodeKind::System, &system.name)
                .with_parent(self.root_id.clone()),
        );

        for twin in &system.digital_twins {
            let twin_id = system_id.create_nested_with_tag(DIGITAL_TWIN_TAG, &twin.name);
            if self.add_node(
                Node::new(twin_id.clone(), NodeKind::DigitalTwin, &twin.name)
                    .with_parent(system_id.clone()),
            ) {
                self.symbols.add_twin(&system.name, &twin.name, &twin_id);
            }
            self.add_ports(&system.name, &twin.name, &twin_id, &twin.ports);
        }

        for twin in &system.original_twins {
            let twin_id = system_id.create_nested_with_tag(ORIGINAL_TWIN_TAG, &twin.name);
            self.add_node(
                Node::new(twin_id.clone(), NodeKind::OriginalTwin, &twin.name)
                    .with_parent(system_id.clone()),
            );
            self.add_ports(&system.name, &twin.name, &twin_id, &twin.ports);
        }
    }

    fn add_ports(&mut self, system: &str, twin: &str, twin_id: &NodeId, ports: &[String]) {
        for port in ports {
            // The owner's tag is part of the path, so a twin port and a part
            // port with the same names stay distinct.
            let port_id = NodeId::from_path(PORT_TAG, [twin_id.as_str(), port.as_str()]);
            if self.add_node(
                Node::new(port_id.clone(), NodeKind::Port, port).with_parent(twin_id.clone()),
            ) {
                self.symbols.add_port(system, twin, port, &port_id);
            }
        }
    }

    fn add_goal(&mut self, goal: &Goal) {
        let goal_id = NodeId::from_path(GOAL_TAG, [&goal.name]);
        let kind = NodeKind::Goal {
            doc: goal.doc.clone(),
        };
        if self.add_node(Node::new(goal_id.clone(), kind, &goal.name).with_parent(self.root_id.clone())) {
            self.symbols.add_goal(&goal.name, &goal_id);
        }
    }

    fn connect_system(&mut self, system: &TwinSystem) {
        for connection in &system.connections {
            let source = self.symbols.resolve_port(&system.name, &connection.from).cloned();
            let target = self.symbols.resolve_port(&system.name, &connection.to).cloned();

            let (source, target) = match (source, target) {
                (Some(source), Some(target)) => (source, target),
                (source, _) => {
                    let reference = if source.is_none() {
                        &connection.from
                    } else {
                        &connection.to
                    };
                    self.report(BuildDiagnostic::UnresolvedPort {
                        system: system.name.clone(),
                        reference: reference.clone(),
                    });
                    continue;
                }
            };

            let id = self.edge_id("conn", &source, &target);
            let mut edge = Edge::new(id, EdgeKind::Connection, source, target);
            if let Some(name) = &connection.name {
                edge = edge.with_label(name);
            }
            self.edges.push(edge);
        }
    }

    fn allocate(&mut self, allocation: &Allocation) {
        let Some(goal_id) = self.symbols.resolve_goal(&allocation.goal).cloned() else {
            self.report(BuildDiagnostic::UnknownGoal {
                goal: allocation.goal.clone(),
            });
            return;
        };
        let Some(twin_id) = self.symbols.resolve_twin(&allocation.target).cloned() else {
            self.report(BuildDiagnostic::UnresolvedAllocationTarget {
                goal: allocation.goal.clone(),
                target: allocation.target.clone(),
            });
            return;
        };

        let id = self.edge_id("alloc", &goal_id, &twin_id);
        self.edges.push(
            Edge::new(id, EdgeKind::Allocation, goal_id, twin_id).with_label(ALLOCATION_LABEL),
        );
    }

    /// Derives an edge id from its endpoints. The n-th repetition of the
    /// same edge gets a `#n` suffix.
    fn edge_id(&mut self, prefix: &str, source: &NodeId, target: &NodeId) -> String {
        let base = format!("{prefix}::{source}->{target}");
        let occurrence = self.edge_occurrences.entry(base.clone()).or_insert(0);
        *occurrence += 1;
        match *occurrence {
            1 => base,
            n => format!("{base}#{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use dartwin_core::model::{
        Connection, DarTrans, DarTransSlice, DigitalTwin, OriginalTwin,
    };

    use super::*;

    fn plant() -> TwinSystem {
        TwinSystem {
            name: "Plant".to_string(),
            digital_twins: vec![DigitalTwin {
                name: "Monitor".to_string(),
                ports: vec!["temp".to_string(), "valve".to_string()],
            }],
            original_twins: vec![OriginalTwin {
                name: "Motor".to_string(),
                ports: vec!["temp".to_string(), "valve".to_string()],
            }],
            connections: vec![Connection {
                from: "Motor.temp".to_string(),
                to: "Monitor.temp".to_string(),
                name: Some("t".to_string()),
            }],
        }
    }

    fn model() -> DarTwinModel {
        let mut model = DarTwinModel::new("Factory");
        model.systems.push(plant());
        model.goals.push(Goal {
            name: "Safety".to_string(),
            doc: Some("Stay safe.".to_string()),
        });
        model.allocations.push(Allocation {
            goal: "Safety".to_string(),
            target: "Plant.Monitor".to_string(),
        });
        model
    }

    fn ids(graph: &Graph) -> Vec<&str> {
        graph.nodes().iter().map(|node| node.id().as_str()).collect()
    }

    #[test]
    fn test_node_ids_and_order() {
        let outcome = build(&model());
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(
            ids(&outcome.graph),
            [
                "root::Factory",
                "system::Plant",
                "dt::Plant::Monitor",
                "port::dt::Plant::Monitor::temp",
                "port::dt::Plant::Monitor::valve",
                "ot::Plant::Motor",
                "port::ot::Plant::Motor::temp",
                "port::ot::Plant::Motor::valve",
                "goal::Safety",
            ]
        );
    }

    #[test]
    fn test_parents_form_a_tree() {
        let graph = build(&model()).graph;
        let parent = |id: &str| {
            graph
                .nodes()
                .iter()
                .find(|node| node.id() == id)
                .and_then(|node| node.parent_id())
                .map(NodeId::as_str)
        };

        assert_eq!(parent("root::Factory"), None);
        assert_eq!(parent("system::Plant"), Some("root::Factory"));
        assert_eq!(parent("goal::Safety"), Some("root::Factory"));
        assert_eq!(parent("dt::Plant::Monitor"), Some("system::Plant"));
        assert_eq!(
            parent("port::ot::Plant::Motor::valve"),
            Some("ot::Plant::Motor")
        );
    }

    #[test]
    fn test_edges() {
        let graph = build(&model()).graph;
        let edges = graph.edges();
        assert_eq!(edges.len(), 2);

        assert_eq!(edges[0].kind(), EdgeKind::Connection);
        assert_eq!(
            edges[0].id(),
            "conn::port::ot::Plant::Motor::temp->port::dt::Plant::Monitor::temp"
        );
        assert_eq!(edges[0].label(), Some("t"));

        assert_eq!(edges[1].kind(), EdgeKind::Allocation);
        assert_eq!(edges[1].source(), "goal::Safety");
        assert_eq!(edges[1].target(), "dt::Plant::Monitor");
        assert_eq!(edges[1].label(), Some(ALLOCATION_LABEL));
    }

    #[test]
    fn test_goal_doc_is_carried() {
        let graph = build(&model()).graph;
        let goal = graph.node(&NodeId::from_raw("goal::Safety")).unwrap();
        assert_eq!(goal.doc(), Some("Stay safe."));
    }

    #[test]
    fn test_unresolved_references_are_dropped() {
        let mut model = model();
        model.systems[0].connections.push(Connection {
            from: "Monitor.temp".to_string(),
            to: "Ghost.port".to_string(),
            name: None,
        });
        model.allocations.push(Allocation {
            goal: "Safety".to_string(),
            target: "Nowhere".to_string(),
        });
        model.allocations.push(Allocation {
            goal: "Unknown".to_string(),
            target: "Monitor".to_string(),
        });

        let outcome = build(&model);
        assert_eq!(outcome.graph.edges().len(), 2);
        assert!(outcome.graph.find_dangling_edge().is_none());
        assert_eq!(
            outcome.diagnostics,
            [
                BuildDiagnostic::UnresolvedPort {
                    system: "Plant".to_string(),
                    reference: "Ghost.port".to_string(),
                },
                BuildDiagnostic::UnresolvedAllocationTarget {
                    goal: "Safety".to_string(),
                    target: "Nowhere".to_string(),
                },
                BuildDiagnostic::UnknownGoal {
                    goal: "Unknown".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_declarations_keep_first() {
        let mut model = model();
        model.systems[0].digital_twins[0].ports.push("temp".to_string());
        model.goals.push(Goal {
            name: "Safety".to_string(),
            doc: None,
        });

        let outcome = build(&model);
        assert_eq!(outcome.graph.nodes().len(), 9);
        assert_eq!(
            outcome.graph.node(&NodeId::from_raw("goal::Safety")).unwrap().doc(),
            Some("Stay safe.")
        );
        assert_eq!(
            outcome.diagnostics,
            [
                BuildDiagnostic::DuplicateDeclaration {
                    id: NodeId::from_raw("port::dt::Plant::Monitor::temp"),
                },
                BuildDiagnostic::DuplicateDeclaration {
                    id: NodeId::from_raw("goal::Safety"),
                },
            ]
        );
    }

    #[test]
    fn test_repeated_edges_get_suffix() {
        let mut model = model();
        let connection = model.systems[0].connections[0].clone();
        model.systems[0].connections.push(connection.clone());
        model.systems[0].connections.push(connection);

        let graph = build(&model).graph;
        let ids: Vec<_> = graph.edges().iter().map(Edge::id).collect();
        let base = "conn::port::ot::Plant::Motor::temp->port::dt::Plant::Monitor::temp";
        assert_eq!(ids[0], base);
        assert_eq!(ids[1], format!("{base}#2"));
        assert_eq!(ids[2], format!("{base}#3"));
    }

    #[test]
    fn test_whitespace_in_names_is_normalized() {
        let mut model = DarTwinModel::new("My  Plant");
        model.goals.push(Goal {
            name: "keep cool".to_string(),
            doc: None,
        });

        let graph = build(&model).graph;
        assert_eq!(ids(&graph), ["root::My_Plant", "goal::keep_cool"]);
        assert_eq!(graph.nodes()[1].label(), "keep cool");
    }

    #[test]
    fn test_separator_in_names_keeps_twins_apart() {
        let mut model = DarTwinModel::new("R");
        for (system, twin) in [("A", "B::X"), ("A::B", "X")] {
            let mut twin_system = TwinSystem::new(system);
            twin_system.digital_twins.push(DigitalTwin {
                name: twin.to_string(),
                ports: Vec::new(),
            });
            model.systems.push(twin_system);
        }

        let outcome = build(&model);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(
            ids(&outcome.graph),
            [
                "root::R",
                "system::A",
                "dt::A::B%3A%3AX",
                "system::A%3A%3AB",
                "dt::A%3A%3AB::X",
            ]
        );
    }

    #[test]
    fn test_build_stage() {
        let mut model = model();
        model.trans = Some(DarTrans {
            before: None,
            core: None,
            after: Some(DarTransSlice {
                systems: Some(vec![plant()]),
                goals: None,
                allocations: None,
            }),
        });

        let after = build_stage(&model, Stage::After);
        assert_eq!(after.graph.nodes().len(), 8);
        assert_eq!(after.graph.edges().len(), 1);

        let before = build_stage(&model, Stage::Before);
        assert_eq!(ids(&before.graph), ["root::Factory"]);
    }

    #[test]
    fn test_build_stage_without_transform() {
        let outcome = build_stage(&model(), Stage::Core);
        assert_eq!(outcome.graph.nodes().len(), 1);
        assert!(outcome.graph.edges().is_empty());
    }
}
