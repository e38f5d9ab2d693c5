//! Symbol table mapping every textual form of a reference to a node id.
//!
//! The table is filled once while nodes are created and then only queried.
//! Ports are registered under `System.Twin.port` and under `Twin.port`;
//! digital twins under `System.Twin` and under `Twin`; goals under their name.
//! Short aliases may be ambiguous across systems, in which case the first
//! declaration keeps the alias.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, trace};

use dartwin_core::identifier::NodeId;

#[derive(Debug, Default)]
pub(super) struct SymbolTable {
    ports: HashMap<String, NodeId>,
    short_ports: IndexMap<String, NodeId>,
    twins: HashMap<String, NodeId>,
    short_twins: IndexMap<String, NodeId>,
    goals: HashMap<String, NodeId>,
}

/// Inserts `id` under `alias` unless the alias is taken.
fn register_alias(table: &mut IndexMap<String, NodeId>, alias: String, id: &NodeId) {
    match table.get(&alias) {
        Some(existing) => {
            debug!(alias, kept:% = existing, ignored:% = id; "Ambiguous short alias");
        }
        None => {
            table.insert(alias, id.clone());
        }
    }
}

impl SymbolTable {
    pub(super) fn new() -> Self {
        Self::default()
    }

    /// Registers a port of a digital twin or part.
    pub(super) fn add_port(&mut self, system: &str, twin: &str, port: &str, id: &NodeId) {
        self.ports
            .entry(format!("{system}.{twin}.{port}"))
            .or_insert_with(|| id.clone());
        register_alias(&mut self.short_ports, format!("{twin}.{port}"), id);
    }

    /// Registers a digital twin as an allocation target.
    pub(super) fn add_twin(&mut self, system: &str, twin: &str, id: &NodeId) {
        self.twins
            .entry(format!("{system}.{twin}"))
            .or_insert_with(|| id.clone());
        register_alias(&mut self.short_twins, twin.to_string(), id);
    }

    pub(super) fn add_goal(&mut self, goal: &str, id: &NodeId) {
        self.goals
            .entry(goal.to_string())
            .or_insert_with(|| id.clone());
    }

    /// Resolves a port reference written inside `system`.
    ///
    /// Tried in order: the reference as a fully qualified
    /// `System.Twin.port`; the reference qualified with `system`; the
    /// reference as a `Twin.port` short alias from any system.
    pub(super) fn resolve_port(&self, system: &str, reference: &str) -> Option<&NodeId> {
        let resolved = self
            .ports
            .get(reference)
            .or_else(|| self.ports.get(&format!("{system}.{reference}")))
            .or_else(|| self.short_ports.get(reference));
        trace!(system, reference, resolved:?; "Resolving port");
        resolved
    }

    /// Resolves an allocation target: a qualified `System.Twin`, else a
    /// short `Twin` alias.
    pub(super) fn resolve_twin(&self, target: &str) -> Option<&NodeId> {
        self.twins
            .get(target)
            .or_else(|| self.short_twins.get(target))
    }

    pub(super) fn resolve_goal(&self, goal: &str) -> Option<&NodeId> {
        self.goals.get(goal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port_id(path: &str) -> NodeId {
        NodeId::from_raw(format!("port::{path}"))
    }

    #[test]
    fn test_port_alias_forms() {
        let mut table = SymbolTable::new();
        let id = port_id("dt::Plant::Monitor::speed");
        table.add_port("Plant", "Monitor", "speed", &id);

        assert_eq!(table.resolve_port("Plant", "Plant.Monitor.speed"), Some(&id));
        assert_eq!(table.resolve_port("Plant", "Monitor.speed"), Some(&id));
        assert_eq!(table.resolve_port("Other", "Monitor.speed"), Some(&id));
        assert_eq!(table.resolve_port("Plant", "Monitor.torque"), None);
        assert_eq!(table.resolve_port("Plant", "speed"), None);
    }

    #[test]
    fn test_own_system_wins_over_short_alias() {
        let mut table = SymbolTable::new();
        let first = port_id("dt::A::Twin::p");
        let second = port_id("dt::B::Twin::p");
        table.add_port("A", "Twin", "p", &first);
        table.add_port("B", "Twin", "p", &second);

        assert_eq!(table.resolve_port("B", "Twin.p"), Some(&second));
        assert_eq!(table.resolve_port("C", "Twin.p"), Some(&first));
    }

    #[test]
    fn test_first_registration_keeps_qualified_alias() {
        let mut table = SymbolTable::new();
        let twin_port = port_id("dt::S::X::p");
        let part_port = port_id("ot::S::X::p");
        table.add_port("S", "X", "p", &twin_port);
        table.add_port("S", "X", "p", &part_port);

        assert_eq!(table.resolve_port("S", "S.X.p"), Some(&twin_port));
    }

    #[test]
    fn test_twin_resolution() {
        let mut table = SymbolTable::new();
        let id = NodeId::from_raw("dt::Plant::Monitor");
        table.add_twin("Plant", "Monitor", &id);

        assert_eq!(table.resolve_twin("Plant.Monitor"), Some(&id));
        assert_eq!(table.resolve_twin("Monitor"), Some(&id));
        assert_eq!(table.resolve_twin("Ghost.Monitor"), None);
    }

    #[test]
    fn test_goal_resolution() {
        let mut table = SymbolTable::new();
        let id = NodeId::from_raw("goal::Safety");
        table.add_goal("Safety", &id);

        assert_eq!(table.resolve_goal("Safety"), Some(&id));
        assert_eq!(table.resolve_goal("safety"), None);
    }
}
