//! Node graph builder using petgraph.
//!
//! This module builds the directed acyclic graph (DAG) of project nodes from
//! their declared parents and answers lookups against it.

use crate::{Error, Node, NodeSet, Result};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::IntoNodeReferences;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// The validated graph of project nodes.
///
/// Edges point from parent to child. Once built through
/// [`NodeGraph::from_nodes`] the graph is acyclic, every parent reference
/// resolves, and nothing mutates it for the rest of the run.
#[derive(Debug, Clone)]
pub struct NodeGraph {
    /// The directed graph of nodes.
    graph: DiGraph<Node, ()>,
    /// Map from unique ids to node indices.
    id_to_index: HashMap<String, NodeIndex>,
    /// Map from display names to node indices (names are not unique across kinds).
    name_to_indices: HashMap<String, Vec<NodeIndex>>,
}

impl NodeGraph {
    /// Build a graph from compiled nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if two nodes share a unique id, if a node depends on
    /// a node that is not present, or if the dependencies form a cycle.
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Result<Self> {
        let mut graph = Self {
            graph: DiGraph::new(),
            id_to_index: HashMap::new(),
            name_to_indices: HashMap::new(),
        };

        for node in nodes {
            graph.add_node(node)?;
        }
        graph.add_dependency_edges()?;

        let validation = graph.validate();
        if let Some(err) = validation.errors.into_iter().next() {
            return Err(err);
        }

        debug!(
            nodes = graph.graph.node_count(),
            edges = graph.graph.edge_count(),
            "Built node graph"
        );
        Ok(graph)
    }

    fn add_node(&mut self, node: Node) -> Result<NodeIndex> {
        if self.id_to_index.contains_key(&node.unique_id) {
            return Err(Error::DuplicateNode {
                id: node.unique_id,
            });
        }

        let id = node.unique_id.clone();
        let name = node.name.clone();
        let index = self.graph.add_node(node);
        self.id_to_index.insert(id, index);
        self.name_to_indices.entry(name).or_default().push(index);
        Ok(index)
    }

    /// Wire parent -> child edges once every node is present.
    fn add_dependency_edges(&mut self) -> Result<()> {
        let mut missing = Vec::new();
        let mut edges_to_add = Vec::new();

        for (index, node) in self.graph.node_references() {
            for parent in &node.depends_on {
                if let Some(&parent_index) = self.id_to_index.get(parent) {
                    edges_to_add.push((parent_index, index));
                } else {
                    missing.push((node.unique_id.clone(), parent.clone()));
                }
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingDependencies { missing });
        }

        for (from, to) in edges_to_add {
            self.graph.update_edge(from, to, ());
        }

        Ok(())
    }

    /// Get a node by index.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(index)
    }

    /// Get a node by unique id.
    #[must_use]
    pub fn get(&self, unique_id: &str) -> Option<&Node> {
        self.index_of(unique_id).and_then(|idx| self.node(idx))
    }

    /// Get the index of a node by unique id.
    #[must_use]
    pub fn index_of(&self, unique_id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(unique_id).copied()
    }

    /// All nodes carrying the given display name.
    #[must_use]
    pub fn indices_named(&self, name: &str) -> &[NodeIndex] {
        self.name_to_indices.get(name).map_or(&[], Vec::as_slice)
    }

    /// The unique id of the node at `index`, or `""` for a foreign index.
    #[must_use]
    pub fn unique_id(&self, index: NodeIndex) -> &str {
        self.node(index).map_or("", |n| n.unique_id.as_str())
    }

    /// Check if a node exists in the graph.
    #[must_use]
    pub fn contains(&self, unique_id: &str) -> bool {
        self.id_to_index.contains_key(unique_id)
    }

    /// Get the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterate over all nodes in the graph.
    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph.node_references()
    }

    /// Every node index in the graph.
    #[must_use]
    pub fn all(&self) -> NodeSet {
        self.graph.node_indices().collect()
    }

    /// Translate a node set into unique ids, sorted ascending.
    #[must_use]
    pub fn unique_ids(&self, set: &NodeSet) -> Vec<String> {
        let mut ids: Vec<String> = set
            .iter()
            .filter_map(|&idx| self.node(idx))
            .map(|n| n.unique_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn inner(&self) -> &DiGraph<Node, ()> {
        &self.graph
    }

    /// Order `subset` so every node follows its in-subset parents.
    ///
    /// Ties between simultaneously available nodes are broken by ascending
    /// unique id, so the order is stable across runs.
    #[must_use]
    pub fn topological_order(&self, subset: &NodeSet) -> Vec<NodeIndex> {
        let mut in_degree: HashMap<NodeIndex, usize> = subset
            .iter()
            .map(|&idx| {
                let parents = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .filter(|p| subset.contains(p))
                    .count();
                (idx, parents)
            })
            .collect();

        let mut ready: BTreeSet<(&str, NodeIndex)> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(&idx, _)| (self.unique_id(idx), idx))
            .collect();

        let mut order = Vec::with_capacity(subset.len());
        while let Some((_, idx)) = ready.pop_first() {
            order.push(idx);
            for child in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert((self.unique_id(child), child));
                    }
                }
            }
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;

    fn model(id: &str, parents: &[&str]) -> Node {
        parents
            .iter()
            .fold(Node::new(id, id, NodeKind::Model), |node, p| {
                node.with_parent(*p)
            })
    }

    fn position(order: &[NodeIndex], graph: &NodeGraph, id: &str) -> usize {
        order
            .iter()
            .position(|&idx| graph.unique_id(idx) == id)
            .unwrap()
    }

    #[test]
    fn test_empty_graph() {
        let graph = NodeGraph::from_nodes(Vec::new()).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.node_count(), 0);
        assert!(graph.topological_order(&graph.all()).is_empty());
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let graph = NodeGraph::from_nodes(vec![
            Node::new("model.shop.users", "users", NodeKind::Model),
            Node::new("test.shop.users", "users", NodeKind::Test).with_parent("model.shop.users"),
        ])
        .unwrap();

        assert!(graph.contains("model.shop.users"));
        assert!(!graph.contains("users"));
        assert_eq!(graph.indices_named("users").len(), 2);
        assert!(graph.indices_named("orders").is_empty());

        let idx = graph.index_of("test.shop.users").unwrap();
        assert_eq!(graph.node(idx).unwrap().kind, NodeKind::Test);
        assert_eq!(graph.get("model.shop.users").unwrap().name, "users");
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let err = NodeGraph::from_nodes(vec![model("a", &[]), model("a", &[])]).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode { id } if id == "a"));
    }

    #[test]
    fn test_missing_dependency() {
        let err = NodeGraph::from_nodes(vec![model("dependent", &["missing"])]).unwrap_err();
        match err {
            Error::MissingDependencies { missing } => {
                assert_eq!(missing, vec![("dependent".to_string(), "missing".to_string())]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_detection() {
        // a -> b -> c -> a
        let err = NodeGraph::from_nodes(vec![
            model("a", &["c"]),
            model("b", &["a"]),
            model("c", &["b"]),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::CycleDetected { .. }));
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let graph = NodeGraph::from_nodes(vec![
            model("task3", &["task1", "task2"]),
            model("task2", &["task1"]),
            model("task1", &[]),
        ])
        .unwrap();

        let order = graph.topological_order(&graph.all());
        assert_eq!(order.len(), 3);
        assert!(position(&order, &graph, "task1") < position(&order, &graph, "task2"));
        assert!(position(&order, &graph, "task2") < position(&order, &graph, "task3"));
    }

    #[test]
    fn test_topological_order_breaks_ties_by_id() {
        let graph = NodeGraph::from_nodes(vec![
            model("c", &[]),
            model("a", &[]),
            model("b", &[]),
        ])
        .unwrap();

        let ids: Vec<&str> = graph
            .topological_order(&graph.all())
            .into_iter()
            .map(|idx| graph.unique_id(idx))
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_topological_order_of_subset_ignores_outside_parents() {
        let graph = NodeGraph::from_nodes(vec![
            model("a", &[]),
            model("b", &["a"]),
            model("c", &["b"]),
        ])
        .unwrap();

        let subset: NodeSet = ["b", "c"]
            .iter()
            .map(|id| graph.index_of(id).unwrap())
            .collect();
        let ids: Vec<&str> = graph
            .topological_order(&subset)
            .into_iter()
            .map(|idx| graph.unique_id(idx))
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_unique_ids_are_sorted() {
        let graph = NodeGraph::from_nodes(vec![model("z", &[]), model("m", &[])]).unwrap();
        assert_eq!(graph.unique_ids(&graph.all()), vec!["m", "z"]);
    }
}
