//! Traversal closures over the node graph.
//!
//! Every traversal is a breadth-first walk over node indices with a visited
//! set, so diamond-shaped dependencies are expanded once.

use crate::NodeGraph;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// An ordered set of node indices.
pub type NodeSet = BTreeSet<NodeIndex>;

impl NodeGraph {
    /// Direct parents of a node.
    #[must_use]
    pub fn parents(&self, index: NodeIndex) -> NodeSet {
        self.inner()
            .neighbors_directed(index, Direction::Incoming)
            .collect()
    }

    /// Direct children of a node.
    #[must_use]
    pub fn children(&self, index: NodeIndex) -> NodeSet {
        self.inner()
            .neighbors_directed(index, Direction::Outgoing)
            .collect()
    }

    /// Transitive upstream nodes, at most `max_depth` hops away.
    ///
    /// The start node itself is not included. `None` walks to the roots.
    #[must_use]
    pub fn ancestors(&self, index: NodeIndex, max_depth: Option<usize>) -> NodeSet {
        self.walk(index, Direction::Incoming, max_depth)
    }

    /// Transitive downstream nodes, at most `max_depth` hops away.
    ///
    /// The start node itself is not included. `None` walks to the leaves.
    #[must_use]
    pub fn descendants(&self, index: NodeIndex, max_depth: Option<usize>) -> NodeSet {
        self.walk(index, Direction::Outgoing, max_depth)
    }

    /// The node, its descendants, and every ancestor of those.
    ///
    /// This is the set needed to rebuild everything downstream of a change
    /// to `index`.
    #[must_use]
    pub fn full_closure(&self, index: NodeIndex) -> NodeSet {
        let mut closure = self.descendants(index, None);
        closure.insert(index);

        let mut upstream = NodeSet::new();
        for &member in &closure {
            upstream.extend(self.ancestors(member, None));
        }
        closure.extend(upstream);
        closure
    }

    fn walk(&self, start: NodeIndex, direction: Direction, max_depth: Option<usize>) -> NodeSet {
        let mut found = NodeSet::new();
        let mut visited = HashSet::from([start]);
        let mut frontier = VecDeque::from([(start, 0_usize)]);

        while let Some((current, depth)) = frontier.pop_front() {
            if max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for next in self.inner().neighbors_directed(current, direction) {
                if visited.insert(next) {
                    found.insert(next);
                    frontier.push_back((next, depth + 1));
                }
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, NodeKind};

    /// Build a graph from `"id:parent1,parent2"` specs.
    fn graph(specs: &[&str]) -> NodeGraph {
        NodeGraph::from_nodes(specs.iter().map(|&spec| {
            let (id, parents) = spec.split_once(':').unwrap_or((spec, ""));
            parents
                .split(',')
                .filter(|p| !p.is_empty())
                .fold(Node::new(id, id, NodeKind::Model), |n, p| n.with_parent(p))
        }))
        .unwrap()
    }

    fn ids(graph: &NodeGraph, set: &NodeSet) -> Vec<String> {
        graph.unique_ids(set)
    }

    fn idx(graph: &NodeGraph, id: &str) -> NodeIndex {
        graph.index_of(id).unwrap()
    }

    #[test]
    fn test_neighbors() {
        let g = graph(&["a", "b:a", "c:a"]);
        assert_eq!(ids(&g, &g.children(idx(&g, "a"))), vec!["b", "c"]);
        assert_eq!(ids(&g, &g.parents(idx(&g, "b"))), vec!["a"]);
        assert!(g.parents(idx(&g, "a")).is_empty());
    }

    #[test]
    fn test_chain_closures() {
        let g = graph(&["a", "b:a", "c:b"]);

        assert_eq!(ids(&g, &g.ancestors(idx(&g, "c"), None)), vec!["a", "b"]);
        assert_eq!(ids(&g, &g.descendants(idx(&g, "a"), None)), vec!["b", "c"]);
        assert_eq!(ids(&g, &g.full_closure(idx(&g, "b"))), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_depth_bounds() {
        let g = graph(&["a", "b:a", "c:b", "d:c"]);

        assert_eq!(ids(&g, &g.ancestors(idx(&g, "d"), Some(1))), vec!["c"]);
        assert_eq!(ids(&g, &g.ancestors(idx(&g, "d"), Some(2))), vec!["b", "c"]);
        assert_eq!(ids(&g, &g.descendants(idx(&g, "a"), Some(0))), Vec::<String>::new());
        assert_eq!(ids(&g, &g.descendants(idx(&g, "a"), Some(2))), vec!["b", "c"]);
    }

    #[test]
    fn test_diamond_is_visited_once() {
        let g = graph(&["a", "b:a", "c:a", "d:b,c"]);
        assert_eq!(ids(&g, &g.ancestors(idx(&g, "d"), None)), vec!["a", "b", "c"]);
        assert_eq!(ids(&g, &g.descendants(idx(&g, "a"), None)), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_depth_uses_shortest_path() {
        // a -> d directly and a -> b -> c -> d
        let g = graph(&["a", "b:a", "c:b", "d:a,c"]);
        assert_eq!(ids(&g, &g.descendants(idx(&g, "a"), Some(1))), vec!["b", "d"]);
    }

    #[test]
    fn test_full_closure_pulls_in_other_parents_of_descendants() {
        // x and a both feed b; closure of a must rebuild b, so x comes too.
        // unrelated stays out.
        let g = graph(&["a", "x", "unrelated", "b:a,x", "c:b"]);
        assert_eq!(ids(&g, &g.full_closure(idx(&g, "a"))), vec!["a", "b", "c", "x"]);
    }
}
