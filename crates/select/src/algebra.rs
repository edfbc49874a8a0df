//! Set algebra over criteria: intersection inside a group, union across
//! groups and arguments, and a single final subtraction of the excludes.

use crate::criterion::Criterion;
use crate::parser::parse_argument;
use crate::{Result, SelectorError};
use noderun_graph::{NodeGraph, NodeSet};
use std::fmt;
use tracing::{debug, warn};

/// Comma-joined criteria; a node must satisfy all of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionGroup {
    /// The intersected criteria, in source order.
    pub criteria: Vec<Criterion>,
}

impl SelectionGroup {
    /// Intersection of every criterion's evaluated set.
    #[must_use]
    pub fn evaluate(&self, graph: &NodeGraph) -> NodeSet {
        let mut criteria = self.criteria.iter();
        let Some(first) = criteria.next() else {
            return NodeSet::new();
        };

        let mut result = first.evaluate(graph);
        for criterion in criteria {
            if result.is_empty() {
                break;
            }
            let matched = criterion.evaluate(graph);
            result.retain(|idx| matched.contains(idx));
        }
        result
    }
}

impl fmt::Display for SelectionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, criterion) in self.criteria.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{criterion}")?;
        }
        Ok(())
    }
}

/// A union of groups, built from any number of selector arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionExpr {
    /// The unioned groups.
    pub groups: Vec<SelectionGroup>,
}

impl SelectionExpr {
    /// Parse every argument and flatten the groups into one union.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed argument.
    pub fn parse<S: AsRef<str>>(arguments: &[S]) -> Result<Self> {
        let mut groups = Vec::new();
        for argument in arguments {
            groups.extend(
                parse_argument(argument.as_ref())?
                    .into_iter()
                    .map(|criteria| SelectionGroup { criteria }),
            );
        }
        Ok(Self { groups })
    }

    /// The expression matching every node.
    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            groups: vec![SelectionGroup {
                criteria: vec![Criterion::wildcard()],
            }],
        }
    }

    /// Whether the expression has no groups (and so matches nothing).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Union of every group's evaluated set.
    #[must_use]
    pub fn evaluate(&self, graph: &NodeGraph) -> NodeSet {
        self.groups
            .iter()
            .flat_map(|group| group.evaluate(graph))
            .collect()
    }
}

impl fmt::Display for SelectionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{group}")?;
        }
        Ok(())
    }
}

/// The parsed `--select` and `--exclude` arguments of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSpec {
    /// What to include.
    pub include: SelectionExpr,
    /// What to subtract from the include set.
    pub exclude: SelectionExpr,
}

impl SelectionSpec {
    /// Parse all selector arguments up front.
    ///
    /// No include argument at all means "every node". Syntax errors surface
    /// here, before the graph is consulted.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::Syntax`] for the first malformed argument.
    pub fn parse<S: AsRef<str>, E: AsRef<str>>(select: &[S], exclude: &[E]) -> Result<Self> {
        let include = if select.is_empty() {
            SelectionExpr::wildcard()
        } else {
            SelectionExpr::parse(select)?
        };
        let exclude = SelectionExpr::parse(exclude)?;
        Ok(Self { include, exclude })
    }

    /// Evaluate both sides and subtract once.
    #[must_use]
    pub fn resolve(&self, graph: &NodeGraph) -> Selection {
        let included = self.include.evaluate(graph);
        let excluded = self.exclude.evaluate(graph);
        let selected: NodeSet = included.difference(&excluded).copied().collect();

        debug!(
            select = %self.include,
            exclude = %self.exclude,
            included = included.len(),
            excluded = excluded.len(),
            selected = selected.len(),
            "Resolved selection"
        );

        Selection {
            included,
            excluded,
            selected,
        }
    }
}

/// Result of resolving a [`SelectionSpec`] against a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Nodes matched by the include expression.
    pub included: NodeSet,
    /// Nodes matched by the exclude expression.
    pub excluded: NodeSet,
    /// `included - excluded`: the nodes to act on.
    pub selected: NodeSet,
}

impl Selection {
    /// Whether nothing is left to act on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Number of selected nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether `unique_id` is in the final set.
    #[must_use]
    pub fn contains(&self, graph: &NodeGraph, unique_id: &str) -> bool {
        graph
            .index_of(unique_id)
            .is_some_and(|idx| self.selected.contains(&idx))
    }

    /// Sorted unique ids of the final set.
    #[must_use]
    pub fn unique_ids(&self, graph: &NodeGraph) -> Vec<String> {
        graph.unique_ids(&self.selected)
    }

    /// Apply the empty-selection policy.
    ///
    /// An empty result is logged as a warning; with `strict` it becomes
    /// [`SelectorError::Empty`].
    ///
    /// # Errors
    ///
    /// Only when `strict` is set and nothing was selected.
    pub fn ensure_not_empty(&self, strict: bool, spec: &SelectionSpec) -> Result<()> {
        if !self.is_empty() {
            return Ok(());
        }
        if strict {
            return Err(SelectorError::Empty {
                select: spec.include.to_string(),
                exclude: spec.exclude.to_string(),
            });
        }
        warn!(
            select = %spec.include,
            exclude = %spec.exclude,
            "Selection matched no nodes, nothing to do"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noderun_graph::{Node, NodeKind};

    fn chain() -> NodeGraph {
        NodeGraph::from_nodes(vec![
            Node::new("model.p.a", "a", NodeKind::Model).with_tag("x"),
            Node::new("model.p.b", "b", NodeKind::Model).with_parent("model.p.a"),
            Node::new("model.p.c", "c", NodeKind::Model)
                .with_parent("model.p.b")
                .with_tag("x"),
        ])
        .unwrap()
    }

    fn resolve(graph: &NodeGraph, select: &[&str], exclude: &[&str]) -> Vec<String> {
        SelectionSpec::parse(select, exclude)
            .unwrap()
            .resolve(graph)
            .unique_ids(graph)
    }

    #[test]
    fn test_empty_select_means_everything() {
        let g = chain();
        assert_eq!(resolve(&g, &[], &[]).len(), 3);
        assert_eq!(resolve(&g, &[], &["tag:x"]), vec!["model.p.b"]);
    }

    #[test]
    fn test_intersection_and_union() {
        let g = chain();
        assert_eq!(resolve(&g, &["tag:x,+b"], &[]), vec!["model.p.a"]);
        assert_eq!(
            resolve(&g, &["a", "c"], &[]),
            vec!["model.p.a", "model.p.c"]
        );
        assert_eq!(resolve(&g, &["a c"], &[]), resolve(&g, &["a", "c"], &[]));
    }

    #[test]
    fn test_exclude_applied_after_union() {
        let g = chain();
        // `b` excluded even though the second include argument adds it back
        assert_eq!(
            resolve(&g, &["a+", "b"], &["b"]),
            vec!["model.p.a", "model.p.c"]
        );
    }

    #[test]
    fn test_selection_contains() {
        let g = chain();
        let selection = SelectionSpec::parse(&["b+"], &[] as &[&str])
            .unwrap()
            .resolve(&g);
        assert!(selection.contains(&g, "model.p.c"));
        assert!(!selection.contains(&g, "model.p.a"));
        assert!(!selection.contains(&g, "model.p.missing"));
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn test_empty_selection_policy() {
        let g = chain();
        let spec = SelectionSpec::parse(&["a,c"], &[] as &[&str]).unwrap();
        let selection = spec.resolve(&g);
        assert!(selection.is_empty());
        assert!(selection.ensure_not_empty(false, &spec).is_ok());

        let err = selection.ensure_not_empty(true, &spec).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Selection matched no nodes (select: a,c, exclude: )"
        );
    }

    #[test]
    fn test_display_renders_normalised_expression() {
        let spec = SelectionSpec::parse(&["tag:x,+b  c+2"], &["@a"]).unwrap();
        assert_eq!(spec.include.to_string(), "tag:x,+b c+2");
        assert_eq!(spec.exclude.to_string(), "@a");
        assert!(SelectionExpr::default().is_empty());
    }

    #[test]
    fn test_syntax_error_aborts_before_resolution() {
        let err = SelectionSpec::parse(&["users"], &["tag:x,bogus:y"]).unwrap_err();
        assert!(matches!(err, SelectorError::Syntax { position: 6, .. }));
    }
}
