//! Atomic selector criteria and their evaluation against the graph.

use noderun_graph::{Node, NodeGraph, NodeSet};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// How a criterion matches nodes.
///
/// The set of methods is closed; supporting a new one means adding a
/// variant here and an arm in [`Method::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// Exact display name (the default for bare values).
    Name,
    /// Membership in the node's tag set.
    Tag,
    /// Component-wise prefix of the node's definition path.
    Path,
    /// Node kind (`model`, `seed`, `test`, `snapshot`, `analysis`).
    Kind,
    /// Equality of one config value, e.g. `config.materialized:table`.
    Config(String),
    /// Every node (`*`).
    Wildcard,
}

impl Method {
    /// Parse a method prefix (the part before `:`).
    pub(crate) fn from_prefix(prefix: &str) -> Result<Self, &'static str> {
        match prefix {
            "name" => Ok(Self::Name),
            "tag" => Ok(Self::Tag),
            "path" => Ok(Self::Path),
            "kind" | "resource_type" => Ok(Self::Kind),
            "" => Err("missing selector method"),
            other => match other.strip_prefix("config.") {
                Some("") => Err("missing config key"),
                Some(key) => Ok(Self::Config(key.to_string())),
                None => Err("unknown selector method"),
            },
        }
    }

    /// Whether `node` matches `value` under this method.
    #[must_use]
    pub fn matches(&self, node: &Node, value: &str) -> bool {
        match self {
            Self::Name => node.name == value,
            Self::Tag => node.tags.contains(value),
            Self::Path => !node.path.is_empty() && Path::new(&node.path).starts_with(value),
            Self::Kind => node.kind.as_str() == value,
            Self::Config(key) => node.config_str(key).is_some_and(|v| v == value),
            Self::Wildcard => true,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Tag => f.write_str("tag"),
            Self::Path => f.write_str("path"),
            Self::Kind => f.write_str("kind"),
            Self::Config(key) => write!(f, "config.{key}"),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

/// How far a `+` qualifier reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hops {
    /// All the way to the roots or leaves.
    Unbounded,
    /// At most this many edges away.
    AtMost(usize),
}

impl Hops {
    /// The depth limit understood by the graph traversals.
    #[must_use]
    pub const fn limit(self) -> Option<usize> {
        match self {
            Self::Unbounded => None,
            Self::AtMost(n) => Some(n),
        }
    }

    fn fmt_depth(self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => Ok(()),
            Self::AtMost(n) => write!(f, "{n}"),
        }
    }
}

/// One atomic selector term: a method, a value, and traversal qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Criterion {
    /// Matching method.
    pub method: Method,
    /// Value compared by the method.
    pub value: String,
    /// `+value` / `N+value`: also take ancestors.
    pub ancestors: Option<Hops>,
    /// `value+` / `value+N`: also take descendants.
    pub descendants: Option<Hops>,
    /// `@value`: take the full closure of every match.
    pub full_closure: bool,
}

impl Criterion {
    /// A criterion with no traversal qualifiers.
    pub fn new(method: Method, value: impl Into<String>) -> Self {
        Self {
            method,
            value: value.into(),
            ancestors: None,
            descendants: None,
            full_closure: false,
        }
    }

    /// The `*` criterion.
    #[must_use]
    pub fn wildcard() -> Self {
        Self::new(Method::Wildcard, "*")
    }

    /// Nodes matched by the method alone, before any traversal.
    ///
    /// A value that matches nothing yields an empty set, not an error.
    #[must_use]
    pub fn base_matches(&self, graph: &NodeGraph) -> NodeSet {
        match self.method {
            Method::Wildcard => graph.all(),
            Method::Name => graph.indices_named(&self.value).iter().copied().collect(),
            _ => graph
                .iter_nodes()
                .filter(|(_, node)| self.method.matches(node, &self.value))
                .map(|(idx, _)| idx)
                .collect(),
        }
    }

    /// Base matches expanded through the traversal qualifiers.
    #[must_use]
    pub fn evaluate(&self, graph: &NodeGraph) -> NodeSet {
        let base = self.base_matches(graph);
        let mut result = base.clone();

        for &node in &base {
            if self.full_closure {
                result.extend(graph.full_closure(node));
                continue;
            }
            if let Some(hops) = self.ancestors {
                result.extend(graph.ancestors(node, hops.limit()));
            }
            if let Some(hops) = self.descendants {
                result.extend(graph.descendants(node, hops.limit()));
            }
        }

        debug!(
            criterion = %self,
            base = base.len(),
            matched = result.len(),
            "Evaluated criterion"
        );
        result
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.full_closure {
            f.write_str("@")?;
        }
        if let Some(hops) = self.ancestors {
            hops.fmt_depth(f)?;
            f.write_str("+")?;
        }
        match self.method {
            Method::Name | Method::Wildcard => f.write_str(&self.value)?,
            ref method => write!(f, "{method}:{}", self.value)?,
        }
        if let Some(hops) = self.descendants {
            f.write_str("+")?;
            hops.fmt_depth(f)?;
        }
        Ok(())
    }
}
