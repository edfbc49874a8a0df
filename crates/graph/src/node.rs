//! Project node definitions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// The kind of a project node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A transformation producing a relation.
    Model,
    /// Static data loaded into storage.
    Seed,
    /// An assertion over other nodes.
    Test,
    /// A slowly-changing history capture.
    Snapshot,
    /// A compiled but never materialized query.
    Analysis,
}

impl NodeKind {
    /// The lowercase name used in manifests and selectors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Seed => "seed",
            Self::Test => "test",
            Self::Snapshot => "snapshot",
            Self::Analysis => "analysis",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node of the project graph.
///
/// Nodes arrive fully compiled; the engine never mutates them once the
/// graph has been built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable, project-scoped identifier (e.g. `model.shop.users`).
    pub unique_id: String,
    /// Display name, matched by the `name` selector method.
    pub name: String,
    /// Node kind.
    pub kind: NodeKind,
    /// Tags attached to the node.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Unique ids of direct upstream dependencies.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Project-relative path of the node definition.
    #[serde(default)]
    pub path: String,
    /// Resolved configuration values.
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    /// Compiled runnable body, if the node has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl Node {
    /// Create a node with no tags, parents, path or config.
    pub fn new(unique_id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            unique_id: unique_id.into(),
            name: name.into(),
            kind,
            tags: BTreeSet::new(),
            depends_on: Vec::new(),
            path: String::new(),
            config: BTreeMap::new(),
            command: None,
        }
    }

    /// Add a direct parent.
    #[must_use]
    pub fn with_parent(mut self, unique_id: impl Into<String>) -> Self {
        let parent = unique_id.into();
        if !self.depends_on.contains(&parent) {
            self.depends_on.push(parent);
        }
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Set the definition path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set a config value.
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Set the compiled command.
    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Render a config value as the string a selector compares against.
    ///
    /// Strings compare by content, other scalars by their JSON rendering
    /// (`true`, `42`). Missing keys and `null` yield `None`.
    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<String> {
        match self.config.get(key)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_deduplicates_parents() {
        let node = Node::new("model.a", "a", NodeKind::Model)
            .with_parent("seed.raw")
            .with_parent("seed.raw");
        assert_eq!(node.depends_on, vec!["seed.raw".to_string()]);
    }

    #[test]
    fn test_config_str_renders_scalars() {
        let node = Node::new("model.a", "a", NodeKind::Model)
            .with_config("materialized", "table")
            .with_config("enabled", true)
            .with_config("threads", 4)
            .with_config("unset", serde_json::Value::Null);

        assert_eq!(node.config_str("materialized").as_deref(), Some("table"));
        assert_eq!(node.config_str("enabled").as_deref(), Some("true"));
        assert_eq!(node.config_str("threads").as_deref(), Some("4"));
        assert_eq!(node.config_str("unset"), None);
        assert_eq!(node.config_str("missing"), None);
    }

    #[test]
    fn test_deserialize_minimal_node() {
        let node: Node = serde_json::from_str(
            r#"{"unique_id": "seed.shop.raw", "name": "raw", "kind": "seed"}"#,
        )
        .unwrap();
        assert_eq!(node.kind, NodeKind::Seed);
        assert!(node.tags.is_empty());
        assert!(node.depends_on.is_empty());
        assert!(node.command.is_none());
    }
}
