//! `noderun list`: print the selection in dependency order.

use crate::cli::{CliError, ListArgs, OkEnvelope};
use crate::config::Settings;
use crate::context::RunContext;
use noderun_graph::{ManifestFile, NodeKind};
use serde::Serialize;
use std::fmt::Write;
use tracing::debug;

/// One entry of `noderun list --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedNode {
    /// The node's unique id.
    pub unique_id: String,
    /// Display name.
    pub name: String,
    /// Node kind.
    pub kind: NodeKind,
}

/// Print the selected nodes in the order a run would consider them.
pub fn execute(args: &ListArgs, settings: &Settings, json: bool) -> Result<String, CliError> {
    let options = settings.selection_options(&args.selection);
    let source = ManifestFile::new(&options.manifest);
    debug!(manifest = %source.path().display(), "Listing selection");
    let ctx = RunContext::load(
        &source,
        &args.selection.select,
        &args.selection.exclude,
        options.strict,
    )?;
    render(&ctx, json)
}

fn render(ctx: &RunContext, json: bool) -> Result<String, CliError> {
    let nodes = ctx.ordered().into_iter().filter_map(|idx| ctx.graph.node(idx));

    if json {
        let listed: Vec<ListedNode> = nodes
            .map(|node| ListedNode {
                unique_id: node.unique_id.clone(),
                name: node.name.clone(),
                kind: node.kind,
            })
            .collect();
        return serde_json::to_string(&OkEnvelope::new(listed))
            .map_err(|e| CliError::other(format!("Failed to serialize node list: {e}")));
    }

    let mut output = String::new();
    for node in nodes {
        let _ = writeln!(output, "{}", node.unique_id);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use noderun_graph::Manifest;

    const MANIFEST: &str = r#"{
        "nodes": [
            { "unique_id": "model.shop.orders", "name": "orders", "kind": "model",
              "depends_on": ["model.shop.users"] },
            { "unique_id": "model.shop.users", "name": "users", "kind": "model",
              "depends_on": ["seed.shop.raw_users"] },
            { "unique_id": "seed.shop.raw_users", "name": "raw_users", "kind": "seed" }
        ]
    }"#;

    fn context(select: &[&str]) -> RunContext {
        let manifest = Manifest::from_json(MANIFEST).unwrap();
        RunContext::load(&manifest, select, &[] as &[&str], false).unwrap()
    }

    #[test]
    fn test_text_output_is_topological() {
        let output = render(&context(&["*"]), false).unwrap();
        assert_eq!(
            output,
            "seed.shop.raw_users\nmodel.shop.users\nmodel.shop.orders\n"
        );
    }

    #[test]
    fn test_json_output() {
        let output = render(&context(&["users+"]), true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"][0]["unique_id"], "model.shop.users");
        assert_eq!(value["data"][1]["kind"], "model");
        assert_eq!(value["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_selection_prints_nothing() {
        assert_eq!(render(&context(&["users,orders"]), false).unwrap(), "");
    }
}
