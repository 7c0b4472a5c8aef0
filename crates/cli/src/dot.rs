//! Graphviz rendering of rejection witnesses.

use std::collections::HashMap;

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use sicheck_core::history::types::TransactionId;
use sicheck_core::verdict::Conflict;

/// Render a conflict as a Graphviz digraph.
///
/// Known edges are labeled with their dependency kinds and keys;
/// constraint edges are prefixed with the constraint id and the side they
/// belong to.
#[must_use]
pub fn render(conflict: &Conflict<u64>) -> String {
    let mut graph: DiGraph<String, String> = DiGraph::new();
    let mut nodes: HashMap<TransactionId, NodeIndex> = HashMap::new();

    let mut node_of = |graph: &mut DiGraph<String, String>, id: TransactionId| {
        *nodes
            .entry(id)
            .or_insert_with(|| graph.add_node(id.to_string()))
    };

    for (from, to, edges) in &conflict.edges {
        let labels: Vec<String> = edges.iter().map(ToString::to_string).collect();
        let source = node_of(&mut graph, *from);
        let target = node_of(&mut graph, *to);
        graph.add_edge(source, target, labels.join(","));
    }

    for constraint in &conflict.constraints {
        for (side, edges) in [("first", &constraint.first), ("second", &constraint.second)] {
            for edge in edges {
                let source = node_of(&mut graph, edge.from);
                let target = node_of(&mut graph, edge.to);
                graph.add_edge(
                    source,
                    target,
                    format!("c{}.{side}:{}({})", constraint.id, edge.kind, edge.key),
                );
            }
        }
    }

    format!("{}", Dot::new(&graph))
}
