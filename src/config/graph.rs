//! Workflow reference graph and cycle detection

use super::Definition;
use std::collections::{BTreeMap, HashMap};

/// Adjacency list: workflow name -> referenced workflow names, in step order
pub type ReferenceGraph<'a> = BTreeMap<&'a str, Vec<&'a str>>;

/// Build the reference graph of a definition
///
/// References to workflows that do not exist are kept as edges; they resolve to
/// nodes without outgoing edges during traversal.
pub fn reference_graph(def: &Definition) -> ReferenceGraph<'_> {
    def.workflows
        .iter()
        .map(|(name, wf)| {
            let refs = wf.steps.iter().filter_map(|s| s.workflow_ref()).collect();
            (name.as_str(), refs)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    InProgress,
    Done,
}

/// Find one cycle in the graph
///
/// Roots are visited in sorted order. Returns the cycle as a path that ends
/// back at its first node, e.g. `["A", "B", "A"]`.
pub fn find_cycle(graph: &ReferenceGraph<'_>) -> Option<Vec<String>> {
    let mut colors: HashMap<&str, Color> = HashMap::with_capacity(graph.len());
    let mut path: Vec<&str> = Vec::new();

    for &root in graph.keys() {
        if colors.contains_key(root) {
            continue;
        }
        if let Some(cycle) = visit(root, graph, &mut colors, &mut path) {
            return Some(cycle);
        }
    }

    None
}

fn visit<'a>(
    node: &'a str,
    graph: &ReferenceGraph<'a>,
    colors: &mut HashMap<&'a str, Color>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    colors.insert(node, Color::InProgress);
    path.push(node);

    for &next in graph.get(node).map(Vec::as_slice).unwrap_or_default() {
        match colors.get(next) {
            Some(Color::InProgress) => {
                let start = path.iter().position(|&p| p == next).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                cycle.push(next.to_string());
                return Some(cycle);
            }
            Some(Color::Done) => {}
            None => {
                if let Some(cycle) = visit(next, graph, colors, path) {
                    return Some(cycle);
                }
            }
        }
    }

    path.pop();
    colors.insert(node, Color::Done);
    None
}
