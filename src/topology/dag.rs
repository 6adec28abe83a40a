// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipewright contributors

//! Action dependency graph
//!
//! Views an assembled pipeline as a directed graph of actions, with an edge
//! for every artifact handed from one action to another and for every
//! variables namespace read downstream.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::topology::Pipeline;

/// What flows along an edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Artifact(String),
    Variables(String),
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Artifact(name) => write!(f, "{}", name),
            Self::Variables(ns) => write!(f, "vars: {}", ns),
        }
    }
}

/// Graph of actions keyed by `stage/action`
pub struct TopologyGraph {
    graph: DiGraph<String, Flow>,
    name_to_index: HashMap<String, NodeIndex>,
    /// Node keys in stage then declaration order
    order: Vec<String>,
}

impl TopologyGraph {
    /// Build the graph of an assembled pipeline
    pub fn build(pipeline: &Pipeline) -> Self {
        let mut graph = DiGraph::new();
        let mut name_to_index = HashMap::new();
        let mut order = Vec::new();
        let mut artifact_sources: HashMap<&str, NodeIndex> = HashMap::new();
        let mut namespace_sources: HashMap<&str, NodeIndex> = HashMap::new();

        for stage in pipeline.stages() {
            for action in &stage.actions {
                let key = format!("{}/{}", stage.name, action.name);
                let node = graph.add_node(key.clone());
                name_to_index.insert(key.clone(), node);
                order.push(key);

                for input in &action.inputs {
                    if let Some(from) = artifact_sources.get(input.name()) {
                        graph.add_edge(*from, node, Flow::Artifact(input.name().to_string()));
                    }
                }

                for var in action.referenced_variables() {
                    if let Some(from) = namespace_sources.get(var.namespace.as_str()) {
                        // One edge per namespace, however many variables are read
                        let exists = graph.edges_connecting(*from, node).any(
                            |e| matches!(e.weight(), Flow::Variables(ns) if *ns == var.namespace),
                        );
                        if !exists {
                            graph.add_edge(*from, node, Flow::Variables(var.namespace.clone()));
                        }
                    }
                }
            }

            // Productions only become visible once the whole stage is added
            for action in &stage.actions {
                let node = name_to_index[&format!("{}/{}", stage.name, action.name)];
                for output in &action.outputs {
                    artifact_sources.insert(output.name(), node);
                }
                if let Some(ns) = &action.variables_namespace {
                    namespace_sources.insert(ns.as_str(), node);
                }
            }
        }

        Self {
            graph,
            name_to_index,
            order,
        }
    }

    /// Number of actions in the graph
    pub fn action_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Actions feeding `action` directly
    pub fn dependencies(&self, action: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(action)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect();
        deps.sort();
        deps.dedup();
        Some(deps)
    }

    /// Actions fed by `action` directly
    pub fn dependents(&self, action: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(action)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        deps.sort();
        deps.dedup();
        Some(deps)
    }

    /// Check if action A depends (directly or transitively) on action B
    pub fn depends_on(&self, action_a: &str, action_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(action_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(action_b) else {
            return false;
        };

        node_a != node_b && petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    fn edges_in_order(&self) -> Vec<(&str, &str, &Flow)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].as_str(),
                    self.graph[e.target()].as_str(),
                    e.weight(),
                )
            })
            .collect();
        // Edge insertion already follows stage order; keep it stable anyway
        edges.sort_by_key(|(from, to, _)| {
            (
                self.order.iter().position(|k| k == from),
                self.order.iter().position(|k| k == to),
            )
        });
        edges
    }

    /// Generate Mermaid diagram of the graph
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for (i, key) in self.order.iter().enumerate() {
            out.push_str(&format!("    a{}[\"{}\"]\n", i, mermaid_escape(key)));
        }

        for (from, to, flow) in self.edges_in_order() {
            out.push_str(&format!(
                "    a{} -->|{}| a{}\n",
                self.position(from),
                mermaid_escape(&flow.to_string()),
                self.position(to)
            ));
        }

        out
    }

    /// Generate DOT diagram of the graph
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to, flow) in self.edges_in_order() {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\" [label=\"{}\"];\n",
                dot_escape(from),
                dot_escape(to),
                dot_escape(&flow.to_string())
            ));
        }

        // Add isolated nodes (no edges)
        for key in &self.order {
            let node = self.name_to_index[key];
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", dot_escape(key)));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self, pipeline: &Pipeline) -> String {
        let mut out = String::new();

        for (i, stage) in pipeline.stages().iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, stage.name));

            for (run_order, actions) in stage.run_groups() {
                for action in actions {
                    let key = format!("{}/{}", stage.name, action.name);
                    out.push_str(&format!(
                        "   [{}] {} ({})",
                        run_order,
                        action.name,
                        action.kind.category()
                    ));

                    let inputs: Vec<&str> = action.inputs.iter().map(|a| a.name()).collect();
                    if !inputs.is_empty() {
                        out.push_str(&format!(" <- {}", inputs.join(", ")));
                    }
                    let outputs: Vec<&str> = action.outputs.iter().map(|a| a.name()).collect();
                    if !outputs.is_empty() {
                        out.push_str(&format!(" -> {}", outputs.join(", ")));
                    }

                    let deps = self.dependencies(&key).unwrap_or_default();
                    if !deps.is_empty() {
                        out.push_str(&format!(" [depends: {}]", deps.join(", ")));
                    }

                    out.push('\n');
                }
            }
        }

        out
    }

    fn position(&self, key: &str) -> usize {
        self.order.iter().position(|k| k == key).unwrap_or_default()
    }
}

/// Quote-safe text for a DOT string literal
fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Quote-safe text for a Mermaid node or edge label
fn mermaid_escape(text: &str) -> String {
    text.replace('"', "#quot;").replace('|', "#124;")
}
