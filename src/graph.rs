//! Directed graph view of a workflow's nodes and edges.
//!
//! Wraps the workflow in a petgraph `DiGraph` so validation and consumers can
//! ask structural questions: cycles, entry points, topological order.

use std::collections::HashMap;

use petgraph::{
    Direction,
    algo::toposort,
    graph::{DiGraph, NodeIndex},
};

use crate::model::Workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A back edge found during cycle detection, `from → to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub from: String,
    pub to: String,
}

impl std::fmt::Display for Cycle {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{} → {}", self.from, self.to)
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl WorkflowGraph {
    /// Build the graph. Nodes are added in sorted name order; edges with an
    /// undeclared endpoint and self-loops are left out (the validator reports those).
    pub fn new(workflow: &Workflow) -> Self {
        let mut graph: DiGraph<String, ()> = DiGraph::with_capacity(workflow.nodes.len(), workflow.edges.len());
        let mut index = HashMap::with_capacity(workflow.nodes.len());

        for name in workflow.node_names() {
            let idx = graph.add_node(name.to_string());
            index.insert(name.to_string(), idx);
        }

        for edge in workflow.edges.iter().filter(|e| !e.is_self_loop()) {
            if let (Some(from), Some(to)) = (index.get(&edge.from), index.get(&edge.to)) {
                graph.add_edge(*from, *to, ());
            }
        }

        Self {
            graph,
            index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.index.contains_key(name)
    }

    /// successors in edge declaration order
    fn successors(
        &self,
        idx: NodeIndex,
    ) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self.graph.neighbors_directed(idx, Direction::Outgoing).collect();
        next.reverse();
        next
    }

    /// Three-color depth-first search with an explicit stack.
    ///
    /// A back edge to a gray node is reported and ends the traversal from that
    /// root; every node still on the stack is closed so later roots only report
    /// cycles they have not already been shown. Traversal then continues from
    /// the next unvisited root, so independent cycles are all reported.
    pub fn find_cycles(&self) -> Vec<Cycle> {
        let mut color = vec![Color::White; self.graph.node_count()];
        let mut cycles = Vec::new();

        for root in self.graph.node_indices() {
            if color[root.index()] != Color::White {
                continue;
            }

            color[root.index()] = Color::Gray;
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>, usize)> = vec![(root, self.successors(root), 0)];

            while let Some((u, next, pos)) = stack.last_mut() {
                let u = *u;
                if *pos >= next.len() {
                    color[u.index()] = Color::Black;
                    stack.pop();
                    continue;
                }

                let v = next[*pos];
                *pos += 1;
                match color[v.index()] {
                    Color::Gray => {
                        cycles.push(Cycle {
                            from: self.graph[u].clone(),
                            to: self.graph[v].clone(),
                        });
                        for (open, _, _) in stack.drain(..) {
                            color[open.index()] = Color::Black;
                        }
                    }
                    Color::White => {
                        color[v.index()] = Color::Gray;
                        let successors = self.successors(v);
                        stack.push((v, successors, 0));
                    }
                    Color::Black => {}
                }
            }
        }

        cycles
    }

    pub fn is_acyclic(&self) -> bool {
        self.find_cycles().is_empty()
    }

    /// Nodes with no incoming edges, sorted.
    pub fn entry_points(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|idx| self.graph.neighbors_directed(*idx, Direction::Incoming).next().is_none())
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    /// Direct downstream nodes of `name`, sorted.
    pub fn downstream(
        &self,
        name: &str,
    ) -> Vec<String> {
        let Some(idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self.graph.neighbors_directed(*idx, Direction::Outgoing).map(|n| self.graph[n].clone()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Execution order, or `None` if the graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<String>> {
        toposort(&self.graph, None).ok().map(|order| order.into_iter().map(|idx| self.graph[idx].clone()).collect())
    }

    /// Human-readable adjacency listing.
    pub fn describe(&self) -> String {
        let mut lines = Vec::with_capacity(self.graph.node_count() + 1);
        lines.push(format!("Nodes: {}, Edges: {}", self.graph.node_count(), self.graph.edge_count()));

        for idx in self.graph.node_indices() {
            let outgoing = self.downstream(&self.graph[idx]);
            if outgoing.is_empty() {
                lines.push(format!("{} -> (end)", self.graph[idx]));
            } else {
                lines.push(format!("{} -> {}", self.graph[idx], outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }
}
